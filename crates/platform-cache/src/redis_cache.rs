use std::time::Duration;

use async_trait::async_trait;
use platform_kernel::AppError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::port::CachePort;

/// Production adapter backed by Redis. Compare-and-delete uses a Lua
/// script so the read-then-delete is atomic on the server; a plain GET
/// followed by DEL would race against a concurrent lease holder.
const DEL_IF_MATCH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url).map_err(AppError::internal)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(AppError::internal)?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, AppError> {
        let mut conn = self.manager.clone();
        let (count, _): (i64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(AppError::internal)?;
        Ok(count)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(AppError::internal)?;
        Ok(acquired.is_some())
    }

    async fn del_if_match(&self, key: &str, expected: &str) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let deleted: i64 = redis::Script::new(DEL_IF_MATCH_SCRIPT)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(AppError::internal)?;
        Ok(deleted == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(AppError::internal)
    }
}

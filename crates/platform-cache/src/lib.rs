pub mod memory;
pub mod port;
pub mod redis_cache;

pub use memory::InMemoryCache;
pub use port::CachePort;
pub use redis_cache::RedisCache;

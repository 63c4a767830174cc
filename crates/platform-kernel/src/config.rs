//! Boot-time configuration: file + environment + defaults, expanded once
//! into a validated [`Config`] and handed in slices to each component.
//!
//! Generalizes the env-only loader into a file+env+defaults loader,
//! keeping the same `anyhow::Context`-flavored error reporting.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Dev
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_grpc_port() -> u16 {
    9090
}
fn default_shutdown_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_port() -> u16 {
    5432
}
fn default_max_connections() -> u32 {
    10
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_duration")]
    pub access_token_duration_seconds: i64,
    #[serde(default = "default_refresh_duration")]
    pub refresh_token_duration_seconds: i64,
}

fn default_access_duration() -> i64 {
    15 * 60
}
fn default_refresh_duration() -> i64 {
    30 * 24 * 60 * 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    #[serde(default)]
    pub burst_size: Option<u32>,
}

fn default_rpm() -> u32 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            burst_size: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceAddresses {
    #[serde(default)]
    pub auth_service_addr: Option<String>,
    #[serde(default)]
    pub scheduler_service_addr: Option<String>,
    #[serde(default)]
    pub core_service_addr: Option<String>,
    #[serde(default)]
    pub incident_service_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_seconds: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_tick_seconds() -> u64 {
    1
}
fn default_max_concurrent_tasks() -> usize {
    32
}
fn default_lock_timeout() -> u64 {
    30
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            lock_timeout_seconds: default_lock_timeout(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentsConfig {
    #[serde(default = "default_debounce")]
    pub auto_resolve_debounce_seconds: i64,
    #[serde(default = "default_reopen_window")]
    pub reopen_window_seconds: i64,
}

fn default_debounce() -> i64 {
    30
}
fn default_reopen_window() -> i64 {
    10 * 60
}

impl Default for IncidentsConfig {
    fn default() -> Self {
        Self {
            auto_resolve_debounce_seconds: default_debounce(),
            reopen_window_seconds: default_reopen_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_seconds: u64,
    #[serde(default = "default_half_open_attempts")]
    pub half_open_attempts: u32,
}

fn default_max_retries() -> u32 {
    3
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout() -> u64 {
    30
}
fn default_half_open_attempts() -> u32 {
    1
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_seconds: default_recovery_timeout(),
            half_open_attempts: default_half_open_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_server")]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default = "default_redis_addr")]
    pub redis_addr: String,
    #[serde(default)]
    pub logger: LoggerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub services: ServiceAddresses,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub incidents: IncidentsConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        grpc_port: default_grpc_port(),
        shutdown_timeout_seconds: default_shutdown_timeout(),
    }
}

fn default_redis_addr() -> String {
    "redis://localhost:6379".to_string()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML/JSON file, overlaid with
    /// `SERVER_HOST`, `SERVER_PORT`, `DATABASE_*`, `LOGGER_*`, `JWT_*`,
    /// `REDIS_ADDR`, `RATE_LIMIT_REQUESTS_PER_MINUTE`, and the
    /// `*_SERVICE_ADDR` family, then validated.
    pub fn load(file_path: Option<&Path>) -> Result<Self> {
        let raw = match file_path {
            Some(path) if path.exists() => {
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?
            }
            _ => default_config_template(),
        };

        let expanded = expand_env_vars(&raw)?;
        let mut config: Config =
            serde_yaml::from_str(&expanded).context("parsing configuration document")?;

        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Build directly from environment variables only (used by tests and
    /// the migration CLI, which don't carry a config file).
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be in 1..65535");
        }
        if self.server.grpc_port == 0 {
            bail!("server.grpc_port must be in 1..65535");
        }
        if self.database.name.trim().is_empty() {
            bail!("database.name must not be empty");
        }
        if self.database.user.trim().is_empty() {
            bail!("database.user must not be empty");
        }
        if self.database.host.trim().is_empty() {
            bail!("database.host must not be empty");
        }
        Ok(())
    }
}

/// Expand `${VAR:default}` and `${VAR}` placeholders against the process
/// environment. Unresolvable placeholders without a default are an error.
fn expand_env_vars(input: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:([^}]*))?\}").unwrap();
    let mut last_err = None;
    let expanded = pattern.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(3).map(|m| m.as_str());
        match env::var(var) {
            Ok(val) => val,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    last_err = Some(var.to_string());
                    String::new()
                }
            },
        }
    });
    if let Some(var) = last_err {
        bail!("environment variable {var} is required but not set and has no default");
    }
    Ok(expanded.into_owned())
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(v) = env::var("SERVER_HOST") {
        config.server.host = v;
    }
    if let Ok(v) = env::var("SERVER_PORT") {
        config.server.port = v.parse().context("SERVER_PORT must be a valid u16")?;
    }
    if let Ok(v) = env::var("GRPC_PORT") {
        config.server.grpc_port = v.parse().context("GRPC_PORT must be a valid u16")?;
    }
    if let Ok(v) = env::var("DATABASE_HOST") {
        config.database.host = v;
    }
    if let Ok(v) = env::var("DATABASE_PORT") {
        config.database.port = v.parse().context("DATABASE_PORT must be a valid u16")?;
    }
    if let Ok(v) = env::var("DATABASE_NAME") {
        config.database.name = v;
    }
    if let Ok(v) = env::var("DATABASE_USER") {
        config.database.user = v;
    }
    if let Ok(v) = env::var("DATABASE_PASSWORD") {
        config.database.password = v;
    }
    if let Ok(v) = env::var("LOGGER_LEVEL") {
        config.logger.level = v;
    }
    if let Ok(v) = env::var("LOGGER_FORMAT") {
        config.logger.format = v;
    }
    if let Ok(v) = env::var("ENVIRONMENT") {
        config.environment = match v.as_str() {
            "dev" => Environment::Dev,
            "staging" => Environment::Staging,
            "prod" => Environment::Prod,
            other => bail!("ENVIRONMENT must be one of dev|staging|prod, got {other}"),
        };
    }
    if let Ok(v) = env::var("REDIS_ADDR") {
        config.redis_addr = v;
    }
    if let Ok(v) = env::var("JWT_ACCESS_SECRET") {
        config.jwt.access_secret = v;
    }
    if let Ok(v) = env::var("JWT_REFRESH_SECRET") {
        config.jwt.refresh_secret = v;
    }
    if let Ok(v) = env::var("JWT_ACCESS_TOKEN_DURATION") {
        config.jwt.access_token_duration_seconds =
            v.parse().context("JWT_ACCESS_TOKEN_DURATION must be an integer")?;
    }
    if let Ok(v) = env::var("JWT_REFRESH_TOKEN_DURATION") {
        config.jwt.refresh_token_duration_seconds =
            v.parse().context("JWT_REFRESH_TOKEN_DURATION must be an integer")?;
    }
    if let Ok(v) = env::var("RATE_LIMIT_REQUESTS_PER_MINUTE") {
        config.rate_limit.requests_per_minute = v
            .parse()
            .context("RATE_LIMIT_REQUESTS_PER_MINUTE must be an integer")?;
    }
    for (env_name, slot) in [
        ("AUTH_SERVICE_ADDR", &mut config.services.auth_service_addr),
        (
            "SCHEDULER_SERVICE_ADDR",
            &mut config.services.scheduler_service_addr,
        ),
        ("CORE_SERVICE_ADDR", &mut config.services.core_service_addr),
        (
            "INCIDENT_SERVICE_ADDR",
            &mut config.services.incident_service_addr,
        ),
    ] {
        if let Ok(v) = env::var(env_name) {
            *slot = Some(v);
        }
    }
    Ok(())
}

/// A minimal in-repo default document used when no config file is present;
/// unknown keys are tolerated so downstream deployments can add their own.
fn default_config_template() -> String {
    r#"
environment: ${ENVIRONMENT:dev}
server:
  host: ${SERVER_HOST:0.0.0.0}
  port: ${SERVER_PORT:8080}
database:
  host: ${DATABASE_HOST:localhost}
  port: ${DATABASE_PORT:5432}
  name: ${DATABASE_NAME:uptime}
  user: ${DATABASE_USER:uptime}
  password: ${DATABASE_PASSWORD:}
jwt:
  access_secret: ${JWT_ACCESS_SECRET:dev-access-secret}
  refresh_secret: ${JWT_REFRESH_SECRET:dev-refresh-secret}
"#
    .to_string()
}

/// A flat view of extra, unvalidated settings — used for the tenant
/// `settings` bag where arbitrary keys are allowed.
pub type SettingsMap = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_var_with_default_when_unset() {
        let out = expand_env_vars("port: ${NOT_SET_XYZ:9999}").unwrap();
        assert_eq!(out, "port: 9999");
    }

    #[test]
    fn expands_var_from_environment() {
        env::set_var("PLATFORM_TEST_VAR", "from-env");
        let out = expand_env_vars("v: ${PLATFORM_TEST_VAR:default}").unwrap();
        assert_eq!(out, "v: from-env");
        env::remove_var("PLATFORM_TEST_VAR");
    }

    #[test]
    fn missing_var_without_default_errors() {
        let res = expand_env_vars("v: ${PLATFORM_TEST_VAR_MISSING}");
        assert!(res.is_err());
    }

    #[test]
    fn default_template_loads_and_validates() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.name, "uptime");
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = Config::load(None).unwrap();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}

//! Boots the C2 gateway dispatch plane: loads configuration, wires every
//! port and service, starts the C1 scheduler in the background, and serves
//! the axum router until SIGINT/SIGTERM.
//!
//! Exit codes: 0 on a clean shutdown, 1 if startup fails before the
//! listener binds.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use platform_auth::{DefaultAuthService, JwtService};
use platform_cache::{CachePort, RedisCache};
use platform_executor::DefaultCoreService;
use platform_gateway::AppState;
use platform_incidents::{DefaultIncidentService, SeverityPolicy};
use platform_kernel::config::Config;
use platform_kernel::rpc::{EchoForgeService, InMemoryMetricsService, LoggingNotificationService};
use platform_kernel::{Clock, IdGenerator, SystemClock, UuidGenerator};
use platform_persistence::{PersistencePort, SqlxPostgresPersistence};
use platform_scheduler::{DefaultScheduler, SchedulerService};

#[derive(Parser)]
#[command(name = "platform-server")]
#[command(about = "Multi-tenant uptime monitoring gateway")]
struct Cli {
    /// Path to a YAML or JSON configuration file. Falls back to
    /// environment-only defaults when omitted or missing.
    #[arg(long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,platform_gateway=debug,platform_scheduler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "platform-server failed to start");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing::info!("starting platform-server");

    let cli = Cli::parse();
    let config = Arc::new(Config::load(cli.config.as_deref()).context("loading configuration")?);

    let persistence: Arc<dyn PersistencePort> = Arc::new(
        SqlxPostgresPersistence::connect(&config.database.url(), config.database.max_connections)
            .await
            .context("connecting to database")?,
    );
    let cache: Arc<dyn CachePort> = Arc::new(
        RedisCache::connect(&config.redis_addr).await.context("connecting to redis")?,
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);

    let jwt = JwtService::new(
        &config.jwt.access_secret,
        &config.jwt.refresh_secret,
        "uptime-platform",
        chrono::Duration::seconds(config.jwt.access_token_duration_seconds),
        chrono::Duration::seconds(config.jwt.refresh_token_duration_seconds),
    );
    let auth: Arc<dyn platform_auth::AuthService> =
        Arc::new(DefaultAuthService::new(persistence.clone(), clock.clone(), ids.clone(), jwt));

    let core: Arc<dyn platform_executor::CoreService> = Arc::new(DefaultCoreService::new(clock.clone()));

    let incidents: Arc<dyn platform_incidents::IncidentService> = Arc::new(DefaultIncidentService::new(
        persistence.clone(),
        clock.clone(),
        ids.clone(),
        SeverityPolicy::default(),
        chrono::Duration::seconds(config.incidents.auto_resolve_debounce_seconds),
        chrono::Duration::seconds(config.incidents.reopen_window_seconds),
    ));

    let scheduler: Arc<dyn SchedulerService> = Arc::new(DefaultScheduler::new(
        persistence.clone(),
        cache.clone(),
        core.clone(),
        incidents.clone(),
        clock.clone(),
        config.scheduler.clone(),
    ));

    let state = Arc::new(AppState::new(
        persistence,
        cache,
        auth,
        scheduler.clone(),
        core,
        incidents.clone(),
        Arc::new(LoggingNotificationService),
        Arc::new(InMemoryMetricsService::new()),
        Arc::new(EchoForgeService),
        config.clone(),
    ));

    scheduler.start().await.context("starting scheduler")?;

    let auto_resolve_incidents = incidents.clone();
    let auto_resolve_interval = Duration::from_secs(config.incidents.auto_resolve_debounce_seconds.max(1) as u64);
    let auto_resolve_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(auto_resolve_interval);
        loop {
            ticker.tick().await;
            match auto_resolve_incidents.auto_resolve_stale().await {
                Ok(resolved) if resolved > 0 => {
                    tracing::info!(resolved, "auto-resolved stale incidents");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = ?err, "auto-resolve sweep failed"),
            }
        }
    });

    let router = platform_gateway::router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parsing server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding listener")?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    auto_resolve_handle.abort();
    let drain_deadline = Duration::from_secs(config.server.shutdown_timeout_seconds);
    match scheduler.stop(drain_deadline).await {
        Ok(report) if !report.drained => {
            tracing::warn!(undrained = report.undrained_in_flight, "shutdown deadline exceeded; some tasks did not drain");
        }
        Ok(_) => tracing::info!("scheduler drained cleanly"),
        Err(err) => tracing::error!(error = ?err, "scheduler stop failed"),
    }

    tracing::info!("platform-server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

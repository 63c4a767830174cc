//! C2 Gateway dispatch plane: the single HTTP entrypoint in front of every
//! other backend. Routing, identity/permission
//! enforcement, rate limiting, and the per-backend resilience wrappers all
//! live in this crate; handlers are thin translators between HTTP and the
//! typed service traits defined elsewhere in the workspace.

pub mod client_ip;
pub mod errors;
pub mod identity;
pub mod middleware;
pub mod permissions;
pub mod rate_limit;
pub mod resilience;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Builds the full axum [`Router`], layered
/// in the order documented on [`middleware::client_ip_middleware`]:
/// client IP extraction, then identity resolution, then permission
/// enforcement, then rate limiting — applied outermost-first so each later
/// stage can read what the earlier one attached to the request.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/validate", post(routes::auth::validate))
        .route("/checks", get(routes::checks::list).post(routes::checks::create))
        .route(
            "/checks/:check_id",
            get(routes::checks::get).put(routes::checks::update).delete(routes::checks::delete),
        )
        .route(
            "/checks/:check_id/schedule",
            get(routes::schedules::get).post(routes::schedules::create).delete(routes::schedules::delete),
        )
        .route("/schedules", get(routes::schedules::list))
        .route("/core/:check_id/execute", post(routes::core::execute))
        .route("/core/:check_id/status", get(routes::core::status))
        .route("/core/:check_id/history", get(routes::core::history))
        .route("/incidents", get(routes::incidents::list))
        .route("/incidents/:incident_id", get(routes::incidents::get).put(routes::incidents::update))
        .route("/incidents/:incident_id/events", get(routes::incidents::history))
        .route("/notifications", post(routes::notifications::send))
        .route("/metrics", get(routes::metrics::list))
        .route("/config", get(routes::config::get).put(routes::config::update).post(routes::config::update))
        .route("/forge", post(routes::forge::dispatch))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .layer(axum::middleware::from_fn(middleware::permission_middleware))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::identity_middleware))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/live", get(routes::health::live))
        .route("/ready", get(routes::health::ready))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(middleware::client_ip_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use std::net::SocketAddr;
    use platform_auth::DefaultAuthService;
    use platform_cache::InMemoryCache;
    use platform_executor::DefaultCoreService;
    use platform_incidents::{DefaultIncidentService, SeverityPolicy};
    use platform_kernel::config::Config;
    use platform_kernel::rpc::{EchoForgeService, InMemoryMetricsService, LoggingNotificationService};
    use platform_kernel::{FakeClock, UuidGenerator};
    use platform_persistence::InMemoryPersistence;
    use platform_scheduler::DefaultScheduler;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = Arc::new(Config::load(None).unwrap());
        let persistence: Arc<dyn platform_persistence::PersistencePort> = Arc::new(InMemoryPersistence::new());
        let cache: Arc<dyn platform_cache::CachePort> = Arc::new(InMemoryCache::new());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let ids = Arc::new(UuidGenerator);
        let jwt = platform_auth::JwtService::new(
            &config.jwt.access_secret,
            &config.jwt.refresh_secret,
            "uptime-platform",
            chrono::Duration::seconds(config.jwt.access_token_duration_seconds),
            chrono::Duration::seconds(config.jwt.refresh_token_duration_seconds),
        );
        let auth: Arc<dyn platform_auth::AuthService> = Arc::new(DefaultAuthService::new(
            persistence.clone(),
            clock.clone(),
            ids.clone(),
            jwt,
        ));
        let core: Arc<dyn platform_executor::CoreService> = Arc::new(DefaultCoreService::new(clock.clone()));
        let incidents: Arc<dyn platform_incidents::IncidentService> = Arc::new(DefaultIncidentService::new(
            persistence.clone(),
            clock.clone(),
            ids.clone(),
            SeverityPolicy::default(),
            chrono::Duration::seconds(config.incidents.auto_resolve_debounce_seconds),
            chrono::Duration::seconds(config.incidents.reopen_window_seconds),
        ));
        let scheduler: Arc<dyn platform_scheduler::SchedulerService> = Arc::new(DefaultScheduler::new(
            persistence.clone(),
            cache.clone(),
            core.clone(),
            incidents.clone(),
            clock.clone(),
            config.scheduler.clone(),
        ));
        Arc::new(AppState::new(
            persistence,
            cache,
            auth,
            scheduler,
            core,
            incidents,
            Arc::new(LoggingNotificationService),
            Arc::new(InMemoryMetricsService::new()),
            Arc::new(EchoForgeService),
            config,
        ))
    }

    fn request(uri: &str) -> Request<Body> {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn health_is_reachable_without_authentication() {
        let app = router(test_state());
        let response = app.oneshot(request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn checks_without_credentials_is_unauthorized() {
        let app = router(test_state());
        let response = app.oneshot(request("/api/v1/checks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

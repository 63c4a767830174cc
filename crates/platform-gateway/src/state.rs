//! Shared application state handed to every route handler (grounded in the
//! teacher's `AxumAppState`): one `Arc` per backend port/service plus the
//! resilience wrapper each is dispatched through.

use std::sync::Arc;

use platform_auth::AuthService;
use platform_cache::CachePort;
use platform_executor::CoreService;
use platform_incidents::IncidentService;
use platform_kernel::config::Config;
use platform_kernel::rpc::{ForgeService, MetricsService, NotificationService};
use platform_persistence::PersistencePort;
use platform_scheduler::SchedulerService;

use crate::rate_limit::RateLimiter;
use crate::resilience::Backend;

#[derive(Clone)]
pub struct AppState {
    pub persistence: Arc<dyn PersistencePort>,
    pub cache: Arc<dyn CachePort>,
    pub auth: Arc<dyn AuthService>,
    pub scheduler: Arc<dyn SchedulerService>,
    pub core: Arc<dyn CoreService>,
    pub incidents: Arc<dyn IncidentService>,
    pub notifications: Arc<dyn NotificationService>,
    pub metrics: Arc<dyn MetricsService>,
    pub forge: Arc<dyn ForgeService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth_backend: Arc<Backend>,
    pub scheduler_backend: Arc<Backend>,
    pub core_backend: Arc<Backend>,
    pub incidents_backend: Arc<Backend>,
    pub notifications_backend: Arc<Backend>,
    pub metrics_backend: Arc<Backend>,
    pub forge_backend: Arc<Backend>,
    pub config: Arc<Config>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        cache: Arc<dyn CachePort>,
        auth: Arc<dyn AuthService>,
        scheduler: Arc<dyn SchedulerService>,
        core: Arc<dyn CoreService>,
        incidents: Arc<dyn IncidentService>,
        notifications: Arc<dyn NotificationService>,
        metrics: Arc<dyn MetricsService>,
        forge: Arc<dyn ForgeService>,
        config: Arc<Config>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(cache.clone(), config.rate_limit.clone()));
        Self {
            auth_backend: Arc::new(Backend::new("auth", &config.resilience)),
            scheduler_backend: Arc::new(Backend::new("scheduler", &config.resilience)),
            core_backend: Arc::new(Backend::new("core", &config.resilience)),
            incidents_backend: Arc::new(Backend::new("incidents", &config.resilience)),
            notifications_backend: Arc::new(Backend::new("notifications", &config.resilience)),
            metrics_backend: Arc::new(Backend::new("metrics", &config.resilience)),
            forge_backend: Arc::new(Backend::new("forge", &config.resilience)),
            persistence,
            cache,
            auth,
            scheduler,
            core,
            incidents,
            notifications,
            metrics,
            forge,
            rate_limiter,
            config,
        }
    }
}

use std::time::{Duration, Instant};

use async_trait::async_trait;
use platform_models::CheckType;

pub struct ProbeOutcome {
    pub is_success: bool,
    pub error_message: Option<String>,
    pub duration: Duration,
}

impl ProbeOutcome {
    fn success(duration: Duration) -> Self {
        Self { is_success: true, error_message: None, duration }
    }

    fn failure(error_message: impl Into<String>, duration: Duration) -> Self {
        Self { is_success: false, error_message: Some(error_message.into()), duration }
    }
}

/// A single check-type leaf implementation. Kept intentionally thin: the
/// leaf implementation of each probe type is treated as an external
/// collaborator, so only enough is implemented here to exercise the
/// scheduler/incident pipeline end to end.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn run(&self, target: &str, timeout: Duration) -> ProbeOutcome;
}

pub struct HttpProbe {
    client: reqwest::Client,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn run(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        match self.client.get(target).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::success(started.elapsed()),
            Ok(response) => ProbeOutcome::failure(format!("unexpected status {}", response.status()), started.elapsed()),
            Err(err) if err.is_timeout() => ProbeOutcome::failure("timeout", started.elapsed()),
            Err(err) => ProbeOutcome::failure(err.to_string(), started.elapsed()),
        }
    }
}

pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn run(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(target)).await {
            Ok(Ok(_)) => ProbeOutcome::success(started.elapsed()),
            Ok(Err(err)) => ProbeOutcome::failure(err.to_string(), started.elapsed()),
            Err(_) => ProbeOutcome::failure("timeout", started.elapsed()),
        }
    }
}

/// gRPC health-check probing is not implemented; out of scope per the
/// "leaf implementations" exclusion. Always reports failure so it is
/// exercised by the incident pipeline without pretending to be a real
/// network call.
pub struct GrpcProbe;

#[async_trait]
impl Probe for GrpcProbe {
    async fn run(&self, _target: &str, _timeout: Duration) -> ProbeOutcome {
        ProbeOutcome::failure("grpc probe not implemented", Duration::ZERO)
    }
}

pub fn probe_for(check_type: CheckType) -> Box<dyn Probe> {
    match check_type {
        CheckType::Http => Box::new(HttpProbe::default()),
        CheckType::Tcp => Box::new(TcpProbe),
        CheckType::Grpc => Box::new(GrpcProbe),
    }
}

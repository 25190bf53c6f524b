//! Waiting for the stack to come up

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;

use crate::errors::DeployError;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// How long to wait between `compose up` and schema creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Sleep for a fixed delay
    Fixed { delay: Duration },

    /// Poll a readiness URL until it answers 2xx or the timeout elapses
    Health {
        url: Url,
        timeout: Duration,
        interval: Duration,
    },
}

impl WaitStrategy {
    pub fn describe(&self) -> String {
        match self {
            WaitStrategy::Fixed { delay } => format!("sleep {}s", delay.as_secs()),
            WaitStrategy::Health { url, timeout, .. } => {
                format!("poll {} for up to {}s", url, timeout.as_secs())
            }
        }
    }
}

/// Checks whether the application answers
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self, url: &Url) -> Result<bool, DeployError>;
}

/// HTTP readiness probe
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Result<Self, DeployError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn check(&self, url: &Url) -> Result<bool, DeployError> {
        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                debug!("{} answered {}", url, response.status());
                Ok(response.status().is_success())
            }
            // Expected while containers are still starting
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                debug!("{} not reachable yet: {}", url, e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Block until the strategy is satisfied
pub async fn wait_until_ready(
    strategy: &WaitStrategy,
    probe: &dyn ReadinessProbe,
) -> Result<(), DeployError> {
    match strategy {
        WaitStrategy::Fixed { delay } => {
            info!("Waiting {}s for services to start...", delay.as_secs());
            sleep(*delay).await;
            Ok(())
        }
        WaitStrategy::Health {
            url,
            timeout,
            interval,
        } => {
            info!("Waiting for {} (timeout {}s)...", url, timeout.as_secs());
            // A timeout too large for the clock waits without a deadline
            let deadline = Instant::now().checked_add(*timeout);
            let cooldown = CooldownOptions {
                base_delay: *interval,
                max_delay: interval.saturating_mul(8),
                multiplier: 2.0,
            };

            let mut attempt: u32 = 0;
            loop {
                if probe.check(url).await? {
                    info!("{} is ready", url);
                    return Ok(());
                }

                let mut delay = calc_exp_backoff(&cooldown, attempt);
                if let Some(deadline) = deadline {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(DeployError::ReadinessError(format!(
                            "{} not ready after {}s",
                            url,
                            timeout.as_secs()
                        )));
                    }
                    delay = delay.min(deadline - now);
                }
                debug!("Readiness attempt {} failed, retrying in {:?}", attempt + 1, delay);
                sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

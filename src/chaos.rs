//! Artificial latency and failure injection in front of the gateway.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Method;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{ConfigError, GatewayConfig};

/// Inclusive millisecond range a delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn contains(&self, delay: Duration) -> bool {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        (self.min_ms..=self.max_ms).contains(&ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Read,
    Write,
}

impl EndpointClass {
    pub fn of(method: &Method) -> Self {
        if *method == Method::GET {
            EndpointClass::Read
        } else {
            EndpointClass::Write
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub read: DelayRange,
    pub write: DelayRange,
}

impl LatencyProfile {
    pub const fn none() -> Self {
        Self {
            read: DelayRange::new(0, 0),
            write: DelayRange::new(0, 0),
        }
    }

    pub fn range(&self, class: EndpointClass) -> DelayRange {
        match class {
            EndpointClass::Read => self.read,
            EndpointClass::Write => self.write,
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            read: DelayRange::new(200, 300),
            write: DelayRange::new(400, 500),
        }
    }
}

/// Outcome of one draw: how long to wait and whether to fail afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disruption {
    pub delay: Duration,
    pub fail: bool,
}

/// Seedable source of delays and injected failures.
pub struct Chaos {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    latency: LatencyProfile,
}

impl Chaos {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng: Mutex::new(rng),
            failure_rate: config.failure_rate,
            latency: config.latency,
        })
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn draw(&self, class: EndpointClass) -> Disruption {
        let range = self.latency.range(class);
        // A poisoned rng is still a usable rng.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let delay_ms = rng.gen_range(range.min_ms..=range.max_ms);
        let fail = rng.gen_bool(self.failure_rate);
        Disruption {
            delay: Duration::from_millis(delay_ms),
            fail,
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Returns at once and keeps every requested delay.
    #[derive(Default)]
    pub struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn delays(&self) -> Vec<Duration> {
            self.delays.lock().expect("sleeper mutex").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().expect("sleeper mutex").push(delay);
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

use crate::chaos::{DelayRange, LatencyProfile};

pub const DEFAULT_FAILURE_RATE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failure rate must be between 0 and 1 (got {0})")]
    FailureRate(f64),

    #[error("{class} latency range is inverted: {min_ms}ms > {max_ms}ms")]
    LatencyRange {
        class: &'static str,
        min_ms: u64,
        max_ms: u64,
    },
}

/// Knobs for the simulated gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub failure_rate: f64,
    pub latency: LatencyProfile,
    /// Fixed seed for delays and failures; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            failure_rate: DEFAULT_FAILURE_RATE,
            latency: LatencyProfile::default(),
            seed: None,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::FailureRate(self.failure_rate));
        }
        check_range("read", self.latency.read)?;
        check_range("write", self.latency.write)
    }
}

fn check_range(class: &'static str, range: DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::LatencyRange {
            class,
            min_ms: range.min_ms,
            max_ms: range.max_ms,
        });
    }
    Ok(())
}

pub fn default_db_path() -> PathBuf {
    // XDG data directory, else the working directory
    match directories::ProjectDirs::from("", "", "talentflow") {
        Some(dirs) => dirs.data_dir().join("talentflow.db"),
        None => PathBuf::from("talentflow.db"),
    }
}

//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderflow_sales::CompensationPolicy;

use crate::intake::{DEFAULT_LIFECYCLE_RETENTION, IntakeShape};

pub const ENV_INTAKE_SHAPE: &str = "ORDERFLOW_INTAKE_SHAPE";
pub const ENV_INTAKE_CAPACITY: &str = "ORDERFLOW_INTAKE_CAPACITY";
pub const ENV_FANOUT_WORKERS: &str = "ORDERFLOW_FANOUT_WORKERS";
pub const ENV_COMPENSATION: &str = "ORDERFLOW_COMPENSATION";
pub const ENV_LIFECYCLE_RETENTION: &str = "ORDERFLOW_LIFECYCLE_RETENTION";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Fulfillment pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name prefix for worker threads and log fields.
    pub name: String,
    pub intake_shape: IntakeShape,
    /// Channel bound, or ring size (power of two) for the ring shape.
    pub intake_capacity: usize,
    pub fanout_workers: usize,
    pub compensation: CompensationPolicy,
    /// Terminal lifecycle states kept for lookup before the oldest are evicted.
    pub lifecycle_retention: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "orderflow".to_string(),
            intake_shape: IntakeShape::Channel,
            intake_capacity: 1024,
            fanout_workers: 4,
            compensation: CompensationPolicy::Rollback,
            lifecycle_retention: DEFAULT_LIFECYCLE_RETENTION,
        }
    }
}

impl PipelineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_intake_shape(mut self, shape: IntakeShape) -> Self {
        self.intake_shape = shape;
        self
    }

    pub fn with_intake_capacity(mut self, capacity: usize) -> Self {
        self.intake_capacity = capacity;
        self
    }

    pub fn with_fanout_workers(mut self, workers: usize) -> Self {
        self.fanout_workers = workers;
        self
    }

    pub fn with_compensation(mut self, policy: CompensationPolicy) -> Self {
        self.compensation = policy;
        self
    }

    pub fn with_lifecycle_retention(mut self, retention: usize) -> Self {
        self.lifecycle_retention = retention;
        self
    }

    /// Defaults overridden by `ORDERFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INTAKE_SHAPE) {
            config.intake_shape = raw
                .parse()
                .map_err(|e: crate::intake::IntakeError| ConfigError::invalid(ENV_INTAKE_SHAPE, &raw, e.to_string()))?;
        }
        if let Some(raw) = lookup(ENV_INTAKE_CAPACITY) {
            config.intake_capacity = parse_count(ENV_INTAKE_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FANOUT_WORKERS) {
            config.fanout_workers = parse_count(ENV_FANOUT_WORKERS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COMPENSATION) {
            config.compensation = match raw.trim().to_ascii_lowercase().as_str() {
                "rollback" => CompensationPolicy::Rollback,
                "none" => CompensationPolicy::None,
                _ => {
                    return Err(ConfigError::invalid(
                        ENV_COMPENSATION,
                        raw,
                        "expected `rollback` or `none`",
                    ));
                }
            };
        }

        if let Some(raw) = lookup(ENV_LIFECYCLE_RETENTION) {
            config.lifecycle_retention = parse_count(ENV_LIFECYCLE_RETENTION, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake_capacity == 0 {
            return Err(ConfigError::invalid(ENV_INTAKE_CAPACITY, "0", "must be at least 1"));
        }
        if self.intake_shape == IntakeShape::Ring && !self.intake_capacity.is_power_of_two() {
            return Err(ConfigError::invalid(
                ENV_INTAKE_CAPACITY,
                self.intake_capacity.to_string(),
                "ring size must be a power of two",
            ));
        }
        if self.fanout_workers == 0 {
            return Err(ConfigError::invalid(ENV_FANOUT_WORKERS, "0", "must be at least 1"));
        }
        if self.lifecycle_retention == 0 {
            return Err(ConfigError::invalid(ENV_LIFECYCLE_RETENTION, "0", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_count(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))
}

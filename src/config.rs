// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting is a command line flag with an environment variable
//! fallback. Defaults live in [`crate::constants`].

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_REQUEUE_CANCELLED_SECS, DEFAULT_REQUEUE_NOT_READY_SECS,
    DEFAULT_REQUEUE_READY_SECS, ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_BIND_ADDRESS,
    RETRY_BACKOFF_MULTIPLIER, RETRY_INITIAL_INTERVAL_MILLIS, RETRY_MAX_ATTEMPTS,
    RETRY_MAX_ELAPSED_TIME_SECS, RETRY_MAX_INTERVAL_SECS, RETRY_RANDOMIZATION_FACTOR,
};
use crate::pipeline::retry::RetryConfig;
use crate::telemetry::LogFormat;
use clap::Parser;
use std::time::Duration;

/// Settings of the tenant cluster reconciler.
#[derive(Parser, Clone, Debug)]
#[command(
    name = "tenant-reconciler",
    version,
    about = "Converges AWS tenant cluster infrastructure toward AWSCluster objects"
)]
pub struct OperatorConfig {
    /// Installation the operator runs in; part of bucket names and tags
    #[arg(long, env = "INSTALLATION_NAME")]
    pub installation: String,

    /// Operator version used for clusters without a version label
    #[arg(long, env = "OPERATOR_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub operator_version: String,

    /// Namespace to watch; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Control plane route tables to peer tenant VPCs with, comma separated
    #[arg(long, env = "ROUTE_TABLE_NAMES", value_delimiter = ',')]
    pub route_table_names: Vec<String>,

    /// CNI pool for clusters that do not set one
    #[arg(long, env = "DEFAULT_PODS_CIDR")]
    pub default_pods_cidr: Option<String>,

    /// Requeue after a completed create pass, in seconds
    #[arg(long, env = "REQUEUE_READY_SECS", default_value_t = DEFAULT_REQUEUE_READY_SECS)]
    pub requeue_ready_secs: u64,

    /// Requeue while deletion is blocked, in seconds
    #[arg(long, env = "REQUEUE_NOT_READY_SECS", default_value_t = DEFAULT_REQUEUE_NOT_READY_SECS)]
    pub requeue_not_ready_secs: u64,

    /// Requeue after a cancelled pass, in seconds
    #[arg(long, env = "REQUEUE_CANCELLED_SECS", default_value_t = DEFAULT_REQUEUE_CANCELLED_SECS)]
    pub requeue_cancelled_secs: u64,

    /// Requeue after a failed pass, in seconds
    #[arg(long, env = "REQUEUE_ERROR_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    pub requeue_error_secs: u64,

    /// First retry interval of a failing step, in milliseconds
    #[arg(long, env = "RETRY_INITIAL_INTERVAL_MS", default_value_t = RETRY_INITIAL_INTERVAL_MILLIS)]
    pub retry_initial_interval_ms: u64,

    /// Ceiling of a single retry interval, in seconds
    #[arg(long, env = "RETRY_MAX_INTERVAL_SECS", default_value_t = RETRY_MAX_INTERVAL_SECS)]
    pub retry_max_interval_secs: u64,

    /// Time budget for retrying one step invocation, in seconds
    #[arg(long, env = "RETRY_MAX_ELAPSED_SECS", default_value_t = RETRY_MAX_ELAPSED_TIME_SECS)]
    pub retry_max_elapsed_secs: u64,

    /// Attempts per step invocation
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value_t = RETRY_MAX_ATTEMPTS)]
    pub retry_max_attempts: u32,

    /// Lifetime of discovery cache entries, in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Bind address of the metrics server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, ignore_case = true)]
    pub log_format: LogFormat,
}

/// Requeue intervals per pass result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequeueIntervals {
    /// After a completed create pass
    pub ready: Duration,
    /// While a delete pass keeps the finalizer
    pub not_ready: Duration,
    /// After a cancelled pass
    pub cancelled: Duration,
    /// After a failed pass
    pub error: Duration,
}

impl Default for RequeueIntervals {
    fn default() -> Self {
        Self {
            ready: Duration::from_secs(DEFAULT_REQUEUE_READY_SECS),
            not_ready: Duration::from_secs(DEFAULT_REQUEUE_NOT_READY_SECS),
            cancelled: Duration::from_secs(DEFAULT_REQUEUE_CANCELLED_SECS),
            error: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
        }
    }
}

impl OperatorConfig {
    /// Retry parameters of every step.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_interval: Duration::from_millis(self.retry_initial_interval_ms),
            max_interval: Duration::from_secs(self.retry_max_interval_secs),
            max_elapsed_time: Some(Duration::from_secs(self.retry_max_elapsed_secs)),
            max_attempts: self.retry_max_attempts.max(1),
            multiplier: RETRY_BACKOFF_MULTIPLIER,
            randomization_factor: RETRY_RANDOMIZATION_FACTOR,
        }
    }

    /// Lifetime of discovery cache entries.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Requeue intervals of the controller.
    #[must_use]
    pub fn requeue_intervals(&self) -> RequeueIntervals {
        RequeueIntervals {
            ready: Duration::from_secs(self.requeue_ready_secs),
            not_ready: Duration::from_secs(self.requeue_not_ready_secs),
            cancelled: Duration::from_secs(self.requeue_cancelled_secs),
            error: Duration::from_secs(self.requeue_error_secs),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry decorator with exponential backoff for pipeline steps.
//!
//! [`RetryResource`] re-invokes the wrapped step on retryable errors, sleeping
//! a jittered, exponentially growing interval between attempts. Fatal errors
//! (`InvalidConfig`, `ExecutionFailed`, `TooManyObjects`) and `NotFound` are
//! returned immediately; the pipeline turns the latter into a cancellation.

use super::{invoke, PassKind, Resource};
use crate::constants::{
    RETRY_BACKOFF_MULTIPLIER, RETRY_INITIAL_INTERVAL_MILLIS, RETRY_MAX_ATTEMPTS,
    RETRY_MAX_ELAPSED_TIME_SECS, RETRY_MAX_INTERVAL_SECS, RETRY_RANDOMIZATION_FACTOR,
};
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::metrics::record_step_retry;
use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Backoff state of one step invocation.
///
/// Intervals start at [`RetryConfig::initial_interval`] and grow by the
/// multiplier up to [`RetryConfig::max_interval`]. Each returned interval is
/// spread by the randomization factor.
#[derive(Debug)]
pub struct StepBackoff {
    config: RetryConfig,
    next: Duration,
    started: Instant,
}

impl StepBackoff {
    fn new(config: &RetryConfig) -> Self {
        Self {
            next: config.initial_interval,
            config: config.clone(),
            started: Instant::now(),
        }
    }

    /// Interval to sleep before the next attempt, `None` once the step has
    /// used up its time budget.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self
            .config
            .max_elapsed_time
            .is_some_and(|budget| self.started.elapsed() >= budget)
        {
            return None;
        }

        let interval = self.next;
        self.next = interval
            .mul_f64(self.config.multiplier)
            .min(self.config.max_interval);

        Some(self.spread(interval))
    }

    fn spread(&self, interval: Duration) -> Duration {
        let factor = self.config.randomization_factor;
        if factor <= 0.0 {
            return interval;
        }

        let scale = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
        interval.mul_f64(scale.max(0.0))
    }
}

/// Retry parameters of the step decorator.
///
/// The defaults give a step five attempts within five minutes, sleeping
/// about 100ms, 200ms, 400ms and 800ms in between, each spread by 10%.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// First backoff interval
    pub initial_interval: Duration,
    /// Ceiling of a single backoff interval
    pub max_interval: Duration,
    /// Total time budget for one step invocation
    pub max_elapsed_time: Option<Duration>,
    /// Attempts per step invocation, the first one included
    pub max_attempts: u32,
    /// Interval growth factor
    pub multiplier: f64,
    /// Jitter factor
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(RETRY_INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(RETRY_MAX_INTERVAL_SECS),
            max_elapsed_time: Some(Duration::from_secs(RETRY_MAX_ELAPSED_TIME_SECS)),
            max_attempts: RETRY_MAX_ATTEMPTS,
            multiplier: RETRY_BACKOFF_MULTIPLIER,
            randomization_factor: RETRY_RANDOMIZATION_FACTOR,
        }
    }
}

impl RetryConfig {
    /// Fresh backoff state for one step invocation.
    #[must_use]
    pub fn backoff(&self) -> StepBackoff {
        StepBackoff::new(self)
    }
}

/// Decorator retrying the wrapped step on retryable errors.
pub struct RetryResource {
    inner: Box<dyn Resource>,
    config: RetryConfig,
}

/// Wrap `step` with the retry decorator.
#[must_use]
pub fn with_retry(step: Box<dyn Resource>, config: &RetryConfig) -> Box<dyn Resource> {
    Box::new(RetryResource {
        inner: step,
        config: config.clone(),
    })
}

impl RetryResource {
    async fn invoke_with_retry(
        &self,
        kind: PassKind,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<()> {
        let step = self.inner.name();
        let mut backoff = self.config.backoff();
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let e = match invoke(self.inner.as_ref(), kind, cluster, ctx).await {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(
                            step,
                            attempt,
                            elapsed = ?start_time.elapsed(),
                            "Step succeeded after retries"
                        );
                    }
                    return Ok(());
                }
                Err(e) => e,
            };

            if e.is_not_found() {
                debug!(step, error = %e, "Step dependency not found, not retrying");
                return Err(e);
            }

            if e.is_fatal() {
                error!(
                    step,
                    error = %e,
                    "Non-retryable step error, failing immediately"
                );
                return Err(e);
            }

            if ctx.is_cancelled() {
                debug!(step, error = %e, "Pass cancelled, not retrying");
                return Err(e);
            }

            if attempt >= self.config.max_attempts {
                error!(
                    step,
                    attempt,
                    elapsed = ?start_time.elapsed(),
                    error = %e,
                    "Max retry attempts reached, giving up"
                );
                return Err(e);
            }

            if let Some(duration) = backoff.next_backoff() {
                warn!(
                    step,
                    attempt,
                    retry_after = ?duration,
                    error = %e,
                    "Retryable step error, will retry"
                );
                record_step_retry(step);
                tokio::time::sleep(duration).await;
            } else {
                error!(
                    step,
                    attempt,
                    elapsed = ?start_time.elapsed(),
                    error = %e,
                    "Backoff exhausted, giving up"
                );
                return Err(e);
            }
        }
    }
}

#[async_trait]
impl Resource for RetryResource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.invoke_with_retry(PassKind::Create, cluster, ctx).await
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.invoke_with_retry(PassKind::Delete, cluster, ctx).await
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.reads(kind)
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.writes(kind)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ordered step pipeline executed once per reconciliation pass.
//!
//! A [`Pipeline`] is a statically constructed list of [`Resource`] steps for
//! one [`PassKind`]. Running it invokes every step strictly in order against a
//! single [`ScratchContext`] and stops at the first of:
//!
//! - the end of the list ([`PassOutcome::Completed`])
//! - a step cancelling the pass, or returning `NotFound` ([`PassOutcome::Cancelled`])
//! - any other step error ([`PassOutcome::Failed`])
//!
//! Cancellation is not a failure. The next pass simply starts again from the
//! first step.
//!
//! # Step Shapes
//!
//! Simple steps implement [`Resource`] directly. Steps that compute a diff
//! between current and desired state implement [`crud::CrudOperations`] and
//! are adapted by [`crud::CrudResource`].
//!
//! # Decorators
//!
//! Steps are wrapped once at construction time with
//! `with_metrics(with_retry(step, &config))`, see [`retry`] and [`metrics`].

pub mod crud;
pub mod metrics;
pub mod retry;

use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::metrics::record_pass;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info};

/// Which pass a pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Create or update cloud resources
    Create,
    /// Tear down cloud resources
    Delete,
}

impl PassKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation step.
///
/// Steps are stateless across passes. Anything they learn is written to the
/// scratch context; caches they own must tolerate concurrent passes of
/// different clusters.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable step name, used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Converge cloud resources toward the desired state.
    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext)
        -> Result<()>;

    /// Remove cloud resources owned by this step. Most steps have nothing to do.
    async fn ensure_deleted(
        &self,
        _cluster: &TenantCluster,
        _ctx: &mut ScratchContext,
    ) -> Result<()> {
        Ok(())
    }

    /// Context fields this step reads during a pass of `kind`.
    fn reads(&self, _kind: PassKind) -> &'static [ContextField] {
        &[]
    }

    /// Context fields this step writes during a pass of `kind`.
    fn writes(&self, _kind: PassKind) -> &'static [ContextField] {
        &[]
    }
}

/// Invoke the operation of `resource` matching the pass kind.
pub(crate) async fn invoke(
    resource: &dyn Resource,
    kind: PassKind,
    cluster: &TenantCluster,
    ctx: &mut ScratchContext,
) -> Result<()> {
    match kind {
        PassKind::Create => resource.ensure_created(cluster, ctx).await,
        PassKind::Delete => resource.ensure_deleted(cluster, ctx).await,
    }
}

/// How a pass ended.
#[derive(Debug)]
pub enum PassOutcome {
    /// Every step ran
    Completed,
    /// A step stopped the pass; it will be retried later
    Cancelled {
        /// Step that cancelled
        step: &'static str,
    },
    /// A step failed after its retries were exhausted, or with a fatal error
    Failed {
        /// Step that failed
        step: &'static str,
        /// Error returned by the step
        error: ReconcileError,
    },
}

impl PassOutcome {
    /// Metric label of the outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled { .. } => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Ordered list of steps for one pass kind.
pub struct Pipeline {
    kind: PassKind,
    resources: Vec<Box<dyn Resource>>,
}

impl Pipeline {
    /// Create a pipeline running `resources` in order.
    #[must_use]
    pub fn new(kind: PassKind, resources: Vec<Box<dyn Resource>>) -> Self {
        Self { kind, resources }
    }

    /// Pass kind this pipeline runs.
    #[must_use]
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Run every step in order against `ctx`.
    pub async fn run(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> PassOutcome {
        let start = Instant::now();
        let pass = self.kind.as_str();

        info!(
            cluster = %cluster.id(),
            generation = cluster.identity.generation,
            pass,
            steps = self.resources.len(),
            "Starting reconciliation pass"
        );

        let outcome = self.run_steps(cluster, ctx).await;

        match &outcome {
            PassOutcome::Completed => info!(
                cluster = %cluster.id(),
                pass,
                elapsed = ?start.elapsed(),
                "Reconciliation pass completed"
            ),
            PassOutcome::Cancelled { step } => info!(
                cluster = %cluster.id(),
                pass,
                step,
                elapsed = ?start.elapsed(),
                "Reconciliation pass cancelled"
            ),
            PassOutcome::Failed { step, error } => error!(
                cluster = %cluster.id(),
                pass,
                step,
                error = %error,
                elapsed = ?start.elapsed(),
                "Reconciliation pass failed"
            ),
        }

        record_pass(pass, outcome.as_str(), start.elapsed());
        outcome
    }

    async fn run_steps(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> PassOutcome {
        for resource in &self.resources {
            let step = resource.name();
            debug!(cluster = %cluster.id(), pass = self.kind.as_str(), step, "Running step");

            match invoke(resource.as_ref(), self.kind, cluster, ctx).await {
                Ok(()) if ctx.is_cancelled() => return PassOutcome::Cancelled { step },
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    info!(
                        cluster = %cluster.id(),
                        step,
                        reason = %e,
                        "Dependency not available yet, cancelling pass"
                    );
                    ctx.cancel_pass();
                    return PassOutcome::Cancelled { step };
                }
                Err(error) => return PassOutcome::Failed { step, error },
            }
        }

        PassOutcome::Completed
    }

    /// Check that no step reads a context field before an earlier step writes it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending step and field.
    pub fn validate_ordering(&self) -> Result<()> {
        let mut written = BTreeSet::new();

        for resource in &self.resources {
            for field in resource.reads(self.kind) {
                if !written.contains(field) {
                    return Err(ReconcileError::invalid_config(format!(
                        "step '{}' reads {field:?} before any earlier step writes it",
                        resource.name()
                    )));
                }
            }
            written.extend(resource.writes(self.kind).iter().copied());
        }

        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &self.kind)
            .field("steps", &self.step_names())
            .finish()
    }
}

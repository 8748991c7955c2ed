// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Metrics decorator for pipeline steps.
//!
//! Records latency and outcome (`success`, `cancelled`, `error`) of every step
//! invocation under the step's name. It is the outermost decorator, so the
//! recorded latency includes retries.

use super::{invoke, PassKind, Resource};
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::metrics::{record_step_cancelled, record_step_error, record_step_success};
use async_trait::async_trait;
use std::time::Instant;

/// Decorator recording step metrics.
pub struct MetricsResource {
    inner: Box<dyn Resource>,
}

/// Wrap `step` with the metrics decorator.
#[must_use]
pub fn with_metrics(step: Box<dyn Resource>) -> Box<dyn Resource> {
    Box::new(MetricsResource { inner: step })
}

impl MetricsResource {
    async fn observe(
        &self,
        kind: PassKind,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<()> {
        let step = self.inner.name();
        let pass = kind.as_str();
        let start = Instant::now();

        let result = invoke(self.inner.as_ref(), kind, cluster, ctx).await;

        match &result {
            Ok(()) if ctx.is_cancelled() => record_step_cancelled(step, pass, start.elapsed()),
            Ok(()) => record_step_success(step, pass, start.elapsed()),
            Err(e) if e.is_not_found() => record_step_cancelled(step, pass, start.elapsed()),
            Err(e) => record_step_error(step, pass, e.metric_label(), start.elapsed()),
        }

        result
    }
}

#[async_trait]
impl Resource for MetricsResource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.observe(PassKind::Create, cluster, ctx).await
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.observe(PassKind::Delete, cluster, ctx).await
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.reads(kind)
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.writes(kind)
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;

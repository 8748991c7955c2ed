// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the tenant cluster VPC created by the control plane stack.
//!
//! A missing VPC is normal before the first stack creation, so the step logs
//! and leaves the context field empty instead of failing.

use crate::cloud::{Ec2, TagFilter};
use crate::context::{ContextField, ScratchContext, TenantCluster, VpcStatus};
use crate::errors::{ReconcileError, Result};
use crate::labels::{STACK_TCCP, TAG_CLUSTER, TAG_STACK};
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "tcvpc";

/// The `tcvpc` step.
pub struct TenantClusterVpc {
    ec2: Arc<dyn Ec2>,
}

impl TenantClusterVpc {
    /// Create the step using the tenant account's compute API.
    pub fn new(ec2: Arc<dyn Ec2>) -> Self {
        Self { ec2 }
    }

    async fn discover(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let mut vpcs = self
            .ec2
            .describe_vpcs(&[
                TagFilter::new(TAG_CLUSTER, cluster.id()),
                TagFilter::new(TAG_STACK, STACK_TCCP),
            ])
            .await?;

        if vpcs.len() > 1 {
            return Err(ReconcileError::execution_failed(format!(
                "expected one VPC for cluster '{}', found {}",
                cluster.id(),
                vpcs.len()
            )));
        }

        let Some(vpc) = vpcs.pop() else {
            debug!(cluster = %cluster.id(), "Tenant cluster VPC does not exist yet");
            return Ok(());
        };

        debug!(cluster = %cluster.id(), vpc = %vpc.id, cidr = %vpc.cidr_block, "Found tenant cluster VPC");
        ctx.status.tenant_cluster.vpc = Some(VpcStatus {
            id: vpc.id,
            cidr_block: vpc.cidr_block,
        });
        Ok(())
    }
}

#[async_trait]
impl Resource for TenantClusterVpc {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.discover(cluster, ctx).await
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.discover(cluster, ctx).await
    }

    fn writes(&self, _kind: PassKind) -> &'static [ContextField] {
        &[ContextField::Vpc]
    }
}

#[cfg(test)]
#[path = "tcvpc_tests.rs"]
mod tcvpc_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the subnets of the tenant cluster.

use crate::cloud::{Ec2, TagFilter};
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::labels::{KNOWN_STACKS, TAG_CLUSTER, TAG_STACK};
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "tcsubnets";

/// The `tcsubnets` step.
pub struct TenantClusterSubnets {
    ec2: Arc<dyn Ec2>,
}

impl TenantClusterSubnets {
    /// Create the step using the tenant account's compute API.
    pub fn new(ec2: Arc<dyn Ec2>) -> Self {
        Self { ec2 }
    }

    async fn discover(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let Some(vpc) = &ctx.status.tenant_cluster.vpc else {
            debug!(cluster = %cluster.id(), "No VPC, skipping subnet discovery");
            return Ok(());
        };

        let subnets = self
            .ec2
            .describe_subnets(
                &vpc.id,
                &[
                    TagFilter::new(TAG_CLUSTER, cluster.id()),
                    TagFilter::any_of(TAG_STACK, KNOWN_STACKS),
                ],
            )
            .await?;

        debug!(
            cluster = %cluster.id(),
            vpc = %vpc.id,
            count = subnets.len(),
            "Found tenant cluster subnets"
        );
        ctx.status.tenant_cluster.subnets = subnets;
        Ok(())
    }
}

#[async_trait]
impl Resource for TenantClusterSubnets {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.discover(cluster, ctx).await
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.discover(cluster, ctx).await
    }

    fn reads(&self, _kind: PassKind) -> &'static [ContextField] {
        &[ContextField::Vpc]
    }

    fn writes(&self, _kind: PassKind) -> &'static [ContextField] {
        &[ContextField::Subnets]
    }
}

#[cfg(test)]
#[path = "tcsubnets_tests.rs"]
mod tcsubnets_tests;

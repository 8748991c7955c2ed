// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Blocks cluster deletion while node pools still exist.
//!
//! Node pool stacks live inside the tenant VPC. Tearing down the control
//! plane stack first would leave them orphaned, so the delete pass is
//! cancelled and the finalizer kept until every node pool is gone.

use crate::context::{ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::pipeline::Resource;
use async_trait::async_trait;
use tracing::info;

/// Step name
pub const NAME: &str = "nodepoolguard";

/// The `nodepoolguard` step.
#[derive(Debug, Default)]
pub struct NodePoolGuard;

#[async_trait]
impl Resource for NodePoolGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, _cluster: &TenantCluster, _ctx: &mut ScratchContext) -> Result<()> {
        Ok(())
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        if cluster.node_pools.is_empty() {
            return Ok(());
        }

        info!(
            cluster = %cluster.id(),
            node_pools = cluster.node_pools.len(),
            "Node pools still exist, keeping finalizer"
        );
        ctx.keep_finalizer();
        ctx.cancel_pass();
        Ok(())
    }
}

#[cfg(test)]
#[path = "nodepoolguard_tests.rs"]
mod nodepoolguard_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the ARN of the role the control plane assumes for VPC peering.

use crate::cloud::Iam;
use crate::constants::PEER_ACCESS_ROLE_SUFFIX;
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "peerrolearn";

/// The `peerrolearn` step.
pub struct PeerRoleArn {
    iam: Arc<dyn Iam>,
}

impl PeerRoleArn {
    /// Create the step using the control plane account's identity API.
    pub fn new(iam: Arc<dyn Iam>) -> Self {
        Self { iam }
    }
}

/// Name of the peering role of a cluster.
#[must_use]
pub fn peer_role_name(cluster_id: &str) -> String {
    format!("{cluster_id}-{PEER_ACCESS_ROLE_SUFFIX}")
}

#[async_trait]
impl Resource for PeerRoleArn {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let role = peer_role_name(cluster.id());
        let arn = self.iam.get_role_arn(&role).await?;

        debug!(cluster = %cluster.id(), role = %role, arn = %arn, "Found peer access role");
        ctx.status.control_plane.peer_role_arn = Some(arn);
        Ok(())
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::PeerRoleArn],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "peerrolearn_tests.rs"]
mod peerrolearn_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deletes the volumes Kubernetes provisioned for the tenant cluster.
//!
//! Cleanup is best effort: a volume that cannot be detached or deleted is
//! logged and skipped, the remaining volumes are still processed, and the step
//! then reports one retryable `VolumeAttached` error listing the stragglers.

use crate::cloud::{Ec2, TagFilter, Volume};
use crate::constants::{KUBERNETES_CLUSTER_TAG_OWNED, KUBERNETES_CLUSTER_TAG_PREFIX};
use crate::context::{ScratchContext, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::pipeline::Resource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Step name
pub const NAME: &str = "cleanupvolumes";

/// The `cleanupvolumes` step.
pub struct CleanupVolumes {
    ec2: Arc<dyn Ec2>,
}

impl CleanupVolumes {
    /// Create the step using the tenant account's compute API.
    pub fn new(ec2: Arc<dyn Ec2>) -> Self {
        Self { ec2 }
    }

    async fn remove(&self, volume: &Volume) -> Result<()> {
        if !volume.attachments.is_empty() {
            self.ec2.detach_volume(&volume.id, true).await?;
        }
        self.ec2.delete_volume(&volume.id).await
    }
}

#[async_trait]
impl Resource for CleanupVolumes {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, _cluster: &TenantCluster, _ctx: &mut ScratchContext) -> Result<()> {
        Ok(())
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, _ctx: &mut ScratchContext) -> Result<()> {
        let tag = format!("{KUBERNETES_CLUSTER_TAG_PREFIX}{}", cluster.id());
        let volumes = self
            .ec2
            .describe_volumes(&[TagFilter::new(tag, KUBERNETES_CLUSTER_TAG_OWNED)])
            .await?;

        let mut failed = Vec::new();
        for volume in &volumes {
            match self.remove(volume).await {
                Ok(()) => info!(cluster = %cluster.id(), volume = %volume.id, "Deleted volume"),
                Err(e) => {
                    warn!(
                        cluster = %cluster.id(),
                        volume = %volume.id,
                        error = %e,
                        "Failed to delete volume, continuing"
                    );
                    failed.push(volume.id.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::VolumeAttached { volume_ids: failed })
        }
    }
}

#[cfg(test)]
#[path = "cleanupvolumes_tests.rs"]
mod cleanupvolumes_tests;

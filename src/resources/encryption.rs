// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ensures the tenant cluster's encryption key exists and records its id.

use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::encrypter::Encrypter;
use crate::errors::Result;
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "encryption";

/// The `encryption` step.
pub struct EncryptionKey {
    encrypter: Arc<dyn Encrypter>,
}

impl EncryptionKey {
    /// Create the step backed by `encrypter`.
    pub fn new(encrypter: Arc<dyn Encrypter>) -> Self {
        Self { encrypter }
    }
}

#[async_trait]
impl Resource for EncryptionKey {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.encrypter
            .ensure_created_encryption_key(cluster.id())
            .await?;
        let key = self.encrypter.encryption_key(cluster.id()).await?;

        debug!(cluster = %cluster.id(), "Encryption key available");
        ctx.status.tenant_cluster.encryption_key = Some(key);
        Ok(())
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::EncryptionKey],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "encryption_tests.rs"]
mod encryption_tests;

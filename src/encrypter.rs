// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Encryption key backend contract.
//!
//! Backends (KMS, Vault, ...) are implemented outside the engine. The
//! pipeline only needs to make sure a key exists for a cluster and to learn
//! its identifier.

use crate::errors::Result;
use async_trait::async_trait;

/// Two-operation contract every encryption backend satisfies.
#[async_trait]
pub trait Encrypter: Send + Sync {
    /// Create the cluster's encryption key if it does not exist yet.
    async fn ensure_created_encryption_key(&self, cluster_id: &str) -> Result<()>;

    /// Identifier of the cluster's encryption key.
    ///
    /// Returns `NotFound` while the key does not exist.
    async fn encryption_key(&self, cluster_id: &str) -> Result<String>;
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the public and internal hosted zones of the tenant cluster.
//!
//! Both lookups run concurrently. Ids are cached per generation.

use crate::cache::{CacheKey, TtlCache};
use crate::cloud::Route53;
use crate::context::{ContextField, HostedZones, ScratchContext, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "hostedzones";

/// The `hostedzones` step.
pub struct TenantClusterHostedZones {
    route53: Arc<dyn Route53>,
    cache: Arc<TtlCache<HostedZones>>,
}

impl TenantClusterHostedZones {
    /// Create the step using the tenant account's DNS API.
    pub fn new(route53: Arc<dyn Route53>, cache: Arc<TtlCache<HostedZones>>) -> Self {
        Self { route53, cache }
    }

    async fn zone_id(&self, name: &str) -> Result<String> {
        self.route53
            .find_hosted_zone(name)
            .await?
            .ok_or_else(|| ReconcileError::not_found("hosted zone", name))
    }
}

#[async_trait]
impl Resource for TenantClusterHostedZones {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let key = CacheKey::from(&cluster.identity);

        let zones = if let Some(zones) = self.cache.get(&key) {
            zones
        } else {
            let public_name = cluster.cluster.base_domain.clone();
            let internal_name = format!("internal.{public_name}");

            let (public_id, internal_id) =
                tokio::try_join!(self.zone_id(&public_name), self.zone_id(&internal_name))?;

            let zones = HostedZones {
                public_id,
                internal_id,
            };
            self.cache.set(key, zones.clone());
            zones
        };

        debug!(
            cluster = %cluster.id(),
            public = %zones.public_id,
            internal = %zones.internal_id,
            "Found hosted zones"
        );
        ctx.status.tenant_cluster.hosted_zones = Some(zones);
        Ok(())
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::HostedZones],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "hostedzones_tests.rs"]
mod hostedzones_tests;

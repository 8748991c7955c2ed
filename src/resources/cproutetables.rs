// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the control plane route tables the tenant VPC is peered with.
//!
//! The operator is configured with route table names. Each name must resolve
//! to exactly one route table in the control plane account. Results are cached
//! per generation since route tables only change with the installation.

use crate::cache::{CacheKey, TtlCache};
use crate::cloud::{Ec2, RouteTable, TagFilter};
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::labels::TAG_NAME;
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "cproutetables";

/// The `cproutetables` step.
pub struct ControlPlaneRouteTables {
    ec2: Arc<dyn Ec2>,
    names: Vec<String>,
    cache: Arc<TtlCache<Vec<RouteTable>>>,
}

impl ControlPlaneRouteTables {
    /// Create the step looking up `names` in the control plane account.
    pub fn new(ec2: Arc<dyn Ec2>, names: Vec<String>, cache: Arc<TtlCache<Vec<RouteTable>>>) -> Self {
        Self { ec2, names, cache }
    }

    async fn lookup(&self, name: &str) -> Result<RouteTable> {
        let mut tables = self
            .ec2
            .describe_route_tables(&[TagFilter::new(TAG_NAME, name)])
            .await?;

        match tables.len() {
            0 => Err(ReconcileError::not_found("route table", name)),
            1 => Ok(tables.remove(0)),
            n => Err(ReconcileError::execution_failed(format!(
                "expected one route table named '{name}', found {n}"
            ))),
        }
    }
}

#[async_trait]
impl Resource for ControlPlaneRouteTables {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let key = CacheKey::from(&cluster.identity);

        let tables = match self.cache.get(&key) {
            Some(tables) => tables,
            None => {
                let tables = try_join_all(self.names.iter().map(|name| self.lookup(name))).await?;
                self.cache.set(key, tables.clone());
                tables
            }
        };

        debug!(cluster = %cluster.id(), count = tables.len(), "Found control plane route tables");
        ctx.status.control_plane.route_tables = tables;
        Ok(())
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::RouteTables],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "cproutetables_tests.rs"]
mod cproutetables_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovers the public addresses of the tenant cluster NAT gateways.
//!
//! The addresses are whitelisted on the control plane's API load balancer so
//! nodes in private subnets can reach it.

use crate::cloud::Ec2;
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Step name
pub const NAME: &str = "tcnatgateways";

/// The `tcnatgateways` step.
pub struct TenantClusterNatGateways {
    ec2: Arc<dyn Ec2>,
}

impl TenantClusterNatGateways {
    /// Create the step using the tenant account's compute API.
    pub fn new(ec2: Arc<dyn Ec2>) -> Self {
        Self { ec2 }
    }
}

#[async_trait]
impl Resource for TenantClusterNatGateways {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let Some(vpc) = &ctx.status.tenant_cluster.vpc else {
            debug!(cluster = %cluster.id(), "No VPC, skipping NAT gateway discovery");
            return Ok(());
        };

        let gateways = self.ec2.describe_nat_gateways(&vpc.id).await?;

        let mut addresses: Vec<String> = gateways.into_iter().flat_map(|g| g.public_ips).collect();
        addresses.sort();
        addresses.dedup();

        debug!(cluster = %cluster.id(), count = addresses.len(), "Found NAT gateway addresses");
        ctx.status.tenant_cluster.nat_gateway_addresses = addresses;
        Ok(())
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::Vpc],
            PassKind::Delete => &[],
        }
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::NatGatewayAddresses],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "tcnatgateways_tests.rs"]
mod tcnatgateways_tests;

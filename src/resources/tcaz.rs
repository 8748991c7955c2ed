// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Availability zone and subnet allocation for the tenant cluster.
//!
//! The tenant network is split into [`MAX_AZS`] equal blocks. Every availability
//! zone gets one block, whose lower half becomes the public subnet and whose
//! upper half becomes the private subnet. The pod network (CNI) pool is split
//! the same way and every zone gets one CNI block.
//!
//! Allocation is deterministic and idempotent:
//!
//! - zones are processed in ascending name order
//! - subnets that already exist keep their CIDRs, and their blocks are never
//!   handed out again
//! - a zone that only has a public subnet (legacy clusters) gets the other
//!   half of the public subnet's parent block as its private subnet
//!
//! Either every zone is allocated or the step fails with `InvalidConfig`;
//! partial mappings are never written to the context.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use tenant_reconciler::resources::tcaz::{allocate, AllocationInput};
//!
//! let zones: BTreeSet<String> = ["eu-central-1a", "eu-central-1b"]
//!     .iter()
//!     .map(ToString::to_string)
//!     .collect();
//!
//! let allocation = allocate(&AllocationInput {
//!     requested_zones: &zones,
//!     tenant_network: "10.100.8.0/24".parse().unwrap(),
//!     cni_network: "172.17.0.0/16".parse().unwrap(),
//!     subnets: &[],
//! })
//! .unwrap();
//!
//! assert_eq!(allocation.spec.len(), 2);
//! assert!(allocation.status.is_empty());
//! ```

use crate::cloud::Subnet;
pub use crate::context::{AvailabilityZone, AzSubnets, SubnetSlot};
use crate::constants::MAX_AZS;
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::ipam::Ipv4Network;
use crate::labels::{
    CONTROL_PLANE_STACKS, SUBNET_TYPE_AWS_CNI, SUBNET_TYPE_PRIVATE, SUBNET_TYPE_PUBLIC, TAG_STACK,
    TAG_SUBNET_TYPE,
};
use crate::pipeline::{PassKind, Resource};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Step name
pub const NAME: &str = "tcaz";

/// Inputs of one allocation.
#[derive(Debug)]
pub struct AllocationInput<'a> {
    /// Zones requested by the control plane and node pools
    pub requested_zones: &'a BTreeSet<String>,
    /// Tenant network
    pub tenant_network: Ipv4Network,
    /// Pod network pool
    pub cni_network: Ipv4Network,
    /// Subnets discovered in the cloud
    pub subnets: &'a [Subnet],
}

/// Result of one allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Zones with at least one live subnet, as discovered
    pub status: Vec<AvailabilityZone>,
    /// Every desired zone with its target subnets
    pub spec: Vec<AvailabilityZone>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubnetKind {
    Public,
    Private,
    AwsCni,
}

impl SubnetKind {
    fn from_tag(value: &str) -> Option<Self> {
        match value {
            SUBNET_TYPE_PUBLIC => Some(Self::Public),
            SUBNET_TYPE_PRIVATE => Some(Self::Private),
            SUBNET_TYPE_AWS_CNI => Some(Self::AwsCni),
            _ => None,
        }
    }

    fn slot_mut(self, subnets: &mut AzSubnets) -> &mut SubnetSlot {
        match self {
            Self::Public => &mut subnets.public,
            Self::Private => &mut subnets.private,
            Self::AwsCni => &mut subnets.aws_cni,
        }
    }
}

/// Compute the zone mapping for a cluster.
///
/// # Errors
///
/// - `InvalidConfig` when more than [`MAX_AZS`] zones are desired, a free
///   block runs out, a legacy subnet's sibling half is taken by another zone,
///   or the resulting CIDRs overlap
/// - `ExecutionFailed` when a zone has two subnets of the same kind
pub fn allocate(input: &AllocationInput<'_>) -> Result<Allocation> {
    let tenant_blocks = input.tenant_network.split(MAX_AZS)?;
    let cni_blocks = input.cni_network.split(MAX_AZS)?;

    let mut zones: BTreeMap<String, AzSubnets> = input
        .requested_zones
        .iter()
        .map(|name| (name.clone(), AzSubnets::default()))
        .collect();
    merge_discovered(&mut zones, input.subnets)?;

    // status view: only what exists in the cloud, before anything is allocated
    let status: Vec<AvailabilityZone> = zones
        .iter()
        .filter(|(_, subnets)| subnets.has_live_subnet())
        .map(|(name, subnets)| AvailabilityZone {
            name: name.clone(),
            subnets: subnets.clone(),
        })
        .collect();

    if zones.len() > MAX_AZS {
        return Err(ReconcileError::invalid_config(format!(
            "{} availability zones requested ({}), at most {MAX_AZS} are supported",
            zones.len(),
            zones.keys().cloned().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut free_tenant = free_blocks(&tenant_blocks, zones.values().flat_map(tenant_parents))?;
    let mut free_cni = free_blocks(
        &cni_blocks,
        zones.values().filter_map(|s| s.aws_cni.cidr).map(Ok),
    )?;

    for (name, subnets) in &mut zones {
        if subnets.public.is_set() || subnets.private.is_set() {
            continue;
        }
        if free_tenant.is_empty() {
            return Err(ReconcileError::invalid_config(format!(
                "no free tenant network block left for availability zone {name} in {}",
                input.tenant_network
            )));
        }
        let (public, private) = free_tenant.remove(0).halves()?;
        subnets.public = SubnetSlot::allocated(public);
        subnets.private = SubnetSlot::allocated(private);
    }

    recover_legacy_halves(&mut zones)?;

    for (name, subnets) in &mut zones {
        if subnets.aws_cni.is_set() {
            continue;
        }
        if free_cni.is_empty() {
            return Err(ReconcileError::invalid_config(format!(
                "no free CNI block left for availability zone {name} in {}",
                input.cni_network
            )));
        }
        subnets.aws_cni = SubnetSlot::allocated(free_cni.remove(0));
    }

    ensure_disjoint(&zones)?;

    let spec = zones
        .into_iter()
        .map(|(name, subnets)| AvailabilityZone { name, subnets })
        .collect();

    Ok(Allocation { status, spec })
}

fn merge_discovered(zones: &mut BTreeMap<String, AzSubnets>, subnets: &[Subnet]) -> Result<()> {
    for subnet in subnets {
        let stack = subnet.tags.get(TAG_STACK).map(String::as_str);
        if !stack.is_some_and(|s| CONTROL_PLANE_STACKS.contains(&s)) {
            debug!(
                subnet = %subnet.id,
                stack = ?stack,
                "Ignoring subnet outside the control plane stacks"
            );
            continue;
        }

        let Some(kind) = subnet
            .tags
            .get(TAG_SUBNET_TYPE)
            .and_then(|t| SubnetKind::from_tag(t))
        else {
            debug!(subnet = %subnet.id, "Ignoring subnet without a recognised subnet type");
            continue;
        };

        let cidr: Ipv4Network = subnet.cidr_block.parse()?;
        let slot = kind.slot_mut(zones.entry(subnet.availability_zone.clone()).or_default());

        if let Some(existing) = &slot.id {
            if *existing != subnet.id {
                return Err(ReconcileError::execution_failed(format!(
                    "expected one {kind:?} subnet in availability zone {}, found {existing} and {}",
                    subnet.availability_zone, subnet.id
                )));
            }
        }

        *slot = SubnetSlot {
            cidr: Some(cidr),
            id: Some(subnet.id.clone()),
        };
    }

    Ok(())
}

/// Parent blocks claimed by a zone's existing public/private subnets.
fn tenant_parents(subnets: &AzSubnets) -> Vec<Result<Ipv4Network>> {
    [subnets.public.cidr, subnets.private.cidr]
        .into_iter()
        .flatten()
        .map(|cidr| cidr.parent())
        .collect()
}

fn free_blocks<I>(blocks: &[Ipv4Network], taken: I) -> Result<Vec<Ipv4Network>>
where
    I: IntoIterator<Item = Result<Ipv4Network>>,
{
    let taken = taken.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(blocks
        .iter()
        .filter(|block| !taken.iter().any(|t| t.overlaps(block)))
        .copied()
        .collect())
}

/// Fill the missing half of zones that only have a public or only a private subnet.
fn recover_legacy_halves(zones: &mut BTreeMap<String, AzSubnets>) -> Result<()> {
    let names: Vec<String> = zones.keys().cloned().collect();

    for name in names {
        let (present, missing_public) = {
            let subnets = &zones[&name];
            match (subnets.public.cidr, subnets.private.cidr) {
                (Some(public), None) => (public, false),
                (None, Some(private)) => (private, true),
                _ => continue,
            }
        };

        let sibling = present.sibling()?;
        if let Some(owner) = zones.iter().find_map(|(other, s)| {
            let taken = [s.public.cidr, s.private.cidr, s.aws_cni.cidr];
            (other != &name && taken.iter().flatten().any(|c| c.overlaps(&sibling)))
                .then_some(other)
        }) {
            return Err(ReconcileError::invalid_config(format!(
                "cannot recover subnet {sibling} for availability zone {name}: already used by {owner}"
            )));
        }

        info!(
            availability_zone = %name,
            existing = %present,
            recovered = %sibling,
            "Recovering missing subnet half from parent block"
        );

        let Some(subnets) = zones.get_mut(&name) else {
            continue;
        };
        if missing_public {
            subnets.public = SubnetSlot::allocated(sibling);
        } else {
            subnets.private = SubnetSlot::allocated(sibling);
        }
    }

    Ok(())
}

fn ensure_disjoint(zones: &BTreeMap<String, AzSubnets>) -> Result<()> {
    let all: Vec<(&str, Ipv4Network)> = zones
        .iter()
        .flat_map(|(name, s)| {
            [s.public.cidr, s.private.cidr, s.aws_cni.cidr]
                .into_iter()
                .flatten()
                .map(move |cidr| (name.as_str(), cidr))
        })
        .collect();

    for (i, (zone_a, a)) in all.iter().enumerate() {
        for (zone_b, b) in &all[i + 1..] {
            if a.overlaps(b) {
                return Err(ReconcileError::invalid_config(format!(
                    "subnet {a} of availability zone {zone_a} overlaps {b} of {zone_b}"
                )));
            }
        }
    }

    Ok(())
}

/// The `tcaz` step: allocates the zone mapping and stores both views in the context.
#[derive(Debug, Default)]
pub struct TenantClusterAvailabilityZones {
    default_cni_cidr: Option<String>,
}

impl TenantClusterAvailabilityZones {
    /// Create the step. `default_cni_cidr` overrides the built-in CNI pool.
    #[must_use]
    pub fn new(default_cni_cidr: Option<String>) -> Self {
        Self { default_cni_cidr }
    }
}

#[async_trait]
impl Resource for TenantClusterAvailabilityZones {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        let requested = cluster.requested_availability_zones();

        let allocation = allocate(&AllocationInput {
            requested_zones: &requested,
            tenant_network: cluster.tenant_network()?,
            cni_network: cluster.cni_network(self.default_cni_cidr.as_deref())?,
            subnets: &ctx.status.tenant_cluster.subnets,
        })?;

        info!(
            cluster = %cluster.id(),
            desired = allocation.spec.len(),
            live = allocation.status.len(),
            "Allocated availability zones"
        );

        ctx.status.tenant_cluster.availability_zones = allocation.status;
        ctx.spec.tenant_cluster.availability_zones = allocation.spec;
        Ok(())
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[ContextField::Subnets],
            PassKind::Delete => &[],
        }
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[
                ContextField::StatusAvailabilityZones,
                ContextField::SpecAvailabilityZones,
            ],
            PassKind::Delete => &[],
        }
    }
}

#[cfg(test)]
#[path = "tcaz_tests.rs"]
mod tcaz_tests;

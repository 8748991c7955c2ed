// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-pass scratch context shared by the steps of one reconciliation pass.
//!
//! A fresh [`ScratchContext`] is created for every pass and passed explicitly
//! (`&mut ScratchContext`) to each step in order. It has two zones:
//!
//! - `status`: what discovery steps observed in the cloud
//! - `spec`: what business-logic steps computed as desired state
//!
//! A field is written only by the step owning it; later steps read it. The
//! write/read relation is declared with [`ContextField`] so the stock
//! pipelines can be checked for ordering mistakes.
//!
//! The context also carries the pass control flags: [`ScratchContext::cancel_pass`]
//! and [`ScratchContext::keep_finalizer`].

use crate::cloud::{RouteTable, Subnet};
use crate::constants::DEFAULT_CNI_CIDR;
use crate::crd::{
    AWSCluster, AWSClusterSpec, AWSControlPlane, AWSControlPlaneSpec, AWSMachineDeployment,
    AWSMachineDeploymentSpec,
};
use crate::errors::{ReconcileError, Result};
use crate::ipam::Ipv4Network;
use kube::ResourceExt;
use serde::Serialize;
use std::collections::BTreeSet;

/// Identity of the cluster a pass reconciles.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterIdentity {
    /// Cluster id, used to tag cloud resources
    pub id: String,
    /// Namespace of the watched object
    pub namespace: String,
    /// Generation of the watched object; caches are keyed by it
    pub generation: i64,
}

/// Read-only view of the watched objects describing one tenant cluster.
#[derive(Clone, Debug)]
pub struct TenantCluster {
    /// Cluster identity
    pub identity: ClusterIdentity,
    /// Installation the operator runs in
    pub installation: String,
    /// Organization owning the cluster
    pub organization: Option<String>,
    /// Operator version responsible for the cluster
    pub operator_version: String,
    /// Cluster description
    pub cluster: AWSClusterSpec,
    /// Control plane placement, absent until the object is created
    pub control_plane: Option<AWSControlPlaneSpec>,
    /// Node pools of the cluster
    pub node_pools: Vec<AWSMachineDeploymentSpec>,
}

impl TenantCluster {
    /// Build the view from the watched objects.
    pub fn from_resources(
        cluster: &AWSCluster,
        installation: &str,
        fallback_operator_version: &str,
        control_plane: Option<&AWSControlPlane>,
        node_pools: &[AWSMachineDeployment],
    ) -> Self {
        Self {
            identity: ClusterIdentity {
                id: cluster.cluster_id(),
                namespace: cluster.namespace().unwrap_or_default(),
                generation: cluster.metadata.generation.unwrap_or_default(),
            },
            installation: installation.to_string(),
            organization: cluster.organization(),
            operator_version: cluster
                .operator_version()
                .unwrap_or_else(|| fallback_operator_version.to_string()),
            cluster: cluster.spec.clone(),
            control_plane: control_plane.map(|cp| cp.spec.clone()),
            node_pools: node_pools.iter().map(|np| np.spec.clone()).collect(),
        }
    }

    /// Cluster id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    /// Availability zones requested by the control plane and node pools.
    #[must_use]
    pub fn requested_availability_zones(&self) -> BTreeSet<String> {
        self.control_plane
            .iter()
            .flat_map(|cp| cp.availability_zones.iter())
            .chain(
                self.node_pools
                    .iter()
                    .flat_map(|np| np.availability_zones.iter()),
            )
            .cloned()
            .collect()
    }

    /// Tenant network the control plane subnets are carved from.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the CIDR is malformed.
    pub fn tenant_network(&self) -> Result<Ipv4Network> {
        self.cluster.network.cidr_block.parse()
    }

    /// Pod network (CNI) pool, falling back to the default pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the CIDR is malformed.
    pub fn cni_network(&self, default_cidr: Option<&str>) -> Result<Ipv4Network> {
        self.cluster
            .network
            .pods_cidr_block
            .as_deref()
            .or(default_cidr)
            .unwrap_or(DEFAULT_CNI_CIDR)
            .parse()
    }
}

/// Fields of the scratch context, used to declare step ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextField {
    /// `status.control_plane.peer_role_arn`
    PeerRoleArn,
    /// `status.control_plane.route_tables`
    RouteTables,
    /// `status.tenant_cluster.vpc`
    Vpc,
    /// `status.tenant_cluster.subnets`
    Subnets,
    /// `status.tenant_cluster.nat_gateway_addresses`
    NatGatewayAddresses,
    /// `status.tenant_cluster.hosted_zones`
    HostedZones,
    /// `status.tenant_cluster.encryption_key`
    EncryptionKey,
    /// `status.tenant_cluster.availability_zones`
    StatusAvailabilityZones,
    /// `spec.tenant_cluster.availability_zones`
    SpecAvailabilityZones,
    /// `status.tenant_cluster.tccp`
    TccpStack,
}

/// Subnet of one kind within an availability zone.
///
/// Both fields stay empty until the subnet is allocated or discovered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubnetSlot {
    /// CIDR block
    pub cidr: Option<Ipv4Network>,
    /// Cloud subnet id, only known once the subnet exists
    pub id: Option<String>,
}

impl SubnetSlot {
    /// A slot with a CIDR but no id yet.
    #[must_use]
    pub fn allocated(cidr: Ipv4Network) -> Self {
        Self {
            cidr: Some(cidr),
            id: None,
        }
    }

    /// Whether the slot has a CIDR.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.cidr.is_some()
    }
}

/// Subnets of one availability zone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AzSubnets {
    /// Public subnet, lower half of the zone's tenant block
    pub public: SubnetSlot,
    /// Private subnet, upper half of the zone's tenant block
    pub private: SubnetSlot,
    /// Pod network subnet, one block of the CNI pool
    pub aws_cni: SubnetSlot,
}

impl AzSubnets {
    /// Whether at least one subnet of the zone exists in the cloud.
    #[must_use]
    pub fn has_live_subnet(&self) -> bool {
        self.public.id.is_some() || self.private.id.is_some() || self.aws_cni.id.is_some()
    }
}

/// One availability zone and its subnets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityZone {
    /// Zone name, e.g. `eu-central-1a`
    pub name: String,
    /// Subnets of the zone
    pub subnets: AzSubnets,
}

/// VPC of the tenant cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VpcStatus {
    /// VPC id
    pub id: String,
    /// Primary CIDR block
    pub cidr_block: String,
}

/// Hosted zones of the tenant cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostedZones {
    /// Public zone id (`<baseDomain>`)
    pub public_id: String,
    /// Internal zone id (`internal.<baseDomain>`)
    pub internal_id: String,
}

/// Observed state of the tenant cluster control plane stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TccpStatus {
    /// Whether the stack exists
    pub exists: bool,
    /// Operator version the stack was last rendered by
    pub operator_version: Option<String>,
}

/// Observed state in the control plane account.
#[derive(Clone, Debug, Default)]
pub struct ControlPlaneStatus {
    /// ARN of the VPC peering role
    pub peer_role_arn: Option<String>,
    /// Route tables the tenant VPC is peered with
    pub route_tables: Vec<RouteTable>,
}

/// Observed state in the tenant cluster account.
#[derive(Clone, Debug, Default)]
pub struct TenantClusterStatus {
    /// Tenant VPC, absent until created
    pub vpc: Option<VpcStatus>,
    /// Subnets owned by the cluster
    pub subnets: Vec<Subnet>,
    /// Public addresses of the NAT gateways
    pub nat_gateway_addresses: Vec<String>,
    /// Hosted zone ids
    pub hosted_zones: Option<HostedZones>,
    /// Encryption key identifier
    pub encryption_key: Option<String>,
    /// Zones with at least one live subnet
    pub availability_zones: Vec<AvailabilityZone>,
    /// Control plane stack
    pub tccp: TccpStatus,
}

/// Observed zone of the context.
#[derive(Clone, Debug, Default)]
pub struct ContextStatus {
    /// Control plane account
    pub control_plane: ControlPlaneStatus,
    /// Tenant cluster account
    pub tenant_cluster: TenantClusterStatus,
}

/// Desired state of the tenant cluster.
#[derive(Clone, Debug, Default)]
pub struct TenantClusterSpec {
    /// Every desired zone with its target subnets
    pub availability_zones: Vec<AvailabilityZone>,
}

/// Desired zone of the context.
#[derive(Clone, Debug, Default)]
pub struct ContextSpec {
    /// Tenant cluster account
    pub tenant_cluster: TenantClusterSpec,
}

/// Mutable structure shared by the steps of one pass.
#[derive(Clone, Debug, Default)]
pub struct ScratchContext {
    /// Observed state
    pub status: ContextStatus,
    /// Desired state
    pub spec: ContextSpec,
    cancelled: bool,
    finalizer_kept: bool,
}

impl ScratchContext {
    /// Empty context for a new pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the remaining steps of this pass. The next pass starts over.
    pub fn cancel_pass(&mut self) {
        self.cancelled = true;
    }

    /// Whether a step cancelled the pass.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Keep the finalizer on the watched object after this delete pass.
    pub fn keep_finalizer(&mut self) {
        self.finalizer_kept = true;
    }

    /// Whether a step asked to keep the finalizer.
    #[must_use]
    pub fn is_finalizer_kept(&self) -> bool {
        self.finalizer_kept
    }

    /// Tenant VPC, or `NotFound` while it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no VPC was discovered.
    pub fn vpc(&self) -> Result<&VpcStatus> {
        self.status
            .tenant_cluster
            .vpc
            .as_ref()
            .ok_or_else(|| ReconcileError::not_found("VPC", "tenant cluster VPC"))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;

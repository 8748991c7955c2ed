// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Contracts of the cloud APIs the reconciliation steps call.
//!
//! The engine never talks to AWS directly. Each step issues a small, fixed set
//! of calls through these traits with explicit tag filters and treats the
//! responses as opaque typed results. Implementations live outside this crate.
//!
//! Clients are split by account: the control plane account hosts shared
//! resources (peering role, route tables), the tenant account hosts the
//! cluster's own network, stacks, and volumes.

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tags attached to a cloud resource.
pub type Tags = BTreeMap<String, String>;

/// Filter matching resources carrying `key` with any of `values`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFilter {
    /// Tag key
    pub key: String,
    /// Accepted tag values
    pub values: Vec<String>,
}

impl TagFilter {
    /// Filter on a single tag value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }

    /// Filter on any of several tag values.
    pub fn any_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a tag set satisfies this filter.
    #[must_use]
    pub fn matches(&self, tags: &Tags) -> bool {
        tags.get(&self.key)
            .is_some_and(|value| self.values.iter().any(|v| v == value))
    }
}

/// A virtual private cloud.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vpc {
    /// VPC id
    pub id: String,
    /// Primary CIDR block
    pub cidr_block: String,
    /// Resource tags
    pub tags: Tags,
}

/// A subnet as reported by the cloud.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subnet {
    /// Subnet id
    pub id: String,
    /// VPC the subnet belongs to
    pub vpc_id: String,
    /// CIDR block
    pub cidr_block: String,
    /// Availability zone name
    pub availability_zone: String,
    /// Resource tags
    pub tags: Tags,
}

/// A route table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    /// Route table id
    pub id: String,
    /// Value of the `Name` tag
    pub name: String,
}

/// A NAT gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NatGateway {
    /// NAT gateway id
    pub id: String,
    /// Public (elastic) IP addresses
    pub public_ips: Vec<String>,
}

/// A block storage volume.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Volume {
    /// Volume id
    pub id: String,
    /// Instance ids the volume is attached to
    pub attachments: Vec<String>,
    /// Resource tags
    pub tags: Tags,
}

/// Lifecycle state of a stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackStatus {
    /// Stack creation is running
    CreateInProgress,
    /// Stack was created successfully
    CreateComplete,
    /// Stack creation failed
    CreateFailed,
    /// Stack update is running
    UpdateInProgress,
    /// Stack was updated successfully
    UpdateComplete,
    /// Stack update failed and was rolled back
    UpdateRollbackComplete,
    /// Stack deletion is running
    DeleteInProgress,
    /// Stack is gone
    DeleteComplete,
    /// Any other state the cloud reports
    Other(String),
}

impl StackStatus {
    /// Whether a stack operation is still running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::CreateInProgress | Self::UpdateInProgress | Self::DeleteInProgress
        )
    }

    /// Whether the stack can be updated.
    #[must_use]
    pub fn is_updatable(&self) -> bool {
        matches!(
            self,
            Self::CreateComplete | Self::UpdateComplete | Self::UpdateRollbackComplete
        )
    }
}

/// A stack as reported by the cloud.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack {
    /// Stack name
    pub name: String,
    /// Lifecycle state
    pub status: StackStatus,
    /// Stack outputs
    pub outputs: BTreeMap<String, String>,
}

/// Input for creating or updating a stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackInput {
    /// Stack name
    pub name: String,
    /// Location of the uploaded template body
    pub template_url: String,
    /// Tags applied to the stack and propagated to its resources
    pub tags: Tags,
}

/// Compute API (VPCs, subnets, routing, volumes).
#[async_trait]
pub trait Ec2: Send + Sync {
    /// Describe VPCs matching all filters.
    async fn describe_vpcs(&self, filters: &[TagFilter]) -> Result<Vec<Vpc>>;

    /// Describe the subnets of `vpc_id` matching all filters.
    async fn describe_subnets(&self, vpc_id: &str, filters: &[TagFilter])
        -> Result<Vec<Subnet>>;

    /// Describe route tables matching all filters.
    async fn describe_route_tables(&self, filters: &[TagFilter]) -> Result<Vec<RouteTable>>;

    /// Describe NAT gateways in a VPC.
    async fn describe_nat_gateways(&self, vpc_id: &str) -> Result<Vec<NatGateway>>;

    /// Describe volumes matching all filters.
    async fn describe_volumes(&self, filters: &[TagFilter]) -> Result<Vec<Volume>>;

    /// Detach a volume from every instance it is attached to.
    async fn detach_volume(&self, volume_id: &str, force: bool) -> Result<()>;

    /// Delete a detached volume.
    async fn delete_volume(&self, volume_id: &str) -> Result<()>;
}

/// Stack API.
#[async_trait]
pub trait CloudFormation: Send + Sync {
    /// Describe a stack. `Ok(None)` when it does not exist.
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>>;

    /// Start creating a stack.
    async fn create_stack(&self, input: &StackInput) -> Result<()>;

    /// Block until a stack finished creating.
    async fn wait_until_created(&self, name: &str) -> Result<()>;

    /// Start updating a stack.
    async fn update_stack(&self, input: &StackInput) -> Result<()>;

    /// Start deleting a stack.
    async fn delete_stack(&self, name: &str) -> Result<()>;
}

/// DNS API.
#[async_trait]
pub trait Route53: Send + Sync {
    /// Id of the hosted zone with this exact name. `Ok(None)` when absent.
    async fn find_hosted_zone(&self, name: &str) -> Result<Option<String>>;
}

/// Identity API.
#[async_trait]
pub trait Iam: Send + Sync {
    /// ARN of a role. Returns `NotFound` when the role does not exist.
    async fn get_role_arn(&self, name: &str) -> Result<String>;
}

/// Object storage API.
#[async_trait]
pub trait S3: Send + Sync {
    /// Whether a bucket exists and is reachable.
    async fn head_bucket(&self, bucket: &str) -> Result<bool>;

    /// Upload an object and return its URL.
    async fn put_object(&self, bucket: &str, key: &str, body: &str) -> Result<String>;
}

/// Renders stack template bodies from parameters.
///
/// The engine never inspects the rendered body.
pub trait TemplateRenderer: Send + Sync {
    /// Render a template body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the parameters cannot be rendered.
    fn render(&self, parameters: &serde_json::Value) -> Result<String>;
}

/// Clients bound to the control plane account.
#[derive(Clone)]
pub struct ControlPlaneClients {
    /// Compute API
    pub ec2: Arc<dyn Ec2>,
    /// Identity API
    pub iam: Arc<dyn Iam>,
}

/// Clients bound to the tenant cluster account.
#[derive(Clone)]
pub struct TenantClusterClients {
    /// Compute API
    pub ec2: Arc<dyn Ec2>,
    /// Stack API
    pub cloudformation: Arc<dyn CloudFormation>,
    /// DNS API
    pub route53: Arc<dyn Route53>,
    /// Object storage API
    pub s3: Arc<dyn S3>,
}

/// Every cloud client the pipelines need.
#[derive(Clone)]
pub struct CloudClients {
    /// Control plane account
    pub control_plane: ControlPlaneClients,
    /// Tenant cluster account
    pub tenant_cluster: TenantClusterClients,
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod cloud_tests;

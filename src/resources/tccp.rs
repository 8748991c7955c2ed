// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tenant cluster control plane stack (`tccp`).
//!
//! The stack is rendered from parameters collected by the discovery steps and
//! the zone allocation. Its outputs record the operator version and the
//! checksum of the parameters it was rendered from, so drift is detected
//! without reading the template back.
//!
//! # Lifecycle
//!
//! - missing stack: upload the rendered template, create, wait for completion
//! - operator version or parameter checksum differs: upload and update
//! - stack operation in progress: cancel the pass, keep the finalizer, and
//!   look again later
//! - failed creation or an unknown state: `ExecutionFailed` in the create pass
//! - delete pass: delete the stack whatever its terminal state, then keep the
//!   finalizer and cancel until the stack is gone

use crate::cloud::{CloudFormation, StackInput, StackStatus, Tags, TemplateRenderer, S3};
use crate::constants::{STACK_OUTPUT_OPERATOR_VERSION, STACK_OUTPUT_PARAMETERS_CHECKSUM};
use crate::context::{ContextField, ScratchContext, TccpStatus, TenantCluster};
use crate::errors::{ReconcileError, Result};
use crate::labels::{
    tccp_stack_name, template_bucket_name, STACK_TCCP, TAG_CLUSTER, TAG_INSTALLATION,
    TAG_ORGANIZATION, TAG_STACK,
};
use crate::pipeline::crud::{CrudOperations, Patch};
use crate::pipeline::PassKind;
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Step name
pub const NAME: &str = "tccp";

/// Observed or desired control plane stack.
#[derive(Clone, Debug, PartialEq)]
pub struct StackState {
    /// Stack name
    pub name: String,
    /// Operator version that rendered the stack
    pub operator_version: String,
    /// Checksum of the rendering parameters
    pub parameters_checksum: String,
    /// Rendering parameters. `Null` for observed stacks.
    pub parameters: Value,
    /// Lifecycle state. `None` for desired stacks.
    pub status: Option<StackStatus>,
}

/// The `tccp` step.
pub struct TenantClusterControlPlane {
    cloudformation: Arc<dyn CloudFormation>,
    s3: Arc<dyn S3>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl TenantClusterControlPlane {
    /// Create the step using the tenant account's stack and storage APIs.
    pub fn new(
        cloudformation: Arc<dyn CloudFormation>,
        s3: Arc<dyn S3>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            cloudformation,
            s3,
            renderer,
        }
    }

    /// Upload the rendered template and return the stack input pointing at it.
    async fn upload(&self, cluster: &TenantCluster, state: &StackState) -> Result<StackInput> {
        let bucket = template_bucket_name(&cluster.installation, cluster.id());
        if !self.s3.head_bucket(&bucket).await? {
            return Err(ReconcileError::not_found("S3 bucket", bucket));
        }

        let body = self.renderer.render(&json!({
            "parameters": state.parameters,
            "outputs": {
                STACK_OUTPUT_OPERATOR_VERSION: state.operator_version,
                STACK_OUTPUT_PARAMETERS_CHECKSUM: state.parameters_checksum,
            },
        }))?;

        let key = format!("cloudformation/{}.json", state.name);
        let template_url = self.s3.put_object(&bucket, &key, &body).await?;
        debug!(cluster = %cluster.id(), url = %template_url, "Uploaded stack template");

        Ok(StackInput {
            name: state.name.clone(),
            template_url,
            tags: stack_tags(cluster),
        })
    }
}

/// Tags applied to the stack and propagated to its resources.
#[must_use]
pub fn stack_tags(cluster: &TenantCluster) -> Tags {
    let mut tags = Tags::new();
    tags.insert(TAG_CLUSTER.to_string(), cluster.id().to_string());
    tags.insert(TAG_INSTALLATION.to_string(), cluster.installation.clone());
    tags.insert(TAG_STACK.to_string(), STACK_TCCP.to_string());
    if let Some(organization) = &cluster.organization {
        tags.insert(TAG_ORGANIZATION.to_string(), organization.clone());
    }
    tags
}

/// Hex SHA-256 of the canonical JSON form of `parameters`.
#[must_use]
pub fn parameters_checksum(parameters: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parameters.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Rendering parameters of the control plane stack.
///
/// # Errors
///
/// Returns `NotFound` if a discovered input is missing from the context.
pub fn stack_parameters(cluster: &TenantCluster, ctx: &ScratchContext) -> Result<Value> {
    let control_plane = &ctx.status.control_plane;
    let tenant = &ctx.status.tenant_cluster;

    let peer_role_arn = control_plane
        .peer_role_arn
        .as_deref()
        .ok_or_else(|| ReconcileError::not_found("context field", "peer role ARN"))?;
    let hosted_zones = tenant
        .hosted_zones
        .as_ref()
        .ok_or_else(|| ReconcileError::not_found("context field", "hosted zones"))?;
    let encryption_key = tenant
        .encryption_key
        .as_deref()
        .ok_or_else(|| ReconcileError::not_found("context field", "encryption key"))?;

    Ok(json!({
        "clusterId": cluster.id(),
        "installation": cluster.installation,
        "organization": cluster.organization,
        "region": cluster.cluster.region,
        "baseDomain": cluster.cluster.base_domain,
        "network": {
            "cidrBlock": cluster.cluster.network.cidr_block,
        },
        "controlPlane": {
            "peerRoleArn": peer_role_arn,
            "routeTables": control_plane.route_tables,
            "instanceType": cluster.control_plane.as_ref().map(|cp| cp.instance_type.as_str()),
        },
        "tenantCluster": {
            "hostedZones": {
                "public": hosted_zones.public_id,
                "internal": hosted_zones.internal_id,
            },
            "encryptionKey": encryption_key,
            "natGatewayAddresses": tenant.nat_gateway_addresses,
            "availabilityZones": ctx.spec.tenant_cluster.availability_zones,
        },
    }))
}

#[async_trait]
impl CrudOperations for TenantClusterControlPlane {
    type State = StackState;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_current_state(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<Option<StackState>> {
        let name = tccp_stack_name(cluster.id());

        let stack = match self.cloudformation.describe_stack(&name).await? {
            Some(stack) if stack.status != StackStatus::DeleteComplete => stack,
            _ => {
                debug!(cluster = %cluster.id(), stack = %name, "Control plane stack does not exist");
                ctx.status.tenant_cluster.tccp = TccpStatus::default();
                return Ok(None);
            }
        };

        // The finalizer flag is only consulted after delete passes.
        if stack.status.is_in_progress() {
            info!(
                cluster = %cluster.id(),
                stack = %name,
                status = ?stack.status,
                "Stack operation in progress, cancelling pass"
            );
            ctx.keep_finalizer();
            ctx.cancel_pass();
            return Ok(None);
        }

        let operator_version = stack
            .outputs
            .get(STACK_OUTPUT_OPERATOR_VERSION)
            .cloned()
            .unwrap_or_default();
        let parameters_checksum = stack
            .outputs
            .get(STACK_OUTPUT_PARAMETERS_CHECKSUM)
            .cloned()
            .unwrap_or_default();

        ctx.status.tenant_cluster.tccp = TccpStatus {
            exists: true,
            operator_version: Some(operator_version.clone()),
        };

        Ok(Some(StackState {
            name,
            operator_version,
            parameters_checksum,
            parameters: Value::Null,
            status: Some(stack.status),
        }))
    }

    async fn get_desired_state(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<Option<StackState>> {
        // Delete passes never allocate zones; nothing is desired then.
        if ctx.spec.tenant_cluster.availability_zones.is_empty() {
            return Ok(None);
        }

        let parameters = stack_parameters(cluster, ctx)?;
        Ok(Some(StackState {
            name: tccp_stack_name(cluster.id()),
            operator_version: cluster.operator_version.clone(),
            parameters_checksum: parameters_checksum(&parameters),
            parameters,
            status: None,
        }))
    }

    fn new_update_patch(
        &self,
        current: Option<&StackState>,
        desired: Option<&StackState>,
    ) -> Result<Patch<StackState>> {
        let Some(desired) = desired else {
            return Ok(Patch::default());
        };

        if let Some(status) = current.and_then(|c| c.status.as_ref()) {
            if !status.is_updatable() {
                return Err(ReconcileError::execution_failed(format!(
                    "stack '{}' is in state {status:?}",
                    desired.name
                )));
            }
        }

        Ok(match current {
            None => Patch::create(desired.clone()),
            Some(current)
                if current.operator_version != desired.operator_version
                    || current.parameters_checksum != desired.parameters_checksum =>
            {
                Patch::update(desired.clone())
            }
            Some(_) => Patch::default(),
        })
    }

    fn new_delete_patch(
        &self,
        current: Option<&StackState>,
        _desired: Option<&StackState>,
    ) -> Result<Patch<StackState>> {
        Ok(current.map_or_else(Patch::default, |c| Patch::delete(c.clone())))
    }

    async fn apply_create_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &StackState,
    ) -> Result<()> {
        let input = self.upload(cluster, state).await?;

        info!(cluster = %cluster.id(), stack = %state.name, "Creating control plane stack");
        self.cloudformation.create_stack(&input).await?;
        self.cloudformation.wait_until_created(&state.name).await?;
        info!(cluster = %cluster.id(), stack = %state.name, "Created control plane stack");

        ctx.status.tenant_cluster.tccp = TccpStatus {
            exists: true,
            operator_version: Some(state.operator_version.clone()),
        };
        Ok(())
    }

    async fn apply_update_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &StackState,
    ) -> Result<()> {
        let input = self.upload(cluster, state).await?;

        info!(
            cluster = %cluster.id(),
            stack = %state.name,
            operator_version = %state.operator_version,
            "Updating control plane stack"
        );
        self.cloudformation.update_stack(&input).await?;

        ctx.status.tenant_cluster.tccp = TccpStatus {
            exists: true,
            operator_version: Some(state.operator_version.clone()),
        };
        Ok(())
    }

    async fn apply_delete_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &StackState,
    ) -> Result<()> {
        if let Some(status) = state.status.as_ref().filter(|s| !s.is_updatable()) {
            warn!(
                cluster = %cluster.id(),
                stack = %state.name,
                status = ?status,
                "Deleting control plane stack in a failed state"
            );
        }

        info!(cluster = %cluster.id(), stack = %state.name, "Deleting control plane stack");
        self.cloudformation.delete_stack(&state.name).await?;

        // Deletion runs asynchronously; the pass completes once the stack is gone.
        ctx.keep_finalizer();
        ctx.cancel_pass();
        Ok(())
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        match kind {
            PassKind::Create => &[
                ContextField::PeerRoleArn,
                ContextField::RouteTables,
                ContextField::NatGatewayAddresses,
                ContextField::HostedZones,
                ContextField::EncryptionKey,
                ContextField::SpecAvailabilityZones,
            ],
            PassKind::Delete => &[],
        }
    }

    fn writes(&self, _kind: PassKind) -> &'static [ContextField] {
        &[ContextField::TccpStack]
    }
}

#[cfg(test)]
#[path = "tccp_tests.rs"]
mod tccp_tests;

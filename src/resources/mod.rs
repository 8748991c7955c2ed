// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation steps and the stock pipelines built from them.
//!
//! # Create Pass
//!
//! | Step | Reads | Writes |
//! |------|-------|--------|
//! | [`peerrolearn`] | | peer role ARN |
//! | [`cproutetables`] | | route tables |
//! | [`tcvpc`] | | VPC |
//! | [`tcsubnets`] | VPC | subnets |
//! | [`tcnatgateways`] | VPC | NAT gateway addresses |
//! | [`hostedzones`] | | hosted zones |
//! | [`encryption`] | | encryption key |
//! | [`tcaz`] | subnets | zone mappings |
//! | [`tccp`] | everything above | stack status |
//!
//! # Delete Pass
//!
//! [`nodepoolguard`], [`tcvpc`], [`tcsubnets`], [`tccp`], [`cleanupvolumes`].
//!
//! Every step is wrapped with `with_metrics(with_retry(step))`.

pub mod cleanupvolumes;
pub mod cproutetables;
pub mod encryption;
pub mod hostedzones;
pub mod nodepoolguard;
pub mod peerrolearn;
pub mod tcaz;
pub mod tccp;
pub mod tcnatgateways;
pub mod tcsubnets;
pub mod tcvpc;

use crate::cache::TtlCache;
use crate::cloud::{CloudClients, TemplateRenderer};
use crate::encrypter::Encrypter;
use crate::pipeline::crud::CrudResource;
use crate::pipeline::metrics::with_metrics;
use crate::pipeline::retry::{with_retry, RetryConfig};
use crate::pipeline::{PassKind, Pipeline, Resource};
use std::sync::Arc;
use std::time::Duration;

/// Collaborators and settings the stock steps are built from.
#[derive(Clone)]
pub struct StepDependencies {
    /// Cloud API clients of both accounts
    pub clients: CloudClients,
    /// Encryption key backend
    pub encrypter: Arc<dyn Encrypter>,
    /// Stack template renderer
    pub renderer: Arc<dyn TemplateRenderer>,
    /// Names of the control plane route tables to peer with
    pub route_table_names: Vec<String>,
    /// CNI pool used when a cluster does not set one
    pub default_cni_cidr: Option<String>,
    /// Lifetime of discovery cache entries
    pub cache_ttl: Duration,
    /// Retry parameters of every step
    pub retry: RetryConfig,
}

fn decorate(step: Box<dyn Resource>, retry: &RetryConfig) -> Box<dyn Resource> {
    with_metrics(with_retry(step, retry))
}

/// Steps of the create/update pass, in order.
#[must_use]
pub fn create_pipeline(deps: &StepDependencies) -> Pipeline {
    let control_plane = &deps.clients.control_plane;
    let tenant = &deps.clients.tenant_cluster;

    let steps: Vec<Box<dyn Resource>> = vec![
        Box::new(peerrolearn::PeerRoleArn::new(control_plane.iam.clone())),
        Box::new(cproutetables::ControlPlaneRouteTables::new(
            control_plane.ec2.clone(),
            deps.route_table_names.clone(),
            Arc::new(TtlCache::new("route_tables", deps.cache_ttl)),
        )),
        Box::new(tcvpc::TenantClusterVpc::new(tenant.ec2.clone())),
        Box::new(tcsubnets::TenantClusterSubnets::new(tenant.ec2.clone())),
        Box::new(tcnatgateways::TenantClusterNatGateways::new(tenant.ec2.clone())),
        Box::new(hostedzones::TenantClusterHostedZones::new(
            tenant.route53.clone(),
            Arc::new(TtlCache::new("hosted_zones", deps.cache_ttl)),
        )),
        Box::new(encryption::EncryptionKey::new(deps.encrypter.clone())),
        Box::new(tcaz::TenantClusterAvailabilityZones::new(
            deps.default_cni_cidr.clone(),
        )),
        Box::new(control_plane_stack(deps)),
    ];

    Pipeline::new(
        PassKind::Create,
        steps.into_iter().map(|s| decorate(s, &deps.retry)).collect(),
    )
}

/// Steps of the delete pass, in order.
#[must_use]
pub fn delete_pipeline(deps: &StepDependencies) -> Pipeline {
    let tenant = &deps.clients.tenant_cluster;

    let steps: Vec<Box<dyn Resource>> = vec![
        Box::new(nodepoolguard::NodePoolGuard),
        Box::new(tcvpc::TenantClusterVpc::new(tenant.ec2.clone())),
        Box::new(tcsubnets::TenantClusterSubnets::new(tenant.ec2.clone())),
        Box::new(control_plane_stack(deps)),
        Box::new(cleanupvolumes::CleanupVolumes::new(tenant.ec2.clone())),
    ];

    Pipeline::new(
        PassKind::Delete,
        steps.into_iter().map(|s| decorate(s, &deps.retry)).collect(),
    )
}

fn control_plane_stack(deps: &StepDependencies) -> CrudResource<tccp::TenantClusterControlPlane> {
    let tenant = &deps.clients.tenant_cluster;
    CrudResource::new(tccp::TenantClusterControlPlane::new(
        tenant.cloudformation.clone(),
        tenant.s3.clone(),
        deps.renderer.clone(),
    ))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions watched by the reconciler.
//!
//! The engine treats these objects as read-only input. They describe what a
//! tenant cluster should look like; the pipeline converges cloud resources
//! toward that description.
//!
//! # Resource Types
//!
//! - [`AWSCluster`] - The tenant cluster: region, DNS, and network ranges
//! - [`AWSControlPlane`] - Control plane placement (one per cluster)
//! - [`AWSMachineDeployment`] - A node pool (zero or more per cluster)
//!
//! Control planes and node pools are linked to their cluster through the
//! `giantswarm.io/cluster` label.
//!
//! # Example
//!
//! ```rust,no_run
//! use tenant_reconciler::crd::{AWSClusterSpec, ClusterNetwork};
//!
//! let spec = AWSClusterSpec {
//!     description: Some("production cluster".to_string()),
//!     region: "eu-central-1".to_string(),
//!     base_domain: "abc12.k8s.example.com".to_string(),
//!     network: ClusterNetwork {
//!         cidr_block: "10.100.8.0/24".to_string(),
//!         pods_cidr_block: None,
//!     },
//! };
//! ```

use crate::labels::{LABEL_CLUSTER, LABEL_OPERATOR_VERSION, LABEL_ORGANIZATION};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Network ranges of a tenant cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    /// Tenant network the control plane subnets are carved from.
    ///
    /// Split into four equal blocks, one per availability zone.
    pub cidr_block: String,

    /// Pod network (CNI) pool. Defaults to `172.17.0.0/16`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods_cidr_block: Option<String>,
}

/// `AWSCluster` describes one tenant cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.giantswarm.io",
    version = "v1alpha3",
    kind = "AWSCluster",
    namespaced,
    shortname = "awsc",
    doc = "AWSCluster describes the infrastructure of one tenant cluster",
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"Network","type":"string","jsonPath":".spec.network.cidrBlock"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AWSClusterSpec {
    /// Free-form description shown to cluster users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cloud region the cluster runs in.
    pub region: String,

    /// Base DNS domain of the cluster. The public hosted zone has this name,
    /// the internal one is `internal.<baseDomain>`.
    pub base_domain: String,

    /// Network ranges.
    pub network: ClusterNetwork,
}

/// `AWSControlPlane` describes where the control plane runs.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.giantswarm.io",
    version = "v1alpha3",
    kind = "AWSControlPlane",
    namespaced,
    shortname = "awscp",
    doc = "AWSControlPlane describes the control plane placement of a tenant cluster"
)]
#[serde(rename_all = "camelCase")]
pub struct AWSControlPlaneSpec {
    /// Availability zones the control plane nodes are spread over.
    #[serde(default)]
    pub availability_zones: Vec<String>,

    /// Instance type of the control plane nodes.
    pub instance_type: String,
}

/// Scaling bounds of a node pool.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolScaling {
    /// Minimum number of nodes.
    pub min: i32,
    /// Maximum number of nodes.
    pub max: i32,
}

/// `AWSMachineDeployment` describes one node pool.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.giantswarm.io",
    version = "v1alpha3",
    kind = "AWSMachineDeployment",
    namespaced,
    shortname = "awsmd",
    doc = "AWSMachineDeployment describes one node pool of a tenant cluster"
)]
#[serde(rename_all = "camelCase")]
pub struct AWSMachineDeploymentSpec {
    /// Availability zones the node pool spans.
    #[serde(default)]
    pub availability_zones: Vec<String>,

    /// Instance type of the node pool workers.
    pub instance_type: String,

    /// Autoscaling bounds.
    #[serde(default)]
    pub scaling: NodePoolScaling,
}

impl AWSCluster {
    /// Cluster id used to tag cloud resources. This is the object name.
    #[must_use]
    pub fn cluster_id(&self) -> String {
        self.name_any()
    }

    /// Organization owning the cluster, from the `giantswarm.io/organization` label.
    #[must_use]
    pub fn organization(&self) -> Option<String> {
        self.labels().get(LABEL_ORGANIZATION).cloned()
    }

    /// Operator version responsible for the cluster.
    #[must_use]
    pub fn operator_version(&self) -> Option<String> {
        self.labels().get(LABEL_OPERATOR_VERSION).cloned()
    }
}

/// Label selector matching the control plane and node pools of a cluster.
#[must_use]
pub fn cluster_selector(cluster_id: &str) -> String {
    format!("{LABEL_CLUSTER}={cluster_id}")
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;

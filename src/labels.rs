// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label, tag, and finalizer constants shared by every reconciliation step.
//!
//! Cloud resource tags are the only durable state the engine relies on: they
//! record which cluster, installation, and stack owns a resource, and which
//! role a subnet plays inside its availability zone.

// ============================================================================
// Kubernetes Labels (watched resources)
// ============================================================================

/// Label linking control planes and node pools to their cluster
pub const LABEL_CLUSTER: &str = "giantswarm.io/cluster";

/// Label carrying the organization owning the cluster
pub const LABEL_ORGANIZATION: &str = "giantswarm.io/organization";

/// Label selecting the operator version responsible for the cluster
pub const LABEL_OPERATOR_VERSION: &str = "aws-operator.giantswarm.io/version";

// ============================================================================
// Cloud Resource Tags
// ============================================================================

/// Tag identifying the tenant cluster owning a cloud resource
pub const TAG_CLUSTER: &str = "giantswarm.io/cluster";

/// Tag identifying the installation owning a cloud resource
pub const TAG_INSTALLATION: &str = "giantswarm.io/installation";

/// Tag identifying the organization owning a cloud resource
pub const TAG_ORGANIZATION: &str = "giantswarm.io/organization";

/// Tag identifying the stack that created a cloud resource
pub const TAG_STACK: &str = "giantswarm.io/stack";

/// Tag identifying the role of a subnet within its availability zone
pub const TAG_SUBNET_TYPE: &str = "giantswarm.io/subnet-type";

/// Conventional tag carrying a human-readable resource name
pub const TAG_NAME: &str = "Name";

// ============================================================================
// Stack Tag Values
// ============================================================================

/// Tenant cluster control plane stack
pub const STACK_TCCP: &str = "tccp";

/// Tenant cluster control plane finalizer stack
pub const STACK_TCCPF: &str = "tccpf";

/// Tenant cluster control plane initializer stack
pub const STACK_TCCPI: &str = "tccpi";

/// Tenant cluster control plane nodes stack
pub const STACK_TCCPN: &str = "tccpn";

/// Tenant cluster node pool stack
pub const STACK_TCNP: &str = "tcnp";

/// Tenant cluster node pool finalizer stack
pub const STACK_TCNPF: &str = "tcnpf";

/// Every stack value the engine recognises on a cloud resource
pub const KNOWN_STACKS: [&str; 6] = [
    STACK_TCCP,
    STACK_TCCPF,
    STACK_TCCPI,
    STACK_TCCPN,
    STACK_TCNP,
    STACK_TCNPF,
];

/// Stacks whose subnets belong to the control plane network partition
pub const CONTROL_PLANE_STACKS: [&str; 4] = [STACK_TCCP, STACK_TCCPF, STACK_TCCPI, STACK_TCCPN];

// ============================================================================
// Subnet Type Tag Values
// ============================================================================

/// Public subnet (internet-facing load balancers, NAT gateways)
pub const SUBNET_TYPE_PUBLIC: &str = "public";

/// Private subnet (control plane and worker nodes)
pub const SUBNET_TYPE_PRIVATE: &str = "private";

/// Pod network subnet used by the AWS CNI
pub const SUBNET_TYPE_AWS_CNI: &str = "aws-cni";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `AWSCluster` resources
pub const FINALIZER_AWS_CLUSTER: &str = "operatorkit.giantswarm.io/aws-operator-cluster-controller";

/// Name of the tenant cluster control plane stack for a cluster id
#[must_use]
pub fn tccp_stack_name(cluster_id: &str) -> String {
    format!("cluster-{cluster_id}-{STACK_TCCP}")
}

/// Name of the bucket rendered templates are uploaded to before stack operations
#[must_use]
pub fn template_bucket_name(installation: &str, cluster_id: &str) -> String {
    format!("{installation}-g8s-{cluster_id}")
}

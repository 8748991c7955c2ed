// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the tenant reconciler.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the watched infrastructure CRDs
pub const API_GROUP: &str = "infrastructure.giantswarm.io";

/// API version of the watched infrastructure CRDs
pub const API_VERSION: &str = "v1alpha3";

/// Kind name for `AWSCluster` resource
pub const KIND_AWS_CLUSTER: &str = "AWSCluster";

/// Kind name for `AWSControlPlane` resource
pub const KIND_AWS_CONTROL_PLANE: &str = "AWSControlPlane";

/// Kind name for `AWSMachineDeployment` resource
pub const KIND_AWS_MACHINE_DEPLOYMENT: &str = "AWSMachineDeployment";

// ============================================================================
// Network Allocation Constants
// ============================================================================

/// Maximum number of availability zones a tenant cluster may span.
///
/// The tenant network and the CNI pool are both split into this many blocks,
/// independent of how many zones are actually in use.
pub const MAX_AZS: usize = 4;

/// Default CIDR of the pod network (CNI) pool when the cluster does not set one
pub const DEFAULT_CNI_CIDR: &str = "172.17.0.0/16";

// ============================================================================
// Stack Constants
// ============================================================================

/// Stack output carrying the operator version that last rendered the stack
pub const STACK_OUTPUT_OPERATOR_VERSION: &str = "OperatorVersion";

/// Stack output carrying the checksum of the parameters the stack was rendered from
pub const STACK_OUTPUT_PARAMETERS_CHECKSUM: &str = "ParametersChecksum";

/// Suffix of the IAM role the control plane assumes for VPC peering
pub const PEER_ACCESS_ROLE_SUFFIX: &str = "vpc-peer-access";

/// Tag key Kubernetes puts on cloud volumes it provisions for a cluster
pub const KUBERNETES_CLUSTER_TAG_PREFIX: &str = "kubernetes.io/cluster/";

/// Tag value Kubernetes uses for cluster-owned cloud resources
pub const KUBERNETES_CLUSTER_TAG_OWNED: &str = "owned";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue after a completed create/update pass (5 minutes)
pub const DEFAULT_REQUEUE_READY_SECS: u64 = 300;

/// Requeue while a delete pass keeps the finalizer (60 seconds)
pub const DEFAULT_REQUEUE_NOT_READY_SECS: u64 = 60;

/// Requeue after a cancelled pass (30 seconds)
pub const DEFAULT_REQUEUE_CANCELLED_SECS: u64 = 30;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

// ============================================================================
// Retry Constants
// ============================================================================

/// Initial retry interval (100ms)
pub const RETRY_INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
pub const RETRY_MAX_INTERVAL_SECS: u64 = 30;

/// Maximum total time to spend retrying one step invocation (5 minutes)
pub const RETRY_MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Maximum attempts per step invocation before giving up for this pass
pub const RETRY_MAX_ATTEMPTS: u32 = 5;

/// Backoff multiplier (exponential growth factor)
pub const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Jitter applied to each retry interval (±10%)
pub const RETRY_RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Cache Constants
// ============================================================================

/// Default lifetime of discovery cache entries (60 seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for the reconciliation engine.
//!
//! Every step returns the most specific [`ReconcileError`] kind it can. The
//! kind decides what happens next:
//!
//! - **Fatal** kinds (`InvalidConfig`, `ExecutionFailed`, `TooManyObjects`) abort
//!   the pass immediately and are never retried by the retry decorator.
//! - **`NotFound`** is an expected, transient absence. The pipeline turns it into
//!   a pass cancellation instead of a failure.
//! - Everything else is retryable with exponential backoff.

use thiserror::Error;

/// Result alias used by every step and collaborator contract.
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

/// Closed set of error kinds produced while reconciling a tenant cluster.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A resource the step depends on does not exist yet.
    ///
    /// Expected during provisioning, e.g. while a stack is still being created.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of the missing resource (e.g. `VPC`, `IAM role`)
        kind: String,
        /// Name or identifier of the missing resource
        name: String,
    },

    /// Operator or caller misconfiguration. Must be fixed by a human.
    ///
    /// Examples: exhausted subnet pool, malformed CIDR, too many availability zones.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Explanation of what is invalid
        reason: String,
    },

    /// Unexpected cardinality or state in the cloud that needs operator intervention.
    ///
    /// Example: "expected exactly one VPC, found 2".
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Explanation of the unexpected state
        reason: String,
    },

    /// A cloud resource is still referenced by something else. Clears on its own.
    #[error("dependency violation on {resource}: {reason}")]
    DependencyViolation {
        /// Identifier of the resource that cannot be removed yet
        resource: String,
        /// Reason reported by the cloud API
        reason: String,
    },

    /// One or more volumes are still attached. Clears once detach completes.
    #[error("volume(s) still attached: {}", volume_ids.join(", "))]
    VolumeAttached {
        /// Volume ids that could not be detached or deleted this invocation
        volume_ids: Vec<String>,
    },

    /// More than one instance of a singleton custom resource was found.
    #[error("expected at most one {kind} for cluster '{cluster}', found {count}")]
    TooManyObjects {
        /// Kind of the singleton resource
        kind: String,
        /// Cluster id the resources belong to
        cluster: String,
        /// Number of objects found
        count: usize,
    },

    /// Transient failure reported by a cloud API collaborator.
    #[error("{service} call '{operation}' failed: {reason}")]
    Cloud {
        /// Cloud service (e.g. `ec2`, `cloudformation`)
        service: String,
        /// Operation that failed (e.g. `DescribeSubnets`)
        operation: String,
        /// Reason reported by the collaborator
        reason: String,
    },

    /// Kubernetes API failure while reading watched objects.
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl ReconcileError {
    /// Create a `NotFound` error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an `ExecutionFailed` error.
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Create a `Cloud` error.
    pub fn cloud(
        service: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Cloud {
            service: service.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Fatal errors abort the pass and are never retried automatically.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidConfig { .. }
            | Self::ExecutionFailed { .. }
            | Self::TooManyObjects { .. } => true,
            Self::NotFound { .. }
            | Self::DependencyViolation { .. }
            | Self::VolumeAttached { .. }
            | Self::Cloud { .. }
            | Self::Kube(_) => false,
        }
    }

    /// `NotFound` cancels the pass rather than failing it.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the retry decorator should re-invoke the step.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal() && !self.is_not_found()
    }

    /// Stable label used for the `error_type` metric dimension.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::DependencyViolation { .. } => "dependency_violation",
            Self::VolumeAttached { .. } => "volume_attached",
            Self::TooManyObjects { .. } => "too_many_objects",
            Self::Cloud { .. } => "cloud_error",
            Self::Kube(_) => "kube_error",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_not_found_message() {
        let err = ReconcileError::not_found("VPC", "cluster-abc12");
        assert_eq!(err.to_string(), "VPC 'cluster-abc12' not found");
        assert!(err.is_not_found());
        assert!(!err.is_fatal());
        assert!(!err.is_retryable(), "NotFound cancels the pass, it is not retried");
    }

    #[test]
    fn test_fatal_kinds_are_not_retryable() {
        let fatal = [
            ReconcileError::invalid_config("no free subnet for eu-central-1d"),
            ReconcileError::execution_failed("expected exactly one VPC, found 2"),
            ReconcileError::TooManyObjects {
                kind: "AWSControlPlane".to_string(),
                cluster: "abc12".to_string(),
                count: 2,
            },
        ];

        for err in &fatal {
            assert!(err.is_fatal(), "{err} should be fatal");
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn test_transient_kinds_are_retryable() {
        let transient = [
            ReconcileError::DependencyViolation {
                resource: "sg-123".to_string(),
                reason: "in use by eni-456".to_string(),
            },
            ReconcileError::VolumeAttached {
                volume_ids: vec!["vol-2".to_string()],
            },
            ReconcileError::cloud("ec2", "DescribeSubnets", "throttled"),
        ];

        for err in &transient {
            assert!(!err.is_fatal(), "{err} should not be fatal");
            assert!(err.is_retryable(), "{err} should be retryable");
        }
    }

    #[test]
    fn test_volume_attached_lists_all_ids() {
        let err = ReconcileError::VolumeAttached {
            volume_ids: vec!["vol-1".to_string(), "vol-3".to_string()],
        };
        assert_eq!(err.to_string(), "volume(s) still attached: vol-1, vol-3");
    }

    #[test]
    fn test_too_many_objects_message() {
        let err = ReconcileError::TooManyObjects {
            kind: "AWSControlPlane".to_string(),
            cluster: "abc12".to_string(),
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "expected at most one AWSControlPlane for cluster 'abc12', found 3"
        );
    }

    #[test]
    fn test_metric_labels_are_distinct() {
        let labels = [
            ReconcileError::not_found("a", "b").metric_label(),
            ReconcileError::invalid_config("x").metric_label(),
            ReconcileError::execution_failed("x").metric_label(),
            ReconcileError::DependencyViolation {
                resource: String::new(),
                reason: String::new(),
            }
            .metric_label(),
            ReconcileError::VolumeAttached { volume_ids: vec![] }.metric_label(),
            ReconcileError::TooManyObjects {
                kind: String::new(),
                cluster: String::new(),
                count: 0,
            }
            .metric_label(),
            ReconcileError::cloud("s", "o", "r").metric_label(),
        ];

        let unique: std::collections::BTreeSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{AWSCluster, AWSClusterSpec, ClusterNetwork};
    use crate::labels::FINALIZER_AWS_CLUSTER;

    fn cluster(finalizers: Option<Vec<&str>>) -> AWSCluster {
        let mut cluster = AWSCluster::new(
            "abc12",
            AWSClusterSpec {
                description: None,
                region: "eu-central-1".to_string(),
                base_domain: "abc12.k8s.example.com".to_string(),
                network: ClusterNetwork {
                    cidr_block: "10.100.8.0/24".to_string(),
                    pods_cidr_block: None,
                },
            },
        );
        cluster.metadata.namespace = Some("default".to_string());
        cluster.metadata.finalizers =
            finalizers.map(|f| f.into_iter().map(ToString::to_string).collect());
        cluster
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&cluster(None), FINALIZER_AWS_CLUSTER));
        assert!(!has_finalizer(&cluster(Some(vec!["other"])), FINALIZER_AWS_CLUSTER));
        assert!(has_finalizer(
            &cluster(Some(vec!["other", FINALIZER_AWS_CLUSTER])),
            FINALIZER_AWS_CLUSTER
        ));
    }

    #[test]
    fn test_with_finalizer_appends_once() {
        let added = with_finalizer(&cluster(Some(vec!["other"])), FINALIZER_AWS_CLUSTER);
        assert_eq!(added, vec!["other", FINALIZER_AWS_CLUSTER]);

        let again = with_finalizer(
            &cluster(Some(vec![FINALIZER_AWS_CLUSTER])),
            FINALIZER_AWS_CLUSTER,
        );
        assert_eq!(again, vec![FINALIZER_AWS_CLUSTER]);
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let removed = without_finalizer(
            &cluster(Some(vec!["other", FINALIZER_AWS_CLUSTER])),
            FINALIZER_AWS_CLUSTER,
        );
        assert_eq!(removed, vec!["other"]);
        assert!(without_finalizer(&cluster(None), FINALIZER_AWS_CLUSTER).is_empty());
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the stock pipelines

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::cloud::{Stack, StackStatus};
    use crate::context::ScratchContext;
    use crate::crd::AWSMachineDeploymentSpec;
    use crate::pipeline::PassOutcome;
    use crate::testing::{provisioned_fakes, tenant_cluster_in, Fakes, FakeEncrypter, JsonRenderer};
    use std::collections::BTreeMap;

    fn deps(fakes: &Fakes) -> StepDependencies {
        StepDependencies {
            clients: fakes.clients(),
            encrypter: Arc::new(FakeEncrypter::default()),
            renderer: Arc::new(JsonRenderer),
            route_table_names: vec!["ginger_private_0".to_string(), "ginger_private_1".to_string()],
            default_cni_cidr: None,
            cache_ttl: Duration::from_secs(60),
            retry: RetryConfig {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(2),
                max_elapsed_time: Some(Duration::from_secs(5)),
                max_attempts: 3,
                multiplier: 2.0,
                randomization_factor: 0.0,
            },
        }
    }

    #[test]
    fn test_stock_pipeline_order() {
        let fakes = provisioned_fakes();
        let deps = deps(&fakes);

        assert_eq!(
            create_pipeline(&deps).step_names(),
            vec![
                "peerrolearn",
                "cproutetables",
                "tcvpc",
                "tcsubnets",
                "tcnatgateways",
                "hostedzones",
                "encryption",
                "tcaz",
                "tccp",
            ]
        );
        assert_eq!(
            delete_pipeline(&deps).step_names(),
            vec!["nodepoolguard", "tcvpc", "tcsubnets", "tccp", "cleanupvolumes"]
        );
    }

    #[test]
    fn test_stock_pipelines_read_only_written_fields() {
        let fakes = provisioned_fakes();
        let deps = deps(&fakes);

        create_pipeline(&deps).validate_ordering().unwrap();
        delete_pipeline(&deps).validate_ordering().unwrap();
    }

    #[tokio::test]
    async fn test_create_pass_provisions_control_plane_stack() {
        let fakes = provisioned_fakes();
        let pipeline = create_pipeline(&deps(&fakes));
        let cluster = tenant_cluster_in(&["eu-central-1a", "eu-central-1b"]);
        let mut ctx = ScratchContext::new();

        let outcome = pipeline.run(&cluster, &mut ctx).await;

        assert!(matches!(outcome, PassOutcome::Completed), "{outcome:?}");
        assert_eq!(ctx.vpc().unwrap().id, "vpc-1");
        assert_eq!(ctx.status.control_plane.route_tables.len(), 2);
        assert_eq!(ctx.spec.tenant_cluster.availability_zones.len(), 2);
        assert!(ctx.status.tenant_cluster.tccp.exists);
        assert_eq!(
            fakes.cloudformation.calls(),
            vec!["create:cluster-abc12-tccp", "wait:cluster-abc12-tccp"]
        );
    }

    #[tokio::test]
    async fn test_transient_discovery_failure_is_retried() {
        let fakes = provisioned_fakes();
        fakes
            .ec2
            .subnet_failures
            .store(2, std::sync::atomic::Ordering::SeqCst);
        let pipeline = create_pipeline(&deps(&fakes));
        let mut ctx = ScratchContext::new();

        let outcome = pipeline
            .run(&tenant_cluster_in(&["eu-central-1a"]), &mut ctx)
            .await;

        assert!(matches!(outcome, PassOutcome::Completed), "{outcome:?}");
    }

    #[tokio::test]
    async fn test_missing_peer_role_cancels_create_pass() {
        let mut fakes = provisioned_fakes();
        fakes.iam = Arc::new(crate::testing::FakeIam::default());
        let pipeline = create_pipeline(&deps(&fakes));
        let mut ctx = ScratchContext::new();

        let outcome = pipeline
            .run(&tenant_cluster_in(&["eu-central-1a"]), &mut ctx)
            .await;

        assert!(matches!(outcome, PassOutcome::Cancelled { step: "peerrolearn" }));
        assert!(fakes.cloudformation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_pass_waits_for_node_pools() {
        let fakes = provisioned_fakes();
        let pipeline = delete_pipeline(&deps(&fakes));
        let mut cluster = tenant_cluster_in(&["eu-central-1a"]);
        cluster.node_pools.push(AWSMachineDeploymentSpec::default());
        let mut ctx = ScratchContext::new();

        let outcome = pipeline.run(&cluster, &mut ctx).await;

        assert!(matches!(outcome, PassOutcome::Cancelled { step: "nodepoolguard" }));
        assert!(ctx.is_finalizer_kept());
        assert!(fakes.cloudformation.calls().is_empty());
    }

    fn fakes_with_stack(status: StackStatus) -> Fakes {
        let mut fakes = provisioned_fakes();
        fakes.cloudformation = Arc::new(crate::testing::FakeCloudFormation::with_stack(Stack {
            name: "cluster-abc12-tccp".to_string(),
            status,
            outputs: BTreeMap::new(),
        }));
        fakes
    }

    #[tokio::test]
    async fn test_delete_pass_keeps_finalizer_until_stack_is_gone() {
        let fakes = fakes_with_stack(StackStatus::CreateComplete);
        let pipeline = delete_pipeline(&deps(&fakes));
        let cluster = tenant_cluster_in(&["eu-central-1a"]);

        let mut ctx = ScratchContext::new();
        let outcome = pipeline.run(&cluster, &mut ctx).await;
        assert!(matches!(outcome, PassOutcome::Cancelled { step: "tccp" }), "{outcome:?}");
        assert!(ctx.is_finalizer_kept());
        assert_eq!(
            fakes.cloudformation.status("cluster-abc12-tccp"),
            Some(StackStatus::DeleteInProgress)
        );

        // still deleting: no second delete call
        let mut ctx = ScratchContext::new();
        let outcome = pipeline.run(&cluster, &mut ctx).await;
        assert!(matches!(outcome, PassOutcome::Cancelled { step: "tccp" }), "{outcome:?}");
        assert!(ctx.is_finalizer_kept());

        fakes.cloudformation.finish_deletions();
        let mut ctx = ScratchContext::new();
        let outcome = pipeline.run(&cluster, &mut ctx).await;
        assert!(matches!(outcome, PassOutcome::Completed), "{outcome:?}");
        assert!(!ctx.is_finalizer_kept());

        assert_eq!(fakes.cloudformation.calls(), vec!["delete:cluster-abc12-tccp"]);
    }

    #[tokio::test]
    async fn test_delete_pass_removes_stack_that_failed_to_create() {
        let fakes = fakes_with_stack(StackStatus::CreateFailed);
        let pipeline = delete_pipeline(&deps(&fakes));
        let mut ctx = ScratchContext::new();

        let outcome = pipeline
            .run(&tenant_cluster_in(&["eu-central-1a"]), &mut ctx)
            .await;

        assert!(matches!(outcome, PassOutcome::Cancelled { step: "tccp" }), "{outcome:?}");
        assert!(ctx.is_finalizer_kept());
        assert_eq!(fakes.cloudformation.calls(), vec!["delete:cluster-abc12-tccp"]);
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tccp.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::cloud::{RouteTable, Stack};
    use crate::context::{AvailabilityZone, HostedZones};
    use crate::pipeline::crud::CrudResource;
    use crate::pipeline::Resource;
    use crate::testing::{tenant_cluster, FakeCloudFormation, FakeS3, JsonRenderer};
    use std::collections::BTreeMap;

    const STACK: &str = "cluster-abc12-tccp";

    fn discovered_context() -> ScratchContext {
        let mut ctx = ScratchContext::new();
        ctx.status.control_plane.peer_role_arn =
            Some("arn:aws:iam::123456789012:role/abc12-vpc-peer-access".to_string());
        ctx.status.control_plane.route_tables = vec![RouteTable {
            id: "rtb-1".to_string(),
            name: "ginger_private_0".to_string(),
        }];
        ctx.status.tenant_cluster.hosted_zones = Some(HostedZones {
            public_id: "Z-PUBLIC".to_string(),
            internal_id: "Z-INTERNAL".to_string(),
        });
        ctx.status.tenant_cluster.encryption_key = Some("key-1".to_string());
        ctx.status.tenant_cluster.nat_gateway_addresses = vec!["198.51.100.7".to_string()];
        ctx.spec.tenant_cluster.availability_zones = vec![AvailabilityZone {
            name: "eu-central-1a".to_string(),
            ..AvailabilityZone::default()
        }];
        ctx
    }

    fn step(cloudformation: Arc<FakeCloudFormation>) -> CrudResource<TenantClusterControlPlane> {
        CrudResource::new(TenantClusterControlPlane::new(
            cloudformation,
            Arc::new(FakeS3::with_bucket("ginger-g8s-abc12")),
            Arc::new(JsonRenderer),
        ))
    }

    fn existing(status: StackStatus, operator_version: &str, checksum: &str) -> Stack {
        Stack {
            name: STACK.to_string(),
            status,
            outputs: BTreeMap::from([
                (
                    STACK_OUTPUT_OPERATOR_VERSION.to_string(),
                    operator_version.to_string(),
                ),
                (
                    STACK_OUTPUT_PARAMETERS_CHECKSUM.to_string(),
                    checksum.to_string(),
                ),
            ]),
        }
    }

    fn desired_checksum() -> String {
        let params = stack_parameters(&tenant_cluster(), &discovered_context()).unwrap();
        parameters_checksum(&params)
    }

    #[test]
    fn test_checksum_is_stable_and_input_sensitive() {
        let cluster = tenant_cluster();
        let ctx = discovered_context();
        let a = parameters_checksum(&stack_parameters(&cluster, &ctx).unwrap());
        let b = parameters_checksum(&stack_parameters(&cluster, &ctx).unwrap());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = discovered_context();
        changed.status.tenant_cluster.nat_gateway_addresses.push("198.51.100.9".to_string());
        let c = parameters_checksum(&stack_parameters(&cluster, &changed).unwrap());
        assert_ne!(a, c);
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let mut ctx = discovered_context();
        ctx.status.tenant_cluster.encryption_key = None;

        let err = stack_parameters(&tenant_cluster(), &ctx).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stack_tags() {
        let tags = stack_tags(&tenant_cluster());
        assert_eq!(tags.get("giantswarm.io/cluster").map(String::as_str), Some("abc12"));
        assert_eq!(tags.get("giantswarm.io/installation").map(String::as_str), Some("ginger"));
        assert_eq!(tags.get("giantswarm.io/organization").map(String::as_str), Some("acme"));
        assert_eq!(tags.get("giantswarm.io/stack").map(String::as_str), Some("tccp"));
    }

    #[tokio::test]
    async fn test_missing_stack_is_created() {
        let cloudformation = Arc::new(FakeCloudFormation::default());
        let step = step(cloudformation.clone());
        let mut ctx = discovered_context();

        step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();

        assert_eq!(
            cloudformation.calls(),
            vec![format!("create:{STACK}"), format!("wait:{STACK}")]
        );
        assert_eq!(
            cloudformation.last_template_url.lock().unwrap().as_deref(),
            Some("https://ginger-g8s-abc12.s3.amazonaws.com/cloudformation/cluster-abc12-tccp.json")
        );
        assert!(ctx.status.tenant_cluster.tccp.exists);
        assert_eq!(
            ctx.status.tenant_cluster.tccp.operator_version.as_deref(),
            Some("9.3.0")
        );
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let cloudformation = Arc::new(FakeCloudFormation::default());
        let step = CrudResource::new(TenantClusterControlPlane::new(
            cloudformation.clone(),
            Arc::new(FakeS3::default()),
            Arc::new(JsonRenderer),
        ));

        let err = step
            .ensure_created(&tenant_cluster(), &mut discovered_context())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(cloudformation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_converged_stack_is_left_alone() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::CreateComplete,
            "9.3.0",
            &desired_checksum(),
        )));
        let step = step(cloudformation.clone());

        step.ensure_created(&tenant_cluster(), &mut discovered_context())
            .await
            .unwrap();

        assert!(cloudformation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_new_operator_version_updates_stack() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::UpdateComplete,
            "9.2.1",
            &desired_checksum(),
        )));
        let step = step(cloudformation.clone());
        let mut ctx = discovered_context();

        step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();

        assert_eq!(cloudformation.calls(), vec![format!("update:{STACK}")]);
        assert_eq!(
            ctx.status.tenant_cluster.tccp.operator_version.as_deref(),
            Some("9.3.0")
        );
    }

    #[tokio::test]
    async fn test_changed_parameters_update_stack() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::CreateComplete,
            "9.3.0",
            "stale",
        )));
        let step = step(cloudformation.clone());

        step.ensure_created(&tenant_cluster(), &mut discovered_context())
            .await
            .unwrap();

        assert_eq!(cloudformation.calls(), vec![format!("update:{STACK}")]);
    }

    #[tokio::test]
    async fn test_stack_in_progress_cancels_pass() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::UpdateInProgress,
            "9.2.1",
            "stale",
        )));
        let step = step(cloudformation.clone());
        let mut ctx = discovered_context();

        step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();

        assert!(ctx.is_cancelled());
        assert!(cloudformation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stack_needs_intervention() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::CreateFailed,
            "9.3.0",
            "stale",
        )));
        let step = step(cloudformation);

        let err = step
            .ensure_created(&tenant_cluster(), &mut discovered_context())
            .await
            .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_delete_pass_deletes_existing_stack() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::CreateComplete,
            "9.3.0",
            "any",
        )));
        let step = step(cloudformation.clone());
        let mut ctx = ScratchContext::new();

        step.ensure_deleted(&tenant_cluster(), &mut ctx).await.unwrap();

        assert_eq!(cloudformation.calls(), vec![format!("delete:{STACK}")]);
        assert!(ctx.is_cancelled());
        assert!(ctx.is_finalizer_kept());
        assert!(ctx.status.tenant_cluster.tccp.exists);
    }

    #[tokio::test]
    async fn test_delete_pass_waits_for_running_deletion() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::DeleteInProgress,
            "9.3.0",
            "any",
        )));
        let step = step(cloudformation.clone());
        let mut ctx = ScratchContext::new();

        step.ensure_deleted(&tenant_cluster(), &mut ctx).await.unwrap();

        assert!(cloudformation.calls().is_empty());
        assert!(ctx.is_cancelled());
        assert!(ctx.is_finalizer_kept());
    }

    #[tokio::test]
    async fn test_delete_pass_removes_failed_stacks() {
        for status in [
            StackStatus::CreateFailed,
            StackStatus::Other("ROLLBACK_COMPLETE".to_string()),
            StackStatus::Other("DELETE_FAILED".to_string()),
        ] {
            let cloudformation =
                Arc::new(FakeCloudFormation::with_stack(existing(status.clone(), "9.3.0", "any")));
            let step = step(cloudformation.clone());
            let mut ctx = ScratchContext::new();

            step.ensure_deleted(&tenant_cluster(), &mut ctx)
                .await
                .unwrap_or_else(|e| panic!("{status:?}: {e}"));

            assert_eq!(cloudformation.calls(), vec![format!("delete:{STACK}")]);
            assert!(ctx.is_finalizer_kept());
        }
    }

    #[tokio::test]
    async fn test_deleted_stack_lets_pass_continue() {
        let cloudformation = Arc::new(FakeCloudFormation::with_stack(existing(
            StackStatus::DeleteComplete,
            "9.3.0",
            "any",
        )));
        let step = step(cloudformation.clone());
        let mut ctx = ScratchContext::new();

        step.ensure_deleted(&tenant_cluster(), &mut ctx).await.unwrap();

        assert!(cloudformation.calls().is_empty());
        assert!(!ctx.is_cancelled());
        assert!(!ctx.is_finalizer_kept());
        assert!(!ctx.status.tenant_cluster.tccp.exists);
    }

    #[tokio::test]
    async fn test_delete_pass_without_stack_does_nothing() {
        let cloudformation = Arc::new(FakeCloudFormation::default());
        let step = step(cloudformation.clone());
        let mut ctx = ScratchContext::new();

        step.ensure_deleted(&tenant_cluster(), &mut ctx).await.unwrap();

        assert!(cloudformation.calls().is_empty());
        assert!(!ctx.is_cancelled());
    }
}

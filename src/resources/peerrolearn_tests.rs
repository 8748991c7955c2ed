// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `peerrolearn.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::{tenant_cluster, FakeIam};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_writes_role_arn() {
        let iam = FakeIam {
            roles: HashMap::from([(
                "abc12-vpc-peer-access".to_string(),
                "arn:aws:iam::1:role/abc12-vpc-peer-access".to_string(),
            )]),
        };
        let step = PeerRoleArn::new(Arc::new(iam));
        let mut ctx = ScratchContext::new();

        step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();

        assert_eq!(
            ctx.status.control_plane.peer_role_arn.as_deref(),
            Some("arn:aws:iam::1:role/abc12-vpc-peer-access")
        );
    }

    #[tokio::test]
    async fn test_missing_role_is_not_found() {
        let step = PeerRoleArn::new(Arc::new(FakeIam::default()));
        let mut ctx = ScratchContext::new();

        let err = step
            .ensure_created(&tenant_cluster(), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tcnatgateways.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::cloud::NatGateway;
    use crate::context::VpcStatus;
    use crate::testing::{tenant_cluster, FakeEc2};

    #[tokio::test]
    async fn test_collects_sorted_unique_addresses() {
        let ec2 = FakeEc2::default();
        ec2.nat_gateways.lock().unwrap().insert(
            "vpc-1".to_string(),
            vec![
                NatGateway {
                    id: "nat-2".to_string(),
                    public_ips: vec!["198.51.100.9".to_string()],
                },
                NatGateway {
                    id: "nat-1".to_string(),
                    public_ips: vec!["198.51.100.7".to_string(), "198.51.100.9".to_string()],
                },
            ],
        );
        let step = TenantClusterNatGateways::new(Arc::new(ec2));

        let mut ctx = ScratchContext::new();
        ctx.status.tenant_cluster.vpc = Some(VpcStatus {
            id: "vpc-1".to_string(),
            cidr_block: "10.100.8.0/24".to_string(),
        });
        step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();

        assert_eq!(
            ctx.status.tenant_cluster.nat_gateway_addresses,
            vec!["198.51.100.7", "198.51.100.9"]
        );
    }
}

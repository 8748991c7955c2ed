// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes of the cloud collaborators, for unit tests.

use crate::cloud::{
    CloudClients, CloudFormation, ControlPlaneClients, Ec2, Iam, NatGateway, RouteTable, Route53,
    S3, Stack, StackInput, StackStatus, Subnet, TagFilter, Tags,
    TemplateRenderer, TenantClusterClients, Volume, Vpc,
};
use crate::context::{ClusterIdentity, TenantCluster};
use crate::crd::{AWSClusterSpec, AWSControlPlaneSpec, ClusterNetwork};
use crate::encrypter::Encrypter;
use crate::errors::{ReconcileError, Result};
use crate::labels::{TAG_NAME, TAG_STACK, TAG_SUBNET_TYPE};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tenant cluster `abc12` with network `10.100.8.0/24` and no zones requested.
pub fn tenant_cluster() -> TenantCluster {
    TenantCluster {
        identity: ClusterIdentity {
            id: "abc12".to_string(),
            namespace: "default".to_string(),
            generation: 1,
        },
        installation: "ginger".to_string(),
        organization: Some("acme".to_string()),
        operator_version: "9.3.0".to_string(),
        cluster: AWSClusterSpec {
            description: None,
            region: "eu-central-1".to_string(),
            base_domain: "abc12.k8s.example.com".to_string(),
            network: ClusterNetwork {
                cidr_block: "10.100.8.0/24".to_string(),
                pods_cidr_block: Some("172.17.0.0/16".to_string()),
            },
        },
        control_plane: None,
        node_pools: Vec::new(),
    }
}

/// [`tenant_cluster`] with a control plane spanning `zones`.
pub fn tenant_cluster_in(zones: &[&str]) -> TenantCluster {
    let mut cluster = tenant_cluster();
    cluster.control_plane = Some(AWSControlPlaneSpec {
        availability_zones: zones.iter().map(ToString::to_string).collect(),
        instance_type: "m5.xlarge".to_string(),
    });
    cluster
}

/// Tag set from key/value pairs.
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Subnet owned by the `tccp` stack.
pub fn subnet(id: &str, zone: &str, cidr: &str, kind: &str) -> Subnet {
    subnet_in_stack(id, zone, cidr, kind, "tccp")
}

/// Subnet owned by `stack` in VPC `vpc-1`.
pub fn subnet_in_stack(id: &str, zone: &str, cidr: &str, kind: &str, stack: &str) -> Subnet {
    Subnet {
        id: id.to_string(),
        vpc_id: "vpc-1".to_string(),
        cidr_block: cidr.to_string(),
        availability_zone: zone.to_string(),
        tags: tags(&[
            ("giantswarm.io/cluster", "abc12"),
            (TAG_STACK, stack),
            (TAG_SUBNET_TYPE, kind),
        ]),
    }
}

fn matches_all(filters: &[TagFilter], tags: &Tags) -> bool {
    filters.iter().all(|f| f.matches(tags))
}

/// Fake compute API.
#[derive(Default)]
pub struct FakeEc2 {
    pub vpcs: Mutex<Vec<Vpc>>,
    pub subnets: Mutex<Vec<Subnet>>,
    pub route_tables: Mutex<Vec<RouteTable>>,
    pub nat_gateways: Mutex<HashMap<String, Vec<NatGateway>>>,
    pub volumes: Mutex<Vec<Volume>>,
    /// Volume ids whose detach call fails
    pub failing_detach: Mutex<HashSet<String>>,
    /// Volume ids whose delete call fails
    pub failing_delete: Mutex<HashSet<String>>,
    /// Remaining transient failures of `describe_subnets`
    pub subnet_failures: AtomicUsize,
    /// Every mutating call, in order
    pub calls: Mutex<Vec<String>>,
    pub route_table_lookups: AtomicUsize,
}

impl FakeEc2 {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ec2 for FakeEc2 {
    async fn describe_vpcs(&self, filters: &[TagFilter]) -> Result<Vec<Vpc>> {
        Ok(self
            .vpcs
            .lock()
            .unwrap()
            .iter()
            .filter(|v| matches_all(filters, &v.tags))
            .cloned()
            .collect())
    }

    async fn describe_subnets(&self, vpc_id: &str, filters: &[TagFilter]) -> Result<Vec<Subnet>> {
        let remaining = self.subnet_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.subnet_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ReconcileError::cloud("ec2", "DescribeSubnets", "throttled"));
        }

        Ok(self
            .subnets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.vpc_id == vpc_id && matches_all(filters, &s.tags))
            .cloned()
            .collect())
    }

    async fn describe_route_tables(&self, filters: &[TagFilter]) -> Result<Vec<RouteTable>> {
        self.route_table_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .route_tables
            .lock()
            .unwrap()
            .iter()
            .filter(|rt| matches_all(filters, &tags(&[(TAG_NAME, rt.name.as_str())])))
            .cloned()
            .collect())
    }

    async fn describe_nat_gateways(&self, vpc_id: &str) -> Result<Vec<NatGateway>> {
        Ok(self
            .nat_gateways
            .lock()
            .unwrap()
            .get(vpc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_volumes(&self, filters: &[TagFilter]) -> Result<Vec<Volume>> {
        Ok(self
            .volumes
            .lock()
            .unwrap()
            .iter()
            .filter(|v| matches_all(filters, &v.tags))
            .cloned()
            .collect())
    }

    async fn detach_volume(&self, volume_id: &str, _force: bool) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("detach:{volume_id}"));
        if self.failing_detach.lock().unwrap().contains(volume_id) {
            return Err(ReconcileError::cloud("ec2", "DetachVolume", "IncorrectState"));
        }
        Ok(())
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete:{volume_id}"));
        if self.failing_delete.lock().unwrap().contains(volume_id) {
            return Err(ReconcileError::cloud("ec2", "DeleteVolume", "VolumeInUse"));
        }
        self.volumes.lock().unwrap().retain(|v| v.id != volume_id);
        Ok(())
    }
}

/// Fake stack API.
#[derive(Default)]
pub struct FakeCloudFormation {
    pub stacks: Mutex<BTreeMap<String, Stack>>,
    pub calls: Mutex<Vec<String>>,
    /// Template URL of the last create or update
    pub last_template_url: Mutex<Option<String>>,
}

impl FakeCloudFormation {
    pub fn with_stack(stack: Stack) -> Self {
        let fake = Self::default();
        fake.stacks
            .lock()
            .unwrap()
            .insert(stack.name.clone(), stack);
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status(&self, name: &str) -> Option<StackStatus> {
        self.stacks.lock().unwrap().get(name).map(|s| s.status.clone())
    }

    /// Let every running deletion finish.
    pub fn finish_deletions(&self) {
        self.stacks
            .lock()
            .unwrap()
            .retain(|_, s| s.status != StackStatus::DeleteInProgress);
    }
}

#[async_trait]
impl CloudFormation for FakeCloudFormation {
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>> {
        Ok(self.stacks.lock().unwrap().get(name).cloned())
    }

    async fn create_stack(&self, input: &StackInput) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create:{}", input.name));
        *self.last_template_url.lock().unwrap() = Some(input.template_url.clone());
        self.stacks.lock().unwrap().insert(
            input.name.clone(),
            Stack {
                name: input.name.clone(),
                status: StackStatus::CreateInProgress,
                outputs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn wait_until_created(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("wait:{name}"));
        if let Some(stack) = self.stacks.lock().unwrap().get_mut(name) {
            stack.status = StackStatus::CreateComplete;
        }
        Ok(())
    }

    async fn update_stack(&self, input: &StackInput) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("update:{}", input.name));
        *self.last_template_url.lock().unwrap() = Some(input.template_url.clone());
        Ok(())
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("delete:{name}"));
        if let Some(stack) = self.stacks.lock().unwrap().get_mut(name) {
            stack.status = StackStatus::DeleteInProgress;
        }
        Ok(())
    }
}

/// Fake DNS API.
#[derive(Default)]
pub struct FakeRoute53 {
    pub zones: HashMap<String, String>,
    pub lookups: AtomicUsize,
}

impl FakeRoute53 {
    pub fn with_zones(zones: &[(&str, &str)]) -> Self {
        Self {
            zones: zones
                .iter()
                .map(|(name, id)| ((*name).to_string(), (*id).to_string()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Route53 for FakeRoute53 {
    async fn find_hosted_zone(&self, name: &str) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.zones.get(name).cloned())
    }
}

/// Fake identity API.
#[derive(Default)]
pub struct FakeIam {
    pub roles: HashMap<String, String>,
}

#[async_trait]
impl Iam for FakeIam {
    async fn get_role_arn(&self, name: &str) -> Result<String> {
        self.roles
            .get(name)
            .cloned()
            .ok_or_else(|| ReconcileError::not_found("IAM role", name))
    }
}

/// Fake object storage API.
#[derive(Default)]
pub struct FakeS3 {
    pub buckets: HashSet<String>,
    pub objects: Mutex<BTreeMap<(String, String), String>>,
}

impl FakeS3 {
    pub fn with_bucket(bucket: &str) -> Self {
        Self {
            buckets: HashSet::from([bucket.to_string()]),
            objects: Mutex::default(),
        }
    }
}

#[async_trait]
impl S3 for FakeS3 {
    async fn head_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.contains(bucket))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: &str) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.to_string());
        Ok(format!("https://{bucket}.s3.amazonaws.com/{key}"))
    }
}

/// Fake encryption backend.
#[derive(Default)]
pub struct FakeEncrypter {
    pub keys: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Encrypter for FakeEncrypter {
    async fn ensure_created_encryption_key(&self, cluster_id: &str) -> Result<()> {
        self.keys
            .lock()
            .unwrap()
            .entry(cluster_id.to_string())
            .or_insert_with(|| format!("arn:aws:kms:eu-central-1:123456789012:key/{cluster_id}"));
        Ok(())
    }

    async fn encryption_key(&self, cluster_id: &str) -> Result<String> {
        self.keys
            .lock()
            .unwrap()
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ReconcileError::not_found("encryption key", cluster_id))
    }
}

/// Renderer emitting the parameters as JSON.
#[derive(Default)]
pub struct JsonRenderer;

impl TemplateRenderer for JsonRenderer {
    fn render(&self, parameters: &serde_json::Value) -> Result<String> {
        Ok(parameters.to_string())
    }
}

/// Every fake, plus the client bundle pointing at them.
pub struct Fakes {
    pub cp_ec2: Arc<FakeEc2>,
    pub iam: Arc<FakeIam>,
    pub ec2: Arc<FakeEc2>,
    pub cloudformation: Arc<FakeCloudFormation>,
    pub route53: Arc<FakeRoute53>,
    pub s3: Arc<FakeS3>,
}

impl Fakes {
    pub fn clients(&self) -> CloudClients {
        CloudClients {
            control_plane: ControlPlaneClients {
                ec2: self.cp_ec2.clone(),
                iam: self.iam.clone(),
            },
            tenant_cluster: TenantClusterClients {
                ec2: self.ec2.clone(),
                cloudformation: self.cloudformation.clone(),
                route53: self.route53.clone(),
                s3: self.s3.clone(),
            },
        }
    }
}

/// Fakes holding everything a create pass for [`tenant_cluster`] needs.
pub fn provisioned_fakes() -> Fakes {
    let cp_ec2 = FakeEc2::default();
    cp_ec2.route_tables.lock().unwrap().extend([
        RouteTable {
            id: "rtb-1".to_string(),
            name: "ginger_private_0".to_string(),
        },
        RouteTable {
            id: "rtb-2".to_string(),
            name: "ginger_private_1".to_string(),
        },
    ]);

    let iam = FakeIam {
        roles: HashMap::from([(
            "abc12-vpc-peer-access".to_string(),
            "arn:aws:iam::123456789012:role/abc12-vpc-peer-access".to_string(),
        )]),
    };

    let ec2 = FakeEc2::default();
    ec2.vpcs.lock().unwrap().push(Vpc {
        id: "vpc-1".to_string(),
        cidr_block: "10.100.8.0/24".to_string(),
        tags: tags(&[("giantswarm.io/cluster", "abc12"), (TAG_STACK, "tccp")]),
    });
    ec2.nat_gateways.lock().unwrap().insert(
        "vpc-1".to_string(),
        vec![NatGateway {
            id: "nat-1".to_string(),
            public_ips: vec!["198.51.100.7".to_string()],
        }],
    );

    Fakes {
        cp_ec2: Arc::new(cp_ec2),
        iam: Arc::new(iam),
        ec2: Arc::new(ec2),
        cloudformation: Arc::new(FakeCloudFormation::default()),
        route53: Arc::new(FakeRoute53::with_zones(&[
            ("abc12.k8s.example.com", "Z-PUBLIC"),
            ("internal.abc12.k8s.example.com", "Z-INTERNAL"),
        ])),
        s3: Arc::new(FakeS3::with_bucket("ginger-g8s-abc12")),
    }
}

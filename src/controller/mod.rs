// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes controller driving the reconciliation pipelines.
//!
//! Every `AWSCluster` event triggers one pass: the create pipeline while the
//! object is live, the delete pipeline once it has a deletion timestamp. The
//! controller owns the finalizer and turns pass outcomes into requeue
//! actions; the pipelines never talk to the Kubernetes API.
//!
//! The metrics server runs next to the controller. If either stops, [`run`]
//! returns.

pub mod finalizers;

use crate::config::{OperatorConfig, RequeueIntervals};
use crate::constants::KIND_AWS_CONTROL_PLANE;
use crate::context::{ScratchContext, TenantCluster};
use crate::crd::{cluster_selector, AWSCluster, AWSControlPlane, AWSMachineDeployment};
use crate::errors::ReconcileError as StepError;
use crate::labels::FINALIZER_AWS_CLUSTER;
use crate::metrics;
use crate::pipeline::{PassKind, PassOutcome, Pipeline};
use crate::resources::{create_pipeline, delete_pipeline, StepDependencies};
use anyhow::Result;
use finalizers::{ensure_finalizer, remove_finalizer};
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::{controller::Action, watcher::Config, Controller};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Shared state of the `AWSCluster` controller.
pub struct ControllerContext {
    client: Client,
    config: OperatorConfig,
    create: Pipeline,
    delete: Pipeline,
}

impl ControllerContext {
    /// Build both stock pipelines and check their step ordering.
    ///
    /// # Errors
    ///
    /// Returns an error if a pipeline reads a context field before it is written.
    pub fn new(client: Client, config: OperatorConfig, deps: &StepDependencies) -> Result<Self> {
        let create = create_pipeline(deps);
        let delete = delete_pipeline(deps);
        create.validate_ordering()?;
        delete.validate_ordering()?;

        Ok(Self {
            client,
            config,
            create,
            delete,
        })
    }
}

/// What the controller does after a pass.
#[derive(Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// Look at the object again after the interval
    Requeue(Duration),
    /// Deletion finished; drop the finalizer
    RemoveFinalizer,
    /// The pass failed; the error policy decides
    Fail,
}

/// Decide the follow-up of a pass.
#[must_use]
pub fn follow_up(
    kind: PassKind,
    outcome: &PassOutcome,
    finalizer_kept: bool,
    intervals: &RequeueIntervals,
) -> FollowUp {
    match (kind, outcome) {
        (_, PassOutcome::Failed { .. }) => FollowUp::Fail,
        (PassKind::Delete, _) if finalizer_kept => FollowUp::Requeue(intervals.not_ready),
        (_, PassOutcome::Cancelled { .. }) => FollowUp::Requeue(intervals.cancelled),
        (PassKind::Create, PassOutcome::Completed) => FollowUp::Requeue(intervals.ready),
        (PassKind::Delete, PassOutcome::Completed) => FollowUp::RemoveFinalizer,
    }
}

/// Requeue interval after a failed reconciliation.
///
/// Fatal step errors need the object or the cloud account to be fixed first,
/// so they return `None` and the controller waits for the next change.
#[must_use]
pub fn error_requeue(error: &anyhow::Error, intervals: &RequeueIntervals) -> Option<Duration> {
    match error.downcast_ref::<StepError>() {
        Some(step_error) if step_error.is_fatal() => None,
        _ => Some(intervals.error),
    }
}

/// Load the view of a cluster the pipelines work on.
async fn load_tenant_cluster(
    client: &Client,
    config: &OperatorConfig,
    cluster: &AWSCluster,
) -> Result<TenantCluster> {
    let namespace = cluster.namespace().unwrap_or_default();
    let id = cluster.cluster_id();
    let selector = ListParams::default().labels(&cluster_selector(&id));

    let control_planes: Api<AWSControlPlane> = Api::namespaced(client.clone(), &namespace);
    let control_planes = control_planes.list(&selector).await?.items;
    if control_planes.len() > 1 {
        return Err(StepError::TooManyObjects {
            kind: KIND_AWS_CONTROL_PLANE.to_string(),
            cluster: id,
            count: control_planes.len(),
        }
        .into());
    }

    let node_pools: Api<AWSMachineDeployment> = Api::namespaced(client.clone(), &namespace);
    let node_pools = node_pools.list(&selector).await?.items;

    debug!(
        cluster = %id,
        control_plane = !control_planes.is_empty(),
        node_pools = node_pools.len(),
        "Loaded tenant cluster"
    );

    Ok(TenantCluster::from_resources(
        cluster,
        &config.installation,
        &config.operator_version,
        control_planes.first(),
        &node_pools,
    ))
}

/// Run one pass for `cluster`.
///
/// # Errors
///
/// Returns an error if the watched objects cannot be read, the finalizer
/// cannot be updated, or the pass failed.
pub async fn reconcile_aws_cluster(ctx: &ControllerContext, cluster: &AWSCluster) -> Result<Action> {
    let deleting = cluster.metadata.deletion_timestamp.is_some();
    if deleting && !finalizers::has_finalizer(cluster, FINALIZER_AWS_CLUSTER) {
        debug!(cluster = %cluster.cluster_id(), "Deleted and already finalized");
        return Ok(Action::await_change());
    }
    if !deleting {
        ensure_finalizer(&ctx.client, cluster, FINALIZER_AWS_CLUSTER).await?;
    }

    let tenant = load_tenant_cluster(&ctx.client, &ctx.config, cluster).await?;
    let pipeline = if deleting { &ctx.delete } else { &ctx.create };

    let mut scratch = ScratchContext::new();
    let outcome = pipeline.run(&tenant, &mut scratch).await;

    match follow_up(
        pipeline.kind(),
        &outcome,
        scratch.is_finalizer_kept(),
        &ctx.config.requeue_intervals(),
    ) {
        FollowUp::Requeue(interval) => {
            debug!(cluster = %tenant.id(), requeue_after = ?interval, "Requeueing");
            Ok(Action::requeue(interval))
        }
        FollowUp::RemoveFinalizer => {
            remove_finalizer(&ctx.client, cluster, FINALIZER_AWS_CLUSTER).await?;
            info!(cluster = %tenant.id(), "Tenant cluster deleted");
            Ok(Action::await_change())
        }
        FollowUp::Fail => match outcome {
            PassOutcome::Failed { step, error } => {
                Err(anyhow::Error::from(error).context(format!("step '{step}' failed")))
            }
            other => Err(anyhow::anyhow!("unexpected pass outcome {}", other.as_str())),
        },
    }
}

/// Reconcile wrapper for `AWSCluster`
async fn reconcile_wrapper(
    cluster: Arc<AWSCluster>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    debug!(
        cluster = %cluster.name_any(),
        namespace = ?cluster.namespace(),
        "Reconcile wrapper called for AWSCluster"
    );

    match reconcile_aws_cluster(&ctx, &cluster).await {
        Ok(action) => Ok(action),
        Err(e) => {
            error!(
                cluster = %cluster.name_any(),
                error = %format!("{e:#}"),
                "Failed to reconcile AWSCluster"
            );
            Err(e.into())
        }
    }
}

/// Error policy for controller
fn error_policy(
    resource: Arc<AWSCluster>,
    err: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    match error_requeue(&err.0, &ctx.config.requeue_intervals()) {
        Some(interval) => Action::requeue(interval),
        None => {
            warn!(
                cluster = %resource.name_any(),
                "Reconciliation needs intervention, waiting for the next change"
            );
            Action::await_change()
        }
    }
}

/// Run the `AWSCluster` controller
async fn run_aws_cluster_controller(ctx: Arc<ControllerContext>) -> Result<()> {
    info!("Starting AWSCluster controller");

    let api: Api<AWSCluster> = match &ctx.config.namespace {
        Some(namespace) => Api::namespaced(ctx.client.clone(), namespace),
        None => Api::all(ctx.client.clone()),
    };

    Controller::new(api, Config::default())
        .run(reconcile_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Serve `/metrics` on `address`.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops.
pub async fn serve_metrics(address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %address, "Serving metrics");
    axum::serve(listener, metrics::router()).await?;
    Ok(())
}

/// Run the controller and the metrics server until one of them stops.
///
/// # Errors
///
/// Returns an error if the pipelines are misordered or either task exits.
pub async fn run(client: Client, config: OperatorConfig, deps: StepDependencies) -> Result<()> {
    let address = config.metrics_bind_address.clone();
    let ctx = Arc::new(ControllerContext::new(client, config, &deps)?);

    tokio::select! {
        result = run_aws_cluster_controller(ctx) => {
            error!("CRITICAL: AWSCluster controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("AWSCluster controller exited unexpectedly without error")
        }
        result = serve_metrics(&address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller entry point for `HetznerCluster`.
//!
//! Wraps a reconciliation pass with the Kubernetes side: the finalizer, writing
//! back the endpoint and status, metrics, and the requeue action.

#[allow(clippy::wildcard_imports)]
use super::types::*;

use super::status_helpers::{patch_control_plane_endpoint, update_status};
use super::CleanupOutcome;
use crate::context::Context;
use crate::metrics::{
    record_reconciliation_error, record_reconciliation_requeue, record_reconciliation_success,
};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use kube::runtime::controller::Action;
use std::time::Instant;

/// Reconciles a `HetznerCluster` resource.
///
/// 1. Deleting clusters are torn down; the finalizer is removed once teardown is done
/// 2. Otherwise the finalizer is added and a reconciliation pass runs
/// 3. A changed control-plane endpoint is written to the spec
/// 4. The status is written if it changed
///
/// # Errors
///
/// Returns an error if a Kubernetes API call fails. Hetzner Cloud failures are
/// recorded as conditions and turned into a requeue instead.
pub async fn reconcile_hetznercluster(
    ctx: Arc<Context>,
    cluster: Arc<HetznerCluster>,
) -> Result<Action> {
    let start = Instant::now();
    let client = ctx.client.clone();
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    info!("Reconciling HetznerCluster: {}/{}", namespace, name);
    debug!(
        namespace = %namespace,
        name = %name,
        generation = ?cluster.metadata.generation,
        "Starting HetznerCluster reconciliation"
    );

    let mut working = (*cluster).clone();

    if cluster.is_deleting() {
        if !has_finalizer(cluster.as_ref(), FINALIZER_HETZNER_CLUSTER) {
            return Ok(Action::await_change());
        }

        let outcome = ctx.reconciler.cleanup(&mut working).await;
        update_status(&client, &cluster, &working).await?;

        return match outcome {
            CleanupOutcome::Done => {
                remove_finalizer(&client, cluster.as_ref(), FINALIZER_HETZNER_CLUSTER).await?;
                record_reconciliation_success(RESOURCE_TYPE, start.elapsed());
                info!("HetznerCluster {}/{} released", namespace, name);
                Ok(Action::await_change())
            }
            CleanupOutcome::Pending { requeue_after } => {
                record_reconciliation_requeue(RESOURCE_TYPE, "teardown");
                Ok(Action::requeue(requeue_after))
            }
        };
    }

    ensure_finalizer(&client, cluster.as_ref(), FINALIZER_HETZNER_CLUSTER).await?;

    let outcome = ctx.reconciler.reconcile(&mut working).await;

    if outcome.endpoint_changed {
        patch_control_plane_endpoint(&client, &working).await?;
    }
    update_status(&client, &cluster, &working).await?;

    let duration = start.elapsed();
    match &outcome.error {
        Some(e) => {
            warn!(
                namespace = %namespace,
                name = %name,
                error = %e,
                "HetznerCluster reconciliation incomplete"
            );
            record_reconciliation_error(RESOURCE_TYPE, duration);
        }
        None => record_reconciliation_success(RESOURCE_TYPE, duration),
    }

    Ok(match outcome.requeue_after {
        Some(requeue_after) => {
            let reason = if outcome.error.is_some() {
                "error"
            } else if working.status.as_ref().is_some_and(|status| status.ready) {
                "ready"
            } else {
                "not_ready"
            };
            record_reconciliation_requeue(RESOURCE_TYPE, reason);
            Action::requeue(requeue_after)
        }
        None => Action::await_change(),
    })
}

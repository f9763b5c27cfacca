// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Readiness calculation and persistence for `HetznerCluster` resources.
//!
//! The reconciler works on an in-memory copy of the cluster. These helpers derive
//! the `Ready` summary from the step conditions and write the result back with
//! merge patches, skipping the write when nothing changed.

#[allow(clippy::wildcard_imports)]
use super::types::*;

/// Whether every readiness condition is `True`.
#[must_use]
pub fn compute_ready(conditions: &[Condition]) -> bool {
    READINESS_CONDITION_TYPES
        .iter()
        .all(|condition_type| is_true(conditions, condition_type))
}

/// Refresh `status.ready` and the encompassing `Ready` condition.
///
/// Returns the new readiness.
pub fn update_ready_condition(cluster: &mut HetznerCluster) -> bool {
    let status = cluster.status_mut();
    let ready = compute_ready(&status.conditions);
    status.ready = ready;

    if ready {
        mark_true(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            REASON_ALL_READY,
            "all readiness conditions are True",
        );
    } else {
        let pending: Vec<&str> = READINESS_CONDITION_TYPES
            .iter()
            .copied()
            .filter(|condition_type| !is_true(&status.conditions, condition_type))
            .collect();
        mark_false(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            REASON_NOT_READY,
            ConditionSeverity::Warning,
            &format!("waiting for {}", pending.join(", ")),
        );
    }
    ready
}

/// Whether `new` differs from `current` in anything but transition timestamps.
#[must_use]
pub fn status_needs_update(
    current: Option<&HetznerClusterStatus>,
    new: &HetznerClusterStatus,
) -> bool {
    let Some(current) = current else {
        return true;
    };

    current.ready != new.ready
        || current.owned_server_count != new.owned_server_count
        || current.observed_generation != new.observed_generation
        || current.control_plane_load_balancer != new.control_plane_load_balancer
        || current.network != new.network
        || current.hcloud_placement_groups != new.hcloud_placement_groups
        || !conditions_equal(&current.conditions, &new.conditions)
}

/// Merge patch body for `status`.
///
/// Absent load balancer and network snapshots appear as explicit `null` so the
/// stored values are removed.
#[must_use]
pub fn status_patch(status: &HetznerClusterStatus) -> serde_json::Value {
    json!({ "status": status })
}

/// Persist the status of `updated` if it differs from the one in `original`.
///
/// # Errors
///
/// Returns an error if the status patch fails.
pub async fn update_status(
    client: &Client,
    original: &HetznerCluster,
    updated: &HetznerCluster,
) -> Result<()> {
    let Some(status) = updated.status.as_ref() else {
        return Ok(());
    };
    let mut new_status = status.clone();
    new_status.observed_generation = updated.metadata.generation;

    let namespace = original.namespace().unwrap_or_default();
    let name = original.name_any();

    if !status_needs_update(original.status.as_ref(), &new_status) {
        debug!(
            namespace = %namespace,
            name = %name,
            "Status unchanged, skipping update"
        );
        return Ok(());
    }

    debug!(
        ready = new_status.ready,
        num_conditions = new_status.conditions.len(),
        owned_servers = new_status.owned_server_count,
        "Preparing status update"
    );

    let api: Api<HetznerCluster> = Api::namespaced(client.clone(), &namespace);
    api.patch_status(
        &name,
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&status_patch(&new_status)),
    )
    .await?;

    info!(
        "Updated HetznerCluster {}/{} status: ready={}",
        namespace, name, new_status.ready
    );
    Ok(())
}

/// Write `spec.controlPlaneEndpoint` of `cluster` back to the API server.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn patch_control_plane_endpoint(client: &Client, cluster: &HetznerCluster) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    let api: Api<HetznerCluster> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({
        "spec": { "controlPlaneEndpoint": cluster.spec.control_plane_endpoint }
    });
    api.patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await?;

    info!(
        namespace = %namespace,
        name = %name,
        endpoint = ?cluster.spec.control_plane_endpoint,
        "Persisted control plane endpoint"
    );
    Ok(())
}

#[cfg(test)]
#[path = "status_helpers_tests.rs"]
mod status_helpers_tests;

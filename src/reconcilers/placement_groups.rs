// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Placement group set reconciliation.
//!
//! Desired groups come from `spec.hcloudPlacementGroups`; observed groups are the
//! placement groups carrying the cluster ownership label. Remote names are
//! `<cluster>-<name>`. Groups are matched on (name, type), so a type change
//! deletes the old group and creates a new one.

use crate::crd::{ConditionSeverity, HetznerCluster, PlacementGroupSpec, PlacementGroupStatus};
use crate::hcloud::{CreatePlacementGroupOpts, HCloudClient, ListOpts, PlacementGroup};
use crate::labels::owned_labels;
use crate::metrics::{record_resource_created, record_resource_deleted};
use crate::reconcilers::status::{mark_false, mark_true};
use crate::reconcilers::sync_error::{api_failure_reason, SyncError};
use crate::status_reasons::{
    CONDITION_TYPE_PLACEMENT_GROUPS_SYNCED, REASON_PLACEMENT_GROUPS_SYNCED,
    REASON_PLACEMENT_GROUPS_SYNC_FAILED,
};
use tracing::{info, warn};

const RESOURCE_TYPE: &str = "placement_group";

/// Remote name of the placement group `name` of `cluster_name`.
#[must_use]
pub fn remote_placement_group_name(cluster_name: &str, name: &str) -> String {
    format!("{cluster_name}-{name}")
}

fn logical_name<'a>(cluster_name: &str, remote_name: &'a str) -> &'a str {
    remote_name
        .strip_prefix(cluster_name)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(remote_name)
}

fn matches_spec(cluster_name: &str, observed: &PlacementGroup, desired: &PlacementGroupSpec) -> bool {
    logical_name(cluster_name, &observed.name) == desired.name
        && observed.placement_group_type == desired.r#type
}

fn to_status(cluster_name: &str, pg: &PlacementGroup) -> PlacementGroupStatus {
    PlacementGroupStatus {
        id: pg.id,
        name: logical_name(cluster_name, &pg.name).to_string(),
        r#type: pg.placement_group_type.clone(),
        server_count: u32::try_from(pg.servers.len()).unwrap_or(u32::MAX),
    }
}

/// Converge the owned placement groups onto the desired set.
///
/// # Errors
///
/// Returns the first failed call; `PlacementGroupsSynced` is `False` in that case.
pub async fn reconcile_placement_groups(
    cluster: &mut HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<(), SyncError> {
    let cluster_name = cluster.cluster_name();
    let desired = cluster.spec.hcloud_placement_groups.clone();

    match sync_placement_groups(&cluster_name, client, &desired).await {
        Ok(converged) => {
            let status = cluster.status_mut();
            status.hcloud_placement_groups = converged
                .iter()
                .map(|pg| to_status(&cluster_name, pg))
                .collect();
            mark_true(
                &mut status.conditions,
                CONDITION_TYPE_PLACEMENT_GROUPS_SYNCED,
                REASON_PLACEMENT_GROUPS_SYNCED,
                &format!("{} placement groups in sync", converged.len()),
            );
            Ok(())
        }
        Err(e) => {
            let reason = match &e {
                SyncError::Api { source, .. } => {
                    api_failure_reason(source, REASON_PLACEMENT_GROUPS_SYNC_FAILED)
                }
                SyncError::Ownership(_) => REASON_PLACEMENT_GROUPS_SYNC_FAILED,
            };
            warn!(cluster = %cluster_name, error = %e, "Placement group reconciliation failed");
            mark_false(
                &mut cluster.status_mut().conditions,
                CONDITION_TYPE_PLACEMENT_GROUPS_SYNCED,
                reason,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            Err(e)
        }
    }
}

async fn sync_placement_groups(
    cluster_name: &str,
    client: &dyn HCloudClient,
    desired: &[PlacementGroupSpec],
) -> Result<Vec<PlacementGroup>, SyncError> {
    let observed = client
        .list_placement_groups(&ListOpts::owned_by(cluster_name))
        .await
        .map_err(|e| SyncError::api("listing placement groups", e))?;

    let (kept, stale): (Vec<_>, Vec<_>) = observed
        .into_iter()
        .partition(|pg| desired.iter().any(|d| matches_spec(cluster_name, pg, d)));

    for pg in stale {
        match client.delete_placement_group(pg.id).await {
            Ok(()) => {
                record_resource_deleted(RESOURCE_TYPE);
                info!(cluster = %cluster_name, id = pg.id, name = %pg.name, "Deleted placement group");
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(SyncError::api(
                    format!("deleting placement group {}", pg.name),
                    e,
                ))
            }
        }
    }

    let mut converged = kept;
    for spec in desired {
        if converged.iter().any(|pg| matches_spec(cluster_name, pg, spec)) {
            continue;
        }
        let opts = CreatePlacementGroupOpts {
            name: remote_placement_group_name(cluster_name, &spec.name),
            placement_group_type: spec.r#type.clone(),
            labels: owned_labels(cluster_name),
        };
        let created = client
            .create_placement_group(&opts)
            .await
            .map_err(|e| SyncError::api(format!("creating placement group {}", opts.name), e))?;
        record_resource_created(RESOURCE_TYPE);
        info!(cluster = %cluster_name, id = created.id, name = %created.name, "Created placement group");
        converged.push(created);
    }

    Ok(converged)
}

/// Delete every placement group owned by the cluster.
///
/// # Errors
///
/// Returns an error if listing or deleting fails. Already missing groups are fine.
pub async fn delete_placement_groups(
    cluster: &HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<(), SyncError> {
    sync_placement_groups(&cluster.cluster_name(), client, &[])
        .await
        .map(|_| ())
}

#[cfg(test)]
#[path = "placement_groups_tests.rs"]
mod placement_groups_tests;

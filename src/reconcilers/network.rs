// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Private network readiness.
//!
//! With `spec.hcloudNetwork.enabled` the cluster gets one owned network named
//! after the cluster, with a single cloud subnet. Disabling the network removes
//! an owned one.

use crate::crd::{ConditionSeverity, ConditionStatus, HetznerCluster, NetworkSpec, NetworkStatus};
use crate::hcloud::{CreateNetworkOpts, HCloudClient, ListOpts, Network};
use crate::labels::owned_labels;
use crate::metrics::{record_resource_created, record_resource_deleted};
use crate::reconcilers::status::{mark_false, mark_true, set_condition};
use crate::reconcilers::sync_error::{api_failure_reason, SyncError};
use crate::status_reasons::{
    CONDITION_TYPE_NETWORK_READY, REASON_NETWORK_DISABLED, REASON_NETWORK_READY,
    REASON_NETWORK_RECONCILE_FAILED,
};
use tracing::{debug, info, warn};

const RESOURCE_TYPE: &str = "network";

/// Converge the private network and its condition.
///
/// # Errors
///
/// Returns the failed call; `NetworkReady` is `False` in that case.
pub async fn reconcile_network(
    cluster: &mut HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<(), SyncError> {
    let cluster_name = cluster.cluster_name();
    let spec = cluster.spec.hcloud_network.clone();

    let result = if spec.enabled {
        ensure_network(&cluster_name, client, &spec).await.map(Some)
    } else {
        delete_owned_networks(&cluster_name, client).await.map(|()| None)
    };

    match result {
        Ok(Some(network)) => {
            let status = cluster.status_mut();
            status.network = Some(NetworkStatus {
                id: network.id,
                ip_range: network.ip_range.clone(),
            });
            mark_true(
                &mut status.conditions,
                CONDITION_TYPE_NETWORK_READY,
                REASON_NETWORK_READY,
                &format!("network {} ({}) is ready", network.name, network.ip_range),
            );
            Ok(())
        }
        Ok(None) => {
            let status = cluster.status_mut();
            status.network = None;
            set_condition(
                &mut status.conditions,
                CONDITION_TYPE_NETWORK_READY,
                ConditionStatus::True,
                REASON_NETWORK_DISABLED,
                Some(ConditionSeverity::Info),
                "private network is disabled",
            );
            Ok(())
        }
        Err(e) => {
            let reason = match &e {
                SyncError::Api { source, .. } => {
                    api_failure_reason(source, REASON_NETWORK_RECONCILE_FAILED)
                }
                SyncError::Ownership(_) => REASON_NETWORK_RECONCILE_FAILED,
            };
            warn!(cluster = %cluster_name, error = %e, "Network reconciliation failed");
            mark_false(
                &mut cluster.status_mut().conditions,
                CONDITION_TYPE_NETWORK_READY,
                reason,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            Err(e)
        }
    }
}

async fn ensure_network(
    cluster_name: &str,
    client: &dyn HCloudClient,
    spec: &NetworkSpec,
) -> Result<Network, SyncError> {
    let mut owned = client
        .list_networks(&ListOpts::owned_by(cluster_name))
        .await
        .map_err(|e| SyncError::api("listing networks", e))?;

    if owned.len() > 1 {
        return Err(SyncError::Ownership(format!(
            "{} networks are owned by cluster {cluster_name}",
            owned.len()
        )));
    }
    if let Some(network) = owned.pop() {
        debug!(cluster = %cluster_name, id = network.id, "Found owned network");
        return Ok(network);
    }

    let opts = CreateNetworkOpts {
        name: cluster_name.to_string(),
        ip_range: spec.cidr_block.clone(),
        subnet_ip_range: spec.subnet_cidr_block.clone(),
        network_zone: spec.network_zone.clone(),
        labels: owned_labels(cluster_name),
    };
    let network = client
        .create_network(&opts)
        .await
        .map_err(|e| SyncError::api(format!("creating network {}", opts.name), e))?;

    record_resource_created(RESOURCE_TYPE);
    info!(cluster = %cluster_name, id = network.id, ip_range = %network.ip_range, "Created network");
    Ok(network)
}

async fn delete_owned_networks(cluster_name: &str, client: &dyn HCloudClient) -> Result<(), SyncError> {
    let owned = client
        .list_networks(&ListOpts::owned_by(cluster_name))
        .await
        .map_err(|e| SyncError::api("listing networks", e))?;

    for network in owned {
        match client.delete_network(network.id).await {
            Ok(()) => {
                record_resource_deleted(RESOURCE_TYPE);
                info!(cluster = %cluster_name, id = network.id, "Deleted network");
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(SyncError::api(format!("deleting network {}", network.name), e))
            }
        }
    }
    Ok(())
}

/// Delete the network owned by the cluster, if any.
///
/// # Errors
///
/// Returns an error if listing or deleting fails.
pub async fn delete_network(cluster: &HetznerCluster, client: &dyn HCloudClient) -> Result<(), SyncError> {
    delete_owned_networks(&cluster.cluster_name(), client).await
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod network_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovery of servers owned by the cluster.
//!
//! Machines are provisioned elsewhere; this only counts servers carrying the
//! ownership label so teardown knows when shared resources can go.

use crate::crd::HetznerCluster;
use crate::hcloud::{HCloudClient, ListOpts};
use crate::reconcilers::sync_error::SyncError;
use tracing::debug;

/// Count owned servers and record the number in `status.ownedServerCount`.
///
/// # Errors
///
/// Returns an error if the server list cannot be read.
pub async fn reconcile_owned_servers(
    cluster: &mut HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<u32, SyncError> {
    let cluster_name = cluster.cluster_name();
    let servers = client
        .list_servers(&ListOpts::owned_by(&cluster_name))
        .await
        .map_err(|e| SyncError::api("listing servers", e))?;

    let count = u32::try_from(servers.len()).unwrap_or(u32::MAX);
    debug!(cluster = %cluster_name, count, "Counted owned servers");
    cluster.status_mut().owned_server_count = count;
    Ok(count)
}

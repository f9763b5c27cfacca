// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control-plane endpoint resolution.
//!
//! The endpoint is derived from the converged load balancer: its public IPv4 and
//! the API server port. With the load balancer disabled the endpoint has to be
//! supplied by the user and is never invented here.

use crate::crd::{ApiEndpoint, ConditionSeverity, HetznerCluster};
use crate::reconcilers::status::{mark_false, mark_true};
use crate::status_reasons::{
    CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET, REASON_CONTROL_PLANE_ENDPOINT_NOT_SET,
    REASON_CONTROL_PLANE_ENDPOINT_SET,
};
use tracing::info;

/// Point `spec.controlPlaneEndpoint` at the load balancer.
///
/// Returns `true` if the spec was changed. A zero-value endpoint counts as set but
/// different, so it is overwritten.
pub fn set_control_plane_endpoint(cluster: &mut HetznerCluster) -> bool {
    let lb_spec = &cluster.spec.control_plane_load_balancer;
    if !lb_spec.enabled {
        return false;
    }

    let Some(ipv4) = cluster
        .status
        .as_ref()
        .and_then(|status| status.control_plane_load_balancer.as_ref())
        .map(|lb| lb.ipv4.clone())
        .filter(|ipv4| !ipv4.is_empty())
    else {
        return false;
    };

    let desired = ApiEndpoint {
        host: ipv4,
        port: i32::from(lb_spec.port),
    };
    if cluster.spec.control_plane_endpoint.as_ref() == Some(&desired) {
        return false;
    }

    info!(
        cluster = %cluster.cluster_name(),
        host = %desired.host,
        port = desired.port,
        "Setting control plane endpoint from load balancer"
    );
    cluster.spec.control_plane_endpoint = Some(desired);
    true
}

/// Reflect the current endpoint on `ControlPlaneEndpointSet`. Returns whether it is usable.
pub fn update_endpoint_condition(cluster: &mut HetznerCluster) -> bool {
    let endpoint = cluster
        .spec
        .control_plane_endpoint
        .clone()
        .filter(ApiEndpoint::is_valid);
    let conditions = &mut cluster.status_mut().conditions;

    match endpoint {
        Some(endpoint) => {
            mark_true(
                conditions,
                CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET,
                REASON_CONTROL_PLANE_ENDPOINT_SET,
                &format!("{}:{}", endpoint.host, endpoint.port),
            );
            true
        }
        None => {
            mark_false(
                conditions,
                CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET,
                REASON_CONTROL_PLANE_ENDPOINT_NOT_SET,
                ConditionSeverity::Warning,
                "control plane endpoint is not set",
            );
            false
        }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod endpoint_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Structural validation of a `HetznerCluster` spec.
//!
//! Admission normally rejects these cases. The reconciler checks them again before
//! issuing any remote call, since a malformed spec could otherwise create or delete
//! shared resources under the wrong name.

use crate::crd::{HetznerClusterSpec, KNOWN_REGIONS, PLACEMENT_GROUP_TYPES};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown region {region:?} in controlPlaneRegions")]
    UnknownRegion { region: String },

    #[error("controlPlaneLoadBalancer.region must be set")]
    MissingLoadBalancerRegion,

    #[error("unknown load balancer region {region:?}")]
    UnknownLoadBalancerRegion { region: String },

    #[error("controlPlaneLoadBalancer.name must not be empty when set")]
    EmptyLoadBalancerName,

    #[error("placement group name must not be empty")]
    EmptyPlacementGroupName,

    #[error("duplicate placement group name {name:?}")]
    DuplicatePlacementGroup { name: String },

    #[error("placement group {name:?} has unsupported type {placement_group_type:?}")]
    UnsupportedPlacementGroupType {
        name: String,
        placement_group_type: String,
    },

    #[error("ssh key name must not be empty")]
    EmptySshKeyName,

    #[error("load balancer service listen port must not be 0")]
    ZeroListenPort,

    #[error("duplicate load balancer listen port {port}")]
    DuplicateListenPort { port: u16 },
}

/// Check the invariants admission is expected to enforce.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn validate_spec(spec: &HetznerClusterSpec) -> Result<(), ValidationError> {
    for region in &spec.control_plane_regions {
        if !KNOWN_REGIONS.contains(&region.as_str()) {
            return Err(ValidationError::UnknownRegion {
                region: region.clone(),
            });
        }
    }

    validate_load_balancer(spec)?;
    validate_placement_groups(spec)?;

    if spec.ssh_keys.hcloud.iter().any(|key| key.name.trim().is_empty()) {
        return Err(ValidationError::EmptySshKeyName);
    }

    Ok(())
}

fn validate_load_balancer(spec: &HetznerClusterSpec) -> Result<(), ValidationError> {
    let lb = &spec.control_plane_load_balancer;
    if !lb.enabled {
        return Ok(());
    }

    if lb.region.is_empty() {
        return Err(ValidationError::MissingLoadBalancerRegion);
    }
    if !KNOWN_REGIONS.contains(&lb.region.as_str()) {
        return Err(ValidationError::UnknownLoadBalancerRegion {
            region: lb.region.clone(),
        });
    }
    if lb.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ValidationError::EmptyLoadBalancerName);
    }

    // The API server service listens on the endpoint port when one is set.
    let api_server_port = spec
        .control_plane_endpoint
        .as_ref()
        .filter(|endpoint| endpoint.is_valid())
        .and_then(|endpoint| u16::try_from(endpoint.port).ok())
        .unwrap_or(lb.port);

    let mut ports = HashSet::from([api_server_port]);
    for service in &lb.extra_services {
        if service.listen_port == 0 {
            return Err(ValidationError::ZeroListenPort);
        }
        if !ports.insert(service.listen_port) {
            return Err(ValidationError::DuplicateListenPort {
                port: service.listen_port,
            });
        }
    }
    Ok(())
}

fn validate_placement_groups(spec: &HetznerClusterSpec) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for pg in &spec.hcloud_placement_groups {
        if pg.name.trim().is_empty() {
            return Err(ValidationError::EmptyPlacementGroupName);
        }
        if !PLACEMENT_GROUP_TYPES.contains(&pg.r#type.as_str()) {
            return Err(ValidationError::UnsupportedPlacementGroupType {
                name: pg.name.clone(),
                placement_group_type: pg.r#type.clone(),
            });
        }
        if !names.insert(pg.name.as_str()) {
            return Err(ValidationError::DuplicatePlacementGroup {
                name: pg.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;

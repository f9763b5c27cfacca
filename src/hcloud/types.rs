// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remote Hetzner Cloud resources as seen by the reconcilers.
//!
//! These are flattened views of the API objects: only the fields the reconcilers
//! compare or record are kept. Wire formats live in [`super::client`].

use crate::labels::owned_label_selector;
use std::collections::BTreeMap;

/// Filter for list calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOpts {
    /// Hetzner label selector, e.g. `caph-cluster-prod=owned`.
    pub label_selector: Option<String>,

    /// Exact resource name.
    pub name: Option<String>,
}

impl ListOpts {
    /// Resources carrying the ownership label of `cluster_name`.
    #[must_use]
    pub fn owned_by(cluster_name: &str) -> Self {
        Self {
            label_selector: Some(owned_label_selector(cluster_name)),
            name: None,
        }
    }

    /// Resources with exactly this name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            label_selector: None,
            name: Some(name.to_string()),
        }
    }
}

/// Target service of a load balancer. Keyed by `listen_port`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadBalancerService {
    pub listen_port: u16,
    pub destination_port: u16,
    pub protocol: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadBalancer {
    pub id: i64,
    pub name: String,
    pub load_balancer_type: String,
    pub location: String,
    pub algorithm: String,
    pub labels: BTreeMap<String, String>,
    pub services: Vec<LoadBalancerService>,
    pub target_count: u32,
    pub ipv4: String,
    pub ipv6: String,
    /// Address in the private network, if attached.
    pub private_ip: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateLoadBalancerOpts {
    pub name: String,
    pub load_balancer_type: String,
    pub location: String,
    pub algorithm: String,
    pub labels: BTreeMap<String, String>,
    /// Private network to attach to.
    pub network: Option<i64>,
}

/// Fields of a load balancer that can be patched in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateLoadBalancerOpts {
    pub name: Option<String>,
    /// Full replacement label map.
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacementGroup {
    pub id: i64,
    pub name: String,
    pub placement_group_type: String,
    pub labels: BTreeMap<String, String>,
    pub servers: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePlacementGroupOpts {
    pub name: String,
    pub placement_group_type: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Network {
    pub id: i64,
    pub name: String,
    pub ip_range: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateNetworkOpts {
    pub name: String,
    pub ip_range: String,
    pub subnet_ip_range: String,
    pub network_zone: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for Hetzner cluster infrastructure.
//!
//! A [`HetznerCluster`] declares the cluster-level Hetzner Cloud resources of a
//! Kubernetes cluster: the control-plane load balancer, the private network, the
//! placement groups for machines, and the secret holding the HCloud API token.
//!
//! # Example
//!
//! ```rust,no_run
//! use hetzner_operator::crd::{HetznerCluster, HetznerClusterSpec, PlacementGroupSpec};
//!
//! let spec = HetznerClusterSpec {
//!     control_plane_regions: vec!["fsn1".to_string()],
//!     hcloud_placement_groups: vec![PlacementGroupSpec {
//!         name: "control-plane".to_string(),
//!         r#type: "spread".to_string(),
//!     }],
//!     ..Default::default()
//! };
//! let cluster = HetznerCluster::new("prod", spec);
//! ```

use crate::constants::{
    DEFAULT_API_SERVER_PORT, DEFAULT_HCLOUD_TOKEN_KEY, DEFAULT_HETZNER_SECRET_NAME,
    DEFAULT_LOAD_BALANCER_TYPE, DEFAULT_NETWORK_CIDR, DEFAULT_NETWORK_ZONE, DEFAULT_SUBNET_CIDR,
};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regions the control plane may be placed in.
pub const KNOWN_REGIONS: [&str; 6] = ["fsn1", "nbg1", "hel1", "ash", "hil", "sin"];

/// Placement group types supported by Hetzner Cloud.
pub const PLACEMENT_GROUP_TYPES: [&str; 1] = ["spread"];

/// Status of a condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How urgent a `False` condition is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

/// Standard Kubernetes condition with a severity.
///
/// At most one condition per `type` exists in a status. `lastTransitionTime`
/// only moves when `status` changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. `LoadBalancerReady`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: ConditionStatus,

    /// Severity of a non-`True` condition. Absent means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConditionSeverity>,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Host and port of the Kubernetes API server.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ApiEndpoint {
    /// DNS name or IP address.
    pub host: String,

    /// Port of the API server.
    pub port: i32,
}

impl ApiEndpoint {
    /// An endpoint is usable when both host and port are filled in.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

/// Load balancing algorithm of the control-plane load balancer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerAlgorithm {
    RoundRobin,
    #[default]
    LeastConnections,
}

impl LoadBalancerAlgorithm {
    /// Name used by the Hetzner Cloud API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastConnections => "least_connections",
        }
    }
}

/// Protocol of a load balancer service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProtocol {
    #[default]
    Tcp,
    Http,
    Https,
}

impl ServiceProtocol {
    /// Name used by the Hetzner Cloud API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Additional service forwarded by the control-plane load balancer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerServiceSpec {
    /// Port the load balancer listens on. Unique per load balancer.
    pub listen_port: u16,

    /// Port on the targets traffic is forwarded to.
    pub destination_port: u16,

    /// Protocol of the service.
    #[serde(default)]
    pub protocol: ServiceProtocol,
}

fn default_true() -> bool {
    true
}

fn default_load_balancer_type() -> String {
    DEFAULT_LOAD_BALANCER_TYPE.to_string()
}

fn default_api_server_port() -> u16 {
    DEFAULT_API_SERVER_PORT
}

/// Control-plane load balancer specification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    /// Whether the operator manages a load balancer in front of the API server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of an existing load balancer to adopt, or the desired name of the managed one.
    ///
    /// When unset a name is generated from the cluster name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Load balancer type, e.g. `lb11`.
    #[serde(default = "default_load_balancer_type")]
    pub r#type: String,

    /// Location of the load balancer, e.g. `fsn1`.
    #[serde(default)]
    pub region: String,

    /// Balancing algorithm.
    #[serde(default)]
    pub algorithm: LoadBalancerAlgorithm,

    /// Port of the kube-apiserver on the control-plane machines.
    #[serde(default = "default_api_server_port")]
    pub port: u16,

    /// Extra services besides the kube-apiserver.
    #[serde(default)]
    pub extra_services: Vec<LoadBalancerServiceSpec>,
}

impl Default for LoadBalancerSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            r#type: default_load_balancer_type(),
            region: String::new(),
            algorithm: LoadBalancerAlgorithm::default(),
            port: DEFAULT_API_SERVER_PORT,
            extra_services: Vec::new(),
        }
    }
}

fn default_network_cidr() -> String {
    DEFAULT_NETWORK_CIDR.to_string()
}

fn default_subnet_cidr() -> String {
    DEFAULT_SUBNET_CIDR.to_string()
}

fn default_network_zone() -> String {
    DEFAULT_NETWORK_ZONE.to_string()
}

/// Private network specification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Whether a private network is created for the cluster.
    #[serde(default)]
    pub enabled: bool,

    /// IP range of the network.
    #[serde(default = "default_network_cidr")]
    pub cidr_block: String,

    /// IP range of the cloud subnet.
    #[serde(default = "default_subnet_cidr")]
    pub subnet_cidr_block: String,

    /// Network zone of the cloud subnet.
    #[serde(default = "default_network_zone")]
    pub network_zone: String,
}

impl Default for NetworkSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            cidr_block: default_network_cidr(),
            subnet_cidr_block: default_subnet_cidr(),
            network_zone: default_network_zone(),
        }
    }
}

fn default_placement_group_type() -> String {
    PLACEMENT_GROUP_TYPES[0].to_string()
}

/// Desired placement group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacementGroupSpec {
    /// Logical name, unique within the cluster.
    pub name: String,

    /// Placement group type. Only `spread` is supported.
    #[serde(default = "default_placement_group_type")]
    pub r#type: String,
}

/// Reference to an SSH key stored in Hetzner Cloud.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SshKey {
    /// Name of the key in Hetzner Cloud.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// SSH keys used by machines of the cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SshKeys {
    #[serde(default)]
    pub hcloud: Vec<SshKey>,
}

fn default_secret_name() -> String {
    DEFAULT_HETZNER_SECRET_NAME.to_string()
}

fn default_token_key() -> String {
    DEFAULT_HCLOUD_TOKEN_KEY.to_string()
}

/// Keys inside the Hetzner secret.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerSecretKeyRef {
    /// Key holding the HCloud API token.
    #[serde(default = "default_token_key")]
    pub hcloud_token: String,
}

impl Default for HetznerSecretKeyRef {
    fn default() -> Self {
        Self {
            hcloud_token: default_token_key(),
        }
    }
}

/// Secret in the cluster namespace holding Hetzner credentials.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerSecretRef {
    #[serde(default = "default_secret_name")]
    pub name: String,

    #[serde(default)]
    pub key: HetznerSecretKeyRef,
}

impl Default for HetznerSecretRef {
    fn default() -> Self {
        Self {
            name: default_secret_name(),
            key: HetznerSecretKeyRef::default(),
        }
    }
}

/// `HetznerCluster` declares the cluster-level Hetzner Cloud infrastructure.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "HetznerCluster",
    namespaced,
    shortname = "hc",
    doc = "HetznerCluster manages the control-plane load balancer, private network and placement groups of a cluster running on Hetzner Cloud."
)]
#[kube(status = "HetznerClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct HetznerClusterSpec {
    /// Regions control-plane machines are spread across.
    #[serde(default)]
    pub control_plane_regions: Vec<String>,

    /// Endpoint of the API server.
    ///
    /// Filled in by the operator from the load balancer address, or supplied by the
    /// user when the load balancer is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,

    #[serde(default)]
    pub control_plane_load_balancer: LoadBalancerSpec,

    #[serde(default)]
    pub hcloud_network: NetworkSpec,

    #[serde(default)]
    pub hcloud_placement_groups: Vec<PlacementGroupSpec>,

    #[serde(default)]
    pub ssh_keys: SshKeys,

    #[serde(default)]
    pub hetzner_secret_ref: HetznerSecretRef,
}

/// Observed control-plane load balancer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStatus {
    pub id: i64,
    pub name: String,
    pub r#type: String,
    #[serde(default)]
    pub ipv4: String,
    #[serde(default)]
    pub ipv6: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_ip: Option<String>,
    #[serde(default)]
    pub target_count: u32,
}

/// Observed private network.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub id: i64,
    pub ip_range: String,
}

/// Observed placement group.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacementGroupStatus {
    pub id: i64,
    /// Logical name from the spec.
    pub name: String,
    pub r#type: String,
    #[serde(default)]
    pub server_count: u32,
}

/// `HetznerCluster` status, owned exclusively by the operator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Serialized as `null` when absent so a merge patch clears it.
    #[serde(default)]
    pub control_plane_load_balancer: Option<LoadBalancerStatus>,

    #[serde(default)]
    pub network: Option<NetworkStatus>,

    #[serde(default)]
    pub hcloud_placement_groups: Vec<PlacementGroupStatus>,

    /// Number of servers carrying the cluster ownership label.
    #[serde(default)]
    pub owned_server_count: u32,

    /// True once every readiness condition holds.
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl HetznerCluster {
    /// Name used to scope remote resources to this cluster.
    #[must_use]
    pub fn cluster_name(&self) -> String {
        self.name_any()
    }

    /// Conditions of the current status, empty when there is no status yet.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[][..], |status| status.conditions.as_slice())
    }

    /// Mutable status, created empty on first access.
    pub fn status_mut(&mut self) -> &mut HetznerClusterStatus {
        self.status.get_or_insert_with(HetznerClusterStatus::default)
    }

    /// Whether a deletion has been requested.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition types and reasons for `HetznerCluster` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! Each reconciliation step owns one condition type. The encompassing `Ready`
//! condition summarizes all of them.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   ready: false
//!   conditions:
//!     - type: HCloudTokenAvailable
//!       status: "True"
//!       reason: TokenAvailable
//!     - type: LoadBalancerReady
//!       status: "False"
//!       reason: LoadBalancerFailedToOwn
//!       severity: Error
//!       message: "load balancer lb-1 not found"
//!     - type: Ready
//!       status: "False"
//!       reason: NotReady
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Encompassing readiness of the cluster infrastructure
pub const CONDITION_TYPE_READY: &str = "Ready";

/// The HCloud token could be read from the referenced secret and is well formed
pub const CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE: &str = "HCloudTokenAvailable";

/// The last call to the Hetzner Cloud API was answered
///
/// Also drives the rate-limit backoff: while this condition is `False` with
/// reason [`REASON_RATE_LIMIT_EXCEEDED`], no API call is made until the wait
/// window since `lastTransitionTime` has elapsed.
pub const CONDITION_TYPE_HETZNER_API_REACHABLE: &str = "HetznerAPIReachable";

/// The private network matches the spec
pub const CONDITION_TYPE_NETWORK_READY: &str = "NetworkReady";

/// The control-plane load balancer is owned and in sync
pub const CONDITION_TYPE_LOAD_BALANCER_READY: &str = "LoadBalancerReady";

/// Owned placement groups match the desired set
pub const CONDITION_TYPE_PLACEMENT_GROUPS_SYNCED: &str = "PlacementGroupsSynced";

/// A usable control-plane endpoint is present in the spec
pub const CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET: &str = "ControlPlaneEndpointSet";

/// Conditions that must all be `True` before the cluster is ready
pub const READINESS_CONDITION_TYPES: [&str; 5] = [
    CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE,
    CONDITION_TYPE_NETWORK_READY,
    CONDITION_TYPE_LOAD_BALANCER_READY,
    CONDITION_TYPE_PLACEMENT_GROUPS_SYNCED,
    CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET,
];

// ============================================================================
// Ready Reasons
// ============================================================================

/// All readiness conditions are `True`.
pub const REASON_ALL_READY: &str = "AllReady";

/// At least one readiness condition is not `True`.
pub const REASON_NOT_READY: &str = "NotReady";

/// The cluster is being deleted and remote resources are being released.
pub const REASON_DELETING: &str = "Deleting";

/// Teardown waits for owned servers to disappear before deleting shared resources.
pub const REASON_WAITING_FOR_SERVERS: &str = "WaitingForServers";

// ============================================================================
// Credential Reasons
// ============================================================================

/// The token was read and is well formed.
pub const REASON_TOKEN_AVAILABLE: &str = "TokenAvailable";

/// The referenced secret could not be read.
///
/// **Common causes:** wrong secret name, secret in another namespace, missing RBAC.
pub const REASON_HETZNER_SECRET_UNREACHABLE: &str = "HetznerSecretUnreachable";

/// The secret exists but the token is missing, empty or not valid UTF-8.
///
/// Also used when the API rejects the token (HTTP 401).
pub const REASON_HCLOUD_CREDENTIALS_INVALID: &str = "HCloudCredentialsInvalid";

// ============================================================================
// API Reachability Reasons
// ============================================================================

/// The API answered the last request.
pub const REASON_API_REACHABLE: &str = "APIReachable";

/// The API answered with HTTP 429 or `rate_limit_exceeded`.
pub const REASON_RATE_LIMIT_EXCEEDED: &str = "RateLimitExceeded";

/// Transport failure, timeout or 5xx response.
pub const REASON_HCLOUD_API_UNREACHABLE: &str = "HCloudAPIUnreachable";

// ============================================================================
// Load Balancer Reasons
// ============================================================================

/// Load balancer exists, is owned and matches the spec.
pub const REASON_LOAD_BALANCER_READY: &str = "LoadBalancerReady";

/// The load balancer is disabled in the spec.
pub const REASON_LOAD_BALANCER_DISABLED: &str = "LoadBalancerDisabled";

/// A named load balancer is missing, ambiguous or owned by another cluster.
///
/// Retried on every pass: the conflict may be resolved out-of-band.
pub const REASON_LOAD_BALANCER_FAILED_TO_OWN: &str = "LoadBalancerFailedToOwn";

/// Creating the load balancer failed.
pub const REASON_CREATE_LOAD_BALANCER_FAILED: &str = "CreateLoadBalancerFailed";

/// Renaming, relabeling or changing the type/algorithm failed.
pub const REASON_LOAD_BALANCER_UPDATE_FAILED: &str = "LoadBalancerUpdateFailed";

/// Adding, updating or removing a target service failed.
pub const REASON_LOAD_BALANCER_SERVICE_SYNC_FAILED: &str = "LoadBalancerServiceSyncFailed";

// ============================================================================
// Placement Group Reasons
// ============================================================================

/// Owned placement groups match the spec.
pub const REASON_PLACEMENT_GROUPS_SYNCED: &str = "PlacementGroupsSynced";

/// A placement group could not be created or deleted.
pub const REASON_PLACEMENT_GROUPS_SYNC_FAILED: &str = "PlacementGroupsSyncFailed";

// ============================================================================
// Network Reasons
// ============================================================================

/// Private network exists and is owned.
pub const REASON_NETWORK_READY: &str = "NetworkReady";

/// The private network is disabled in the spec.
pub const REASON_NETWORK_DISABLED: &str = "NetworkDisabled";

/// The private network could not be created or deleted.
pub const REASON_NETWORK_RECONCILE_FAILED: &str = "NetworkReconcileFailed";

// ============================================================================
// Endpoint Reasons
// ============================================================================

/// The control-plane endpoint is set.
pub const REASON_CONTROL_PLANE_ENDPOINT_SET: &str = "ControlPlaneEndpointSet";

/// Neither the load balancer nor the user supplied a usable endpoint.
pub const REASON_CONTROL_PLANE_ENDPOINT_NOT_SET: &str = "ControlPlaneEndpointNotSet";

// ============================================================================
// Validation Reasons
// ============================================================================

/// The spec violates an invariant and no remote call was attempted.
pub const REASON_CONFIGURATION_INVALID: &str = "ConfigurationInvalid";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Hetzner cluster operator.
//!
//! Numeric and string constants used throughout the codebase, organized by category.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `HetznerCluster` CRD
pub const API_GROUP: &str = "infrastructure.cluster.x-k8s.io";

/// API version of the `HetznerCluster` CRD
pub const API_VERSION: &str = "v1beta1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta1";

/// Kind name for `HetznerCluster` resource
pub const KIND_HETZNER_CLUSTER: &str = "HetznerCluster";

// ============================================================================
// Hetzner Cloud API Constants
// ============================================================================

/// Public endpoint of the Hetzner Cloud API
pub const DEFAULT_HCLOUD_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Page size used when listing remote resources
pub const HCLOUD_PAGE_SIZE: u32 = 50;

/// Upper bound on pages fetched by a single list call
pub const HCLOUD_MAX_PAGES: u32 = 100;

/// Timeout for a single Hetzner Cloud API request
pub const HCLOUD_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Load Balancer Defaults
// ============================================================================

/// Default load balancer type
pub const DEFAULT_LOAD_BALANCER_TYPE: &str = "lb11";

/// Default kube-apiserver port exposed by the control-plane load balancer
pub const DEFAULT_API_SERVER_PORT: u16 = 6443;

/// Suffix inserted into generated load balancer names
pub const LOAD_BALANCER_NAME_INFIX: &str = "kube-apiserver";

/// Number of hex characters appended to generated load balancer names
pub const LOAD_BALANCER_NAME_HASH_LEN: usize = 5;

// ============================================================================
// Network Defaults
// ============================================================================

/// Default IP range of the private cluster network
pub const DEFAULT_NETWORK_CIDR: &str = "10.0.0.0/16";

/// Default IP range of the cloud subnet inside the private network
pub const DEFAULT_SUBNET_CIDR: &str = "10.0.0.0/24";

/// Default network zone of the cloud subnet
pub const DEFAULT_NETWORK_ZONE: &str = "eu-central";

// ============================================================================
// Secret Defaults
// ============================================================================

/// Default name of the secret holding the Hetzner credentials
pub const DEFAULT_HETZNER_SECRET_NAME: &str = "hetzner";

/// Default key of the HCloud token inside the secret
pub const DEFAULT_HCLOUD_TOKEN_KEY: &str = "hcloud";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Time the controller stays away from the API after a rate-limit response
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 300;

/// Requeue interval once the cluster is ready
pub const REQUEUE_WHEN_READY_SECS: u64 = 300;

/// Requeue interval while the cluster is converging
pub const REQUEUE_WHEN_NOT_READY_SECS: u64 = 30;

/// Requeue interval after a transient failure
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval while owned servers still block teardown
pub const TEARDOWN_REQUEUE_SECS: u64 = 10;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address of the metrics server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

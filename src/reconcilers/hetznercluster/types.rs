// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared types and imports for `HetznerCluster` reconciliation.
//!
//! This module provides common type re-exports used across the hetznercluster
//! reconciliation modules.

#![allow(clippy::wildcard_imports)]

// Re-export commonly used types from parent modules
pub use crate::config::ReconcilerConfig;
pub use crate::crd::{
    Condition, ConditionSeverity, HetznerCluster, HetznerClusterStatus,
};
pub use crate::labels::FINALIZER_HETZNER_CLUSTER;
pub use crate::reconcilers::status::{conditions_equal, is_true, mark_false, mark_true};
pub use crate::status_reasons::{
    CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE, CONDITION_TYPE_READY, READINESS_CONDITION_TYPES,
    REASON_ALL_READY, REASON_CONFIGURATION_INVALID, REASON_DELETING,
    REASON_HCLOUD_CREDENTIALS_INVALID, REASON_NOT_READY, REASON_TOKEN_AVAILABLE,
    REASON_WAITING_FOR_SERVERS,
};

// Re-export kube-rs types
pub use kube::{
    api::{Patch, PatchParams},
    client::Client,
    Api, ResourceExt,
};

// Re-export common utilities
pub use anyhow::Result;
pub use chrono::Utc;
pub use serde_json::json;
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tracing::{debug, error, info, warn};

/// Resource type label used in metrics.
pub const RESOURCE_TYPE: &str = "hetznercluster";

/// Field manager for status and spec patches.
pub const FIELD_MANAGER: &str = "hetzner-operator";

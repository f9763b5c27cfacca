// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of `HetznerCluster` resources against Hetzner Cloud.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `kube::runtime::Controller` monitors `HetznerCluster` changes
//! 2. **Reconcile** - Compare the spec with the resources found in Hetzner Cloud
//! 3. **Update** - Create, adopt, update or delete remote resources
//! 4. **Status** - Report the result as conditions on the cluster
//!
//! Every step works on an in-memory copy of the cluster and the Hetzner Cloud API
//! behind the [`crate::hcloud::HCloudClient`] trait, so the whole pass can be run
//! against a fake.
//!
//! # Steps
//!
//! - [`rate_limit`] - Defers all API calls after a rate-limit response
//! - [`validation`] - Structural checks on the spec before any remote call
//! - [`network`] - Private network
//! - [`loadbalancer`] - Control-plane load balancer and its services
//! - [`placement_groups`] - Placement group set reconciliation
//! - [`servers`] - Discovery of servers owned by the cluster
//! - [`endpoint`] - Control-plane endpoint derived from the load balancer
//!
//! [`hetznercluster`] runs them in order and [`status`] holds the conditions they
//! report.
//!
//! # Example: Running a pass
//!
//! ```rust,no_run
//! use hetzner_operator::crd::HetznerCluster;
//! use hetzner_operator::reconcilers::Reconciler;
//!
//! async fn pass(reconciler: &Reconciler, cluster: &mut HetznerCluster) {
//!     let outcome = reconciler.reconcile(cluster).await;
//!     if let Some(requeue_after) = outcome.requeue_after {
//!         println!("next pass in {requeue_after:?}");
//!     }
//! }
//! ```

pub mod endpoint;
pub mod finalizers;
pub mod hetznercluster;
pub mod loadbalancer;
pub mod network;
pub mod placement_groups;
pub mod rate_limit;
pub mod servers;
pub mod status;
pub mod sync_error;
pub mod validation;

pub use endpoint::set_control_plane_endpoint;
pub use hetznercluster::{
    reconcile_hetznercluster, CleanupOutcome, ReconcileOutcome, Reconciler,
};
pub use rate_limit::reconcile_rate_limit;

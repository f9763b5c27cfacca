// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Hetzner Operator - Hetzner Cloud cluster infrastructure for Kubernetes
//!
//! A Kubernetes operator written in Rust that reconciles the cluster-level Hetzner
//! Cloud resources of a `HetznerCluster`: the control-plane load balancer, the
//! private network and the placement groups, and derives the control-plane
//! endpoint from them.
//!
//! ## Overview
//!
//! - Custom Resource Definition for `HetznerCluster`
//! - Idempotent convergence of remote resources, scoped by an ownership label
//! - Adoption of pre-existing, user-named load balancers
//! - Rate-limit backoff driven by status conditions
//!
//! ## Modules
//!
//! - [`crd`] - `HetznerCluster` custom resource types
//! - [`reconcilers`] - Reconciliation logic and condition handling
//! - [`hcloud`] - Hetzner Cloud API client and error classification
//! - [`credentials`] - HCloud token lookup and validation
//! - [`labels`] - Ownership labels and finalizer
//! - [`config`] - Command-line and environment configuration
//! - [`context`] - Shared controller context
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use hetzner_operator::crd::{HetznerCluster, HetznerClusterSpec, PlacementGroupSpec};
//!
//! let mut spec = HetznerClusterSpec {
//!     control_plane_regions: vec!["fsn1".to_string(), "nbg1".to_string()],
//!     hcloud_placement_groups: vec![PlacementGroupSpec {
//!         name: "control-plane".to_string(),
//!         r#type: "spread".to_string(),
//!     }],
//!     ..Default::default()
//! };
//! spec.control_plane_load_balancer.region = "fsn1".to_string();
//! spec.hcloud_network.enabled = true;
//!
//! let cluster = HetznerCluster::new("prod", spec);
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod credentials;
pub mod hcloud;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;

#[cfg(test)]
mod status_reasons_tests;

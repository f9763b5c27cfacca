// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner Cloud API access.
//!
//! The reconcilers never talk HTTP themselves. They call the [`HCloudClient`] trait,
//! which is implemented by [`client::HttpHCloudClient`] in production and by an
//! in-memory fake in tests. A fresh client is built for every reconciliation pass by an
//! [`HCloudClientFactory`] from the token read out of the cluster's secret.
//!
//! ## Module Structure
//!
//! - [`client`] - `reqwest` implementation against `api.hetzner.cloud`
//! - [`error`] - Error classification (not found, rate limited, conflict, transient)
//! - [`governed`] - Wrapper recording whether the API answered during a pass
//! - [`types`] - Remote resource types and create/update options

pub mod client;
pub mod error;
pub mod governed;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{HttpClientFactory, HttpHCloudClient};
pub use error::HCloudError;
pub use governed::{ApiOutcome, GovernedClient};
pub use types::{
    CreateLoadBalancerOpts, CreateNetworkOpts, CreatePlacementGroupOpts, ListOpts, LoadBalancer,
    LoadBalancerService, Network, PlacementGroup, Server, UpdateLoadBalancerOpts,
};

use async_trait::async_trait;
use std::sync::Arc;

/// Result type of every Hetzner Cloud call.
pub type HCloudResult<T> = Result<T, HCloudError>;

/// Capabilities the reconcilers need from the Hetzner Cloud API.
///
/// Every list call accepts a [`ListOpts`] filter so convergence can be scoped to
/// resources carrying the cluster ownership label.
#[async_trait]
pub trait HCloudClient: Send + Sync {
    async fn list_load_balancers(&self, opts: &ListOpts) -> HCloudResult<Vec<LoadBalancer>>;

    async fn create_load_balancer(
        &self,
        opts: &CreateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer>;

    /// Rename and/or relabel a load balancer.
    async fn update_load_balancer(
        &self,
        id: i64,
        opts: &UpdateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer>;

    async fn change_load_balancer_type(&self, id: i64, load_balancer_type: &str)
        -> HCloudResult<()>;

    async fn change_load_balancer_algorithm(&self, id: i64, algorithm: &str) -> HCloudResult<()>;

    async fn add_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()>;

    /// Update the service listening on `service.listen_port`.
    async fn update_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()>;

    async fn delete_service(&self, id: i64, listen_port: u16) -> HCloudResult<()>;

    async fn delete_load_balancer(&self, id: i64) -> HCloudResult<()>;

    async fn list_placement_groups(&self, opts: &ListOpts) -> HCloudResult<Vec<PlacementGroup>>;

    async fn create_placement_group(
        &self,
        opts: &CreatePlacementGroupOpts,
    ) -> HCloudResult<PlacementGroup>;

    async fn delete_placement_group(&self, id: i64) -> HCloudResult<()>;

    async fn list_networks(&self, opts: &ListOpts) -> HCloudResult<Vec<Network>>;

    async fn create_network(&self, opts: &CreateNetworkOpts) -> HCloudResult<Network>;

    async fn delete_network(&self, id: i64) -> HCloudResult<()>;

    async fn list_servers(&self, opts: &ListOpts) -> HCloudResult<Vec<Server>>;
}

/// Builds an [`HCloudClient`] for a token.
pub trait HCloudClientFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the token cannot be used to build a client.
    fn client(&self, token: &str) -> HCloudResult<Arc<dyn HCloudClient>>;
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client wrapper that records how the API behaved during one reconciliation pass.
//!
//! The orchestrator wraps the per-pass client in a [`GovernedClient`]. Each call is
//! forwarded unchanged; its outcome is remembered so the `HetznerAPIReachable`
//! condition can be updated once at the end of the pass, and counted in metrics.

use super::{
    CreateLoadBalancerOpts, CreateNetworkOpts, CreatePlacementGroupOpts, HCloudClient,
    HCloudError, HCloudResult, ListOpts, LoadBalancer, LoadBalancerService, Network,
    PlacementGroup, Server, UpdateLoadBalancerOpts,
};
use crate::metrics::record_hcloud_call;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Outcome of the most recent API call of a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiOutcome {
    /// The API answered, successfully or with a non-transient error.
    Reachable,
    /// The API answered with a rate-limit error.
    RateLimited(String),
    /// The call timed out, failed to connect, or hit a server-side error.
    Unreachable(String),
}

impl ApiOutcome {
    fn of<T>(result: &HCloudResult<T>) -> Self {
        match result {
            Ok(_) => Self::Reachable,
            Err(HCloudError::RateLimited { message }) => Self::RateLimited(message.clone()),
            Err(HCloudError::Transient { message }) => Self::Unreachable(message.clone()),
            Err(_) => Self::Reachable,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Reachable => "answered",
            Self::RateLimited(_) => "rate_limited",
            Self::Unreachable(_) => "unreachable",
        }
    }
}

/// [`HCloudClient`] that remembers the outcome of the last call.
pub struct GovernedClient {
    inner: Arc<dyn HCloudClient>,
    last_outcome: Mutex<Option<ApiOutcome>>,
}

impl GovernedClient {
    #[must_use]
    pub fn new(inner: Arc<dyn HCloudClient>) -> Self {
        Self {
            inner,
            last_outcome: Mutex::new(None),
        }
    }

    /// Outcome of the last call, `None` if no call was made.
    #[must_use]
    pub fn last_outcome(&self) -> Option<ApiOutcome> {
        self.last_outcome
            .lock()
            .ok()
            .and_then(|outcome| outcome.clone())
    }

    fn track<T>(&self, operation: &'static str, result: HCloudResult<T>) -> HCloudResult<T> {
        let outcome = ApiOutcome::of(&result);
        record_hcloud_call(operation, outcome.label());

        if let Err(e) = &result {
            warn!(operation = operation, error = %e, "Hetzner Cloud API call failed");
        }

        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome);
        }
        result
    }
}

#[async_trait]
impl HCloudClient for GovernedClient {
    async fn list_load_balancers(&self, opts: &ListOpts) -> HCloudResult<Vec<LoadBalancer>> {
        let result = self.inner.list_load_balancers(opts).await;
        self.track("list_load_balancers", result)
    }

    async fn create_load_balancer(
        &self,
        opts: &CreateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        let result = self.inner.create_load_balancer(opts).await;
        self.track("create_load_balancer", result)
    }

    async fn update_load_balancer(
        &self,
        id: i64,
        opts: &UpdateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        let result = self.inner.update_load_balancer(id, opts).await;
        self.track("update_load_balancer", result)
    }

    async fn change_load_balancer_type(
        &self,
        id: i64,
        load_balancer_type: &str,
    ) -> HCloudResult<()> {
        let result = self
            .inner
            .change_load_balancer_type(id, load_balancer_type)
            .await;
        self.track("change_load_balancer_type", result)
    }

    async fn change_load_balancer_algorithm(&self, id: i64, algorithm: &str) -> HCloudResult<()> {
        let result = self.inner.change_load_balancer_algorithm(id, algorithm).await;
        self.track("change_load_balancer_algorithm", result)
    }

    async fn add_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        let result = self.inner.add_service(id, service).await;
        self.track("add_service", result)
    }

    async fn update_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        let result = self.inner.update_service(id, service).await;
        self.track("update_service", result)
    }

    async fn delete_service(&self, id: i64, listen_port: u16) -> HCloudResult<()> {
        let result = self.inner.delete_service(id, listen_port).await;
        self.track("delete_service", result)
    }

    async fn delete_load_balancer(&self, id: i64) -> HCloudResult<()> {
        let result = self.inner.delete_load_balancer(id).await;
        self.track("delete_load_balancer", result)
    }

    async fn list_placement_groups(&self, opts: &ListOpts) -> HCloudResult<Vec<PlacementGroup>> {
        let result = self.inner.list_placement_groups(opts).await;
        self.track("list_placement_groups", result)
    }

    async fn create_placement_group(
        &self,
        opts: &CreatePlacementGroupOpts,
    ) -> HCloudResult<PlacementGroup> {
        let result = self.inner.create_placement_group(opts).await;
        self.track("create_placement_group", result)
    }

    async fn delete_placement_group(&self, id: i64) -> HCloudResult<()> {
        let result = self.inner.delete_placement_group(id).await;
        self.track("delete_placement_group", result)
    }

    async fn list_networks(&self, opts: &ListOpts) -> HCloudResult<Vec<Network>> {
        let result = self.inner.list_networks(opts).await;
        self.track("list_networks", result)
    }

    async fn create_network(&self, opts: &CreateNetworkOpts) -> HCloudResult<Network> {
        let result = self.inner.create_network(opts).await;
        self.track("create_network", result)
    }

    async fn delete_network(&self, id: i64) -> HCloudResult<()> {
        let result = self.inner.delete_network(id).await;
        self.track("delete_network", result)
    }

    async fn list_servers(&self, opts: &ListOpts) -> HCloudResult<Vec<Server>> {
        let result = self.inner.list_servers(opts).await;
        self.track("list_servers", result)
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`HCloudClient`] for reconciler tests.
//!
//! Keeps load balancers, placement groups, networks and servers in a mutex-guarded
//! state, records every mutating call, and can be told to fail the next call of a
//! given operation.

use super::{
    CreateLoadBalancerOpts, CreateNetworkOpts, CreatePlacementGroupOpts, HCloudClient,
    HCloudClientFactory, HCloudError, HCloudResult, ListOpts, LoadBalancer, LoadBalancerService,
    Network, PlacementGroup, Server, UpdateLoadBalancerOpts,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    next_id: i64,
    load_balancers: Vec<LoadBalancer>,
    placement_groups: Vec<PlacementGroup>,
    networks: Vec<Network>,
    servers: Vec<Server>,
    mutations: Vec<String>,
    calls: usize,
    failures: HashMap<&'static str, HCloudError>,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeHCloud {
    state: Arc<Mutex<FakeState>>,
}

fn matches(opts: &ListOpts, name: &str, labels: &BTreeMap<String, String>) -> bool {
    let name_ok = opts.name.as_deref().is_none_or(|wanted| wanted == name);
    let label_ok = opts.label_selector.as_deref().is_none_or(|selector| {
        selector.split(',').all(|requirement| {
            match requirement.split_once('=') {
                Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
                None => labels.contains_key(requirement),
            }
        })
    });
    name_ok && label_ok
}

fn not_found(what: &str, id: i64) -> HCloudError {
    HCloudError::NotFound {
        message: format!("{what} {id} not found"),
    }
}

impl FakeHCloud {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Fail the next call of `operation` with `error`.
    pub(crate) fn fail_next(&self, operation: &'static str, error: HCloudError) {
        self.state().failures.insert(operation, error);
    }

    /// Mutating calls in order, e.g. `create_load_balancer:c1-kube-apiserver-abcde`.
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    pub(crate) fn clear_mutations(&self) {
        self.state().mutations.clear();
    }

    /// Total number of calls, reads included.
    pub(crate) fn calls(&self) -> usize {
        self.state().calls
    }

    pub(crate) fn insert_load_balancer(&self, mut lb: LoadBalancer) -> i64 {
        let mut state = self.state();
        lb.id = state.next_id();
        let id = lb.id;
        state.load_balancers.push(lb);
        id
    }

    pub(crate) fn insert_placement_group(&self, mut pg: PlacementGroup) -> i64 {
        let mut state = self.state();
        pg.id = state.next_id();
        let id = pg.id;
        state.placement_groups.push(pg);
        id
    }

    pub(crate) fn insert_network(&self, mut network: Network) -> i64 {
        let mut state = self.state();
        network.id = state.next_id();
        let id = network.id;
        state.networks.push(network);
        id
    }

    pub(crate) fn insert_server(&self, mut server: Server) -> i64 {
        let mut state = self.state();
        server.id = state.next_id();
        let id = server.id;
        state.servers.push(server);
        id
    }

    pub(crate) fn remove_servers(&self) {
        self.state().servers.clear();
    }

    /// Set the public IPv4 of a load balancer, as Hetzner does once it is provisioned.
    pub(crate) fn set_load_balancer_ipv4(&self, id: i64, ipv4: &str) {
        if let Some(lb) = self.state().load_balancers.iter_mut().find(|lb| lb.id == id) {
            lb.ipv4 = ipv4.to_string();
        }
    }

    pub(crate) fn load_balancers(&self) -> Vec<LoadBalancer> {
        self.state().load_balancers.clone()
    }

    pub(crate) fn placement_groups(&self) -> Vec<PlacementGroup> {
        self.state().placement_groups.clone()
    }

    pub(crate) fn networks(&self) -> Vec<Network> {
        self.state().networks.clone()
    }

    /// Count the call, fail it if requested, and record it when it mutates.
    fn enter(&self, operation: &'static str, mutation: Option<String>) -> HCloudResult<()> {
        let mut state = self.state();
        state.calls += 1;
        if let Some(error) = state.failures.remove(operation) {
            return Err(error);
        }
        if let Some(detail) = mutation {
            state.mutations.push(format!("{operation}:{detail}"));
        }
        Ok(())
    }

    fn with_load_balancer<T>(
        &self,
        id: i64,
        f: impl FnOnce(&mut LoadBalancer) -> T,
    ) -> HCloudResult<T> {
        let mut state = self.state();
        state
            .load_balancers
            .iter_mut()
            .find(|lb| lb.id == id)
            .map(f)
            .ok_or_else(|| not_found("load balancer", id))
    }
}

#[async_trait]
impl HCloudClient for FakeHCloud {
    async fn list_load_balancers(&self, opts: &ListOpts) -> HCloudResult<Vec<LoadBalancer>> {
        self.enter("list_load_balancers", None)?;
        Ok(self
            .state()
            .load_balancers
            .iter()
            .filter(|lb| matches(opts, &lb.name, &lb.labels))
            .cloned()
            .collect())
    }

    async fn create_load_balancer(
        &self,
        opts: &CreateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        self.enter("create_load_balancer", Some(opts.name.clone()))?;
        let mut state = self.state();
        if state.load_balancers.iter().any(|lb| lb.name == opts.name) {
            return Err(HCloudError::Conflict {
                message: format!("name {} already used", opts.name),
            });
        }
        let lb = LoadBalancer {
            id: state.next_id(),
            name: opts.name.clone(),
            load_balancer_type: opts.load_balancer_type.clone(),
            location: opts.location.clone(),
            algorithm: opts.algorithm.clone(),
            labels: opts.labels.clone(),
            private_ip: opts.network.map(|_| "10.0.0.2".to_string()),
            ..LoadBalancer::default()
        };
        state.load_balancers.push(lb.clone());
        Ok(lb)
    }

    async fn update_load_balancer(
        &self,
        id: i64,
        opts: &UpdateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        self.enter("update_load_balancer", Some(id.to_string()))?;
        self.with_load_balancer(id, |lb| {
            if let Some(name) = &opts.name {
                lb.name.clone_from(name);
            }
            if let Some(labels) = &opts.labels {
                lb.labels.clone_from(labels);
            }
            lb.clone()
        })
    }

    async fn change_load_balancer_type(
        &self,
        id: i64,
        load_balancer_type: &str,
    ) -> HCloudResult<()> {
        self.enter(
            "change_load_balancer_type",
            Some(format!("{id}:{load_balancer_type}")),
        )?;
        self.with_load_balancer(id, |lb| {
            lb.load_balancer_type = load_balancer_type.to_string();
        })
    }

    async fn change_load_balancer_algorithm(&self, id: i64, algorithm: &str) -> HCloudResult<()> {
        self.enter(
            "change_load_balancer_algorithm",
            Some(format!("{id}:{algorithm}")),
        )?;
        self.with_load_balancer(id, |lb| lb.algorithm = algorithm.to_string())
    }

    async fn add_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        self.enter("add_service", Some(format!("{id}:{}", service.listen_port)))?;
        self.with_load_balancer(id, |lb| lb.services.push(service.clone()))
    }

    async fn update_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        self.enter("update_service", Some(format!("{id}:{}", service.listen_port)))?;
        self.with_load_balancer(id, |lb| {
            for existing in &mut lb.services {
                if existing.listen_port == service.listen_port {
                    *existing = service.clone();
                }
            }
        })
    }

    async fn delete_service(&self, id: i64, listen_port: u16) -> HCloudResult<()> {
        self.enter("delete_service", Some(format!("{id}:{listen_port}")))?;
        self.with_load_balancer(id, |lb| {
            lb.services.retain(|s| s.listen_port != listen_port);
        })
    }

    async fn delete_load_balancer(&self, id: i64) -> HCloudResult<()> {
        self.enter("delete_load_balancer", Some(id.to_string()))?;
        let mut state = self.state();
        let before = state.load_balancers.len();
        state.load_balancers.retain(|lb| lb.id != id);
        if state.load_balancers.len() == before {
            return Err(not_found("load balancer", id));
        }
        Ok(())
    }

    async fn list_placement_groups(&self, opts: &ListOpts) -> HCloudResult<Vec<PlacementGroup>> {
        self.enter("list_placement_groups", None)?;
        Ok(self
            .state()
            .placement_groups
            .iter()
            .filter(|pg| matches(opts, &pg.name, &pg.labels))
            .cloned()
            .collect())
    }

    async fn create_placement_group(
        &self,
        opts: &CreatePlacementGroupOpts,
    ) -> HCloudResult<PlacementGroup> {
        self.enter("create_placement_group", Some(opts.name.clone()))?;
        let mut state = self.state();
        let pg = PlacementGroup {
            id: state.next_id(),
            name: opts.name.clone(),
            placement_group_type: opts.placement_group_type.clone(),
            labels: opts.labels.clone(),
            servers: Vec::new(),
        };
        state.placement_groups.push(pg.clone());
        Ok(pg)
    }

    async fn delete_placement_group(&self, id: i64) -> HCloudResult<()> {
        let name = self
            .state()
            .placement_groups
            .iter()
            .find(|pg| pg.id == id)
            .map_or_else(|| id.to_string(), |pg| pg.name.clone());
        self.enter("delete_placement_group", Some(name))?;
        let mut state = self.state();
        let before = state.placement_groups.len();
        state.placement_groups.retain(|pg| pg.id != id);
        if state.placement_groups.len() == before {
            return Err(not_found("placement group", id));
        }
        Ok(())
    }

    async fn list_networks(&self, opts: &ListOpts) -> HCloudResult<Vec<Network>> {
        self.enter("list_networks", None)?;
        Ok(self
            .state()
            .networks
            .iter()
            .filter(|n| matches(opts, &n.name, &n.labels))
            .cloned()
            .collect())
    }

    async fn create_network(&self, opts: &CreateNetworkOpts) -> HCloudResult<Network> {
        self.enter("create_network", Some(opts.name.clone()))?;
        let mut state = self.state();
        let network = Network {
            id: state.next_id(),
            name: opts.name.clone(),
            ip_range: opts.ip_range.clone(),
            labels: opts.labels.clone(),
        };
        state.networks.push(network.clone());
        Ok(network)
    }

    async fn delete_network(&self, id: i64) -> HCloudResult<()> {
        self.enter("delete_network", Some(id.to_string()))?;
        let mut state = self.state();
        let before = state.networks.len();
        state.networks.retain(|n| n.id != id);
        if state.networks.len() == before {
            return Err(not_found("network", id));
        }
        Ok(())
    }

    async fn list_servers(&self, opts: &ListOpts) -> HCloudResult<Vec<Server>> {
        self.enter("list_servers", None)?;
        Ok(self
            .state()
            .servers
            .iter()
            .filter(|s| matches(opts, &s.name, &s.labels))
            .cloned()
            .collect())
    }
}

/// Factory handing out the same fake for every token.
pub(crate) struct FakeFactory(pub(crate) FakeHCloud);

impl HCloudClientFactory for FakeFactory {
    fn client(&self, _token: &str) -> HCloudResult<Arc<dyn HCloudClient>> {
        Ok(Arc::new(self.0.clone()))
    }
}

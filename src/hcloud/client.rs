// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `reqwest` implementation of [`HCloudClient`].
//!
//! Talks to the Hetzner Cloud REST API with bearer authentication. List calls follow
//! `meta.pagination.next_page` until exhausted. Error bodies of the form
//! `{"error": {"code": "...", "message": "..."}}` are classified by
//! [`HCloudError::from_response`].
//!
//! Mutating actions (`change_type`, `add_service`, ...) return as soon as the API
//! accepted them; the next pass re-reads the resource and observes the result.

use super::{
    CreateLoadBalancerOpts, CreateNetworkOpts, CreatePlacementGroupOpts, HCloudClient,
    HCloudClientFactory, HCloudError, HCloudResult, ListOpts, LoadBalancer, LoadBalancerService,
    Network, PlacementGroup, Server, UpdateLoadBalancerOpts,
};
use crate::constants::{HCLOUD_MAX_PAGES, HCLOUD_PAGE_SIZE};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Deserialize)]
struct NameRef {
    name: String,
}

#[derive(Deserialize)]
struct AlgorithmWire {
    #[serde(rename = "type")]
    algorithm_type: String,
}

#[derive(Deserialize)]
struct ServiceWire {
    protocol: String,
    listen_port: u16,
    destination_port: u16,
}

#[derive(Deserialize)]
struct IpWire {
    ip: String,
}

#[derive(Deserialize, Default)]
struct PublicNetWire {
    ipv4: Option<IpWire>,
    ipv6: Option<IpWire>,
}

#[derive(Deserialize)]
struct PrivateNetWire {
    ip: String,
}

#[derive(Deserialize)]
struct LoadBalancerWire {
    id: i64,
    name: String,
    load_balancer_type: NameRef,
    location: NameRef,
    algorithm: AlgorithmWire,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    services: Vec<ServiceWire>,
    #[serde(default)]
    targets: Vec<IgnoredAny>,
    #[serde(default)]
    public_net: PublicNetWire,
    #[serde(default)]
    private_net: Vec<PrivateNetWire>,
}

impl From<LoadBalancerWire> for LoadBalancer {
    fn from(wire: LoadBalancerWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            load_balancer_type: wire.load_balancer_type.name,
            location: wire.location.name,
            algorithm: wire.algorithm.algorithm_type,
            labels: wire.labels,
            services: wire
                .services
                .into_iter()
                .map(|s| LoadBalancerService {
                    listen_port: s.listen_port,
                    destination_port: s.destination_port,
                    protocol: s.protocol,
                })
                .collect(),
            target_count: u32::try_from(wire.targets.len()).unwrap_or(u32::MAX),
            ipv4: wire.public_net.ipv4.map(|ip| ip.ip).unwrap_or_default(),
            ipv6: wire.public_net.ipv6.map(|ip| ip.ip).unwrap_or_default(),
            private_ip: wire.private_net.into_iter().next().map(|net| net.ip),
        }
    }
}

#[derive(Deserialize)]
struct PlacementGroupWire {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    placement_group_type: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    servers: Vec<i64>,
}

impl From<PlacementGroupWire> for PlacementGroup {
    fn from(wire: PlacementGroupWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            placement_group_type: wire.placement_group_type,
            labels: wire.labels,
            servers: wire.servers,
        }
    }
}

#[derive(Deserialize)]
struct NetworkWire {
    id: i64,
    name: String,
    ip_range: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl From<NetworkWire> for Network {
    fn from(wire: NetworkWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            ip_range: wire.ip_range,
            labels: wire.labels,
        }
    }
}

#[derive(Deserialize)]
struct ServerWire {
    id: i64,
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl From<ServerWire> for Server {
    fn from(wire: ServerWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            labels: wire.labels,
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

fn decode_error(context: &str, err: &serde_json::Error) -> HCloudError {
    HCloudError::Transient {
        message: format!("unexpected {context} response: {err}"),
    }
}

/// Extract and decode `value[key]`.
fn decode_field<T: DeserializeOwned>(value: &mut Value, key: &str) -> HCloudResult<T> {
    let field = value.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    serde_json::from_value(field).map_err(|e| decode_error(key, &e))
}

// ============================================================================
// Client
// ============================================================================

/// Hetzner Cloud API client bound to one token.
#[derive(Clone)]
pub struct HttpHCloudClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl HttpHCloudClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            token: token.into(),
        }
    }

    /// Build `<endpoint>/<segments...>?<query>`.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> HCloudResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| HCloudError::InvalidInput {
                message: format!("endpoint {} cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> HCloudResult<Value> {
        debug!(method = %method, url = %url, "Hetzner Cloud API request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let (code, message) = parsed
                .error
                .map_or((None, text.clone()), |e| (Some(e.code), e.message));
            debug!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                code = ?code,
                "Hetzner Cloud API returned an error"
            );
            return Err(HCloudError::from_response(
                status.as_u16(),
                code.as_deref(),
                &message,
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| decode_error(url.path(), &e))
    }

    /// Fetch every page of `GET /<resource>`.
    async fn list<W, T>(&self, resource: &str, opts: &ListOpts) -> HCloudResult<Vec<T>>
    where
        W: DeserializeOwned,
        T: From<W>,
    {
        let mut items = Vec::new();
        let mut page: u64 = 1;

        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("per_page", HCLOUD_PAGE_SIZE.to_string()),
            ];
            if let Some(selector) = &opts.label_selector {
                query.push(("label_selector", selector.clone()));
            }
            if let Some(name) = &opts.name {
                query.push(("name", name.clone()));
            }

            let url = self.url(&[resource], &query)?;
            let mut body = self.send(Method::GET, url, None).await?;
            let page_items: Vec<W> = decode_field(&mut body, resource)?;
            items.extend(page_items.into_iter().map(T::from));

            let next_page = body
                .pointer("/meta/pagination/next_page")
                .and_then(Value::as_u64);
            match advance_page(resource, page, next_page) {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(items)
    }

    async fn load_balancer_action(&self, id: i64, action: &str, body: &Value) -> HCloudResult<()> {
        let url = self.url(&["load_balancers", &id.to_string(), "actions", action], &[])?;
        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn delete(&self, resource: &str, id: i64) -> HCloudResult<()> {
        let url = self.url(&[resource, &id.to_string()], &[])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

/// Page to fetch after `page`, or `None` when the listing is complete.
///
/// Stops at [`HCLOUD_MAX_PAGES`] even if the API reports more pages, logging that
/// the result is truncated.
pub(crate) fn advance_page(resource: &str, page: u64, next_page: Option<u64>) -> Option<u64> {
    let next = next_page.filter(|next| *next > page)?;
    if page >= u64::from(HCLOUD_MAX_PAGES) {
        warn!(
            resource,
            max_pages = HCLOUD_MAX_PAGES,
            next_page = next,
            "Stopped listing at page limit, result is truncated"
        );
        return None;
    }
    Some(next)
}

#[async_trait]
impl HCloudClient for HttpHCloudClient {
    async fn list_load_balancers(&self, opts: &ListOpts) -> HCloudResult<Vec<LoadBalancer>> {
        self.list::<LoadBalancerWire, _>("load_balancers", opts).await
    }

    async fn create_load_balancer(
        &self,
        opts: &CreateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        let mut body = json!({
            "name": opts.name,
            "load_balancer_type": opts.load_balancer_type,
            "location": opts.location,
            "algorithm": { "type": opts.algorithm },
            "labels": opts.labels,
            "public_interface": true,
        });
        if let Some(network) = opts.network {
            body["network"] = json!(network);
        }

        let url = self.url(&["load_balancers"], &[])?;
        let mut response = self.send(Method::POST, url, Some(&body)).await?;
        let wire: LoadBalancerWire = decode_field(&mut response, "load_balancer")?;
        Ok(wire.into())
    }

    async fn update_load_balancer(
        &self,
        id: i64,
        opts: &UpdateLoadBalancerOpts,
    ) -> HCloudResult<LoadBalancer> {
        let mut body = json!({});
        if let Some(name) = &opts.name {
            body["name"] = json!(name);
        }
        if let Some(labels) = &opts.labels {
            body["labels"] = json!(labels);
        }

        let url = self.url(&["load_balancers", &id.to_string()], &[])?;
        let mut response = self.send(Method::PUT, url, Some(&body)).await?;
        let wire: LoadBalancerWire = decode_field(&mut response, "load_balancer")?;
        Ok(wire.into())
    }

    async fn change_load_balancer_type(
        &self,
        id: i64,
        load_balancer_type: &str,
    ) -> HCloudResult<()> {
        self.load_balancer_action(
            id,
            "change_type",
            &json!({ "load_balancer_type": load_balancer_type }),
        )
        .await
    }

    async fn change_load_balancer_algorithm(&self, id: i64, algorithm: &str) -> HCloudResult<()> {
        self.load_balancer_action(id, "change_algorithm", &json!({ "type": algorithm }))
            .await
    }

    async fn add_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        self.load_balancer_action(
            id,
            "add_service",
            &json!({
                "protocol": service.protocol,
                "listen_port": service.listen_port,
                "destination_port": service.destination_port,
                "proxyprotocol": false,
            }),
        )
        .await
    }

    async fn update_service(&self, id: i64, service: &LoadBalancerService) -> HCloudResult<()> {
        self.load_balancer_action(
            id,
            "update_service",
            &json!({
                "protocol": service.protocol,
                "listen_port": service.listen_port,
                "destination_port": service.destination_port,
            }),
        )
        .await
    }

    async fn delete_service(&self, id: i64, listen_port: u16) -> HCloudResult<()> {
        self.load_balancer_action(id, "delete_service", &json!({ "listen_port": listen_port }))
            .await
    }

    async fn delete_load_balancer(&self, id: i64) -> HCloudResult<()> {
        self.delete("load_balancers", id).await
    }

    async fn list_placement_groups(&self, opts: &ListOpts) -> HCloudResult<Vec<PlacementGroup>> {
        self.list::<PlacementGroupWire, _>("placement_groups", opts)
            .await
    }

    async fn create_placement_group(
        &self,
        opts: &CreatePlacementGroupOpts,
    ) -> HCloudResult<PlacementGroup> {
        let body = json!({
            "name": opts.name,
            "type": opts.placement_group_type,
            "labels": opts.labels,
        });

        let url = self.url(&["placement_groups"], &[])?;
        let mut response = self.send(Method::POST, url, Some(&body)).await?;
        let wire: PlacementGroupWire = decode_field(&mut response, "placement_group")?;
        Ok(wire.into())
    }

    async fn delete_placement_group(&self, id: i64) -> HCloudResult<()> {
        self.delete("placement_groups", id).await
    }

    async fn list_networks(&self, opts: &ListOpts) -> HCloudResult<Vec<Network>> {
        self.list::<NetworkWire, _>("networks", opts).await
    }

    async fn create_network(&self, opts: &CreateNetworkOpts) -> HCloudResult<Network> {
        let body = json!({
            "name": opts.name,
            "ip_range": opts.ip_range,
            "labels": opts.labels,
            "subnets": [{
                "type": "cloud",
                "ip_range": opts.subnet_ip_range,
                "network_zone": opts.network_zone,
            }],
        });

        let url = self.url(&["networks"], &[])?;
        let mut response = self.send(Method::POST, url, Some(&body)).await?;
        let wire: NetworkWire = decode_field(&mut response, "network")?;
        Ok(wire.into())
    }

    async fn delete_network(&self, id: i64) -> HCloudResult<()> {
        self.delete("networks", id).await
    }

    async fn list_servers(&self, opts: &ListOpts) -> HCloudResult<Vec<Server>> {
        self.list::<ServerWire, _>("servers", opts).await
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Builds [`HttpHCloudClient`]s that share one connection pool.
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpClientFactory {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend failure).
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }
}

impl HCloudClientFactory for HttpClientFactory {
    fn client(&self, token: &str) -> HCloudResult<Arc<dyn HCloudClient>> {
        if token.trim().is_empty() {
            return Err(HCloudError::Unauthorized {
                message: "empty token".to_string(),
            });
        }
        Ok(Arc::new(HttpHCloudClient::new(
            self.http.clone(),
            self.endpoint.clone(),
            token,
        )))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;

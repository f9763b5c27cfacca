// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control-plane load balancer synchronization.
//!
//! One pass converges the remote load balancer onto
//! `spec.controlPlaneLoadBalancer`:
//!
//! 1. Find the load balancer carrying the cluster ownership label.
//! 2. If there is none, either create one under a generated name or, when a
//!    name is given, adopt the existing load balancer of that name.
//! 3. Sync name, type and algorithm.
//! 4. Diff the target services by listen port.
//! 5. Record the result in `status.controlPlaneLoadBalancer`.
//!
//! Each remote mutation is only issued on an actual difference, so a second pass
//! without external changes only reads.

use crate::constants::{LOAD_BALANCER_NAME_HASH_LEN, LOAD_BALANCER_NAME_INFIX};
use crate::crd::{
    ConditionSeverity, ConditionStatus, HetznerCluster, LoadBalancerSpec, LoadBalancerStatus,
    ServiceProtocol,
};
use crate::hcloud::{
    CreateLoadBalancerOpts, HCloudClient, HCloudError, ListOpts, LoadBalancer,
    LoadBalancerService, UpdateLoadBalancerOpts,
};
use crate::labels::{
    created_labels, is_created_by_operator, ownership_of, with_ownership, without_ownership,
    Ownership,
};
use crate::metrics::{record_resource_created, record_resource_deleted, record_resource_updated};
use crate::reconcilers::status::{mark_false, mark_true, set_condition};
use crate::reconcilers::sync_error::{api_failure_reason, SyncError};
use crate::status_reasons::{
    CONDITION_TYPE_LOAD_BALANCER_READY, REASON_CREATE_LOAD_BALANCER_FAILED,
    REASON_LOAD_BALANCER_DISABLED, REASON_LOAD_BALANCER_FAILED_TO_OWN,
    REASON_LOAD_BALANCER_READY, REASON_LOAD_BALANCER_SERVICE_SYNC_FAILED,
    REASON_LOAD_BALANCER_UPDATE_FAILED,
};
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

const RESOURCE_TYPE: &str = "load_balancer";

/// A failed step with the reason to report on `LoadBalancerReady`.
struct Failure {
    reason: &'static str,
    error: SyncError,
}

impl Failure {
    fn api(reason: &'static str, context: impl Into<String>, error: HCloudError) -> Self {
        Self {
            reason: api_failure_reason(&error, reason),
            error: SyncError::api(context, error),
        }
    }

    fn ownership(message: String) -> Self {
        Self {
            reason: REASON_LOAD_BALANCER_FAILED_TO_OWN,
            error: SyncError::Ownership(message),
        }
    }
}

/// Name of a load balancer created without `spec.controlPlaneLoadBalancer.name`.
///
/// `<cluster>-kube-apiserver-<hash>`, where the hash is derived from the object
/// UID (or name before one is assigned) so it is stable across passes.
#[must_use]
pub fn generated_load_balancer_name(cluster: &HetznerCluster) -> String {
    let seed = cluster.uid().unwrap_or_else(|| cluster.name_any());
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{}-{LOAD_BALANCER_NAME_INFIX}-{}",
        cluster.cluster_name(),
        &digest[..LOAD_BALANCER_NAME_HASH_LEN]
    )
}

/// Target services the load balancer should expose.
///
/// The API server service listens on the endpoint port when a usable endpoint is
/// set and forwards to `spec.controlPlaneLoadBalancer.port`.
#[must_use]
pub fn desired_services(cluster: &HetznerCluster) -> Vec<LoadBalancerService> {
    let lb = &cluster.spec.control_plane_load_balancer;
    let listen_port = cluster
        .spec
        .control_plane_endpoint
        .as_ref()
        .filter(|endpoint| endpoint.is_valid())
        .and_then(|endpoint| u16::try_from(endpoint.port).ok())
        .unwrap_or(lb.port);

    let mut services = vec![LoadBalancerService {
        listen_port,
        destination_port: lb.port,
        protocol: ServiceProtocol::Tcp.as_str().to_string(),
    }];
    services.extend(lb.extra_services.iter().map(|service| LoadBalancerService {
        listen_port: service.listen_port,
        destination_port: service.destination_port,
        protocol: service.protocol.as_str().to_string(),
    }));
    services
}

/// Converge the control-plane load balancer and its condition.
///
/// # Errors
///
/// Returns an error if any lookup or mutation fails, or if the load balancer cannot
/// be taken over. `LoadBalancerReady` is set to `False` before returning.
pub async fn reconcile_load_balancer(
    cluster: &mut HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<(), SyncError> {
    let spec = cluster.spec.control_plane_load_balancer.clone();

    if !spec.enabled {
        let status = cluster.status_mut();
        status.control_plane_load_balancer = None;
        set_condition(
            &mut status.conditions,
            CONDITION_TYPE_LOAD_BALANCER_READY,
            ConditionStatus::True,
            REASON_LOAD_BALANCER_DISABLED,
            Some(ConditionSeverity::Info),
            "control plane load balancer is disabled",
        );
        return Ok(());
    }

    match sync_load_balancer(cluster, client, &spec).await {
        Ok(lb) => {
            let status = cluster.status_mut();
            status.control_plane_load_balancer = Some(LoadBalancerStatus {
                id: lb.id,
                name: lb.name.clone(),
                r#type: lb.load_balancer_type.clone(),
                ipv4: lb.ipv4.clone(),
                ipv6: lb.ipv6.clone(),
                internal_ip: lb.private_ip.clone(),
                target_count: lb.target_count,
            });
            mark_true(
                &mut status.conditions,
                CONDITION_TYPE_LOAD_BALANCER_READY,
                REASON_LOAD_BALANCER_READY,
                &format!("load balancer {} ({}) is ready", lb.name, lb.id),
            );
            Ok(())
        }
        Err(failure) => {
            let severity = if failure.reason == REASON_LOAD_BALANCER_FAILED_TO_OWN {
                ConditionSeverity::Warning
            } else {
                ConditionSeverity::Error
            };
            warn!(
                cluster = %cluster.cluster_name(),
                reason = failure.reason,
                error = %failure.error,
                "Load balancer reconciliation failed"
            );
            mark_false(
                &mut cluster.status_mut().conditions,
                CONDITION_TYPE_LOAD_BALANCER_READY,
                failure.reason,
                severity,
                &failure.error.to_string(),
            );
            Err(failure.error)
        }
    }
}

async fn sync_load_balancer(
    cluster: &HetznerCluster,
    client: &dyn HCloudClient,
    spec: &LoadBalancerSpec,
) -> Result<LoadBalancer, Failure> {
    let mut lb = find_or_create(cluster, client, spec).await?;
    sync_properties(client, &mut lb, spec).await?;
    sync_services(client, &mut lb, &desired_services(cluster)).await?;
    Ok(lb)
}

async fn find_or_create(
    cluster: &HetznerCluster,
    client: &dyn HCloudClient,
    spec: &LoadBalancerSpec,
) -> Result<LoadBalancer, Failure> {
    let cluster_name = cluster.cluster_name();

    let mut owned = client
        .list_load_balancers(&ListOpts::owned_by(&cluster_name))
        .await
        .map_err(|e| {
            Failure::api(
                REASON_LOAD_BALANCER_FAILED_TO_OWN,
                "listing owned load balancers",
                e,
            )
        })?;
    if owned.len() > 1 {
        let names: Vec<_> = owned.iter().map(|lb| lb.name.as_str()).collect();
        return Err(Failure::ownership(format!(
            "multiple load balancers are owned by cluster {cluster_name}: {}",
            names.join(", ")
        )));
    }
    if let Some(lb) = owned.pop() {
        debug!(cluster = %cluster_name, id = lb.id, name = %lb.name, "Found owned load balancer");
        return Ok(lb);
    }

    match spec.name.as_deref() {
        None => create(cluster, client, spec).await,
        Some(name) => adopt(&cluster_name, client, name).await,
    }
}

async fn create(
    cluster: &HetznerCluster,
    client: &dyn HCloudClient,
    spec: &LoadBalancerSpec,
) -> Result<LoadBalancer, Failure> {
    let cluster_name = cluster.cluster_name();
    let opts = CreateLoadBalancerOpts {
        name: generated_load_balancer_name(cluster),
        load_balancer_type: spec.r#type.clone(),
        location: spec.region.clone(),
        algorithm: spec.algorithm.as_str().to_string(),
        labels: created_labels(&cluster_name),
        network: cluster
            .status
            .as_ref()
            .and_then(|status| status.network.as_ref())
            .map(|network| network.id),
    };

    let lb = client.create_load_balancer(&opts).await.map_err(|e| {
        Failure::api(
            REASON_CREATE_LOAD_BALANCER_FAILED,
            format!("creating load balancer {}", opts.name),
            e,
        )
    })?;

    record_resource_created(RESOURCE_TYPE);
    info!(cluster = %cluster_name, id = lb.id, name = %lb.name, "Created load balancer");
    Ok(lb)
}

async fn adopt(
    cluster_name: &str,
    client: &dyn HCloudClient,
    name: &str,
) -> Result<LoadBalancer, Failure> {
    let mut named = client
        .list_load_balancers(&ListOpts::named(name))
        .await
        .map_err(|e| {
            Failure::api(
                REASON_LOAD_BALANCER_FAILED_TO_OWN,
                format!("looking up load balancer {name}"),
                e,
            )
        })?;

    if named.len() > 1 {
        return Err(Failure::ownership(format!(
            "{} load balancers are named {name}",
            named.len()
        )));
    }
    let Some(lb) = named.pop() else {
        return Err(Failure::ownership(format!("load balancer {name} not found")));
    };

    match ownership_of(&lb.labels, cluster_name) {
        Ownership::OwnedByCluster => Ok(lb),
        Ownership::OwnedByOther(key) => Err(Failure::ownership(format!(
            "load balancer {name} is owned by another cluster ({key})"
        ))),
        Ownership::Unowned => {
            let opts = UpdateLoadBalancerOpts {
                name: None,
                labels: Some(with_ownership(&lb.labels, cluster_name)),
            };
            let adopted = client.update_load_balancer(lb.id, &opts).await.map_err(|e| {
                Failure::api(
                    REASON_LOAD_BALANCER_FAILED_TO_OWN,
                    format!("labeling load balancer {name}"),
                    e,
                )
            })?;
            info!(cluster = %cluster_name, id = adopted.id, name = %adopted.name, "Adopted load balancer");
            Ok(adopted)
        }
    }
}

async fn sync_properties(
    client: &dyn HCloudClient,
    lb: &mut LoadBalancer,
    spec: &LoadBalancerSpec,
) -> Result<(), Failure> {
    if let Some(name) = spec.name.as_deref().filter(|name| *name != lb.name) {
        let opts = UpdateLoadBalancerOpts {
            name: Some(name.to_string()),
            labels: None,
        };
        let from = lb.name.clone();
        let renamed = client.update_load_balancer(lb.id, &opts).await.map_err(|e| {
            Failure::api(
                REASON_LOAD_BALANCER_UPDATE_FAILED,
                format!("renaming load balancer {from} to {name}"),
                e,
            )
        })?;
        lb.name = renamed.name;
        record_resource_updated(RESOURCE_TYPE);
        info!(id = lb.id, from = %from, to = %lb.name, "Renamed load balancer");
    }

    if lb.load_balancer_type != spec.r#type {
        client
            .change_load_balancer_type(lb.id, &spec.r#type)
            .await
            .map_err(|e| {
                Failure::api(
                    REASON_LOAD_BALANCER_UPDATE_FAILED,
                    format!("changing type of load balancer {}", lb.name),
                    e,
                )
            })?;
        info!(id = lb.id, from = %lb.load_balancer_type, to = %spec.r#type, "Changed load balancer type");
        lb.load_balancer_type.clone_from(&spec.r#type);
        record_resource_updated(RESOURCE_TYPE);
    }

    let algorithm = spec.algorithm.as_str();
    if lb.algorithm != algorithm {
        client
            .change_load_balancer_algorithm(lb.id, algorithm)
            .await
            .map_err(|e| {
                Failure::api(
                    REASON_LOAD_BALANCER_UPDATE_FAILED,
                    format!("changing algorithm of load balancer {}", lb.name),
                    e,
                )
            })?;
        info!(id = lb.id, from = %lb.algorithm, to = algorithm, "Changed load balancer algorithm");
        lb.algorithm = algorithm.to_string();
        record_resource_updated(RESOURCE_TYPE);
    }

    Ok(())
}

/// Apply the service diff one call at a time. `lb.services` tracks what was applied,
/// so earlier changes are kept when a later call fails.
async fn sync_services(
    client: &dyn HCloudClient,
    lb: &mut LoadBalancer,
    desired: &[LoadBalancerService],
) -> Result<(), Failure> {
    let service_failure = |action: &str, port: u16, e: HCloudError| {
        Failure::api(
            REASON_LOAD_BALANCER_SERVICE_SYNC_FAILED,
            format!("{action} service {port}"),
            e,
        )
    };

    let extra: Vec<u16> = lb
        .services
        .iter()
        .filter(|s| !desired.iter().any(|d| d.listen_port == s.listen_port))
        .map(|s| s.listen_port)
        .collect();
    for port in extra {
        client
            .delete_service(lb.id, port)
            .await
            .map_err(|e| service_failure("deleting", port, e))?;
        lb.services.retain(|s| s.listen_port != port);
        debug!(id = lb.id, listen_port = port, "Deleted load balancer service");
    }

    for service in desired {
        match lb
            .services
            .iter_mut()
            .find(|s| s.listen_port == service.listen_port)
        {
            None => {
                client
                    .add_service(lb.id, service)
                    .await
                    .map_err(|e| service_failure("adding", service.listen_port, e))?;
                lb.services.push(service.clone());
                debug!(id = lb.id, listen_port = service.listen_port, "Added load balancer service");
            }
            Some(existing) if existing != service => {
                client
                    .update_service(lb.id, service)
                    .await
                    .map_err(|e| service_failure("updating", service.listen_port, e))?;
                *existing = service.clone();
                debug!(id = lb.id, listen_port = service.listen_port, "Updated load balancer service");
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Release the load balancer when the cluster goes away.
///
/// A load balancer the operator created is deleted, even if it was renamed through
/// `spec.controlPlaneLoadBalancer.name` later. One adopted by name is kept and only
/// loses the ownership label. Missing load balancers are fine.
///
/// # Errors
///
/// Returns an error if a lookup, relabel, or delete call fails.
pub async fn delete_load_balancer(
    cluster: &HetznerCluster,
    client: &dyn HCloudClient,
) -> Result<(), SyncError> {
    let cluster_name = cluster.cluster_name();
    let generated_name = generated_load_balancer_name(cluster);

    let owned = client
        .list_load_balancers(&ListOpts::owned_by(&cluster_name))
        .await
        .map_err(|e| SyncError::api("listing owned load balancers", e))?;

    for lb in owned {
        // Load balancers created before the marker existed still carry the generated name.
        let created = is_created_by_operator(&lb.labels) || lb.name == generated_name;
        if !created {
            let opts = UpdateLoadBalancerOpts {
                name: None,
                labels: Some(without_ownership(&lb.labels, &cluster_name)),
            };
            match client.update_load_balancer(lb.id, &opts).await {
                Ok(_) => info!(cluster = %cluster_name, id = lb.id, name = %lb.name, "Released adopted load balancer"),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(SyncError::api(format!("unlabeling load balancer {}", lb.name), e))
                }
            }
        } else {
            match client.delete_load_balancer(lb.id).await {
                Ok(()) => {
                    record_resource_deleted(RESOURCE_TYPE);
                    info!(cluster = %cluster_name, id = lb.id, name = %lb.name, "Deleted load balancer");
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(SyncError::api(format!("deleting load balancer {}", lb.name), e))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "loadbalancer_tests.rs"]
mod loadbalancer_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced custom resources.
//!
//! The finalizer keeps a `HetznerCluster` around until its Hetzner Cloud resources
//! are released. It is added on the first reconciliation and removed only after
//! teardown reports completion.
//!
//! # Example
//!
//! ```rust,ignore
//! use hetzner_operator::labels::FINALIZER_HETZNER_CLUSTER;
//! use hetzner_operator::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//!
//! async fn reconcile(client: Client, cluster: HetznerCluster) -> anyhow::Result<()> {
//!     if cluster.is_deleting() {
//!         // release remote resources, then:
//!         return remove_finalizer(&client, &cluster, FINALIZER_HETZNER_CLUSTER).await;
//!     }
//!     ensure_finalizer(&client, &cluster, FINALIZER_HETZNER_CLUSTER).await?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Finalizer list of `resource` with `finalizer` added once.
#[must_use]
pub fn with_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> Vec<String> {
    let mut finalizers = resource.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == finalizer) {
        finalizers.push(finalizer.to_string());
    }
    finalizers
}

/// Finalizer list of `resource` with every occurrence of `finalizer` removed.
#[must_use]
pub fn without_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> Vec<String> {
    resource
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect()
}

/// Add a finalizer to a resource if not already present.
///
/// Idempotent: nothing is patched when the finalizer is already there.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": with_finalizer(resource, finalizer) } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Remove a finalizer from a resource.
///
/// Idempotent: nothing is patched when the finalizer is already absent.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": without_finalizer(resource, finalizer) } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership labels for Hetzner Cloud resources and Kubernetes finalizers.
//!
//! Every remote resource the operator creates carries the label
//! `caph-cluster-<cluster name>=owned`. The label is the only durable link between a
//! `HetznerCluster` and its load balancer, placement groups and network: the ids cached
//! in status are hints, the label is the source of truth.
//!
//! Ownership matching is exact-key. A resource labeled `caph-cluster-foos=owned` is not
//! owned by cluster `foo`, even though the keys share a prefix.

use std::collections::BTreeMap;

// ============================================================================
// Ownership Labels
// ============================================================================

/// Prefix of every cluster ownership label key
pub const CLUSTER_TAG_KEY_PREFIX: &str = "caph-cluster-";

/// Value of the ownership label on resources owned by a cluster
pub const OWNED_LABEL_VALUE: &str = "owned";

/// Marks a remote resource as created by the operator rather than adopted
pub const CREATED_BY_LABEL_KEY: &str = "caph-created-by";

/// Value of [`CREATED_BY_LABEL_KEY`]
pub const CREATED_BY_LABEL_VALUE: &str = "hetzner-operator";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `HetznerCluster` resources
pub const FINALIZER_HETZNER_CLUSTER: &str = "hetznercluster.infrastructure.cluster.x-k8s.io";

/// Ownership state of a remote resource relative to one cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Carries exactly this cluster's ownership label.
    OwnedByCluster,
    /// Carries no cluster ownership label at all.
    Unowned,
    /// Carries another cluster's ownership label (the offending key is kept).
    OwnedByOther(String),
}

/// Label key that scopes a remote resource to `cluster_name`.
///
/// # Example
///
/// ```rust
/// use hetzner_operator::labels::cluster_tag_key;
///
/// assert_eq!(cluster_tag_key("prod"), "caph-cluster-prod");
/// ```
#[must_use]
pub fn cluster_tag_key(cluster_name: &str) -> String {
    format!("{CLUSTER_TAG_KEY_PREFIX}{cluster_name}")
}

/// Labels attached to every resource created for `cluster_name`.
#[must_use]
pub fn owned_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(
        cluster_tag_key(cluster_name),
        OWNED_LABEL_VALUE.to_string(),
    )])
}

/// Ownership labels plus the creation marker, for resources the operator creates
/// and will delete again on teardown.
#[must_use]
pub fn created_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = owned_labels(cluster_name);
    labels.insert(
        CREATED_BY_LABEL_KEY.to_string(),
        CREATED_BY_LABEL_VALUE.to_string(),
    );
    labels
}

/// Whether `labels` carry the creation marker.
#[must_use]
pub fn is_created_by_operator(labels: &BTreeMap<String, String>) -> bool {
    labels.get(CREATED_BY_LABEL_KEY).map(String::as_str) == Some(CREATED_BY_LABEL_VALUE)
}

/// Hetzner label selector matching resources owned by `cluster_name`.
#[must_use]
pub fn owned_label_selector(cluster_name: &str) -> String {
    format!("{}={OWNED_LABEL_VALUE}", cluster_tag_key(cluster_name))
}

/// Classify a label map relative to `cluster_name`.
///
/// A foreign key is any other key starting with [`CLUSTER_TAG_KEY_PREFIX`]
/// whose value is `owned`.
#[must_use]
pub fn ownership_of(labels: &BTreeMap<String, String>, cluster_name: &str) -> Ownership {
    let own_key = cluster_tag_key(cluster_name);

    if labels.get(&own_key).map(String::as_str) == Some(OWNED_LABEL_VALUE) {
        return Ownership::OwnedByCluster;
    }

    labels
        .iter()
        .find(|(key, value)| {
            **key != own_key
                && key.starts_with(CLUSTER_TAG_KEY_PREFIX)
                && value.as_str() == OWNED_LABEL_VALUE
        })
        .map_or(Ownership::Unowned, |(key, _)| {
            Ownership::OwnedByOther(key.clone())
        })
}

/// Whether `labels` mark a resource as owned by `cluster_name`.
#[must_use]
pub fn is_owned_by(labels: &BTreeMap<String, String>, cluster_name: &str) -> bool {
    ownership_of(labels, cluster_name) == Ownership::OwnedByCluster
}

/// Copy of `labels` with this cluster's ownership label added.
#[must_use]
pub fn with_ownership(
    labels: &BTreeMap<String, String>,
    cluster_name: &str,
) -> BTreeMap<String, String> {
    let mut labels = labels.clone();
    labels.insert(
        cluster_tag_key(cluster_name),
        OWNED_LABEL_VALUE.to_string(),
    );
    labels
}

/// Copy of `labels` with this cluster's ownership label removed.
#[must_use]
pub fn without_ownership(
    labels: &BTreeMap<String, String>,
    cluster_name: &str,
) -> BTreeMap<String, String> {
    let mut labels = labels.clone();
    labels.remove(&cluster_tag_key(cluster_name));
    labels
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;

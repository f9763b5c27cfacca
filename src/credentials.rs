// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HCloud token lookup and validation.
//!
//! The token lives in a Kubernetes `Secret` in the cluster namespace, referenced by
//! `spec.hetznerSecretRef`. It is read and checked before any Hetzner Cloud call.
//! Failures are split in two condition reasons:
//!
//! - the secret cannot be read → `HetznerSecretUnreachable`
//! - the secret is readable but the token key is missing, empty or not UTF-8
//!   → `HCloudCredentialsInvalid`

use crate::crd::HetznerCluster;
use crate::status_reasons::{REASON_HCLOUD_CREDENTIALS_INVALID, REASON_HETZNER_SECRET_UNREACHABLE};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Raw key/value content of a secret.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Why the HCloud token could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The secret could not be fetched
    #[error("secret {namespace}/{name} unreachable: {message}")]
    SecretUnreachable {
        namespace: String,
        name: String,
        message: String,
    },

    /// The secret has no entry for the token key
    #[error("secret {name} has no key {key}")]
    MissingKey { name: String, key: String },

    /// The token entry is empty or whitespace
    #[error("token under key {key} in secret {name} is empty")]
    EmptyToken { name: String, key: String },

    /// The token entry is not valid UTF-8
    #[error("token under key {key} in secret {name} is not valid UTF-8")]
    InvalidEncoding { name: String, key: String },
}

impl CredentialError {
    /// Condition reason reported on `HCloudTokenAvailable`.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::SecretUnreachable { .. } => REASON_HETZNER_SECRET_UNREACHABLE,
            Self::MissingKey { .. } | Self::EmptyToken { .. } | Self::InvalidEncoding { .. } => {
                REASON_HCLOUD_CREDENTIALS_INVALID
            }
        }
    }
}

/// Source of secret contents.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the data of secret `name` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::SecretUnreachable`] if the secret cannot be read.
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, CredentialError>;
}

/// Extract the token under `key` from secret data.
///
/// # Errors
///
/// Returns an error if the key is absent, the value is not UTF-8, or the trimmed
/// value is empty.
pub fn validate_token(data: &SecretData, secret_name: &str, key: &str) -> Result<String, CredentialError> {
    let raw = data.get(key).ok_or_else(|| CredentialError::MissingKey {
        name: secret_name.to_string(),
        key: key.to_string(),
    })?;

    let token = std::str::from_utf8(raw).map_err(|_| CredentialError::InvalidEncoding {
        name: secret_name.to_string(),
        key: key.to_string(),
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(CredentialError::EmptyToken {
            name: secret_name.to_string(),
            key: key.to_string(),
        });
    }
    Ok(token.to_string())
}

/// Read and validate the HCloud token referenced by `cluster`.
///
/// # Errors
///
/// Returns the first [`CredentialError`] encountered.
pub async fn load_hcloud_token(
    source: &dyn CredentialSource,
    cluster: &HetznerCluster,
) -> Result<String, CredentialError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let secret_ref = &cluster.spec.hetzner_secret_ref;

    debug!(
        namespace = %namespace,
        secret = %secret_ref.name,
        key = %secret_ref.key.hcloud_token,
        "Loading HCloud token"
    );

    let data = source.fetch(&namespace, &secret_ref.name).await?;
    validate_token(&data, &secret_ref.name, &secret_ref.key.hcloud_token)
}

/// [`CredentialSource`] reading `Secret` objects from the Kubernetes API.
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl KubeSecretSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialSource for KubeSecretSource {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, CredentialError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get(name)
            .await
            .map_err(|e| CredentialError::SecretUnreachable {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let mut data: SecretData = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect();
        // stringData is write-only on the API server, but fixtures may carry it
        for (k, v) in secret.string_data.unwrap_or_default() {
            data.entry(k).or_insert_with(|| v.into_bytes());
        }
        Ok(data)
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;

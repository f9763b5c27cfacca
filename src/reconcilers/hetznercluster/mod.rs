// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `HetznerCluster` reconciliation.
//!
//! A pass runs the steps in a fixed order and stops at the first failing one:
//!
//! 1. Rate-limit governor: inside the wait window nothing is called
//! 2. Spec validation
//! 3. HCloud token from the referenced secret
//! 4. Private network
//! 5. Control-plane load balancer
//! 6. Placement groups
//! 7. Owned server discovery
//!
//! The control-plane endpoint, the `HetznerAPIReachable` condition and the `Ready`
//! summary are refreshed at the end of every pass that reached the API. Failures
//! never escape as errors: each step records a condition and the pass returns how
//! long to wait before the next one.
//!
//! ## Module Structure
//!
//! - [`controller`] - Entry point for `kube::runtime::Controller`
//! - [`status_helpers`] - Readiness summary and status persistence
//! - [`types`] - Shared types and imports

pub mod controller;
pub mod status_helpers;
pub mod types;

pub use controller::reconcile_hetznercluster;
pub use status_helpers::{compute_ready, update_ready_condition};

#[allow(clippy::wildcard_imports)]
use types::*;

use crate::credentials::{load_hcloud_token, CredentialSource};
use crate::hcloud::{GovernedClient, HCloudClient, HCloudClientFactory, HCloudError};
use crate::metrics::record_rate_limit_deferral;
use crate::reconcilers::endpoint::{set_control_plane_endpoint, update_endpoint_condition};
use crate::reconcilers::loadbalancer::{delete_load_balancer, reconcile_load_balancer};
use crate::reconcilers::network::{delete_network, reconcile_network};
use crate::reconcilers::placement_groups::{delete_placement_groups, reconcile_placement_groups};
use crate::reconcilers::rate_limit::{apply_api_outcome, remaining_rate_limit_wait};
use crate::reconcilers::servers::reconcile_owned_servers;
use crate::reconcilers::sync_error::SyncError;
use crate::reconcilers::validation::validate_spec;

/// Result of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// When to run again. `None` waits for the next change of the resource.
    pub requeue_after: Option<Duration>,

    /// `spec.controlPlaneEndpoint` was changed and has to be persisted.
    pub endpoint_changed: bool,

    /// Failure that ended the pass early, already recorded as a condition.
    pub error: Option<String>,
}

/// Result of one teardown pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// All remote resources are released; the finalizer may go.
    Done,
    /// Teardown has to run again after `requeue_after`.
    Pending { requeue_after: Duration },
}

/// Cluster reconciler with its collaborators.
#[derive(Clone)]
pub struct Reconciler {
    credentials: Arc<dyn CredentialSource>,
    hcloud: Arc<dyn HCloudClientFactory>,
    config: ReconcilerConfig,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        hcloud: Arc<dyn HCloudClientFactory>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            credentials,
            hcloud,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Converge the Hetzner Cloud resources of `cluster` and update its status.
    ///
    /// `cluster` is modified in place: status, and `spec.controlPlaneEndpoint` when
    /// [`ReconcileOutcome::endpoint_changed`] is set. Deleting clusters go through
    /// [`Reconciler::cleanup`] instead; called on one, this makes no remote call.
    pub async fn reconcile(&self, cluster: &mut HetznerCluster) -> ReconcileOutcome {
        let cluster_name = cluster.cluster_name();

        if cluster.is_deleting() {
            debug!(cluster = %cluster_name, "Cluster is being deleted, skipping convergence");
            return ReconcileOutcome::default();
        }

        if let Some(wait) = self.rate_limit_deferral(cluster) {
            return ReconcileOutcome {
                requeue_after: Some(wait),
                ..ReconcileOutcome::default()
            };
        }

        if let Err(e) = validate_spec(&cluster.spec) {
            warn!(cluster = %cluster_name, error = %e, "Rejecting invalid spec");
            let status = cluster.status_mut();
            status.ready = false;
            mark_false(
                &mut status.conditions,
                CONDITION_TYPE_READY,
                REASON_CONFIGURATION_INVALID,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            return ReconcileOutcome {
                requeue_after: None,
                endpoint_changed: false,
                error: Some(e.to_string()),
            };
        }

        let client = match self.connect(cluster).await {
            Ok(client) => client,
            Err(e) => {
                update_ready_condition(cluster);
                return ReconcileOutcome {
                    requeue_after: Some(self.config.error_requeue),
                    endpoint_changed: false,
                    error: Some(e.to_string()),
                };
            }
        };

        let result = sync_remote(cluster, &client).await;
        if let Some(outcome) = client.last_outcome() {
            apply_api_outcome(&mut cluster.status_mut().conditions, &outcome);
        }
        if let Err(e) = &result {
            record_rejected_token(cluster, e);
        }

        let endpoint_changed = set_control_plane_endpoint(cluster);
        update_endpoint_condition(cluster);
        let ready = update_ready_condition(cluster);

        match result {
            Ok(()) => {
                debug!(cluster = %cluster_name, ready, "Reconciliation pass finished");
                let requeue_after = if ready {
                    self.config.requeue_when_ready
                } else {
                    self.config.requeue_when_not_ready
                };
                ReconcileOutcome {
                    requeue_after: Some(requeue_after),
                    endpoint_changed,
                    error: None,
                }
            }
            Err(e) => {
                warn!(cluster = %cluster_name, error = %e, "Reconciliation pass stopped");
                ReconcileOutcome {
                    requeue_after: Some(self.failure_requeue(cluster, &e)),
                    endpoint_changed,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Release the Hetzner Cloud resources of a deleting cluster.
    ///
    /// The load balancer goes first. Placement groups and the network are only
    /// deleted once no owned server is left.
    pub async fn cleanup(&self, cluster: &mut HetznerCluster) -> CleanupOutcome {
        let cluster_name = cluster.cluster_name();
        info!(cluster = %cluster_name, "Releasing Hetzner Cloud resources");

        if let Some(wait) = self.rate_limit_deferral(cluster) {
            return CleanupOutcome::Pending {
                requeue_after: wait,
            };
        }

        {
            let status = cluster.status_mut();
            status.ready = false;
            mark_false(
                &mut status.conditions,
                CONDITION_TYPE_READY,
                REASON_DELETING,
                ConditionSeverity::Info,
                "releasing Hetzner Cloud resources",
            );
        }

        let client = match self.connect(cluster).await {
            Ok(client) => client,
            Err(_) => {
                return CleanupOutcome::Pending {
                    requeue_after: self.config.error_requeue,
                }
            }
        };

        let result = teardown(cluster, &client).await;
        if let Some(outcome) = client.last_outcome() {
            apply_api_outcome(&mut cluster.status_mut().conditions, &outcome);
        }

        match result {
            Ok(true) => {
                info!(cluster = %cluster_name, "All Hetzner Cloud resources released");
                CleanupOutcome::Done
            }
            Ok(false) => CleanupOutcome::Pending {
                requeue_after: self.config.teardown_requeue,
            },
            Err(e) => {
                warn!(cluster = %cluster_name, error = %e, "Teardown stopped");
                record_rejected_token(cluster, &e);
                CleanupOutcome::Pending {
                    requeue_after: self.failure_requeue(cluster, &e),
                }
            }
        }
    }

    /// Remaining rate-limit window, recorded as a deferral.
    fn rate_limit_deferral(&self, cluster: &HetznerCluster) -> Option<Duration> {
        let wait =
            remaining_rate_limit_wait(cluster.conditions(), self.config.rate_limit_wait, Utc::now())?;
        record_rate_limit_deferral(RESOURCE_TYPE);
        info!(
            cluster = %cluster.cluster_name(),
            wait_secs = wait.as_secs(),
            "Hetzner Cloud rate limit in effect, deferring"
        );
        Some(wait)
    }

    fn failure_requeue(&self, cluster: &HetznerCluster, error: &SyncError) -> Duration {
        if error.is_rate_limited() {
            remaining_rate_limit_wait(cluster.conditions(), self.config.rate_limit_wait, Utc::now())
                .unwrap_or(self.config.rate_limit_wait)
        } else {
            self.config.error_requeue
        }
    }

    /// Read the token and build the client for this pass.
    ///
    /// Sets `HCloudTokenAvailable` either way.
    async fn connect(&self, cluster: &mut HetznerCluster) -> Result<GovernedClient> {
        let secret_name = cluster.spec.hetzner_secret_ref.name.clone();

        let token = match load_hcloud_token(self.credentials.as_ref(), cluster).await {
            Ok(token) => token,
            Err(e) => {
                warn!(cluster = %cluster.cluster_name(), error = %e, "HCloud token unavailable");
                mark_false(
                    &mut cluster.status_mut().conditions,
                    CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE,
                    e.status_reason(),
                    ConditionSeverity::Error,
                    &e.to_string(),
                );
                return Err(e.into());
            }
        };

        let client = match self.hcloud.client(&token) {
            Ok(client) => client,
            Err(e) => {
                warn!(cluster = %cluster.cluster_name(), error = %e, "Cannot build Hetzner Cloud client");
                mark_false(
                    &mut cluster.status_mut().conditions,
                    CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE,
                    REASON_HCLOUD_CREDENTIALS_INVALID,
                    ConditionSeverity::Error,
                    &e.to_string(),
                );
                return Err(e.into());
            }
        };

        mark_true(
            &mut cluster.status_mut().conditions,
            CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE,
            REASON_TOKEN_AVAILABLE,
            &format!("token read from secret {secret_name}"),
        );
        Ok(GovernedClient::new(client))
    }
}

async fn sync_remote(cluster: &mut HetznerCluster, client: &dyn HCloudClient) -> Result<(), SyncError> {
    reconcile_network(cluster, client).await?;
    reconcile_load_balancer(cluster, client).await?;
    reconcile_placement_groups(cluster, client).await?;
    reconcile_owned_servers(cluster, client).await?;
    Ok(())
}

/// Returns `false` while owned servers still block the release of shared resources.
async fn teardown(cluster: &mut HetznerCluster, client: &dyn HCloudClient) -> Result<bool, SyncError> {
    delete_load_balancer(cluster, client).await?;
    cluster.status_mut().control_plane_load_balancer = None;

    let servers = reconcile_owned_servers(cluster, client).await?;
    if servers > 0 {
        info!(cluster = %cluster.cluster_name(), servers, "Waiting for owned servers to go away");
        mark_false(
            &mut cluster.status_mut().conditions,
            CONDITION_TYPE_READY,
            REASON_WAITING_FOR_SERVERS,
            ConditionSeverity::Info,
            &format!("{servers} owned servers still exist"),
        );
        return Ok(false);
    }

    delete_placement_groups(cluster, client).await?;
    delete_network(cluster, client).await?;
    let status = cluster.status_mut();
    status.hcloud_placement_groups.clear();
    status.network = None;
    Ok(true)
}

/// A token the API refuses is as unusable as a missing one.
fn record_rejected_token(cluster: &mut HetznerCluster, error: &SyncError) {
    if let SyncError::Api {
        source: source @ HCloudError::Unauthorized { .. },
        ..
    } = error
    {
        mark_false(
            &mut cluster.status_mut().conditions,
            CONDITION_TYPE_HCLOUD_TOKEN_AVAILABLE,
            REASON_HCLOUD_CREDENTIALS_INVALID,
            ConditionSeverity::Error,
            &source.to_string(),
        );
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting can be given as a command-line flag or through the matching
//! environment variable. Defaults come from [`crate::constants`].
//!
//! ```text
//! hetzner-operator --rate-limit-wait-secs 600 --metrics-addr 0.0.0.0:9090
//! HCLOUD_ENDPOINT=http://localhost:8080/v1 hetzner-operator
//! ```

use crate::constants::{
    DEFAULT_HCLOUD_ENDPOINT, DEFAULT_METRICS_ADDR, DEFAULT_RATE_LIMIT_WAIT_SECS,
    ERROR_REQUEUE_DURATION_SECS, HCLOUD_REQUEST_TIMEOUT_SECS, REQUEUE_WHEN_NOT_READY_SECS,
    REQUEUE_WHEN_READY_SECS, TEARDOWN_REQUEUE_SECS,
};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Hetzner cluster operator - reconciles HetznerCluster resources against Hetzner Cloud
#[derive(Parser, Debug, Clone)]
#[command(name = "hetzner-operator", version, about, long_about = None)]
pub struct OperatorArgs {
    /// Address the metrics and health endpoints listen on
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Seconds to stay away from the Hetzner Cloud API after a rate-limit response
    #[arg(long, env = "RATE_LIMIT_WAIT_SECS", default_value_t = DEFAULT_RATE_LIMIT_WAIT_SECS)]
    pub rate_limit_wait_secs: u64,

    /// Requeue interval once a cluster is ready
    #[arg(long, env = "REQUEUE_READY_SECS", default_value_t = REQUEUE_WHEN_READY_SECS)]
    pub requeue_ready_secs: u64,

    /// Requeue interval while a cluster is converging
    #[arg(long, env = "REQUEUE_NOT_READY_SECS", default_value_t = REQUEUE_WHEN_NOT_READY_SECS)]
    pub requeue_not_ready_secs: u64,

    /// Requeue interval after a failed step
    #[arg(long, env = "ERROR_REQUEUE_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    pub error_requeue_secs: u64,

    /// Base URL of the Hetzner Cloud API
    #[arg(long, env = "HCLOUD_ENDPOINT", default_value = DEFAULT_HCLOUD_ENDPOINT)]
    pub hcloud_endpoint: Url,

    /// Timeout of a single Hetzner Cloud API request, in seconds
    #[arg(long, env = "HCLOUD_TIMEOUT_SECS", default_value_t = HCLOUD_REQUEST_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,
}

impl OperatorArgs {
    /// Timings used by the reconciler.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            rate_limit_wait: Duration::from_secs(self.rate_limit_wait_secs),
            requeue_when_ready: Duration::from_secs(self.requeue_ready_secs),
            requeue_when_not_ready: Duration::from_secs(self.requeue_not_ready_secs),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
            teardown_requeue: Duration::from_secs(TEARDOWN_REQUEUE_SECS),
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Requeue and backoff intervals of a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Window after a rate-limit response during which no API call is made.
    pub rate_limit_wait: Duration,
    pub requeue_when_ready: Duration,
    pub requeue_when_not_ready: Duration,
    pub error_requeue: Duration,
    /// Poll interval while teardown waits for owned servers.
    pub teardown_requeue: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            rate_limit_wait: Duration::from_secs(DEFAULT_RATE_LIMIT_WAIT_SECS),
            requeue_when_ready: Duration::from_secs(REQUEUE_WHEN_READY_SECS),
            requeue_when_not_ready: Duration::from_secs(REQUEUE_WHEN_NOT_READY_SECS),
            error_requeue: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            teardown_requeue: Duration::from_secs(TEARDOWN_REQUEUE_SECS),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

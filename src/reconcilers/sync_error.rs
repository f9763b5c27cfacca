// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Failure of one synchronizer step.
//!
//! Every step records its own condition before returning one of these; the
//! orchestrator only needs to know that the pass stops and how long to wait.

use crate::hcloud::HCloudError;
use crate::status_reasons::{REASON_HCLOUD_API_UNREACHABLE, REASON_RATE_LIMIT_EXCEEDED};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A Hetzner Cloud call failed.
    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: HCloudError,
    },

    /// A remote resource exists but cannot be taken over.
    #[error("{0}")]
    Ownership(String),
}

impl SyncError {
    pub fn api(context: impl Into<String>, source: HCloudError) -> Self {
        Self::Api {
            context: context.into(),
            source,
        }
    }

    /// Whether the step stopped because of the API rate limit.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { source, .. } if source.is_rate_limited())
    }
}

/// Condition reason for a failed call: rate limit and transport failures share
/// reasons across steps, anything else gets the step-specific `reason`.
#[must_use]
pub fn api_failure_reason(error: &HCloudError, reason: &'static str) -> &'static str {
    match error {
        HCloudError::RateLimited { .. } => REASON_RATE_LIMIT_EXCEEDED,
        HCloudError::Transient { .. } => REASON_HCLOUD_API_UNREACHABLE,
        _ => reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_reasons::REASON_CREATE_LOAD_BALANCER_FAILED;

    fn err(kind: fn(String) -> HCloudError) -> HCloudError {
        kind("boom".to_string())
    }

    #[test]
    fn test_shared_reasons_override_step_reason() {
        let rate_limited = err(|message| HCloudError::RateLimited { message });
        let transient = err(|message| HCloudError::Transient { message });
        let conflict = err(|message| HCloudError::Conflict { message });

        assert_eq!(
            api_failure_reason(&rate_limited, REASON_CREATE_LOAD_BALANCER_FAILED),
            REASON_RATE_LIMIT_EXCEEDED
        );
        assert_eq!(
            api_failure_reason(&transient, REASON_CREATE_LOAD_BALANCER_FAILED),
            REASON_HCLOUD_API_UNREACHABLE
        );
        assert_eq!(
            api_failure_reason(&conflict, REASON_CREATE_LOAD_BALANCER_FAILED),
            REASON_CREATE_LOAD_BALANCER_FAILED
        );
    }

    #[test]
    fn test_is_rate_limited() {
        let limited = SyncError::api(
            "creating load balancer",
            err(|message| HCloudError::RateLimited { message }),
        );
        assert!(limited.is_rate_limited());
        assert!(limited.to_string().starts_with("creating load balancer: "));

        let not_found = SyncError::api("deleting network", err(|message| HCloudError::NotFound { message }));
        assert!(!not_found.is_rate_limited());
        assert!(!SyncError::Ownership("taken".to_string()).is_rate_limited());
    }
}

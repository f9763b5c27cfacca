// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rate-limit governor.
//!
//! When Hetzner Cloud answers with a rate-limit error, `HetznerAPIReachable` is set to
//! `False` with reason `RateLimitExceeded`. For the configured wait after that
//! transition the reconciler makes no API calls at all and requeues instead.
//! The window is measured from the condition's `lastTransitionTime`, which the
//! condition store leaves untouched while the condition stays `False`.

use crate::crd::{Condition, ConditionSeverity, HetznerCluster};
use crate::hcloud::ApiOutcome;
use crate::reconcilers::status::{
    find_condition, is_false_with_reason, last_transition_time, mark_false, mark_true,
};
use crate::status_reasons::{
    CONDITION_TYPE_HETZNER_API_REACHABLE, REASON_API_REACHABLE, REASON_HCLOUD_API_UNREACHABLE,
    REASON_RATE_LIMIT_EXCEEDED,
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether `cluster` is still inside a rate-limit wait window.
#[must_use]
pub fn reconcile_rate_limit(cluster: &HetznerCluster, wait: Duration) -> bool {
    reconcile_rate_limit_at(cluster, wait, Utc::now())
}

/// [`reconcile_rate_limit`] evaluated at `now`.
#[must_use]
pub fn reconcile_rate_limit_at(cluster: &HetznerCluster, wait: Duration, now: DateTime<Utc>) -> bool {
    remaining_rate_limit_wait(cluster.conditions(), wait, now).is_some()
}

/// Time left in the rate-limit window, `None` if the API may be called.
///
/// A missing or unparsable `lastTransitionTime` counts as an elapsed window.
/// A timestamp in the future is treated as "just now".
#[must_use]
pub fn remaining_rate_limit_wait(
    conditions: &[Condition],
    wait: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if !is_false_with_reason(
        conditions,
        CONDITION_TYPE_HETZNER_API_REACHABLE,
        REASON_RATE_LIMIT_EXCEEDED,
    ) {
        return None;
    }

    let since = find_condition(conditions, CONDITION_TYPE_HETZNER_API_REACHABLE)
        .and_then(last_transition_time)?;

    let elapsed = (now - since).to_std().unwrap_or(Duration::ZERO);
    wait.checked_sub(elapsed).filter(|left| !left.is_zero())
}

/// Record the API outcome of a pass on `HetznerAPIReachable`.
pub fn apply_api_outcome(conditions: &mut Vec<Condition>, outcome: &ApiOutcome) {
    match outcome {
        ApiOutcome::Reachable => mark_true(
            conditions,
            CONDITION_TYPE_HETZNER_API_REACHABLE,
            REASON_API_REACHABLE,
            "Hetzner Cloud API reachable",
        ),
        ApiOutcome::RateLimited(message) => mark_false(
            conditions,
            CONDITION_TYPE_HETZNER_API_REACHABLE,
            REASON_RATE_LIMIT_EXCEEDED,
            ConditionSeverity::Warning,
            message,
        ),
        ApiOutcome::Unreachable(message) => mark_false(
            conditions,
            CONDITION_TYPE_HETZNER_API_REACHABLE,
            REASON_HCLOUD_API_UNREACHABLE,
            ConditionSeverity::Warning,
            message,
        ),
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod rate_limit_tests;

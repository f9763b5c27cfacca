// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition store for `HetznerCluster` status.
//!
//! Pure in-memory helpers over a `Vec<Condition>`. Nothing in this module talks to
//! the Kubernetes API; persisting the conditions is the job of the status updater.
//!
//! # Condition Format
//!
//! - `type`: the aspect being reported (e.g. `LoadBalancerReady`)
//! - `status`: `True`, `False` or `Unknown`
//! - `severity`: `Error`, `Warning`, `Info` or absent
//! - `reason`: a programmatic identifier (CamelCase)
//! - `message`: a human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last status change
//!
//! `lastTransitionTime` only moves when `status` changes. The rate-limit governor
//! measures its wait window from that timestamp, so rewriting a `False` condition
//! with the same status must not restart the window.
//!
//! # Example
//!
//! ```rust
//! use hetzner_operator::crd::ConditionSeverity;
//! use hetzner_operator::reconcilers::status::{is_false_with_reason, mark_false};
//!
//! let mut conditions = Vec::new();
//! mark_false(
//!     &mut conditions,
//!     "HetznerAPIReachable",
//!     "RateLimitExceeded",
//!     ConditionSeverity::Warning,
//!     "rate limit exceeded",
//! );
//! assert!(is_false_with_reason(&conditions, "HetznerAPIReachable", "RateLimitExceeded"));
//! ```

use crate::crd::{Condition, ConditionSeverity, ConditionStatus};
use chrono::{DateTime, Utc};

/// Create a new condition stamped with `now`.
#[must_use]
pub fn create_condition_at(
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    severity: Option<ConditionSeverity>,
    message: &str,
    now: DateTime<Utc>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status,
        severity,
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(now.to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition, stamping new transitions with the current time.
///
/// See [`set_condition_at`].
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    severity: Option<ConditionSeverity>,
    message: &str,
) {
    set_condition_at(
        conditions,
        condition_type,
        status,
        reason,
        severity,
        message,
        Utc::now(),
    );
}

/// Update or add a condition, stamping new transitions with `now`.
///
/// If a condition of the same type exists with the same status, only reason,
/// severity and message are rewritten; `lastTransitionTime` is preserved.
/// Calling this twice with identical arguments is a no-op the second time.
pub fn set_condition_at(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    severity: Option<ConditionSeverity>,
    message: &str,
    now: DateTime<Utc>,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| now.to_rfc3339())
        } else {
            now.to_rfc3339()
        };

        existing.status = status;
        existing.severity = severity;
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition_at(
            condition_type,
            status,
            reason,
            severity,
            message,
            now,
        ));
    }
}

/// Set a condition to `True` with no severity.
pub fn mark_true(conditions: &mut Vec<Condition>, condition_type: &str, reason: &str, message: &str) {
    set_condition(
        conditions,
        condition_type,
        ConditionStatus::True,
        reason,
        None,
        message,
    );
}

/// Set a condition to `False` with the given severity.
pub fn mark_false(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    reason: &str,
    severity: ConditionSeverity,
    message: &str,
) {
    set_condition(
        conditions,
        condition_type,
        ConditionStatus::False,
        reason,
        Some(severity),
        message,
    );
}

/// Whether the condition exists and is `True`.
#[must_use]
pub fn is_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == ConditionStatus::True)
}

/// Whether the condition exists, is `False` and carries `reason`.
#[must_use]
pub fn is_false_with_reason(conditions: &[Condition], condition_type: &str, reason: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| {
        c.status == ConditionStatus::False && c.reason.as_deref() == Some(reason)
    })
}

/// Parse the `lastTransitionTime` of a condition.
///
/// Returns `None` when the timestamp is absent or not valid RFC3339.
#[must_use]
pub fn last_transition_time(condition: &Condition) -> Option<DateTime<Utc>> {
    condition
        .last_transition_time
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Compare two condition lists semantically, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.severity == new_cond.severity
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;
    use std::collections::HashSet;

    #[test]
    fn test_readiness_excludes_summary_and_reachability() {
        assert!(!READINESS_CONDITION_TYPES.contains(&CONDITION_TYPE_READY));
        assert!(!READINESS_CONDITION_TYPES.contains(&CONDITION_TYPE_HETZNER_API_REACHABLE));
        assert!(READINESS_CONDITION_TYPES.contains(&CONDITION_TYPE_CONTROL_PLANE_ENDPOINT_SET));
    }

    #[test]
    fn test_condition_types_unique() {
        let types: HashSet<_> = READINESS_CONDITION_TYPES.iter().collect();
        assert_eq!(types.len(), READINESS_CONDITION_TYPES.len());
    }

    #[test]
    fn test_reasons_are_camel_case() {
        let reasons = [
            REASON_ALL_READY,
            REASON_NOT_READY,
            REASON_DELETING,
            REASON_WAITING_FOR_SERVERS,
            REASON_TOKEN_AVAILABLE,
            REASON_HETZNER_SECRET_UNREACHABLE,
            REASON_HCLOUD_CREDENTIALS_INVALID,
            REASON_API_REACHABLE,
            REASON_RATE_LIMIT_EXCEEDED,
            REASON_HCLOUD_API_UNREACHABLE,
            REASON_LOAD_BALANCER_READY,
            REASON_LOAD_BALANCER_DISABLED,
            REASON_LOAD_BALANCER_FAILED_TO_OWN,
            REASON_CREATE_LOAD_BALANCER_FAILED,
            REASON_LOAD_BALANCER_UPDATE_FAILED,
            REASON_LOAD_BALANCER_SERVICE_SYNC_FAILED,
            REASON_PLACEMENT_GROUPS_SYNCED,
            REASON_PLACEMENT_GROUPS_SYNC_FAILED,
            REASON_NETWORK_READY,
            REASON_NETWORK_DISABLED,
            REASON_NETWORK_RECONCILE_FAILED,
            REASON_CONTROL_PLANE_ENDPOINT_SET,
            REASON_CONTROL_PLANE_ENDPOINT_NOT_SET,
            REASON_CONFIGURATION_INVALID,
        ];

        for reason in reasons {
            assert!(
                reason.chars().next().is_some_and(char::is_uppercase),
                "{reason} should start with an uppercase letter"
            );
            assert!(
                reason.chars().all(char::is_alphanumeric),
                "{reason} should be CamelCase"
            );
        }

        let unique: HashSet<_> = reasons.iter().collect();
        assert_eq!(unique.len(), reasons.len());
    }
}

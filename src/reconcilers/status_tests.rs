// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the condition store

#[cfg(test)]
mod tests {
    use crate::crd::{ConditionSeverity, ConditionStatus};
    use crate::reconcilers::status::{
        conditions_equal, create_condition_at, find_condition, is_false_with_reason, is_true,
        last_transition_time, mark_false, mark_true, set_condition_at,
    };
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_set_condition_adds_new_condition() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut conditions = Vec::new();

        set_condition_at(
            &mut conditions,
            "NetworkReady",
            ConditionStatus::True,
            "NetworkReady",
            None,
            "network 42 ready",
            now,
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_eq!(last_transition_time(&conditions[0]), Some(now));
    }

    #[test]
    fn test_set_condition_same_status_preserves_transition_time() {
        let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let later = first + Duration::minutes(10);
        let mut conditions = Vec::new();

        set_condition_at(
            &mut conditions,
            "HetznerAPIReachable",
            ConditionStatus::False,
            "RateLimitExceeded",
            Some(ConditionSeverity::Warning),
            "rate limited",
            first,
        );
        // Reason and message change, status does not
        set_condition_at(
            &mut conditions,
            "HetznerAPIReachable",
            ConditionStatus::False,
            "HCloudAPIUnreachable",
            Some(ConditionSeverity::Warning),
            "timeout",
            later,
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason.as_deref(), Some("HCloudAPIUnreachable"));
        assert_eq!(conditions[0].message.as_deref(), Some("timeout"));
        assert_eq!(last_transition_time(&conditions[0]), Some(first));
    }

    #[test]
    fn test_set_condition_idempotent() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut conditions = Vec::new();

        for offset in [0, 5] {
            set_condition_at(
                &mut conditions,
                "Ready",
                ConditionStatus::False,
                "NotReady",
                Some(ConditionSeverity::Info),
                "waiting",
                now + Duration::minutes(offset),
            );
        }

        let snapshot = conditions.clone();
        set_condition_at(
            &mut conditions,
            "Ready",
            ConditionStatus::False,
            "NotReady",
            Some(ConditionSeverity::Info),
            "waiting",
            now + Duration::hours(1),
        );
        assert_eq!(conditions, snapshot);
    }

    #[test]
    fn test_set_condition_status_change_moves_transition_time() {
        let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let later = first + Duration::minutes(3);
        let mut conditions = Vec::new();

        set_condition_at(
            &mut conditions,
            "LoadBalancerReady",
            ConditionStatus::False,
            "LoadBalancerFailedToOwn",
            Some(ConditionSeverity::Error),
            "not found",
            first,
        );
        set_condition_at(
            &mut conditions,
            "LoadBalancerReady",
            ConditionStatus::True,
            "LoadBalancerReady",
            None,
            "",
            later,
        );

        assert_eq!(last_transition_time(&conditions[0]), Some(later));
        assert_eq!(conditions[0].severity, None);
    }

    #[test]
    fn test_mark_helpers() {
        let mut conditions = Vec::new();
        mark_false(
            &mut conditions,
            "LoadBalancerReady",
            "LoadBalancerFailedToOwn",
            ConditionSeverity::Error,
            "owned by another cluster",
        );
        assert!(is_false_with_reason(
            &conditions,
            "LoadBalancerReady",
            "LoadBalancerFailedToOwn"
        ));
        assert!(!is_true(&conditions, "LoadBalancerReady"));

        mark_true(&mut conditions, "LoadBalancerReady", "LoadBalancerReady", "");
        assert!(is_true(&conditions, "LoadBalancerReady"));
        assert!(!is_false_with_reason(
            &conditions,
            "LoadBalancerReady",
            "LoadBalancerFailedToOwn"
        ));
    }

    #[test]
    fn test_find_condition_missing() {
        assert!(find_condition(&[], "Ready").is_none());
        assert!(!is_true(&[], "Ready"));
    }

    #[test]
    fn test_last_transition_time_unparsable() {
        let mut condition = create_condition_at(
            "Ready",
            ConditionStatus::True,
            "AllReady",
            None,
            "",
            Utc::now(),
        );
        condition.last_transition_time = Some("yesterday".to_string());
        assert!(last_transition_time(&condition).is_none());
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![create_condition_at(
            "Ready",
            ConditionStatus::True,
            "AllReady",
            None,
            "ok",
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )];
        let b = vec![create_condition_at(
            "Ready",
            ConditionStatus::True,
            "AllReady",
            None,
            "ok",
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        )];
        assert!(conditions_equal(&a, &b));

        let mut c = b.clone();
        c[0].severity = Some(ConditionSeverity::Info);
        assert!(!conditions_equal(&a, &c));
        assert!(!conditions_equal(&a, &[]));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `network.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{HetznerCluster, HetznerClusterSpec};
    use crate::hcloud::fake::FakeHCloud;
    use crate::hcloud::{HCloudError, Network};
    use crate::labels::owned_labels;
    use crate::reconcilers::network::{delete_network, reconcile_network};
    use crate::reconcilers::status::{find_condition, is_false_with_reason, is_true};
    use crate::status_reasons::{
        CONDITION_TYPE_NETWORK_READY, REASON_NETWORK_DISABLED, REASON_NETWORK_RECONCILE_FAILED,
    };

    fn cluster(enabled: bool) -> HetznerCluster {
        let mut cluster = HetznerCluster::new("c1", HetznerClusterSpec::default());
        cluster.spec.hcloud_network.enabled = enabled;
        cluster
    }

    fn owned_network() -> Network {
        Network {
            name: "c1".to_string(),
            ip_range: "10.0.0.0/16".to_string(),
            labels: owned_labels("c1"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creates_network_once() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster(true);

        reconcile_network(&mut cluster, &fake).await.unwrap();
        assert_eq!(fake.mutations(), vec!["create_network:c1".to_string()]);
        assert!(is_true(cluster.conditions(), CONDITION_TYPE_NETWORK_READY));

        let status = cluster.status.as_ref().unwrap().network.clone().unwrap();
        assert_eq!(status.ip_range, "10.0.0.0/16");
        assert_eq!(status.id, fake.networks()[0].id);

        fake.clear_mutations();
        reconcile_network(&mut cluster, &fake).await.unwrap();
        assert!(fake.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_deletes_owned_network() {
        let fake = FakeHCloud::new();
        fake.insert_network(owned_network());
        let mut cluster = cluster(false);

        reconcile_network(&mut cluster, &fake).await.unwrap();

        assert!(fake.networks().is_empty());
        assert!(cluster.status.as_ref().unwrap().network.is_none());
        let cond = find_condition(cluster.conditions(), CONDITION_TYPE_NETWORK_READY).unwrap();
        assert_eq!(cond.reason.as_deref(), Some(REASON_NETWORK_DISABLED));
    }

    #[tokio::test]
    async fn test_create_failure() {
        let fake = FakeHCloud::new();
        fake.fail_next(
            "create_network",
            HCloudError::Conflict {
                message: "ip range overlaps".to_string(),
            },
        );
        let mut cluster = cluster(true);

        assert!(reconcile_network(&mut cluster, &fake).await.is_err());
        assert!(is_false_with_reason(
            cluster.conditions(),
            CONDITION_TYPE_NETWORK_READY,
            REASON_NETWORK_RECONCILE_FAILED
        ));
    }

    #[tokio::test]
    async fn test_delete_network_tolerates_absence() {
        let fake = FakeHCloud::new();
        let cluster = cluster(true);
        delete_network(&cluster, &fake).await.unwrap();

        fake.insert_network(owned_network());
        delete_network(&cluster, &fake).await.unwrap();
        assert!(fake.networks().is_empty());
    }
}

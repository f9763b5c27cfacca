// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{HetznerCluster, HetznerClusterSpec};
    use crate::labels::FINALIZER_HETZNER_CLUSTER;
    use crate::reconcilers::finalizers::{has_finalizer, with_finalizer, without_finalizer};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use k8s_openapi::jiff::Timestamp;

    const OTHER_FINALIZER: &str = "cluster.x-k8s.io/other";

    fn cluster_with_finalizers(finalizers: &[&str]) -> HetznerCluster {
        let mut cluster = HetznerCluster::new("c1", HetznerClusterSpec::default());
        cluster.metadata.namespace = Some("default".to_string());
        if !finalizers.is_empty() {
            cluster.metadata.finalizers =
                Some(finalizers.iter().map(ToString::to_string).collect());
        }
        cluster
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(
            &cluster_with_finalizers(&[]),
            FINALIZER_HETZNER_CLUSTER
        ));
        assert!(has_finalizer(
            &cluster_with_finalizers(&[OTHER_FINALIZER, FINALIZER_HETZNER_CLUSTER]),
            FINALIZER_HETZNER_CLUSTER
        ));
        assert!(!has_finalizer(
            &cluster_with_finalizers(&[OTHER_FINALIZER]),
            FINALIZER_HETZNER_CLUSTER
        ));
    }

    #[test]
    fn test_with_finalizer_adds_once() {
        let cluster = cluster_with_finalizers(&[OTHER_FINALIZER]);
        assert_eq!(
            with_finalizer(&cluster, FINALIZER_HETZNER_CLUSTER),
            vec![OTHER_FINALIZER, FINALIZER_HETZNER_CLUSTER]
        );

        let cluster = cluster_with_finalizers(&[FINALIZER_HETZNER_CLUSTER]);
        assert_eq!(
            with_finalizer(&cluster, FINALIZER_HETZNER_CLUSTER),
            vec![FINALIZER_HETZNER_CLUSTER]
        );
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let cluster = cluster_with_finalizers(&[
            FINALIZER_HETZNER_CLUSTER,
            OTHER_FINALIZER,
            FINALIZER_HETZNER_CLUSTER,
        ]);
        assert_eq!(
            without_finalizer(&cluster, FINALIZER_HETZNER_CLUSTER),
            vec![OTHER_FINALIZER]
        );
        assert!(without_finalizer(&cluster_with_finalizers(&[]), FINALIZER_HETZNER_CLUSTER).is_empty());
    }

    #[test]
    fn test_deleting_cluster_keeps_finalizer_until_removed() {
        let mut cluster = cluster_with_finalizers(&[FINALIZER_HETZNER_CLUSTER]);
        cluster.metadata.deletion_timestamp = Some(Time(Timestamp::now()));

        assert!(cluster.is_deleting());
        assert!(has_finalizer(&cluster, FINALIZER_HETZNER_CLUSTER));
    }
}

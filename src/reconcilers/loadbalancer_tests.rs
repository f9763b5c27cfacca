// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `loadbalancer.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        ApiEndpoint, ConditionStatus, HetznerCluster, HetznerClusterSpec, LoadBalancerAlgorithm,
        LoadBalancerServiceSpec, NetworkStatus, ServiceProtocol,
    };
    use crate::hcloud::fake::FakeHCloud;
    use crate::hcloud::{HCloudError, LoadBalancer, LoadBalancerService};
    use crate::labels::{cluster_tag_key, created_labels, owned_labels};
    use crate::reconcilers::loadbalancer::{
        delete_load_balancer, desired_services, generated_load_balancer_name,
        reconcile_load_balancer,
    };
    use crate::reconcilers::status::{find_condition, is_false_with_reason, is_true};
    use crate::status_reasons::{
        CONDITION_TYPE_LOAD_BALANCER_READY, REASON_HCLOUD_API_UNREACHABLE,
        REASON_LOAD_BALANCER_DISABLED, REASON_LOAD_BALANCER_FAILED_TO_OWN,
        REASON_RATE_LIMIT_EXCEEDED,
    };
    use std::collections::BTreeMap;

    fn cluster() -> HetznerCluster {
        let mut cluster = HetznerCluster::new("c1", HetznerClusterSpec::default());
        cluster.metadata.namespace = Some("default".to_string());
        cluster.metadata.uid = Some("4a1c2f0e-uid".to_string());
        cluster.spec.control_plane_load_balancer.region = "fsn1".to_string();
        cluster
    }

    fn named_cluster(name: &str) -> HetznerCluster {
        let mut cluster = cluster();
        cluster.spec.control_plane_load_balancer.name = Some(name.to_string());
        cluster
    }

    fn tcp(listen_port: u16, destination_port: u16) -> LoadBalancerService {
        LoadBalancerService {
            listen_port,
            destination_port,
            protocol: "tcp".to_string(),
        }
    }

    fn remote_lb(name: &str, labels: BTreeMap<String, String>) -> LoadBalancer {
        LoadBalancer {
            name: name.to_string(),
            load_balancer_type: "lb11".to_string(),
            location: "fsn1".to_string(),
            algorithm: "least_connections".to_string(),
            labels,
            services: vec![tcp(6443, 6443)],
            ipv4: "1.2.3.4".to_string(),
            ..Default::default()
        }
    }

    fn lb_reason(cluster: &HetznerCluster) -> Option<String> {
        find_condition(cluster.conditions(), CONDITION_TYPE_LOAD_BALANCER_READY)
            .and_then(|c| c.reason.clone())
    }

    #[test]
    fn test_generated_name_is_stable() {
        let cluster = cluster();
        let name = generated_load_balancer_name(&cluster);
        assert!(name.starts_with("c1-kube-apiserver-"));
        assert_eq!(name.len(), "c1-kube-apiserver-".len() + 5);
        assert_eq!(name, generated_load_balancer_name(&cluster));

        let mut other = cluster.clone();
        other.metadata.uid = Some("another-uid".to_string());
        assert_ne!(name, generated_load_balancer_name(&other));
    }

    #[test]
    fn test_desired_services() {
        let mut cluster = cluster();
        cluster.spec.control_plane_load_balancer.extra_services = vec![LoadBalancerServiceSpec {
            listen_port: 443,
            destination_port: 8443,
            protocol: ServiceProtocol::Https,
        }];

        let services = desired_services(&cluster);
        assert_eq!(services[0], tcp(6443, 6443));
        assert_eq!(services[1].protocol, "https");

        cluster.spec.control_plane_endpoint = Some(ApiEndpoint {
            host: "api.example.com".to_string(),
            port: 7443,
        });
        assert_eq!(desired_services(&cluster)[0], tcp(7443, 6443));
    }

    #[tokio::test]
    async fn test_creates_load_balancer_then_idempotent() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster();
        let name = generated_load_balancer_name(&cluster);

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        let lbs = fake.load_balancers();
        assert_eq!(lbs.len(), 1);
        assert_eq!(lbs[0].name, name);
        assert_eq!(lbs[0].labels, created_labels("c1"));
        assert_eq!(
            fake.mutations(),
            vec![
                format!("create_load_balancer:{name}"),
                format!("add_service:{}:6443", lbs[0].id),
            ]
        );
        assert!(is_true(cluster.conditions(), CONDITION_TYPE_LOAD_BALANCER_READY));
        let status = cluster.status.as_ref().unwrap();
        assert_eq!(status.control_plane_load_balancer.as_ref().unwrap().id, lbs[0].id);

        fake.clear_mutations();
        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();
        assert!(fake.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_attaches_recorded_network() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster();
        cluster.status_mut().network = Some(NetworkStatus {
            id: 7,
            ip_range: "10.0.0.0/16".to_string(),
        });

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        let status = cluster.status.as_ref().unwrap();
        let lb = status.control_plane_load_balancer.as_ref().unwrap();
        assert_eq!(lb.internal_ip.as_deref(), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_disabled_makes_no_calls() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster();
        cluster.spec.control_plane_load_balancer.enabled = false;

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        assert_eq!(fake.calls(), 0);
        assert_eq!(lb_reason(&cluster).as_deref(), Some(REASON_LOAD_BALANCER_DISABLED));
        assert!(cluster
            .status
            .as_ref()
            .unwrap()
            .control_plane_load_balancer
            .is_none());
    }

    #[tokio::test]
    async fn test_multiple_owned_is_ambiguous() {
        let fake = FakeHCloud::new();
        fake.insert_load_balancer(remote_lb("a", owned_labels("c1")));
        fake.insert_load_balancer(remote_lb("b", owned_labels("c1")));
        let mut cluster = cluster();

        assert!(reconcile_load_balancer(&mut cluster, &fake).await.is_err());
        assert!(is_false_with_reason(
            cluster.conditions(),
            CONDITION_TYPE_LOAD_BALANCER_READY,
            REASON_LOAD_BALANCER_FAILED_TO_OWN
        ));
        assert!(fake.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_named_missing_then_adopted() {
        let fake = FakeHCloud::new();
        let mut cluster = named_cluster("lb-1");

        assert!(reconcile_load_balancer(&mut cluster, &fake).await.is_err());
        assert_eq!(
            lb_reason(&cluster).as_deref(),
            Some(REASON_LOAD_BALANCER_FAILED_TO_OWN)
        );
        assert!(fake.mutations().is_empty());

        // Created out of band, without any label
        let id = fake.insert_load_balancer(remote_lb(
            "lb-1",
            BTreeMap::from([("team".to_string(), "infra".to_string())]),
        ));

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();
        assert!(is_true(cluster.conditions(), CONDITION_TYPE_LOAD_BALANCER_READY));
        assert_eq!(fake.mutations(), vec![format!("update_load_balancer:{id}")]);

        let labels = &fake.load_balancers()[0].labels;
        assert_eq!(labels.get(&cluster_tag_key("c1")).map(String::as_str), Some("owned"));
        assert_eq!(labels.get("team").map(String::as_str), Some("infra"));
    }

    #[tokio::test]
    async fn test_named_owned_by_prefix_sharing_cluster_is_not_taken() {
        let fake = FakeHCloud::new();
        let foreign = owned_labels("c1s");
        fake.insert_load_balancer(remote_lb("lb-1", foreign.clone()));
        let mut cluster = named_cluster("lb-1");

        assert!(reconcile_load_balancer(&mut cluster, &fake).await.is_err());
        assert_eq!(
            lb_reason(&cluster).as_deref(),
            Some(REASON_LOAD_BALANCER_FAILED_TO_OWN)
        );
        assert!(fake.mutations().is_empty());
        assert_eq!(fake.load_balancers()[0].labels, foreign);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous() {
        let fake = FakeHCloud::new();
        fake.insert_load_balancer(remote_lb("lb-1", BTreeMap::new()));
        fake.insert_load_balancer(remote_lb("lb-1", BTreeMap::new()));
        let mut cluster = named_cluster("lb-1");

        assert!(reconcile_load_balancer(&mut cluster, &fake).await.is_err());
        assert_eq!(
            lb_reason(&cluster).as_deref(),
            Some(REASON_LOAD_BALANCER_FAILED_TO_OWN)
        );
        assert!(fake.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_syncs_name_type_and_algorithm() {
        let fake = FakeHCloud::new();
        let mut remote = remote_lb("old-name", owned_labels("c1"));
        remote.load_balancer_type = "lb21".to_string();
        remote.algorithm = "round_robin".to_string();
        let id = fake.insert_load_balancer(remote);

        let mut cluster = named_cluster("new-name");
        cluster.spec.control_plane_load_balancer.algorithm = LoadBalancerAlgorithm::LeastConnections;

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        assert_eq!(
            fake.mutations(),
            vec![
                format!("update_load_balancer:{id}"),
                format!("change_load_balancer_type:{id}:lb11"),
                format!("change_load_balancer_algorithm:{id}:least_connections"),
            ]
        );
        let status = cluster.status.as_ref().unwrap();
        let lb = status.control_plane_load_balancer.as_ref().unwrap();
        assert_eq!(lb.name, "new-name");
        assert_eq!(lb.r#type, "lb11");
    }

    #[tokio::test]
    async fn test_service_diff() {
        let fake = FakeHCloud::new();
        let mut remote = remote_lb("lb", owned_labels("c1"));
        remote.services = vec![
            tcp(6443, 6443),
            tcp(80, 80),
            LoadBalancerService {
                listen_port: 443,
                destination_port: 8443,
                protocol: "http".to_string(),
            },
        ];
        let id = fake.insert_load_balancer(remote);

        let mut cluster = cluster();
        cluster.spec.control_plane_load_balancer.extra_services = vec![LoadBalancerServiceSpec {
            listen_port: 443,
            destination_port: 8443,
            protocol: ServiceProtocol::Tcp,
        }];

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        assert_eq!(
            fake.mutations(),
            vec![
                format!("delete_service:{id}:80"),
                format!("update_service:{id}:443"),
            ]
        );
        assert_eq!(
            fake.load_balancers()[0].services,
            vec![tcp(6443, 6443), tcp(443, 8443)]
        );
    }

    #[tokio::test]
    async fn test_partial_service_failure_keeps_earlier_changes() {
        let fake = FakeHCloud::new();
        let mut remote = remote_lb("lb", owned_labels("c1"));
        remote.services = vec![tcp(80, 80)];
        fake.insert_load_balancer(remote);
        fake.fail_next(
            "add_service",
            HCloudError::Transient {
                message: "timeout".to_string(),
            },
        );

        let mut cluster = cluster();
        assert!(reconcile_load_balancer(&mut cluster, &fake).await.is_err());

        assert!(fake.load_balancers()[0].services.is_empty());
        assert_eq!(
            lb_reason(&cluster).as_deref(),
            Some(REASON_HCLOUD_API_UNREACHABLE)
        );

        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();
        assert_eq!(fake.load_balancers()[0].services, vec![tcp(6443, 6443)]);
    }

    #[tokio::test]
    async fn test_rate_limited_lookup() {
        let fake = FakeHCloud::new();
        fake.fail_next(
            "list_load_balancers",
            HCloudError::RateLimited {
                message: "limit".to_string(),
            },
        );
        let mut cluster = cluster();

        let err = reconcile_load_balancer(&mut cluster, &fake).await.unwrap_err();
        assert!(err.is_rate_limited());
        let cond = find_condition(cluster.conditions(), CONDITION_TYPE_LOAD_BALANCER_READY).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason.as_deref(), Some(REASON_RATE_LIMIT_EXCEEDED));
    }

    #[tokio::test]
    async fn test_delete_generated_load_balancer() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster();
        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        delete_load_balancer(&cluster, &fake).await.unwrap();
        assert!(fake.load_balancers().is_empty());
    }

    #[tokio::test]
    async fn test_delete_adopted_load_balancer_only_unlabels() {
        let fake = FakeHCloud::new();
        fake.insert_load_balancer(remote_lb("lb-1", BTreeMap::new()));
        let mut cluster = named_cluster("lb-1");
        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        delete_load_balancer(&cluster, &fake).await.unwrap();

        let lbs = fake.load_balancers();
        assert_eq!(lbs.len(), 1);
        assert!(!lbs[0].labels.contains_key(&cluster_tag_key("c1")));
    }

    #[tokio::test]
    async fn test_delete_created_load_balancer_after_rename() {
        let fake = FakeHCloud::new();
        let mut cluster = cluster();
        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();

        cluster.spec.control_plane_load_balancer.name = Some("pinned".to_string());
        reconcile_load_balancer(&mut cluster, &fake).await.unwrap();
        assert_eq!(fake.load_balancers()[0].name, "pinned");

        delete_load_balancer(&cluster, &fake).await.unwrap();
        assert!(fake.load_balancers().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unmarked_load_balancer_with_generated_name() {
        let fake = FakeHCloud::new();
        let cluster = cluster();
        fake.insert_load_balancer(remote_lb(
            &generated_load_balancer_name(&cluster),
            owned_labels("c1"),
        ));

        delete_load_balancer(&cluster, &fake).await.unwrap();
        assert!(fake.load_balancers().is_empty());
    }
}

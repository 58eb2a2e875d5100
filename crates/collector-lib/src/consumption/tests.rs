//! Consumption parser tests against fixed cluster fixtures
//!
//! Fixtures mirror what the snapshot source produces for real clusters:
//! node labels are upper-cased by some providers, NFS claims carry the
//! NFS volume label, and services come in mixed types.

mod parse_tests {
    use crate::catalog::tests::test_catalog;
    use crate::consumption::{parse, Compute, Networking, ProvisionedVolumes, VmType};
    use crate::error::ConsumptionError;
    use crate::models::{
        ClaimPhase, NodeDescriptor, Provider, PvcDescriptor, RedisDescriptor, RedisInstances,
        ResourceSnapshot, ServiceDescriptor, ServiceType,
    };
    use crate::quantity::Quantity;

    fn nodes(instance_type: &str, count: usize) -> Vec<NodeDescriptor> {
        (0..count)
            .map(|i| NodeDescriptor::from_instance_type(format!("node-{}", i), instance_type))
            .collect()
    }

    fn pvc(name: &str, capacity: &str) -> PvcDescriptor {
        PvcDescriptor {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: ClaimPhase::Bound,
            capacity: Quantity::from(capacity),
            nfs: false,
        }
    }

    fn nfs_pvc() -> Vec<PvcDescriptor> {
        vec![PvcDescriptor {
            nfs: true,
            ..pvc("nfs-share", "20Gi")
        }]
    }

    fn three_pvcs() -> Vec<PvcDescriptor> {
        vec![pvc("pvc-5", "5Gi"), pvc("pvc-10", "10Gi"), pvc("pvc-20", "20Gi")]
    }

    fn two_svcs_of_different_types() -> Vec<ServiceDescriptor> {
        vec![
            ServiceDescriptor {
                name: "internal".to_string(),
                namespace: "default".to_string(),
                service_type: ServiceType::ClusterIp,
            },
            ServiceDescriptor {
                name: "ingress".to_string(),
                namespace: "istio-system".to_string(),
                service_type: ServiceType::LoadBalancer,
            },
        ]
    }

    fn snapshot(provider: Provider, nodes: Vec<NodeDescriptor>) -> ResourceSnapshot {
        ResourceSnapshot {
            nodes,
            ..ResourceSnapshot::new(provider)
        }
    }

    fn d8_v3(count: u64) -> Vec<VmType> {
        vec![VmType {
            name: "standard_d8_v3".to_string(),
            count,
        }]
    }

    #[test]
    fn test_azure_with_nfs_pvc_and_two_services() {
        let input = ResourceSnapshot {
            pvcs: nfs_pvc(),
            services: two_svcs_of_different_types(),
            ..snapshot(Provider::Azure, nodes("Standard_D8_v3", 2))
        };

        let record = parse(&input, &test_catalog()).unwrap();

        assert_eq!(
            record.compute,
            Compute {
                vm_types: d8_v3(2),
                provisioned_cpus: 16,
                provisioned_ram_gb: 64,
                provisioned_volumes: ProvisionedVolumes {
                    size_gb_total: 60,
                    count: 1,
                    size_gb_rounded: 64,
                },
            }
        );
        assert_eq!(
            record.networking,
            Networking {
                provisioned_cluster_ips: 1,
                provisioned_load_balancers: 1,
                ..Networking::default()
            }
        );
    }

    #[test]
    fn test_azure_with_three_pvcs() {
        let input = ResourceSnapshot {
            pvcs: three_pvcs(),
            services: two_svcs_of_different_types(),
            ..snapshot(Provider::Azure, nodes("Standard_D8_v3", 2))
        };

        let record = parse(&input, &test_catalog()).unwrap();

        assert_eq!(record.compute.vm_types, d8_v3(2));
        assert_eq!(record.compute.provisioned_cpus, 16);
        assert_eq!(record.compute.provisioned_ram_gb, 64);
        assert_eq!(
            record.compute.provisioned_volumes,
            ProvisionedVolumes {
                size_gb_total: 35,
                count: 3,
                size_gb_rounded: 96,
            }
        );
    }

    #[test]
    fn test_azure_nodes_only() {
        let input = snapshot(Provider::Azure, nodes("standard_d8_v3", 3));

        let record = parse(&input, &test_catalog()).unwrap();

        assert_eq!(record.compute.vm_types, d8_v3(3));
        assert_eq!(record.compute.provisioned_cpus, 24);
        assert_eq!(record.compute.provisioned_ram_gb, 96);
        assert_eq!(record.compute.provisioned_volumes, ProvisionedVolumes::default());
        assert_eq!(record.networking, Networking::default());
    }

    #[test]
    fn test_azure_with_redis_instances() {
        let input = ResourceSnapshot {
            redis: Some(RedisInstances {
                azure: vec![
                    RedisDescriptor {
                        name: "cache-a".to_string(),
                        capacity: Quantity::from("6Gi"),
                    },
                    RedisDescriptor {
                        name: "cache-b".to_string(),
                        capacity: Quantity::from("13Gi"),
                    },
                ],
                ..RedisInstances::default()
            }),
            ..snapshot(Provider::Azure, nodes("standard_d8_v3", 3))
        };

        let record = parse(&input, &test_catalog()).unwrap();

        assert_eq!(
            record.compute.provisioned_volumes,
            ProvisionedVolumes {
                size_gb_total: 19,
                count: 2,
                size_gb_rounded: 64,
            }
        );
    }

    #[test]
    fn test_pvcs_and_redis_are_counted_together() {
        let input = ResourceSnapshot {
            pvcs: three_pvcs(),
            redis: Some(RedisInstances {
                gcp: vec![RedisDescriptor {
                    name: "memorystore".to_string(),
                    capacity: Quantity::from("40Gi"),
                }],
                ..RedisInstances::default()
            }),
            ..snapshot(Provider::Gcp, nodes("n2-standard-8", 1))
        };

        let volumes = parse(&input, &test_catalog()).unwrap().compute.provisioned_volumes;

        assert_eq!(volumes.count, 4);
        assert_eq!(volumes.size_gb_total, 75);
        assert_eq!(volumes.size_gb_rounded, 96 + 64);
    }

    #[test]
    fn test_converged_cloud_with_three_pvcs() {
        let input = ResourceSnapshot {
            pvcs: three_pvcs(),
            services: two_svcs_of_different_types(),
            ..snapshot(Provider::Ccee, nodes("g_c12_m48", 2))
        };

        let record = parse(&input, &test_catalog()).unwrap();

        assert_eq!(
            record.compute.vm_types,
            vec![VmType {
                name: "g_c12_m48".to_string(),
                count: 2
            }]
        );
        assert_eq!(record.compute.provisioned_cpus, 24);
        assert_eq!(record.compute.provisioned_ram_gb, 96);
        assert_eq!(record.compute.provisioned_volumes.size_gb_total, 35);
        assert_eq!(record.compute.provisioned_volumes.size_gb_rounded, 96);
    }

    #[test]
    fn test_vm_types_are_grouped_in_first_seen_order() {
        let mut mixed = nodes("standard_d4_v3", 1);
        mixed.extend(nodes("standard_d8_v3", 2));
        mixed.extend(nodes("standard_d4_v3", 1));

        let record = parse(&snapshot(Provider::Azure, mixed), &test_catalog()).unwrap();

        assert_eq!(
            record.compute.vm_types,
            vec![
                VmType {
                    name: "standard_d4_v3".to_string(),
                    count: 2
                },
                VmType {
                    name: "standard_d8_v3".to_string(),
                    count: 2
                },
            ]
        );
        assert_eq!(record.compute.node_count(), 4);
        assert_eq!(record.compute.provisioned_cpus, 4 + 8 + 8 + 4);
        assert_eq!(record.compute.provisioned_ram_gb, 16 + 32 + 32 + 16);
    }

    #[test]
    fn test_unknown_vm_type_fails_the_whole_computation() {
        let mut input_nodes = nodes("standard_d8_v3", 2);
        input_nodes.extend(nodes("foo", 3));

        let result = parse(&snapshot(Provider::Azure, input_nodes), &test_catalog());

        assert_eq!(
            result,
            Err(ConsumptionError::VmTypeResolution {
                provider: Provider::Azure,
                vm_type: "foo".to_string(),
            })
        );
    }

    #[test]
    fn test_vm_type_of_another_provider_is_unknown() {
        let result = parse(&snapshot(Provider::Aws, nodes("standard_d8_v3", 1)), &test_catalog());
        assert!(matches!(result, Err(ConsumptionError::VmTypeResolution { .. })));
    }

    #[test]
    fn test_malformed_quantity_is_an_error() {
        let input = ResourceSnapshot {
            pvcs: vec![pvc("ok", "5Gi"), pvc("broken", "5 gigs")],
            ..snapshot(Provider::Azure, nodes("standard_d8_v3", 1))
        };

        let result = parse(&input, &test_catalog());
        assert!(matches!(result, Err(ConsumptionError::QuantityParse(_))));
    }

    #[test]
    fn test_only_bound_pvcs_are_accounted() {
        let mut pvcs = three_pvcs();
        pvcs[0].phase = ClaimPhase::Pending;
        pvcs[1].phase = ClaimPhase::Lost;
        let input = ResourceSnapshot {
            pvcs,
            ..snapshot(Provider::Azure, Vec::new())
        };

        let volumes = parse(&input, &test_catalog()).unwrap().compute.provisioned_volumes;

        assert_eq!(volumes.count, 1);
        assert_eq!(volumes.size_gb_total, 20);
        assert_eq!(volumes.size_gb_rounded, 32);
    }

    #[test]
    fn test_sub_gibibyte_volume_counts_but_adds_nothing() {
        let input = ResourceSnapshot {
            pvcs: vec![pvc("tiny", "10Mi")],
            ..snapshot(Provider::Azure, Vec::new())
        };

        let volumes = parse(&input, &test_catalog()).unwrap().compute.provisioned_volumes;

        assert_eq!(volumes.count, 1);
        assert_eq!(volumes.size_gb_total, 0);
        assert_eq!(volumes.size_gb_rounded, 0);
    }

    #[test]
    fn test_parse_is_repeatable() {
        let input = ResourceSnapshot {
            pvcs: three_pvcs(),
            services: two_svcs_of_different_types(),
            ..snapshot(Provider::Azure, nodes("standard_d8_v3", 2))
        };
        let catalog = test_catalog();

        let first = parse(&input, &catalog).unwrap();
        let second = parse(&input, &catalog).unwrap();

        assert_eq!(first.compute, second.compute);
        assert_eq!(first.networking, second.networking);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_record_serializes_with_snake_case_fields() {
        let input = ResourceSnapshot {
            pvcs: nfs_pvc(),
            ..snapshot(Provider::Azure, nodes("standard_d8_v3", 2))
        };
        let record = parse(&input, &test_catalog()).unwrap();

        let json = serde_json::to_value(&record).unwrap();

        assert!(json["timestamp"].is_string());
        assert_eq!(json["compute"]["vm_types"][0]["name"], "standard_d8_v3");
        assert_eq!(json["compute"]["provisioned_volumes"]["size_gb_rounded"], 64);
        assert_eq!(json["networking"]["provisioned_load_balancers"], 0);
    }
}

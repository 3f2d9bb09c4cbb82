//! Mutators shared by every object that owns a pod spec
//!
//! Deployments, daemonsets, statefulsets and bare pods all expose pod
//! metadata and a pod spec; `PodWorkload` gives them one set of `with_*`
//! builders so scenarios can write
//! `define_deployment(..).with_host_network(true).with_replicas(2)`.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, HostPathVolumeSource, NodeAffinity, NodeSelector,
    NodeSelectorRequirement, NodeSelectorTerm, Pod, PodAffinityTerm, PodAntiAffinity, PodSpec,
    Probe, Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::container;

/// Annotation Multus reads to attach secondary networks
pub const MULTUS_NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";

/// Kubernetes object carrying a pod template (or being a pod)
pub trait PodWorkload: Sized {
    /// Metadata of the object itself
    fn object_metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Metadata stamped on the pods
    fn pod_metadata_mut(&mut self) -> &mut ObjectMeta;

    fn pod_spec_mut(&mut self) -> &mut PodSpec;

    fn pod_spec(&self) -> Option<&PodSpec>;

    /// Selector that must keep matching the pod labels, if the kind has one
    fn selector_mut(&mut self) -> Option<&mut LabelSelector> {
        None
    }

    /// Apply `f` to every (non-init) container
    fn map_containers(mut self, mut f: impl FnMut(&mut Container)) -> Self {
        self.pod_spec_mut().containers.iter_mut().for_each(&mut f);
        self
    }

    /// Merge labels into the object, the pods and the selector
    fn with_labels(mut self, labels: &BTreeMap<String, String>) -> Self {
        self.object_metadata_mut()
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.clone());
        self.pod_metadata_mut()
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.clone());
        if let Some(selector) = self.selector_mut() {
            selector
                .match_labels
                .get_or_insert_with(BTreeMap::new)
                .extend(labels.clone());
        }
        self
    }

    fn with_pod_annotation(mut self, key: &str, value: &str) -> Self {
        self.pod_metadata_mut()
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Attach Multus networks by NAD name
    fn with_multus_networks(self, nads: &[&str]) -> Self {
        self.with_pod_annotation(MULTUS_NETWORKS_ANNOTATION, &nads.join(","))
    }

    fn with_service_account(mut self, name: &str) -> Self {
        self.pod_spec_mut().service_account_name = Some(name.to_string());
        self
    }

    fn with_automount_service_account_token(mut self, automount: bool) -> Self {
        self.pod_spec_mut().automount_service_account_token = Some(automount);
        self
    }

    fn with_host_network(mut self, enabled: bool) -> Self {
        self.pod_spec_mut().host_network = Some(enabled);
        self
    }

    fn with_host_pid(mut self, enabled: bool) -> Self {
        self.pod_spec_mut().host_pid = Some(enabled);
        self
    }

    fn with_host_ipc(mut self, enabled: bool) -> Self {
        self.pod_spec_mut().host_ipc = Some(enabled);
        self
    }

    fn with_termination_grace_period(mut self, seconds: i64) -> Self {
        self.pod_spec_mut().termination_grace_period_seconds = Some(seconds);
        self
    }

    fn with_node_selector(mut self, selector: &BTreeMap<String, String>) -> Self {
        self.pod_spec_mut().node_selector = Some(selector.clone());
        self
    }

    /// Refuse to co-schedule with pods carrying `labels` on the same node
    fn with_pod_anti_affinity(mut self, labels: &BTreeMap<String, String>) -> Self {
        let affinity = self
            .pod_spec_mut()
            .affinity
            .get_or_insert_with(Affinity::default);
        affinity.pod_anti_affinity = Some(PodAntiAffinity {
            required_during_scheduling_ignored_during_execution: Some(vec![PodAffinityTerm {
                label_selector: Some(LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                }),
                topology_key: "kubernetes.io/hostname".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        self
    }

    /// Require nodes where `key` is one of `values`
    fn with_required_node_affinity(mut self, key: &str, values: &[&str]) -> Self {
        let affinity = self
            .pod_spec_mut()
            .affinity
            .get_or_insert_with(Affinity::default);
        affinity.node_affinity = Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: Some(vec![NodeSelectorRequirement {
                        key: key.to_string(),
                        operator: "In".to_string(),
                        values: Some(values.iter().map(|v| v.to_string()).collect()),
                    }]),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        });
        self
    }

    fn with_tolerations(mut self, tolerations: Vec<Toleration>) -> Self {
        self.pod_spec_mut()
            .tolerations
            .get_or_insert_with(Vec::new)
            .extend(tolerations);
        self
    }

    fn with_runtime_class(mut self, name: &str) -> Self {
        self.pod_spec_mut().runtime_class_name = Some(name.to_string());
        self
    }

    /// Mount a host path into every container
    fn with_host_path_volume(mut self, name: &str, host_path: &str, mount_path: &str) -> Self {
        let spec = self.pod_spec_mut();
        spec.volumes.get_or_insert_with(Vec::new).push(Volume {
            name: name.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: host_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        for c in spec.containers.iter_mut() {
            c.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
                name: name.to_string(),
                mount_path: mount_path.to_string(),
                ..Default::default()
            });
        }
        self
    }

    fn with_extra_container(mut self, container: Container) -> Self {
        self.pod_spec_mut().containers.push(container);
        self
    }

    /// Replace the container list, e.g. to fan out N copies of the test container
    fn with_containers(mut self, containers: Vec<Container>) -> Self {
        self.pod_spec_mut().containers = containers;
        self
    }

    fn with_image(self, image: &str) -> Self {
        self.map_containers(|c| c.image = Some(image.to_string()))
    }

    fn with_image_pull_policy(self, policy: &str) -> Self {
        self.map_containers(|c| c.image_pull_policy = Some(policy.to_string()))
    }

    fn with_termination_message_policy(self, policy: &str) -> Self {
        self.map_containers(|c| c.termination_message_policy = Some(policy.to_string()))
    }

    fn with_privileged_containers(self, privileged: bool) -> Self {
        self.map_containers(|c| container::set_privileged(c, privileged))
    }

    fn with_privilege_escalation(self, allow: bool) -> Self {
        self.map_containers(|c| container::set_allow_privilege_escalation(c, allow))
    }

    fn with_run_as_user(self, uid: i64) -> Self {
        self.map_containers(|c| container::set_run_as_user(c, uid))
    }

    fn with_run_as_non_root(self, non_root: bool) -> Self {
        self.map_containers(|c| container::set_run_as_non_root(c, non_root))
    }

    fn with_read_only_root_filesystem(self, read_only: bool) -> Self {
        self.map_containers(|c| container::set_read_only_root_filesystem(c, read_only))
    }

    fn with_added_capabilities(self, caps: &[&str]) -> Self {
        self.map_containers(|c| container::add_capabilities(c, caps))
    }

    fn with_dropped_capabilities(self, caps: &[&str]) -> Self {
        self.map_containers(|c| container::drop_capabilities(c, caps))
    }

    fn with_host_port(self, port: i32) -> Self {
        self.map_containers(|c| container::set_host_port(c, port))
    }

    fn with_container_ports(self, ports: &[ContainerPort]) -> Self {
        self.map_containers(|c| c.ports = Some(ports.to_vec()))
    }

    fn with_resources(
        self,
        cpu_request: Option<&str>,
        memory_request: Option<&str>,
        cpu_limit: Option<&str>,
        memory_limit: Option<&str>,
    ) -> Self {
        self.map_containers(|c| {
            container::set_resources(c, cpu_request, memory_request, cpu_limit, memory_limit)
        })
    }

    fn with_readiness_probe(self, probe: Probe) -> Self {
        self.map_containers(|c| c.readiness_probe = Some(probe.clone()))
    }

    fn with_liveness_probe(self, probe: Probe) -> Self {
        self.map_containers(|c| c.liveness_probe = Some(probe.clone()))
    }

    fn with_startup_probe(self, probe: Probe) -> Self {
        self.map_containers(|c| c.startup_probe = Some(probe.clone()))
    }

    fn with_pre_stop(self, command: &[&str]) -> Self {
        self.map_containers(|c| container::set_pre_stop(c, command))
    }

    fn with_post_start(self, command: &[&str]) -> Self {
        self.map_containers(|c| container::set_post_start(c, command))
    }
}

/// Workloads with a replica count
pub trait Replicated: Sized {
    fn with_replicas(self, replicas: i32) -> Self;
}

macro_rules! templated_workload {
    ($kind:ty) => {
        impl PodWorkload for $kind {
            fn object_metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn pod_metadata_mut(&mut self) -> &mut ObjectMeta {
                self.spec
                    .get_or_insert_with(Default::default)
                    .template
                    .metadata
                    .get_or_insert_with(Default::default)
            }

            fn pod_spec_mut(&mut self) -> &mut PodSpec {
                self.spec
                    .get_or_insert_with(Default::default)
                    .template
                    .spec
                    .get_or_insert_with(Default::default)
            }

            fn pod_spec(&self) -> Option<&PodSpec> {
                self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
            }

            fn selector_mut(&mut self) -> Option<&mut LabelSelector> {
                Some(&mut self.spec.get_or_insert_with(Default::default).selector)
            }
        }
    };
}

templated_workload!(Deployment);
templated_workload!(DaemonSet);
templated_workload!(StatefulSet);

impl PodWorkload for Pod {
    fn object_metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn pod_metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn pod_spec_mut(&mut self) -> &mut PodSpec {
        self.spec.get_or_insert_with(Default::default)
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref()
    }
}

impl Replicated for Deployment {
    fn with_replicas(mut self, replicas: i32) -> Self {
        self.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
        self
    }
}

impl Replicated for StatefulSet {
    fn with_replicas(mut self, replicas: i32) -> Self {
        self.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
        self
    }
}

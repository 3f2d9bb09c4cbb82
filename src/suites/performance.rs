//! Performance suite

use k8s_openapi::api::apps::v1::Deployment;

use super::{target_labels, TEST_DEPLOYMENT_NAME};
use crate::builders::{container, define_deployment, PodWorkload};

pub const NAMESPACE_PREFIX: &str = "performance-tests";
pub const RT_RUNTIME_CLASS: &str = "performance-rt";

pub const TC_EXCLUSIVE_CPU_POOL: &str = "performance-exclusive-cpu-pool";
pub const TC_RT_APPS_NO_EXEC_PROBES: &str = "performance-rt-apps-no-exec-probes";
pub const TC_SHARED_CPU_POOL_NON_RT: &str =
    "performance-shared-cpu-pool-non-rt-scheduling-policy";
pub const TC_EXCLUSIVE_CPU_POOL_RT: &str = "performance-exclusive-cpu-pool-rt-scheduling-policy";
pub const TC_ISOLATED_CPU_POOL_RT: &str = "performance-isolated-cpu-pool-rt-scheduling-policy";
pub const TC_MAX_RESOURCES_EXEC_PROBES: &str = "performance-max-resources-exec-probes";
pub const TC_CPU_PINNING_NO_EXEC_PROBES: &str = "performance-cpu-pinning-no-exec-probes";

/// Guaranteed-QoS deployment with whole CPUs, landing in the exclusive pool
pub fn define_exclusive_cpu_deployment(namespace: &str, image: &str, cpus: u32) -> Deployment {
    let cpus = cpus.to_string();
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels()).with_resources(
        Some(&cpus),
        Some("512Mi"),
        Some(&cpus),
        Some("512Mi"),
    )
}

/// Burstable deployment running in the shared pool
pub fn define_shared_cpu_deployment(namespace: &str, image: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels()).with_resources(
        Some("100m"),
        Some("128Mi"),
        None,
        None,
    )
}

/// Main process switched to a scheduling policy via `chrt`, e.g. "-f 10" for SCHED_FIFO
pub fn with_scheduling_policy(deployment: Deployment, chrt_args: &str) -> Deployment {
    let script = format!("chrt {} -p $$ && sleep infinity", chrt_args);
    deployment.map_containers(|c| {
        c.command = Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            script.clone(),
        ])
    })
}

/// Exclusive-CPU deployment that also declares an exec liveness probe
pub fn define_exec_probe_deployment(namespace: &str, image: &str, cpus: u32) -> Deployment {
    define_exclusive_cpu_deployment(namespace, image, cpus)
        .with_runtime_class(RT_RUNTIME_CLASS)
        .with_liveness_probe(container::exec_probe(&["ls"], 5, 5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    #[test]
    fn test_exclusive_cpu_is_guaranteed() {
        let d = define_exclusive_cpu_deployment("ns", "img", 2);
        let resources = d.spec.unwrap().template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        assert_eq!(resources.requests, resources.limits);
        assert_eq!(
            resources.limits.unwrap().get("cpu"),
            Some(&Quantity("2".to_string()))
        );
    }

    #[test]
    fn test_shared_cpu_has_no_limits() {
        let d = define_shared_cpu_deployment("ns", "img");
        let resources = d.spec.unwrap().template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        assert!(resources.limits.is_none());
    }

    #[test]
    fn test_scheduling_policy_command() {
        let d = with_scheduling_policy(define_shared_cpu_deployment("ns", "img"), "-f 10");
        let command = d.spec.unwrap().template.spec.unwrap().containers[0]
            .command
            .clone()
            .unwrap();
        assert!(command[2].starts_with("chrt -f 10"));
    }

    #[test]
    fn test_exec_probe_deployment() {
        let d = define_exec_probe_deployment("ns", "img", 1);
        let spec = d.spec.unwrap().template.spec.unwrap();
        assert_eq!(spec.runtime_class_name.as_deref(), Some(RT_RUNTIME_CLASS));
        assert!(spec.containers[0].liveness_probe.is_some());
    }
}

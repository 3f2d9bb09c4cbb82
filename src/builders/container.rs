//! Container and probe builders
//!
//! Shared by every pod-owning workload builder.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Capabilities, Container, ContainerPort, ExecAction, HTTPGetAction, Lifecycle,
    LifecycleHandler, Probe, ResourceRequirements, SecurityContext, TCPSocketAction,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Name given to the single container the define_* builders create
pub const DEFAULT_CONTAINER_NAME: &str = "test";

/// Create a container running `image`; an empty command keeps the image entrypoint
pub fn define_container(name: &str, image: &str, command: &[&str]) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: if command.is_empty() {
            None
        } else {
            Some(command.iter().map(|c| c.to_string()).collect())
        },
        ..Default::default()
    }
}

/// Probe that runs a command inside the container
pub fn exec_probe(command: &[&str], initial_delay_seconds: i32, period_seconds: i32) -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(command.iter().map(|c| c.to_string()).collect()),
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        period_seconds: Some(period_seconds),
        ..Default::default()
    }
}

pub fn http_probe(path: &str, port: i32, initial_delay_seconds: i32, period_seconds: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        period_seconds: Some(period_seconds),
        ..Default::default()
    }
}

pub fn tcp_probe(port: i32, initial_delay_seconds: i32, period_seconds: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        period_seconds: Some(period_seconds),
        ..Default::default()
    }
}

/// Lifecycle hook handler running a command
pub fn exec_handler(command: &[&str]) -> LifecycleHandler {
    LifecycleHandler {
        exec: Some(ExecAction {
            command: Some(command.iter().map(|c| c.to_string()).collect()),
        }),
        ..Default::default()
    }
}

pub fn container_port(name: Option<&str>, port: i32, protocol: &str) -> ContainerPort {
    ContainerPort {
        name: name.map(str::to_string),
        container_port: port,
        protocol: Some(protocol.to_string()),
        ..Default::default()
    }
}

fn security_context(container: &mut Container) -> &mut SecurityContext {
    container.security_context.get_or_insert_with(Default::default)
}

fn capabilities(container: &mut Container) -> &mut Capabilities {
    security_context(container)
        .capabilities
        .get_or_insert_with(Default::default)
}

pub fn set_privileged(container: &mut Container, privileged: bool) {
    security_context(container).privileged = Some(privileged);
}

pub fn set_allow_privilege_escalation(container: &mut Container, allow: bool) {
    security_context(container).allow_privilege_escalation = Some(allow);
}

pub fn set_run_as_user(container: &mut Container, uid: i64) {
    security_context(container).run_as_user = Some(uid);
}

pub fn set_run_as_non_root(container: &mut Container, non_root: bool) {
    security_context(container).run_as_non_root = Some(non_root);
}

pub fn set_read_only_root_filesystem(container: &mut Container, read_only: bool) {
    security_context(container).read_only_root_filesystem = Some(read_only);
}

/// Add capabilities, skipping ones already present
pub fn add_capabilities(container: &mut Container, caps: &[&str]) {
    let add = capabilities(container).add.get_or_insert_with(Vec::new);
    for cap in caps {
        if !add.iter().any(|c| c == cap) {
            add.push(cap.to_string());
        }
    }
}

pub fn drop_capabilities(container: &mut Container, caps: &[&str]) {
    let drop = capabilities(container).drop.get_or_insert_with(Vec::new);
    for cap in caps {
        if !drop.iter().any(|c| c == cap) {
            drop.push(cap.to_string());
        }
    }
}

/// Set cpu/memory requests and limits; `None` leaves that entry untouched
pub fn set_resources(
    container: &mut Container,
    cpu_request: Option<&str>,
    memory_request: Option<&str>,
    cpu_limit: Option<&str>,
    memory_limit: Option<&str>,
) {
    let resources: &mut ResourceRequirements =
        container.resources.get_or_insert_with(Default::default);

    fn put(map: &mut Option<BTreeMap<String, Quantity>>, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            map.get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), Quantity(value.to_string()));
        }
    }

    put(&mut resources.requests, "cpu", cpu_request);
    put(&mut resources.requests, "memory", memory_request);
    put(&mut resources.limits, "cpu", cpu_limit);
    put(&mut resources.limits, "memory", memory_limit);
}

pub fn set_pre_stop(container: &mut Container, command: &[&str]) {
    container
        .lifecycle
        .get_or_insert_with(Lifecycle::default)
        .pre_stop = Some(exec_handler(command));
}

pub fn set_post_start(container: &mut Container, command: &[&str]) {
    container
        .lifecycle
        .get_or_insert_with(Lifecycle::default)
        .post_start = Some(exec_handler(command));
}

/// Declare a container port that is also bound on the host
pub fn set_host_port(container: &mut Container, port: i32) {
    let ports = container.ports.get_or_insert_with(Vec::new);
    ports.push(ContainerPort {
        container_port: port,
        host_port: Some(port),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    });
}

/* -------------------------------------------------------------------------- *\
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 * -------------------------------------------------------------------------- *
 * Copyright 2022 - 2024, the aurae contributors                              *
 * SPDX-License-Identifier: Apache-2.0                                        *
\* -------------------------------------------------------------------------- */

//! Translation of a pod container into an isolation container
//! configuration.

use super::environment::merge_environment;
use super::error::{PodsError, Result};
use super::pod_spec::Container;
use super::quantity;
use super::resources::{CpuCount, MemoryMb};
use crate::images::{ContainerDefaults, ImageConfig};
use crate::isolation::{IsolationContainerConfig, PortBinding};
use std::collections::{BTreeMap, BTreeSet};

/// Creation request for one container, before image defaults and resource
/// normalization are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateConfig {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub volumes: BTreeSet<String>,
    pub stop_signal: String,
    pub tty: bool,
    pub open_stdin: bool,
    pub stdin_once: bool,
    pub cpu_count: i64,
    pub cpuset: String,
    pub memory_bytes: i64,
    pub port_bindings: BTreeMap<String, PortBinding>,
}

impl CreateConfig {
    /// Kubernetes `command` becomes the entrypoint and `args` the cmd.
    pub fn from_container(container: &Container) -> Result<Self> {
        if container.name.is_empty() {
            return Err(PodsError::MissingField { field: "name" });
        }
        if container.image.is_empty() {
            return Err(PodsError::MissingField { field: "image" });
        }

        let limits = &container.resources.limits;
        let limit = |resource: &str| limits.get(resource).map(String::as_str);
        let invalid = |resource: &str, value: &str| PodsError::InvalidQuantity {
            resource: resource.to_string(),
            value: value.to_string(),
        };

        let cpu_count = match limit("cpu") {
            Some(value) => quantity::cpu_cores(value)
                .ok_or_else(|| invalid("cpu", value))?,
            None => 0,
        };
        let memory_bytes = match limit("memory") {
            Some(value) => {
                quantity::bytes(value).ok_or_else(|| invalid("memory", value))?
            }
            None => 0,
        };

        let mut port_bindings = BTreeMap::new();
        for port in &container.ports {
            if port.host_port == 0 {
                continue;
            }

            let host_port = u16::try_from(port.host_port).map_err(|_| {
                PodsError::InvalidPort {
                    container_port: port.container_port,
                    port: port.host_port,
                }
            })?;
            if !(1..=65535).contains(&port.container_port) {
                return Err(PodsError::InvalidPort {
                    container_port: port.container_port,
                    port: port.container_port,
                });
            }

            let protocol = match port.protocol.to_lowercase() {
                protocol if protocol.is_empty() => "tcp".to_string(),
                protocol => protocol,
            };
            let _ = port_bindings.insert(
                format!("{}/{protocol}", port.container_port),
                PortBinding { host_ip: port.host_ip.clone(), host_port },
            );
        }

        Ok(Self {
            name: container.name.clone(),
            image: container.image.clone(),
            cmd: container.args.clone(),
            entrypoint: container.command.clone(),
            env: container
                .env
                .iter()
                .map(|var| format!("{}={}", var.name, var.value))
                .collect(),
            working_dir: container.working_dir.clone(),
            tty: container.tty,
            open_stdin: container.stdin,
            stdin_once: container.stdin_once,
            cpu_count,
            memory_bytes,
            port_bindings,
            ..Default::default()
        })
    }

    /// Fills what the user left unset from the image. User values are never
    /// replaced, and the image cmd is only taken when the user gave neither
    /// cmd nor entrypoint.
    pub fn apply_image_defaults(&mut self, image: &ContainerDefaults) {
        if self.cmd.is_empty() && self.entrypoint.is_empty() {
            self.cmd = image.cmd.clone();
        }
        if self.entrypoint.is_empty() {
            self.entrypoint = image.entrypoint.clone();
        }
        if self.working_dir.is_empty() {
            self.working_dir = image.working_dir.clone();
        }
        if self.user.is_empty() {
            self.user = image.user.clone();
        }
        if self.stop_signal.is_empty() {
            self.stop_signal = image.stop_signal.clone();
        }
        self.volumes.extend(image.volumes.iter().cloned());
        self.env = merge_environment(self.tty, &self.env, &image.env);
    }

    /// Produces the isolation configuration for `image` with normalized
    /// resources. The container id is assigned by the port layer later.
    pub fn into_isolation_config(
        self,
        image: &ImageConfig,
        namespace: &str,
    ) -> Result<IsolationContainerConfig> {
        let cpus = CpuCount::normalize(self.cpu_count, &self.cpuset)?;
        let memory = MemoryMb::from_bytes(self.memory_bytes);

        Ok(IsolationContainerConfig {
            id: String::new(),
            image_id: image.image_id.clone(),
            layer_id: image.layer_id.clone(),
            image_name: image.name.clone(),
            name: self.name,
            namespace: namespace.to_string(),
            cmd: self.cmd,
            entrypoint: self.entrypoint,
            env: self.env,
            working_dir: self.working_dir,
            user: self.user,
            stop_signal: self.stop_signal,
            attach: true,
            stdin_once: self.stdin_once,
            open_stdin: self.open_stdin,
            tty: self.tty,
            cpu_count: cpus.into_inner(),
            memory_mb: memory.into_inner(),
            port_map: self.port_bindings,
        })
    }
}

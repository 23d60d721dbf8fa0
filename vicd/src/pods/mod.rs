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

//! Pods: translation of Kubernetes containers and creation of their
//! container VMs.

pub use self::create_config::CreateConfig;
pub use self::environment::{merge_environment, DEFAULT_ENV_PATH};
pub use self::error::PodsError;
pub use self::pod_proxy::{ContainerOutcome, PodCreation, PodProxy, RUNNING};
pub use self::pod_spec::{
    Container, ContainerPort, EnvVar, ObjectMeta, Pod, PodSpec,
    ResourceRequirements,
};
pub use self::resources::{CpuCount, MemoryMb};

mod create_config;
mod environment;
mod error;
mod pod_proxy;
mod pod_spec;
mod quantity;
mod resources;

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

use crate::images::ImagesError;
use crate::isolation::{ErrorKind, IsolationError};
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, PodsError>;

#[derive(Debug, Error)]
pub enum PodsError {
    #[error("invalid quantity '{value}' for {resource}")]
    InvalidQuantity { resource: String, value: String },
    #[error("invalid cpu set '{cpuset}': {reason}")]
    InvalidCpuSet { cpuset: String, reason: String },
    #[error("container is missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("invalid port {port} for container port {container_port}")]
    InvalidPort { container_port: i32, port: i32 },
    #[error("pod '{pod}' has no containers")]
    EmptyPod { pod: String },
    #[error("image for container '{container}': {source}")]
    Image {
        container: String,
        #[source]
        source: ImagesError,
    },
    #[error("container '{container}': {source}")]
    Isolation {
        container: String,
        #[source]
        source: IsolationError,
    },
    #[error("pod '{pod}' failed to create containers: {}", .failed.join(", "))]
    ContainersFailed { pod: String, failed: Vec<String> },
}

impl PodsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PodsError::InvalidQuantity { .. }
            | PodsError::InvalidCpuSet { .. }
            | PodsError::MissingField { .. }
            | PodsError::InvalidPort { .. }
            | PodsError::EmptyPod { .. } => ErrorKind::Configuration,
            PodsError::Image { source: ImagesError::NotFound { .. }, .. } => {
                ErrorKind::NotFound
            }
            PodsError::Image { .. } | PodsError::ContainersFailed { .. } => {
                ErrorKind::Internal
            }
            PodsError::Isolation { source, .. } => source.kind(),
        }
    }
}

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

//! Request and response payloads exchanged with the port layer.
//!
//! Field names follow the port layer's JSON schema, hence the explicit
//! renames where its casing is irregular (`deltaID`, `memoryMB`, ...).

use serde::{Deserialize, Serialize};

/// Body of `POST /containers`, allocating an empty container shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCreateConfig {
    pub num_cpus: i64,
    #[serde(rename = "memoryMB")]
    pub memory_mb: i64,
    /// Layer (disk) the container is created from.
    pub layer: String,
    pub image: String,
    pub repo_name: String,
    pub name: String,
    pub image_store: ImageStore,
    pub network_disabled: bool,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStore {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCreatedInfo {
    pub id: String,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageJoinConfig {
    pub handle: String,
    #[serde(rename = "deltaID")]
    pub delta_id: String,
    #[serde(rename = "imageID")]
    pub image_id: String,
    pub repo_name: String,
}

/// Reply of the join family of calls (image, task join/bind, logging,
/// interaction).
///
/// The port layer declares `handle` as an untyped value. It is kept as raw
/// JSON here so the caller decides what a malformed handle means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinResponse {
    #[serde(default)]
    pub handle: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJoinConfig {
    pub handle: String,
    pub id: String,
    /// Filesystem namespace the task runs in.
    pub namespace: String,
    pub path: String,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub attach: bool,
    pub open_stdin: bool,
    pub tty: bool,
    pub stop_signal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBindConfig {
    pub handle: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network_name: String,
    /// Published ports as `hostPort:containerPort[/proto]`.
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesAddContainerConfig {
    pub handle: String,
    pub network_config: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingJoinConfig {
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionJoinConfig {
    pub handle: String,
}

/// Error body returned alongside non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

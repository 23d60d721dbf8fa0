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

use crate::models::{
    ContainerCreateConfig, ContainerCreatedInfo, ImageJoinConfig,
    InteractionJoinConfig, JoinResponse, LoggingJoinConfig,
    ScopesAddContainerConfig, TaskBindConfig, TaskJoinConfig,
};
use crate::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Wire contract of the port layer.
///
/// Every call except [PortLayer::create_container] and
/// [PortLayer::get_container] takes the current handle and answers with the
/// next one. Errors are already decoded into [crate::ClientError] variants.
#[async_trait]
pub trait PortLayer: Debug + Send + Sync {
    /// Allocates a container shell and returns its id and first handle.
    async fn create_container(
        &self,
        config: ContainerCreateConfig,
    ) -> Result<ContainerCreatedInfo>;

    /// Returns a fresh handle for an existing container.
    async fn get_container(&self, id: &str) -> Result<String>;

    async fn join_image(
        &self,
        store_name: &str,
        layer_id: &str,
        config: ImageJoinConfig,
    ) -> Result<JoinResponse>;

    async fn join_task(&self, config: TaskJoinConfig) -> Result<JoinResponse>;

    async fn bind_task(&self, config: TaskBindConfig) -> Result<JoinResponse>;

    async fn join_scope(
        &self,
        scope: &str,
        config: ScopesAddContainerConfig,
    ) -> Result<String>;

    async fn remove_from_scope(
        &self,
        scope: &str,
        handle: &str,
    ) -> Result<String>;

    async fn join_logging(
        &self,
        config: LoggingJoinConfig,
    ) -> Result<JoinResponse>;

    async fn join_interaction(
        &self,
        config: InteractionJoinConfig,
    ) -> Result<JoinResponse>;

    /// Commits the handle. `wait_time` is in seconds.
    async fn commit(&self, handle: &str, wait_time: Option<i32>) -> Result<()>;

    async fn change_state(&self, handle: &str, state: &str) -> Result<String>;
}

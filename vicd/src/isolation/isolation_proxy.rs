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

use super::error::{IsolationError, Result};
use super::task::{network_config, resolve_command, task_join_config};
use super::{ContainerId, Handle, IsolationContainerConfig};
use crate::config::BootstrapConfig;
use crate::host::HostIdentity;
use crate::operation::{Interrupted, Operation};
use client::models::{
    ContainerCreateConfig, ImageJoinConfig, ImageStore, InteractionJoinConfig,
    JoinResponse, LoggingJoinConfig, ScopesAddContainerConfig, TaskBindConfig,
};
use client::{ClientError, PortLayer};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for removing a container from a scope after a failed join.
/// The removal runs even when the operation itself has been cancelled.
const SCOPE_ROLLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds containers on the port layer by threading a [Handle] through a
/// fixed sequence of calls and committing it.
///
/// Every step consumes the handle it is given. Only the scope step undoes
/// its remote effect on failure; a failed step leaves the uncommitted
/// definition to the port layer.
#[derive(Debug, Clone)]
pub struct IsolationProxy {
    client: Arc<dyn PortLayer>,
    host: HostIdentity,
    bootstrap: BootstrapConfig,
}

impl IsolationProxy {
    pub fn new(
        client: Arc<dyn PortLayer>,
        host: HostIdentity,
        bootstrap: BootstrapConfig,
    ) -> Self {
        Self { client, host, bootstrap }
    }

    /// Allocates a container skeleton from the bootstrap image with the
    /// bootstrap resources.
    pub async fn create_handle(
        &self,
        op: &Operation,
    ) -> Result<(ContainerId, Handle)> {
        self.create_handle_sized(
            op,
            self.bootstrap.cpus,
            self.bootstrap.memory_mb,
        )
        .await
    }

    /// Allocates a container skeleton from the bootstrap image.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn create_handle_sized(
        &self,
        op: &Operation,
        cpus: i64,
        memory_mb: i64,
    ) -> Result<(ContainerId, Handle)> {
        let host = self.host.uuid()?;

        let config = ContainerCreateConfig {
            num_cpus: cpus,
            memory_mb,
            layer: self.bootstrap.layer.clone(),
            image: self.bootstrap.image.clone(),
            repo_name: self.bootstrap.repo_name.clone(),
            name: String::new(),
            image_store: ImageStore { name: host },
            network_disabled: true,
            hostname: self.bootstrap.hostname.clone(),
        };
        debug!("container skeleton: {config:?}");

        let created = self
            .guarded(
                op,
                "create container",
                self.client.create_container(config),
            )
            .await?
            .map_err(|e| {
                IsolationError::remote_or_not_found(
                    "create container",
                    "image",
                    &self.bootstrap.image,
                    e,
                )
            })?;

        Ok((ContainerId::new(created.id), Handle::new(created.handle)))
    }

    /// Joins an image layer into the container. The store is the one named
    /// after this host.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn add_image_to_handle(
        &self,
        op: &Operation,
        handle: Handle,
        delta_id: &str,
        layer_id: &str,
        image_id: &str,
        image_name: &str,
    ) -> Result<Handle> {
        const OPERATION: &str = "join image";
        let host = self.host.uuid()?;

        let config = ImageJoinConfig {
            handle: handle.into_inner(),
            delta_id: delta_id.to_string(),
            image_id: image_id.to_string(),
            repo_name: image_name.to_string(),
        };

        let response = self
            .guarded(
                op,
                OPERATION,
                self.client.join_image(&host, layer_id, config),
            )
            .await?
            .map_err(|e| IsolationError::remote(OPERATION, e))?;

        joined_handle(OPERATION, response)
    }

    /// Joins the primary task, then binds it.
    #[tracing::instrument(skip(self, op, config), fields(op = %op.id()))]
    pub async fn create_handle_task(
        &self,
        op: &Operation,
        handle: Handle,
        id: &str,
        layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> Result<Handle> {
        let task = task_join_config(handle, id, layer_id, config)?;
        debug!(path = %task.path, args = ?task.args, "primary task");

        let response = self
            .guarded(op, "join task", self.client.join_task(task))
            .await?
            .map_err(|e| IsolationError::remote("join task", e))?;
        let handle = joined_handle("join task", response)?;

        let bind =
            TaskBindConfig { handle: handle.into_inner(), id: id.to_string() };
        let response = self
            .guarded(op, "bind task", self.client.bind_task(bind))
            .await?
            .map_err(|e| IsolationError::remote("bind task", e))?;

        joined_handle("bind task", response)
    }

    /// Adds the container to the default network scope when it publishes
    /// ports. Without ports the handle is returned as is.
    ///
    /// A failed join is followed by exactly one removal from the scope. The
    /// join error is returned whether or not the removal succeeds.
    #[tracing::instrument(skip(self, op, config), fields(op = %op.id()))]
    pub async fn add_handle_to_scope(
        &self,
        op: &Operation,
        handle: Handle,
        config: &IsolationContainerConfig,
    ) -> Result<Handle> {
        const OPERATION: &str = "join scope";

        let Some(network) = network_config(&self.bootstrap.network, config)
        else {
            return Ok(handle);
        };

        // Nothing was sent yet, so there is nothing to roll back.
        if op.is_cancelled() {
            return Err(IsolationError::Interrupted {
                operation: OPERATION,
                reason: Interrupted::Cancelled,
            });
        }

        let scope = network.network_name.clone();
        let request = ScopesAddContainerConfig {
            handle: handle.as_str().to_string(),
            network_config: network,
        };

        let joined = match self
            .guarded(op, OPERATION, self.client.join_scope(&scope, request))
            .await
        {
            Ok(Ok(joined)) => Ok(joined),
            Ok(Err(e)) => Err(IsolationError::remote(OPERATION, e)),
            Err(e) => Err(e),
        };

        match joined {
            Ok(joined) => Ok(Handle::new(joined)),
            Err(e) => {
                warn!("failed to add {handle} to scope {scope}: {e}");
                self.remove_from_scope(&scope, handle).await;
                Err(e)
            }
        }
    }

    async fn remove_from_scope(&self, scope: &str, handle: Handle) {
        let removal = tokio::time::timeout(
            SCOPE_ROLLBACK_TIMEOUT,
            self.client.remove_from_scope(scope, handle.as_str()),
        )
        .await;

        match removal {
            Ok(Ok(_)) => debug!("removed {handle} from scope {scope}"),
            Ok(Err(e)) => {
                warn!("could not roll back scope join of {handle}: {e}")
            }
            Err(_) => warn!(
                "could not roll back scope join of {handle}: timed out after {:?}",
                SCOPE_ROLLBACK_TIMEOUT
            ),
        }
    }

    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn add_logging_to_handle(
        &self,
        op: &Operation,
        handle: Handle,
    ) -> Result<Handle> {
        const OPERATION: &str = "join logging";
        let config = LoggingJoinConfig { handle: handle.into_inner() };

        let response = self
            .guarded(op, OPERATION, self.client.join_logging(config))
            .await?
            .map_err(|e| IsolationError::remote(OPERATION, e))?;

        joined_handle(OPERATION, response)
    }

    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn add_interaction_to_handle(
        &self,
        op: &Operation,
        handle: Handle,
    ) -> Result<Handle> {
        const OPERATION: &str = "join interaction";
        let config = InteractionJoinConfig { handle: handle.into_inner() };

        let response = self
            .guarded(op, OPERATION, self.client.join_interaction(config))
            .await?
            .map_err(|e| IsolationError::remote(OPERATION, e))?;

        joined_handle(OPERATION, response)
    }

    /// Commits the handle. A `wait_time` of zero or less is not sent.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn commit_handle(
        &self,
        op: &Operation,
        handle: Handle,
        container_id: &ContainerId,
        wait_time: i32,
    ) -> Result<()> {
        const OPERATION: &str = "commit";
        let wait_time = (wait_time > 0).then_some(wait_time);

        self.guarded(
            op,
            OPERATION,
            self.client.commit(handle.as_str(), wait_time),
        )
        .await?
        .map_err(|e| match e {
            ClientError::NotFound { .. } => IsolationError::NotFound {
                resource: "container",
                name: container_id.to_string(),
            },
            ClientError::Conflict { message } => {
                IsolationError::Conflict { operation: OPERATION, message }
            }
            e => IsolationError::remote(OPERATION, e),
        })
    }

    /// Returns a fresh handle for the committed container `id`. `name` is
    /// only used to report a missing container.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn handle(
        &self,
        op: &Operation,
        id: &ContainerId,
        name: &str,
    ) -> Result<Handle> {
        const OPERATION: &str = "get container";

        let handle = self
            .guarded(op, OPERATION, self.client.get_container(id))
            .await?
            .map_err(|e| {
                IsolationError::remote_or_not_found(
                    OPERATION,
                    "container",
                    name,
                    e,
                )
            })?;

        Ok(Handle::new(handle))
    }

    /// Records the desired state on the handle. It takes effect on commit.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn set_state(
        &self,
        op: &Operation,
        handle: Handle,
        name: &str,
        state: &str,
    ) -> Result<Handle> {
        const OPERATION: &str = "change state";

        let handle = self
            .guarded(
                op,
                OPERATION,
                self.client.change_state(handle.as_str(), state),
            )
            .await?
            .map_err(|e| match e {
                ClientError::Conflict { message } => {
                    IsolationError::Conflict { operation: OPERATION, message }
                }
                e => IsolationError::remote_or_not_found(
                    OPERATION,
                    "container",
                    name,
                    e,
                ),
            })?;

        Ok(Handle::new(handle))
    }

    /// Runs the whole pipeline for one container and returns its id once
    /// committed.
    ///
    /// The skeleton is sized from `config`. The container id doubles as the
    /// image delta id and as the primary task id.
    pub async fn create_container(
        &self,
        op: &Operation,
        config: &IsolationContainerConfig,
        commit_wait: i32,
    ) -> Result<ContainerId> {
        // Fail before allocating anything remotely.
        let _ = resolve_command(config)?;

        let (id, handle) = self
            .create_handle_sized(op, config.cpu_count, config.memory_mb)
            .await?;
        info!("creating container {} as {id}", config.name);

        let handle = self
            .add_image_to_handle(
                op,
                handle,
                &id,
                &config.layer_id,
                &config.image_id,
                &config.image_name,
            )
            .await?;
        let handle = self
            .create_handle_task(op, handle, &id, &config.layer_id, config)
            .await?;
        let handle = self.add_handle_to_scope(op, handle, config).await?;
        let handle = self.add_logging_to_handle(op, handle).await?;
        let handle = self.add_interaction_to_handle(op, handle).await?;
        self.commit_handle(op, handle, &id, commit_wait).await?;

        info!("committed container {} as {id}", config.name);
        Ok(id)
    }

    async fn guarded<F: Future>(
        &self,
        op: &Operation,
        operation: &'static str,
        fut: F,
    ) -> Result<F::Output> {
        op.guard(fut)
            .await
            .map_err(|reason| IsolationError::Interrupted { operation, reason })
    }
}

/// Extracts the successor handle from a join reply.
fn joined_handle(
    operation: &'static str,
    response: JoinResponse,
) -> Result<Handle> {
    match response.handle {
        serde_json::Value::String(handle) => Ok(Handle::new(handle)),
        payload => Err(IsolationError::MalformedHandle { operation, payload }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_handle_is_accepted() {
        let handle = joined_handle(
            "join logging",
            JoinResponse { handle: json!("h2") },
        )
        .expect("handle");
        assert_eq!(handle.as_str(), "h2");
    }

    #[test]
    fn non_string_handle_is_malformed() {
        for payload in [json!(42), json!(null), json!({"handle": "h2"})] {
            let err = joined_handle(
                "join logging",
                JoinResponse { handle: payload },
            )
            .expect_err("malformed");
            assert!(matches!(err, IsolationError::MalformedHandle { .. }));
        }
    }
}

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

use super::create_config::CreateConfig;
use super::error::{PodsError, Result};
use super::pod_spec::{Container, Pod};
use crate::images::{split_reference, ImageStore};
use crate::isolation::{ContainerId, IsolationProxy};
use crate::operation::Operation;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// State requested from the port layer when a pod is started.
pub const RUNNING: &str = "RUNNING";

/// Creates the containers of a pod through the [IsolationProxy].
#[derive(Debug, Clone)]
pub struct PodProxy {
    isolation: IsolationProxy,
    images: Arc<dyn ImageStore>,
    commit_wait: i32,
}

impl PodProxy {
    /// `commit_wait` is the commit wait bound in seconds, zero or less for
    /// none.
    pub fn new(
        isolation: IsolationProxy,
        images: Arc<dyn ImageStore>,
        commit_wait: i32,
    ) -> Self {
        Self { isolation, images, commit_wait }
    }

    /// Creates every container of `pod`, one after the other.
    ///
    /// A failing container does not stop the others. Each container's
    /// outcome is reported in the returned [PodCreation].
    #[tracing::instrument(skip(self, op, pod), fields(op = %op.id(), pod = %pod.metadata.name))]
    pub async fn create_pod(
        &self,
        op: &Operation,
        pod: &Pod,
    ) -> Result<PodCreation> {
        if pod.spec.containers.is_empty() {
            return Err(PodsError::EmptyPod { pod: pod.metadata.name.clone() });
        }

        let mut containers = Vec::with_capacity(pod.spec.containers.len());
        for container in &pod.spec.containers {
            let result = self
                .create_container(op, &pod.metadata.namespace, container)
                .await;

            if let Err(e) = &result {
                error!(
                    "failed to create container {} for pod {}: {e}",
                    container.name, pod.metadata.name
                );
            }

            containers.push(ContainerOutcome {
                name: container.name.clone(),
                result,
            });
        }

        Ok(PodCreation {
            pod: pod.metadata.name.clone(),
            namespace: pod.metadata.namespace.clone(),
            containers,
        })
    }

    async fn create_container(
        &self,
        op: &Operation,
        namespace: &str,
        container: &Container,
    ) -> Result<ContainerId> {
        let mut create = CreateConfig::from_container(container)?;

        let (name, tag) = split_reference(&container.image);
        let image = self
            .images
            .get(op, name, tag.unwrap_or_default(), true)
            .await
            .map_err(|source| PodsError::Image {
                container: container.name.clone(),
                source,
            })?;

        create.apply_image_defaults(&image.config);
        let config = create.into_isolation_config(&image, namespace)?;

        self.isolation
            .create_container(op, &config, self.commit_wait)
            .await
            .map_err(|source| PodsError::Isolation {
                container: container.name.clone(),
                source,
            })
    }

    /// Moves every created container of `creation` to [RUNNING].
    ///
    /// Containers that failed creation are skipped. Like creation, a failure
    /// on one container does not stop the others.
    #[tracing::instrument(skip(self, op, creation), fields(op = %op.id(), pod = %creation.pod))]
    pub async fn start_pod(
        &self,
        op: &Operation,
        creation: &PodCreation,
    ) -> Result<()> {
        let mut failed = Vec::new();

        for (name, id) in creation.created() {
            if let Err(e) = self.start_container(op, name, id).await {
                error!("failed to start container {name} ({id}): {e}");
                failed.push(name.to_string());
            }
        }

        if failed.is_empty() {
            info!("started pod {}", creation.pod);
            Ok(())
        } else {
            Err(PodsError::ContainersFailed { pod: creation.pod.clone(), failed })
        }
    }

    async fn start_container(
        &self,
        op: &Operation,
        name: &str,
        id: &ContainerId,
    ) -> Result<()> {
        let isolation_error = |source| PodsError::Isolation {
            container: name.to_string(),
            source,
        };

        let handle = self
            .isolation
            .handle(op, id, name)
            .await
            .map_err(isolation_error)?;
        let handle = self
            .isolation
            .set_state(op, handle, name, RUNNING)
            .await
            .map_err(isolation_error)?;
        self.isolation
            .commit_handle(op, handle, id, self.commit_wait)
            .await
            .map_err(isolation_error)
    }
}

/// Result of creating one container of a pod.
#[derive(Debug)]
pub struct ContainerOutcome {
    pub name: String,
    pub result: Result<ContainerId>,
}

/// Per-container report of [PodProxy::create_pod].
#[derive(Debug)]
pub struct PodCreation {
    pub pod: String,
    pub namespace: String,
    pub containers: Vec<ContainerOutcome>,
}

impl PodCreation {
    pub fn is_complete(&self) -> bool {
        self.containers.iter().all(|c| c.result.is_ok())
    }

    /// Names and ids of the containers that were committed.
    pub fn created(&self) -> impl Iterator<Item = (&str, &ContainerId)> {
        self.containers.iter().filter_map(|c| match &c.result {
            Ok(id) => Some((c.name.as_str(), id)),
            Err(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PodsError)> {
        self.containers.iter().filter_map(|c| match &c.result {
            Ok(_) => None,
            Err(e) => Some((c.name.as_str(), e)),
        })
    }

    /// Ids of all containers, or [PodsError::ContainersFailed] naming every
    /// container that failed.
    pub fn into_result(self) -> Result<Vec<(String, ContainerId)>> {
        let failed: Vec<String> =
            self.failures().map(|(name, _)| name.to_string()).collect();
        if !failed.is_empty() {
            return Err(PodsError::ContainersFailed { pod: self.pod, failed });
        }

        Ok(self
            .containers
            .into_iter()
            .filter_map(|c| c.result.ok().map(|id| (c.name, id)))
            .collect())
    }

    /// Machine readable report.
    pub fn summary(&self) -> serde_json::Value {
        let containers: Vec<_> = self
            .containers
            .iter()
            .map(|c| match &c.result {
                Ok(id) => json!({"name": c.name, "id": id}),
                Err(e) => json!({
                    "name": c.name,
                    "error": e.to_string(),
                    "kind": e.kind().as_str(),
                }),
            })
            .collect();

        json!({
            "pod": self.pod,
            "namespace": self.namespace,
            "complete": self.is_complete(),
            "containers": containers,
        })
    }
}

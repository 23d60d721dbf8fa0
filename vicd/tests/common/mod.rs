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

#![allow(dead_code)]

use async_trait::async_trait;
use client::models::{
    ContainerCreateConfig, ContainerCreatedInfo, ImageJoinConfig,
    InteractionJoinConfig, JoinResponse, LoggingJoinConfig,
    ScopesAddContainerConfig, TaskBindConfig, TaskJoinConfig,
};
use client::{ClientError, PortLayer};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use vicd::config::BootstrapConfig;
use vicd::host::HostIdentity;
use vicd::images::{join_reference, ImageConfig, ImageStore, ImagesError};
use vicd::isolation::{IsolationContainerConfig, IsolationProxy, PortBinding};
use vicd::operation::Operation;

pub const HOST_UUID: &str = "4c4c4544-0035-3910-8044-b7c04f4e4e32";

/// Port layer call as recorded by [FakePortLayer].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { cpus: i64, memory_mb: i64, store: String },
    Get { id: String },
    JoinImage { store: String, layer: String, handle: String, delta: String },
    JoinTask { handle: String, id: String, path: String, args: Vec<String> },
    BindTask { handle: String, id: String },
    JoinScope { scope: String, handle: String, ports: Vec<String> },
    RemoveFromScope { scope: String, handle: String },
    JoinLogging { handle: String },
    JoinInteraction { handle: String },
    Commit { handle: String, wait: Option<i32> },
    ChangeState { handle: String, state: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    Get,
    Image,
    Task,
    Bind,
    Scope,
    RemoveFromScope,
    Logging,
    Interaction,
    Commit,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Conflict,
    Internal,
    /// Answers a join with a non-string handle.
    MalformedHandle,
}

impl Failure {
    fn error(self) -> ClientError {
        match self {
            Failure::NotFound => {
                ClientError::NotFound { message: "no such thing".into() }
            }
            Failure::Conflict => {
                ClientError::Conflict { message: "stale handle".into() }
            }
            Failure::Internal | Failure::MalformedHandle => {
                ClientError::Default { status: 500, message: "boom".into() }
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<Step, Failure>,
    handles: usize,
    containers: usize,
}

/// In-memory port layer that records every call and hands out handles
/// `h1`, `h2`, ... and container ids `c1`, `c2`, ...
#[derive(Debug, Default)]
pub struct FakePortLayer {
    state: Mutex<State>,
}

impl FakePortLayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, step: Step, failure: Failure) {
        let _ = self.state.lock().expect("lock").failures.insert(step, failure);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("lock").calls.clone()
    }

    fn record(&self, step: Step, call: Call) -> Result<String, Failure> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(call);
        if let Some(failure) = state.failures.get(&step) {
            return Err(*failure);
        }
        state.handles += 1;
        Ok(format!("h{}", state.handles))
    }

    fn join(&self, step: Step, call: Call) -> client::Result<JoinResponse> {
        match self.record(step, call) {
            Ok(handle) => Ok(JoinResponse { handle: json!(handle) }),
            Err(Failure::MalformedHandle) => {
                Ok(JoinResponse { handle: json!(42) })
            }
            Err(failure) => Err(failure.error()),
        }
    }

    fn plain(&self, step: Step, call: Call) -> client::Result<String> {
        self.record(step, call).map_err(Failure::error)
    }
}

#[async_trait]
impl PortLayer for FakePortLayer {
    async fn create_container(
        &self,
        config: ContainerCreateConfig,
    ) -> client::Result<ContainerCreatedInfo> {
        let handle = self.plain(
            Step::Create,
            Call::Create {
                cpus: config.num_cpus,
                memory_mb: config.memory_mb,
                store: config.image_store.name,
            },
        )?;

        let mut state = self.state.lock().expect("lock");
        state.containers += 1;
        Ok(ContainerCreatedInfo { id: format!("c{}", state.containers), handle })
    }

    async fn get_container(&self, id: &str) -> client::Result<String> {
        self.plain(Step::Get, Call::Get { id: id.into() })
    }

    async fn join_image(
        &self,
        store_name: &str,
        layer_id: &str,
        config: ImageJoinConfig,
    ) -> client::Result<JoinResponse> {
        self.join(
            Step::Image,
            Call::JoinImage {
                store: store_name.into(),
                layer: layer_id.into(),
                handle: config.handle,
                delta: config.delta_id,
            },
        )
    }

    async fn join_task(
        &self,
        config: TaskJoinConfig,
    ) -> client::Result<JoinResponse> {
        self.join(
            Step::Task,
            Call::JoinTask {
                handle: config.handle,
                id: config.id,
                path: config.path,
                args: config.args,
            },
        )
    }

    async fn bind_task(
        &self,
        config: TaskBindConfig,
    ) -> client::Result<JoinResponse> {
        self.join(
            Step::Bind,
            Call::BindTask { handle: config.handle, id: config.id },
        )
    }

    async fn join_scope(
        &self,
        scope: &str,
        config: ScopesAddContainerConfig,
    ) -> client::Result<String> {
        self.plain(
            Step::Scope,
            Call::JoinScope {
                scope: scope.into(),
                handle: config.handle,
                ports: config.network_config.ports,
            },
        )
    }

    async fn remove_from_scope(
        &self,
        scope: &str,
        handle: &str,
    ) -> client::Result<String> {
        self.plain(
            Step::RemoveFromScope,
            Call::RemoveFromScope { scope: scope.into(), handle: handle.into() },
        )
    }

    async fn join_logging(
        &self,
        config: LoggingJoinConfig,
    ) -> client::Result<JoinResponse> {
        self.join(Step::Logging, Call::JoinLogging { handle: config.handle })
    }

    async fn join_interaction(
        &self,
        config: InteractionJoinConfig,
    ) -> client::Result<JoinResponse> {
        self.join(
            Step::Interaction,
            Call::JoinInteraction { handle: config.handle },
        )
    }

    async fn commit(
        &self,
        handle: &str,
        wait_time: Option<i32>,
    ) -> client::Result<()> {
        self.plain(
            Step::Commit,
            Call::Commit { handle: handle.into(), wait: wait_time },
        )
        .map(|_| ())
    }

    async fn change_state(
        &self,
        handle: &str,
        state: &str,
    ) -> client::Result<String> {
        self.plain(
            Step::State,
            Call::ChangeState { handle: handle.into(), state: state.into() },
        )
    }
}

/// Image store answering from a fixed set of images.
#[derive(Debug, Default)]
pub struct FakeImageStore {
    images: BTreeMap<String, ImageConfig>,
    pub missing: BTreeSet<String>,
}

impl FakeImageStore {
    pub fn with_image(mut self, reference: &str, image: ImageConfig) -> Self {
        let _ = self.images.insert(reference.into(), image);
        self
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn get(
        &self,
        _op: &Operation,
        id_or_ref: &str,
        tag: &str,
        _actuate: bool,
    ) -> Result<ImageConfig, ImagesError> {
        let reference = join_reference(id_or_ref, tag);
        self.images
            .get(&reference)
            .cloned()
            .ok_or(ImagesError::NotFound { reference })
    }

    async fn images(&self) -> Result<Vec<ImageConfig>, ImagesError> {
        Ok(self.images.values().cloned().collect())
    }

    async fn pull_image(
        &self,
        _op: &Operation,
        _image: &str,
        _tag: &str,
    ) -> Result<(), ImagesError> {
        Ok(())
    }
}

pub fn proxy(port_layer: &Arc<FakePortLayer>) -> IsolationProxy {
    IsolationProxy::new(
        port_layer.clone(),
        HostIdentity::Static(HOST_UUID.into()),
        BootstrapConfig::default(),
    )
}

pub fn busybox_config() -> IsolationContainerConfig {
    IsolationContainerConfig {
        image_id: "f6e427c148a766d2".into(),
        layer_id: "layer-busybox".into(),
        image_name: "busybox".into(),
        name: "shell".into(),
        namespace: "default".into(),
        cmd: vec!["/bin/sh".into(), "-c".into(), "echo hi".into()],
        env: vec!["PATH=/bin".into()],
        cpu_count: 2,
        memory_mb: 2048,
        ..Default::default()
    }
}

pub fn with_port(
    mut config: IsolationContainerConfig,
    key: &str,
    host_port: u16,
) -> IsolationContainerConfig {
    let _ = config
        .port_map
        .insert(key.into(), PortBinding { host_ip: String::new(), host_port });
    config
}

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

mod common;

use common::{busybox_config, proxy, with_port, Call, FakePortLayer, HOST_UUID};
use pretty_assertions::assert_eq;
use vicd::isolation::ErrorKind;
use vicd::operation::Operation;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn pipeline_threads_each_handle_into_the_next_call() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);

    let id = proxy
        .create_container(&Operation::new(), &busybox_config(), 30)
        .await
        .expect("container");

    assert_eq!(&*id, "c1");
    assert_eq!(
        port_layer.calls(),
        vec![
            Call::Create {
                cpus: 2,
                memory_mb: 2048,
                store: HOST_UUID.into(),
            },
            Call::JoinImage {
                store: HOST_UUID.into(),
                layer: "layer-busybox".into(),
                handle: "h1".into(),
                delta: "c1".into(),
            },
            Call::JoinTask {
                handle: "h2".into(),
                id: "c1".into(),
                path: "/bin/sh".into(),
                args: strings(&["-c", "echo hi"]),
            },
            Call::BindTask { handle: "h3".into(), id: "c1".into() },
            Call::JoinLogging { handle: "h4".into() },
            Call::JoinInteraction { handle: "h5".into() },
            Call::Commit { handle: "h6".into(), wait: Some(30) },
        ]
    );
}

#[tokio::test]
async fn published_ports_join_the_default_scope() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);
    let config = with_port(busybox_config(), "80/tcp", 8080);

    let _ = proxy
        .create_container(&Operation::new(), &config, 0)
        .await
        .expect("container");

    let calls = port_layer.calls();
    assert_eq!(
        calls[4],
        Call::JoinScope {
            scope: "default".into(),
            handle: "h4".into(),
            ports: strings(&["8080:80/tcp"]),
        }
    );
    assert_eq!(calls[5], Call::JoinLogging { handle: "h5".into() });
    assert_eq!(calls.last(), Some(&Call::Commit { handle: "h7".into(), wait: None }));
}

#[tokio::test]
async fn entrypoint_leads_the_task_command() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);
    let config = vicd::isolation::IsolationContainerConfig {
        entrypoint: strings(&["/init"]),
        cmd: strings(&["--flag"]),
        ..busybox_config()
    };

    let _ = proxy
        .create_container(&Operation::new(), &config, 0)
        .await
        .expect("container");

    assert!(port_layer.calls().contains(&Call::JoinTask {
        handle: "h2".into(),
        id: "c1".into(),
        path: "/init".into(),
        args: strings(&["--flag"]),
    }));
}

#[tokio::test]
async fn container_without_command_makes_no_remote_call() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);
    let config = vicd::isolation::IsolationContainerConfig {
        cmd: Vec::new(),
        ..busybox_config()
    };

    let err = proxy
        .create_container(&Operation::new(), &config, 0)
        .await
        .expect_err("no command");

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(port_layer.calls().is_empty());
}

#[tokio::test]
async fn cancelled_operation_makes_no_remote_call() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);
    let op = Operation::new();
    op.cancel();

    let err = proxy
        .create_container(&op, &busybox_config(), 0)
        .await
        .expect_err("cancelled");

    assert!(matches!(
        err,
        vicd::isolation::IsolationError::Interrupted { .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(port_layer.calls().is_empty());
}

#[tokio::test]
async fn default_skeleton_uses_bootstrap_resources() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);

    let (id, handle) =
        proxy.create_handle(&Operation::new()).await.expect("handle");

    assert_eq!(&*id, "c1");
    assert_eq!(handle.as_str(), "h1");
    assert_eq!(
        port_layer.calls(),
        vec![Call::Create { cpus: 2, memory_mb: 512, store: HOST_UUID.into() }]
    );
}

#[tokio::test]
async fn started_container_is_fetched_set_running_and_committed() {
    let port_layer = FakePortLayer::new();
    let proxy = proxy(&port_layer);
    let op = Operation::new();
    let id = vicd::isolation::ContainerId::new("c9");

    let handle = proxy.handle(&op, &id, "shell").await.expect("handle");
    let handle = proxy
        .set_state(&op, handle, "shell", "RUNNING")
        .await
        .expect("state");
    proxy.commit_handle(&op, handle, &id, -1).await.expect("commit");

    assert_eq!(
        port_layer.calls(),
        vec![
            Call::Get { id: "c9".into() },
            Call::ChangeState { handle: "h1".into(), state: "RUNNING".into() },
            Call::Commit { handle: "h2".into(), wait: None },
        ]
    );
}

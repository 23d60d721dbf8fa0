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

//! Mapping from [IsolationContainerConfig] to port layer requests.

use super::error::{IsolationError, Result};
use super::{Handle, IsolationContainerConfig};
use client::models::{NetworkConfig, TaskJoinConfig};

/// Executable path and arguments of the primary task.
///
/// A non-empty entrypoint wins and cmd becomes its trailing arguments.
/// Otherwise cmd alone describes the process.
pub(crate) fn resolve_command(
    config: &IsolationContainerConfig,
) -> Result<(String, Vec<String>)> {
    let mut parts = config.entrypoint.iter().chain(config.cmd.iter()).cloned();
    match parts.next() {
        Some(path) => Ok((path, parts.collect())),
        None => {
            Err(IsolationError::MissingCommand { name: config.name.clone() })
        }
    }
}

pub(crate) fn task_join_config(
    handle: Handle,
    id: &str,
    layer_id: &str,
    config: &IsolationContainerConfig,
) -> Result<TaskJoinConfig> {
    let (path, args) = resolve_command(config)?;

    Ok(TaskJoinConfig {
        handle: handle.into_inner(),
        id: id.to_string(),
        namespace: layer_id.to_string(),
        path,
        args,
        env: config.env.clone(),
        working_dir: config.working_dir.clone(),
        user: config.user.clone(),
        attach: true,
        open_stdin: config.open_stdin,
        tty: config.tty,
        stop_signal: config.stop_signal.clone(),
    })
}

/// Scope membership for a container publishing ports, `None` when nothing
/// is published.
pub(crate) fn network_config(
    network: &str,
    config: &IsolationContainerConfig,
) -> Option<NetworkConfig> {
    if config.port_map.is_empty() {
        return None;
    }

    let ports = config
        .port_map
        .iter()
        .map(|(key, binding)| format!("{}:{key}", binding.host_port))
        .collect();

    Some(NetworkConfig { network_name: network.to_string(), ports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation::PortBinding;
    use simple_test_case::test_case;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test_case(&[], &["/bin/sh", "-c", "echo hi"], "/bin/sh", &["-c", "echo hi"]; "cmd only")]
    #[test_case(&["/init"], &["--flag"], "/init", &["--flag"]; "entrypoint with cmd")]
    #[test_case(&["/init", "-v"], &[], "/init", &["-v"]; "entrypoint only")]
    #[test_case(&["nginx"], &["-g", "daemon off;"], "nginx", &["-g", "daemon off;"]; "entrypoint prefix")]
    #[test]
    fn command_resolution(
        entrypoint: &[&str],
        cmd: &[&str],
        path: &str,
        args: &[&str],
    ) {
        let config = IsolationContainerConfig {
            entrypoint: strings(entrypoint),
            cmd: strings(cmd),
            ..Default::default()
        };

        let (got_path, got_args) =
            resolve_command(&config).expect("resolvable");
        assert_eq!(got_path, path);
        assert_eq!(got_args, strings(args));
    }

    #[test]
    fn empty_command_is_a_configuration_error() {
        let config =
            IsolationContainerConfig { name: "web".into(), ..Default::default() };
        assert!(matches!(
            resolve_command(&config),
            Err(IsolationError::MissingCommand { name }) if name == "web"
        ));
    }

    #[test]
    fn task_always_attaches() {
        let config = IsolationContainerConfig {
            cmd: strings(&["top"]),
            tty: true,
            ..Default::default()
        };
        let handle = Handle::new("h1");

        let task = task_join_config(handle, "c1", "layer", &config)
            .expect("task config");

        assert!(task.attach);
        assert!(task.tty);
        assert_eq!(task.handle, "h1");
        assert_eq!(task.id, "c1");
        assert_eq!(task.namespace, "layer");
    }

    #[test]
    fn ports_render_host_port_first() {
        let mut config = IsolationContainerConfig::default();
        assert_eq!(network_config("default", &config), None);

        let _ = config.port_map.insert(
            "80/tcp".into(),
            PortBinding { host_ip: "".into(), host_port: 8080 },
        );
        let _ = config.port_map.insert(
            "53/udp".into(),
            PortBinding { host_ip: "".into(), host_port: 5353 },
        );

        let network = network_config("default", &config).expect("ports");
        assert_eq!(network.network_name, "default");
        assert_eq!(network.ports, strings(&["5353:53/udp", "8080:80/tcp"]));
    }
}

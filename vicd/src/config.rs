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

//! Provider configuration.
//!
//! Configuration is read from a TOML file when one is given. The persona and
//! port layer addresses fall back to the `PERSONA_ADDR` and `PORTLAYER_ADDR`
//! environment variables when the file does not set them.

use crate::host::{HostIdentity, PRODUCT_UUID_PATH};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PERSONA_ADDR_ENV: &str = "PERSONA_ADDR";
pub const PORTLAYER_ADDR_ENV: &str = "PORTLAYER_ADDR";

/// Image the container skeleton is created from before the real image is
/// joined.
pub const BOOTSTRAP_IMAGE: &str =
    "f6e427c148a766d2d6c117d67359a0aa7d133b5bc05830a7ff6e8b64ff6b1d1d";
pub const BOOTSTRAP_LAYER: &str =
    "02d3847f0b0fb7acd4419040cc53febf91cb112db2451d9b27a245dee5b227c0";
pub const BOOTSTRAP_REPO_NAME: &str = "busybox";

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path:?} is empty")]
    Empty { path: PathBuf },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("{field} is not configured and ${env} is not set")]
    MissingAddress { field: &'static str, env: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VicConfig {
    /// Address of the docker persona, used for image pulls and inspection.
    #[serde(default)]
    pub persona_server: String,
    /// Address of the port layer.
    #[serde(default)]
    pub portlayer_server: String,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Seconds the port layer may wait while committing. Zero or less sends
    /// no wait bound.
    #[serde(default)]
    pub commit_wait_secs: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostConfig {
    pub uuid: Option<String>,
    pub product_uuid_path: Option<PathBuf>,
}

/// Parameters of the placeholder container skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BootstrapConfig {
    pub image: String,
    pub layer: String,
    pub repo_name: String,
    /// Network scope containers with published ports join.
    pub network: String,
    pub hostname: String,
    pub cpus: i64,
    pub memory_mb: i64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            image: BOOTSTRAP_IMAGE.into(),
            layer: BOOTSTRAP_LAYER.into(),
            repo_name: BOOTSTRAP_REPO_NAME.into(),
            network: "default".into(),
            hostname: "virtual-kubelet".into(),
            cpus: 2,
            memory_mb: 512,
        }
    }
}

impl VicConfig {
    /// Loads the configuration from `path`, or from the environment alone
    /// when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::parse_from_toml_file(path)?,
            None => Self::parse_from_toml("")?,
        };
        config.with_env_fallback().validated()
    }

    pub fn parse_from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_toml = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Read { path: path.to_path_buf(), source }
        })?;

        if config_toml.trim().is_empty() {
            return Err(ConfigError::Empty { path: path.to_path_buf() });
        }

        Self::parse_from_toml(&config_toml)
    }

    pub fn parse_from_toml(config_toml: &str) -> Result<Self> {
        Ok(toml::from_str(config_toml)?)
    }

    fn with_env_fallback(mut self) -> Self {
        if self.persona_server.is_empty() {
            self.persona_server =
                std::env::var(PERSONA_ADDR_ENV).unwrap_or_default();
        }
        if self.portlayer_server.is_empty() {
            self.portlayer_server =
                std::env::var(PORTLAYER_ADDR_ENV).unwrap_or_default();
        }
        self
    }

    fn validated(self) -> Result<Self> {
        if self.persona_server.is_empty() {
            return Err(ConfigError::MissingAddress {
                field: "persona-server",
                env: PERSONA_ADDR_ENV,
            });
        }
        if self.portlayer_server.is_empty() {
            return Err(ConfigError::MissingAddress {
                field: "portlayer-server",
                env: PORTLAYER_ADDR_ENV,
            });
        }
        Ok(self)
    }

    /// A configured uuid wins over the firmware file.
    pub fn host_identity(&self) -> HostIdentity {
        match (&self.host.uuid, &self.host.product_uuid_path) {
            (Some(uuid), _) => HostIdentity::Static(uuid.clone()),
            (None, Some(path)) => HostIdentity::Firmware(path.clone()),
            (None, None) => {
                HostIdentity::Firmware(PathBuf::from(PRODUCT_UUID_PATH))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        std::env::remove_var(PERSONA_ADDR_ENV);
        std::env::remove_var(PORTLAYER_ADDR_ENV);
    }

    #[test]
    fn parses_full_config() {
        let config = VicConfig::parse_from_toml(
            r#"
            persona-server = "10.0.0.2:2375"
            portlayer-server = "10.0.0.2:2377"
            commit-wait-secs = 30

            [host]
            uuid = "4c4c4544-0035-3910-8044-b7c04f4e4e32"

            [bootstrap]
            network = "bridge"
            memory-mb = 1024
            "#,
        )
        .expect("config");

        assert_eq!(config.persona_server, "10.0.0.2:2375");
        assert_eq!(config.commit_wait_secs, 30);
        assert_eq!(config.bootstrap.network, "bridge");
        assert_eq!(config.bootstrap.memory_mb, 1024);
        assert_eq!(config.bootstrap.cpus, 2);
        assert_eq!(config.bootstrap.repo_name, BOOTSTRAP_REPO_NAME);
        assert_eq!(
            config.host_identity(),
            HostIdentity::Static("4c4c4544-0035-3910-8044-b7c04f4e4e32".into())
        );
    }

    #[test]
    fn unknown_host_defaults_to_firmware_uuid() {
        let config = VicConfig::parse_from_toml("").expect("config");
        assert_eq!(
            config.host_identity(),
            HostIdentity::Firmware(PathBuf::from(PRODUCT_UUID_PATH))
        );
    }

    #[test]
    #[serial]
    fn addresses_fall_back_to_environment() {
        clear_env();
        std::env::set_var(PERSONA_ADDR_ENV, "persona:2375");
        std::env::set_var(PORTLAYER_ADDR_ENV, "portlayer:2377");

        let config = VicConfig::load(None).expect("config");
        clear_env();

        assert_eq!(config.persona_server, "persona:2375");
        assert_eq!(config.portlayer_server, "portlayer:2377");
    }

    #[test]
    #[serial]
    fn file_addresses_win_over_environment() {
        clear_env();
        std::env::set_var(PERSONA_ADDR_ENV, "from-env:2375");

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "persona-server = \"from-file:2375\"\nportlayer-server = \"pl:1\""
        )
        .expect("write");

        let config = VicConfig::load(Some(file.path())).expect("config");
        clear_env();

        assert_eq!(config.persona_server, "from-file:2375");
    }

    #[test]
    #[serial]
    fn missing_portlayer_address_is_rejected() {
        clear_env();
        std::env::set_var(PERSONA_ADDR_ENV, "persona:2375");

        let err = VicConfig::load(None).expect_err("must fail");
        clear_env();

        assert!(matches!(
            err,
            ConfigError::MissingAddress { env: PORTLAYER_ADDR_ENV, .. }
        ));
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let err =
            VicConfig::parse_from_toml_file(file.path()).expect_err("empty");
        assert!(matches!(err, ConfigError::Empty { .. }));
    }
}

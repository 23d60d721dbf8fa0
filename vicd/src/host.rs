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

//! Identity of the host the provider runs on.
//!
//! The port layer keys its image stores by host identity, and the container
//! skeleton is anchored to it.

use std::path::PathBuf;
use thiserror::Error;

/// Location of the firmware-provided machine UUID on Linux.
pub const PRODUCT_UUID_PATH: &str = "/sys/class/dmi/id/product_uuid";

#[derive(Debug, Error)]
pub enum HostIdentityError {
    #[error("failed to read host identity from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("host identity is empty")]
    Empty,
}

/// Where the host UUID comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostIdentity {
    /// Fixed identity, usually provided through configuration.
    Static(String),
    /// Identity read from a file on every call.
    Firmware(PathBuf),
}

impl HostIdentity {
    /// Returns the host uuid, trimmed and lowercased.
    pub fn uuid(&self) -> Result<String, HostIdentityError> {
        let raw = match self {
            HostIdentity::Static(uuid) => uuid.clone(),
            HostIdentity::Firmware(path) => std::fs::read_to_string(path)
                .map_err(|source| HostIdentityError::Read {
                    path: path.clone(),
                    source,
                })?,
        };

        let uuid = raw.trim().to_lowercase();
        if uuid.is_empty() {
            return Err(HostIdentityError::Empty);
        }

        Ok(uuid)
    }
}

impl Default for HostIdentity {
    fn default() -> Self {
        HostIdentity::Firmware(PathBuf::from(PRODUCT_UUID_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn static_identity_is_normalized() {
        let host = HostIdentity::Static(
            "  4C4C4544-0035-3910-8044-B7C04F4E4E32\n".into(),
        );
        assert_eq!(
            host.uuid().expect("uuid"),
            "4c4c4544-0035-3910-8044-b7c04f4e4e32"
        );
    }

    #[test]
    fn firmware_identity_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "ABCDEF00-0000-0000-0000-000000000001")
            .expect("write");

        let host = HostIdentity::Firmware(file.path().to_path_buf());
        assert_eq!(
            host.uuid().expect("uuid"),
            "abcdef00-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn missing_firmware_file_is_a_read_error() {
        let host =
            HostIdentity::Firmware(PathBuf::from("/nonexistent/product_uuid"));
        assert!(matches!(host.uuid(), Err(HostIdentityError::Read { .. })));
    }

    #[test]
    fn blank_identity_is_rejected() {
        let host = HostIdentity::Static("   ".into());
        assert!(matches!(host.uuid(), Err(HostIdentityError::Empty)));
    }
}

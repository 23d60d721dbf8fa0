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

use crate::host::HostIdentityError;
use crate::operation::Interrupted;
use client::ClientError;
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, IsolationError>;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Internal,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
            ErrorKind::Configuration => "configuration",
        }
    }
}

#[derive(Debug, Error)]
pub enum IsolationError {
    #[error("{resource} '{name}' not found")]
    NotFound { resource: &'static str, name: String },
    #[error("{operation} conflicted: {message}")]
    Conflict { operation: &'static str, message: String },
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("{operation} returned a malformed handle: {payload}")]
    MalformedHandle { operation: &'static str, payload: serde_json::Value },
    #[error(transparent)]
    HostIdentity(#[from] HostIdentityError),
    #[error("container '{name}' has neither entrypoint nor cmd")]
    MissingCommand { name: String },
    #[error("{operation} {reason}")]
    Interrupted { operation: &'static str, reason: Interrupted },
}

impl IsolationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IsolationError::NotFound { .. } => ErrorKind::NotFound,
            IsolationError::Conflict { .. } => ErrorKind::Conflict,
            IsolationError::MissingCommand { .. } => ErrorKind::Configuration,
            IsolationError::Remote { .. }
            | IsolationError::MalformedHandle { .. }
            | IsolationError::HostIdentity(_)
            | IsolationError::Interrupted { .. } => ErrorKind::Internal,
        }
    }

    /// Remote failure of a step that does not distinguish error kinds.
    pub(crate) fn remote(operation: &'static str, source: ClientError) -> Self {
        IsolationError::Remote { operation, source }
    }

    /// Remote failure of a step that reports missing resources as such.
    pub(crate) fn remote_or_not_found(
        operation: &'static str,
        resource: &'static str,
        name: &str,
        source: ClientError,
    ) -> Self {
        match source {
            ClientError::NotFound { .. } => {
                IsolationError::NotFound { resource, name: name.to_string() }
            }
            source => IsolationError::Remote { operation, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn not_found_is_only_surfaced_where_asked() {
        let err = IsolationError::remote(
            "join image",
            ClientError::NotFound { message: "gone".into() },
        );
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = IsolationError::remote_or_not_found(
            "get container",
            "container",
            "abc",
            ClientError::NotFound { message: "gone".into() },
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "container 'abc' not found");
    }

    #[test]
    fn interruption_is_internal() {
        let err = IsolationError::Interrupted {
            operation: "commit",
            reason: Interrupted::DeadlineExceeded,
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "commit exceeded its deadline");
    }
}

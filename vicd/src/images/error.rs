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

use crate::operation::Interrupted;
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, ImagesError>;

#[derive(Debug, Error)]
pub enum ImagesError {
    #[error("no such image: {reference}")]
    NotFound { reference: String },
    #[error("pull of {reference} failed with status {status}: {body}")]
    PullFailed { reference: String, status: u16, body: String },
    #[error("inspect of {reference} failed with status {status}")]
    InspectFailed { reference: String, status: u16 },
    #[error("image {reference} has no layers")]
    NoLayers { reference: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid persona address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("image cache lock was poisoned")]
    CacheUnavailable,
    #[error("{operation} {reason}")]
    Interrupted { operation: &'static str, reason: Interrupted },
}

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

//! Image metadata lookup, backed by an injected cache and pulls through the
//! docker persona.

pub use self::error::ImagesError;
pub use self::image_cache::{ImageCache, InMemoryImageCache};
pub use self::image_config::{
    join_reference, split_reference, ContainerDefaults, ImageConfig,
};
pub use self::image_store::{ImageStore, PersonaImageStore, PULL_TIMEOUT};

mod error;
mod image_cache;
mod image_config;
mod image_store;

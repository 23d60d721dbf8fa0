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

use super::error::{ImagesError, Result};
use super::image_config::{strip_digest_algorithm, ImageConfig};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::RwLock;

/// Metadata of the images known to the host.
pub trait ImageCache: Debug + Send + Sync {
    /// Looks an image up by id, unique id prefix, or reference.
    fn get(&self, id_or_ref: &str) -> Result<Option<ImageConfig>>;

    fn images(&self) -> Result<Vec<ImageConfig>>;

    /// Adds an image, merging its tags and digests into an existing entry
    /// with the same id.
    fn insert(&self, image: ImageConfig) -> Result<()>;

    /// Replaces the whole content of the cache.
    fn refresh(&self, images: Vec<ImageConfig>) -> Result<()>;
}

/// [ImageCache] keyed by image id.
#[derive(Debug, Default)]
pub struct InMemoryImageCache {
    images: RwLock<BTreeMap<String, ImageConfig>>,
}

impl InMemoryImageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageCache for InMemoryImageCache {
    fn get(&self, id_or_ref: &str) -> Result<Option<ImageConfig>> {
        let images =
            self.images.read().map_err(|_| ImagesError::CacheUnavailable)?;

        let id = strip_digest_algorithm(id_or_ref);
        if let Some(image) = images.get(id) {
            return Ok(Some(image.clone()));
        }

        let tagged = images.values().find(|image| {
            image.tags.iter().any(|tag| tag == id_or_ref)
        });
        if let Some(image) = tagged {
            return Ok(Some(image.clone()));
        }

        let mut matching =
            images.values().filter(|image| image.matches(id_or_ref));
        match (matching.next(), matching.next()) {
            (Some(image), None) => Ok(Some(image.clone())),
            _ => Ok(None),
        }
    }

    fn images(&self) -> Result<Vec<ImageConfig>> {
        let images =
            self.images.read().map_err(|_| ImagesError::CacheUnavailable)?;
        Ok(images.values().cloned().collect())
    }

    fn insert(&self, image: ImageConfig) -> Result<()> {
        let mut images =
            self.images.write().map_err(|_| ImagesError::CacheUnavailable)?;

        match images.get_mut(&image.image_id) {
            Some(existing) => {
                for tag in image.tags {
                    if !existing.tags.contains(&tag) {
                        existing.tags.push(tag);
                    }
                }
                for digest in image.digests {
                    if !existing.digests.contains(&digest) {
                        existing.digests.push(digest);
                    }
                }
                existing.layer_id = image.layer_id;
                existing.config = image.config;
            }
            None => {
                let _ = images.insert(image.image_id.clone(), image);
            }
        }

        Ok(())
    }

    fn refresh(&self, fresh: Vec<ImageConfig>) -> Result<()> {
        let mut images =
            self.images.write().map_err(|_| ImagesError::CacheUnavailable)?;
        *images = fresh
            .into_iter()
            .map(|image| (image.image_id.clone(), image))
            .collect();
        Ok(())
    }
}

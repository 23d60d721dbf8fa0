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
use super::image_cache::ImageCache;
use super::image_config::{
    join_reference, split_reference, strip_digest_algorithm, ContainerDefaults,
    ImageConfig,
};
use crate::operation::Operation;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Version of the docker remote API spoken to the persona.
const PERSONA_API_VERSION: &str = "v1.35";

/// Bound on a single pull request.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolves image references to image metadata.
#[async_trait]
pub trait ImageStore: Debug + Send + Sync {
    /// Returns the image named by `id_or_ref`, qualified by `tag` when one
    /// is given. `tag` may also be a digest such as `sha256:...`. On a miss the image is pulled first if `actuate` is set.
    async fn get(
        &self,
        op: &Operation,
        id_or_ref: &str,
        tag: &str,
        actuate: bool,
    ) -> Result<ImageConfig>;

    async fn images(&self) -> Result<Vec<ImageConfig>>;

    async fn pull_image(
        &self,
        op: &Operation,
        image: &str,
        tag: &str,
    ) -> Result<()>;
}

/// [ImageStore] that delegates pulls to the docker persona, which keeps
/// its own image list in sync.
#[derive(Debug, Clone)]
pub struct PersonaImageStore {
    http: reqwest::Client,
    base: Url,
    cache: Arc<dyn ImageCache>,
}

impl PersonaImageStore {
    pub fn new(address: &str, cache: Arc<dyn ImageCache>) -> Result<Self> {
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let mut base = Url::parse(&with_scheme).map_err(|e| {
            ImagesError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;
        if base.cannot_be_a_base() {
            return Err(ImagesError::InvalidAddress {
                address: address.to_string(),
                reason: "cannot be used as a base url".into(),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, base, cache })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("{PERSONA_API_VERSION}/{path}"))
            .map_err(|e| ImagesError::InvalidAddress {
                address: self.base.to_string(),
                reason: e.to_string(),
            })
    }

    /// Loads every image the persona knows into the cache.
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    pub async fn initialize(&self, op: &Operation) -> Result<()> {
        let url = self.endpoint("images/json")?;
        let request = async {
            let response = self.http.get(url).send().await?;
            response.error_for_status()?.json::<Vec<ImageSummary>>().await
        };
        let summaries = guarded(op, "list images", request).await??;

        let mut images = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match self.inspect(op, &summary.id).await {
                Ok(image) => images.push(image),
                Err(ImagesError::Interrupted { operation, reason }) => {
                    return Err(ImagesError::Interrupted { operation, reason })
                }
                Err(e) => warn!("skipping image {}: {e}", summary.id),
            }
        }

        info!("loaded {} images", images.len());
        self.cache.refresh(images)
    }

    /// Fetches image metadata from the persona.
    async fn inspect(
        &self,
        op: &Operation,
        reference: &str,
    ) -> Result<ImageConfig> {
        let url = self.endpoint(&format!("images/{reference}/json"))?;
        debug!("GET {url}");

        let response =
            guarded(op, "inspect image", self.http.get(url).send()).await??;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ImagesError::NotFound {
                reference: reference.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ImagesError::InspectFailed {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }

        let inspect: ImageInspect =
            guarded(op, "inspect image", response.json()).await??;
        inspect.into_image_config(reference)
    }
}

#[async_trait]
impl ImageStore for PersonaImageStore {
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    async fn get(
        &self,
        op: &Operation,
        id_or_ref: &str,
        tag: &str,
        actuate: bool,
    ) -> Result<ImageConfig> {
        let reference = join_reference(id_or_ref, tag);
        if let Some(image) = self.cache.get(&reference)? {
            return Ok(image);
        }

        if !actuate {
            return Err(ImagesError::NotFound { reference });
        }

        self.pull_image(op, id_or_ref, tag).await?;
        let image = self.inspect(op, &reference).await?;
        self.cache.insert(image)?;

        self.cache
            .get(&reference)?
            .ok_or(ImagesError::NotFound { reference })
    }

    async fn images(&self) -> Result<Vec<ImageConfig>> {
        self.cache.images()
    }

    /// Asks the persona to pull the image, waiting at most [PULL_TIMEOUT].
    #[tracing::instrument(skip(self, op), fields(op = %op.id()))]
    async fn pull_image(
        &self,
        op: &Operation,
        image: &str,
        tag: &str,
    ) -> Result<()> {
        let mut url = self.endpoint("images/create")?;
        {
            let mut query = url.query_pairs_mut();
            let _ = query.append_pair("fromImage", image);
            if !tag.is_empty() {
                let _ = query.append_pair("tag", tag);
            }
        }
        info!("POST {url}");

        let request = self
            .http
            .post(url)
            .timeout(PULL_TIMEOUT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send();
        let response = guarded(op, "pull image", request).await??;

        let status = response.status();
        let body = guarded(op, "pull image", response.text()).await??;
        if status != reqwest::StatusCode::OK {
            return Err(ImagesError::PullFailed {
                reference: join_reference(image, tag),
                status: status.as_u16(),
                body,
            });
        }

        debug!("pull response: {body}");
        Ok(())
    }
}

async fn guarded<F: Future>(
    op: &Operation,
    operation: &'static str,
    fut: F,
) -> Result<F::Output> {
    op.guard(fut)
        .await
        .map_err(|reason| ImagesError::Interrupted { operation, reason })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageSummary {
    id: String,
}

/// Subset of the docker image inspect reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspect {
    id: String,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    #[serde(default)]
    repo_digests: Option<Vec<String>>,
    #[serde(default)]
    config: Option<InspectConfig>,
    #[serde(default, rename = "RootFS")]
    root_fs: Option<RootFs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    cmd: Option<Vec<String>>,
    #[serde(default)]
    entrypoint: Option<Vec<String>>,
    #[serde(default)]
    env: Option<Vec<String>>,
    #[serde(default)]
    working_dir: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    volumes: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    stop_signal: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RootFs {
    #[serde(default)]
    layers: Vec<String>,
}

impl ImageInspect {
    fn into_image_config(self, reference: &str) -> Result<ImageConfig> {
        let layer_id = self
            .root_fs
            .and_then(|root_fs| root_fs.layers.last().cloned())
            .map(|layer| strip_digest_algorithm(&layer).to_string())
            .ok_or_else(|| ImagesError::NoLayers {
                reference: reference.to_string(),
            })?;

        let tags = self.repo_tags.unwrap_or_default();
        let name = tags
            .first()
            .map(|tag| split_reference(tag).0)
            .unwrap_or_else(|| split_reference(reference).0)
            .to_string();

        let config = self.config.unwrap_or_default();
        Ok(ImageConfig {
            image_id: strip_digest_algorithm(&self.id).to_string(),
            layer_id,
            name,
            tags,
            digests: self.repo_digests.unwrap_or_default(),
            config: ContainerDefaults {
                cmd: config.cmd.unwrap_or_default(),
                entrypoint: config.entrypoint.unwrap_or_default(),
                env: config.env.unwrap_or_default(),
                working_dir: config.working_dir,
                user: config.user,
                volumes: config
                    .volumes
                    .unwrap_or_default()
                    .into_keys()
                    .collect(),
                stop_signal: config.stop_signal,
            },
        })
    }
}

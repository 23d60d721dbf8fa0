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

//! HTTP implementation of the [PortLayer] contract.

use crate::models::{
    ContainerCreateConfig, ContainerCreatedInfo, ErrorPayload,
    ImageJoinConfig, InteractionJoinConfig, JoinResponse, LoggingJoinConfig,
    ScopesAddContainerConfig, TaskBindConfig, TaskJoinConfig,
};
use crate::PortLayer;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::trace;
use url::Url;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Port layer failures, decoded once at the call boundary.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The referenced container, image or task does not exist remotely.
    #[error("not found: {message}")]
    NotFound { message: String },
    /// The port layer refused the call because its preconditions were not
    /// met (e.g. committing a stale handle).
    #[error("conflict: {message}")]
    Conflict { message: String },
    /// Any other non-success status.
    #[error("port layer responded {status}: {message}")]
    Default { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("invalid port layer address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Instance of a single client for the port layer.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    /// Create a new Client.
    ///
    /// `address` is either a full URL or a bare `host:port`, in which case
    /// plain http is assumed.
    pub fn new(address: &str) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Self::with_http_client(address, http)
    }

    /// Same as [Client::new] but reuses an existing [reqwest::Client].
    pub fn with_http_client(
        address: &str,
        http: reqwest::Client,
    ) -> Result<Self> {
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let base = Url::parse(&with_scheme).map_err(|e| {
            ClientError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;

        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidAddress {
                address: address.to_string(),
                reason: "cannot be used as a base url".into(),
            });
        }

        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ClientError::InvalidAddress {
                    address: self.base.to_string(),
                    reason: "cannot be used as a base url".into(),
                }
            })?;
            let _ = path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        trace!("port layer request: {method} {url}");
        Ok(self.http.request(method, url))
    }

    async fn execute(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorPayload>(&body)
            .map(|payload| payload.message)
            .unwrap_or(body);

        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound { message },
            StatusCode::CONFLICT => ClientError::Conflict { message },
            status => {
                ClientError::Default { status: status.as_u16(), message }
            }
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<T> {
        let response = Self::execute(request).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PortLayer for Client {
    async fn create_container(
        &self,
        config: ContainerCreateConfig,
    ) -> Result<ContainerCreatedInfo> {
        let request = self.request(Method::POST, &["containers"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn get_container(&self, id: &str) -> Result<String> {
        let request = self.request(Method::GET, &["containers", id])?;
        Self::execute_json(request).await
    }

    async fn join_image(
        &self,
        store_name: &str,
        layer_id: &str,
        config: ImageJoinConfig,
    ) -> Result<JoinResponse> {
        let request = self.request(
            Method::POST,
            &["storage", store_name, "images", layer_id, "join"],
        )?;
        Self::execute_json(request.json(&config)).await
    }

    async fn join_task(&self, config: TaskJoinConfig) -> Result<JoinResponse> {
        let request = self.request(Method::POST, &["tasks"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn bind_task(&self, config: TaskBindConfig) -> Result<JoinResponse> {
        let request = self.request(Method::PATCH, &["tasks"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn join_scope(
        &self,
        scope: &str,
        config: ScopesAddContainerConfig,
    ) -> Result<String> {
        let request =
            self.request(Method::POST, &["scopes", scope, "containers"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn remove_from_scope(
        &self,
        scope: &str,
        handle: &str,
    ) -> Result<String> {
        let request = self.request(
            Method::DELETE,
            &["scopes", scope, "containers", handle],
        )?;
        Self::execute_json(request).await
    }

    async fn join_logging(
        &self,
        config: LoggingJoinConfig,
    ) -> Result<JoinResponse> {
        let request = self.request(Method::POST, &["logging"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn join_interaction(
        &self,
        config: InteractionJoinConfig,
    ) -> Result<JoinResponse> {
        let request = self.request(Method::POST, &["interaction"])?;
        Self::execute_json(request.json(&config)).await
    }

    async fn commit(&self, handle: &str, wait_time: Option<i32>) -> Result<()> {
        let mut request = self.request(Method::PUT, &["containers", handle])?;
        if let Some(wait) = wait_time {
            request = request.query(&[("wait", wait)]);
        }
        let _ = Self::execute(request).await?;
        Ok(())
    }

    async fn change_state(&self, handle: &str, state: &str) -> Result<String> {
        let request = self
            .request(Method::PUT, &["containers", handle, "state"])?
            .query(&[("state", state)]);
        Self::execute_json(request).await
    }
}

//! reqwest-backed implementation of [`FeedApi`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    error::ApiErrorBody,
    protocol::{CreatePostRequest, Post},
};
use thiserror::Error;
use url::Url;

use crate::{settings::ClientSettings, FeedApi};

/// Decoded shape of a non-2xx response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    Message(String),
    Unstructured,
}

impl ErrorBody {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match ApiErrorBody::message_from_bytes(bytes) {
            Some(message) => Self::Message(message),
            None => Self::Unstructured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("content API responded with status {status}")]
    Status { status: u16, body: ErrorBody },
}

pub struct HttpFeedApi {
    http: Client,
    posts_url: Url,
}

impl HttpFeedApi {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        let posts_url = settings
            .posts_url()
            .with_context(|| format!("invalid base url '{}'", settings.base_url))?;
        Ok(Self { http, posts_url })
    }

    pub fn posts_url(&self) -> &Url {
        &self.posts_url
    }
}

async fn ensure_success(response: Response) -> std::result::Result<Response, ApiFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let bytes = response.bytes().await.unwrap_or_default();
    Err(ApiFailure::Status {
        status: status.as_u16(),
        body: ErrorBody::from_bytes(&bytes),
    })
}

fn transport_failure(err: reqwest::Error) -> ApiFailure {
    ApiFailure::Transport(err.to_string())
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn list_posts(&self) -> std::result::Result<Vec<Post>, ApiFailure> {
        let response = self
            .http
            .get(self.posts_url.clone())
            .send()
            .await
            .map_err(transport_failure)?;
        let response = ensure_success(response).await?;
        response
            .json::<Vec<Post>>()
            .await
            .map_err(|err| ApiFailure::Transport(format!("invalid posts payload: {err}")))
    }

    async fn create_post(&self, request: &CreatePostRequest) -> std::result::Result<(), ApiFailure> {
        let response = self
            .http
            .post(self.posts_url.clone())
            .json(request)
            .send()
            .await
            .map_err(transport_failure)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

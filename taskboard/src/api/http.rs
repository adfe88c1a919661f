//! REST implementation of [`TaskApi`] over `reqwest`.
//!
//! Every call is a single JSON request. Non-2xx responses are turned into
//! [`ApiError::Status`] carrying a truncated body for the logs; nothing is
//! retried.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::Serialize;
use url::Url;

use taskboard_proto::api::{NewTask, ReorderRequest, TaskPatch, UserRecord};
use taskboard_proto::task::{Task, TaskId};

use super::{ApiError, TaskApi};

/// Response bodies longer than this are cut before landing in an error.
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`HttpTaskApi`].
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Base URL of the task endpoints (e.g. `http://localhost:5000`).
    pub base_url: String,
    /// Base URL of `POST /user`; defaults to `base_url`.
    pub user_base_url: Option<String>,
    /// Per-request timeout. `None` leaves the client default (no timeout).
    pub request_timeout: Option<Duration>,
}

impl HttpApiConfig {
    /// Settings for a single backend with no request timeout.
    #[must_use]
    pub const fn new(base_url: String) -> Self {
        Self {
            base_url,
            user_base_url: None,
            request_timeout: None,
        }
    }
}

/// [`TaskApi`] backed by the board's REST server.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
    user_base_url: Url,
}

impl HttpTaskApi {
    /// Builds a client for the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if a base URL does not parse or cannot
    /// carry a path, and [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &HttpApiConfig) -> Result<Self, ApiError> {
        let base_url = parse_base(&config.base_url)?;
        let user_base_url = match &config.user_base_url {
            Some(url) => parse_base(url)?,
            None => base_url.clone(),
        };

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            user_base_url,
        })
    }

    /// The base URL task endpoints are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `segments` under `base`, percent-encoding each one.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                url: base.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        tracing::debug!(%method, %url, "board api request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %url, err = %e, "board api request failed");
            ApiError::Http(e)
        })?;
        check_status(response).await
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let url = Self::endpoint(&self.base_url, &["Alltask"])?;
        let response = self.send_json::<()>(Method::GET, url, None).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), ApiError> {
        let url = Self::endpoint(&self.base_url, &["task"])?;
        self.send_json(Method::POST, url, Some(task)).await?;
        Ok(())
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), ApiError> {
        let url = Self::endpoint(&self.base_url, &["tasks", id.as_str()])?;
        self.send_json(Method::PUT, url, Some(patch)).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let url = Self::endpoint(&self.base_url, &["delete", id.as_str()])?;
        self.send_json::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn reorder(&self, request: &ReorderRequest) -> Result<(), ApiError> {
        let url = Self::endpoint(&self.base_url, &["reorder"])?;
        self.send_json(Method::PUT, url, Some(request)).await?;
        Ok(())
    }

    async fn register_user(&self, user: &UserRecord) -> Result<(), ApiError> {
        let url = Self::endpoint(&self.user_base_url, &["user"])?;
        self.send_json(Method::POST, url, Some(user)).await?;
        Ok(())
    }
}

fn parse_base(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: "cannot be a base".to_string(),
        });
    }
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    tracing::warn!(status = status.as_u16(), "board api returned error status");
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

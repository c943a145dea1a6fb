//! REST client for the family cabin backend.
//!
//! Every call goes through one request pipeline: attach the session
//! credential (unless the call is anonymous), tag the request with an
//! `x-request-id`, send, and classify the response. A 401 to a request
//! that carried a credential tears the session down through
//! [`SessionContext::invalidate`] before the error reaches the caller.

use std::sync::Arc;

use cabin_core::Payload;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::context::{Epoch, SessionContext};
use crate::error::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Whether a request carries the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Attach the credential if one is attached to the context.
    Session,
    /// Never attach one (sign-in, registration, guest PIN paths).
    Anonymous,
}

enum Body {
    Empty,
    Json(serde_json::Value),
    Payload(Payload),
}

/// HTTP client bound to one backend and one [`SessionContext`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    context: Arc<SessionContext>,
}

/// Raw bytes of a successful download.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, context: Arc<SessionContext>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(http, config.api_url.clone(), context))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        context: Arc<SessionContext>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            context,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, Body::Empty, Auth::Session).await?;
        Self::parse_response(response).await
    }

    pub async fn get_anonymous<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .execute(Method::GET, path, Body::Empty, Auth::Anonymous)
            .await?;
        Self::parse_response(response).await
    }

    /// Send a JSON body.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let body = Body::Json(serde_json::to_value(body)?);
        let response = self.execute(method, path, body, auth).await?;
        Self::parse_response(response).await
    }

    /// Send a [`Payload`]: JSON without an attachment, multipart with one.
    pub async fn send_payload<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, path, Body::Payload(payload), auth).await?;
        Self::parse_response(response).await
    }

    /// Send a request whose success body is irrelevant.
    pub async fn send_unit(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
        auth: Auth,
    ) -> Result<(), ApiError> {
        let body = payload.map_or(Body::Empty, Body::Payload);
        self.execute(method, path, body, auth).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_unit(Method::DELETE, path, None, Auth::Session).await
    }

    pub async fn download(&self, path: &str) -> Result<Download, ApiError> {
        let response = self.execute(Method::GET, path, Body::Empty, Auth::Session).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download {
            content_type,
            bytes,
        })
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request and return the response if it succeeded.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Body,
        auth: Auth,
    ) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header(REQUEST_ID_HEADER, &request_id);

        let bearer = match auth {
            Auth::Session => self.context.bearer(),
            Auth::Anonymous => None,
        };
        let carried: Option<Epoch> = bearer.as_ref().map(|(_, epoch)| *epoch);
        if let Some((token, _)) = &bearer {
            request = request.bearer_auth(token);
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Payload(payload) => Self::encode_payload(request, payload)?,
        };

        debug!(%request_id, %method, path, authenticated = carried.is_some(), "Sending request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(%request_id, %method, path, error = %e, "Request failed");
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        debug!(%request_id, %method, path, status = status.as_u16(), "Response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = ApiError::from_response(status, &body);
        if error.is_unauthorized() {
            if let Some(epoch) = carried {
                self.context.invalidate(epoch);
            }
        }
        Err(error)
    }

    fn encode_payload(
        request: reqwest::RequestBuilder,
        payload: Payload,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        if !payload.is_multipart() {
            let (fields, _) = payload.into_parts();
            return Ok(request.json(&fields));
        }

        let mut form = Form::new();
        for (name, value) in payload.text_fields() {
            form = form.text(name, value);
        }
        if let (_, Some(file)) = payload.into_parts() {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type.as_deref() {
                part = part.mime_str(content_type)?;
            }
            form = form.part(file.field, part);
        }
        Ok(request.multipart(form))
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        // Empty success bodies deserialize as `null` so `()`/`Option` work.
        if bytes.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

use crate::api::error::ApiError;
use crate::api::types::ApiErrorBody;
use crate::config::ApiConfig;
use crate::datasource::PageFetcher;
use crate::session::SessionStore;
use futures::future::BoxFuture;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Callback invoked when the server rejects the current session
pub type SessionExpiredFn = Arc<dyn Fn() + Send + Sync>;

/// REST API client for listing and mutation endpoints
#[derive(Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base_url: String,
  session: SessionStore,
  on_session_expired: Option<SessionExpiredFn>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      session,
      on_session_expired: None,
    })
  }

  /// Register the callback fired on authentication failures
  pub fn on_session_expired<F>(mut self, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.on_session_expired = Some(Arc::new(callback));
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Resolve an endpoint against the base URL; absolute URLs pass through
  fn url(&self, endpoint: &str) -> Result<Url, ApiError> {
    let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
      endpoint.to_string()
    } else if endpoint.starts_with('/') {
      format!("{}{}", self.base_url, endpoint)
    } else {
      format!("{}/{}", self.base_url, endpoint)
    };
    Url::parse(&raw).map_err(|source| ApiError::InvalidUrl { url: raw, source })
  }

  /// GET a listing endpoint with the given query pairs
  pub async fn get_listing(
    &self,
    endpoint: &str,
    params: &[(String, String)],
  ) -> Result<Value, ApiError> {
    let mut url = self.url(endpoint)?;
    if !params.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in params {
        pairs.append_pair(key, value);
      }
    }

    debug!(%url, "GET listing");
    let Some(text) = self.send_raw(self.client.get(url)).await? else {
      return Ok(Value::Null);
    };

    // A 2xx page that is not JSON decodes as an empty listing
    match serde_json::from_str(&text) {
      Ok(body) => Ok(body),
      Err(e) => {
        warn!(endpoint, error = %e, "Listing response is not JSON");
        Ok(Value::String(text))
      }
    }
  }

  /// Create a record (POST to the resource endpoint)
  pub async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
    let url = self.url(endpoint)?;
    info!(%url, "Creating record");
    self.send(self.client.request(Method::POST, url).json(body)).await
  }

  /// URL of one record below `endpoint`, with `id` encoded as a single path segment
  fn record_url(&self, endpoint: &str, id: &str) -> Result<Url, ApiError> {
    let mut url = self.url(endpoint)?;
    url
      .path_segments_mut()
      .map_err(|_| ApiError::NotABase {
        url: endpoint.to_string(),
      })?
      .pop_if_empty()
      .push(id);
    Ok(url)
  }

  /// Update a record (POST to the record endpoint)
  pub async fn update(&self, endpoint: &str, id: &str, body: &Value) -> Result<Value, ApiError> {
    let url = self.record_url(endpoint, id)?;
    info!(%url, "Updating record");
    self.send(self.client.request(Method::POST, url).json(body)).await
  }

  /// Delete a record
  pub async fn delete(&self, endpoint: &str, id: &str) -> Result<Value, ApiError> {
    let url = self.record_url(endpoint, id)?;
    info!(%url, "Deleting record");
    self.send(self.client.delete(url)).await
  }

  async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
    match self.send_raw(request).await? {
      Some(text) => Ok(serde_json::from_str(&text)?),
      None => Ok(Value::Null),
    }
  }

  /// Body of a successful response, `None` when there is no content
  async fn send_raw(&self, request: RequestBuilder) -> Result<Option<String>, ApiError> {
    let mut request = request.header(ACCEPT, "application/json");
    if let Some(token) = self.session.token() {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
      if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(None);
      }
      return Ok(Some(text));
    }

    let error = classify_error(status, &text);
    if error.is_unauthenticated() {
      warn!(status = status.as_u16(), "Session rejected by server");
      if let Some(callback) = &self.on_session_expired {
        callback();
      }
    } else {
      debug!(status = status.as_u16(), error = %error, "Request failed");
    }
    Err(error)
  }
}

/// Map a failed response onto an [`ApiError`].
///
/// 401, an "Unauthenticated." message, or a 500 raised by an authentication
/// exception all count as an expired session.
pub fn classify_error(status: StatusCode, text: &str) -> ApiError {
  let body = ApiErrorBody::parse(text);

  let message_is_unauthenticated = body
    .message
    .as_deref()
    .map(|m| m.trim().trim_end_matches('.').eq_ignore_ascii_case("unauthenticated"))
    .unwrap_or(false);
  let auth_exception = status == StatusCode::INTERNAL_SERVER_ERROR
    && [body.exception.as_deref(), body.message.as_deref()]
      .into_iter()
      .flatten()
      .any(|s| s.contains("AuthenticationException"));

  if status == StatusCode::UNAUTHORIZED || message_is_unauthenticated || auth_exception {
    return ApiError::Unauthenticated;
  }

  let message = body
    .message
    .filter(|m| !m.trim().is_empty())
    .or_else(|| status.canonical_reason().map(String::from))
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

  ApiError::Http {
    status: status.as_u16(),
    message,
    field_errors: body.errors,
  }
}

impl PageFetcher for ApiClient {
  fn fetch_page<'a>(
    &'a self,
    endpoint: &'a str,
    params: &'a [(String, String)],
  ) -> BoxFuture<'a, Result<Value, ApiError>> {
    Box::pin(self.get_listing(endpoint, params))
  }
}

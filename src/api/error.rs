use std::collections::BTreeMap;

/// Errors returned by the REST API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The server rejected the bearer token; the session has been expired
  #[error("Session expired, please log in again")]
  Unauthenticated,
  #[error("{message} (HTTP {status})")]
  Http {
    status: u16,
    message: String,
    /// Validation errors keyed by form field
    field_errors: BTreeMap<String, Vec<String>>,
  },
  #[error("Request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("Invalid response body: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("Invalid URL '{url}': {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },
  #[error("Cannot address records below '{url}'")]
  NotABase { url: String },
}

impl ApiError {
  pub fn is_unauthenticated(&self) -> bool {
    matches!(self, ApiError::Unauthenticated)
  }

  /// Flatten the error into lines suitable for individual notifications.
  ///
  /// The summary comes first, followed by one line per field error.
  pub fn messages(&self) -> Vec<String> {
    match self {
      ApiError::Http {
        status,
        message,
        field_errors,
      } => {
        let mut lines = Vec::new();
        if !message.is_empty() {
          lines.push(message.clone());
        }
        for (field, errors) in field_errors {
          for error in errors {
            lines.push(format!("{}: {}", field, error));
          }
        }
        if lines.is_empty() {
          lines.push(format!("HTTP {}", status));
        }
        lines
      }
      ApiError::Transport(e) if e.is_timeout() => vec!["Request timed out".to_string()],
      other => vec![other.to_string()],
    }
  }
}

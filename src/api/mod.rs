//! REST API access: HTTP client, response decoding and error types.

mod client;
mod error;
mod types;

pub use client::{classify_error, ApiClient, SessionExpiredFn};
pub use error::ApiError;
pub use types::{decode_listing, ApiErrorBody, PageResult};

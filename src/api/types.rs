//! Wire shapes of the listing and error responses.
//!
//! Listing bodies are decoded through an explicit schema; anything that does
//! not fit decodes to an empty page instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One page of records from a listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
  /// Records in server order; opaque to the client
  pub items: Vec<Value>,
  pub total_rows: u64,
  /// The whole decoded response body
  pub root_data: Option<Value>,
}

impl PageResult {
  pub fn empty() -> Self {
    Self {
      items: Vec::new(),
      total_rows: 0,
      root_data: None,
    }
  }
}

#[derive(Debug, Deserialize)]
struct ListingBody {
  data: Vec<Value>,
  #[serde(default)]
  meta: Option<Value>,
  #[serde(default)]
  total: Option<Value>,
}

/// Decode a listing response.
///
/// `data` must be an array. The row count is `meta.total`, then `total`,
/// then 0.
pub fn decode_listing(body: Value) -> PageResult {
  let listing = match ListingBody::deserialize(&body) {
    Ok(listing) => listing,
    Err(e) => {
      tracing::debug!(error = %e, "Listing body has no data array, treating as empty");
      return PageResult {
        items: Vec::new(),
        total_rows: 0,
        root_data: Some(body),
      };
    }
  };

  let total_rows = listing
    .meta
    .as_ref()
    .and_then(|meta| meta.get("total"))
    .and_then(as_count)
    .or_else(|| listing.total.as_ref().and_then(as_count))
    .unwrap_or(0);

  PageResult {
    items: listing.data,
    total_rows,
    root_data: Some(body),
  }
}

/// Accept counts sent as numbers or numeric strings
fn as_count(value: &Value) -> Option<u64> {
  match value {
    Value::Number(n) => n
      .as_u64()
      .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Field errors arrive either as a list of messages or a single message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldMessages {
  Many(Vec<String>),
  One(String),
}

/// Error body returned by mutation and listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub exception: Option<String>,
  #[serde(default, deserialize_with = "deserialize_field_errors")]
  pub errors: BTreeMap<String, Vec<String>>,
}

fn deserialize_field_errors<'de, D>(
  deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let raw: Option<BTreeMap<String, FieldMessages>> = Option::deserialize(deserializer)?;
  Ok(
    raw
      .unwrap_or_default()
      .into_iter()
      .map(|(field, messages)| {
        let messages = match messages {
          FieldMessages::Many(v) => v,
          FieldMessages::One(s) => vec![s],
        };
        (field, messages)
      })
      .collect(),
  )
}

impl ApiErrorBody {
  /// Parse an error body, returning the default on anything that is not JSON
  pub fn parse(text: &str) -> Self {
    serde_json::from_str(text).unwrap_or_default()
  }
}

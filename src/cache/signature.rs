//! Cache keys for listing requests.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Everything that identifies one listing request.
///
/// Two signatures are equal iff all components serialize identically. Extra
/// query parameters live in a sorted map so insertion order never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestSignature {
  pub endpoint: String,
  pub page: u32,
  pub limit: u32,
  pub search: String,
  pub query: BTreeMap<String, String>,
  /// Caller-declared dependencies (values the listing implicitly depends on)
  pub deps: Vec<String>,
}

impl RequestSignature {
  /// Stable, fixed-length storage key
  pub fn cache_hash(&self) -> String {
    // Serializing a struct of strings, integers and string maps cannot fail
    let input = serde_json::to_string(self).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Human readable description for logs and cache rows
  pub fn description(&self) -> String {
    let mut desc = format!("{} page {} ({}/page)", self.endpoint, self.page, self.limit);
    if !self.search.is_empty() {
      desc.push_str(&format!(" search '{}'", self.search));
    }
    if !self.query.is_empty() {
      let filters: Vec<String> = self
        .query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
      desc.push_str(&format!(" [{}]", filters.join(", ")));
    }
    desc
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn signature(search: &str) -> RequestSignature {
    RequestSignature {
      endpoint: "/widgets".to_string(),
      page: 1,
      limit: 10,
      search: search.to_string(),
      query: BTreeMap::new(),
      deps: Vec::new(),
    }
  }

  #[test]
  fn test_hash_is_stable_hex() {
    let a = signature("abc");
    assert_eq!(a.cache_hash(), signature("abc").cache_hash());
    assert_eq!(a.cache_hash().len(), 64);
  }

  #[test]
  fn test_every_component_matters() {
    let base = signature("");
    let variants = [
      RequestSignature {
        page: 2,
        ..base.clone()
      },
      RequestSignature {
        limit: 25,
        ..base.clone()
      },
      signature("abc"),
      RequestSignature {
        query: BTreeMap::from([("status".to_string(), "active".to_string())]),
        ..base.clone()
      },
      RequestSignature {
        deps: vec!["brand:3".to_string()],
        ..base.clone()
      },
    ];

    for variant in variants {
      assert_ne!(variant.cache_hash(), base.cache_hash(), "{:?}", variant);
    }
  }

  #[test]
  fn test_query_order_irrelevant() {
    let mut a = BTreeMap::new();
    a.insert("status".to_string(), "paid".to_string());
    a.insert("brand".to_string(), "7".to_string());
    let mut b = BTreeMap::new();
    b.insert("brand".to_string(), "7".to_string());
    b.insert("status".to_string(), "paid".to_string());

    let sa = RequestSignature {
      query: a,
      ..signature("")
    };
    let sb = RequestSignature {
      query: b,
      ..signature("")
    };
    assert_eq!(sa.cache_hash(), sb.cache_hash());
  }

  #[test]
  fn test_description() {
    let sig = RequestSignature {
      query: BTreeMap::from([("status".to_string(), "paid".to_string())]),
      ..signature("acme")
    };
    assert_eq!(
      sig.description(),
      "/widgets page 1 (10/page) search 'acme' [status=paid]"
    );
  }
}

use serde_json::Value;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
  }
}

/// Render a JSON value as a single table cell
pub fn cell_text(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.replace('\n', " "),
    Some(Value::Bool(true)) => "yes".to_string(),
    Some(Value::Bool(false)) => "no".to_string(),
    Some(Value::Number(n)) => n.to_string(),
    // Nested objects usually carry a display name
    Some(Value::Object(map)) => ["name", "title", "label"]
      .iter()
      .find_map(|k| map.get(*k).and_then(Value::as_str))
      .map(str::to_string)
      .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
    Some(Value::Array(items)) => format!("[{}]", items.len()),
  }
}

/// Columns to show when none are configured: keys of the first record
pub fn infer_columns(items: &[Value]) -> Vec<String> {
  items
    .first()
    .and_then(Value::as_object)
    .map(|record| record.keys().cloned().collect())
    .unwrap_or_default()
}

/// Identifier of a record, as used in record paths
pub fn record_id(record: &Value, id_field: &str) -> Option<String> {
  match record.get(id_field)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
  }

  #[test]
  fn test_cell_text() {
    assert_eq!(cell_text(None), "");
    assert_eq!(cell_text(Some(&json!(null))), "");
    assert_eq!(cell_text(Some(&json!("a\nb"))), "a b");
    assert_eq!(cell_text(Some(&json!(12.5))), "12.5");
    assert_eq!(cell_text(Some(&json!(true))), "yes");
    assert_eq!(cell_text(Some(&json!({ "id": 3, "name": "Acme" }))), "Acme");
    assert_eq!(cell_text(Some(&json!({ "id": 3 }))), r#"{"id":3}"#);
    assert_eq!(cell_text(Some(&json!([1, 2, 3]))), "[3]");
  }

  #[test]
  fn test_infer_columns() {
    let items = vec![json!({ "id": 1, "name": "Acme" }), json!({ "other": 1 })];
    assert_eq!(infer_columns(&items), vec!["id", "name"]);
    assert!(infer_columns(&[]).is_empty());
    assert!(infer_columns(&[json!(5)]).is_empty());
  }

  #[test]
  fn test_record_id() {
    assert_eq!(record_id(&json!({ "id": 7 }), "id"), Some("7".to_string()));
    assert_eq!(
      record_id(&json!({ "uuid": "ab-1" }), "uuid"),
      Some("ab-1".to_string())
    );
    assert_eq!(record_id(&json!({ "id": "" }), "id"), None);
    assert_eq!(record_id(&json!({ "name": "x" }), "id"), None);
  }
}

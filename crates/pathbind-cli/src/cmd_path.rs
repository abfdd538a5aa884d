use crate::json_io::{print_json, read_tree};
use anyhow::{Context, Result};
use pathbind::v1::path;
use serde_json::Value;
use std::path::Path;

pub fn run_tokenize(dotted: &str, pretty: bool) -> Result<()> {
    print_json(&path::tokenize(dotted), pretty)
}

pub fn run_get(input: &Path, dotted: &str, pretty: bool) -> Result<()> {
    let tree = read_tree(input)?;
    print_json(&lookup(&tree, dotted), pretty)
}

pub fn run_set(input: &Path, dotted: &str, value: &str, pretty: bool) -> Result<()> {
    let mut tree = read_tree(input)?;
    assign(&mut tree, dotted, value)?;
    print_json(&tree, pretty)
}

static NULL: Value = Value::Null;

fn lookup<'a>(tree: &'a Value, dotted: &str) -> &'a Value {
    path::get(tree, dotted).unwrap_or(&NULL)
}

fn assign(tree: &mut Value, dotted: &str, value: &str) -> Result<()> {
    let value: Value =
        serde_json::from_str(value).with_context(|| format!("--value is not JSON: {value}"))?;
    path::set(tree, dotted, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_io::write_temp_json;
    use serde_json::json;

    #[test]
    fn test_tokenize_as_json() {
        let tokens = serde_json::to_value(path::tokenize("a.0.b")).unwrap();
        assert_eq!(
            tokens,
            json!([
                {"segment": "a", "next": "sequence"},
                {"segment": "0", "next": "mapping"},
                {"segment": "b", "next": null}
            ])
        );
    }

    #[test]
    fn test_lookup_missing_is_null() {
        let tree = json!({"a": {"b": 1}});
        assert_eq!(lookup(&tree, "a.b"), &json!(1));
        assert_eq!(lookup(&tree, "a.c"), &Value::Null);
        assert_eq!(lookup(&tree, "a.b.c"), &Value::Null);
    }

    #[test]
    fn test_assign_parses_value() {
        let mut tree = json!({});
        assign(&mut tree, "addresses.0.city", r#""Lisbon""#).unwrap();
        assert_eq!(tree, json!({"addresses": [{"city": "Lisbon"}]}));
    }

    #[test]
    fn test_assign_rejects_bad_json() {
        let mut tree = json!({});
        let err = assign(&mut tree, "a", "not json").unwrap_err();
        assert!(err.to_string().starts_with("--value is not JSON"));
        assert_eq!(tree, json!({}));
    }

    #[test]
    fn test_assign_through_leaf_fails() {
        let mut tree = json!({"a": 1});
        assert!(assign(&mut tree, "a.b", "2").is_err());
    }

    #[test]
    fn test_run_get_and_set() {
        let f = write_temp_json(&json!({"rows": [1]}));
        assert!(run_get(f.path(), "rows.0", false).is_ok());
        assert!(run_set(f.path(), "rows.3", "true", true).is_ok());
        assert!(run_tokenize("rows.3", false).is_ok());
    }
}

//! Dotted-path addressing for JSON trees.

use crate::error::PathError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Shape of the container a non-terminal segment leads into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Sequence,
    Mapping,
}

impl ContainerKind {
    /// The kind of container that `segment` indexes into.
    pub fn addressed_by(segment: &str) -> Self {
        if is_index(segment) {
            ContainerKind::Sequence
        } else {
            ContainerKind::Mapping
        }
    }

    /// A fresh, empty container of this kind.
    pub fn empty(self) -> Value {
        match self {
            ContainerKind::Sequence => Value::Array(Vec::new()),
            ContainerKind::Mapping => Value::Object(Map::new()),
        }
    }
}

/// One segment of a dotted path.
///
/// `next` is the kind of container the following segment addresses, or
/// `None` for the terminal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub segment: &'a str,
    pub next: Option<ContainerKind>,
}

impl Token<'_> {
    /// The segment as a sequence index, if it is one.
    pub fn index(&self) -> Option<usize> {
        if is_index(self.segment) {
            self.segment.parse().ok()
        } else {
            None
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split a dotted path into tokens.
///
/// # Examples
///
/// ```
/// use pathbind::v1::path::{ContainerKind, tokenize};
///
/// let tokens = tokenize("addresses.0.city");
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0].next, Some(ContainerKind::Sequence));
/// assert_eq!(tokens[1].next, Some(ContainerKind::Mapping));
/// assert!(tokens[2].is_terminal());
/// ```
pub fn tokenize(path: &str) -> Vec<Token<'_>> {
    if path.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = path.split('.').collect();
    segments
        .iter()
        .copied()
        .enumerate()
        .map(|(i, segment)| Token {
            segment,
            next: segments.get(i + 1).map(|s| ContainerKind::addressed_by(s)),
        })
        .collect()
}

/// Look up the value at `path`.
///
/// Returns `None` when any step is missing, out of bounds, or lands on a
/// leaf. Never modifies the tree.
///
/// # Examples
///
/// ```
/// use pathbind::v1::path;
/// use serde_json::json;
///
/// let tree = json!({"users": [{"first_name": "Ann"}]});
/// assert_eq!(path::get(&tree, "users.0.first_name"), Some(&json!("Ann")));
/// assert_eq!(path::get(&tree, "users.3.first_name"), None);
/// ```
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    tokenize(path)
        .iter()
        .try_fold(tree, |current, token| match current {
            Value::Object(map) => map.get(token.segment),
            Value::Array(items) => token.index().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// Missing or null intermediate slots become an empty sequence or mapping,
/// chosen by the shape of the next segment. Writing past the end of a
/// sequence grows it, filling the gap with nulls.
///
/// # Examples
///
/// ```
/// use pathbind::v1::path;
/// use serde_json::json;
///
/// let mut tree = json!({});
/// path::set(&mut tree, "addresses.0.city", json!("Lisbon")).unwrap();
/// assert_eq!(tree, json!({"addresses": [{"city": "Lisbon"}]}));
/// ```
pub fn set(tree: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let tokens = tokenize(path);
    let Some((last, intermediate)) = tokens.split_last() else {
        *tree = value;
        return Ok(());
    };

    if tree.is_null() {
        *tree = ContainerKind::addressed_by(tokens[0].segment).empty();
    }

    let mut current = tree;
    for token in intermediate {
        let slot = child_mut(current, token, path)?;
        if slot.is_null()
            && let Some(kind) = token.next
        {
            *slot = kind.empty();
        }
        current = slot;
    }

    *child_mut(current, last, path)? = value;
    Ok(())
}

fn child_mut<'v>(
    current: &'v mut Value,
    token: &Token<'_>,
    path: &str,
) -> Result<&'v mut Value, PathError> {
    match current {
        Value::Object(map) => Ok(map.entry(token.segment).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = token.index().ok_or_else(|| PathError::NotAnIndex {
                path: path.to_string(),
                segment: token.segment.to_string(),
            })?;
            if index >= items.len() {
                let len = index
                    .checked_add(1)
                    .ok_or_else(|| PathError::IndexTooLarge {
                        path: path.to_string(),
                        segment: token.segment.to_string(),
                    })?;
                items.resize(len, Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => Err(PathError::NotAContainer {
            path: path.to_string(),
            segment: token.segment.to_string(),
        }),
    }
}

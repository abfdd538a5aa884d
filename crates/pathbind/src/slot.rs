//! Type-erased field values and the static description of field types.

use crate::build::build;
use crate::convert::{Memo, convert_node};
use crate::error::{Result, SlotError};
use crate::node::{AnyNode, Node, Parent, WeakNode};
use crate::record::Record;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::type_name;
use std::fmt;
use std::rc::Rc;

/// A field value in flight between a record and a tree.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Raw tree data: primitives, null, or containers of them.
    Value(Value),
    /// A record.
    Node(AnyNode),
    /// A sequence whose items may be records.
    Seq(Vec<Slot>),
    /// A parent back-reference.
    Parent(Option<WeakNode>),
}

impl Slot {
    pub fn null() -> Self {
        Slot::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Slot::Value(Value::Null) | Slot::Parent(None))
    }

    /// Encode any serializable value as a raw slot.
    pub fn encode<U: Serialize + ?Sized>(value: &U) -> Self {
        Slot::Value(serde_json::to_value(value).unwrap_or(Value::Null))
    }

    /// Decode a raw slot into a deserializable value.
    pub fn decode<U: DeserializeOwned>(self) -> std::result::Result<U, SlotError> {
        match self {
            Slot::Value(value) => Ok(serde_json::from_value(value)?),
            Slot::Seq(_) => Ok(serde_json::from_value(self.into_tree())?),
            other => Err(SlotError::Mismatch {
                expected: type_name::<U>(),
                found: other.kind(),
            }),
        }
    }

    /// Short description of what the slot holds, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::Value(Value::Null) => "null",
            Slot::Value(Value::Bool(_)) => "bool",
            Slot::Value(Value::Number(_)) => "number",
            Slot::Value(Value::String(_)) => "string",
            Slot::Value(Value::Array(_)) => "array",
            Slot::Value(Value::Object(_)) => "object",
            Slot::Node(node) => node.type_name(),
            Slot::Seq(_) => "sequence",
            Slot::Parent(_) => "parent reference",
        }
    }

    /// Collapse into tree data.
    ///
    /// Records and back-references have no tree form of their own and become
    /// null; serialize records before collapsing.
    pub fn into_tree(self) -> Value {
        match self {
            Slot::Value(value) => value,
            Slot::Seq(items) => Value::Array(items.into_iter().map(Slot::into_tree).collect()),
            Slot::Node(_) | Slot::Parent(_) => Value::Null,
        }
    }
}

type BuildFn = fn(&Value, Option<&AnyNode>) -> Result<AnyNode>;
type ConvertFn = fn(&AnyNode, &mut Memo) -> Result<AnyNode>;

#[derive(Clone, Copy)]
struct Structure {
    build: BuildFn,
    convert: ConvertFn,
}

/// The leaf type of a field once `Option` and `Vec` wrappers are stripped.
///
/// Structured element types are records; they carry the entry points used to
/// build and convert them without knowing the concrete type at the call site.
#[derive(Clone, Copy)]
pub struct ElementType {
    name: &'static str,
    structure: Option<Structure>,
}

impl ElementType {
    /// A record element type.
    pub fn record<T: Record>() -> Self {
        ElementType {
            name: T::type_name(),
            structure: Some(Structure {
                build: |tree, parent| build::<T>(tree, parent).map(AnyNode::from),
                convert: |source, memo| convert_node::<T>(source, None, memo).map(AnyNode::from),
            }),
        }
    }

    /// A plain data element type, passed through untouched.
    pub fn value<U: ?Sized>() -> Self {
        ElementType {
            name: type_name::<U>(),
            structure: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_structured(&self) -> bool {
        self.structure.is_some()
    }

    pub(crate) fn build(&self, tree: &Value, parent: Option<&AnyNode>) -> Result<Option<AnyNode>> {
        self.structure
            .map(|s| (s.build)(tree, parent))
            .transpose()
    }

    pub(crate) fn convert(&self, source: &AnyNode, memo: &mut Memo) -> Result<Option<AnyNode>> {
        self.structure
            .map(|s| (s.convert)(source, memo))
            .transpose()
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementType")
            .field("name", &self.name)
            .field("structured", &self.is_structured())
            .finish()
    }
}

/// Apply `leaf` to every element of `slot`, descending through nested
/// sequences.
///
/// Null passes through untouched, as does everything when the element type is
/// not a record.
pub(crate) fn map_leaves<F>(slot: Slot, element: &ElementType, leaf: &mut F) -> Result<Slot>
where
    F: FnMut(Slot, &ElementType) -> Result<Slot>,
{
    if !element.is_structured() {
        return Ok(slot);
    }
    recurse_nested(slot, element, leaf)
}

fn recurse_nested<F>(slot: Slot, element: &ElementType, leaf: &mut F) -> Result<Slot>
where
    F: FnMut(Slot, &ElementType) -> Result<Slot>,
{
    match slot {
        Slot::Value(Value::Null) => Ok(slot),
        Slot::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(recurse_nested(item, element, leaf)?);
            }
            Ok(Slot::Seq(out))
        }
        Slot::Value(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(recurse_nested(Slot::Value(item), element, leaf)?);
            }
            Ok(Slot::Seq(out))
        }
        other => leaf(other, element),
    }
}

/// Rust types that can sit in a record field.
///
/// The element type strips `Option` and any depth of `Vec`, so a field typed
/// `T`, `Option<T>`, `Vec<T>` or `Vec<Vec<T>>` is built, serialized, and
/// converted the same way.
pub trait Mapped: Sized {
    fn element_type() -> ElementType;

    /// Whether the field is a back-reference to the owning record.
    fn is_parent_ref() -> bool {
        false
    }

    fn to_slot(&self) -> Slot;

    fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError>;
}

macro_rules! impl_mapped_for_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Mapped for $ty {
                fn element_type() -> ElementType {
                    ElementType::value::<$ty>()
                }

                fn to_slot(&self) -> Slot {
                    Slot::encode(self)
                }

                fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError> {
                    slot.decode()
                }
            }
        )*
    };
}

impl_mapped_for_data!(
    String,
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Value,
    Map<String, Value>,
);

impl<T: Mapped> Mapped for Option<T> {
    fn element_type() -> ElementType {
        T::element_type()
    }

    fn is_parent_ref() -> bool {
        T::is_parent_ref()
    }

    fn to_slot(&self) -> Slot {
        match self {
            Some(value) => value.to_slot(),
            None => Slot::null(),
        }
    }

    fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError> {
        if slot.is_null() {
            Ok(None)
        } else {
            T::from_slot(slot).map(Some)
        }
    }
}

impl<T: Mapped> Mapped for Vec<T> {
    fn element_type() -> ElementType {
        T::element_type()
    }

    fn to_slot(&self) -> Slot {
        Slot::Seq(self.iter().map(Mapped::to_slot).collect())
    }

    fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError> {
        match slot {
            Slot::Seq(items) => items.into_iter().map(T::from_slot).collect(),
            Slot::Value(Value::Array(items)) => items
                .into_iter()
                .map(|item| T::from_slot(Slot::Value(item)))
                .collect(),
            other => Err(SlotError::Mismatch {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }
}

impl<T: Record> Mapped for Node<T> {
    fn element_type() -> ElementType {
        ElementType::record::<T>()
    }

    fn to_slot(&self) -> Slot {
        Slot::Node(AnyNode::from(Rc::clone(self)))
    }

    fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError> {
        match slot {
            Slot::Node(node) => node.downcast::<T>().ok_or(SlotError::Mismatch {
                expected: T::type_name(),
                found: node.type_name(),
            }),
            other => Err(SlotError::Mismatch {
                expected: T::type_name(),
                found: other.kind(),
            }),
        }
    }
}

impl<T: Record> Mapped for Parent<T> {
    fn element_type() -> ElementType {
        ElementType::record::<T>()
    }

    fn is_parent_ref() -> bool {
        true
    }

    fn to_slot(&self) -> Slot {
        Slot::Parent(self.weak_node())
    }

    fn from_slot(slot: Slot) -> std::result::Result<Self, SlotError> {
        match slot {
            Slot::Parent(Some(weak)) => match weak.upgrade() {
                Some(node) => node
                    .downcast::<T>()
                    .map(|parent| Parent::from(&parent))
                    .ok_or(SlotError::Mismatch {
                        expected: T::type_name(),
                        found: node.type_name(),
                    }),
                None => Ok(Parent::default()),
            },
            Slot::Node(node) => node
                .downcast::<T>()
                .map(|parent| Parent::from(&parent))
                .ok_or(SlotError::Mismatch {
                    expected: T::type_name(),
                    found: node.type_name(),
                }),
            other if other.is_null() => Ok(Parent::default()),
            other => Err(SlotError::Mismatch {
                expected: "parent reference",
                found: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_type_unwraps_wrappers() {
        assert!(<Option<String>>::element_type().name().ends_with("String"));
        assert_eq!(<Vec<Vec<i64>>>::element_type().name(), "i64");
        assert!(!<Vec<Option<bool>>>::element_type().is_structured());
    }

    #[test]
    fn test_data_round_trip_through_slot() {
        let names = vec!["a".to_string(), "b".to_string()];
        let slot = names.to_slot();
        assert_eq!(slot.clone().into_tree(), json!(["a", "b"]));
        assert_eq!(<Vec<String>>::from_slot(slot).unwrap(), names);
    }

    #[test]
    fn test_option_from_null() {
        assert_eq!(<Option<i64>>::from_slot(Slot::null()).unwrap(), None);
        assert_eq!(
            <Option<i64>>::from_slot(Slot::Value(json!(3))).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_decode_mismatch() {
        let err = String::from_slot(Slot::Value(json!(3))).unwrap_err();
        assert!(matches!(err, SlotError::Decode(_)));
        let err = <Vec<String>>::from_slot(Slot::Value(json!("x"))).unwrap_err();
        assert!(matches!(
            err,
            SlotError::Mismatch {
                expected: "sequence",
                found: "string"
            }
        ));
    }

    #[test]
    fn test_map_leaves_skips_data_types() {
        let element = ElementType::value::<String>();
        let slot = Slot::Value(json!(["a"]));
        let mut calls = 0;
        let out = map_leaves(slot, &element, &mut |leaf, _| {
            calls += 1;
            Ok(leaf)
        })
        .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(out.into_tree(), json!(["a"]));
    }
}

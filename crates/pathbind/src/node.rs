//! Object-graph handles: owned nodes, weak parent links, and their erased forms.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::registry::registry;
use crate::serialize::serialize;
use crate::slot::Slot;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// An owned record in an object graph.
pub type Node<T> = Rc<RefCell<T>>;

/// Wrap a record into a fresh node.
pub fn node<T: Record>(record: T) -> Node<T> {
    Rc::new(RefCell::new(record))
}

/// A back-reference to the record that owns this one.
///
/// Holds a weak link: it never keeps the parent alive and is never followed
/// when serializing. Two parents compare equal when both are set or both are
/// unset, so structural equality of records stops at back-references; use
/// [`Parent::is`] to compare identity.
pub struct Parent<T>(Weak<RefCell<T>>);

impl<T> Parent<T> {
    pub fn upgrade(&self) -> Option<Node<T>> {
        self.0.upgrade()
    }

    pub fn is_set(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this back-reference points at `node`.
    pub fn is(&self, node: &Node<T>) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(node))
    }
}

impl<T: Record> Parent<T> {
    pub(crate) fn weak_node(&self) -> Option<WeakNode> {
        let weak: Weak<dyn DynNode> = self.0.clone();
        self.is_set().then_some(WeakNode(weak))
    }
}

impl<T> From<&Node<T>> for Parent<T> {
    fn from(node: &Node<T>) -> Self {
        Parent(Rc::downgrade(node))
    }
}

impl<T> Default for Parent<T> {
    fn default() -> Self {
        Parent(Weak::new())
    }
}

impl<T> Clone for Parent<T> {
    fn clone(&self) -> Self {
        Parent(Weak::clone(&self.0))
    }
}

impl<T> PartialEq for Parent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.is_set() == other.is_set()
    }
}

impl<T> fmt::Debug for Parent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "Parent(..)")
        } else {
            write!(f, "Parent(None)")
        }
    }
}

/// Object-safe view of a `RefCell<T: Record>`.
pub(crate) trait DynNode {
    fn type_name(&self) -> &'static str;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
    fn read_field(&self, name: &str) -> Result<Option<Slot>>;
    fn serialize(&self) -> Result<Value>;
}

impl<T: Record> DynNode for RefCell<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn read_field(&self, name: &str) -> Result<Option<Slot>> {
        let registry = registry::<T>()?;
        let record = self.try_borrow().map_err(|_| Error::Borrowed {
            type_name: T::type_name(),
        })?;

        if let Some(field) = registry.field(name) {
            return Ok(Some(field.read(&record)));
        }
        if let Some(computed) = registry.computed_field(name) {
            return Ok(Some(computed.read(&record)));
        }
        Ok(record.attribute(name))
    }

    fn serialize(&self) -> Result<Value> {
        let record = self.try_borrow().map_err(|_| Error::Borrowed {
            type_name: T::type_name(),
        })?;
        serialize(&*record)
    }
}

/// A node of any record type.
#[derive(Clone)]
pub struct AnyNode(Rc<dyn DynNode>);

impl AnyNode {
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Address of the underlying allocation; stable for the node's lifetime.
    pub fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    pub fn ptr_eq(&self, other: &AnyNode) -> bool {
        self.identity() == other.identity()
    }

    pub fn downcast<T: Record>(&self) -> Option<Node<T>> {
        Rc::clone(&self.0).into_any().downcast::<RefCell<T>>().ok()
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub(crate) fn read_field(&self, name: &str) -> Result<Option<Slot>> {
        self.0.read_field(name)
    }

    /// Serialize the record behind this node.
    pub fn serialize(&self) -> Result<Value> {
        self.0.serialize()
    }
}

impl<T: Record> From<Node<T>> for AnyNode {
    fn from(node: Node<T>) -> Self {
        AnyNode(node)
    }
}

impl fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyNode({} @ {:p})", self.type_name(), self.identity())
    }
}

/// Weak counterpart of [`AnyNode`].
#[derive(Clone)]
pub struct WeakNode(Weak<dyn DynNode>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<AnyNode> {
        self.0.upgrade().map(AnyNode)
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({})", node.type_name()),
            None => write!(f, "WeakNode(dropped)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldValues};

    #[derive(Debug, Default, PartialEq)]
    struct Leaf {
        label: String,
        owner: Parent<Leaf>,
    }

    impl Record for Leaf {
        fn fields() -> Vec<Field<Self>> {
            vec![
                Field::new("label", |l: &Leaf| &l.label),
                Field::new("owner", |l: &Leaf| &l.owner),
            ]
        }

        fn construct(values: &mut FieldValues) -> Result<Self> {
            Ok(Leaf {
                label: values.take_or_default("label")?,
                owner: values.take("owner")?,
            })
        }
    }

    #[derive(Debug, Default)]
    struct Other;

    impl Record for Other {
        fn fields() -> Vec<Field<Self>> {
            Vec::new()
        }

        fn construct(_values: &mut FieldValues) -> Result<Self> {
            Ok(Other)
        }
    }

    #[test]
    fn test_parent_is_weak() {
        let owner = node(Leaf::default());
        let parent = Parent::from(&owner);
        assert!(parent.is_set());
        assert!(parent.is(&owner));
        drop(owner);
        assert!(!parent.is_set());
        assert!(parent.upgrade().is_none());
    }

    #[test]
    fn test_parent_equality_ignores_identity() {
        let a = node(Leaf::default());
        let b = node(Leaf::default());
        assert_eq!(Parent::from(&a), Parent::from(&b));
        assert_ne!(Parent::from(&a), Parent::<Leaf>::default());
    }

    #[test]
    fn test_any_node_downcast() {
        let leaf = node(Leaf {
            label: "x".into(),
            owner: Parent::default(),
        });
        let any = AnyNode::from(Rc::clone(&leaf));
        assert_eq!(any.type_name(), "Leaf");
        assert!(Rc::ptr_eq(&any.downcast::<Leaf>().unwrap(), &leaf));
        assert!(any.downcast::<Other>().is_none());
        assert_eq!(any.identity(), Rc::as_ptr(&leaf) as *const ());
    }

    #[test]
    fn test_read_field_by_name() {
        let leaf = node(Leaf {
            label: "x".into(),
            owner: Parent::default(),
        });
        let any = AnyNode::from(leaf);
        let slot = any.read_field("label").unwrap().unwrap();
        assert_eq!(slot.into_tree(), serde_json::json!("x"));
        assert!(any.read_field("missing").unwrap().is_none());
    }

    #[test]
    fn test_read_field_while_mutably_borrowed() {
        let leaf = node(Leaf::default());
        let any = AnyNode::from(Rc::clone(&leaf));
        let _guard = leaf.borrow_mut();
        assert!(matches!(
            any.read_field("label"),
            Err(Error::Borrowed { type_name: "Leaf" })
        ));
    }

    #[test]
    fn test_debug_does_not_follow_parent() {
        let owner = node(Leaf::default());
        let child = Leaf {
            label: "c".into(),
            owner: Parent::from(&owner),
        };
        assert!(format!("{:?}", child).contains("Parent(..)"));
    }
}

//! Building object graphs from tree data.

use crate::error::{Error, Result, SlotError};
use crate::navigator;
use crate::node::{AnyNode, Node};
use crate::record::{FieldValues, Record};
use crate::registry::registry;
use crate::slot::{ElementType, Slot, map_leaves};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Build a `T` from `tree`, with no parent.
pub fn create<T: Record>(tree: &Value) -> Result<Node<T>> {
    build(tree, None)
}

/// Build a `T` from `tree`.
///
/// Back-reference fields receive `parent`; every record built for a nested
/// field receives the new instance as its parent. Computed setters run after
/// all direct fields are in place, then [`Record::post_init`].
pub fn build<T: Record>(tree: &Value, parent: Option<&AnyNode>) -> Result<Node<T>> {
    let registry = registry::<T>()?;
    tracing::trace!(type_name = registry.type_name(), "building record");

    let node: Node<T> = Rc::new(RefCell::new(T::default()));
    let this = AnyNode::from(Rc::clone(&node));

    let mut values = FieldValues::new(registry.type_name());
    for field in registry.fields() {
        let slot = if field.is_parent_ref() {
            Slot::Parent(parent.map(AnyNode::downgrade))
        } else {
            map_leaves(
                lookup(tree, field.path_str()),
                field.element_type(),
                &mut |slot: Slot, element: &ElementType| {
                    build_leaf(slot, element, &this, field.name())
                },
            )?
        };
        values.insert(field.name(), slot);
    }

    let record = T::construct(&mut values)?;
    *borrow_mut(&node)? = record;

    for computed in registry.computed().iter().filter(|c| c.has_setter()) {
        let slot = map_leaves(
            lookup(tree, computed.path_str()),
            computed.element_type(),
            &mut |slot: Slot, element: &ElementType| {
                build_leaf(slot, element, &this, computed.name())
            },
        )?;
        computed
            .apply(&mut *borrow_mut(&node)?, slot)
            .map_err(|source| Error::Field {
                type_name: registry.type_name(),
                field: computed.name().to_string(),
                source,
            })?;
    }

    borrow_mut(&node)?.post_init()?;
    Ok(node)
}

fn lookup(tree: &Value, path: &str) -> Slot {
    Slot::Value(navigator::get(tree, path).cloned().unwrap_or(Value::Null))
}

/// Records are built from mappings only; any other scalar where a record is
/// declared is an error against the owning field.
fn build_leaf(slot: Slot, element: &ElementType, parent: &AnyNode, field: &str) -> Result<Slot> {
    let found = slot.kind();
    match slot {
        Slot::Value(tree @ Value::Object(_)) => Ok(element
            .build(&tree, Some(parent))?
            .map_or(Slot::Value(tree), Slot::Node)),
        Slot::Value(_) => Err(Error::Field {
            type_name: parent.type_name(),
            field: field.to_string(),
            source: SlotError::Mismatch {
                expected: element.name(),
                found,
            },
        }),
        other => Ok(other),
    }
}

fn borrow_mut<T: Record>(node: &Node<T>) -> Result<std::cell::RefMut<'_, T>> {
    node.try_borrow_mut().map_err(|_| Error::Borrowed {
        type_name: T::type_name(),
    })
}

//! Converting an object graph of one family of types into another.

use crate::error::{Error, Result};
use crate::node::{AnyNode, Node, WeakNode};
use crate::record::{FieldValues, Record};
use crate::registry::registry;
use crate::slot::{ElementType, Slot, map_leaves};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Source identity to the target already created for it, for one top-level
/// conversion.
#[derive(Default)]
pub(crate) struct Memo {
    targets: HashMap<*const (), AnyNode>,
}

impl Memo {
    fn get(&self, source: &AnyNode) -> Option<&AnyNode> {
        self.targets.get(&source.identity())
    }

    fn insert(&mut self, source: &AnyNode, target: AnyNode) {
        self.targets.insert(source.identity(), target);
    }
}

/// Convert `source` into a new `T`, copying every same-named direct field.
///
/// Nested records are converted recursively into the element types `T`
/// declares. Each source instance is converted at most once, so shared
/// subgraphs stay shared and cycles through back-references terminate. Fields
/// `source` does not expose take `T`'s defaults.
pub fn convert<S: Record, T: Record>(source: &Node<S>) -> Result<Node<T>> {
    let source = AnyNode::from(Rc::clone(source));
    convert_node::<T>(&source, None, &mut Memo::default())
}

/// Like [`convert`], but only the named top-level fields are copied.
pub fn convert_only<S: Record, T: Record>(source: &Node<S>, fields: &[&str]) -> Result<Node<T>> {
    let source = AnyNode::from(Rc::clone(source));
    convert_node::<T>(&source, Some(fields), &mut Memo::default())
}

pub(crate) fn convert_node<T: Record>(
    source: &AnyNode,
    only: Option<&[&str]>,
    memo: &mut Memo,
) -> Result<Node<T>> {
    if let Some(target) = memo.get(source) {
        tracing::trace!(
            source = source.type_name(),
            target = target.type_name(),
            "reusing converted record"
        );
        return target.downcast::<T>().ok_or(Error::MemoTypeMismatch {
            source_type: source.type_name(),
            target: T::type_name(),
            found: target.type_name(),
        });
    }

    let registry = registry::<T>()?;
    tracing::trace!(
        source = source.type_name(),
        target = registry.type_name(),
        "converting record"
    );

    let node: Node<T> = Rc::new(RefCell::new(T::default()));
    memo.insert(source, AnyNode::from(Rc::clone(&node)));

    let mut values = FieldValues::new(registry.type_name());
    for field in registry.fields() {
        if only.is_some_and(|names| !names.contains(&field.name())) {
            continue;
        }
        let Some(slot) = source.read_field(field.name())? else {
            continue;
        };
        let slot = if field.is_parent_ref() {
            Slot::Parent(resolve_parent(&slot, memo))
        } else {
            map_leaves(
                slot,
                field.element_type(),
                &mut |leaf: Slot, element: &ElementType| convert_leaf(leaf, element, memo),
            )?
        };
        values.insert(field.name(), slot);
    }

    let record = T::construct(&mut values)?;
    let mut target = node.try_borrow_mut().map_err(|_| Error::Borrowed {
        type_name: T::type_name(),
    })?;
    *target = record;
    target.post_init()?;
    drop(target);
    Ok(node)
}

fn convert_leaf(slot: Slot, element: &ElementType, memo: &mut Memo) -> Result<Slot> {
    match slot {
        Slot::Node(source) => Ok(element
            .convert(&source, memo)?
            .map_or(Slot::Node(source), Slot::Node)),
        parent @ Slot::Parent(_) => Ok(Slot::Parent(resolve_parent(&parent, memo))),
        other => Ok(other),
    }
}

/// The converted counterpart of a back-reference, if its target has already
/// been created in this conversion.
fn resolve_parent(slot: &Slot, memo: &Memo) -> Option<WeakNode> {
    let source = match slot {
        Slot::Parent(weak) => weak.as_ref()?.upgrade()?,
        Slot::Node(node) => node.clone(),
        _ => return None,
    };
    memo.get(&source).map(AnyNode::downgrade)
}

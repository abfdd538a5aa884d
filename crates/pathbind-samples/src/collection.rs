//! Collection hierarchies.
//!
//! A remote catalog lists its collections flat, each naming its parent at
//! `parentCollection.referenceName`. [`PurviewResponse`] links that listing
//! into a tree; converting its root into [`LocalCollection`] yields the same
//! tree in nested form.

use pathbind::v1::{Computed, Field, FieldValues, Mapped, Node, Parent, Record, Result, Slot};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// Shape shared by both collection models.
pub trait Collection: Record {
    fn name(&self) -> &str;
    fn friendly_name(&self) -> &str;
    fn collections(&self) -> &[Node<Self>];
    fn parent_name(&self) -> Option<String>;
}

/// A collection in nested form: children inline, parent by back-reference.
#[derive(Debug, Default)]
pub struct LocalCollection {
    pub name: String,
    pub friendly_name: String,
    pub collections: Vec<Node<LocalCollection>>,
    pub parent: Parent<LocalCollection>,
}

impl Record for LocalCollection {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("name", |c: &LocalCollection| &c.name),
            Field::new("friendly_name", |c: &LocalCollection| &c.friendly_name)
                .path("friendlyName"),
            Field::new("collections", |c: &LocalCollection| &c.collections),
            Field::new("parent", |c: &LocalCollection| &c.parent),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(LocalCollection {
            name: values.take("name")?,
            friendly_name: values.take("friendly_name")?,
            collections: values.take_or_default("collections")?,
            parent: values.take("parent")?,
        })
    }

    fn attribute(&self, name: &str) -> Option<Slot> {
        (name == "parent_name").then(|| self.parent_name().to_slot())
    }
}

impl Collection for LocalCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn collections(&self) -> &[Node<Self>] {
        &self.collections
    }

    fn parent_name(&self) -> Option<String> {
        self.parent.upgrade().map(|p| p.borrow().name.clone())
    }
}

/// A collection as the remote catalog lists it.
///
/// Only `name`, `friendlyName` and the parent's name come from data;
/// `collections` and `parent` are filled in by [`PurviewResponse`].
#[derive(Debug, Default)]
pub struct PurviewCollection {
    pub name: String,
    pub friendly_name: String,
    pub parent_name: Option<String>,
    pub collections: Vec<Node<PurviewCollection>>,
    pub parent: Parent<PurviewCollection>,
}

impl Record for PurviewCollection {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("name", |c: &PurviewCollection| &c.name),
            Field::new("friendly_name", |c: &PurviewCollection| &c.friendly_name)
                .path("friendlyName"),
            Field::new("parent_name", |c: &PurviewCollection| &c.parent_name)
                .path("parentCollection.referenceName"),
        ]
    }

    fn computed() -> Vec<Computed<Self>> {
        vec![
            Computed::read_only("collection_reference", |_: &PurviewCollection| {
                "CollectionReference".to_string()
            })
            .path("parentCollection.type"),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(PurviewCollection {
            name: values.take("name")?,
            friendly_name: values.take("friendly_name")?,
            parent_name: values.take("parent_name")?,
            ..PurviewCollection::default()
        })
    }

    fn post_serialize(&self, mut tree: Value) -> Value {
        if self.parent_name.is_none()
            && let Some(map) = tree.as_object_mut()
        {
            map.remove("parentCollection");
        }
        tree
    }

    fn attribute(&self, name: &str) -> Option<Slot> {
        match name {
            "collections" => Some(self.collections.to_slot()),
            "parent" => Some(self.parent.to_slot()),
            _ => None,
        }
    }
}

impl Collection for PurviewCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn collections(&self) -> &[Node<Self>] {
        &self.collections
    }

    fn parent_name(&self) -> Option<String> {
        self.parent_name.clone()
    }
}

/// A page of the catalog's collection listing.
#[derive(Debug, Default)]
pub struct PurviewResponse {
    pub collections: Vec<Node<PurviewCollection>>,
    pub root: Option<Node<PurviewCollection>>,
}

impl Record for PurviewResponse {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::new("collections", |r: &PurviewResponse| &r.collections).path("value")]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(PurviewResponse {
            collections: values.take_or_default("collections")?,
            root: None,
        })
    }

    /// Attach every collection to the one its `parent_name` names. A
    /// collection with no parent in the listing becomes the root; the last
    /// such collection wins.
    fn post_init(&mut self) -> Result<()> {
        let by_name: HashMap<String, Node<PurviewCollection>> = self
            .collections
            .iter()
            .map(|c| (c.borrow().name.clone(), Rc::clone(c)))
            .collect();

        for collection in &self.collections {
            let parent = collection
                .borrow()
                .parent_name
                .as_ref()
                .and_then(|name| by_name.get(name))
                .cloned();
            match parent {
                Some(parent) => {
                    collection.borrow_mut().parent = Parent::from(&parent);
                    parent.borrow_mut().collections.push(Rc::clone(collection));
                }
                None => self.root = Some(Rc::clone(collection)),
            }
        }

        tracing::debug!(
            collections = self.collections.len(),
            root = self.root.as_ref().map(|r| r.borrow().name.clone()),
            "linked collection hierarchy"
        );
        Ok(())
    }
}

/// Count the collections in a tree, the root included.
pub fn count<C: Collection>(root: &Node<C>) -> usize {
    1 + root.borrow().collections().iter().map(count).sum::<usize>()
}

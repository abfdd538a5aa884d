#![doc = include_str!("../README.md")]

mod build;
mod convert;
mod error;
mod navigator;
mod node;
mod record;
mod registry;
mod serialize;
mod slot;

pub mod v1 {
    //! Versioned public API for binding object graphs to trees.
    //!
    //! Everything you need is re-exported from this module. Types are organized
    //! into four groups:
    //!
    //! # Declaring records
    //!
    //! - [`Record`] — implemented by every type that maps onto a tree
    //! - [`Field`] — a direct field bound to a dotted path
    //! - [`Computed`] — a derived field with a getter and optional setter
    //! - [`FieldValues`] — direct-field values handed to [`Record::construct`]
    //! - [`Registry`] / [`registry`] — the validated, cached field tables
    //!
    //! # Object graphs
    //!
    //! - [`Node`] / [`node`] — an owned record
    //! - [`Parent`] — a weak back-reference to the owning record
    //! - [`AnyNode`], [`WeakNode`] — handles over any record type
    //! - [`Slot`], [`Mapped`], [`ElementType`] — field values in flight
    //!
    //! # Operations
    //!
    //! - [`create`] / [`build`] — tree to object graph
    //! - [`serialize()`] — object graph to tree
    //! - [`convert`] / [`convert_only`] — object graph to another type family
    //! - [`path`] — dotted-path reads and writes on raw trees
    //!
    //! # Errors
    //!
    //! - [`Error`], [`RegistryError`], [`PathError`], [`SlotError`]
    //!
    //! # Example — nested records with a back-reference
    //!
    //! ```
    //! use pathbind::v1::*;
    //! use serde_json::json;
    //!
    //! #[derive(Debug, Default)]
    //! struct Shelf {
    //!     label: String,
    //!     books: Vec<Node<Book>>,
    //! }
    //!
    //! #[derive(Debug, Default)]
    //! struct Book {
    //!     title: String,
    //!     shelf: Parent<Shelf>,
    //! }
    //!
    //! impl Record for Shelf {
    //!     fn fields() -> Vec<Field<Self>> {
    //!         vec![
    //!             Field::new("label", |s: &Shelf| &s.label).path("meta.label"),
    //!             Field::new("books", |s: &Shelf| &s.books),
    //!         ]
    //!     }
    //!
    //!     fn construct(values: &mut FieldValues) -> Result<Self> {
    //!         Ok(Shelf {
    //!             label: values.take("label")?,
    //!             books: values.take_or_default("books")?,
    //!         })
    //!     }
    //! }
    //!
    //! impl Record for Book {
    //!     fn fields() -> Vec<Field<Self>> {
    //!         vec![
    //!             Field::new("title", |b: &Book| &b.title),
    //!             Field::new("shelf", |b: &Book| &b.shelf),
    //!         ]
    //!     }
    //!
    //!     fn construct(values: &mut FieldValues) -> Result<Self> {
    //!         Ok(Book {
    //!             title: values.take("title")?,
    //!             shelf: values.take("shelf")?,
    //!         })
    //!     }
    //! }
    //!
    //! let tree = json!({"meta": {"label": "A"}, "books": [{"title": "Dune"}]});
    //! let shelf = create::<Shelf>(&tree).unwrap();
    //! assert!(shelf.borrow().books[0].borrow().shelf.is(&shelf));
    //! assert_eq!(serialize(&*shelf.borrow()).unwrap(), tree);
    //! ```

    /// Dotted-path addressing on raw trees.
    ///
    /// Segments are separated by `.`; an all-digit segment indexes a sequence
    /// when it meets one and is used as a key when it meets a mapping.
    ///
    /// # Example
    ///
    /// ```
    /// use pathbind::v1::path;
    /// use serde_json::json;
    ///
    /// let mut tree = json!(null);
    /// path::set(&mut tree, "rows.2", json!("c")).unwrap();
    /// assert_eq!(tree, json!({"rows": [null, null, "c"]}));
    /// assert_eq!(path::get(&tree, "rows.1"), Some(&json!(null)));
    /// assert_eq!(path::get(&tree, "rows.9"), None);
    /// ```
    pub mod path {
        pub use crate::navigator::{ContainerKind, Token, get, set, tokenize};
    }
    pub use crate::build::{build, create};
    pub use crate::convert::{convert, convert_only};
    pub use crate::error::{Error, PathError, RegistryError, Result, SlotError};
    pub use crate::node::{AnyNode, Node, Parent, WeakNode, node};
    pub use crate::record::{Computed, ComputedField, Field, FieldValues, Record};
    pub use crate::registry::{Registry, registry};
    pub use crate::serialize::serialize;
    pub use crate::slot::{ElementType, Mapped, Slot};
}

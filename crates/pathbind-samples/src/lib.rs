//! Sample record models built on [`pathbind`].
//!
//! - [`person`] — a flat record with renamed paths and a default
//! - [`collection`] — a flat collection listing linked into a hierarchy, and
//!   a nested local model it converts into
//! - [`policy`] — a metadata policy whose rules derive their conditions from
//!   each other through back-references
//!
//! # Example
//!
//! ```
//! use pathbind::v1::{create, serialize};
//! use pathbind_samples::person::Person;
//! use serde_json::json;
//!
//! let person = create::<Person>(&json!({"firstName": "Ann", "lastName": "Lee"})).unwrap();
//! assert_eq!(person.borrow().age, 0);
//! assert_eq!(
//!     serialize(&*person.borrow()).unwrap(),
//!     json!({"firstName": "Ann", "lastName": "Lee", "age": 0})
//! );
//! ```

pub mod collection;
pub mod person;
pub mod policy;

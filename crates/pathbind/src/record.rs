//! Declaring how a Rust type maps onto a tree.

use crate::error::{Error, Result, SlotError};
use crate::slot::{ElementType, Mapped, Slot};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

type Reader<T> = Box<dyn Fn(&T) -> Slot + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, Slot) -> std::result::Result<(), SlotError> + Send + Sync>;

/// A type whose fields are bound to paths in a tree.
///
/// Implementors list their direct fields and computed fields once; the
/// tables are cached per type on first use.
///
/// # Example
///
/// ```
/// use pathbind::v1::*;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Person {
///     first_name: String,
///     age: i64,
/// }
///
/// impl Record for Person {
///     fn fields() -> Vec<Field<Self>> {
///         vec![
///             Field::new("first_name", |p: &Person| &p.first_name).path("name.first"),
///             Field::new("age", |p: &Person| &p.age),
///         ]
///     }
///
///     fn construct(values: &mut FieldValues) -> Result<Self> {
///         Ok(Person {
///             first_name: values.take("first_name")?,
///             age: values.take_or("age", 0)?,
///         })
///     }
/// }
///
/// let person = create::<Person>(&serde_json::json!({"name": {"first": "Ann"}})).unwrap();
/// assert_eq!(person.borrow().age, 0);
/// assert_eq!(
///     serialize(&*person.borrow()).unwrap(),
///     serde_json::json!({"name": {"first": "Ann"}, "age": 0})
/// );
/// ```
pub trait Record: Default + 'static {
    /// Short name used in errors and logs.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Direct fields in declaration order.
    fn fields() -> Vec<Field<Self>>;

    /// Computed fields in declaration order.
    fn computed() -> Vec<Computed<Self>> {
        Vec::new()
    }

    /// Create an instance from direct-field values.
    fn construct(values: &mut FieldValues) -> Result<Self>;

    /// Runs once the instance is fully initialized: after computed setters
    /// when building, after construction when converting.
    fn post_init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Adjust the serialized tree before it is returned.
    fn post_serialize(&self, tree: Value) -> Value {
        tree
    }

    /// Expose an undeclared attribute by name, for conversion into types that
    /// declare it as a field.
    fn attribute(&self, _name: &str) -> Option<Slot> {
        None
    }
}

/// A direct field: stored on the record and supplied at construction.
pub struct Field<T> {
    name: &'static str,
    path: Cow<'static, str>,
    element: ElementType,
    parent_ref: bool,
    read: Reader<T>,
}

impl<T: 'static> Field<T> {
    /// Declare a field read through `access`.
    ///
    /// The path defaults to the field name. Element type and the
    /// back-reference flag come from the field's Rust type.
    pub fn new<U: Mapped + 'static>(name: &'static str, access: fn(&T) -> &U) -> Self {
        Field {
            name,
            path: Cow::Borrowed(name),
            element: U::element_type(),
            parent_ref: U::is_parent_ref(),
            read: Box::new(move |record: &T| access(record).to_slot()),
        }
    }

    /// Bind the field to a dotted path instead of its name.
    pub fn path(mut self, path: impl Into<Cow<'static, str>>) -> Self {
        self.path = path.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path_str(&self) -> &str {
        &self.path
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element
    }

    pub fn is_parent_ref(&self) -> bool {
        self.parent_ref
    }

    pub fn read(&self, record: &T) -> Slot {
        (self.read)(record)
    }
}

/// A computed field as declared; validated into a [`ComputedField`] when the
/// type registers.
pub struct Computed<T> {
    name: &'static str,
    path: Option<Cow<'static, str>>,
    element: Option<ElementType>,
    get: Reader<T>,
    set: Option<Writer<T>>,
}

impl<T: 'static> Computed<T> {
    /// A value derived by `get`, written to the tree but never read back.
    pub fn read_only<U: Mapped + 'static>(name: &'static str, get: fn(&T) -> U) -> Self {
        Computed {
            name,
            path: None,
            element: Some(U::element_type()),
            get: Box::new(move |record: &T| get(record).to_slot()),
            set: None,
        }
    }

    /// A derived value that is also applied back to the record when building.
    pub fn read_write<U: Mapped + 'static>(
        name: &'static str,
        get: fn(&T) -> U,
        set: fn(&mut T, U),
    ) -> Self {
        Computed {
            set: Some(Box::new(
                move |record: &mut T, slot: Slot| -> std::result::Result<(), SlotError> {
                    set(record, U::from_slot(slot)?);
                    Ok(())
                },
            )),
            ..Computed::read_only(name, get)
        }
    }

    /// A getter producing slots directly. Its element type must be given with
    /// [`Computed::returns`].
    pub fn raw(name: &'static str, get: fn(&T) -> Slot) -> Self {
        Computed {
            name,
            path: None,
            element: None,
            get: Box::new(get),
            set: None,
        }
    }

    pub fn returns<U: Mapped>(mut self) -> Self {
        self.element = Some(U::element_type());
        self
    }

    pub fn path(mut self, path: impl Into<Cow<'static, str>>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn resolve(self) -> Option<ComputedField<T>> {
        let element = self.element?;
        Some(ComputedField {
            name: self.name,
            path: self.path.unwrap_or(Cow::Borrowed(self.name)),
            element,
            get: self.get,
            set: self.set,
        })
    }
}

/// A registered computed field with a resolved element type.
pub struct ComputedField<T> {
    name: &'static str,
    path: Cow<'static, str>,
    element: ElementType,
    get: Reader<T>,
    set: Option<Writer<T>>,
}

impl<T> ComputedField<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path_str(&self) -> &str {
        &self.path
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element
    }

    pub fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    pub fn read(&self, record: &T) -> Slot {
        (self.get)(record)
    }

    /// Apply the setter, if any. Returns whether one ran.
    pub fn apply(&self, record: &mut T, slot: Slot) -> std::result::Result<bool, SlotError> {
        match &self.set {
            Some(set) => set(record, slot).map(|()| true),
            None => Ok(false),
        }
    }
}

/// Direct-field values collected for [`Record::construct`].
#[derive(Debug)]
pub struct FieldValues {
    type_name: &'static str,
    slots: HashMap<&'static str, Slot>,
}

impl FieldValues {
    pub fn new(type_name: &'static str) -> Self {
        FieldValues {
            type_name,
            slots: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &'static str, slot: Slot) {
        self.slots.insert(name, slot);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Take a field's value. A missing field is offered to the type as null.
    pub fn take<U: Mapped>(&mut self, name: &str) -> Result<U> {
        let slot = self.slots.remove(name).unwrap_or_else(Slot::null);
        self.decode(name, slot)
    }

    /// Take a field's value, falling back to `default` when it is missing or
    /// null.
    pub fn take_or<U: Mapped>(&mut self, name: &str, default: U) -> Result<U> {
        match self.slots.remove(name) {
            Some(slot) if !slot.is_null() => self.decode(name, slot),
            _ => Ok(default),
        }
    }

    pub fn take_or_default<U: Mapped + Default>(&mut self, name: &str) -> Result<U> {
        self.take_or(name, U::default())
    }

    fn decode<U: Mapped>(&self, name: &str, slot: Slot) -> Result<U> {
        U::from_slot(slot).map_err(|source| Error::Field {
            type_name: self.type_name,
            field: name.to_string(),
            source,
        })
    }
}

//! Per-type field tables, derived once and cached for the process.

use crate::error::RegistryError;
use crate::record::{ComputedField, Field, Record};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// The validated field tables of one record type.
pub struct Registry<T> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
    computed: Vec<ComputedField<T>>,
}

impl<T: Record> Registry<T> {
    fn derive() -> Result<Self, RegistryError> {
        let type_name = T::type_name();
        let fields = T::fields();
        let mut seen = HashSet::new();

        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(RegistryError::DuplicateField {
                    type_name,
                    field: field.name().to_string(),
                });
            }
        }

        let mut computed = Vec::new();
        for declared in T::computed() {
            let name = declared.name();
            if !seen.insert(name) {
                return Err(RegistryError::DuplicateField {
                    type_name,
                    field: name.to_string(),
                });
            }
            let resolved = declared
                .resolve()
                .ok_or_else(|| RegistryError::UnresolvedReturnType {
                    type_name,
                    field: name.to_string(),
                })?;
            computed.push(resolved);
        }

        Ok(Registry {
            type_name,
            fields,
            computed,
        })
    }
}

impl<T: 'static> Registry<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    pub fn computed(&self) -> &[ComputedField<T>] {
        &self.computed
    }

    pub fn field(&self, name: &str) -> Option<&Field<T>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn computed_field(&self, name: &str) -> Option<&ComputedField<T>> {
        self.computed.iter().find(|c| c.name() == name)
    }
}

type Entry = Result<Arc<dyn Any + Send + Sync>, RegistryError>;

static CACHE: OnceLock<RwLock<HashMap<TypeId, Entry>>> = OnceLock::new();

/// The field tables for `T`, deriving them on first use.
///
/// A type whose declarations are defective fails here every time, with the
/// error from its first derivation.
pub fn registry<T: Record>() -> Result<Arc<Registry<T>>, RegistryError> {
    let cache = CACHE.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    if let Some(entry) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return downcast(entry);
    }

    let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
    let entry = guard.entry(key).or_insert_with(|| {
        let derived = Registry::<T>::derive();
        match &derived {
            Ok(registry) => tracing::debug!(
                type_name = registry.type_name,
                fields = registry.fields.len(),
                computed = registry.computed.len(),
                "registered record type"
            ),
            Err(error) => tracing::warn!(%error, "record type failed to register"),
        }
        derived.map(|r| Arc::new(r) as Arc<dyn Any + Send + Sync>)
    });
    downcast(entry)
}

fn downcast<T: Record>(entry: &Entry) -> Result<Arc<Registry<T>>, RegistryError> {
    match entry {
        Ok(any) => Ok(Arc::clone(any)
            .downcast::<Registry<T>>()
            .expect("registry cache is keyed by TypeId")),
        Err(error) => Err(error.clone()),
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the build, serialize, and convert operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("{type_name}.{field}: {source}")]
    Field {
        type_name: &'static str,
        field: String,
        source: SlotError,
    },

    #[error("{type_name} is mutably borrowed")]
    Borrowed { type_name: &'static str },

    #[error("cannot convert {source_type} into {target}: already converted into {found}")]
    MemoTypeMismatch {
        source_type: &'static str,
        target: &'static str,
        found: &'static str,
    },
}

/// A defect in a record's field declarations.
///
/// Registry errors are cached with the type: once a type fails to register,
/// every later use of it fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("computed field {type_name}.{field} has no return type")]
    UnresolvedReturnType {
        type_name: &'static str,
        field: String,
    },

    #[error("field {field} is declared more than once on {type_name}")]
    DuplicateField {
        type_name: &'static str,
        field: String,
    },
}

/// Failures writing through a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("cannot set {path}: {segment:?} does not address a container")]
    NotAContainer { path: String, segment: String },

    #[error("cannot set {path}: {segment:?} is not a sequence index")]
    NotAnIndex { path: String, segment: String },

    #[error("cannot set {path}: index {segment:?} is too large")]
    IndexTooLarge { path: String, segment: String },
}

/// A slot could not be turned into the declared Rust type.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

//! Error types for DataCore parsing and materialisation.

use thiserror::Error;
use veles_common::DcGuid;

/// Index families reported by [`Error::BadIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Struct,
    Instance,
    Record,
    Pool,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Struct => "struct",
            Self::Instance => "instance",
            Self::Record => "record",
            Self::Pool => "pool",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when working with DataCore databases.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (cursor underrun, bad magic, bad GUID).
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// Unsupported database version.
    #[error("unsupported DataCore version: {0} (expected 1)")]
    UnsupportedVersion(u32),

    /// Index out of range for the table it addresses.
    #[error("{kind} index {index} out of range (count: {count})")]
    BadIndex {
        kind: IndexKind,
        index: i64,
        count: usize,
    },

    /// GUID not present in the main-record index.
    #[error("record not found: {0}")]
    UnknownRecord(DcGuid),

    /// Generated code and archive disagree on the schema.
    #[error("schema mismatch on {field}: generated code expects {expected}, archive has {actual}")]
    SchemaMismatch {
        field: &'static str,
        expected: u64,
        actual: u64,
    },

    /// The dispatch table has no entry for a non-sentinel struct index.
    #[error("no dispatch entry for struct index {struct_index}")]
    NullDispatch { struct_index: i32 },

    /// A cached instance's concrete type does not match the requested type.
    #[error("cached instance ({struct_index}, {instance_index}) is not a {expected}")]
    TypeMismatch {
        struct_index: i32,
        instance_index: i32,
        expected: &'static str,
    },

    /// Unrecognised data-type tag in a property definition.
    #[error("invalid data type: {0:#06x}")]
    InvalidDataType(u16),

    /// Export error.
    #[error("export error: {0}")]
    Export(String),
}

impl Error {
    /// Shorthand for a [`Error::BadIndex`].
    pub(crate) fn bad_index(kind: IndexKind, index: impl Into<i64>, count: usize) -> Self {
        Self::BadIndex {
            kind,
            index: index.into(),
            count,
        }
    }
}

/// Result type for DataCore operations.
pub type Result<T> = std::result::Result<T, Error>;

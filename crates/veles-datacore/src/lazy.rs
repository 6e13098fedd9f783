//! Lazy reference wrapper.
//!
//! A [`LazyRef`] holds either an unresolved GUID (references) or an already
//! resolved index pair (pointers) and defers all work until its value is
//! first touched. Cycles reduce to a fixed-point table because every handle
//! is backed by `(struct_index, instance_index)` and the runtime's instance
//! cache is keyed the same way.

use std::marker::PhantomData;
use std::sync::OnceLock;

use veles_common::DcGuid;

use crate::database::Database;
use crate::layout::{RawPointer, RawReference, StringId};
use crate::runtime::{Runtime, SharedInstance};
use crate::Result;

/// Resolved target of a lazy reference.
#[derive(Debug, Clone, Copy)]
struct Target {
    struct_index: i32,
    instance_index: i32,
    is_main: bool,
    file_name_offset: StringId,
}

/// A deferred link to another instance or record.
///
/// `T` is the declared target type; the dynamic type of the resolved value
/// may be a subtype of it, so [`LazyRef::value`] returns the erased
/// instance and [`LazyRef::get`] narrows to the declared type. A null link
/// is represented by the wrapper itself being absent
/// (`Option<LazyRef<T>>`), not by a null state inside it.
pub struct LazyRef<T> {
    record_id: Option<DcGuid>,
    /// GUID resolution memo; `Some(None)` marks a permanently unresolvable
    /// GUID (unknown record).
    target: OnceLock<Option<Target>>,
    /// Materialised value memo; set only on success so a cycle-broken read
    /// can be retried once the fixed point is in the cache.
    value: OnceLock<SharedInstance>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LazyRef<T> {
    /// Wrap a raw reference; `None` for the null reference.
    pub fn from_reference(raw: RawReference) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        Some(Self {
            record_id: Some(raw.record_id),
            target: OnceLock::new(),
            value: OnceLock::new(),
            _marker: PhantomData,
        })
    }

    /// Wrap a raw pointer; `None` for the null pointer. Pointers arrive
    /// already resolved to an index pair.
    pub fn from_pointer(raw: RawPointer) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let target = OnceLock::new();
        let _ = target.set(Some(Target {
            struct_index: raw.struct_index,
            instance_index: raw.instance_index,
            is_main: false,
            file_name_offset: StringId::null(),
        }));
        Some(Self {
            record_id: None,
            target,
            value: OnceLock::new(),
            _marker: PhantomData,
        })
    }

    /// The GUID this reference carries, if any.
    #[inline]
    pub fn record_id(&self) -> Option<DcGuid> {
        self.record_id
    }

    /// Struct index of the target, once known.
    #[inline]
    pub fn struct_index(&self) -> Option<i32> {
        self.target.get().and_then(|t| t.map(|t| t.struct_index))
    }

    /// Instance index of the target, once known.
    #[inline]
    pub fn instance_index(&self) -> Option<i32> {
        self.target.get().and_then(|t| t.map(|t| t.instance_index))
    }

    /// Whether the target is itself a main record (a separate file).
    #[inline]
    pub fn is_external_file(&self) -> bool {
        self.target
            .get()
            .and_then(|t| t.map(|t| t.is_main))
            .unwrap_or(false)
    }

    /// File path of the target when it is a main record.
    pub fn external_file_path<'a>(&self, database: &'a Database) -> Option<&'a str> {
        let target = self.target.get().copied().flatten()?;
        if !target.is_main {
            return None;
        }
        database.string(target.file_name_offset)
    }

    /// Whether the target value has been materialised.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Resolve and return the target instance, type-erased.
    ///
    /// The first access looks the GUID up in the main-record index and
    /// materialises the target through the polymorphic path; the result is
    /// cached locally. Yields `None` for an unknown record (debug-logged,
    /// permanent) or while the target is part of an in-flight cycle
    /// (retried on the next access).
    pub fn value(&self, runtime: &Runtime) -> Result<Option<SharedInstance>> {
        if let Some(value) = self.value.get() {
            return Ok(Some(value.clone()));
        }

        let Some(target) = self.resolve_target(runtime.database()) else {
            return Ok(None);
        };

        match runtime.get_or_read_polymorphic(target.struct_index, target.instance_index)? {
            Some(value) => {
                let _ = self.value.set(value.clone());
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Resolve and narrow to a concrete type.
    ///
    /// `None` when the target is null, unknown, in-flight, or of a
    /// different dynamic type.
    pub fn value_as<U: Send + Sync + 'static>(&self, runtime: &Runtime) -> Result<Option<std::sync::Arc<U>>> {
        Ok(self
            .value(runtime)?
            .and_then(|value| value.downcast::<U>().ok()))
    }

    fn resolve_target(&self, database: &Database) -> Option<Target> {
        *self.target.get_or_init(|| {
            let guid = self.record_id?;
            match database.try_record_info(&guid) {
                Some(info) => Some(Target {
                    struct_index: info.struct_index,
                    instance_index: info.instance_index,
                    is_main: info.is_main,
                    file_name_offset: info.file_name_offset,
                }),
                None => {
                    tracing::debug!(record_id = %guid, "reference to unknown record resolves to null");
                    None
                }
            }
        })
    }
}

impl<T: Send + Sync + 'static> LazyRef<T> {
    /// Resolve and return the target as the declared type.
    #[inline]
    pub fn get(&self, runtime: &Runtime) -> Result<Option<std::sync::Arc<T>>> {
        self.value_as::<T>(runtime)
    }
}

impl<T> Clone for LazyRef<T> {
    fn clone(&self) -> Self {
        Self {
            record_id: self.record_id,
            target: self.target.clone(),
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for LazyRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyRef")
            .field("record_id", &self.record_id)
            .field("struct_index", &self.struct_index())
            .field("instance_index", &self.instance_index())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_inputs_yield_no_wrapper() {
        assert!(LazyRef::<()>::from_reference(RawReference::NULL).is_none());
        assert!(LazyRef::<()>::from_pointer(RawPointer::NULL).is_none());
        assert!(LazyRef::<()>::from_pointer(RawPointer {
            struct_index: 3,
            instance_index: -1,
        })
        .is_none());
    }

    #[test]
    fn test_pointer_target_is_preresolved() {
        let lazy = LazyRef::<()>::from_pointer(RawPointer {
            struct_index: 2,
            instance_index: 5,
        })
        .unwrap();
        assert_eq!(lazy.struct_index(), Some(2));
        assert_eq!(lazy.instance_index(), Some(5));
        assert!(!lazy.is_external_file());
        assert!(!lazy.is_resolved());
        assert_eq!(lazy.record_id(), None);
    }

    #[test]
    fn test_reference_target_is_deferred() {
        let raw = RawReference {
            record_id: "12345678-abcd-ef01-2345-6789abcdef01".parse().unwrap(),
            instance_index: -1,
        };
        let lazy = LazyRef::<()>::from_reference(raw).unwrap();
        assert!(lazy.record_id().is_some());
        assert_eq!(lazy.struct_index(), None);
        assert!(!lazy.is_resolved());
    }
}

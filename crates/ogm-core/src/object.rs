//! Shared handles to in-memory domain objects.
//!
//! Domain objects are held behind [`ObjectRef`], a reference-counted lock
//! around a `dyn GraphObject`. Two handles are the same object iff they point
//! at the same allocation; structural equality never matters for tracking.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::PropertyValue;

/// Upcast helper so typed accessors can downcast a `dyn GraphObject`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Field-level access to a domain object.
///
/// Implementations answer by field name; the names in use are the ones
/// declared by the type's [`EntityDescriptor`](crate::metadata::EntityDescriptor).
pub trait GraphObject: AsAny + Send + Sync {
    /// Registered type name, used to look up the entity descriptor.
    fn type_name(&self) -> &'static str;

    /// Native graph id, `None` until the object has been saved.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Current value of a property field. Unknown fields read as `Null`.
    fn property(&self, field: &str) -> PropertyValue;

    /// Current target(s) of a relationship field.
    fn related(&self, field: &str) -> Related;
}

/// Targets of one relationship field.
#[derive(Debug, Clone, Default)]
pub enum Related {
    #[default]
    None,
    One(ObjectRef),
    Many(Vec<ObjectRef>),
}

impl Related {
    pub fn into_vec(self) -> Vec<ObjectRef> {
        match self {
            Self::None => Vec::new(),
            Self::One(target) => vec![target],
            Self::Many(targets) => targets,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(targets) => targets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&Option<ObjectRef>> for Related {
    fn from(value: &Option<ObjectRef>) -> Self {
        value.clone().map_or(Self::None, Self::One)
    }
}

impl From<&ObjectRef> for Related {
    fn from(value: &ObjectRef) -> Self {
        Self::One(value.clone())
    }
}

impl From<&Vec<ObjectRef>> for Related {
    fn from(value: &Vec<ObjectRef>) -> Self {
        Self::Many(value.clone())
    }
}

// ── Handles ───────────────────────────────────────────────────────

/// Reference identity of an [`ObjectRef`]: the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(usize);

/// Shared handle to a domain object.
///
/// Cloning is cheap and yields the same object. Equality and hashing use
/// reference identity. A poisoned lock is recovered rather than propagated,
/// since the tracked data is plain field values.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<dyn GraphObject>>);

impl ObjectRef {
    pub fn new<T: GraphObject>(object: T) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, dyn GraphObject> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, dyn GraphObject> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn type_name(&self) -> &'static str {
        self.read().type_name()
    }

    pub fn id(&self) -> Option<i64> {
        self.read().id()
    }

    /// Run `f` against the concrete object if it is a `T`.
    pub fn with<T: GraphObject, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.read();
        let object: &dyn GraphObject = &*guard;
        object.as_any().downcast_ref::<T>().map(f)
    }

    /// Run `f` against the concrete object mutably if it is a `T`.
    pub fn with_mut<T: GraphObject, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.write();
        let object: &mut dyn GraphObject = &mut *guard;
        object.as_any_mut().downcast_mut::<T>().map(f)
    }

    pub fn is<T: GraphObject>(&self) -> bool {
        let guard = self.read();
        let object: &dyn GraphObject = &*guard;
        object.as_any().is::<T>()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ObjectRef {}

impl std::hash::Hash for ObjectRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    // Shallow: related objects may form cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(guard) => f
                .debug_struct("ObjectRef")
                .field("type", &guard.type_name())
                .field("id", &guard.id())
                .finish(),
            Err(_) => f.debug_struct("ObjectRef").finish_non_exhaustive(),
        }
    }
}

//! ogm-core: Shared types, entity metadata, and configuration for the OGM.
//!
//! This crate provides the foundations used by every other OGM crate:
//! - Object handles (`ObjectRef`) and the `GraphObject` accessor trait
//! - Statically declared entity descriptors and the `MetaData` registry
//! - Persistence lifecycle events and listeners
//! - Session configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod metadata;
pub mod object;
pub mod types;

pub use config::{ListenerFailurePolicy, SessionConfig, UnknownTypePolicy};
pub use error::OgmError;
pub use events::{EventListener, Lifecycle, PersistenceEvent};
pub use metadata::{EntityDescriptor, EntityKind, MetaData, Persistable, RelationshipField};
pub use object::{GraphObject, ObjectKey, ObjectRef, Related};
pub use types::{Cardinality, Direction, Identity, PropertyMap, PropertyValue};

//! ogm-compiler: change tracking and object-graph compilation.
//!
//! - [`MappingContext`]: the session's identity map of persisted state
//! - [`TransientRelationship`]: edges described by endpoint identities
//! - [`EntityGraphMapper`]: diffs an object graph against the mapping
//!   context and compiles the writes needed
//! - [`CompileContext`]: statements plus the registry of touched objects
//! - [`SaveBatch`] / [`SaveOutcome`]: what executors consume and return

pub mod batch;
pub mod compile;
pub mod context;
pub mod error;
pub mod mapper;
pub mod relationship;

#[cfg(test)]
mod fixtures;

pub use batch::{SaveBatch, SaveOutcome};
pub use compile::{CompileContext, RegistryEntry, Statement};
pub use context::{snapshot, MappingContext};
pub use error::CompileError;
pub use mapper::{changed_properties, EntityGraphMapper, ProvisionalIds};
pub use relationship::TransientRelationship;

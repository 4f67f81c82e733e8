//! ogm-session: the public save entry point.
//!
//! A [`Session`] owns the mapping context for one unit of work. Saving
//! compiles the target graph, notifies listeners (PRE_SAVE), hands the
//! merged batch to a [`RequestExecutor`], folds the result back into the
//! mapping context, and notifies again (POST_SAVE).

pub mod error;
pub mod executor;
pub mod memory;
pub mod notify;
pub mod session;

pub use error::{ExecutionError, SaveError};
pub use executor::RequestExecutor;
pub use memory::{MemoryExecutor, StoredNode, StoredRelationship};
pub use session::{SaveReport, SaveTarget, Session, SessionId};

//! The boundary to whatever performs the writes.

use std::future::Future;

use ogm_compiler::{SaveBatch, SaveOutcome};

use crate::error::ExecutionError;

/// Executes compiled save batches against a graph store.
///
/// Implementations should apply a batch all-or-nothing. On success they
/// return a native identity for every provisional node and relationship
/// entity the batch creates.
pub trait RequestExecutor: Send + Sync {
    fn execute_save(
        &self,
        batch: &SaveBatch,
    ) -> impl Future<Output = Result<SaveOutcome, ExecutionError>> + Send;
}

impl<E: RequestExecutor> RequestExecutor for std::sync::Arc<E> {
    fn execute_save(
        &self,
        batch: &SaveBatch,
    ) -> impl Future<Output = Result<SaveOutcome, ExecutionError>> + Send {
        (**self).execute_save(batch)
    }
}

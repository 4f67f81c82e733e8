//! The save orchestrator.

use std::fmt;
use std::sync::Arc;

use ogm_compiler::{
    CompileContext, EntityGraphMapper, MappingContext, ProvisionalIds, SaveBatch, SaveOutcome,
};
use ogm_core::{
    EventListener, Identity, Lifecycle, MetaData, ObjectRef, SessionConfig, UnknownTypePolicy,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SaveError};
use crate::executor::RequestExecutor;
use crate::notify;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to save: one object or a collection of roots.
#[derive(Debug, Clone)]
pub enum SaveTarget {
    One(ObjectRef),
    Many(Vec<ObjectRef>),
}

impl SaveTarget {
    fn into_roots(self) -> Vec<ObjectRef> {
        match self {
            Self::One(root) => vec![root],
            Self::Many(roots) => roots,
        }
    }
}

impl From<ObjectRef> for SaveTarget {
    fn from(root: ObjectRef) -> Self {
        Self::One(root)
    }
}

impl From<&ObjectRef> for SaveTarget {
    fn from(root: &ObjectRef) -> Self {
        Self::One(root.clone())
    }
}

impl From<Vec<ObjectRef>> for SaveTarget {
    fn from(roots: Vec<ObjectRef>) -> Self {
        Self::Many(roots)
    }
}

impl From<&[ObjectRef]> for SaveTarget {
    fn from(roots: &[ObjectRef]) -> Self {
        Self::Many(roots.to_vec())
    }
}

impl<const N: usize> From<[ObjectRef; N]> for SaveTarget {
    fn from(roots: [ObjectRef; N]) -> Self {
        Self::Many(roots.into())
    }
}

/// Summary of one save call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveReport {
    /// Compile contexts built, one per persistable root.
    pub contexts: usize,
    /// Statements executed after merging.
    pub statements: usize,
    /// PRE_SAVE plus POST_SAVE events dispatched.
    pub events_fired: usize,
    /// Roots left out because their type is not registered.
    pub skipped: usize,
    pub batch: SaveBatch,
}

/// A unit of work against one graph store.
///
/// Owns the mapping context, so saves through one session must not run
/// concurrently; `save` takes `&mut self` to enforce it.
pub struct Session<E> {
    id: SessionId,
    meta: Arc<MetaData>,
    mapping: MappingContext,
    executor: E,
    listeners: Vec<Arc<dyn EventListener>>,
    config: SessionConfig,
}

impl<E: RequestExecutor> Session<E> {
    pub fn new(meta: Arc<MetaData>, executor: E) -> Self {
        Self::with_config(meta, executor, SessionConfig::default())
    }

    pub fn with_config(meta: Arc<MetaData>, executor: E, config: SessionConfig) -> Self {
        let id = SessionId::new();
        tracing::debug!(session = %id, default_depth = config.default_depth, "Opened session");
        Self {
            id,
            meta,
            mapping: MappingContext::new(),
            executor,
            listeners: Vec::new(),
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetaData {
        &self.meta
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Read access to the identity map.
    pub fn context(&self) -> &MappingContext {
        &self.mapping
    }

    pub fn add_listener(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    pub fn register_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Track an object that already exists in the store, as if loaded.
    pub fn attach(&mut self, object: &ObjectRef) -> Result<Identity> {
        Ok(self.mapping.attach(&self.meta, object)?)
    }

    /// Forget everything the session has tracked.
    pub fn reset(&mut self) {
        tracing::debug!(
            session = %self.id,
            nodes = self.mapping.node_count(),
            "Resetting mapping context"
        );
        self.mapping.clear();
    }

    /// Save with the configured default depth.
    pub async fn save(&mut self, target: impl Into<SaveTarget>) -> Result<SaveReport> {
        let depth = self.config.default_depth;
        self.save_with_depth(target, depth).await
    }

    /// Save `target` and everything reachable from it within `depth` hops.
    ///
    /// Order of effects: compile, PRE_SAVE, execute, update the mapping
    /// context, POST_SAVE. A failure at any step stops the ones after it;
    /// in particular a failed execution leaves the mapping context as it
    /// was and fires no POST_SAVE.
    #[tracing::instrument(skip(self, target), fields(session = %self.id))]
    pub async fn save_with_depth(
        &mut self,
        target: impl Into<SaveTarget>,
        depth: i32,
    ) -> Result<SaveReport> {
        let roots = target.into().into_roots();
        let (contexts, skipped) = self.compile(&roots, depth)?;
        if contexts.is_empty() {
            tracing::debug!(skipped, "Nothing persistable to save");
            return Ok(SaveReport {
                skipped,
                ..Default::default()
            });
        }

        let subjects = notify::subjects(&contexts, &self.mapping);
        let pre = self.dispatch(&subjects, Lifecycle::PreSave)?;

        let batch = SaveBatch::from_contexts(&contexts)?;
        let outcome = if batch.is_empty() {
            SaveOutcome::default()
        } else {
            self.executor.execute_save(&batch).await.map_err(|e| {
                tracing::warn!(error = %e, transient = e.is_transient(), "Save execution failed");
                e
            })?
        };

        for ctx in &contexts {
            ctx.verify_outcome(&outcome)?;
        }
        for ctx in &contexts {
            ctx.commit(&mut self.mapping, &outcome)?;
        }

        let subjects = notify::subjects(&contexts, &self.mapping);
        let post = self.dispatch(&subjects, Lifecycle::PostSave)?;

        tracing::info!(
            contexts = contexts.len(),
            statements = batch.len(),
            events = pre + post,
            skipped,
            "Saved object graph"
        );
        Ok(SaveReport {
            contexts: contexts.len(),
            statements: batch.len(),
            events_fired: pre + post,
            skipped,
            batch,
        })
    }

    /// Compile each persistable root into its own sealed context.
    fn compile(&self, roots: &[ObjectRef], depth: i32) -> Result<(Vec<CompileContext>, usize)> {
        let mut ids = ProvisionalIds::new();
        let mut contexts = Vec::with_capacity(roots.len());
        let mut skipped = 0;

        for root in roots {
            if self.meta.classify_ref(root).is_none() {
                let type_name = root.type_name();
                match self.config.unknown_type_policy {
                    UnknownTypePolicy::Skip => {
                        tracing::warn!(
                            type_name,
                            "Object is not an instance of a persistable class; skipping"
                        );
                        skipped += 1;
                        continue;
                    }
                    UnknownTypePolicy::Fail => {
                        return Err(SaveError::NotPersistable {
                            type_name: type_name.to_string(),
                        });
                    }
                }
            }
            let mut ctx = EntityGraphMapper::new(&self.meta, &self.mapping, &mut ids).map(root, depth)?;
            ctx.seal();
            contexts.push(ctx);
        }
        Ok((contexts, skipped))
    }

    fn dispatch(&self, subjects: &[ObjectRef], lifecycle: Lifecycle) -> Result<usize> {
        notify::dispatch(
            &self.listeners,
            self.config.listener_failure_policy,
            subjects,
            lifecycle,
        )
    }
}

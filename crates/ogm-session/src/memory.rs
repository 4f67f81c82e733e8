//! In-process request executor.
//!
//! Keeps a tiny property graph in memory and applies each batch
//! all-or-nothing, assigning sequential native ids. Used by tests and by
//! dry runs of the CLI.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ogm_compiler::{SaveBatch, SaveOutcome, Statement, TransientRelationship};
use ogm_core::{Identity, PropertyMap, PropertyValue};
use serde::Serialize;

use crate::error::ExecutionError;
use crate::executor::RequestExecutor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNode {
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRelationship {
    pub src: Identity,
    pub tgt: Identity,
    pub rel_type: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default)]
struct Store {
    next_node: i64,
    next_relationship: i64,
    nodes: BTreeMap<Identity, StoredNode>,
    relationships: BTreeMap<Identity, StoredRelationship>,
}

fn apply_properties(target: &mut PropertyMap, changes: &PropertyMap) {
    for (key, value) in changes {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn rejected(message: impl Into<String>) -> ExecutionError {
    ExecutionError::Rejected(message.into())
}

impl Store {
    fn apply(&mut self, batch: &SaveBatch) -> Result<SaveOutcome, ExecutionError> {
        let mut outcome = SaveOutcome::default();
        for statement in batch {
            match statement {
                Statement::CreateNode {
                    node,
                    labels,
                    properties,
                } => {
                    if node.is_persisted() {
                        return Err(rejected(format!("node {node} already exists")));
                    }
                    let id = Identity(self.next_node);
                    self.next_node += 1;
                    self.nodes.insert(
                        id,
                        StoredNode {
                            labels: labels.iter().map(|l| l.to_string()).collect(),
                            properties: properties.clone(),
                        },
                    );
                    outcome.assign_node(*node, id);
                }
                Statement::UpdateNode {
                    node,
                    labels,
                    properties,
                } => {
                    let stored = self
                        .nodes
                        .get_mut(node)
                        .ok_or_else(|| rejected(format!("node {node} does not exist")))?;
                    for label in labels {
                        if !stored.labels.iter().any(|l| l == label) {
                            stored.labels.push(label.to_string());
                        }
                    }
                    apply_properties(&mut stored.properties, properties);
                }
                Statement::DeleteRelationship { relationship } => {
                    let found = self.find_relationship(relationship);
                    match found {
                        Some(id) => {
                            self.relationships.remove(&id);
                        }
                        None => tracing::trace!(
                            relationship = %relationship,
                            "Relationship to delete is already gone"
                        ),
                    }
                }
                Statement::CreateRelationship {
                    relationship,
                    properties,
                } => {
                    let endpoint = |id: Identity| {
                        outcome
                            .resolve_node(id)
                            .filter(|id| self.nodes.contains_key(id))
                            .ok_or_else(|| rejected(format!("node {id} does not exist")))
                    };
                    let src = endpoint(relationship.src)?;
                    let tgt = endpoint(relationship.tgt)?;
                    // Simple edges are merged: an identical edge is reused.
                    if relationship.rel_ref.is_none() {
                        let resolved =
                            TransientRelationship::new(src, tgt, relationship.rel_type.clone());
                        if let Some(existing) = self.find_relationship(&resolved) {
                            tracing::trace!(
                                relationship = %resolved,
                                %existing,
                                "Merged into existing relationship"
                            );
                            continue;
                        }
                    }
                    let id = Identity(self.next_relationship);
                    self.next_relationship += 1;
                    self.relationships.insert(
                        id,
                        StoredRelationship {
                            src,
                            tgt,
                            rel_type: relationship.rel_type.clone(),
                            properties: properties.clone(),
                        },
                    );
                    if let Some(r) = relationship.rel_ref.filter(|r| r.is_provisional()) {
                        outcome.assign_relationship(r, id);
                    }
                }
                Statement::UpdateRelationship {
                    relationship,
                    properties,
                    ..
                } => {
                    let stored = self.relationships.get_mut(relationship).ok_or_else(|| {
                        rejected(format!("relationship {relationship} does not exist"))
                    })?;
                    apply_properties(&mut stored.properties, properties);
                }
            }
        }
        Ok(outcome)
    }

    fn find_relationship(&self, edge: &TransientRelationship) -> Option<Identity> {
        if let Some(r) = edge.rel_ref {
            return self.relationships.contains_key(&r).then_some(r);
        }
        self.relationships
            .iter()
            .find(|(_, r)| r.src == edge.src && r.tgt == edge.tgt && r.rel_type == edge.rel_type)
            .map(|(id, _)| *id)
    }
}

#[derive(Debug, Default)]
struct State {
    store: Store,
    fail_next: Option<ExecutionError>,
    batches: Vec<SaveBatch>,
}

/// A [`RequestExecutor`] backed by an in-memory graph.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    state: Mutex<State>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `execute_save` fail with `error` without writing.
    pub fn fail_next(&self, error: ExecutionError) {
        self.state().fail_next = Some(error);
    }

    pub fn node(&self, id: Identity) -> Option<StoredNode> {
        self.state().store.nodes.get(&id).cloned()
    }

    pub fn relationship(&self, id: Identity) -> Option<StoredRelationship> {
        self.state().store.relationships.get(&id).cloned()
    }

    /// Stored relationships from `src` to `tgt`, any type.
    pub fn relationships_between(&self, src: Identity, tgt: Identity) -> Vec<StoredRelationship> {
        self.state()
            .store
            .relationships
            .values()
            .filter(|r| r.src == src && r.tgt == tgt)
            .cloned()
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.state().store.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state().store.relationships.len()
    }

    /// Number of batches applied successfully.
    pub fn batches_executed(&self) -> usize {
        self.state().batches.len()
    }

    pub fn last_batch(&self) -> Option<SaveBatch> {
        self.state().batches.last().cloned()
    }

    /// Property value of a stored node, `Null` if absent.
    pub fn node_property(&self, id: Identity, key: &str) -> PropertyValue {
        self.state()
            .store
            .nodes
            .get(&id)
            .and_then(|n| n.properties.get(key).cloned())
            .unwrap_or_default()
    }
}

impl RequestExecutor for MemoryExecutor {
    async fn execute_save(&self, batch: &SaveBatch) -> Result<SaveOutcome, ExecutionError> {
        let mut state = self.state();
        if let Some(error) = state.fail_next.take() {
            tracing::debug!(error = %error, "Injected execution failure");
            return Err(error);
        }

        let mut store = state.store.clone();
        let outcome = store.apply(batch)?;
        state.store = store;
        state.batches.push(batch.clone());
        tracing::debug!(
            statements = batch.len(),
            nodes = state.store.nodes.len(),
            relationships = state.store.relationships.len(),
            "Applied batch in memory"
        );
        Ok(outcome)
    }
}

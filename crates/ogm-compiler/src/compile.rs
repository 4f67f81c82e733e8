//! Compile contexts: the output of one mapping pass.
//!
//! A context carries the statements to execute, the registry of every
//! object and edge the pass touched, and enough bookkeeping to fold a
//! successful execution back into the mapping context.

use std::collections::{HashMap, HashSet};

use ogm_core::{Identity, ObjectKey, ObjectRef, PropertyMap};
use serde::Serialize;

use crate::batch::SaveOutcome;
use crate::context::MappingContext;
use crate::error::{CompileError, Result};
use crate::relationship::TransientRelationship;

// ── Statements ────────────────────────────────────────────────────

/// One low-level graph write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    CreateNode {
        node: Identity,
        labels: Vec<&'static str>,
        properties: PropertyMap,
    },
    /// Set changed properties on an existing node. `Null` removes.
    UpdateNode {
        node: Identity,
        labels: Vec<&'static str>,
        properties: PropertyMap,
    },
    CreateRelationship {
        relationship: TransientRelationship,
        properties: PropertyMap,
    },
    /// Set changed properties on an existing rich relationship.
    UpdateRelationship {
        relationship: Identity,
        rel_type: String,
        properties: PropertyMap,
    },
    DeleteRelationship {
        relationship: TransientRelationship,
    },
}

/// Identity of what a statement writes, for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum StatementKey {
    CreateNode(Identity),
    UpdateNode(Identity),
    CreateRelationship(TransientRelationship),
    UpdateRelationship(Identity),
    DeleteRelationship(TransientRelationship),
}

impl Statement {
    pub(crate) fn key(&self) -> StatementKey {
        match self {
            Self::CreateNode { node, .. } => StatementKey::CreateNode(*node),
            Self::UpdateNode { node, .. } => StatementKey::UpdateNode(*node),
            Self::CreateRelationship { relationship, .. } => {
                StatementKey::CreateRelationship(relationship.clone())
            }
            Self::UpdateRelationship { relationship, .. } => {
                StatementKey::UpdateRelationship(*relationship)
            }
            Self::DeleteRelationship { relationship } => {
                StatementKey::DeleteRelationship(relationship.clone())
            }
        }
    }

    /// Execution phase; lower runs first.
    pub(crate) fn phase(&self) -> u8 {
        match self {
            Self::CreateNode { .. } => 0,
            Self::UpdateNode { .. } => 1,
            Self::DeleteRelationship { .. } => 2,
            Self::CreateRelationship { .. } => 3,
            Self::UpdateRelationship { .. } => 4,
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// Something a mapping pass touched.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Entity(ObjectRef),
    Relationship(TransientRelationship),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RegistryKey {
    Entity(ObjectKey),
    Relationship(TransientRelationship),
}

impl RegistryEntry {
    fn key(&self) -> RegistryKey {
        match self {
            Self::Entity(object) => RegistryKey::Entity(object.key()),
            Self::Relationship(edge) => RegistryKey::Relationship(edge.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct MappedNode {
    identity: Identity,
    object: ObjectRef,
    snapshot: PropertyMap,
}

#[derive(Debug, Clone)]
struct MappedRelationshipEntity {
    identity: Identity,
    object: ObjectRef,
    snapshot: PropertyMap,
    edge: TransientRelationship,
}

// ── Context ───────────────────────────────────────────────────────

/// Accumulator for one mapping pass.
#[derive(Debug, Default)]
pub struct CompileContext {
    registry: Vec<RegistryEntry>,
    registered: HashSet<RegistryKey>,
    statements: Vec<Statement>,
    identities: HashMap<ObjectKey, Identity>,
    nodes: Vec<MappedNode>,
    relationship_entities: Vec<MappedRelationshipEntity>,
    created: Vec<TransientRelationship>,
    deleted: Vec<TransientRelationship>,
    sealed: bool,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every object and edge touched, in first-touch order, each once.
    pub fn registry(&self) -> &[RegistryEntry] {
        &self.registry
    }

    /// Pending writes in the order they were compiled.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn register_entity(&mut self, object: ObjectRef) -> bool {
        self.register(RegistryEntry::Entity(object))
    }

    pub fn register_relationship(&mut self, edge: TransientRelationship) -> bool {
        self.register(RegistryEntry::Relationship(edge))
    }

    fn register(&mut self, entry: RegistryEntry) -> bool {
        if !self.registered.insert(entry.key()) {
            return false;
        }
        self.registry.push(entry);
        true
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.registered
            .contains(&RegistryKey::Entity(object.key()))
    }

    /// Identity the pass assigned to `object`, provisional if unsaved.
    pub fn identity_of(&self, object: &ObjectRef) -> Option<Identity> {
        self.identities.get(&object.key()).copied()
    }

    pub fn push(&mut self, statement: Statement) -> Result<()> {
        if self.sealed {
            return Err(CompileError::Sealed);
        }
        tracing::debug!(statement = ?statement, "Compiled statement");
        self.statements.push(statement);
        Ok(())
    }

    /// Freeze the statement list ahead of execution.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn created_relationships(&self) -> &[TransientRelationship] {
        &self.created
    }

    pub fn deleted_relationships(&self) -> &[TransientRelationship] {
        &self.deleted
    }

    pub(crate) fn record_node(&mut self, identity: Identity, object: ObjectRef, snapshot: PropertyMap) {
        self.identities.insert(object.key(), identity);
        self.nodes.push(MappedNode {
            identity,
            object,
            snapshot,
        });
    }

    pub(crate) fn record_relationship_entity(
        &mut self,
        identity: Identity,
        object: ObjectRef,
        snapshot: PropertyMap,
        edge: TransientRelationship,
    ) {
        self.identities.insert(object.key(), identity);
        self.relationship_entities.push(MappedRelationshipEntity {
            identity,
            object,
            snapshot,
            edge,
        });
    }

    pub(crate) fn record_created(&mut self, edge: TransientRelationship) {
        self.created.push(edge);
    }

    pub(crate) fn record_deleted(&mut self, edge: TransientRelationship) {
        self.deleted.push(edge);
    }

    // ── Commit ────────────────────────────────────────────────────

    /// Fold a successful execution into `mapping`.
    ///
    /// Writes native ids back into new objects, refreshes snapshots, and
    /// updates the edge index. Nothing is changed if any provisional
    /// identity is missing from `outcome`.
    pub fn commit(&self, mapping: &mut MappingContext, outcome: &SaveOutcome) -> Result<()> {
        self.verify_outcome(outcome)?;

        let node = |id: Identity| outcome.resolve_node(id).unwrap_or(id);
        let relationship = |id: Identity| outcome.resolve_relationship(id).unwrap_or(id);
        let resolve_edge = |edge: &TransientRelationship| TransientRelationship {
            rel_ref: edge.rel_ref.map(relationship),
            ..edge.map_identities(node)
        };

        for edge in &self.deleted {
            let edge = resolve_edge(edge);
            mapping.deregister_relationship(&edge);
            if let Some(r) = edge.rel_ref {
                mapping.remove_relationship_entity(r);
            }
        }

        for mapped in &self.nodes {
            let id = node(mapped.identity);
            if mapped.identity.is_provisional() {
                mapped.object.write().set_id(id.0);
            }
            mapping.replace_node(id, mapped.object.clone(), mapped.snapshot.clone());
        }

        for mapped in &self.relationship_entities {
            let id = relationship(mapped.identity);
            if mapped.identity.is_provisional() {
                let previous = Identity::from_native(mapped.object.id());
                if let Some(previous) = previous.filter(|p| *p != id) {
                    mapping.remove_relationship_entity(previous);
                }
                mapped.object.write().set_id(id.0);
            }
            mapping.replace_relationship_entity(
                id,
                mapped.object.clone(),
                mapped.snapshot.clone(),
                resolve_edge(&mapped.edge),
            );
        }

        for edge in &self.created {
            mapping.register_relationship(resolve_edge(edge));
        }

        tracing::trace!(
            nodes = self.nodes.len(),
            relationship_entities = self.relationship_entities.len(),
            created = self.created.len(),
            deleted = self.deleted.len(),
            "Committed compile context"
        );
        Ok(())
    }

    /// Check that `outcome` resolves every provisional identity this
    /// context will write back.
    pub fn verify_outcome(&self, outcome: &SaveOutcome) -> Result<()> {
        let unresolved_node = self
            .nodes
            .iter()
            .map(|n| n.identity)
            .chain(self.created.iter().flat_map(|e| [e.src, e.tgt]))
            .find(|id| id.is_provisional() && outcome.resolve_node(*id).is_none());
        if let Some(identity) = unresolved_node {
            return Err(CompileError::UnresolvedIdentity {
                kind: "node",
                identity,
            });
        }

        let unresolved_relationship = self
            .relationship_entities
            .iter()
            .map(|r| r.identity)
            .find(|id| id.is_provisional() && outcome.resolve_relationship(*id).is_none());
        if let Some(identity) = unresolved_relationship {
            return Err(CompileError::UnresolvedIdentity {
                kind: "relationship",
                identity,
            });
        }
        Ok(())
    }
}

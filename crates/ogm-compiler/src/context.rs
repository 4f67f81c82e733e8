//! The mapping context: a session's memory of persisted graph state.
//!
//! Holds the object tracked for every known node and rich relationship
//! entity, the property snapshot last written for each, and an index of the
//! last-known edges touching every node. The compiler diffs current object
//! state against this.

use std::collections::{BTreeSet, HashMap};

use ogm_core::{
    EntityDescriptor, EntityKind, GraphObject, Identity, MetaData, ObjectRef, PropertyMap,
};

use crate::error::{CompileError, Result};
use crate::relationship::TransientRelationship;

static NO_RELATIONSHIPS: BTreeSet<TransientRelationship> = BTreeSet::new();

/// Property values of `object` for every declared property field.
pub fn snapshot(object: &dyn GraphObject, descriptor: &EntityDescriptor) -> PropertyMap {
    descriptor
        .property_fields
        .iter()
        .map(|field| (field.to_string(), object.property(field)))
        .collect()
}

#[derive(Debug, Clone)]
struct TrackedNode {
    object: ObjectRef,
    snapshot: PropertyMap,
}

#[derive(Debug, Clone)]
struct TrackedRelationshipEntity {
    object: ObjectRef,
    snapshot: PropertyMap,
    edge: TransientRelationship,
}

/// Per-session identity map.
#[derive(Debug, Default)]
pub struct MappingContext {
    nodes: HashMap<Identity, TrackedNode>,
    relationship_entities: HashMap<Identity, TrackedRelationshipEntity>,
    relationships: HashMap<Identity, BTreeSet<TransientRelationship>>,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ─────────────────────────────────────────────────────

    pub fn get_node_entity(&self, id: Identity) -> Option<&ObjectRef> {
        self.nodes.get(&id).map(|n| &n.object)
    }

    pub fn node_snapshot(&self, id: Identity) -> Option<&PropertyMap> {
        self.nodes.get(&id).map(|n| &n.snapshot)
    }

    /// Track `object` as node `id` with the property values last written.
    pub fn replace_node(&mut self, id: Identity, object: ObjectRef, snapshot: PropertyMap) {
        self.nodes.insert(id, TrackedNode { object, snapshot });
    }

    /// Forget node `id`, every edge touching it, and every relationship
    /// entity backing one of those edges.
    pub fn remove_node_entity(&mut self, id: Identity) -> Option<ObjectRef> {
        let removed = self.nodes.remove(&id)?;
        let edges = self.relationships.remove(&id).unwrap_or_default();
        for edge in &edges {
            if let Some(other) = self.other_endpoint(edge, id) {
                if let Some(set) = self.relationships.get_mut(&other) {
                    set.remove(edge);
                    if set.is_empty() {
                        self.relationships.remove(&other);
                    }
                }
            }
            if let Some(r) = edge.rel_ref {
                self.relationship_entities.remove(&r);
            }
        }
        tracing::trace!(node = %id, edges = edges.len(), "Removed node from mapping context");
        Some(removed.object)
    }

    fn other_endpoint(&self, edge: &TransientRelationship, id: Identity) -> Option<Identity> {
        match (edge.src == id, edge.tgt == id) {
            (true, false) => Some(edge.tgt),
            (false, true) => Some(edge.src),
            _ => None,
        }
    }

    // ── Edges ─────────────────────────────────────────────────────

    /// Last-known edges touching `id`. Unknown ids have none.
    pub fn relationships_for(&self, id: Identity) -> &BTreeSet<TransientRelationship> {
        self.relationships.get(&id).unwrap_or(&NO_RELATIONSHIPS)
    }

    pub fn contains_relationship(&self, edge: &TransientRelationship) -> bool {
        self.relationships_for(edge.src).contains(edge)
    }

    /// Remember `edge` on both endpoints. Returns false if already known.
    pub fn register_relationship(&mut self, edge: TransientRelationship) -> bool {
        let added = self
            .relationships
            .entry(edge.tgt)
            .or_default()
            .insert(edge.clone());
        self.relationships.entry(edge.src).or_default().insert(edge);
        added
    }

    /// Forget `edge`. Returns false if it was not known.
    pub fn deregister_relationship(&mut self, edge: &TransientRelationship) -> bool {
        let mut removed = false;
        for endpoint in [edge.src, edge.tgt] {
            if let Some(set) = self.relationships.get_mut(&endpoint) {
                removed |= set.remove(edge);
                if set.is_empty() {
                    self.relationships.remove(&endpoint);
                }
            }
        }
        removed
    }

    // ── Relationship entities ─────────────────────────────────────

    pub fn get_relationship_entity(&self, id: Identity) -> Option<&ObjectRef> {
        self.relationship_entities.get(&id).map(|r| &r.object)
    }

    pub fn relationship_snapshot(&self, id: Identity) -> Option<&PropertyMap> {
        self.relationship_entities.get(&id).map(|r| &r.snapshot)
    }

    /// Edge last persisted for relationship entity `id`.
    pub fn relationship_edge(&self, id: Identity) -> Option<&TransientRelationship> {
        self.relationship_entities.get(&id).map(|r| &r.edge)
    }

    /// Track `object` as relationship entity `id`, replacing any previous
    /// edge it was known by.
    pub fn replace_relationship_entity(
        &mut self,
        id: Identity,
        object: ObjectRef,
        snapshot: PropertyMap,
        edge: TransientRelationship,
    ) {
        if let Some(previous) = self.relationship_entities.get(&id).map(|r| r.edge.clone()) {
            if previous != edge {
                self.deregister_relationship(&previous);
            }
        }
        self.register_relationship(edge.clone());
        self.relationship_entities.insert(
            id,
            TrackedRelationshipEntity {
                object,
                snapshot,
                edge,
            },
        );
    }

    /// Forget relationship entity `id` and its edge.
    pub fn remove_relationship_entity(&mut self, id: Identity) -> Option<ObjectRef> {
        let removed = self.relationship_entities.remove(&id)?;
        self.deregister_relationship(&removed.edge);
        Some(removed.object)
    }

    // ── Loading ───────────────────────────────────────────────────

    /// Track an already persisted object as if it had just been loaded.
    ///
    /// Nodes also get their edges to already tracked nodes registered, so
    /// attach targets before the objects pointing at them. Relationship
    /// entities need both endpoints saved.
    pub fn attach(&mut self, meta: &MetaData, object: &ObjectRef) -> Result<Identity> {
        let guard = object.read();
        let type_name = guard.type_name();
        let descriptor = meta
            .classify(&*guard)
            .ok_or_else(|| CompileError::NotPersistable {
                type_name: type_name.to_string(),
            })?;
        let id = Identity::from_native(guard.id()).ok_or_else(|| CompileError::Unsaved {
            type_name: type_name.to_string(),
        })?;
        let properties = snapshot(&*guard, descriptor);

        match &descriptor.kind {
            EntityKind::Node { .. } => {
                let mut edges = Vec::new();
                for field in &descriptor.relationship_fields {
                    for target in guard.related(field.name).into_vec() {
                        if !meta.classify_ref(&target).is_some_and(EntityDescriptor::is_node) {
                            continue;
                        }
                        let Some(other) = Identity::from_native(target.id()) else {
                            continue;
                        };
                        if self.get_node_entity(other).is_some() {
                            edges.push(TransientRelationship::oriented(
                                field.direction,
                                id,
                                other,
                                field.rel_type,
                            ));
                        }
                    }
                }
                drop(guard);
                self.replace_node(id, object.clone(), properties);
                for edge in edges {
                    self.register_relationship(edge);
                }
            }
            EntityKind::Relationship {
                rel_type,
                start_field,
                end_field,
            } => {
                let endpoint = |field: &str| {
                    guard
                        .related(field)
                        .into_vec()
                        .first()
                        .and_then(|o| Identity::from_native(o.id()))
                        .ok_or_else(|| CompileError::IncompleteRelationship {
                            type_name: type_name.to_string(),
                            reason: format!("'{field}' must reference a saved node"),
                        })
                };
                let edge = TransientRelationship::rich(
                    endpoint(start_field)?,
                    endpoint(end_field)?,
                    *rel_type,
                    id,
                );
                drop(guard);
                self.replace_relationship_entity(id, object.clone(), properties, edge);
            }
        }
        tracing::trace!(type_name, id = %id, "Attached object to mapping context");
        Ok(id)
    }

    // ── Housekeeping ──────────────────────────────────────────────

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.relationship_entities.clear();
        self.relationships.clear();
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_entity_count(&self) -> usize {
        self.relationship_entities.len()
    }

    /// Number of distinct known edges.
    pub fn relationship_count(&self) -> usize {
        self.relationships
            .iter()
            .flat_map(|(id, set)| set.iter().filter(move |e| e.src == *id))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationship_entities.is_empty()
    }
}

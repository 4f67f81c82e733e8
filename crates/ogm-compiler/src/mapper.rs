//! The entity graph mapper.
//!
//! Walks an object graph breadth-first from a root, diffs every visited
//! object and edge against the mapping context, and records the writes
//! needed to reconcile them in a [`CompileContext`].
//!
//! Traversal rules:
//! - an object is visited once, at its minimal hop distance from the root
//! - a node `depth` hops away is mapped but its relationship fields are not
//!   followed (`depth < 0` is unbounded)
//! - a rich relationship entity counts as one hop and always brings both
//!   of its endpoints along
//! - objects whose type is not registered are skipped with a warning

use std::collections::{HashMap, HashSet, VecDeque};

use ogm_core::{
    Cardinality, EntityDescriptor, EntityKind, Identity, MetaData, ObjectKey,
    ObjectRef, PropertyMap, PropertyValue, RelationshipField,
};

use crate::compile::{CompileContext, Statement};
use crate::context::{snapshot, MappingContext};
use crate::error::{CompileError, Result};
use crate::relationship::TransientRelationship;

/// Provisional identities handed out during one save call.
///
/// Shared by every mapping pass of the call so an unsaved object reachable
/// from several roots gets one identity and is created once.
#[derive(Debug, Default)]
pub struct ProvisionalIds {
    assigned: HashMap<ObjectKey, Identity>,
}

impl ProvisionalIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisional identity of `object`, allocating one on first use.
    pub fn identity_for(&mut self, object: &ObjectRef) -> Identity {
        let next = Identity::provisional(self.assigned.len() as u64);
        *self.assigned.entry(object.key()).or_insert(next)
    }

    pub fn get(&self, object: &ObjectRef) -> Option<Identity> {
        self.assigned.get(&object.key()).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// Properties that differ between `before` and `after`. Fields missing
/// from `after` read as removed.
pub fn changed_properties(before: &PropertyMap, after: &PropertyMap) -> PropertyMap {
    let mut changed: PropertyMap = after
        .iter()
        .filter(|(k, v)| before.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for key in before.keys() {
        if !after.contains_key(key) {
            changed.insert(key.clone(), PropertyValue::Null);
        }
    }
    changed
}

fn without_nulls(properties: &PropertyMap) -> PropertyMap {
    properties
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

struct Claimed {
    edge: TransientRelationship,
    properties: PropertyMap,
}

/// State of one mapping pass.
struct Pass {
    depth: i32,
    ctx: CompileContext,
    visited: HashSet<ObjectKey>,
    queue: VecDeque<(ObjectRef, u32)>,
    claimed: Vec<Claimed>,
    claimed_edges: HashSet<TransientRelationship>,
    candidates: Vec<TransientRelationship>,
}

impl Pass {
    fn expands(&self, hops: u32) -> bool {
        self.depth < 0 || hops < self.depth as u32
    }

    fn enqueue(&mut self, object: ObjectRef, hops: u32) {
        if self.visited.insert(object.key()) {
            self.queue.push_back((object, hops));
        }
    }

    fn claim(&mut self, edge: TransientRelationship, properties: PropertyMap) {
        if self.claimed_edges.insert(edge.clone()) {
            self.ctx.register_relationship(edge.clone());
            self.claimed.push(Claimed { edge, properties });
        }
    }
}

/// Compiles object graphs against one mapping context.
pub struct EntityGraphMapper<'a> {
    meta: &'a MetaData,
    mapping: &'a MappingContext,
    ids: &'a mut ProvisionalIds,
}

impl<'a> EntityGraphMapper<'a> {
    pub fn new(meta: &'a MetaData, mapping: &'a MappingContext, ids: &'a mut ProvisionalIds) -> Self {
        Self { meta, mapping, ids }
    }

    /// Map `root` and everything reachable from it within `depth` hops.
    pub fn map(&mut self, root: &ObjectRef, depth: i32) -> Result<CompileContext> {
        let meta = self.meta;
        if meta.classify_ref(root).is_none() {
            return Err(CompileError::NotPersistable {
                type_name: root.type_name().to_string(),
            });
        }

        let mut pass = Pass {
            depth,
            ctx: CompileContext::new(),
            visited: HashSet::new(),
            queue: VecDeque::new(),
            claimed: Vec::new(),
            claimed_edges: HashSet::new(),
            candidates: Vec::new(),
        };
        pass.enqueue(root.clone(), 0);

        while let Some((object, hops)) = pass.queue.pop_front() {
            let Some(descriptor) = meta.classify_ref(&object) else {
                continue;
            };
            match descriptor.kind {
                EntityKind::Node { .. } => self.map_node(&mut pass, &object, descriptor, hops)?,
                EntityKind::Relationship { .. } => {
                    self.map_relationship_entity(&mut pass, &object, descriptor, hops)?
                }
            }
        }

        self.finish(&mut pass)?;
        tracing::debug!(
            root = root.type_name(),
            depth,
            visited = pass.visited.len(),
            statements = pass.ctx.statements().len(),
            "Mapped object graph"
        );
        Ok(pass.ctx)
    }

    /// Native identity if saved, otherwise this call's provisional one.
    fn identity(&mut self, object: &ObjectRef) -> Identity {
        match Identity::from_native(object.id()) {
            Some(id) => id,
            None => self.ids.identity_for(object),
        }
    }

    // ── Nodes ─────────────────────────────────────────────────────

    fn map_node(
        &mut self,
        pass: &mut Pass,
        object: &ObjectRef,
        descriptor: &EntityDescriptor,
        hops: u32,
    ) -> Result<()> {
        let meta = self.meta;
        let expand = pass.expands(hops);
        let (properties, fields) = {
            let guard = object.read();
            let properties = snapshot(&*guard, descriptor);
            let fields: Vec<(&RelationshipField, Vec<ObjectRef>)> = if expand {
                descriptor
                    .relationship_fields
                    .iter()
                    .map(|f| (f, guard.related(f.name).into_vec()))
                    .collect()
            } else {
                Vec::new()
            };
            (properties, fields)
        };

        let identity = self.identity(object);
        pass.ctx.register_entity(object.clone());

        let labels = descriptor.labels().to_vec();
        if identity.is_provisional() {
            pass.ctx.push(Statement::CreateNode {
                node: identity,
                labels,
                properties: without_nulls(&properties),
            })?;
        } else {
            let changed = match self.mapping.node_snapshot(identity) {
                Some(before) => changed_properties(before, &properties),
                None => properties.clone(),
            };
            if !changed.is_empty() {
                pass.ctx.push(Statement::UpdateNode {
                    node: identity,
                    labels,
                    properties: changed,
                })?;
            }
        }
        pass.ctx.record_node(identity, object.clone(), properties);

        if !expand {
            return Ok(());
        }

        if identity.is_persisted() {
            for edge in self.mapping.relationships_for(identity) {
                let managed = edge
                    .direction_from(identity)
                    .is_some_and(|d| descriptor.manages(&edge.rel_type, d));
                if managed {
                    pass.candidates.push(edge.clone());
                }
            }
        }

        for (field, targets) in fields {
            if field.cardinality == Cardinality::One && targets.len() > 1 {
                tracing::warn!(
                    type_name = descriptor.type_name,
                    field = field.name,
                    count = targets.len(),
                    "Single-valued relationship field holds several objects"
                );
            }
            for target in targets {
                let Some(target_descriptor) = meta.classify_ref(&target) else {
                    tracing::warn!(
                        type_name = target.type_name(),
                        field = field.name,
                        "Skipping object that is not an instance of a persistable class"
                    );
                    continue;
                };
                match target_descriptor.kind {
                    EntityKind::Node { .. } => {
                        let other = self.identity(&target);
                        let edge = TransientRelationship::oriented(
                            field.direction,
                            identity,
                            other,
                            field.rel_type,
                        );
                        pass.claim(edge, PropertyMap::new());
                        pass.enqueue(target, hops + 1);
                    }
                    EntityKind::Relationship { rel_type, .. } => {
                        if rel_type != field.rel_type {
                            tracing::warn!(
                                type_name = descriptor.type_name,
                                field = field.name,
                                expected = field.rel_type,
                                found = rel_type,
                                "Skipping relationship entity of the wrong type"
                            );
                            continue;
                        }
                        pass.enqueue(target, hops + 1);
                    }
                }
            }
        }
        Ok(())
    }

    // ── Rich relationships ────────────────────────────────────────

    fn map_relationship_entity(
        &mut self,
        pass: &mut Pass,
        object: &ObjectRef,
        descriptor: &EntityDescriptor,
        hops: u32,
    ) -> Result<()> {
        let EntityKind::Relationship {
            rel_type,
            start_field,
            end_field,
        } = descriptor.kind
        else {
            return Ok(());
        };

        let (native, properties, start, end) = {
            let guard = object.read();
            (
                Identity::from_native(guard.id()),
                snapshot(&*guard, descriptor),
                guard.related(start_field).into_vec().into_iter().next(),
                guard.related(end_field).into_vec().into_iter().next(),
            )
        };
        let start = self.endpoint(descriptor, start_field, start)?;
        let end = self.endpoint(descriptor, end_field, end)?;
        let src = self.identity(&start);
        let tgt = self.identity(&end);

        // An edge cannot change endpoints in place; a moved relationship is
        // deleted and created again under a new identity.
        let identity = match native {
            None => self.ids.identity_for(object),
            Some(id) => match self.mapping.relationship_edge(id) {
                Some(previous) if previous.src != src || previous.tgt != tgt => {
                    pass.candidates.push(previous.clone());
                    self.ids.identity_for(object)
                }
                _ => id,
            },
        };

        pass.ctx.register_entity(object.clone());
        let edge = TransientRelationship::rich(src, tgt, rel_type, identity);

        if identity.is_persisted() {
            let changed = match self.mapping.relationship_snapshot(identity) {
                Some(before) => changed_properties(before, &properties),
                None => properties.clone(),
            };
            if !changed.is_empty() {
                pass.ctx.push(Statement::UpdateRelationship {
                    relationship: identity,
                    rel_type: rel_type.to_string(),
                    properties: changed,
                })?;
            }
        }

        pass.ctx
            .record_relationship_entity(identity, object.clone(), properties.clone(), edge.clone());
        pass.claim(edge, without_nulls(&properties));
        pass.enqueue(start, hops);
        pass.enqueue(end, hops);
        Ok(())
    }

    fn endpoint(
        &self,
        descriptor: &EntityDescriptor,
        field: &str,
        target: Option<ObjectRef>,
    ) -> Result<ObjectRef> {
        let incomplete = |reason: String| CompileError::IncompleteRelationship {
            type_name: descriptor.type_name.to_string(),
            reason,
        };
        let target = target.ok_or_else(|| incomplete(format!("'{field}' is not set")))?;
        match self.meta.classify_ref(&target) {
            Some(d) if d.is_node() => Ok(target),
            _ => Err(incomplete(format!(
                "'{field}' references {}, which is not a node entity",
                target.type_name()
            ))),
        }
    }

    // ── Edge diff ─────────────────────────────────────────────────

    fn finish(&self, pass: &mut Pass) -> Result<()> {
        for claimed in std::mem::take(&mut pass.claimed) {
            let edge = claimed.edge;
            let create = match edge.rel_ref {
                Some(r) => r.is_provisional(),
                None => edge.is_provisional() || !self.mapping.contains_relationship(&edge),
            };
            if create {
                pass.ctx.push(Statement::CreateRelationship {
                    relationship: edge.clone(),
                    properties: claimed.properties,
                })?;
                pass.ctx.record_created(edge);
            }
        }

        let mut deleted = HashSet::new();
        for edge in std::mem::take(&mut pass.candidates) {
            if pass.claimed_edges.contains(&edge) || !deleted.insert(edge.clone()) {
                continue;
            }
            pass.ctx.register_relationship(edge.clone());
            pass.ctx.push(Statement::DeleteRelationship {
                relationship: edge.clone(),
            })?;
            pass.ctx.record_deleted(edge);
        }
        Ok(())
    }
}

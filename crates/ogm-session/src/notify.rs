//! Lifecycle notification.
//!
//! Subjects are gathered from compile context registries:
//! - every registered domain object is a subject
//! - a simple relationship makes each saved endpoint still tracked by the
//!   mapping context a subject
//! - rich relationships are skipped; their backing entity is already
//!   registered as a domain object
//!
//! Each subject is notified once per lifecycle, in first-seen order, even
//! when several contexts reach it.

use std::collections::HashSet;
use std::sync::Arc;

use ogm_compiler::{CompileContext, MappingContext, RegistryEntry};
use ogm_core::{EventListener, Lifecycle, ListenerFailurePolicy, ObjectRef, PersistenceEvent};

use crate::error::{Result, SaveError};

/// Objects to notify for `contexts`, resolved against `mapping`.
pub fn subjects(contexts: &[CompileContext], mapping: &MappingContext) -> Vec<ObjectRef> {
    let mut seen = HashSet::new();
    let mut subjects = Vec::new();
    let mut add = |object: &ObjectRef| {
        if seen.insert(object.key()) {
            subjects.push(object.clone());
        }
    };

    for entry in contexts.iter().flat_map(|c| c.registry()) {
        match entry {
            RegistryEntry::Entity(object) => add(object),
            RegistryEntry::Relationship(edge) => {
                if edge.is_rich() {
                    continue;
                }
                for endpoint in [edge.src, edge.tgt] {
                    if !endpoint.is_persisted() {
                        continue;
                    }
                    if let Some(object) = mapping.get_node_entity(endpoint) {
                        add(object);
                    }
                }
            }
        }
    }
    subjects
}

/// Dispatch one lifecycle event per subject to every listener.
///
/// Returns how many events were dispatched.
pub fn dispatch(
    listeners: &[Arc<dyn EventListener>],
    policy: ListenerFailurePolicy,
    subjects: &[ObjectRef],
    lifecycle: Lifecycle,
) -> Result<usize> {
    for subject in subjects {
        let event = PersistenceEvent::new(subject.clone(), lifecycle);
        for listener in listeners {
            let Err(source) = listener.on_event(&event) else {
                continue;
            };
            let description = format!("{subject:?}");
            match policy {
                ListenerFailurePolicy::Propagate => {
                    return Err(SaveError::Listener {
                        lifecycle,
                        subject: description,
                        source,
                    });
                }
                ListenerFailurePolicy::Isolate => {
                    tracing::warn!(
                        lifecycle = %lifecycle,
                        subject = %description,
                        error = %source,
                        "Listener failed; continuing"
                    );
                }
            }
        }
    }
    tracing::trace!(lifecycle = %lifecycle, events = subjects.len(), "Dispatched events");
    Ok(subjects.len())
}

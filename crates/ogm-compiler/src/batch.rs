//! Merging compile contexts into one executable batch.
//!
//! Statements run in phases so every write finds what it references:
//! - Node creates first, then node updates
//! - Relationship deletes before relationship creates, so a moved edge is
//!   never briefly duplicated
//! - Relationship property updates last

use std::collections::{HashMap, HashSet};

use ogm_core::Identity;
use serde::{Deserialize, Serialize};

use crate::compile::{CompileContext, Statement};
use crate::error::{CompileError, Result};

/// Ordered, de-duplicated statements from one or more compile contexts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveBatch {
    statements: Vec<Statement>,
}

impl SaveBatch {
    /// Merge sealed contexts. Statements writing the same thing (for example
    /// the creation of a node reachable from two roots) appear once.
    pub fn from_contexts(contexts: &[CompileContext]) -> Result<Self> {
        if contexts.iter().any(|c| !c.is_sealed()) {
            return Err(CompileError::NotSealed);
        }

        let mut seen = HashSet::new();
        let mut statements: Vec<Statement> = contexts
            .iter()
            .flat_map(|c| c.statements())
            .filter(|s| seen.insert(s.key()))
            .cloned()
            .collect();
        // Stable: compile order is kept within a phase.
        statements.sort_by_key(Statement::phase);

        tracing::debug!(
            contexts = contexts.len(),
            statements = statements.len(),
            "Built save batch"
        );
        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statement counts keyed by operation name.
    pub fn summary(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for statement in &self.statements {
            let op = match statement {
                Statement::CreateNode { .. } => "create_node",
                Statement::UpdateNode { .. } => "update_node",
                Statement::CreateRelationship { .. } => "create_relationship",
                Statement::UpdateRelationship { .. } => "update_relationship",
                Statement::DeleteRelationship { .. } => "delete_relationship",
            };
            *counts.entry(op).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a SaveBatch {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Native identities assigned by an executor, keyed by provisional identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub node_ids: HashMap<Identity, Identity>,
    pub relationship_ids: HashMap<Identity, Identity>,
}

impl SaveOutcome {
    pub fn assign_node(&mut self, provisional: Identity, native: Identity) {
        self.node_ids.insert(provisional, native);
    }

    pub fn assign_relationship(&mut self, provisional: Identity, native: Identity) {
        self.relationship_ids.insert(provisional, native);
    }

    /// Native id for `id`: itself when already native, the assignment when
    /// provisional.
    pub fn resolve_node(&self, id: Identity) -> Option<Identity> {
        if id.is_persisted() {
            Some(id)
        } else {
            self.node_ids.get(&id).copied()
        }
    }

    pub fn resolve_relationship(&self, id: Identity) -> Option<Identity> {
        if id.is_persisted() {
            Some(id)
        } else {
            self.relationship_ids.get(&id).copied()
        }
    }
}

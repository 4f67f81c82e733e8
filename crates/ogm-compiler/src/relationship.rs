//! Transient relationships: edges described by endpoint identities.

use std::fmt;

use ogm_core::{Direction, Identity};
use serde::{Deserialize, Serialize};

/// One edge between two node identities.
///
/// `rel_ref` is set when the edge is backed by a rich relationship entity,
/// and then holds that entity's identity (provisional while unsaved).
/// Values are immutable and compared on all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransientRelationship {
    pub src: Identity,
    pub tgt: Identity,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none", default)]
    pub rel_ref: Option<Identity>,
}

impl TransientRelationship {
    /// A simple edge with no backing entity.
    pub fn new(src: Identity, tgt: Identity, rel_type: impl Into<String>) -> Self {
        Self {
            src,
            tgt,
            rel_type: rel_type.into(),
            rel_ref: None,
        }
    }

    /// An edge backed by the relationship entity `rel_ref`.
    pub fn rich(src: Identity, tgt: Identity, rel_type: impl Into<String>, rel_ref: Identity) -> Self {
        Self {
            rel_ref: Some(rel_ref),
            ..Self::new(src, tgt, rel_type)
        }
    }

    /// Edge from `node` to `other` as seen through a field of `node` with
    /// the given direction.
    pub fn oriented(
        direction: Direction,
        node: Identity,
        other: Identity,
        rel_type: impl Into<String>,
    ) -> Self {
        match direction {
            Direction::Outgoing => Self::new(node, other, rel_type),
            Direction::Incoming => Self::new(other, node, rel_type),
        }
    }

    /// Backed by a relationship entity with a positive identity. A reference
    /// that is absent, zero or provisional reads as a simple edge.
    pub fn is_rich(&self) -> bool {
        self.rel_ref.is_some_and(|r| r.0 > 0)
    }

    /// Direction of this edge relative to `node`, if it touches it.
    /// Self loops read as outgoing.
    pub fn direction_from(&self, node: Identity) -> Option<Direction> {
        if self.src == node {
            Some(Direction::Outgoing)
        } else if self.tgt == node {
            Some(Direction::Incoming)
        } else {
            None
        }
    }

    /// Whether any endpoint or the backing entity is still unsaved.
    pub fn is_provisional(&self) -> bool {
        self.src.is_provisional()
            || self.tgt.is_provisional()
            || self.rel_ref.is_some_and(Identity::is_provisional)
    }

    /// Copy with identities rewritten through `resolve`.
    pub fn map_identities(&self, mut resolve: impl FnMut(Identity) -> Identity) -> Self {
        Self {
            src: resolve(self.src),
            tgt: resolve(self.tgt),
            rel_type: self.rel_type.clone(),
            rel_ref: self.rel_ref,
        }
    }
}

impl fmt::Display for TransientRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}", self.src, self.rel_type)?;
        if let Some(r) = self.rel_ref {
            write!(f, " #{r}")?;
        }
        write!(f, "]->({})", self.tgt)
    }
}

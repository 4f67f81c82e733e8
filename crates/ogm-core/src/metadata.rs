//! Statically declared entity metadata.
//!
//! Every persistable type declares an [`EntityDescriptor`] up front and is
//! registered into a [`MetaData`] table at startup. Classification is a table
//! lookup by type name.

use std::collections::{BTreeMap, HashSet};

use crate::error::{OgmError, Result};
use crate::object::{GraphObject, ObjectRef};
use crate::types::{Cardinality, Direction};

/// What kind of graph element a type maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// A node carrying one or more labels.
    Node { labels: Vec<&'static str> },
    /// A rich relationship: an edge with its own identity and properties.
    /// `start_field` and `end_field` name the fields holding its endpoints.
    Relationship {
        rel_type: &'static str,
        start_field: &'static str,
        end_field: &'static str,
    },
}

/// A relationship-valued field on a node entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipField {
    pub name: &'static str,
    pub rel_type: &'static str,
    pub direction: Direction,
    pub cardinality: Cardinality,
}

impl RelationshipField {
    pub fn outgoing(name: &'static str, rel_type: &'static str) -> Self {
        Self {
            name,
            rel_type,
            direction: Direction::Outgoing,
            cardinality: Cardinality::Many,
        }
    }

    pub fn incoming(name: &'static str, rel_type: &'static str) -> Self {
        Self {
            direction: Direction::Incoming,
            ..Self::outgoing(name, rel_type)
        }
    }

    pub fn single(mut self) -> Self {
        self.cardinality = Cardinality::One;
        self
    }
}

/// Declared shape of one persistable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub type_name: &'static str,
    pub kind: EntityKind,
    pub identity_field: &'static str,
    pub property_fields: Vec<&'static str>,
    pub relationship_fields: Vec<RelationshipField>,
}

impl EntityDescriptor {
    /// A node entity labelled with its type name.
    pub fn node(type_name: &'static str) -> Self {
        Self {
            type_name,
            kind: EntityKind::Node {
                labels: vec![type_name],
            },
            identity_field: "id",
            property_fields: Vec::new(),
            relationship_fields: Vec::new(),
        }
    }

    /// A rich relationship entity.
    pub fn relationship(
        type_name: &'static str,
        rel_type: &'static str,
        start_field: &'static str,
        end_field: &'static str,
    ) -> Self {
        Self {
            type_name,
            kind: EntityKind::Relationship {
                rel_type,
                start_field,
                end_field,
            },
            identity_field: "id",
            property_fields: Vec::new(),
            relationship_fields: Vec::new(),
        }
    }

    /// Add an extra label. No effect on relationship entities.
    pub fn label(mut self, label: &'static str) -> Self {
        if let EntityKind::Node { labels } = &mut self.kind {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        self
    }

    pub fn identity(mut self, field: &'static str) -> Self {
        self.identity_field = field;
        self
    }

    pub fn property(mut self, field: &'static str) -> Self {
        self.property_fields.push(field);
        self
    }

    pub fn properties(mut self, fields: &[&'static str]) -> Self {
        self.property_fields.extend_from_slice(fields);
        self
    }

    pub fn relationship_field(mut self, field: RelationshipField) -> Self {
        self.relationship_fields.push(field);
        self
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, EntityKind::Node { .. })
    }

    pub fn is_relationship_entity(&self) -> bool {
        matches!(self.kind, EntityKind::Relationship { .. })
    }

    /// Node labels; empty for relationship entities.
    pub fn labels(&self) -> &[&'static str] {
        match &self.kind {
            EntityKind::Node { labels } => labels,
            EntityKind::Relationship { .. } => &[],
        }
    }

    pub fn rel_type(&self) -> Option<&'static str> {
        match self.kind {
            EntityKind::Relationship { rel_type, .. } => Some(rel_type),
            EntityKind::Node { .. } => None,
        }
    }

    pub fn find_relationship_field(&self, name: &str) -> Option<&RelationshipField> {
        self.relationship_fields.iter().find(|f| f.name == name)
    }

    /// Whether some relationship field of this entity owns edges of the
    /// given type in the given direction.
    pub fn manages(&self, rel_type: &str, direction: Direction) -> bool {
        self.relationship_fields
            .iter()
            .any(|f| f.rel_type == rel_type && f.direction == direction)
    }

    fn validate(&self) -> Result<()> {
        let name = self.type_name;
        if name.is_empty() {
            return Err(OgmError::metadata(name, "type name is empty"));
        }
        if self.identity_field.is_empty() {
            return Err(OgmError::metadata(name, "identity field is empty"));
        }

        match &self.kind {
            EntityKind::Node { labels } => {
                if labels.is_empty() || labels.iter().any(|l| l.is_empty()) {
                    return Err(OgmError::metadata(name, "node entities need a non-empty label"));
                }
            }
            EntityKind::Relationship {
                rel_type,
                start_field,
                end_field,
            } => {
                if rel_type.is_empty() {
                    return Err(OgmError::metadata(name, "relationship type is empty"));
                }
                if start_field.is_empty() || end_field.is_empty() {
                    return Err(OgmError::metadata(name, "start and end fields are required"));
                }
                if start_field == end_field {
                    return Err(OgmError::metadata(
                        name,
                        "start and end fields must be different",
                    ));
                }
                if !self.relationship_fields.is_empty() {
                    return Err(OgmError::metadata(
                        name,
                        "relationship entities cannot declare relationship fields",
                    ));
                }
            }
        }

        let mut seen = HashSet::new();
        seen.insert(self.identity_field);
        let names = self
            .property_fields
            .iter()
            .copied()
            .chain(self.relationship_fields.iter().map(|f| f.name));
        for field in names {
            if field.is_empty() {
                return Err(OgmError::metadata(name, "field name is empty"));
            }
            if !seen.insert(field) {
                return Err(OgmError::metadata(
                    name,
                    format!("field '{field}' is declared more than once"),
                ));
            }
        }

        if let Some(field) = self
            .relationship_fields
            .iter()
            .find(|f| f.rel_type.is_empty())
        {
            return Err(OgmError::metadata(
                name,
                format!("relationship field '{}' has an empty type", field.name),
            ));
        }
        Ok(())
    }
}

/// Types that can describe themselves for registration.
pub trait Persistable: GraphObject {
    fn descriptor() -> EntityDescriptor;
}

// ── Registry ──────────────────────────────────────────────────────

/// Lookup table of every registered persistable type.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    descriptors: BTreeMap<&'static str, EntityDescriptor>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Persistable>(&mut self) -> Result<()> {
        self.register_descriptor(T::descriptor())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Persistable>(mut self) -> Result<Self> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn register_descriptor(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.descriptors.contains_key(descriptor.type_name) {
            return Err(OgmError::metadata(
                descriptor.type_name,
                "type is already registered",
            ));
        }
        tracing::debug!(
            type_name = descriptor.type_name,
            relationship_entity = descriptor.is_relationship_entity(),
            "Registered entity"
        );
        self.descriptors.insert(descriptor.type_name, descriptor);
        Ok(())
    }

    /// Persistable classification of an object, `None` if its type is not
    /// registered.
    pub fn classify(&self, object: &dyn GraphObject) -> Option<&EntityDescriptor> {
        self.descriptor(object.type_name())
    }

    pub fn classify_ref(&self, object: &ObjectRef) -> Option<&EntityDescriptor> {
        self.descriptor(object.type_name())
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&EntityDescriptor> {
        self.descriptors.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

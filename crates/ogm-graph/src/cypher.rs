//! Rendering compiled statements as parameterised Cypher.
//!
//! Entities are addressed by native id. Provisional identities are resolved
//! through the outcome accumulated so far in the batch, which is why node
//! creates must run before the statements that reference them.

use std::fmt::Write as _;

use neo4rs::{query, Query};
use ogm_compiler::{SaveOutcome, Statement, TransientRelationship};
use ogm_core::{Identity, PropertyMap, PropertyValue};

use crate::client::GraphError;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bools(Vec<bool>),
    Integers(Vec<i64>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl ParamValue {
    /// Neo4j stores homogeneous lists of scalars only; anything else is
    /// stored as its JSON text. `None` for `Null`.
    pub fn from_property(value: &PropertyValue) -> Result<Option<Self>, GraphError> {
        Ok(Some(match value {
            PropertyValue::Null => return Ok(None),
            PropertyValue::Bool(b) => Self::Bool(*b),
            PropertyValue::Integer(i) => Self::Integer(*i),
            PropertyValue::Float(f) => Self::Float(*f),
            PropertyValue::String(s) => Self::String(s.clone()),
            PropertyValue::List(items) => list_param(items)?,
        }))
    }
}

fn list_param(items: &[PropertyValue]) -> Result<ParamValue, GraphError> {
    macro_rules! collect_as {
        ($variant:ident, $source:ident) => {
            items
                .iter()
                .map(|v| match v {
                    PropertyValue::$source(x) => Some(x.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::$variant)
        };
    }

    if items.is_empty() {
        return Ok(ParamValue::Strings(Vec::new()));
    }
    let typed = collect_as!(Strings, String)
        .or_else(|| collect_as!(Integers, Integer))
        .or_else(|| collect_as!(Floats, Float))
        .or_else(|| collect_as!(Bools, Bool));
    match typed {
        Some(param) => Ok(param),
        None => serde_json::to_string(items)
            .map(ParamValue::String)
            .map_err(|e| GraphError::Serialization(e.to_string())),
    }
}

/// What the `id` column of a statement's result means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    /// Native id of the node created for this provisional identity.
    CreatedNode(Identity),
    /// Native id of the relationship created; carries the provisional
    /// identity of its backing entity, if any.
    CreatedRelationship(Option<Identity>),
    /// A row proves the node exists.
    ExistingNode(Identity),
    /// A row proves the relationship exists.
    ExistingRelationship(Identity),
    /// Nothing is returned.
    Nothing,
}

/// One rendered statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Cypher {
    pub text: String,
    pub params: Vec<(String, ParamValue)>,
    pub returns: Returns,
}

impl Cypher {
    pub fn to_query(&self) -> Query {
        self.params
            .iter()
            .fold(query(&self.text), |q, (name, value)| bind(q, name, value))
    }
}

fn bind(q: Query, name: &str, value: &ParamValue) -> Query {
    match value {
        ParamValue::Bool(v) => q.param(name, *v),
        ParamValue::Integer(v) => q.param(name, *v),
        ParamValue::Float(v) => q.param(name, *v),
        ParamValue::String(v) => q.param(name, v.clone()),
        ParamValue::Bools(v) => q.param(name, v.clone()),
        ParamValue::Integers(v) => q.param(name, v.clone()),
        ParamValue::Floats(v) => q.param(name, v.clone()),
        ParamValue::Strings(v) => q.param(name, v.clone()),
    }
}

/// Backtick-quote a label, relationship type, or property key.
pub fn escape(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

// ── Rendering ─────────────────────────────────────────────────────

/// Render `statement`, resolving provisional identities through `outcome`.
pub fn render(statement: &Statement, outcome: &SaveOutcome) -> Result<Cypher, GraphError> {
    let mut params = Vec::new();
    let cypher = match statement {
        Statement::CreateNode {
            node,
            labels,
            properties,
        } => {
            let mut text = String::from("CREATE (n");
            for label in labels {
                let _ = write!(text, ":{}", escape(label));
            }
            text.push(')');
            text.push_str(&set_clause("n", properties, &mut params)?);
            text.push_str(" RETURN id(n) AS id");
            Cypher {
                text,
                params,
                returns: Returns::CreatedNode(*node),
            }
        }
        Statement::UpdateNode {
            node, properties, ..
        } => {
            let id = resolve_node(outcome, *node)?;
            params.push(("id".to_string(), ParamValue::Integer(id.0)));
            let mut text = String::from("MATCH (n) WHERE id(n) = $id");
            text.push_str(&set_clause("n", properties, &mut params)?);
            text.push_str(" RETURN id(n) AS id");
            Cypher {
                text,
                params,
                returns: Returns::ExistingNode(id),
            }
        }
        Statement::DeleteRelationship { relationship } => delete(relationship, outcome)?,
        Statement::CreateRelationship {
            relationship,
            properties,
        } => {
            let src = resolve_node(outcome, relationship.src)?;
            let tgt = resolve_node(outcome, relationship.tgt)?;
            params.push(("src".to_string(), ParamValue::Integer(src.0)));
            params.push(("tgt".to_string(), ParamValue::Integer(tgt.0)));
            // Simple edges are merged so a stale mapping cannot duplicate them.
            let verb = if relationship.rel_ref.is_some() {
                "CREATE"
            } else {
                "MERGE"
            };
            let mut text = format!(
                "MATCH (a) WHERE id(a) = $src MATCH (b) WHERE id(b) = $tgt {verb} (a)-[r:{}]->(b)",
                escape(&relationship.rel_type)
            );
            text.push_str(&set_clause("r", properties, &mut params)?);
            text.push_str(" RETURN id(r) AS id");
            Cypher {
                text,
                params,
                returns: Returns::CreatedRelationship(
                    relationship.rel_ref.filter(|r| r.is_provisional()),
                ),
            }
        }
        Statement::UpdateRelationship {
            relationship,
            properties,
            ..
        } => {
            let id = resolve_relationship(outcome, *relationship)?;
            params.push(("id".to_string(), ParamValue::Integer(id.0)));
            let mut text = String::from("MATCH ()-[r]->() WHERE id(r) = $id");
            text.push_str(&set_clause("r", properties, &mut params)?);
            text.push_str(" RETURN id(r) AS id");
            Cypher {
                text,
                params,
                returns: Returns::ExistingRelationship(id),
            }
        }
    };
    Ok(cypher)
}

fn delete(edge: &TransientRelationship, outcome: &SaveOutcome) -> Result<Cypher, GraphError> {
    if let Some(r) = edge.rel_ref {
        let id = resolve_relationship(outcome, r)?;
        return Ok(Cypher {
            text: "MATCH ()-[r]->() WHERE id(r) = $id DELETE r".to_string(),
            params: vec![("id".to_string(), ParamValue::Integer(id.0))],
            returns: Returns::Nothing,
        });
    }
    let src = resolve_node(outcome, edge.src)?;
    let tgt = resolve_node(outcome, edge.tgt)?;
    Ok(Cypher {
        text: format!(
            "MATCH (a)-[r:{}]->(b) WHERE id(a) = $src AND id(b) = $tgt WITH r LIMIT 1 DELETE r",
            escape(&edge.rel_type)
        ),
        params: vec![
            ("src".to_string(), ParamValue::Integer(src.0)),
            ("tgt".to_string(), ParamValue::Integer(tgt.0)),
        ],
        returns: Returns::Nothing,
    })
}

/// ` SET v.k = $pN, ... REMOVE v.k, ...` for the given properties, binding
/// values into `params`. Empty when there is nothing to write.
fn set_clause(
    var: &str,
    properties: &PropertyMap,
    params: &mut Vec<(String, ParamValue)>,
) -> Result<String, GraphError> {
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    for (key, value) in properties {
        match ParamValue::from_property(value)? {
            Some(param) => {
                let name = format!("p{}", params.len());
                sets.push(format!("{var}.{} = ${name}", escape(key)));
                params.push((name, param));
            }
            None => removes.push(format!("{var}.{}", escape(key))),
        }
    }

    let mut clause = String::new();
    if !sets.is_empty() {
        let _ = write!(clause, " SET {}", sets.join(", "));
    }
    if !removes.is_empty() {
        let _ = write!(clause, " REMOVE {}", removes.join(", "));
    }
    Ok(clause)
}

fn resolve_node(outcome: &SaveOutcome, id: Identity) -> Result<Identity, GraphError> {
    outcome.resolve_node(id).ok_or(GraphError::NotFound {
        kind: "node",
        id: id.0,
    })
}

fn resolve_relationship(outcome: &SaveOutcome, id: Identity) -> Result<Identity, GraphError> {
    outcome.resolve_relationship(id).ok_or(GraphError::NotFound {
        kind: "relationship",
        id: id.0,
    })
}

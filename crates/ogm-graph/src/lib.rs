//! Neo4j persistence for the OGM.
//!
//! Renders compiled save batches as Cypher and runs them through
//! [neo4rs](https://docs.rs/neo4rs) inside one transaction per batch.

pub mod client;
pub mod cypher;
pub mod executor;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use executor::Neo4jExecutor;

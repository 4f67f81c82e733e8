//! Executes save batches in a single Neo4j transaction.

use neo4rs::Txn;
use ogm_compiler::{SaveBatch, SaveOutcome, Statement};
use ogm_core::Identity;
use ogm_session::{ExecutionError, RequestExecutor};

use crate::client::{GraphClient, GraphError};
use crate::cypher::{self, Returns};

impl From<GraphError> for ExecutionError {
    fn from(e: GraphError) -> Self {
        if e.is_transient() {
            ExecutionError::Transient(e.to_string())
        } else {
            ExecutionError::Rejected(e.to_string())
        }
    }
}

/// [`RequestExecutor`] backed by a live Neo4j database.
///
/// Statements run in batch order inside one transaction. Native ids
/// returned by creates feed the rendering of later statements, so a batch
/// may reference nodes it creates itself.
#[derive(Clone)]
pub struct Neo4jExecutor {
    client: GraphClient,
}

impl Neo4jExecutor {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    async fn apply(&self, txn: &mut Txn, batch: &SaveBatch) -> Result<SaveOutcome, GraphError> {
        let mut outcome = SaveOutcome::default();
        for statement in batch {
            let cypher = cypher::render(statement, &outcome)?;
            let mut stream = txn.execute(cypher.to_query()).await?;
            let returned = match stream.next(txn.handle()).await? {
                Some(row) => Some(
                    row.get::<i64>("id")
                        .map_err(|e| GraphError::Serialization(e.to_string()))?,
                ),
                None => None,
            };
            // Drain so the connection is ready for the next statement.
            while stream.next(txn.handle()).await?.is_some() {}

            match (cypher.returns, returned) {
                (Returns::Nothing, _) => {}
                (Returns::CreatedNode(provisional), Some(native)) => {
                    outcome.assign_node(provisional, Identity(native));
                }
                (Returns::CreatedRelationship(provisional), Some(native)) => {
                    if let Some(provisional) = provisional {
                        outcome.assign_relationship(provisional, Identity(native));
                    }
                }
                (Returns::ExistingNode(_) | Returns::ExistingRelationship(_), Some(_)) => {}
                (Returns::CreatedNode(id) | Returns::ExistingNode(id), None) => {
                    return Err(GraphError::NotFound { kind: "node", id: id.0 });
                }
                (Returns::ExistingRelationship(id), None) => {
                    return Err(GraphError::NotFound {
                        kind: "relationship",
                        id: id.0,
                    });
                }
                (Returns::CreatedRelationship(_), None) => {
                    // The endpoint MATCH found nothing.
                    return Err(GraphError::NotFound {
                        kind: "relationship endpoint",
                        id: statement_endpoint(statement),
                    });
                }
            }
            tracing::trace!(query = %cypher.text, "Statement applied");
        }
        Ok(outcome)
    }
}

fn statement_endpoint(statement: &Statement) -> i64 {
    match statement {
        Statement::CreateRelationship { relationship, .. } => relationship.src.0,
        _ => -1,
    }
}

impl RequestExecutor for Neo4jExecutor {
    async fn execute_save(&self, batch: &SaveBatch) -> Result<SaveOutcome, ExecutionError> {
        let mut txn = self.client.start_txn().await?;
        match self.apply(&mut txn, batch).await {
            Ok(outcome) => {
                txn.commit().await.map_err(GraphError::from)?;
                tracing::debug!(statements = batch.len(), "Save batch committed");
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Save batch failed, rolling back");
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }
}

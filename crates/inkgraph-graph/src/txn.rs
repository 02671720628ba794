//! Read-write transaction handle.
//!
//! A `WriteTxn` must be finalized: `commit` on the success path, then
//! `discard` on every path. `discard` rolls back whatever was not committed
//! and is a no-op after a commit, so callers can invoke it unconditionally.

use neo4rs::{Query, Row, Txn};

use crate::client::GraphError;

pub struct WriteTxn {
    operation: &'static str,
    txn: Option<Txn>,
}

impl WriteTxn {
    pub(crate) fn new(operation: &'static str, txn: Txn) -> Self {
        Self {
            operation,
            txn: Some(txn),
        }
    }

    /// Execute a statement inside the transaction and collect its rows.
    pub async fn execute(&mut self, query: Query) -> Result<Vec<Row>, GraphError> {
        let operation = self.operation;
        let txn = self.txn.as_mut().ok_or_else(|| finalized(operation))?;

        let mut stream = txn.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Commit the transaction.
    pub async fn commit(&mut self) -> Result<(), GraphError> {
        let txn = self.txn.take().ok_or_else(|| finalized(self.operation))?;
        txn.commit().await?;
        tracing::debug!(operation = self.operation, "Transaction committed");
        Ok(())
    }

    /// Roll back anything uncommitted and release the handle.
    pub async fn discard(mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(e) = txn.rollback().await {
                tracing::warn!(
                    operation = self.operation,
                    error = %e,
                    "Rollback failed while discarding transaction"
                );
            } else {
                tracing::debug!(operation = self.operation, "Transaction rolled back");
            }
        }
    }
}

impl Drop for WriteTxn {
    fn drop(&mut self) {
        if self.txn.is_some() {
            tracing::warn!(
                operation = self.operation,
                "Write transaction dropped without commit or discard"
            );
        }
    }
}

fn finalized(operation: &'static str) -> GraphError {
    GraphError::InvalidArgument(format!(
        "transaction for {operation} was already finalized"
    ))
}

//! Transaction manager collaborator
//!
//! The pipeline's transaction stage is the only holder of a write
//! transaction. The guard must be released on every exit path: commit on
//! success, rollback on failure results and errors, and rollback from
//! `Drop` when the future is cancelled mid-stage.

use std::sync::{Arc, Mutex};

use gatehouse_common::Result;

#[async_trait::async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

#[async_trait::async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Bookkeeping counters, inspectable from tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

impl TxStats {
    pub fn open(&self) -> usize {
        self.begun - self.committed - self.rolled_back
    }
}

/// In-memory reference implementation. Counts transitions; the actual
/// data stores are independently consistent, so "rollback" here is
/// bookkeeping that real backends replace with a database transaction.
#[derive(Clone, Default)]
pub struct InMemoryTransactionManager {
    stats: Arc<Mutex<TxStats>>,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TxStats {
        *self.stats.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl TransactionManager for InMemoryTransactionManager {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        self.stats.lock().unwrap().begun += 1;
        Ok(Box::new(InMemoryTransaction {
            stats: self.stats.clone(),
            completed: false,
        }))
    }
}

struct InMemoryTransaction {
    stats: Arc<Mutex<TxStats>>,
    completed: bool,
}

#[async_trait::async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.completed = true;
        this.stats.lock().unwrap().committed += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.completed = true;
        this.stats.lock().unwrap().rolled_back += 1;
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        // Cancellation safety: a dropped, unfinished transaction rolls back.
        if !self.completed {
            self.completed = true;
            self.stats.lock().unwrap().rolled_back += 1;
            tracing::warn!("Transaction dropped without commit — rolled back");
        }
    }
}

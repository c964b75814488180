use crate::core::errors::LedgerError;
use crate::core::state::LedgerState;
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// Single-writer in-memory store.
///
/// A transaction holds the lock for its whole duration and works on a copy of
/// the state, which replaces the shared state only when the closure succeeds.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn transaction<F, R>(&self, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<R, LedgerError> + Send,
        R: Send,
    {
        let mut state = self.state.lock().await;
        let mut working = state.clone();
        match f(&mut working) {
            Ok(result) => {
                *state = working;
                trace!("transaction committed");
                Ok(result)
            }
            Err(e) => {
                trace!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    async fn read<F, R>(&self, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&LedgerState) -> R + Send,
        R: Send,
    {
        let state = self.state.lock().await;
        Ok(f(&state))
    }
}

use crate::protocol::PlayerState;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared snapshot store. The core is the only writer; the UI reads a clone
/// after every `StateUpdated` broadcast.
pub struct StateManager {
    state: Arc<RwLock<PlayerState>>,
}

impl StateManager {
    pub fn new(initial: PlayerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    /// Mutate the snapshot in place and bump `rev`.
    pub async fn update<F>(&self, f: F) -> u64
    where
        F: FnOnce(&mut PlayerState),
    {
        let mut state = self.state.write().await;
        f(&mut state);
        state.rev += 1;
        state.rev
    }
}

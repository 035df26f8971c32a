//! In-process kingdom store.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::debug;

use kingdom_types::Kingdom;

use crate::error::StoreError;
use crate::store::KingdomStore;

/// A [`KingdomStore`] backed by a mutex-guarded value.
///
/// Each committed update bumps a revision counter that observers can follow
/// through [`MemoryStore::subscribe`]. Rolled-back updates do not.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<Kingdom>>,
    revision: Arc<watch::Sender<u64>>,
}

impl MemoryStore {
    /// Create a store holding `kingdom` at revision 0.
    pub fn new(kingdom: Kingdom) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(kingdom)),
            revision: Arc::new(tx),
        }
    }

    /// Receive the revision number after every committed update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Number of committed updates so far.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}

impl KingdomStore for MemoryStore {
    async fn current(&self) -> Result<Kingdom, StoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Kingdom) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let mut guard = self.state.lock().await;
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        drop(guard);

        self.revision.send_modify(|rev| *rev = rev.saturating_add(1));
        debug!(revision = self.revision(), "kingdom updated");
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_types::Resource;

    use super::*;

    #[tokio::test]
    async fn update_persists_on_ok() {
        let store = MemoryStore::new(Kingdom::new("Test"));
        let gold = store
            .update(|k| {
                k.set_resource(Resource::Gold, 4);
                Ok::<_, StoreError>(k.resource(Resource::Gold))
            })
            .await
            .unwrap();
        assert_eq!(gold, 4);
        assert_eq!(store.current().await.unwrap().resource(Resource::Gold), 4);
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test]
    async fn update_rolls_back_on_err() {
        let store = MemoryStore::new(Kingdom::new("Test"));
        let result = store
            .update(|k| {
                k.set_resource(Resource::Gold, 99);
                Err::<(), _>(StoreError::Config("rejected".to_owned()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.current().await.unwrap().resource(Resource::Gold), 0);
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_each_commit() {
        let store = MemoryStore::new(Kingdom::new("Test"));
        let mut rx = store.subscribe();
        store
            .update(|k| {
                k.turn = 2;
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let store = MemoryStore::new(Kingdom::new("Test"));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(|k| {
                        k.adjust_resource(Resource::Gold, 1);
                        Ok::<_, StoreError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.current().await.unwrap().resource(Resource::Gold), 16);
    }
}

//! `Dragonfly` (Redis-compatible) kingdom store.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `kingdom:{id}:state` | JSON | Full kingdom aggregate |
//!
//! Updates are serialized by an in-process lock around the
//! read-modify-write, so a single engine process is the only writer for a
//! kingdom key.

use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use kingdom_types::{Kingdom, KingdomId};

use crate::error::StoreError;
use crate::store::KingdomStore;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and provides typed JSON operations.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if serialization fails.
    /// Returns [`StoreError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if the key does not exist.
    /// Returns [`StoreError::Serialization`] if deserialization fails.
    /// Returns [`StoreError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or_else(
            || Err(StoreError::KeyNotFound(key.to_owned())),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }
}

/// Key holding the state of kingdom `id`.
pub fn kingdom_state_key(id: KingdomId) -> String {
    format!("kingdom:{id}:state")
}

/// A [`KingdomStore`] persisted as one JSON document in `Dragonfly`.
pub struct DragonflyStore {
    pool: DragonflyPool,
    key: String,
    write_lock: Mutex<()>,
}

impl DragonflyStore {
    /// Open the store for an existing kingdom key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if nothing is stored for `id`.
    pub async fn open(pool: DragonflyPool, id: KingdomId) -> Result<Self, StoreError> {
        let key = kingdom_state_key(id);
        let _: Kingdom = pool.get_json(&key).await?;
        Ok(Self {
            pool,
            key,
            write_lock: Mutex::new(()),
        })
    }

    /// Create the store and write `kingdom` as its initial state,
    /// replacing anything already stored under the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn create(pool: DragonflyPool, kingdom: &Kingdom) -> Result<Self, StoreError> {
        let key = kingdom_state_key(kingdom.id);
        pool.set_json(&key, kingdom).await?;
        info!(key = %key, kingdom = %kingdom.name, "kingdom seeded");
        Ok(Self {
            pool,
            key,
            write_lock: Mutex::new(()),
        })
    }

    /// The key this store reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove the stored kingdom.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self) -> Result<(), StoreError> {
        self.pool.delete(&self.key).await
    }
}

impl KingdomStore for DragonflyStore {
    async fn current(&self) -> Result<Kingdom, StoreError> {
        self.pool.get_json(&self.key).await
    }

    async fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Kingdom) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut working: Kingdom = self.pool.get_json(&self.key).await?;
        let value = f(&mut working)?;
        self.pool.set_json(&self.key, &working).await?;
        debug!(key = %self.key, "kingdom updated");
        Ok(value)
    }
}

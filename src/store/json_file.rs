//! JSON-file-backed record store.
//!
//! Each table is one pretty-printed JSON file under the data directory:
//! `session_keys.json` and `subscriptions.json`, both shaped as
//! `{"byUser": {<userId>: <record>}}`. Files are created on first access.
//!
//! Every mutation is a full read-modify-write of the owning file, serialized
//! by a per-file async mutex. Records are small and per-user, so whole-file
//! rewrites are fine at this scale; a real deployment swaps in a database
//! behind the same [`RecordStore`] trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{RecordStore, StoreError};
use crate::types::{SessionKeyRecord, SubscriptionRecord};

const SESSION_KEYS_FILE: &str = "session_keys.json";
const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";

/// On-disk shape of one table.
#[derive(Debug, Serialize, Deserialize)]
struct Table<T> {
    #[serde(rename = "byUser")]
    by_user: HashMap<String, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            by_user: HashMap::new(),
        }
    }
}

/// Record store persisting both tables as JSON files.
pub struct JsonFileStore {
    session_keys_path: PathBuf,
    subscriptions_path: PathBuf,
    // One lock per file; read-modify-write cycles must not interleave.
    session_keys_lock: Mutex<()>,
    subscriptions_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or initialize) a store rooted at `data_dir`.
    ///
    /// Creates the directory and empty table files if they do not exist yet.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let store = Self {
            session_keys_path: data_dir.join(SESSION_KEYS_FILE),
            subscriptions_path: data_dir.join(SUBSCRIPTIONS_FILE),
            session_keys_lock: Mutex::new(()),
            subscriptions_lock: Mutex::new(()),
        };
        store.ensure_file::<SessionKeyRecord>(&store.session_keys_path)?;
        store.ensure_file::<SubscriptionRecord>(&store.subscriptions_path)?;

        tracing::info!(data_dir = %data_dir.display(), "Opened JSON file store");
        Ok(store)
    }

    fn ensure_file<T: Serialize>(&self, path: &Path) -> Result<(), StoreError> {
        if !path.exists() {
            let initial = serde_json::to_string_pretty(&Table::<T>::default())?;
            std::fs::write(path, initial)?;
        }
        Ok(())
    }

    fn read_table<T: DeserializeOwned + Serialize>(
        &self,
        path: &Path,
    ) -> Result<Table<T>, StoreError> {
        self.ensure_file::<T>(path)?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_table<T: Serialize>(&self, path: &Path, table: &Table<T>) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(table)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get_session_key(
        &self,
        user_id: &str,
    ) -> Result<Option<SessionKeyRecord>, StoreError> {
        let _guard = self.session_keys_lock.lock().await;
        let table: Table<SessionKeyRecord> = self.read_table(&self.session_keys_path)?;
        Ok(table.by_user.get(user_id).cloned())
    }

    async fn put_session_key(&self, record: SessionKeyRecord) -> Result<(), StoreError> {
        let _guard = self.session_keys_lock.lock().await;
        let mut table: Table<SessionKeyRecord> = self.read_table(&self.session_keys_path)?;
        table.by_user.insert(record.user_id.clone(), record);
        self.write_table(&self.session_keys_path, &table)
    }

    async fn delete_session_key(&self, user_id: &str) -> Result<(), StoreError> {
        let _guard = self.session_keys_lock.lock().await;
        let mut table: Table<SessionKeyRecord> = self.read_table(&self.session_keys_path)?;
        table.by_user.remove(user_id);
        self.write_table(&self.session_keys_path, &table)
    }

    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let _guard = self.subscriptions_lock.lock().await;
        let table: Table<SubscriptionRecord> = self.read_table(&self.subscriptions_path)?;
        Ok(table.by_user.get(user_id).cloned())
    }

    async fn put_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        let _guard = self.subscriptions_lock.lock().await;
        let mut table: Table<SubscriptionRecord> = self.read_table(&self.subscriptions_path)?;
        table.by_user.insert(record.user_id.clone(), record);
        self.write_table(&self.subscriptions_path, &table)
    }

    async fn delete_subscription(&self, user_id: &str) -> Result<(), StoreError> {
        let _guard = self.subscriptions_lock.lock().await;
        let mut table: Table<SubscriptionRecord> = self.read_table(&self.subscriptions_path)?;
        table.by_user.remove(user_id);
        self.write_table(&self.subscriptions_path, &table)
    }
}

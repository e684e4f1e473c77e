//! Record Storage Abstraction
//!
//! Narrow keyed persistence for accepted records. Implementations can target
//! memory (default, tests) or a directory of JSON files; anything with
//! atomic single-key writes fits behind the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::records::{ContactDetails, StepRecord};
use crate::step::Step;

/// Error type for record storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid record key: {0}")]
    InvalidKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key under which a record is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Key for the committed record of `step`: `<instance>/step/<step>`
    pub fn step(instance_id: &str, step: Step) -> Self {
        Self(format!("{}/step/{}", instance_id, step.as_str()))
    }

    /// Key for a child record: `<instance>/contact/<sub_id>`
    pub fn sub_record(instance_id: &str, sub_id: &str) -> Self {
        Self(format!("{}/contact/{}", instance_id, sub_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything the workflow persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum StoredRecord {
    Step(StepRecord),
    Contact(ContactDetails),
}

/// Keyed record persistence
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `record` under `key`, replacing any previous value
    async fn put(&self, key: &RecordKey, record: &StoredRecord) -> Result<(), StoreError>;

    /// Read the record under `key`, `None` if absent
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError>;
}

/// In-memory store (default backend and tests)
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<RecordKey, StoredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, key: &RecordKey, record: &StoredRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(key.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }
}

/// One JSON file per key under a base directory
pub struct JsonFileRecordStore {
    base_path: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Map a key to `<base>/<segments...>.json`, refusing anything that could
    /// resolve outside the base directory
    fn path_for_key(&self, key: &RecordKey) -> Result<PathBuf, StoreError> {
        let mut path = self.base_path.clone();
        let mut segments = key.as_str().split('/').peekable();
        while let Some(segment) = segments.next() {
            let mut components = Path::new(segment).components();
            let is_plain = matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            );
            if !is_plain || segment.contains('\\') {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{}.json", segment));
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn put(&self, key: &RecordKey, record: &StoredRecord) -> Result<(), StoreError> {
        let path = self.path_for_key(key)?;
        let body = serde_json::to_vec_pretty(record)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a reader never sees a partial file
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        let path = self.path_for_key(key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::IdentityDocuments;
    use tempfile::TempDir;

    fn contact() -> StoredRecord {
        StoredRecord::Contact(ContactDetails::new(
            "White Rabbit".into(),
            "friend".into(),
            "+44 20 7946 0000".into(),
            None,
        ))
    }

    #[test]
    fn test_record_keys() {
        assert_eq!(
            RecordKey::step("app-1", Step::PersonalDetails).as_str(),
            "app-1/step/personal_details"
        );
        assert_eq!(
            RecordKey::sub_record("app-1", "c-7").to_string(),
            "app-1/contact/c-7"
        );
    }

    #[tokio::test]
    async fn test_in_memory_store_roundtrip() {
        let store = InMemoryRecordStore::new();
        let key = RecordKey::sub_record("app-1", "c-1");

        assert!(store.get(&key).await.unwrap().is_none());
        store.put(&key, &contact()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(contact()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_json_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(temp_dir.path());

        let key = RecordKey::step("app-1", Step::IdVerification);
        let record = StoredRecord::Step(StepRecord::IdentityDocuments(IdentityDocuments::new(
            None, None,
        )));

        assert!(store.get(&key).await.unwrap().is_none());
        store.put(&key, &record).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(record));
        assert!(temp_dir
            .path()
            .join("app-1/step/id_verification.json")
            .exists());
    }

    #[tokio::test]
    async fn test_json_file_store_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(temp_dir.path());
        let key = RecordKey::sub_record("app-1", "c-1");

        store.put(&key, &contact()).await.unwrap();
        store.put(&key, &contact()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(contact()));
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(temp_dir.path());

        for instance in ["..", "", "a\\b", "/etc"] {
            let key = RecordKey::sub_record(instance, "c-1");
            let result = store.put(&key, &contact()).await;
            assert!(
                matches!(result, Err(StoreError::InvalidKey(_))),
                "key {} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_json_file_store_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(temp_dir.path());
        let key = RecordKey::sub_record("app-1", "c-1");

        let path = temp_dir.path().join("app-1/contact/c-1.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            store.get(&key).await,
            Err(StoreError::Serialization(_))
        ));
    }
}

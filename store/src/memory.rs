use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;
use texcompile_lib::{Format, Product, Task};

use crate::{error::StoreError, keys, traits::Store};

struct Object {
    body: Vec<u8>,
}

lazy_static! {
    /// Keyed by an arbitrary instance id, mirroring `texcompile_queue::MemoryQueue`'s
    /// isolation pattern so parallel tests don't collide.
    static ref GLOBAL_STORAGE: Mutex<HashMap<String, Mutex<HashMap<String, Object>>>> =
        Mutex::new(HashMap::new());
}

/// An in-memory `Store` implementation, used in dispatch/worker/host
/// integration tests so they never touch real S3 or the network.
pub struct MemoryStore {
    instance_id: String,
}

impl MemoryStore {
    pub fn new(instance_id: impl Into<String>) -> Self {
        let instance_id = instance_id.into();
        GLOBAL_STORAGE
            .lock()
            .unwrap()
            .entry(instance_id.clone())
            .or_insert_with(|| Mutex::new(HashMap::new()));
        Self { instance_id }
    }

    fn with_objects<T>(&self, f: impl FnOnce(&mut HashMap<String, Object>) -> T) -> T {
        let storage = GLOBAL_STORAGE.lock().unwrap();
        let objects = storage
            .get(&self.instance_id)
            .expect("instance registered in constructor");
        let mut objects = objects.lock().unwrap();
        f(&mut objects)
    }

    fn put(&self, key: String, body: Vec<u8>) {
        self.with_objects(|objects| {
            objects.insert(key, Object { body });
        });
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.with_objects(|objects| {
            objects
                .get(key)
                .map(|obj| obj.body.clone())
                .ok_or_else(|| StoreError::DoesNotExist(key.to_string()))
        })
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn is_available(&self) -> bool {
        true
    }

    async fn get_status(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Task, StoreError> {
        let body = self.get(&keys::status_key(source_id, checksum, output_format))?;
        serde_json::from_slice(&body).map_err(|e| StoreError::RequestFailed(e.to_string()))
    }

    async fn set_status(&self, task: &Task) -> Result<(), StoreError> {
        let key = keys::status_key(&task.source_id, &task.checksum, task.output_format);
        let body =
            serde_json::to_vec(task).map_err(|e| StoreError::RequestFailed(e.to_string()))?;
        self.put(key, body);
        Ok(())
    }

    async fn store(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        artifact: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.put(keys::artifact_key(source_id, checksum, output_format), artifact);
        Ok(())
    }

    async fn retrieve(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        let body = self.get(&keys::artifact_key(source_id, checksum, output_format))?;
        Ok(Product { stream: body, etag: None })
    }

    async fn store_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        log: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.put(keys::log_key(source_id, checksum, output_format), log);
        Ok(())
    }

    async fn retrieve_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        let body = self.get(&keys::log_key(source_id, checksum, output_format))?;
        Ok(Product { stream: body, etag: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_raises_does_not_exist() {
        let store = MemoryStore::new("missing_key_raises_does_not_exist");
        let err = store.get_status("54", "chk", Format::Pdf).await.unwrap_err();
        assert!(matches!(err, StoreError::DoesNotExist(_)));
    }

    #[tokio::test]
    async fn status_round_trips() {
        let store = MemoryStore::new("status_round_trips");
        let task = Task::in_progress("54", "chk", Format::Pdf, Some("84843".to_string()));
        store.set_status(&task).await.unwrap();
        let fetched = store.get_status("54", "chk", Format::Pdf).await.unwrap();
        assert_eq!(fetched, task);
    }

    #[tokio::test]
    async fn instances_are_isolated_by_id() {
        let a = MemoryStore::new("instances_are_isolated_by_id_store_a");
        let b = MemoryStore::new("instances_are_isolated_by_id_store_b");
        let task = Task::in_progress("54", "chk", Format::Pdf, None);
        a.set_status(&task).await.unwrap();
        assert!(b.get_status("54", "chk", Format::Pdf).await.is_err());
    }
}

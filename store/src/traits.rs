use texcompile_lib::{Format, Product, Task};

use crate::error::StoreError;

/// The Object Store Gateway collaborator (spec §4.4): key-addressed storage
/// of status records, artifacts, and logs, scoped under one bucket.
///
/// `ObjectStore` is the S3-compatible production implementation;
/// `MemoryStore` exists so dispatch/worker/host integration tests never
/// touch real S3 or the network.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn get_status(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Task, StoreError>;

    async fn set_status(&self, task: &Task) -> Result<(), StoreError>;

    async fn store(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        artifact: Vec<u8>,
    ) -> Result<(), StoreError>;

    async fn retrieve(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError>;

    async fn store_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        log: Vec<u8>,
    ) -> Result<(), StoreError>;

    async fn retrieve_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError>;
}

use std::path::Path;

use texcompile_lib::SourcePackage;

use crate::error::SourceError;

/// The Source Client collaborator (spec §4.5): fetches a source package by
/// id+token and reports owner identity. `SourceClient` is the HTTP-backed
/// production implementation; worker/host integration tests substitute a
/// stub that never makes network calls.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    /// Probes the upstream service's own status endpoint, grounded on
    /// `filemanager.py::get_service_status`. Short timeout, no retries.
    async fn is_available(&self) -> bool;

    async fn get_source_content(
        &self,
        source_id: &str,
        token: &str,
        save_to: &Path,
    ) -> Result<SourcePackage, SourceError>;

    async fn owner(
        &self,
        source_id: &str,
        checksum: &str,
        token: &str,
    ) -> Result<Option<String>, SourceError>;
}

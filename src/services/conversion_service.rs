use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::error::{AppError, RemoteOp};
use crate::models::{ArchiveRequest, LocalArchivePair};
use crate::services::converter::{ArchiveConverter, ConversionSummary};
use crate::services::remote_store::RemoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub file_name: String,
    pub downloaded_bytes: u64,
    pub summary: ConversionSummary,
}

/// Runs download → convert → upload for one request.
pub struct ConversionService {
    store: Arc<dyn RemoteStore>,
    converter: ArchiveConverter,
    work_dir: PathBuf,
}

impl ConversionService {
    pub fn new(store: Arc<dyn RemoteStore>, work_dir: PathBuf) -> Self {
        Self {
            store,
            converter: ArchiveConverter::new(work_dir.clone()),
            work_dir,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub async fn process(&self, request: &ArchiveRequest) -> Result<ConversionOutcome, AppError> {
        // Per-request directory: two requests for the same file name never share local paths.
        let workspace = tempfile::Builder::new()
            .prefix("rar2zip-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| AppError::Internal(format!("Failed to create working directory: {}", e)))?;
        let pair = LocalArchivePair::within(workspace.path(), request);

        // 1. Download RAR
        let downloaded_bytes = self
            .store
            .download(request.rar_name(), &pair.source_path)
            .await
            .map_err(|source| AppError::Remote {
                op: RemoteOp::Download,
                source,
            })?;

        // 2. Convert on the blocking pool (unrar and zip are synchronous)
        let converter = self.converter.clone();
        let source_path = pair.source_path.clone();
        let destination_path = pair.destination_path.clone();
        let summary = tokio::task::spawn_blocking(move || {
            converter.convert(&source_path, &destination_path)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Conversion task failed: {}", e)))??;

        // 3. Upload ZIP
        self.store
            .upload(&pair.destination_path, request.zip_name())
            .await
            .map_err(|source| AppError::Remote {
                op: RemoteOp::Upload,
                source,
            })?;

        info!(
            "✅ {} ({} bytes) converted to {} via {}",
            request.rar_name(),
            downloaded_bytes,
            request.zip_name(),
            self.store.provider_id()
        );

        Ok(ConversionOutcome {
            file_name: request.zip_name().to_string(),
            downloaded_bytes,
            summary,
        })
    }
}

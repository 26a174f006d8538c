use crate::config::AppConfig;
use crate::services::remote_store::RemoteStore;
use crate::services::remote_store::sharepoint::SharePointStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub fn setup_storage(config: &AppConfig) -> Result<Arc<dyn RemoteStore>> {
    let sharepoint = &config.sharepoint;

    info!(
        "☁️  SharePoint: {} (Library: {})",
        sharepoint.site_url, sharepoint.doc_library
    );
    if sharepoint.tenant_id.is_none() {
        info!("🔎 No tenant id configured, realm will be discovered on first request");
    }

    let store = SharePointStore::new(sharepoint.clone())?;
    Ok(Arc::new(store))
}

/// Makes sure the working root exists before the first request needs it.
pub async fn setup_work_dir(config: &AppConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {}", config.work_dir.display()))?;

    info!("📂 Working directory: {}", config.work_dir.display());
    Ok(())
}

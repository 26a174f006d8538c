use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DOC_LIBRARY: &str = "Shared Documents";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.accesscontrol.windows.net";

/// Connection settings for the SharePoint document library
#[derive(Debug, Clone)]
pub struct SharePointConfig {
    /// Site URL, e.g. https://tenant.sharepoint.com/sites/Team
    pub site_url: String,

    /// Document library holding both the RAR and the converted ZIP
    pub doc_library: String,

    /// App-only client id
    pub client_id: String,

    /// App-only client secret
    pub client_secret: String,

    /// Tenant id (ACS realm). Discovered from the site when unset.
    pub tenant_id: Option<String>,

    /// Token service base URL
    pub auth_url: String,

    /// Timeout applied to every SharePoint request
    pub timeout: Duration,
}

/// Service configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sharepoint: SharePointConfig,

    /// Root under which per-request working directories are created
    pub work_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let sharepoint = SharePointConfig {
            site_url: required("SHAREPOINT_SITE_URL")?
                .trim_end_matches('/')
                .to_string(),
            doc_library: env::var("SHAREPOINT_DOC_LIBRARY")
                .ok()
                .map(|v| v.trim_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_DOC_LIBRARY.to_string()),
            client_id: required("SHAREPOINT_CLIENT_ID")?,
            client_secret: required("SHAREPOINT_CLIENT_SECRET")?,
            tenant_id: env::var("SHAREPOINT_TENANT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            auth_url: env::var("SHAREPOINT_AUTH_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            timeout: Duration::from_secs(
                env::var("SHAREPOINT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
        };

        url::Url::parse(&sharepoint.site_url)
            .map_err(|e| anyhow!("SHAREPOINT_SITE_URL is not a valid URL: {}", e))?;

        let work_dir = env::var("WORK_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Self {
            sharepoint,
            work_dir,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{} must be set", key))
}

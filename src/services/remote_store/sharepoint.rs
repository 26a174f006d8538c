use super::{RemoteError, RemoteStore};
use crate::config::SharePointConfig;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use reqwest::header::{ACCEPT, WWW_AUTHENTICATE};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use url::Url;

/// Well-known principal id of SharePoint Online in ACS
const SHAREPOINT_PRINCIPAL: &str = "00000003-0000-0ff1-ce00-000000000000";

/// Characters escaped inside the quoted OData path argument
const ODATA_ARG: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const ODATA_VERBOSE: &str = "application/json;odata=verbose";

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    // ACS sends this as a string, AAD as a number.
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

/// SharePoint Online document library accessed through the REST API with
/// app-only (client credential) tokens.
pub struct SharePointStore {
    client: Client,
    config: SharePointConfig,
    host: String,
    site_path: String,
    realm: OnceCell<String>,
    token: Mutex<Option<CachedToken>>,
}

impl SharePointStore {
    pub fn new(config: SharePointConfig) -> Result<Self> {
        let site = Url::parse(&config.site_url)
            .map_err(|e| anyhow!("Invalid SharePoint site URL: {}", e))?;
        let host = site
            .host_str()
            .ok_or_else(|| anyhow!("SharePoint site URL has no host"))?
            .to_string();
        let site_path = percent_decode_str(site.path().trim_end_matches('/'))
            .decode_utf8()?
            .into_owned();

        let client = Client::builder().timeout(config.timeout).build()?;

        let realm = OnceCell::new_with(config.tenant_id.clone());

        Ok(Self {
            client,
            config,
            host,
            site_path,
            realm,
            token: Mutex::new(None),
        })
    }

    /// Server relative URL of the document library folder
    fn library_path(&self) -> String {
        format!("{}/{}", self.site_path, self.config.doc_library)
    }

    fn api_url(&self, call: &str) -> String {
        format!("{}/_api/web/{}", self.config.site_url, call)
    }

    async fn realm(&self) -> Result<&str, RemoteError> {
        self.realm
            .get_or_try_init(|| self.discover_realm())
            .await
            .map(String::as_str)
    }

    /// Reads the tenant realm from the bearer challenge of the site.
    async fn discover_realm(&self) -> Result<String, RemoteError> {
        let url = format!("{}/_vti_bin/client.svc", self.config.site_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", "Bearer")
            .send()
            .await?;

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let realm = parse_realm(challenge).ok_or_else(|| {
            RemoteError::Auth(format!(
                "no realm in challenge from {} (HTTP {})",
                url,
                response.status()
            ))
        })?;

        info!("🔑 Discovered SharePoint realm {}", realm);
        Ok(realm)
    }

    async fn access_token(&self) -> Result<String, RemoteError> {
        let mut cached = self.token.lock().await;

        // Refreshed five minutes ahead of expiry
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::minutes(5) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<CachedToken, RemoteError> {
        let realm = self.realm().await?;
        let url = format!("{}/{}/tokens/OAuth/2", self.config.auth_url, realm);
        let params = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", format!("{}@{}", self.config.client_id, realm)),
            ("client_secret", self.config.client_secret.clone()),
            (
                "resource",
                format!("{}/{}@{}", SHAREPOINT_PRINCIPAL, self.host, realm),
            ),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                truncate(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Auth(format!("malformed token response: {}", e)))?;

        let expires_in = token
            .expires_in
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .unwrap_or(3600)
            .clamp(0, 24 * 60 * 60);

        debug!("Acquired SharePoint token valid for {}s", expires_in);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

#[async_trait]
impl RemoteStore for SharePointStore {
    fn provider_id(&self) -> &'static str {
        "sharepoint"
    }

    async fn download(&self, name: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let token = self.access_token().await?;
        let file_path = format!("{}/{}", self.library_path(), name);
        let url = self.api_url(&format!(
            "GetFileByServerRelativeUrl('{}')/$value",
            odata_arg(&file_path)
        ));

        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        let mut response = check_status("download", response).await?;

        let mut file = tokio::fs::File::create(local_path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("⬇️  Downloaded '{}' ({} bytes)", file_path, written);
        Ok(written)
    }

    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), RemoteError> {
        let token = self.access_token().await?;
        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        let url = self.api_url(&format!(
            "GetFolderByServerRelativeUrl('{}')/Files/add(url='{}',overwrite=true)",
            odata_arg(&self.library_path()),
            odata_arg(name)
        ));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header(ACCEPT, ODATA_VERBOSE)
            .body(data)
            .send()
            .await?;
        check_status("upload", response).await?;

        info!(
            "⬆️  Uploaded '{}/{}' ({} bytes)",
            self.library_path(),
            name,
            size
        );
        Ok(())
    }
}

async fn check_status(operation: &'static str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        operation,
        status: status.as_u16(),
        body: truncate(&body),
    })
}

/// Quotes a value for use inside `('...')` in an OData call.
fn odata_arg(value: &str) -> String {
    utf8_percent_encode(&value.replace('\'', "''"), ODATA_ARG).to_string()
}

fn parse_realm(challenge: &str) -> Option<String> {
    let start = challenge.find("realm=\"")? + "realm=\"".len();
    let rest = &challenge[start..];
    let realm = &rest[..rest.find('"')?];
    (!realm.is_empty()).then(|| realm.to_string())
}

fn truncate(body: &str) -> String {
    body.chars().take(512).collect()
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::{IntoParams, ToSchema};

use crate::utils::naming::{self, NameError};

/// Inbound parameters of the convert endpoint (query string or JSON body)
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertParams {
    /// SharePoint URL or library path of the .rar file
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConvertResponse {
    pub file_name: String,
    pub message: String,
    pub files: usize,
    pub bytes: u64,
    /// Size of the downloaded RAR
    pub downloaded_bytes: u64,
}

/// One conversion request: the remote RAR to fetch, plus the names derived
/// from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    remote_file_identifier: String,
    rar_name: String,
    zip_name: String,
}

impl ArchiveRequest {
    pub fn parse(file_url: Option<&str>) -> Result<Self, NameError> {
        let file_url = file_url
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(NameError::Missing)?;

        let rar_name = naming::base_name(file_url)?;
        let zip_name = naming::zip_name_for(&rar_name)?;

        Ok(Self {
            remote_file_identifier: file_url.to_string(),
            rar_name,
            zip_name,
        })
    }

    pub fn remote_file_identifier(&self) -> &str {
        &self.remote_file_identifier
    }

    /// Name of the RAR inside the document library
    pub fn rar_name(&self) -> &str {
        &self.rar_name
    }

    /// Name the converted ZIP is uploaded under
    pub fn zip_name(&self) -> &str {
        &self.zip_name
    }
}

/// Local source/destination files for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArchivePair {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

impl LocalArchivePair {
    pub fn within(dir: &Path, request: &ArchiveRequest) -> Self {
        Self {
            source_path: dir.join(request.rar_name()),
            destination_path: dir.join(request.zip_name()),
        }
    }
}

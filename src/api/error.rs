use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::services::converter::ConversionError;
use crate::services::remote_store::RemoteError;
use crate::utils::naming::NameError;

/// Remote step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Download,
    Upload,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOp::Download => f.write_str("download"),
            RemoteOp::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Remote {op} failed: {source}")]
    Remote {
        op: RemoteOp,
        #[source]
        source: RemoteError,
    },

    #[error("Error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<NameError> for AppError {
    fn from(e: NameError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Remote { .. } | AppError::Conversion(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Remote failures never expose their detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Remote {
                op: RemoteOp::Download,
                ..
            } => "Failed to download .rar file from SharePoint.".to_string(),
            AppError::Remote {
                op: RemoteOp::Upload,
                ..
            } => "Failed to upload .zip file to SharePoint.".to_string(),
            AppError::Conversion(e) => format!("Error: {}", e),
            AppError::Internal(msg) => format!("Error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::warn!("Rejected request: {}", msg),
            AppError::Remote { op, source } => {
                tracing::error!("Remote {} error: {:?}", op, source)
            }
            AppError::Conversion(e) => {
                tracing::error!("Conversion error ({:?}): {}", e.kind(), e)
            }
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        let body = Json(json!({
            "error": self.public_message()
        }));

        (self.status_code(), body).into_response()
    }
}

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

pub const RAR_SUFFIX: &str = ".rar";
pub const ZIP_SUFFIX: &str = ".zip";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Please provide a SharePoint file URL")]
    Missing,

    #[error("Could not determine a file name from '{0}'")]
    NoFileName(String),

    #[error("Invalid file name '{0}'")]
    Invalid(String),

    #[error("File '{0}' is not a .rar archive")]
    NotRar(String),
}

/// Extracts the remote file's base name from `file_url`.
///
/// Absolute URLs lose their query and fragment and the last path segment is
/// percent-decoded. Anything else is treated as a plain path.
pub fn base_name(file_url: &str) -> Result<String, NameError> {
    let trimmed = file_url.trim();
    if trimmed.is_empty() {
        return Err(NameError::Missing);
    }

    let name = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => {
            let segment = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or("");
            percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| NameError::Invalid(segment.to_string()))?
                .into_owned()
        }
        _ => trimmed
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or("")
            .to_string(),
    };

    if name.is_empty() {
        return Err(NameError::NoFileName(trimmed.to_string()));
    }

    if name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(|c| c.is_control())
    {
        tracing::warn!("Rejected unsafe file name: {:?}", name);
        return Err(NameError::Invalid(name));
    }

    Ok(name)
}

/// Swaps the trailing `.rar` (any case) for `.zip`. Nothing else in the name
/// is touched.
pub fn zip_name_for(rar_name: &str) -> Result<String, NameError> {
    let split = rar_name.len().checked_sub(RAR_SUFFIX.len());
    match split {
        Some(stem_len)
            if stem_len > 0
                && rar_name.is_char_boundary(stem_len)
                && rar_name[stem_len..].eq_ignore_ascii_case(RAR_SUFFIX) =>
        {
            Ok(format!("{}{}", &rar_name[..stem_len], ZIP_SUFFIX))
        }
        _ => Err(NameError::NotRar(rar_name.to_string())),
    }
}

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use unrar::error::{Code, UnrarError};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Broad classes of conversion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionErrorKind {
    CorruptArchive,
    IoFailure,
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Corrupt or unsupported RAR archive: {0}")]
    CorruptArchive(String),

    #[error("Unsafe entry path in archive: {}", .0.display())]
    UnsafeEntry(PathBuf),

    #[error("RAR extraction failed: {0}")]
    Extraction(String),

    #[error("ZIP write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ConversionError {
    pub fn kind(&self) -> ConversionErrorKind {
        match self {
            ConversionError::CorruptArchive(_) | ConversionError::UnsafeEntry(_) => {
                ConversionErrorKind::CorruptArchive
            }
            ConversionError::Extraction(_) | ConversionError::Zip(_) | ConversionError::Io(_) => {
                ConversionErrorKind::IoFailure
            }
        }
    }
}

impl From<UnrarError> for ConversionError {
    fn from(e: UnrarError) -> Self {
        match e.code {
            Code::EOpen
            | Code::ECreate
            | Code::EClose
            | Code::ERead
            | Code::EWrite
            | Code::NoMemory => ConversionError::Extraction(e.to_string()),
            _ => ConversionError::CorruptArchive(e.to_string()),
        }
    }
}

/// What ended up in the ZIP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Re-packages RAR archives as deflated ZIP archives.
///
/// Conversion is two-phase: the whole RAR is extracted into a scratch
/// directory before any ZIP entry is written.
#[derive(Debug, Clone)]
pub struct ArchiveConverter {
    scratch_root: PathBuf,
}

impl ArchiveConverter {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
        }
    }

    pub fn convert(
        &self,
        source_path: &Path,
        destination_path: &Path,
    ) -> Result<ConversionSummary, ConversionError> {
        // Dropped (and deleted) on every return path below.
        let scratch = tempfile::Builder::new()
            .prefix("rar-extract-")
            .tempdir_in(&self.scratch_root)?;

        debug!(
            "Extracting {} into {}",
            source_path.display(),
            scratch.path().display()
        );
        extract_rar(source_path, scratch.path())?;

        let summary = write_zip(scratch.path(), destination_path)?;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory: {}", e);
        }

        info!(
            "📦 Converted {} -> {} ({} files, {} bytes)",
            source_path.display(),
            destination_path.display(),
            summary.files,
            summary.bytes
        );

        Ok(summary)
    }
}

fn extract_rar(source_path: &Path, output_dir: &Path) -> Result<(), ConversionError> {
    let mut archive = unrar::Archive::new(source_path).open_for_processing()?;

    while let Some(header) = archive.read_header()? {
        let entry = header.entry();
        let is_dir = entry.is_directory();
        let relative = safe_relative_path(&entry.filename)?;
        let target = output_dir.join(&relative);

        archive = if is_dir {
            fs::create_dir_all(&target)?;
            header.skip()?
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            header.extract_to(&target)?
        };
    }

    Ok(())
}

/// Rejects entry names that would land outside the extraction root.
fn safe_relative_path(name: &Path) -> Result<PathBuf, ConversionError> {
    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ConversionError::UnsafeEntry(name.to_path_buf()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ConversionError::UnsafeEntry(name.to_path_buf()));
    }

    Ok(relative)
}

fn write_zip(root: &Path, destination_path: &Path) -> Result<ConversionSummary, ConversionError> {
    let file = File::create(destination_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut summary = ConversionSummary::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry_name(root, entry.path())?;
        let size = entry.metadata().map_err(io::Error::from)?.len();
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= u32::MAX as u64);

        zip.start_file(name, options)?;
        let mut input = File::open(entry.path())?;
        summary.bytes += io::copy(&mut input, &mut zip)?;
        summary.files += 1;
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer)?;

    Ok(summary)
}

/// ZIP entry name: path relative to `root`, components joined with `/`.
fn entry_name(root: &Path, path: &Path) -> Result<String, ConversionError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non UTF-8 file name: {}", relative.display()),
            )
        })?;
        parts.push(part);
    }

    Ok(parts.join("/"))
}

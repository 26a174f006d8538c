#![allow(dead_code)]

use async_trait::async_trait;
use flate2::Crc;
use rar2zip_function::services::remote_store::{RemoteError, RemoteStore};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// ---------------------------------------------------------------------------
// RAR 4.x fixtures (stored entries only)
// ---------------------------------------------------------------------------

const RAR_MARKER: [u8; 7] = [0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00];
const HEAD_MAIN: u8 = 0x73;
const HEAD_FILE: u8 = 0x74;
const HEAD_END: u8 = 0x7B;
const LHD_DIRECTORY: u16 = 0x00E0;
const LONG_BLOCK: u16 = 0x8000;
const HOST_UNIX: u8 = 3;
const METHOD_STORE: u8 = 0x30;
// 2024-01-01 00:00:00 in DOS format
const DOS_TIME: u32 = (44 << 25) | (1 << 21) | (1 << 16);

pub enum RarEntry<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

fn block(head_type: u8, flags: u16, body: &[u8]) -> Vec<u8> {
    let size = (7 + body.len()) as u16;
    let mut head = vec![head_type];
    head.extend_from_slice(&flags.to_le_bytes());
    head.extend_from_slice(&size.to_le_bytes());
    head.extend_from_slice(body);

    let mut out = ((crc32(&head) & 0xFFFF) as u16).to_le_bytes().to_vec();
    out.extend(head);
    out
}

fn file_block(name: &str, data: &[u8], is_dir: bool) -> Vec<u8> {
    let attr: u32 = if is_dir { 0o040755 } else { 0o100644 };
    let mut body = Vec::new();
    body.extend_from_slice(&(data.len() as u32).to_le_bytes()); // packed size
    body.extend_from_slice(&(data.len() as u32).to_le_bytes()); // unpacked size
    body.push(HOST_UNIX);
    body.extend_from_slice(&crc32(data).to_le_bytes());
    body.extend_from_slice(&DOS_TIME.to_le_bytes());
    body.push(20); // version needed to extract
    body.push(METHOD_STORE);
    body.extend_from_slice(&(name.len() as u16).to_le_bytes());
    body.extend_from_slice(&attr.to_le_bytes());
    body.extend_from_slice(name.as_bytes());

    let flags = LONG_BLOCK | if is_dir { LHD_DIRECTORY } else { 0 };
    let mut out = block(HEAD_FILE, flags, &body);
    out.extend_from_slice(data);
    out
}

/// Builds an uncompressed RAR 4 archive holding `entries`.
pub fn build_rar(entries: &[RarEntry]) -> Vec<u8> {
    let mut out = RAR_MARKER.to_vec();
    out.extend(block(HEAD_MAIN, 0, &[0u8; 6]));

    for entry in entries {
        match entry {
            RarEntry::File(name, data) => out.extend(file_block(name, data, false)),
            RarEntry::Dir(name) => out.extend(file_block(name, &[], true)),
        }
    }

    out.extend(block(HEAD_END, 0x4000, &[]));
    out
}

/// `a.txt` and `sub/b.txt`, with an explicit `sub` directory entry.
pub fn nested_rar() -> Vec<u8> {
    build_rar(&[
        RarEntry::File("a.txt", b"alpha contents\n"),
        RarEntry::Dir("sub"),
        RarEntry::File("sub/b.txt", b"bravo contents\n"),
    ])
}

/// Entry name -> content of every file in a ZIP.
pub fn read_zip(path: &Path) -> HashMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entries = HashMap::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        entries.insert(entry.name().to_string(), data);
    }

    entries
}

pub fn read_zip_bytes(bytes: &[u8]) -> HashMap<String, Vec<u8>> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.zip");
    std::fs::write(&path, bytes).unwrap();
    read_zip(&path)
}

// ---------------------------------------------------------------------------
// In-memory document library
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockRemoteStore {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: Mutex<HashMap<String, Vec<u8>>>,
    pub download_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub fail_uploads: bool,
}

impl MockRemoteStore {
    pub fn with_file(name: &str, data: Vec<u8>) -> Self {
        let store = Self::default();
        store.files.lock().unwrap().insert(name.to_string(), data);
        store
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    fn provider_id(&self) -> &'static str {
        "mock"
    }

    async fn download(&self, name: &str, local_path: &Path) -> Result<u64, RemoteError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let data = self.files.lock().unwrap().get(name).cloned().ok_or_else(|| {
            RemoteError::Status {
                operation: "download",
                status: 404,
                body: format!("{} not found", name),
            }
        })?;

        tokio::fs::write(local_path, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(RemoteError::Status {
                operation: "upload",
                status: 503,
                body: "library is read-only".to_string(),
            });
        }

        let data = tokio::fs::read(local_path).await?;
        self.uploads.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }
}

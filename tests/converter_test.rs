mod common;

use common::{RarEntry, build_rar, nested_rar, read_zip};
use rar2zip_function::services::converter::{ArchiveConverter, ConversionErrorKind};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

fn scratch_is_empty(root: &Path) -> bool {
    fs::read_dir(root).unwrap().next().is_none()
}

#[test]
fn test_nested_archive_keeps_relative_paths() {
    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("nested.rar");
    let zip_path = work.path().join("nested.zip");
    fs::write(&rar_path, nested_rar()).unwrap();

    let converter = ArchiveConverter::new(scratch.path());
    let summary = converter.convert(&rar_path, &zip_path).unwrap();

    let entries = read_zip(&zip_path);
    let names: BTreeSet<&str> = entries.keys().map(String::as_str).collect();
    assert_eq!(names, BTreeSet::from(["a.txt", "sub/b.txt"]));
    assert_eq!(entries["a.txt"], b"alpha contents\n");
    assert_eq!(entries["sub/b.txt"], b"bravo contents\n");

    assert_eq!(summary.files, 2);
    assert_eq!(summary.bytes, 30);
    assert!(scratch_is_empty(scratch.path()));
}

#[test]
fn test_content_round_trip() {
    let binary: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    let text = "lorem ipsum dolor sit amet\n".repeat(500);
    let files: Vec<(&str, &[u8])> = vec![
        ("readme.md", text.as_bytes()),
        ("data/blob.bin", binary.as_slice()),
        ("data/empty.txt", &b""[..]),
        ("data/deep/er/leaf.txt", &b"leaf"[..]),
        ("with space.txt", &b"spaced"[..]),
    ];
    let rar_entries: Vec<RarEntry> = files
        .iter()
        .map(|&(name, data)| RarEntry::File(name, data))
        .collect();

    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("mixed.rar");
    let zip_path = work.path().join("mixed.zip");
    fs::write(&rar_path, build_rar(&rar_entries)).unwrap();

    ArchiveConverter::new(scratch.path())
        .convert(&rar_path, &zip_path)
        .unwrap();

    let expected: HashMap<String, Vec<u8>> = files
        .iter()
        .map(|(name, data)| (name.to_string(), data.to_vec()))
        .collect();
    assert_eq!(read_zip(&zip_path), expected);
}

#[test]
fn test_zip_entries_are_deflated() {
    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("nested.rar");
    let zip_path = work.path().join("nested.zip");
    fs::write(&rar_path, nested_rar()).unwrap();

    ArchiveConverter::new(scratch.path())
        .convert(&rar_path, &zip_path)
        .unwrap();

    let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
    for i in 0..archive.len() {
        let entry = archive.by_index(i).unwrap();
        assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    }
}

#[test]
fn test_corrupt_archive_cleans_up_scratch() {
    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("broken.rar");
    fs::write(&rar_path, b"this is definitely not a rar archive").unwrap();

    let err = ArchiveConverter::new(scratch.path())
        .convert(&rar_path, &work.path().join("broken.zip"))
        .unwrap_err();

    assert_eq!(err.kind(), ConversionErrorKind::CorruptArchive);
    assert!(scratch_is_empty(scratch.path()));
}

#[test]
fn test_truncated_archive_fails_and_cleans_up() {
    let mut bytes = build_rar(&[RarEntry::File("big.txt", &[b'x'; 4096])]);
    bytes.truncate(bytes.len() - 2048);

    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("truncated.rar");
    fs::write(&rar_path, bytes).unwrap();

    let err = ArchiveConverter::new(scratch.path())
        .convert(&rar_path, &work.path().join("truncated.zip"))
        .unwrap_err();

    assert_eq!(err.kind(), ConversionErrorKind::CorruptArchive);
    assert!(scratch_is_empty(scratch.path()));
}

#[test]
fn test_unwritable_destination_is_io_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let rar_path = work.path().join("nested.rar");
    fs::write(&rar_path, nested_rar()).unwrap();

    let err = ArchiveConverter::new(scratch.path())
        .convert(&rar_path, &work.path().join("no/such/dir/nested.zip"))
        .unwrap_err();

    assert_eq!(err.kind(), ConversionErrorKind::IoFailure);
    assert!(scratch_is_empty(scratch.path()));
}

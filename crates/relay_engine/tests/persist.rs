use std::fs;

use relay_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("artifacts");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn chunks_only_appear_after_commit() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let mut pending = writer.begin("merged.pdf").unwrap();
    pending.write_chunk(b"%PDF-").unwrap();
    pending.write_chunk(b"1.7").unwrap();
    assert_eq!(pending.bytes_written(), 8);
    assert!(!temp.path().join("merged.pdf").exists());

    let path = pending.commit().unwrap();
    assert_eq!(path, temp.path().join("merged.pdf"));
    assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");
}

#[test]
fn commit_replaces_existing_artifact() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let first = writer.write("out.docx", b"old").unwrap();
    let second = writer.write("out.docx", b"new").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"new");
}

#[test]
fn abandoned_download_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let mut pending = writer.begin("partial.pdf").unwrap();
    pending.write_chunk(b"half").unwrap();
    drop(pending);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn output_path_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("doc.pdf", b"data").is_err());
    assert!(!file_path.with_file_name("doc.pdf").exists());
}

//! Integration tests for the output sink

use core_metadata::sink::{write_out, write_to, OutputTarget};
use core_metadata::{Category, ResultItem};
use tempfile::tempdir;

fn lyrics() -> ResultItem {
    ResultItem::text(Category::Lyric, "lrclib", "I remember the night")
}

#[test]
fn test_stdout_reports_payload_length() {
    let item = lyrics();
    assert_eq!(write_out(&item, "stdout"), Some(item.len()));
    assert_eq!(write_out(&item, "STDERR"), Some(item.len()));
}

#[test]
fn test_null_discards() {
    assert_eq!(write_out(&lyrics(), "null"), Some(0));
}

#[test]
fn test_file_is_created_then_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trains.txt");
    let destination = path.to_str().unwrap();

    let long = ResultItem::text(Category::Lyric, "lrclib", "a much longer first version");
    assert_eq!(write_out(&long, destination), Some(long.len()));

    let item = lyrics();
    assert_eq!(write_out(&item, destination), Some(item.len()));
    assert_eq!(std::fs::read(&path).unwrap(), item.data.to_vec());
}

#[test]
fn test_binary_payload_written_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cover.jpg");
    let item = ResultItem::binary(Category::Cover, "deezer", vec![0xFFu8, 0xD8, 0x00, 0x0A]);

    assert_eq!(write_to(&item, &OutputTarget::File(path.clone())), Some(4));
    assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0x00, 0x0A]);
}

#[test]
fn test_unopenable_destination_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("cover.jpg");

    assert_eq!(write_out(&lyrics(), path.to_str().unwrap()), None);
    assert!(!path.exists());
}

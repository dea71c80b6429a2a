use std::path::PathBuf;

use pullzip::io::text::read_line;
use pullzip::zip::{CompressionMethod, find_end_of_central_directory};
use pullzip::{ByteSource, FileSource, StreamError, ZipArchive, ZipError};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn test_end_of_central_directory_fields() {
    let mut source = FileSource::open(fixture("test.zip"));
    let (eocd, offset) = find_end_of_central_directory(&mut source).unwrap();

    assert_eq!(offset, 105);
    assert_eq!(source.tell(), 105 + 22);
    assert_eq!(eocd.disk_number, 0);
    assert_eq!(eocd.central_disk, 0);
    assert_eq!(eocd.records_this_disk, 1);
    assert_eq!(eocd.records_total, 1);
    assert_eq!(eocd.cd_size, 54);
    assert_eq!(eocd.cd_offset, 51);
    assert_eq!(eocd.comment_length, 18);
}

#[test]
fn test_open_and_read_entry() {
    let archive = ZipArchive::open(fixture("test.zip")).unwrap();
    assert_eq!(archive.filenames(), ["test.txt"]);
    assert_eq!(archive.comment(), b"This is a comment!");

    let entry = archive.entry("test.txt").unwrap();
    assert_eq!(entry.compression_method, CompressionMethod::Deflate);
    assert_eq!(entry.compressed_size, 13);
    assert_eq!(entry.uncompressed_size, 14);
    assert_eq!(entry.crc32, 0x87e4_f545);
    assert_eq!(entry.lfh_offset, 0);

    let mut stream = archive.get_file_stream("test.txt").unwrap();
    assert_eq!(stream.stream_size(), Some(14));
    let mut line = String::new();
    assert!(read_line(&mut stream, &mut line));
    assert_eq!(line, "Line 1");
    assert!(read_line(&mut stream, &mut line));
    assert_eq!(line, "Line 2");
    assert!(!read_line(&mut stream, &mut line));
    assert_eq!(stream.error(), Some(&StreamError::BrokenPipe));
}

#[test]
fn test_read_file_matches_fixture() {
    let archive = ZipArchive::open(fixture("test.zip")).unwrap();
    let expected = std::fs::read(fixture("test.txt")).unwrap();
    assert_eq!(archive.read_file("test.txt").unwrap(), expected);
}

#[test]
fn test_single_open_entry_on_file() {
    let archive = ZipArchive::open(fixture("test.zip")).unwrap();

    let first = archive.get_file_stream("test.txt").unwrap();
    assert!(matches!(
        archive.get_file_stream("test.txt"),
        Err(ZipError::EntryAlreadyOpen)
    ));
    drop(first);

    assert!(archive.get_file_stream("test.txt").is_ok());
}

#[test]
fn test_unknown_entry() {
    let archive = ZipArchive::open(fixture("test.zip")).unwrap();
    assert!(matches!(
        archive.get_file_stream("missing.txt"),
        Err(ZipError::UnknownEntry(name)) if name == "missing.txt"
    ));
}

#[test]
fn test_empty_archive() {
    let archive = ZipArchive::open(fixture("empty.zip")).unwrap();
    assert!(archive.is_empty());
    assert!(archive.filenames().is_empty());
    assert!(archive.comment().is_empty());
}

#[test]
fn test_missing_archive() {
    assert!(matches!(
        ZipArchive::open(fixture("does_not_exist.zip")),
        Err(ZipError::InvalidStream(StreamError::NotFound(_)))
    ));
}

#[test]
fn test_not_a_zip() {
    assert!(matches!(
        ZipArchive::open(fixture("test.txt")),
        Err(ZipError::EndOfCentralDirectoryNotFound)
    ));
}

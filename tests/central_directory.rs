mod common;

use std::io;
use std::sync::Arc;

use bootjar::{Archive, CompressionMethod, DataBlock, Error};

use common::{ZipBuilder, find_signature, memory_archive, write_temp};

fn names(archive_entries: &[bootjar::ZipEntry]) -> Vec<&str> {
    archive_entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn entries_keep_central_directory_order() {
    let bytes = ZipBuilder::new()
        .directory("META-INF/")
        .stored("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n")
        .deflated("z/last-alphabetically.txt", b"zzz")
        .stored("a/first-alphabetically.txt", b"aaa")
        .build();
    let archive = memory_archive("order.jar", bytes);

    let directory = archive.central_directory().await.unwrap();
    assert_eq!(
        names(directory.entries()),
        [
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "z/last-alphabetically.txt",
            "a/first-alphabetically.txt",
        ]
    );
    assert!(directory.entries()[0].is_directory);
    assert_eq!(
        directory.entries()[2].compression_method,
        CompressionMethod::Deflated
    );
    assert!(!directory.zip64);
    assert_eq!(directory.archive_start, 0);

    let again = archive.central_directory().await.unwrap();
    assert!(Arc::ptr_eq(&directory, &again));
    assert_eq!(archive.list_entries().await.unwrap(), directory.entries());
}

#[tokio::test]
async fn duplicate_names_are_kept_and_lookup_finds_the_first() {
    let bytes = ZipBuilder::new()
        .stored("dup.txt", b"first")
        .stored("other.txt", b"other")
        .deflated("dup.txt", b"second")
        .build();
    let archive = memory_archive("dup.jar", bytes);

    let directory = archive.central_directory().await.unwrap();
    assert_eq!(directory.len(), 3);
    assert_eq!(directory.find_all("dup.txt").count(), 2);

    let first = archive.open_path("dup.txt").await.unwrap();
    assert_eq!(first.read_all().await.unwrap(), b"first");

    let second = directory.find_all("dup.txt").nth(1).unwrap();
    let block = archive.open_entry(second).await.unwrap();
    assert_eq!(block.read_all().await.unwrap(), b"second");
}

#[tokio::test]
async fn archive_comment_is_read() {
    let bytes = ZipBuilder::new()
        .stored("a.txt", b"a")
        .comment("built by the test suite")
        .build();
    let archive = memory_archive("comment.jar", bytes);

    let directory = archive.central_directory().await.unwrap();
    assert_eq!(directory.comment, "built by the test suite");
    assert_eq!(names(directory.entries()), ["a.txt"]);
}

#[tokio::test]
async fn launch_script_prefix_is_skipped() {
    let script = b"#!/bin/bash\nexec java -jar \"$0\" \"$@\"\nexit 0\n";
    let bytes = ZipBuilder::new()
        .stored("hello.txt", b"hello")
        .deflated("world.txt", b"world")
        .prefix(script)
        .build();
    let file = write_temp(&bytes);

    let archive = Archive::open(file.path()).await.unwrap();
    let directory = archive.central_directory().await.unwrap();
    assert_eq!(directory.archive_start, script.len() as u64);
    assert_eq!(directory.entries()[0].lfh_offset, script.len() as u64);

    let world = archive.open_path("world.txt").await.unwrap();
    assert_eq!(world.read_all().await.unwrap(), b"world");
}

#[tokio::test]
async fn forced_zip64_records_are_used() {
    let big = common::sample_text(200);
    let bytes = ZipBuilder::new()
        .stored("stored.txt", b"stored")
        .deflated("deflated.txt", &big)
        .zip64()
        .build();
    let archive = memory_archive("zip64.jar", bytes);

    let directory = archive.central_directory().await.unwrap();
    assert!(directory.zip64);
    assert_eq!(directory.len(), 2);
    let deflated = directory.find("deflated.txt").unwrap();
    assert_eq!(deflated.uncompressed_size, big.len() as u64);
    assert!(deflated.compressed_size < deflated.uncompressed_size);

    let block = archive.open_path("deflated.txt").await.unwrap();
    assert_eq!(block.read_all().await.unwrap(), big);
    let block = archive.open_path("stored.txt").await.unwrap();
    assert_eq!(block.read_all().await.unwrap(), b"stored");
}

#[tokio::test]
async fn zip64_archive_behind_a_prefix() {
    let bytes = ZipBuilder::new()
        .stored("a.txt", b"alpha")
        .zip64()
        .prefix(b"#!/bin/sh\n")
        .build();
    let archive = memory_archive("prefixed64.jar", bytes);

    let directory = archive.central_directory().await.unwrap();
    assert!(directory.zip64);
    assert_eq!(directory.archive_start, 10);
    let block = archive.open_path("a.txt").await.unwrap();
    assert_eq!(block.read_all().await.unwrap(), b"alpha");
}

/// `count` entries: one deflated payload followed by empty stored files.
fn many_entries(count: usize) -> Vec<u8> {
    let mut builder = ZipBuilder::new().deflated("payload.txt", &common::sample_text(100));
    for i in 1..count {
        builder = builder.stored(&format!("e{:05}", i), b"");
    }
    builder.build()
}

#[tokio::test]
async fn entry_count_sentinel_switches_to_zip64() {
    let classic = memory_archive("classic.jar", many_entries(0xFFFE));
    let classic_directory = classic.central_directory().await.unwrap();
    assert!(!classic_directory.zip64);
    assert_eq!(classic_directory.len(), 0xFFFE);

    let zip64 = memory_archive("zip64.jar", many_entries(0xFFFF));
    let zip64_directory = zip64.central_directory().await.unwrap();
    assert!(zip64_directory.zip64);
    assert_eq!(zip64_directory.len(), 0xFFFF);

    assert_eq!(&zip64_directory.entries()[..0xFFFE], classic_directory.entries());
    assert_eq!(zip64_directory.entries()[0xFFFE].name, "e65534");

    let classic_payload = classic.open_path("payload.txt").await.unwrap().read_all().await.unwrap();
    let zip64_payload = zip64.open_path("payload.txt").await.unwrap().read_all().await.unwrap();
    assert_eq!(classic_payload, common::sample_text(100));
    assert_eq!(zip64_payload, classic_payload);
}

#[tokio::test]
async fn missing_end_record_is_a_format_error() {
    let archive = memory_archive("garbage.jar", vec![0x41; 1000]);
    let err = archive.central_directory().await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
    assert!(err.to_string().contains("garbage.jar"));

    // The failure is remembered.
    let again = archive.central_directory().await.unwrap_err();
    assert!(matches!(again, Error::Format(_)));

    let tiny = memory_archive("tiny.jar", b"PK\x05\x06".to_vec());
    assert!(matches!(
        tiny.central_directory().await.unwrap_err(),
        Error::Format(_)
    ));
}

#[tokio::test]
async fn bad_central_directory_signature_is_a_format_error() {
    let mut bytes = ZipBuilder::new()
        .stored("a.txt", b"a")
        .stored("b.txt", b"b")
        .build();
    let cd = find_signature(&bytes, b"PK\x01\x02");
    bytes[cd + 3] = 0x09;

    let archive = memory_archive("bad-cd.jar", bytes);
    let err = archive.central_directory().await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
}

#[tokio::test]
async fn bad_zip64_locator_is_a_format_error() {
    let mut bytes = ZipBuilder::new().stored("a.txt", b"a").zip64().build();
    let locator = find_signature(&bytes, b"PK\x06\x07");
    bytes[locator..locator + 4].copy_from_slice(b"XXXX");

    let archive = memory_archive("bad-locator.jar", bytes);
    let err = archive.central_directory().await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
}

#[tokio::test]
async fn central_directory_shorter_than_its_count_is_an_io_error() {
    let mut bytes = ZipBuilder::new()
        .stored("a.txt", b"a")
        .stored("b.txt", b"b")
        .build();
    let eocd = bytes.len() - 22;
    bytes[eocd + 8..eocd + 10].copy_from_slice(&3u16.to_le_bytes());
    bytes[eocd + 10..eocd + 12].copy_from_slice(&3u16.to_le_bytes());

    let archive = memory_archive("truncated.jar", bytes);
    let err = archive.central_directory().await.unwrap_err();
    assert_eq!(err.io_kind(), Some(io::ErrorKind::UnexpectedEof), "{err}");
}

#[tokio::test]
async fn unknown_method_fails_only_when_opened() {
    let bytes = ZipBuilder::new()
        .stored("ok.txt", b"fine")
        .with_method("odd.bin", 99, b"????")
        .build();
    let archive = memory_archive("methods.jar", bytes);

    let entries = archive.list_entries().await.unwrap();
    assert_eq!(entries[1].compression_method, CompressionMethod::Unknown(99));

    let err = archive.open_entry(&entries[1]).await.err().unwrap();
    assert!(matches!(err, Error::Unsupported(_)), "{err}");

    let ok = archive.open_entry(&entries[0]).await.unwrap();
    assert_eq!(ok.size().unwrap(), 4);
}

//! In-memory zip writer for building test archives byte by byte.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use tempfile::NamedTempFile;

use bootjar::{Archive, DataBlock, MemoryDataBlock};

/// 2025-01-15 13:26:20 in DOS format.
pub const DOS_DATE: u16 = 0x5A2F;
pub const DOS_TIME: u16 = 0x6B4A;

const SENTINEL32: u32 = 0xFFFF_FFFF;
const SENTINEL16: u16 = 0xFFFF;

enum Method {
    Stored,
    Deflated,
    Other(u16),
}

struct TestEntry {
    name: String,
    data: Vec<u8>,
    method: Method,
    local_extra: Vec<u8>,
    declared_size: Option<u64>,
}

/// Builds zip archives, including the odd ones real tools rarely produce.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    prefix: Vec<u8>,
    force_zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, data: &[u8], method: Method) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            local_extra: Vec::new(),
            declared_size: None,
        });
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, Method::Stored)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, Method::Deflated)
    }

    pub fn directory(self, name: &str) -> Self {
        self.push(name, &[], Method::Stored)
    }

    /// Entry stored verbatim under an arbitrary method id.
    pub fn with_method(self, name: &str, method: u16, data: &[u8]) -> Self {
        self.push(name, data, Method::Other(method))
    }

    /// Give the last entry a local extra field the central directory
    /// doesn't have.
    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.local_extra = extra.to_vec();
        }
        self
    }

    /// Declare a wrong uncompressed size for the last entry.
    pub fn declared_size(mut self, size: u64) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.declared_size = Some(size);
        }
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    /// Bytes in front of the archive, e.g. a launch script.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    /// Write sizes and offsets through zip64 records even though they fit.
    pub fn zip64(mut self) -> Self {
        self.force_zip64 = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = body.len() as u64;
            let (method, payload) = match entry.method {
                Method::Stored => (0, entry.data.clone()),
                Method::Deflated => (8, deflate(&entry.data)),
                Method::Other(id) => (id, entry.data.clone()),
            };
            let mut crc = flate2::Crc::new();
            crc.update(&entry.data);
            let crc = crc.sum();
            let compressed = payload.len() as u64;
            let uncompressed = entry.declared_size.unwrap_or(entry.data.len() as u64);

            body.extend_from_slice(b"PK\x03\x04");
            body.write_u16::<LittleEndian>(20).unwrap();
            body.write_u16::<LittleEndian>(0).unwrap();
            body.write_u16::<LittleEndian>(method).unwrap();
            body.write_u16::<LittleEndian>(DOS_TIME).unwrap();
            body.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            body.write_u32::<LittleEndian>(crc).unwrap();
            body.write_u32::<LittleEndian>(compressed as u32).unwrap();
            body.write_u32::<LittleEndian>(uncompressed as u32).unwrap();
            body.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            body.write_u16::<LittleEndian>(entry.local_extra.len() as u16)
                .unwrap();
            body.extend_from_slice(entry.name.as_bytes());
            body.extend_from_slice(&entry.local_extra);
            body.extend_from_slice(&payload);

            let mut extra = Vec::new();
            let (csize, usize_, lfh) = if self.force_zip64 {
                extra.write_u16::<LittleEndian>(0x0001).unwrap();
                extra.write_u16::<LittleEndian>(24).unwrap();
                extra.write_u64::<LittleEndian>(uncompressed).unwrap();
                extra.write_u64::<LittleEndian>(compressed).unwrap();
                extra.write_u64::<LittleEndian>(offset).unwrap();
                (SENTINEL32, SENTINEL32, SENTINEL32)
            } else {
                (compressed as u32, uncompressed as u32, offset as u32)
            };

            central.extend_from_slice(b"PK\x01\x02");
            central.write_u16::<LittleEndian>(45).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(method).unwrap();
            central.write_u16::<LittleEndian>(DOS_TIME).unwrap();
            central.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            central.write_u32::<LittleEndian>(crc).unwrap();
            central.write_u32::<LittleEndian>(csize).unwrap();
            central.write_u32::<LittleEndian>(usize_).unwrap();
            central.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(lfh).unwrap();
            central.extend_from_slice(entry.name.as_bytes());
            central.extend_from_slice(&extra);
        }

        let cd_offset = body.len() as u64;
        let cd_size = central.len() as u64;
        let count = self.entries.len() as u64;
        body.extend_from_slice(&central);

        let zip64 = self.force_zip64 || count >= SENTINEL16 as u64;
        if zip64 {
            let record_offset = body.len() as u64;
            body.extend_from_slice(b"PK\x06\x06");
            body.write_u64::<LittleEndian>(44).unwrap();
            body.write_u16::<LittleEndian>(45).unwrap();
            body.write_u16::<LittleEndian>(45).unwrap();
            body.write_u32::<LittleEndian>(0).unwrap();
            body.write_u32::<LittleEndian>(0).unwrap();
            body.write_u64::<LittleEndian>(count).unwrap();
            body.write_u64::<LittleEndian>(count).unwrap();
            body.write_u64::<LittleEndian>(cd_size).unwrap();
            body.write_u64::<LittleEndian>(cd_offset).unwrap();

            body.extend_from_slice(b"PK\x06\x07");
            body.write_u32::<LittleEndian>(0).unwrap();
            body.write_u64::<LittleEndian>(record_offset).unwrap();
            body.write_u32::<LittleEndian>(1).unwrap();
        }

        let eocd_count = if zip64 { SENTINEL16 } else { count as u16 };
        let (eocd_size, eocd_offset) = if self.force_zip64 {
            (SENTINEL32, SENTINEL32)
        } else {
            (cd_size as u32, cd_offset as u32)
        };
        body.extend_from_slice(b"PK\x05\x06");
        body.write_u16::<LittleEndian>(0).unwrap();
        body.write_u16::<LittleEndian>(0).unwrap();
        body.write_u16::<LittleEndian>(eocd_count).unwrap();
        body.write_u16::<LittleEndian>(eocd_count).unwrap();
        body.write_u32::<LittleEndian>(eocd_size).unwrap();
        body.write_u32::<LittleEndian>(eocd_offset).unwrap();
        body.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        body.extend_from_slice(&self.comment);

        let mut out = self.prefix.clone();
        out.extend_from_slice(&body);
        out
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Text that compresses well but isn't trivially repetitive.
pub fn sample_text(lines: usize) -> Vec<u8> {
    let mut text = Vec::new();
    for i in 0..lines {
        writeln!(text, "line {:05}: the quick brown fox jumps over {} lazy dogs", i, i % 17)
            .unwrap();
    }
    text
}

pub fn memory_archive(name: &str, bytes: Vec<u8>) -> Archive {
    let block: Arc<dyn DataBlock> = Arc::new(MemoryDataBlock::new(bytes));
    Archive::from_block(name, block)
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Offset of the first occurrence of `signature`.
pub fn find_signature(bytes: &[u8], signature: &[u8]) -> usize {
    bytes
        .windows(signature.len())
        .position(|w| w == signature)
        .unwrap()
}

/// A small executable jar with classes, an index and the given libraries.
pub fn boot_jar(libs: &[&str], index: Option<&str>, manifest: &str) -> Vec<u8> {
    let mut builder = ZipBuilder::new()
        .directory("META-INF/")
        .stored("META-INF/MANIFEST.MF", manifest.as_bytes())
        .directory("BOOT-INF/")
        .directory("BOOT-INF/classes/")
        .deflated("BOOT-INF/classes/com/example/App.class", b"\xCA\xFE\xBA\xBEapp")
        .directory("BOOT-INF/lib/");
    for lib in libs {
        let jar = library_jar(lib);
        builder = builder.stored(&format!("BOOT-INF/lib/{}", lib), &jar);
    }
    if let Some(index) = index {
        builder = builder.stored("BOOT-INF/classpath.idx", index.as_bytes());
    }
    builder.build()
}

/// A library jar whose single resource names the jar.
pub fn library_jar(name: &str) -> Vec<u8> {
    ZipBuilder::new()
        .stored("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n")
        .deflated("lib.txt", name.as_bytes())
        .build()
}

pub const BOOT_MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Main-Class: org.springframework.boot.loader.launch.JarLauncher\r\n\
Start-Class: com.example.App\r\n\r\n";

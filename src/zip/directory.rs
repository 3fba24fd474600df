use std::collections::HashMap;

use super::structures::ZipEntry;

/// The parsed index of an archive.
///
/// Entries keep central directory order; classpath order depends on it.
/// Duplicate names are all retained and name lookup answers with the first
/// one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectory {
    entries: Vec<ZipEntry>,
    first_by_name: HashMap<String, usize>,
    /// Absolute offset of the first central directory header.
    pub cd_offset: u64,
    pub cd_size: u64,
    /// Number of bytes in front of the zip data, e.g. a launch script.
    pub archive_start: u64,
    pub zip64: bool,
    pub comment: String,
}

impl CentralDirectory {
    pub(crate) fn new(
        entries: Vec<ZipEntry>,
        cd_offset: u64,
        cd_size: u64,
        archive_start: u64,
        zip64: bool,
        comment: String,
    ) -> Self {
        let mut first_by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            first_by_name.entry(entry.name.clone()).or_insert(index);
        }
        Self {
            entries,
            first_by_name,
            cd_offset,
            cd_size,
            archive_start,
            zip64,
            comment,
        }
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry called `name`.
    pub fn find(&self, name: &str) -> Option<&ZipEntry> {
        self.first_by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Every entry called `name`, in directory order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ZipEntry> + 'a {
        self.entries.iter().filter(move |e| e.name == name)
    }

    /// Entries whose name starts with `prefix`, excluding the prefix itself.
    pub fn under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ZipEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.name.len() > prefix.len() && e.name.starts_with(prefix))
    }
}

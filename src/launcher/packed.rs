use std::path::Path;

use async_trait::async_trait;

use super::{ClassPathContent, ClassPathEntry, LaunchSource};
use crate::block::DataBlock;
use crate::error::Result;
use crate::zip::{Archive, EntryKind};

/// An executable jar read in place through nested views.
pub struct PackedArchive {
    archive: Archive,
}

impl PackedArchive {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Archive::open(path).await?))
    }

    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

#[async_trait]
impl LaunchSource for PackedArchive {
    fn name(&self) -> &str {
        self.archive.name()
    }

    async fn read_text(&self, path: &str) -> Result<Option<String>> {
        let Some(entry) = self.archive.entry(path).await? else {
            return Ok(None);
        };
        let content = self.archive.open_entry(&entry).await?.read_all().await?;
        Ok(Some(String::from_utf8_lossy(&content).into_owned()))
    }

    async fn classes_entry(&self, dir: &str) -> Result<Option<ClassPathEntry>> {
        let directory = self.archive.central_directory().await?;
        if directory.find(dir).is_none() && directory.under(dir).next().is_none() {
            return Ok(None);
        }
        let classes = self.archive.open_directory(dir).await?;
        Ok(Some(ClassPathEntry {
            name: dir.to_string(),
            content: ClassPathContent::Archive(classes),
        }))
    }

    async fn library_entries(&self, dir: &str) -> Result<Vec<ClassPathEntry>> {
        let directory = self.archive.central_directory().await?;
        let mut libraries = Vec::new();
        for entry in directory.under(dir) {
            let direct_child = !entry.name[dir.len()..].contains('/');
            if !direct_child || entry.kind() != EntryKind::NestedArchive {
                continue;
            }
            if libraries
                .iter()
                .any(|lib: &ClassPathEntry| lib.name == entry.name)
            {
                continue;
            }
            let nested = self.archive.open_nested(entry).await?;
            nested.central_directory().await?;
            libraries.push(ClassPathEntry {
                name: entry.name.clone(),
                content: ClassPathContent::Archive(nested),
            });
        }
        Ok(libraries)
    }
}

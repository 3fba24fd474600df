use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ClassPathContent, ClassPathEntry, LaunchSource};
use crate::error::{IoResultExt, Result};
use crate::zip::Archive;

/// An executable jar that has already been unpacked to a directory.
///
/// Libraries have no central directory order here, so their natural order
/// is by file name.
pub struct ExplodedArchive {
    root: PathBuf,
    name: String,
}

impl ExplodedArchive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_end_matches('/'))
    }
}

fn is_nested_archive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".jar") || lower.ends_with(".zip")
}

#[async_trait]
impl LaunchSource for ExplodedArchive {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self, path: &str) -> Result<Option<String>> {
        let file = self.resolve(path);
        match fs::read(&file).await {
            Ok(content) => Ok(Some(String::from_utf8_lossy(&content).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).io_context(|| format!("reading {}", file.display())),
        }
    }

    async fn classes_entry(&self, dir: &str) -> Result<Option<ClassPathEntry>> {
        let path = self.resolve(dir);
        if !fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            return Ok(None);
        }
        Ok(Some(ClassPathEntry {
            name: dir.to_string(),
            content: ClassPathContent::Directory(path),
        }))
    }

    async fn library_entries(&self, dir: &str) -> Result<Vec<ClassPathEntry>> {
        let lib_dir = self.resolve(dir);
        let mut reader = match fs::read_dir(&lib_dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).io_context(|| format!("listing {}", lib_dir.display())),
        };

        let mut files = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .io_context(|| format!("listing {}", lib_dir.display()))?
        {
            let file_name = item.file_name().to_string_lossy().into_owned();
            let is_file = item
                .file_type()
                .await
                .io_context(|| format!("inspecting {}", item.path().display()))?
                .is_file();
            if is_file && is_nested_archive(&file_name) {
                files.push((file_name, item.path()));
            }
        }
        files.sort();

        let mut libraries = Vec::with_capacity(files.len());
        for (file_name, path) in files {
            libraries.push(ClassPathEntry {
                name: format!("{}{}", dir, file_name),
                content: ClassPathContent::Archive(Archive::open(&path).await?),
            });
        }
        Ok(libraries)
    }
}

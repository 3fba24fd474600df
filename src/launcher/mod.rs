//! Classpath and main class resolution for executable archives.
//!
//! An executable archive keeps application classes in one directory and its
//! dependencies as nested jars in another (`BOOT-INF/classes/` and
//! `BOOT-INF/lib/` unless the manifest says otherwise). The [`Launcher`]
//! turns that layout into an ordered classpath. It works the same on a
//! packed archive, read through nested views, and on one already exploded
//! to a directory.

mod exploded;
mod index;
mod manifest;
mod packed;

pub use exploded::ExplodedArchive;
pub use index::ClassPathIndex;
pub use manifest::{MANIFEST_PATH, Manifest};
pub use packed::PackedArchive;

use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use crate::error::{Error, Result};
use crate::zip::Archive;

pub const DEFAULT_CLASSES_DIR: &str = "BOOT-INF/classes/";
pub const DEFAULT_LIB_DIR: &str = "BOOT-INF/lib/";
pub const DEFAULT_CLASSPATH_INDEX: &str = "BOOT-INF/classpath.idx";

/// Where an executable archive keeps its classes, libraries and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchLayout {
    pub classes_dir: String,
    pub lib_dir: String,
    pub classpath_index: String,
}

impl Default for LaunchLayout {
    fn default() -> Self {
        Self {
            classes_dir: DEFAULT_CLASSES_DIR.to_string(),
            lib_dir: DEFAULT_LIB_DIR.to_string(),
            classpath_index: DEFAULT_CLASSPATH_INDEX.to_string(),
        }
    }
}

impl LaunchLayout {
    /// Defaults overridden by the `Spring-Boot-Classes`, `Spring-Boot-Lib`
    /// and `Spring-Boot-Classpath-Index` manifest attributes.
    pub fn from_manifest(manifest: Option<&Manifest>) -> Self {
        let mut layout = Self::default();
        if let Some(manifest) = manifest {
            if let Some(dir) = manifest.get("Spring-Boot-Classes") {
                layout.classes_dir = as_dir(dir);
            }
            if let Some(dir) = manifest.get("Spring-Boot-Lib") {
                layout.lib_dir = as_dir(dir);
            }
            if let Some(index) = manifest.get("Spring-Boot-Classpath-Index") {
                layout.classpath_index = index.trim().to_string();
            }
        }
        layout
    }
}

fn as_dir(dir: &str) -> String {
    let dir = dir.trim();
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

/// One element of the classpath.
pub struct ClassPathEntry {
    /// Path relative to the archive root, e.g. `BOOT-INF/lib/foo.jar`.
    pub name: String,
    pub content: ClassPathContent,
}

pub enum ClassPathContent {
    /// A jar, or a directory of a packed archive presented as one.
    Archive(Archive),
    /// A directory on disk.
    Directory(PathBuf),
}

/// An executable archive the launcher can read from.
#[async_trait]
pub trait LaunchSource: Send + Sync {
    /// Name used in messages.
    fn name(&self) -> &str;

    /// Content of the file at `path`, or `None` if there is none.
    async fn read_text(&self, path: &str) -> Result<Option<String>>;

    /// The application classes directory, if present.
    async fn classes_entry(&self, dir: &str) -> Result<Option<ClassPathEntry>>;

    /// Nested archives directly inside `dir`, in the source's natural order.
    async fn library_entries(&self, dir: &str) -> Result<Vec<ClassPathEntry>>;
}

/// Resolves the main class and classpath of an executable archive.
pub struct Launcher<S> {
    source: S,
    manifest: Option<Manifest>,
    layout: LaunchLayout,
}

impl<S: LaunchSource> Launcher<S> {
    pub async fn new(source: S) -> Result<Self> {
        let manifest = source
            .read_text(MANIFEST_PATH)
            .await?
            .map(|text| Manifest::parse(&text));
        let layout = LaunchLayout::from_manifest(manifest.as_ref());
        debug!("Launch layout of {}: {:?}", source.name(), layout);
        Ok(Self {
            source,
            manifest,
            layout,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn layout(&self) -> &LaunchLayout {
        &self.layout
    }

    /// The application's main class, from the `Start-Class` attribute.
    pub fn main_class(&self) -> Result<String> {
        self.manifest
            .as_ref()
            .and_then(|m| m.get("Start-Class"))
            .map(|class| class.trim().to_string())
            .filter(|class| !class.is_empty())
            .ok_or_else(|| {
                Error::format(format!(
                    "{}: no 'Start-Class' attribute in {}",
                    self.source.name(),
                    MANIFEST_PATH
                ))
            })
    }

    /// The classpath index, if the archive ships one.
    pub async fn classpath_index(&self) -> Result<Option<ClassPathIndex>> {
        Ok(self
            .source
            .read_text(&self.layout.classpath_index)
            .await?
            .map(|text| ClassPathIndex::parse(&text, &self.layout.lib_dir)))
    }

    /// The application classes, then the indexed libraries in index order,
    /// then every other library in natural order.
    pub async fn class_path(&self) -> Result<Vec<ClassPathEntry>> {
        let mut class_path = Vec::new();
        if let Some(classes) = self.source.classes_entry(&self.layout.classes_dir).await? {
            class_path.push(classes);
        }

        let libraries = self.source.library_entries(&self.layout.lib_dir).await?;
        let libraries = match self.classpath_index().await? {
            Some(index) => {
                debug!(
                    "Ordering {} libraries of {} by {} ({} indexed)",
                    libraries.len(),
                    self.source.name(),
                    self.layout.classpath_index,
                    index.entries().len()
                );
                index.order(libraries, |entry| entry.name.as_str())
            }
            None => libraries,
        };
        class_path.extend(libraries);
        Ok(class_path)
    }
}

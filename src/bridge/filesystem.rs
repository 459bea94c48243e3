//! Filesystem bridge
//!
//! Serves documents straight out of a local checkout. This is the bridge
//! behind the `localhost` connection variant.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── content/
//! │   └── posts/
//! │       └── hello.md        # document path "content/posts/hello.md"
//! └── .tina/
//!     └── schema.json
//! ```
//!
//! Writes go to a temp file next to the target and are renamed into place,
//! so readers never observe a partially written document.

use crate::bridge::{require_path, Bridge, BridgeKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument, warn};

const TEMP_PREFIX: &str = ".tina-tmp-";

/// Filesystem-backed bridge rooted at a content directory
#[derive(Clone, Debug)]
pub struct FilesystemBridge {
    root: PathBuf,
}

impl FilesystemBridge {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a document path below the root.
    ///
    /// Only plain relative segments are accepted.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        require_path(path)?;
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "document path escapes the content root: {}",
                        path
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Directory to start a glob walk from: the deepest directory fully
    /// named by the prefix.
    fn walk_base(&self, prefix: &str) -> Result<PathBuf> {
        match prefix.rfind('/') {
            Some(idx) if idx > 0 => self.resolve(&prefix[..idx]),
            _ => Ok(self.root.clone()),
        }
    }

    /// Convert an absolute path under the root to a slash-separated
    /// document path.
    fn document_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            segments.push(component.as_os_str().to_str()?);
        }
        Some(segments.join("/"))
    }
}

/// Errors meaning "no document here": the path is missing, names a
/// directory, or runs through a file.
fn is_absent(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
    )
}

#[async_trait]
impl Bridge for FilesystemBridge {
    fn kind(&self) -> BridgeKind {
        BridgeKind::Filesystem
    }

    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        match tokio::fs::read_to_string(&target).await {
            Ok(payload) => Ok(payload),
            Err(e) if is_absent(&e) => {
                debug!(path = %path, "Document not found, returning empty payload");
                Ok(String::new())
            }
            Err(e) => Err(Error::Storage(format!("failed to read {}: {}", path, e))),
        }
    }

    #[instrument(skip(self))]
    async fn glob(&self, prefix: &str) -> Result<Vec<String>> {
        let base = self.walk_base(prefix)?;
        let mut matches = Vec::new();
        let mut pending = vec![base];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // A prefix running through a file names no directory.
                Err(e) if is_absent(&e) => continue,
                Err(e) => {
                    return Err(Error::Storage(format!(
                        "failed to list {}: {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let entry_path = entry.path();
                if file_type.is_dir() {
                    pending.push(entry_path);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }
                match self.document_path(&entry_path) {
                    Some(doc) if doc.starts_with(prefix) => matches.push(doc),
                    Some(_) => {}
                    None => warn!(path = %entry_path.display(), "Skipping non UTF-8 path"),
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    #[instrument(skip(self, payload))]
    async fn put(&self, path: &str, payload: &str) -> Result<()> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&parent).await?;

        let temp = parent.join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        tokio::fs::write(&temp, payload).await?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::Storage(format!("failed to write {}: {}", path, e)));
        }

        debug!(path = %path, bytes = payload.len(), "Wrote document");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("failed to delete {}: {}", path, e))),
        }
    }
}

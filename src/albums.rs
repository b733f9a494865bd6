/// Album path resolution for the directory model
///
/// An album is a directory at `<pictures root>/<app namespace>/<album name>`.
/// The resolver computes that path, creates it on demand and lists the
/// existing ones. It never deletes or renames anything.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{BackendResult, BridgeError};

#[derive(Debug, Clone)]
pub struct AlbumResolver {
    pictures_root: PathBuf,
    namespace: String,
}

impl AlbumResolver {
    pub fn new(pictures_root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            pictures_root: pictures_root.into(),
            namespace: namespace.into(),
        }
    }

    /// Directory holding every album of this app
    pub fn album_root(&self) -> PathBuf {
        self.pictures_root.join(&self.namespace)
    }

    /// Compute the directory for `name` without touching the filesystem.
    pub fn path_for(&self, name: &str) -> BackendResult<PathBuf> {
        validate_album_name(name)?;
        Ok(self.album_root().join(name))
    }

    /// Catalog relative path recorded for files copied into `name`
    pub fn relative_path(&self, name: &str) -> String {
        format!("{}/{}/", self.namespace, name)
    }

    /// Create the album directory tree if absent.
    ///
    /// Succeeds when the directory exists after the call, whether it was
    /// created now or already there.
    pub fn ensure(&self, name: &str) -> BackendResult<PathBuf> {
        let path = self.path_for(name)?;
        if !path.is_dir() {
            fs::create_dir_all(&path).map_err(|e| BridgeError::io(&path, e))?;
            debug!(album = name, path = %path.display(), "album directory created");
        }
        Ok(path)
    }

    /// Names of the immediate subdirectories of the album root,
    /// in filesystem enumeration order.
    pub fn list(&self) -> BackendResult<Vec<String>> {
        let root = self.album_root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop"));
                BridgeError::io(path, source)
            })?;

            if entry.file_type().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

/// Reject names that would not map to a single directory under the root
fn validate_album_name(name: &str) -> BackendResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(BridgeError::InvalidAlbumName(name.to_string()));
    }
    Ok(())
}

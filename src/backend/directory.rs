use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::MediaBackend;
use crate::albums::AlbumResolver;
use crate::catalog::MediaCatalog;
use crate::error::{BackendResult, BridgeError};
use crate::state::data::{ImageRef, NewCatalogEntry};

/// Backend for stores where albums are directories and the media index
/// is a row catalog.
///
/// Every call is a blocking catalog/filesystem round-trip that runs to
/// completion before returning; these are local and bounded.
pub struct DirectoryBackend {
    catalog: Arc<dyn MediaCatalog>,
    albums: AlbumResolver,
    favorites_supported: bool,
}

impl DirectoryBackend {
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        albums: AlbumResolver,
        favorites_supported: bool,
    ) -> Self {
        Self {
            catalog,
            albums,
            favorites_supported,
        }
    }

    pub fn albums(&self) -> &AlbumResolver {
        &self.albums
    }
}

fn row_id(image: &ImageRef) -> BackendResult<i64> {
    image
        .row_id()
        .ok_or_else(|| BridgeError::not_found("image", image.as_str()))
}

#[async_trait]
impl MediaBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn supports_favorites(&self) -> bool {
        self.favorites_supported
    }

    async fn set_favorite(&self, image: &ImageRef, favorite: bool) -> BackendResult<bool> {
        let id = row_id(image)?;
        let rows = self.catalog.set_favorite(id, favorite)?;
        debug!(%image, favorite, rows, "favorite written");
        if rows == 0 {
            return Err(BridgeError::not_found("image", image.as_str()));
        }
        Ok(true)
    }

    async fn is_favorite(&self, image: &ImageRef) -> BackendResult<bool> {
        let id = row_id(image)?;
        // A missing row or column reads as "not favorited"
        Ok(self.catalog.favorite(id)?.unwrap_or(false))
    }

    async fn add_to_album(&self, image: &ImageRef, album: &str) -> BackendResult<bool> {
        let id = row_id(image)?;
        let source = self
            .catalog
            .find_image(id)?
            .ok_or_else(|| BridgeError::not_found("image", image.as_str()))?;

        let file_name = Path::new(&source.display_name)
            .file_name()
            .or_else(|| Path::new(&source.data).file_name())
            .ok_or_else(|| BridgeError::not_found("display name", image.as_str()))?
            .to_os_string();

        // The catalog row may outlive its file
        let source_path = fs::canonicalize(&source.data)
            .map_err(|_| BridgeError::not_found("image file", &source.data))?;

        let album_dir = self.albums.ensure(album)?;
        let target = album_dir.join(&file_name);

        // Already a member: copying a file onto itself would truncate it.
        if fs::canonicalize(&target).ok().as_ref() == Some(&source_path) {
            debug!(%image, album, "image already in album");
            return Ok(true);
        }

        // fs::copy truncates an existing file of the same name
        fs::copy(&source_path, &target).map_err(|e| BridgeError::io(&source.data, e))?;

        // The copy gets its own catalog row; it is not linked to the original.
        let entry = NewCatalogEntry {
            display_name: file_name.to_string_lossy().into_owned(),
            data: target.to_string_lossy().into_owned(),
            relative_path: self.albums.relative_path(album),
        };
        let new_id = self
            .catalog
            .insert_image(&entry)
            .map_err(|e| BridgeError::partial("file copy", e))?;

        debug!(%image, album, new_id, target = %target.display(), "image copied into album");
        Ok(true)
    }

    async fn get_albums(&self) -> BackendResult<Vec<String>> {
        self.albums.list()
    }

    async fn create_album(&self, album: &str) -> BackendResult<bool> {
        self.albums.ensure(album)?;
        Ok(true)
    }
}

impl std::fmt::Debug for DirectoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryBackend")
            .field("albums", &self.albums)
            .field("favorites_supported", &self.favorites_supported)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::error::FailureKind;
    use rusqlite::Connection;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        catalog: Arc<SqliteCatalog>,
        backend: DirectoryBackend,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(SqliteCatalog::open(dir.path().join("media.db")).unwrap());
        let albums = AlbumResolver::new(dir.path().join("Pictures"), "PicSor");
        let backend = DirectoryBackend::new(catalog.clone(), albums, true);
        Fixture {
            dir,
            catalog,
            backend,
        }
    }

    /// Put a real file on disk and register it under a fixed row id
    fn seed_image(fx: &Fixture, id: i64, name: &str) {
        let camera = fx.dir.path().join("DCIM");
        fs::create_dir_all(&camera).unwrap();
        let path = camera.join(name);
        fs::write(&path, b"jpeg bytes").unwrap();

        let conn = Connection::open(fx.catalog.path().unwrap()).unwrap();
        conn.execute(
            "INSERT INTO images (id, display_name, data, relative_path, date_added)
             VALUES (?1, ?2, ?3, 'DCIM/', 0)",
            rusqlite::params![id, name, path.to_string_lossy()],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_set_then_read_favorite() {
        let fx = fixture();
        seed_image(&fx, 7, "IMG_0007.jpg");
        let image = ImageRef::new("7");

        assert!(!fx.backend.is_favorite(&image).await.unwrap());
        assert!(fx.backend.set_favorite(&image, true).await.unwrap());
        assert!(fx.backend.is_favorite(&image).await.unwrap());
        assert!(fx.backend.set_favorite(&image, false).await.unwrap());
        assert!(!fx.backend.is_favorite(&image).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let fx = fixture();

        assert!(!fx.backend.is_favorite(&ImageRef::new("404")).await.unwrap());
        let err = fx
            .backend
            .set_favorite(&ImageRef::new("404"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);

        let err = fx
            .backend
            .is_favorite(&ImageRef::new("not-a-number"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);
    }

    #[tokio::test]
    async fn test_add_to_album_copies_and_registers() {
        let fx = fixture();
        seed_image(&fx, 42, "IMG_0042.jpg");

        let added = fx
            .backend
            .add_to_album(&ImageRef::new("42"), "Summer")
            .await
            .unwrap();
        assert!(added);

        let albums = fx.backend.get_albums().await.unwrap();
        assert!(albums.contains(&"Summer".to_string()));

        let copy = fx.backend.albums().path_for("Summer").unwrap().join("IMG_0042.jpg");
        assert_eq!(fs::read(&copy).unwrap(), b"jpeg bytes");

        // Original plus an independent row for the copy
        assert_eq!(fx.catalog.image_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_to_album_overwrites_same_name() {
        let fx = fixture();
        seed_image(&fx, 1, "dup.jpg");
        let image = ImageRef::new("1");

        fx.backend.add_to_album(&image, "Pets").await.unwrap();
        fx.backend.add_to_album(&image, "Pets").await.unwrap();

        let dir = fx.backend.albums().path_for("Pets").unwrap();
        assert_eq!(fs::read_dir(dir).unwrap().count(), 1);
        assert_eq!(fx.backend.get_albums().await.unwrap(), vec!["Pets".to_string()]);
    }

    #[tokio::test]
    async fn test_re_adding_album_copy_keeps_its_bytes() {
        let fx = fixture();
        seed_image(&fx, 1, "IMG_0001.jpg");

        fx.backend.add_to_album(&ImageRef::new("1"), "Summer").await.unwrap();
        assert_eq!(fx.catalog.image_count().unwrap(), 2);

        // Row 2 is the copy living inside Summer
        let added = fx
            .backend
            .add_to_album(&ImageRef::new("2"), "Summer")
            .await
            .unwrap();
        assert!(added);

        let copy = fx.backend.albums().path_for("Summer").unwrap().join("IMG_0001.jpg");
        assert_eq!(fs::read(&copy).unwrap(), b"jpeg bytes");
        assert_eq!(fx.catalog.image_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_to_album_with_file_gone_from_disk() {
        let fx = fixture();
        seed_image(&fx, 3, "IMG_0003.jpg");
        fs::remove_file(fx.dir.path().join("DCIM").join("IMG_0003.jpg")).unwrap();

        let err = fx
            .backend
            .add_to_album(&ImageRef::new("3"), "Lost")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);
        assert!(fx.backend.get_albums().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_to_album_missing_image_creates_nothing() {
        let fx = fixture();
        let err = fx
            .backend
            .add_to_album(&ImageRef::new("5"), "Ghost")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);
        assert!(fx.backend.get_albums().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_album_twice() {
        let fx = fixture();
        assert!(fx.backend.create_album("Trips").await.unwrap());
        assert!(fx.backend.create_album("Trips").await.unwrap());
        assert!(fx.backend.create_album("Pets").await.unwrap());

        let mut albums = fx.backend.get_albums().await.unwrap();
        albums.sort();
        assert_eq!(albums, vec!["Pets".to_string(), "Trips".to_string()]);
    }
}

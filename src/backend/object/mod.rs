//! Backend for object-model photo libraries.
//!
//! Reads resolve straight from the library; writes go through
//! [`PhotoLibrary::perform_changes`] and are not complete until the
//! transaction's completion fires.

pub mod library;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::MediaBackend;
use crate::error::{BackendResult, BridgeError};
use crate::state::data::ImageRef;
use library::{Asset, ChangeRequest, Collection, PhotoLibrary, Transaction};

pub use memory::MemoryPhotoLibrary;

/// Steps of `add_to_album`. Each transaction is awaited before the next
/// state is entered, so one call never has two transactions in flight.
#[derive(Debug)]
enum AddToAlbum {
    ResolveAsset,
    LookupAlbum { asset: Asset },
    AwaitCreation { asset: Asset, pending: Transaction },
    ResolveCommitted { asset: Asset },
    Submit { asset: Asset, album: Collection, created: bool },
    AwaitMembership { pending: Transaction, created: bool },
}

pub struct ObjectBackend {
    library: Arc<dyn PhotoLibrary>,
    create_album_parity: bool,
}

impl ObjectBackend {
    pub fn new(library: Arc<dyn PhotoLibrary>) -> Self {
        Self {
            library,
            create_album_parity: false,
        }
    }

    /// Serve `createAlbum` as fetch-or-create instead of reporting it
    /// unimplemented.
    pub fn with_create_album_parity(mut self, enabled: bool) -> Self {
        self.create_album_parity = enabled;
        self
    }

    fn resolve_asset(&self, image: &ImageRef) -> BackendResult<Asset> {
        self.library
            .fetch_asset(image.as_str())
            .ok_or_else(|| BridgeError::not_found("asset", image.as_str()))
    }

    fn resolve_album(&self, album: &str) -> BackendResult<Collection> {
        self.library
            .fetch_album(album)
            .ok_or_else(|| BridgeError::not_found("album", album))
    }

    fn submit_create(&self, album: &str) -> Transaction {
        let pending = self.library.perform_changes(vec![ChangeRequest::CreateAlbum {
            title: album.to_string(),
        }]);
        if let Some(placeholder) = pending.placeholders().first() {
            debug!(album, placeholder = %placeholder.local_id, "album creation submitted");
        }
        pending
    }
}

#[async_trait]
impl MediaBackend for ObjectBackend {
    fn name(&self) -> &'static str {
        "object"
    }

    async fn set_favorite(&self, image: &ImageRef, favorite: bool) -> BackendResult<bool> {
        let asset = self.resolve_asset(image)?;
        self.library
            .perform_changes(vec![ChangeRequest::SetFavorite {
                asset: asset.local_id,
                favorite,
            }])
            .completion("favorite change")
            .await?;
        Ok(true)
    }

    async fn is_favorite(&self, image: &ImageRef) -> BackendResult<bool> {
        Ok(self.resolve_asset(image)?.is_favorite)
    }

    async fn add_to_album(&self, image: &ImageRef, album: &str) -> BackendResult<bool> {
        let mut state = AddToAlbum::ResolveAsset;
        loop {
            state = match state {
                AddToAlbum::ResolveAsset => AddToAlbum::LookupAlbum {
                    asset: self.resolve_asset(image)?,
                },
                AddToAlbum::LookupAlbum { asset } => match self.library.fetch_album(album) {
                    Some(found) => AddToAlbum::Submit {
                        asset,
                        album: found,
                        created: false,
                    },
                    None => AddToAlbum::AwaitCreation {
                        asset,
                        pending: self.submit_create(album),
                    },
                },
                AddToAlbum::AwaitCreation { asset, pending } => {
                    pending.completion("album creation").await?;
                    AddToAlbum::ResolveCommitted { asset }
                }
                // The placeholder is not guaranteed to be fetchable by
                // identity, so look the album up by title again.
                AddToAlbum::ResolveCommitted { asset } => AddToAlbum::Submit {
                    asset,
                    album: self
                        .resolve_album(album)
                        .map_err(|e| BridgeError::partial("album creation", e))?,
                    created: true,
                },
                AddToAlbum::Submit {
                    asset,
                    album: collection,
                    created,
                } => AddToAlbum::AwaitMembership {
                    pending: self.library.perform_changes(vec![ChangeRequest::AddAssets {
                        collection: collection.local_id,
                        assets: vec![asset.local_id],
                    }]),
                    created,
                },
                AddToAlbum::AwaitMembership { pending, created } => {
                    // A created album is left in place if membership fails.
                    return match pending.completion("album membership").await {
                        Ok(()) => {
                            debug!(%image, album, created, "asset added to album");
                            Ok(true)
                        }
                        Err(e) if created => Err(BridgeError::partial("album creation", e)),
                        Err(e) => Err(e),
                    };
                }
            };
        }
    }

    async fn get_albums(&self) -> BackendResult<Vec<String>> {
        Ok(self
            .library
            .albums()
            .into_iter()
            .map(|c| c.title.unwrap_or_default())
            .collect())
    }

    async fn create_album(&self, album: &str) -> BackendResult<bool> {
        if !self.create_album_parity {
            return Err(BridgeError::Unimplemented("createAlbum".to_string()));
        }
        if album.is_empty() {
            return Err(BridgeError::InvalidAlbumName(album.to_string()));
        }
        if self.library.fetch_album(album).is_some() {
            return Ok(true);
        }

        self.submit_create(album).completion("album creation").await?;
        self.resolve_album(album)?;
        Ok(true)
    }
}

impl std::fmt::Debug for ObjectBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBackend")
            .field("create_album_parity", &self.create_album_parity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn backend() -> (MemoryPhotoLibrary, ObjectBackend) {
        let library = MemoryPhotoLibrary::new();
        library.insert_asset("asset-1");
        let backend = ObjectBackend::new(Arc::new(library.clone()));
        (library, backend)
    }

    #[tokio::test]
    async fn test_favorite_round_trip() {
        let (_, backend) = backend();
        let image = ImageRef::new("asset-1");

        assert!(!backend.is_favorite(&image).await.unwrap());
        assert!(backend.set_favorite(&image, true).await.unwrap());
        assert!(backend.is_favorite(&image).await.unwrap());
        assert!(backend.set_favorite(&image, false).await.unwrap());
        assert!(!backend.is_favorite(&image).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_asset() {
        let (library, backend) = backend();
        let image = ImageRef::new("nope");

        let err = backend.is_favorite(&image).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);
        let err = backend.add_to_album(&image, "Trips").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ResolutionFailure);
        assert_eq!(library.submitted(), 0);
    }

    #[tokio::test]
    async fn test_favorite_transaction_rejected() {
        let (library, backend) = backend();
        library.reject_next(1);

        let err = backend
            .set_favorite(&ImageRef::new("asset-1"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::TransactionFailed);
    }

    #[tokio::test]
    async fn test_add_to_new_album_then_again() {
        let (library, backend) = backend();
        let image = ImageRef::new("asset-1");

        assert!(backend.add_to_album(&image, "Trips").await.unwrap());
        assert!(backend.add_to_album(&image, "Trips").await.unwrap());

        assert_eq!(library.album_count("Trips"), 1);
        assert_eq!(library.album_members("Trips"), vec!["asset-1".to_string()]);
        // create + add, then add only
        assert_eq!(library.submitted(), 3);
    }

    #[tokio::test]
    async fn test_creation_failure_stops_before_membership() {
        let (library, backend) = backend();
        library.reject_next(1);

        let err = backend
            .add_to_album(&ImageRef::new("asset-1"), "Pets")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::TransactionFailed);
        assert_eq!(library.album_count("Pets"), 0);
        assert_eq!(library.submitted(), 1);
    }

    #[tokio::test]
    async fn test_membership_failure_leaves_empty_album() {
        let (library, backend) = backend();
        // creation is submission 1, membership submission 2
        library.reject_submission(2);

        let err = backend
            .add_to_album(&ImageRef::new("asset-1"), "Pets")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PartialFailure);
        assert_eq!(library.album_count("Pets"), 1);
        assert!(library.album_members("Pets").is_empty());
    }

    /// Library that never answers membership changes: it drops the
    /// completion sender instead.
    struct SilentMembership(MemoryPhotoLibrary);

    impl PhotoLibrary for SilentMembership {
        fn fetch_asset(&self, local_id: &str) -> Option<Asset> {
            self.0.fetch_asset(local_id)
        }

        fn fetch_album(&self, title: &str) -> Option<Collection> {
            self.0.fetch_album(title)
        }

        fn albums(&self) -> Vec<Collection> {
            self.0.albums()
        }

        fn perform_changes(&self, changes: Vec<ChangeRequest>) -> Transaction {
            let membership = changes
                .iter()
                .any(|c| matches!(c, ChangeRequest::AddAssets { .. }));
            if !membership {
                return self.0.perform_changes(changes);
            }
            let (tx, rx) = tokio::sync::oneshot::channel();
            drop(tx);
            Transaction::new(Vec::new(), rx)
        }
    }

    #[tokio::test]
    async fn test_dropped_membership_completion_after_creation() {
        let library = MemoryPhotoLibrary::new();
        library.insert_asset("asset-1");
        let backend = ObjectBackend::new(Arc::new(SilentMembership(library.clone())));

        let err = backend
            .add_to_album(&ImageRef::new("asset-1"), "Trips")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PartialFailure);
        assert_eq!(library.album_count("Trips"), 1);
        assert!(library.album_members("Trips").is_empty());
    }

    #[tokio::test]
    async fn test_membership_failure_on_existing_album() {
        let (library, backend) = backend();
        library.insert_album(Some("Pets"));
        library.reject_next(1);

        let err = backend
            .add_to_album(&ImageRef::new("asset-1"), "Pets")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::TransactionFailed);
    }

    #[tokio::test]
    async fn test_get_albums_titles() {
        let (library, backend) = backend();
        library.insert_album(Some("Trips"));
        library.insert_album(None);
        library.insert_album(Some("Pets"));

        assert_eq!(
            backend.get_albums().await.unwrap(),
            vec!["Trips".to_string(), String::new(), "Pets".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_album_without_parity() {
        let (library, backend) = backend();
        let err = backend.create_album("Trips").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unimplemented);
        assert_eq!(library.album_count("Trips"), 0);
    }

    #[tokio::test]
    async fn test_create_album_with_parity_is_idempotent() {
        let (library, backend) = backend();
        let backend = backend.with_create_album_parity(true);

        assert!(backend.create_album("Trips").await.unwrap());
        assert!(backend.create_album("Trips").await.unwrap());
        assert_eq!(library.album_count("Trips"), 1);
    }
}

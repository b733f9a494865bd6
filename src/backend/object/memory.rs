//! In-memory object-model photo library.
//!
//! Change sets are applied on a spawned task, so completion is genuinely
//! asynchronous relative to the submitter. A change set is all-or-nothing.
//! Used by the binary's `object` mode and by tests.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use super::library::{Asset, ChangeRequest, Collection, Placeholder, PhotoLibrary, Transaction};

#[derive(Debug, Default)]
struct Store {
    assets: Vec<Asset>,
    collections: Vec<CollectionRecord>,
    next_id: u64,
    /// Number of upcoming transactions to reject
    reject_next: usize,
    /// Submission numbers (1-based) to reject
    reject_submissions: Vec<usize>,
    submitted: usize,
}

#[derive(Debug, Clone)]
struct CollectionRecord {
    local_id: String,
    title: Option<String>,
    assets: Vec<String>,
}

impl Store {
    fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn has_asset(&self, id: &str) -> bool {
        self.assets.iter().any(|a| a.local_id == id)
    }

    fn validate(&self, changes: &[ChangeRequest]) -> Result<(), String> {
        for change in changes {
            match change {
                ChangeRequest::SetFavorite { asset, .. } if !self.has_asset(asset) => {
                    return Err(format!("unknown asset {asset}"));
                }
                ChangeRequest::AddAssets { collection, assets } => {
                    if !self.collections.iter().any(|c| &c.local_id == collection) {
                        return Err(format!("unknown collection {collection}"));
                    }
                    if let Some(missing) = assets.iter().find(|a| !self.has_asset(a)) {
                        return Err(format!("unknown asset {missing}"));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: Vec<ChangeRequest>, mut created: Vec<Placeholder>) {
        created.reverse();
        for change in changes {
            match change {
                ChangeRequest::SetFavorite { asset, favorite } => {
                    if let Some(a) = self.assets.iter_mut().find(|a| a.local_id == asset) {
                        a.is_favorite = favorite;
                    }
                }
                ChangeRequest::CreateAlbum { title } => {
                    let local_id = match created.pop() {
                        Some(p) => p.local_id,
                        None => self.mint_id("album"),
                    };
                    self.collections.push(CollectionRecord {
                        local_id,
                        title: Some(title),
                        assets: Vec::new(),
                    });
                }
                ChangeRequest::AddAssets { collection, assets } => {
                    if let Some(c) = self.collections.iter_mut().find(|c| c.local_id == collection) {
                        for asset in assets {
                            if !c.assets.contains(&asset) {
                                c.assets.push(asset);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Shared, cloneable in-memory library
#[derive(Debug, Clone, Default)]
pub struct MemoryPhotoLibrary {
    store: Arc<Mutex<Store>>,
}

impl MemoryPhotoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an asset with the given local identifier
    pub fn insert_asset(&self, local_id: impl Into<String>) {
        self.lock().assets.push(Asset {
            local_id: local_id.into(),
            is_favorite: false,
        });
    }

    /// Add an already-committed album, returning its identifier
    pub fn insert_album(&self, title: Option<&str>) -> String {
        let mut store = self.lock();
        let local_id = store.mint_id("album");
        store.collections.push(CollectionRecord {
            local_id: local_id.clone(),
            title: title.map(str::to_string),
            assets: Vec::new(),
        });
        local_id
    }

    /// Reject the next `count` submitted transactions
    pub fn reject_next(&self, count: usize) {
        self.lock().reject_next = count;
    }

    /// Reject the `number`-th transaction submitted to this library (1-based)
    pub fn reject_submission(&self, number: usize) {
        self.lock().reject_submissions.push(number);
    }

    /// Asset identifiers held by every album titled `title`
    pub fn album_members(&self, title: &str) -> Vec<String> {
        self.lock()
            .collections
            .iter()
            .filter(|c| c.title.as_deref() == Some(title))
            .flat_map(|c| c.assets.iter().cloned())
            .collect()
    }

    /// Number of albums titled `title`
    pub fn album_count(&self, title: &str) -> usize {
        self.lock()
            .collections
            .iter()
            .filter(|c| c.title.as_deref() == Some(title))
            .count()
    }

    /// Number of transactions submitted so far
    pub fn submitted(&self) -> usize {
        self.lock().submitted
    }
}

impl PhotoLibrary for MemoryPhotoLibrary {
    fn fetch_asset(&self, local_id: &str) -> Option<Asset> {
        self.lock()
            .assets
            .iter()
            .find(|a| a.local_id == local_id)
            .cloned()
    }

    fn fetch_album(&self, title: &str) -> Option<Collection> {
        self.lock()
            .collections
            .iter()
            .find(|c| c.title.as_deref() == Some(title))
            .map(|c| Collection {
                local_id: c.local_id.clone(),
                title: c.title.clone(),
            })
    }

    fn albums(&self) -> Vec<Collection> {
        self.lock()
            .collections
            .iter()
            .map(|c| Collection {
                local_id: c.local_id.clone(),
                title: c.title.clone(),
            })
            .collect()
    }

    fn perform_changes(&self, changes: Vec<ChangeRequest>) -> Transaction {
        let (number, placeholders) = {
            let mut store = self.lock();
            store.submitted += 1;
            let number = store.submitted;
            let placeholders: Vec<Placeholder> = changes
                .iter()
                .filter(|c| matches!(c, ChangeRequest::CreateAlbum { .. }))
                .map(|_| Placeholder {
                    local_id: store.mint_id("album"),
                })
                .collect();
            (number, placeholders)
        };

        let (tx, rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        let created = placeholders.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;

            let outcome = {
                let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let marked = store.reject_submissions.iter().position(|n| *n == number);
                if let Some(idx) = marked {
                    store.reject_submissions.swap_remove(idx);
                    Err("change request rejected".to_string())
                } else if store.reject_next > 0 {
                    store.reject_next -= 1;
                    Err("change request rejected".to_string())
                } else {
                    match store.validate(&changes) {
                        Ok(()) => {
                            store.apply(changes, created);
                            Ok(())
                        }
                        Err(reason) => Err(reason),
                    }
                }
            };

            debug!(ok = outcome.is_ok(), "memory library transaction completed");
            // The submitter may have gone away; nothing to report to.
            let _ = tx.send(outcome);
        });

        Transaction::new(placeholders, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_album_uses_placeholder_id() {
        let library = MemoryPhotoLibrary::new();
        let txn = library.perform_changes(vec![ChangeRequest::CreateAlbum {
            title: "Trips".to_string(),
        }]);
        let placeholder = txn.placeholders()[0].clone();

        // Not committed until completion fires
        assert!(library.fetch_album("Trips").is_none());
        txn.completion("create").await.unwrap();

        let album = library.fetch_album("Trips").unwrap();
        assert_eq!(album.local_id, placeholder.local_id);
    }

    #[tokio::test]
    async fn test_invalid_change_set_is_rejected_whole() {
        let library = MemoryPhotoLibrary::new();
        library.insert_asset("a1");

        let txn = library.perform_changes(vec![
            ChangeRequest::SetFavorite {
                asset: "a1".to_string(),
                favorite: true,
            },
            ChangeRequest::SetFavorite {
                asset: "missing".to_string(),
                favorite: true,
            },
        ]);
        assert!(txn.completion("favorite").await.is_err());
        assert!(!library.fetch_asset("a1").unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_reject_next() {
        let library = MemoryPhotoLibrary::new();
        library.reject_next(1);

        let first = library.perform_changes(vec![ChangeRequest::CreateAlbum {
            title: "A".to_string(),
        }]);
        assert!(first.completion("create").await.is_err());

        let second = library.perform_changes(vec![ChangeRequest::CreateAlbum {
            title: "A".to_string(),
        }]);
        assert!(second.completion("create").await.is_ok());
        assert_eq!(library.album_count("A"), 1);
        assert_eq!(library.submitted(), 2);
    }
}

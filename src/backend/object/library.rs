//! Collaborator interface for object-model photo libraries.
//!
//! Albums are collection objects holding asset references. Reads are
//! synchronous fetches; every mutation is a change set submitted as one
//! transaction that completes later through a oneshot channel.

use tokio::sync::oneshot;

use crate::error::{BackendResult, BridgeError};

/// Snapshot of an asset at fetch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub local_id: String,
    pub is_favorite: bool,
}

/// Handle to a committed album collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub local_id: String,
    /// Display title; collections may have none
    pub title: Option<String>,
}

/// Reference to an object created by a transaction that has not committed yet.
///
/// The library does not promise the placeholder is fetchable by identity
/// once the transaction completes; callers re-fetch by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub local_id: String,
}

/// A single mutation inside a change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRequest {
    SetFavorite { asset: String, favorite: bool },
    CreateAlbum { title: String },
    AddAssets { collection: String, assets: Vec<String> },
}

/// Completion signal sent by the library: `Err` carries its reason
pub type Completion = Result<(), String>;

/// A submitted change set, pending until its completion fires.
#[derive(Debug)]
pub struct Transaction {
    placeholders: Vec<Placeholder>,
    completion: oneshot::Receiver<Completion>,
}

impl Transaction {
    pub fn new(placeholders: Vec<Placeholder>, completion: oneshot::Receiver<Completion>) -> Self {
        Self {
            placeholders,
            completion,
        }
    }

    /// Placeholders for objects this transaction creates, in request order
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Suspend until the library reports the outcome.
    ///
    /// There is no timeout: a library that never answers stalls the caller.
    /// A library that drops the sender counts as a failed transaction.
    pub async fn completion(self, phase: &'static str) -> BackendResult<()> {
        match self.completion.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(BridgeError::transaction(phase, reason)),
            Err(_) => Err(BridgeError::transaction(phase, "completion dropped")),
        }
    }
}

/// An object-model photo library.
pub trait PhotoLibrary: Send + Sync {
    /// Fetch an asset by local identifier
    fn fetch_asset(&self, local_id: &str) -> Option<Asset>;

    /// Fetch the first album whose title matches exactly
    fn fetch_album(&self, title: &str) -> Option<Collection>;

    /// Every album-type collection, in library enumeration order
    fn albums(&self) -> Vec<Collection>;

    /// Submit a change set as one transaction
    fn perform_changes(&self, changes: Vec<ChangeRequest>) -> Transaction;
}

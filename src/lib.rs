//! Photo library bridge
//!
//! Serves a small command set (`setFavorite`, `isFavorite`, `addToAlbum`,
//! `getAlbums`, `createAlbum`) from a host method channel against one of two
//! native store models:
//! - a directory model, where albums are folders of copied files tracked by a
//!   row catalog
//! - an object model, where albums are collections mutated through
//!   asynchronous transactions
//!
//! Every call resolves identifiers fresh; nothing is cached between calls.

pub mod albums;
pub mod backend;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod encoder;
pub mod error;
pub mod router;
pub mod state;

pub use backend::MediaBackend;
pub use channel::{MethodCall, Reply};
pub use config::Config;
pub use error::{BackendResult, BridgeError, FailureKind};
pub use router::CommandRouter;

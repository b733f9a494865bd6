/// Media backends
///
/// Two native stores expose the same logical entities through different
/// physical models:
/// - `directory`: albums are directories, the catalog is a row index
/// - `object`: albums are collection objects mutated by async transactions
///
/// The router only ever talks to [`MediaBackend`].

pub mod directory;
pub mod object;

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::state::data::ImageRef;

pub use directory::DirectoryBackend;
pub use object::ObjectBackend;

/// The five logical operations every backend serves.
///
/// Results keep the full failure kind; flattening to the channel's
/// boolean / list values happens in the encoder.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether the favorite flag can be read and written on this build.
    ///
    /// The router checks this before `set_favorite` / `is_favorite`.
    fn supports_favorites(&self) -> bool {
        true
    }

    async fn set_favorite(&self, image: &ImageRef, favorite: bool) -> BackendResult<bool>;

    async fn is_favorite(&self, image: &ImageRef) -> BackendResult<bool>;

    async fn add_to_album(&self, image: &ImageRef, album: &str) -> BackendResult<bool>;

    async fn get_albums(&self) -> BackendResult<Vec<String>>;

    async fn create_album(&self, album: &str) -> BackendResult<bool>;
}

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picsor_bridge::albums::AlbumResolver;
use picsor_bridge::backend::object::MemoryPhotoLibrary;
use picsor_bridge::backend::{DirectoryBackend, ObjectBackend};
use picsor_bridge::catalog::SqliteCatalog;
use picsor_bridge::channel::serve;
use picsor_bridge::config::BackendKind;
use picsor_bridge::{BridgeError, CommandRouter, Config, MediaBackend};

/// Build the backend selected by the config
fn build_backend(config: &Config) -> Result<Arc<dyn MediaBackend>, BridgeError> {
    match config.backend {
        BackendKind::Directory => {
            let catalog = SqliteCatalog::open(&config.catalog_path)?;
            let albums = AlbumResolver::new(&config.pictures_root, &config.app_namespace);
            info!(
                album_root = %albums.album_root().display(),
                favorites = config.favorites_supported(),
                "directory backend ready"
            );
            Ok(Arc::new(DirectoryBackend::new(
                Arc::new(catalog),
                albums,
                config.favorites_supported(),
            )))
        }
        BackendKind::Object => {
            warn!("object backend is running on a volatile in-memory library");
            let library = Arc::new(MemoryPhotoLibrary::new());
            Ok(Arc::new(
                ObjectBackend::new(library)
                    .with_create_album_parity(config.object.create_album_parity),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the channel, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    let router = CommandRouter::new(build_backend(&config)?);
    info!(?router, "listening for calls on stdin");

    let stdin = BufReader::new(tokio::io::stdin());
    serve(stdin, tokio::io::stdout(), router).await?;
    info!("input closed, shutting down");
    Ok(())
}

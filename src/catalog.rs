use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{BackendResult, BridgeError};
use crate::state::data::{CatalogImage, NewCatalogEntry};

/// Column holding the favorite flag. Older catalogs may not have it.
const FAVORITE_COLUMN: &str = "is_favorite";

/// The authoritative media index, as seen by the directory backend.
///
/// Lookups are by catalog row id. Implementations own their storage; the
/// bridge never caches a row between calls.
pub trait MediaCatalog: Send + Sync {
    /// Look up a single image row
    fn find_image(&self, id: i64) -> BackendResult<Option<CatalogImage>>;

    /// Read the favorite attribute.
    /// `None` when the row or the column is absent.
    fn favorite(&self, id: i64) -> BackendResult<Option<bool>>;

    /// Write the favorite attribute, returning the number of rows affected
    fn set_favorite(&self, id: i64, favorite: bool) -> BackendResult<usize>;

    /// Register a new physical file, returning its row id
    fn insert_image(&self, entry: &NewCatalogEntry) -> BackendResult<i64>;
}

/// SQLite-backed media catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database at `path`.
    ///
    /// The parent directory is created if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BridgeError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "media catalog opened");

        let catalog = SqliteCatalog {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        catalog.init_schema()?;
        info!(images = catalog.image_count()?, "media catalog ready");
        Ok(catalog)
    }

    /// Open a throwaway catalog that lives only in memory
    pub fn open_in_memory() -> BackendResult<Self> {
        let catalog = SqliteCatalog {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Wrap an existing connection without touching its schema.
    #[cfg(test)]
    fn from_connection(conn: Connection) -> Self {
        SqliteCatalog {
            conn: Mutex::new(conn),
            db_path: None,
        }
    }

    /// Create the images table and indexes if they don't exist.
    fn init_schema(&self) -> BackendResult<()> {
        let conn = self.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name    TEXT NOT NULL,
                data            TEXT NOT NULL,
                relative_path   TEXT,
                is_favorite     INTEGER DEFAULT 0,
                date_added      INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_relative_path
             ON images(relative_path)",
            [],
        )?;

        debug!("catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file, if it is file-backed
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get a count of images in the catalog
    pub fn image_count(&self) -> BackendResult<i64> {
        let count = self
            .lock()
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    // A poisoned lock only means another call panicked mid-statement;
    // SQLite itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MediaCatalog for SqliteCatalog {
    fn find_image(&self, id: i64) -> BackendResult<Option<CatalogImage>> {
        let image = self
            .lock()
            .query_row(
                "SELECT id, display_name, data, relative_path FROM images WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CatalogImage {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        data: row.get(2)?,
                        relative_path: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(image)
    }

    fn favorite(&self, id: i64) -> BackendResult<Option<bool>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM images WHERE id = ?1")?;

        // Catalogs created before the flag existed have no such column
        let idx = match stmt.column_index(FAVORITE_COLUMN) {
            Ok(idx) => idx,
            Err(_) => return Ok(None),
        };

        let value: Option<Option<i64>> = stmt
            .query_row(params![id], |row| row.get(idx))
            .optional()?;
        Ok(value.flatten().map(|v| v == 1))
    }

    fn set_favorite(&self, id: i64, favorite: bool) -> BackendResult<usize> {
        let rows = self.lock().execute(
            "UPDATE images SET is_favorite = ?1 WHERE id = ?2",
            params![i64::from(favorite), id],
        )?;
        Ok(rows)
    }

    fn insert_image(&self, entry: &NewCatalogEntry) -> BackendResult<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO images (display_name, data, relative_path, date_added)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &entry.display_name,
                &entry.data,
                &entry.relative_path,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("db_path", &self.db_path)
            .finish()
    }
}

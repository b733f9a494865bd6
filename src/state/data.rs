/// Shared data structures for the bridge
///
/// These structs represent the data model that flows between
/// the media catalog and the backends.

use std::fmt;

/// Opaque backend-specific identifier for a single image.
///
/// The directory backend expects a decimal catalog row id, the object
/// backend an asset local identifier. The bridge never persists one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a catalog row id (directory model)
    pub fn row_id(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a single image row in the media catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogImage {
    /// Unique catalog row ID
    pub id: i64,
    /// Filename shown to the user (e.g., "IMG_0042.jpg")
    pub display_name: String,
    /// Full path to the physical file
    pub data: String,
    /// Path relative to the public storage root, if recorded
    pub relative_path: Option<String>,
}

/// A row to be inserted into the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogEntry {
    pub display_name: String,
    pub data: String,
    pub relative_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id_parses_decimal() {
        assert_eq!(ImageRef::new("42").row_id(), Some(42));
        assert_eq!(ImageRef::new(" 7 ").row_id(), Some(7));
    }

    #[test]
    fn test_row_id_rejects_local_identifiers() {
        assert_eq!(ImageRef::new("ABC-123/L0/001").row_id(), None);
        assert_eq!(ImageRef::new("").row_id(), None);
    }
}

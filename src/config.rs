use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PICSOR_CONFIG";

/// First platform level whose catalog carries the favorite flag
pub const FAVORITES_MIN_PLATFORM_LEVEL: u32 = 30;

const APP_DIR: &str = "picsor";

/// Which native store the bridge talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Directory,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Serve `createAlbum` on the object backend as fetch-or-create
    pub create_album_parity: bool,
}

/// Bridge configuration.
///
/// Every field is optional in the file; missing ones fall back to the
/// platform's standard directories.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    /// Public pictures root; albums live under `<root>/<app_namespace>`
    pub pictures_root: PathBuf,
    pub app_namespace: String,
    /// SQLite media catalog for the directory backend
    pub catalog_path: PathBuf,
    pub platform_level: u32,
    pub object: ObjectConfig,
}

impl Default for Config {
    fn default() -> Self {
        let pictures_root = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("Pictures"));

        let mut catalog_path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        catalog_path.push(APP_DIR);
        catalog_path.push("media.db");

        Self {
            backend: BackendKind::default(),
            pictures_root,
            app_namespace: "PicSor".to_string(),
            catalog_path,
            platform_level: FAVORITES_MIN_PLATFORM_LEVEL,
            object: ObjectConfig::default(),
        }
    }
}

impl Config {
    /// Load from `$PICSOR_CONFIG`, else the default config file if it
    /// exists, else built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/picsor/bridge.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("bridge.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether the directory backend may read and write favorites
    pub fn favorites_supported(&self) -> bool {
        self.platform_level >= FAVORITES_MIN_PLATFORM_LEVEL
    }
}

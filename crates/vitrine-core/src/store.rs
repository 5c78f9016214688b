use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::settings::{SettingsSection, SiteSettings};

/// Overrides the data directory, e.g. `VITRINE_HOME=/srv/vitrine`.
pub const HOME_ENV: &str = "VITRINE_HOME";

const CATALOG_FILE: &str = "catalog.json";
const SETTINGS_FILE: &str = "settings.json";

/// Resolve the default data directory (~/.vitrine/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vitrine")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    /// `$VITRINE_HOME` when set and non-empty, else `~/.vitrine`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(data_dir);
        StoreConfig { root }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        StoreConfig { root: root.into() }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }
}

/// JSON-file persistence for the catalog and site settings.
///
/// Every mutation is one load-apply-write unit. Writes go through a temp
/// file and a rename, so a reader sees either the old file or the new one.
/// There is no cross-process lock: two writers racing on the same file
/// means the last rename wins.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    config: StoreConfig,
}

impl CatalogStore {
    pub fn open(config: StoreConfig) -> Self {
        CatalogStore { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read the catalog. A missing file is an empty catalog.
    pub fn load(&self) -> Result<Catalog> {
        Ok(read_json(&self.config.catalog_path())?.unwrap_or_default())
    }

    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        write_json(&self.config.root, CATALOG_FILE, catalog)?;
        tracing::debug!(
            path = %self.config.catalog_path().display(),
            categories = catalog.categories.len(),
            products = catalog.products.all().len(),
            "catalog written"
        );
        Ok(())
    }

    /// Load, apply `op`, and write back only if `op` succeeded.
    pub fn transact<T>(&self, op: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let mut catalog = self.load()?;
        let out = op(&mut catalog)?;
        self.save(&catalog)?;
        Ok(out)
    }

    /// Read the site settings, falling back to defaults for a missing file.
    pub fn read_settings(&self) -> Result<SiteSettings> {
        Ok(read_json(&self.config.settings_path())?.unwrap_or_default())
    }

    /// Validate and persist the site settings.
    pub fn write_settings(&self, settings: &SiteSettings) -> Result<()> {
        settings.validate()?;
        self.persist_settings(settings)
    }

    /// Read-modify-write the settings, validating all sections.
    pub fn update_settings(&self, apply: impl FnOnce(&mut SiteSettings)) -> Result<SiteSettings> {
        let mut settings = self.read_settings()?;
        apply(&mut settings);
        self.write_settings(&settings)?;
        Ok(settings)
    }

    /// Read-modify-write one section. Only `section` is validated, so a
    /// broken section elsewhere in the file does not block this edit.
    pub fn update_section(
        &self,
        section: SettingsSection,
        apply: impl FnOnce(&mut SiteSettings),
    ) -> Result<SiteSettings> {
        let mut settings = self.read_settings()?;
        apply(&mut settings);
        section.validate(&settings)?;
        self.persist_settings(&settings)?;
        Ok(settings)
    }

    fn persist_settings(&self, settings: &SiteSettings) -> Result<()> {
        write_json(&self.config.root, SETTINGS_FILE, settings)?;
        tracing::debug!(path = %self.config.settings_path().display(), "settings written");
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(io_at(path))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomic write: temp file + rename.
fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    fs::create_dir_all(dir).map_err(io_at(dir))?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Json {
        path: path.clone(),
        source,
    })?;
    let tmp = dir.join(format!(".{}.tmp", name));
    fs::write(&tmp, json).map_err(io_at(&tmp))?;
    fs::rename(&tmp, &path).map_err(io_at(&path))
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> CatalogError {
    let path = path.to_path_buf();
    move |source| CatalogError::Io { path, source }
}

//! Catalog file loading
//!
//! Reference catalogs live next to the site configuration as TOML, YAML or
//! JSON. The file extension picks the format.

use crate::catalog::{CatalogFile, ReferenceCatalog};
use crate::error::{ReferenceError, ReferenceResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported catalog file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Toml,
    Yaml,
    Json,
}

impl CatalogFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> ReferenceResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ReferenceError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl std::str::FromStr for CatalogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown catalog format '{}'", other)),
        }
    }
}

/// Parse catalog text in the given format; `origin` labels errors.
pub fn parse_catalog(
    text: &str,
    format: CatalogFormat,
    origin: &Path,
) -> ReferenceResult<ReferenceCatalog> {
    let file: CatalogFile = match format {
        CatalogFormat::Toml => toml::from_str(text).map_err(|source| ReferenceError::Toml {
            path: origin.to_path_buf(),
            source,
        })?,
        CatalogFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|source| ReferenceError::Yaml {
                path: origin.to_path_buf(),
                source,
            })?
        }
        CatalogFormat::Json => {
            serde_json::from_str(text).map_err(|source| ReferenceError::Json {
                path: origin.to_path_buf(),
                source,
            })?
        }
    };
    ReferenceCatalog::from_file(&file)
}

/// Read, parse and validate a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> ReferenceResult<ReferenceCatalog> {
    let path = path.as_ref();
    let format = CatalogFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ReferenceError::FileRead {
        path: PathBuf::from(path),
        source,
    })?;
    let catalog = parse_catalog(&text, format, path)?;
    info!(
        path = %path.display(),
        variants = catalog.variant_names().len(),
        "Loaded reference catalog"
    );
    Ok(catalog)
}

use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::MissingArchivePolicy;
use crate::error::M4dbError;

pub const CONFIG_FILE_NAME: &str = "m4db-analysis.json";
pub const DEFAULT_CATALOG: &str = "m4db_finetemp.sqlite";
pub const DEFAULT_SOURCE_ROOT: &str =
    "/exports/geos.ed.ac.uk/micro_magnetism/MMDatabase/fs_m4db_finetemp/model";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub source_root: Option<String>,
    #[serde(default)]
    pub on_missing_archive: Option<MissingArchivePolicy>,
}

/// Where the catalog lives. Handed to the catalog client at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub path: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalog: CatalogConfig,
    pub source_root: Utf8PathBuf,
    pub on_missing_archive: MissingArchivePolicy,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, M4dbError> {
        let config_path = match path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(M4dbError::MissingConfig(path));
                }
                Some(path)
            }
            None => Self::discover(),
        };

        let config = match config_path {
            Some(config_path) => {
                tracing::debug!(path = %config_path.display(), "reading config");
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| M4dbError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| M4dbError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            catalog: CatalogConfig {
                path: Utf8PathBuf::from(
                    config
                        .catalog
                        .unwrap_or_else(|| DEFAULT_CATALOG.to_string()),
                ),
            },
            source_root: Utf8PathBuf::from(
                config
                    .source_root
                    .unwrap_or_else(|| DEFAULT_SOURCE_ROOT.to_string()),
            ),
            on_missing_archive: config.on_missing_archive.unwrap_or_default(),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("m4db-analysis").join("config.json"))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.catalog.path, DEFAULT_CATALOG);
        assert_eq!(resolved.source_root, DEFAULT_SOURCE_ROOT);
        assert_eq!(resolved.on_missing_archive, MissingArchivePolicy::Abort);
    }
}

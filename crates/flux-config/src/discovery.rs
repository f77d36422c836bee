//! Manifest discovery and loading.
//!
//! The project root is the nearest ancestor directory (inclusive) holding a
//! `flux.yaml`. Values are layered: built-in defaults, then the manifest,
//! then `FLUX_*` environment variables.
//!
//! Environment keys nest on `__`. Each segment names a manifest key, written
//! either in SNAKE_CASE or with the underscores left out:
//! `FLUX_FRONTEND__DEV_CMD` and `FLUX_FRONTEND__DEVCMD` both set
//! `frontend.devCmd`.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};

use crate::config::{MANIFEST_FILE, ProjectConfig};
use crate::error::{ConfigError, Result};
use crate::validation::validate;

/// Walks up from a starting directory looking for `flux.yaml`.
///
/// # Example
///
/// ```no_run
/// use flux_config::discovery::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let (root, config) = discovery.load().unwrap();
/// println!("{} on port {}", root.display(), config.port);
/// ```
pub struct ConfigDiscovery {
    start: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(start: impl AsRef<Path>) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
        }
    }

    /// The nearest directory, starting at `start`, that holds a manifest.
    pub fn find(&self) -> Option<PathBuf> {
        self.start
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILE).is_file())
            .map(Path::to_path_buf)
    }

    /// Find the project root and load its manifest.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no ancestor holds a manifest.
    pub fn load(&self) -> Result<(PathBuf, ProjectConfig)> {
        let root = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.start.clone()))?;
        let config = load_from(&root)?;
        Ok((root, config))
    }
}

/// Nearest ancestor of `start` (inclusive) containing `flux.yaml`.
pub fn find_project_root(start: impl AsRef<Path>) -> Result<PathBuf> {
    let discovery = ConfigDiscovery::new(start);
    discovery
        .find()
        .ok_or_else(|| ConfigError::NotFound(discovery.start))
}

/// Discover the project root from `start` and load its manifest.
pub fn load(start: impl AsRef<Path>) -> Result<(PathBuf, ProjectConfig)> {
    ConfigDiscovery::new(start).load()
}

/// Load and validate the manifest of a known project root.
pub fn load_from(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(ConfigError::NotFound(root.to_path_buf()));
    }

    let config: ProjectConfig = Figment::new()
        .merge(Serialized::defaults(ProjectConfig::default()))
        .merge(Yaml::file(&path))
        .merge(
            Env::prefixed("FLUX_")
                .lowercase(false)
                .split("__")
                .map(|key| manifest_key_path(key.as_str()).into()),
        )
        .extract()
        .map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

    validate(&config)?;
    tracing::debug!(path = %path.display(), port = config.port, "loaded manifest");
    Ok(config)
}

/// Every key `flux.yaml` defines, spelled as in the file.
const MANIFEST_KEYS: &[&str] = &[
    "name",
    "port",
    "frontend",
    "backend",
    "apiClient",
    "dir",
    "devCmd",
    "buildCmd",
    "installCmd",
    "router",
    "extension",
    "sourceRoots",
    "runCmd",
    "specCmd",
    "banner",
];

/// Turn a dotted environment key (`FRONTEND.DEV_CMD`) into a manifest key
/// path (`frontend.devCmd`).
fn manifest_key_path(key: &str) -> String {
    key.split('.')
        .map(manifest_key)
        .collect::<Vec<_>>()
        .join(".")
}

fn manifest_key(segment: &str) -> String {
    let squashed: String = segment
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if let Some(known) = MANIFEST_KEYS
        .iter()
        .find(|k| k.to_ascii_lowercase() == squashed)
    {
        return known.to_string();
    }

    // Unknown keys (inside `apiClient`) become camelCase.
    let mut out = String::with_capacity(segment.len());
    for (i, word) in segment.split('_').filter(|w| !w.is_empty()).enumerate() {
        let word = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.extend(chars);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_without_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn find_prefers_the_nearest_manifest() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("apps/shop");
        fs::create_dir_all(&inner).unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "port: 4000\n").unwrap();
        fs::write(inner.join(MANIFEST_FILE), "port: 5000\n").unwrap();

        assert_eq!(ConfigDiscovery::new(&inner).find().unwrap(), inner);
    }

    #[test]
    fn env_keys_map_onto_camel_case_manifest_keys() {
        assert_eq!(manifest_key_path("PORT"), "port");
        assert_eq!(manifest_key_path("FRONTEND.DEV_CMD"), "frontend.devCmd");
        assert_eq!(manifest_key_path("FRONTEND.DEVCMD"), "frontend.devCmd");
        assert_eq!(manifest_key_path("BACKEND.SOURCE_ROOTS"), "backend.sourceRoots");
        assert_eq!(manifest_key_path("API_CLIENT.OUTPUT_DIR"), "apiClient.outputDir");
    }

    #[test]
    fn load_from_rejects_directory_without_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_from(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }
}

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::BundlerConfig;
use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "bundle-manifest.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    Inline,
    Async,
    Preload,
    Normal,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStrategy::Inline => "inline",
            LoadStrategy::Async => "async",
            LoadStrategy::Preload => "preload",
            LoadStrategy::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// How the browser should fetch a bundle of `size` optimized bytes.
pub fn determine_load_strategy(name: &str, size: usize, config: &BundlerConfig) -> LoadStrategy {
    if name.contains("critical") || name.contains("above-fold") || size < config.inline_threshold {
        LoadStrategy::Inline
    } else if size > config.async_load_threshold {
        LoadStrategy::Async
    } else if name == "vendor" || name.contains("theme") {
        LoadStrategy::Preload
    } else {
        LoadStrategy::Normal
    }
}

/// First 8 hex digits of the MD5 of `css`.
pub fn content_hash(css: &str) -> String {
    let digest = format!("{:x}", md5::compute(css.as_bytes()));
    digest[..8].to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub size: usize,
    pub original_size: usize,
    /// Percentage with a trailing `%`, e.g. `"42.5%"`.
    pub reduction: String,
    pub load_strategy: LoadStrategy,
    pub dependencies: Vec<String>,
    pub hash: String,
}

/// `bundle-manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleManifest {
    /// Local generation time, `%Y-%m-%d %H:%M:%S`.
    pub version: String,
    pub bundles: IndexMap<String, ManifestEntry>,
}

impl BundleManifest {
    pub fn new() -> Self {
        BundleManifest {
            version: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            bundles: IndexMap::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest as `bundle-manifest.json` inside `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, self.to_json()?).map_err(|e| Error::io(&path, e))?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = crate::error::read_input(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Default for BundleManifest {
    fn default() -> Self {
        Self::new()
    }
}

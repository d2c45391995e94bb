//! Configuration for the extractor, the bundler and the purger.
//!
//! Every value here is plain data: components receive their config at
//! construction and never mutate it. Defaults mirror the values the tools
//! shipped with, and a TOML file can override any subset of them:
//!
//! ```toml
//! parser = "regex"
//!
//! [extractor]
//! max_critical_size = 30000
//! fonts_strategy = "inline"
//!
//! [bundler]
//! bundle_strategy = "smart"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::style::{LightningRuleParser, RegexRuleParser, RuleParser};

/// Which CSS parser backs the components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParserBackend {
    /// Pattern-based mini parser. Lenient, never fails.
    #[default]
    Regex,
    /// lightningcss, falling back to the regex parser on error.
    Lightning,
}

impl ParserBackend {
    pub fn build(self) -> Box<dyn RuleParser> {
        match self {
            ParserBackend::Regex => Box::new(RegexRuleParser),
            ParserBackend::Lightning => Box::new(LightningRuleParser),
        }
    }
}

impl FromStr for ParserBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "regex" => Ok(ParserBackend::Regex),
            "lightning" | "lightningcss" => Ok(ParserBackend::Lightning),
            other => Err(Error::Config(format!("unknown parser backend `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1366,
            height: 768,
        }
    }
}

impl FromStr for Viewport {
    type Err = Error;

    /// Parses `WIDTHxHEIGHT`, e.g. `1366x768`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid viewport `{s}`, expected WIDTHxHEIGHT"));
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Viewport {
            width: w.trim().parse().map_err(|_| invalid())?,
            height: h.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// How web fonts referenced by critical CSS are delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FontStrategy {
    #[default]
    Preload,
    Inline,
    Swap,
}

impl FromStr for FontStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "preload" => Ok(FontStrategy::Preload),
            "inline" => Ok(FontStrategy::Inline),
            "swap" => Ok(FontStrategy::Swap),
            other => Err(Error::Config(format!("unknown font strategy `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub viewport: Viewport,
    pub include_selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
    /// Upper bound, in bytes, for the minified critical CSS.
    pub max_critical_size: usize,
    pub fonts_strategy: FontStrategy,
    pub extract_media_queries: bool,
    /// Where the deferred stylesheet is served from, used by the HTML and JS snippets.
    pub stylesheet_href: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            viewport: Viewport::default(),
            include_selectors: strings(&[
                "body",
                "html",
                ":root",
                "header",
                "nav",
                ".hero",
                ".above-fold",
                "[data-critical]",
            ]),
            exclude_selectors: strings(&[".lazy-load", "[data-lazy]", ".below-fold", ".footer"]),
            max_critical_size: 50_000,
            fonts_strategy: FontStrategy::Preload,
            extract_media_queries: true,
            stylesheet_href: "/css/main.css".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BundleStrategy {
    #[default]
    Route,
    Component,
    Global,
    Smart,
}

impl FromStr for BundleStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "route" => Ok(BundleStrategy::Route),
            "component" => Ok(BundleStrategy::Component),
            "global" => Ok(BundleStrategy::Global),
            "smart" => Ok(BundleStrategy::Smart),
            other => Err(Error::Config(format!("unknown bundle strategy `{other}`"))),
        }
    }
}

impl fmt::Display for BundleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BundleStrategy::Route => "route",
            BundleStrategy::Component => "component",
            BundleStrategy::Global => "global",
            BundleStrategy::Smart => "smart",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OptimizationFlags {
    pub merge_media_queries: bool,
    pub combine_selectors: bool,
    pub remove_duplicates: bool,
    pub optimize_fonts: bool,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        OptimizationFlags {
            merge_media_queries: true,
            combine_selectors: true,
            remove_duplicates: true,
            optimize_fonts: true,
        }
    }
}

impl OptimizationFlags {
    pub fn none() -> Self {
        OptimizationFlags {
            merge_media_queries: false,
            combine_selectors: false,
            remove_duplicates: false,
            optimize_fonts: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    pub bundle_strategy: BundleStrategy,
    pub max_bundle_size: usize,
    /// Bundles smaller than this are inlined.
    pub inline_threshold: usize,
    /// Bundles larger than this are loaded asynchronously.
    pub async_load_threshold: usize,
    /// Category name to basename fragments; the first matching category wins.
    pub bundle_splitting: IndexMap<String, Vec<String>>,
    pub optimization: OptimizationFlags,
    /// Write `.gz` and `.br` companions next to each bundle.
    pub compress: bool,
    /// URL prefix of the bundle directory, used by the loader HTML.
    pub public_path: String,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        let mut bundle_splitting = IndexMap::new();
        bundle_splitting.insert(
            "critical".to_string(),
            strings(&["reset", "typography", "layout", "above-fold"]),
        );
        bundle_splitting.insert(
            "vendor".to_string(),
            strings(&["bootstrap", "animate", "fontawesome"]),
        );
        bundle_splitting.insert(
            "components".to_string(),
            strings(&["buttons", "forms", "cards", "modals"]),
        );
        bundle_splitting.insert(
            "themes".to_string(),
            strings(&["light", "dark", "high-contrast"]),
        );

        BundlerConfig {
            bundle_strategy: BundleStrategy::Route,
            max_bundle_size: 100_000,
            inline_threshold: 2_000,
            async_load_threshold: 50_000,
            bundle_splitting,
            optimization: OptimizationFlags::default(),
            compress: true,
            public_path: "/css/bundles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    pub content_extensions: Vec<String>,
    /// Selectors always kept. Entries wrapped in `/.../` are regular expressions.
    pub safelist: Vec<String>,
    /// Selectors always dropped. Same syntax as `safelist`.
    pub blocklist: Vec<String>,
    pub keyframes: bool,
    pub font_face: bool,
    pub variables: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        PurgeConfig {
            content_extensions: strings(&["html", "php", "js", "jsx", "ts", "tsx", "vue"]),
            safelist: strings(&[
                "html",
                "body",
                ":root",
                "/^::-/",
                r"/^\[data-/",
                "/^aria-/",
                "is-active",
                "is-open",
                "is-visible",
                "error",
                "success",
                "warning",
            ]),
            blocklist: strings(&[r"/\.todo-/", r"/\.deprecated-/"]),
            keyframes: true,
            font_face: true,
            variables: true,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub parser: ParserBackend,
    pub extractor: ExtractorConfig,
    pub bundler: BundlerConfig,
    pub purge: PurgeConfig,
}

impl Config {
    /// Load a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = crate::error::read_input(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bundler.max_bundle_size == 0 {
            return Err(Error::Config("bundler.max_bundle_size must be positive".into()));
        }
        if self.extractor.viewport.width == 0 || self.extractor.viewport.height == 0 {
            return Err(Error::Config("extractor.viewport must be non-empty".into()));
        }
        for pattern in self.purge.safelist.iter().chain(&self.purge.blocklist) {
            if let Some(body) = regex_body(pattern) {
                Regex::new(body)
                    .map_err(|e| Error::Config(format!("bad pattern `{pattern}`: {e}")))?;
            }
        }
        Ok(())
    }
}

/// Returns the inner expression of a `/.../` list entry.
pub(crate) fn regex_body(entry: &str) -> Option<&str> {
    entry
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
        .filter(|body| !body.is_empty())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

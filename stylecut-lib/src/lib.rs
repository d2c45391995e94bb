//! Critical CSS extraction, CSS bundling and unused CSS removal.
//!
//! The three entry points are [`CriticalCssExtractor`], [`StyleBundler`]
//! and [`UnusedCssPurger`]. Each takes an immutable config value and a
//! [`MetricsSink`], and reports one metric per top-level call.

pub mod bundle;
pub mod config;
pub mod critical;
pub mod dom;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod purge;
pub mod style;

pub use bundle::{Bundle, BundleManifest, BundleReport, LoadStrategy, StyleBundler};
pub use config::{
    BundleStrategy, BundlerConfig, Config, ExtractorConfig, FontStrategy, OptimizationFlags, ParserBackend,
    PurgeConfig, Viewport,
};
pub use critical::{CriticalCssExtractor, CriticalSelectorSet, ExtractionMetrics, ExtractionResult};
pub use error::{Error, ParseWarning, Result, WarningKind};
pub use metrics::{LogMetrics, MemoryMetrics, MetricsSink, NoopMetrics};
pub use purge::{PurgeReport, PurgeResult, PurgeStats, UnusedCssPurger, UsedSelectors};
pub use style::{RuleParser, Stylesheet};

//! Removes CSS rules that no content file references.

pub mod content;
pub mod remover;
pub mod report;

pub use content::UsedSelectors;
pub use remover::{PurgeResult, SelectorPatterns, UnusedCssPurger};
pub use report::{format_bytes, PurgeReport, PurgeStats};

pub const REPORT_FILE: &str = "purgecss-report.json";

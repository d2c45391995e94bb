use serde::Serialize;

use crate::error::Result;
use crate::metrics::round2;
use crate::purge::content::UsedSelectors;

/// Figures of one purge run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurgeStats {
    pub original_size: usize,
    pub purged_size: usize,
    pub removed_size: usize,
    pub reduction_percentage: f64,
    pub selectors_found: usize,
    pub processing_time: f64,
    pub kept_rules: usize,
    pub removed_rules: usize,
}

impl PurgeStats {
    pub fn total_rules(&self) -> usize {
        self.kept_rules + self.removed_rules
    }
}

/// Human-readable summary written as `purgecss-report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurgeReport {
    pub summary: Summary,
    pub details: Details,
    pub selectors: SelectorCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub original_size: String,
    pub purged_size: String,
    pub removed_size: String,
    pub reduction: String,
    pub processing_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Details {
    pub total_rules: usize,
    pub kept_rules: usize,
    pub removed_rules: usize,
    pub selectors_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorCounts {
    pub classes: usize,
    pub ids: usize,
    pub tags: usize,
    pub attributes: usize,
}

impl PurgeReport {
    pub fn new(stats: &PurgeStats, used: &UsedSelectors) -> Self {
        PurgeReport {
            summary: Summary {
                original_size: format_bytes(stats.original_size),
                purged_size: format_bytes(stats.purged_size),
                removed_size: format_bytes(stats.removed_size),
                reduction: format!("{}%", stats.reduction_percentage),
                processing_time: format!("{}s", round2(stats.processing_time)),
            },
            details: Details {
                total_rules: stats.total_rules(),
                kept_rules: stats.kept_rules,
                removed_rules: stats.removed_rules,
                selectors_found: stats.selectors_found,
            },
            selectors: SelectorCounts {
                classes: used.classes.len(),
                ids: used.ids.len(),
                tags: used.tags.len(),
                attributes: used.attributes.len(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `1536` -> `1.5 KB`. Stops at megabytes.
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", round2(value), UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3072 MB");
    }

    #[test]
    fn test_report_shape() {
        let stats = PurgeStats {
            original_size: 2048,
            purged_size: 512,
            removed_size: 1536,
            reduction_percentage: 75.0,
            selectors_found: 4,
            processing_time: 0.123,
            kept_rules: 2,
            removed_rules: 6,
        };
        let mut used = UsedSelectors::default();
        used.classes.insert("a".into());
        let report = PurgeReport::new(&stats, &used);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["summary"]["original_size"], "2 KB");
        assert_eq!(value["summary"]["reduction"], "75%");
        assert_eq!(value["summary"]["processing_time"], "0.12s");
        assert_eq!(value["details"]["total_rules"], 8);
        assert_eq!(value["selectors"]["classes"], 1);
    }
}

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{ExtractorConfig, FontStrategy, Viewport};
use crate::critical::loader;
use crate::critical::selectors::CriticalSelectorSet;
use crate::error::{read_input, ParseWarning, Result};
use crate::metrics::{round2, MetricsSink};
use crate::parser::html::create_dom_tree;
use crate::style::minify::collapse_whitespace;
use crate::style::stylesheet::{font_face_family, CssItem, MediaBlock, StyleRule};
use crate::style::{RegexRuleParser, RuleParser};

/// A rule with at least this score and a visual property is critical on its own.
const HIGH_SPECIFICITY: u32 = 20;

const CRITICAL_PROPERTIES: &[&str] = &["font-family", "font-size", "line-height", "color", "background"];

/// Kept first when trimming. Earlier entries weigh more.
const PRIORITY_SELECTORS: &[&str] = &["body", "html", ":root", "header", "nav"];

static MEDIA_FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(min|max)-(width|height)\s*:\s*(\d+)px").expect("media feature pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionMetrics {
    pub critical_size_bytes: usize,
    pub remaining_size_bytes: usize,
    pub elapsed_seconds: f64,
    pub selectors_considered: usize,
    /// Critical size as a percentage of the input stylesheet, two decimals.
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Minified, at most `max_critical_size` bytes.
    pub critical_css: String,
    pub remaining_css: String,
    pub metrics: ExtractionMetrics,
    pub warnings: Vec<ParseWarning>,
}

/// One independently removable piece of critical output.
#[derive(Debug, Clone)]
struct Unit {
    /// Selector for plain rules, the full text for everything else.
    key: UnitKey,
    /// Text the priority list is matched against.
    selector: String,
    score: u32,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UnitKey {
    Selector(String),
    Text(String),
}

impl Unit {
    fn rule(rule: &StyleRule) -> Self {
        Unit {
            key: UnitKey::Selector(rule.selector.clone()),
            selector: rule.selector.clone(),
            score: rule.specificity.score(),
            text: rule.raw.clone(),
        }
    }

    fn at_rule(text: String) -> Self {
        Unit {
            key: UnitKey::Text(text.clone()),
            selector: text.split('{').next().unwrap_or("").trim().to_string(),
            score: 0,
            text,
        }
    }
}

/// Splits a stylesheet into critical and deferred parts for one page.
pub struct CriticalCssExtractor {
    config: ExtractorConfig,
    parser: Box<dyn RuleParser>,
    metrics: Arc<dyn MetricsSink>,
}

impl CriticalCssExtractor {
    pub fn new(config: ExtractorConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        CriticalCssExtractor {
            config,
            parser: Box::new(RegexRuleParser),
            metrics,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn RuleParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Check both inputs exist, then run [`Self::extract`].
    pub fn extract_files(&self, html_path: &Path, css_path: &Path) -> Result<ExtractionResult> {
        crate::error::ensure_exists(html_path)?;
        crate::error::ensure_exists(css_path)?;
        let html = read_input(html_path)?;
        let css = read_input(css_path)?;
        log::info!(
            "extracting critical css from {} for {}",
            css_path.display(),
            html_path.display()
        );
        Ok(self.extract(&html, &css))
    }

    pub fn extract(&self, html: &str, css: &str) -> ExtractionResult {
        let started = Instant::now();

        let document = create_dom_tree(html);
        let selectors = CriticalSelectorSet::from_document(&document, &self.config);
        let sheet = self.parser.parse(css);

        let mut head = Vec::new();
        let mut font_faces = Vec::new();
        let mut body = Vec::new();
        let mut remaining = Vec::new();

        for item in &sheet.items {
            match item {
                CssItem::Charset(raw) | CssItem::Import { raw, .. } => {
                    head.push(Unit::at_rule(raw.clone()))
                }
                CssItem::FontFace(raw) => font_faces.push(raw.clone()),
                CssItem::Keyframes(k) => remaining.push(k.raw.clone()),
                CssItem::Raw(raw) => remaining.push(raw.clone()),
                CssItem::Rule(rule) if !rule.is_at_rule() && self.is_critical(rule, &selectors) => {
                    body.push(Unit::rule(rule))
                }
                CssItem::Rule(rule) => remaining.push(rule.raw.clone()),
                CssItem::Media(media) => self.split_media(media, &selectors, &mut body, &mut remaining),
            }
        }

        let font_units = self.order_font_faces(font_faces, &body);
        let units: Vec<Unit> = head.into_iter().chain(font_units).chain(body).collect();
        let units = dedupe_last_wins(units);

        let critical_css = self.bound_size(units);
        let remaining_css = remaining.join("\n");

        let metrics = ExtractionMetrics {
            critical_size_bytes: critical_css.len(),
            remaining_size_bytes: remaining_css.len(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
            selectors_considered: selectors.len(),
            compression_ratio: if css.is_empty() {
                0.0
            } else {
                round2(critical_css.len() as f64 / css.len() as f64 * 100.0)
            },
        };
        self.record(&metrics);
        log::info!(
            "critical css: {} bytes, remaining: {} bytes ({}% of input)",
            metrics.critical_size_bytes,
            metrics.remaining_size_bytes,
            metrics.compression_ratio
        );

        let mut warnings = sheet.warnings;
        warnings.extend(document.warnings);
        ExtractionResult {
            critical_css,
            remaining_css,
            metrics,
            warnings,
        }
    }

    pub fn inline_html(&self, critical_css: &str) -> String {
        loader::inline_html(critical_css, &self.config)
    }

    pub fn loader_script(&self) -> String {
        loader::loader_script(&self.config)
    }

    fn is_critical(&self, rule: &StyleRule, selectors: &CriticalSelectorSet) -> bool {
        if selectors.matches(&rule.selector) {
            return true;
        }
        rule.specificity.score() >= HIGH_SPECIFICITY
            && CRITICAL_PROPERTIES.iter().any(|p| rule.declarations.contains(p))
    }

    /// Critical inner rules of a relevant block go to critical output under
    /// the same header; everything else, nested at-rules included, is deferred.
    fn split_media(
        &self,
        media: &MediaBlock,
        selectors: &CriticalSelectorSet,
        critical: &mut Vec<Unit>,
        remaining: &mut Vec<String>,
    ) {
        if !self.config.extract_media_queries || !media_matches_viewport(&media.condition, self.config.viewport) {
            remaining.push(media.raw.clone());
            return;
        }
        let (hits, misses): (Vec<&StyleRule>, Vec<&StyleRule>) = media
            .rules
            .iter()
            .partition(|rule| self.is_critical(rule, selectors));
        if !hits.is_empty() {
            critical.push(Unit::at_rule(media.rewrap(hits)));
        }
        if !misses.is_empty() || !media.nested.is_empty() {
            remaining.push(media.rewrap_with_nested(misses));
        }
    }

    /// Every `@font-face` is critical. With the inline strategy, faces whose
    /// family the critical rules use come first.
    fn order_font_faces(&self, faces: Vec<String>, body: &[Unit]) -> Vec<Unit> {
        if self.config.fonts_strategy != FontStrategy::Inline {
            return faces.into_iter().map(Unit::at_rule).collect();
        }
        let critical_text: String = body.iter().map(|u| u.text.as_str()).collect();
        let (used, unused): (Vec<String>, Vec<String>) = faces.into_iter().partition(|face| {
            font_face_family(face).is_some_and(|family| critical_text.contains(&family))
        });
        used.into_iter().chain(unused).map(Unit::at_rule).collect()
    }

    fn bound_size(&self, units: Vec<Unit>) -> String {
        let minified: Vec<(Unit, String)> = units
            .into_iter()
            .map(|unit| {
                let text = collapse_whitespace(&unit.text);
                (unit, text)
            })
            .collect();
        let total: usize = minified.iter().map(|(_, text)| text.len()).sum();
        let cap = self.config.max_critical_size;
        if total <= cap {
            return minified.into_iter().map(|(_, text)| text).collect();
        }

        log::warn!("critical css is {total} bytes, trimming to {cap}");
        let mut ranked: Vec<usize> = (0..minified.len()).collect();
        ranked.sort_by(|&a, &b| {
            let (ua, ub) = (&minified[a].0, &minified[b].0);
            priority(&ub.selector)
                .cmp(&priority(&ua.selector))
                .then(ub.score.cmp(&ua.score))
                .then(a.cmp(&b))
        });

        let mut accepted = vec![false; minified.len()];
        let mut size = 0;
        for idx in ranked {
            let len = minified[idx].1.len();
            if size + len > cap {
                break;
            }
            size += len;
            accepted[idx] = true;
        }
        minified
            .into_iter()
            .zip(accepted)
            .filter_map(|((_, text), keep)| keep.then_some(text))
            .collect()
    }

    fn record(&self, metrics: &ExtractionMetrics) {
        let data = match serde_json::to_value(metrics) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        self.metrics.record_metric("critical_css_extraction", &data);
    }
}

/// The viewport must satisfy every `min-*`/`max-*` pixel condition.
/// Conditions in other units are ignored.
pub fn media_matches_viewport(condition: &str, viewport: Viewport) -> bool {
    MEDIA_FEATURE_RE.captures_iter(condition).all(|caps| {
        let Ok(value) = caps[3].parse::<u32>() else {
            return true;
        };
        let actual = if &caps[2] == "width" {
            viewport.width
        } else {
            viewport.height
        };
        match &caps[1] {
            "min" => actual >= value,
            _ => actual <= value,
        }
    })
}

/// Weight of the last priority entry contained in `selector`, 0 if none.
/// `html body` weighs as `html`.
fn priority(selector: &str) -> usize {
    PRIORITY_SELECTORS
        .iter()
        .rposition(|p| selector.contains(p))
        .map_or(0, |idx| PRIORITY_SELECTORS.len() - idx)
}

/// Keep the last unit per key, in original relative order.
fn dedupe_last_wins(units: Vec<Unit>) -> Vec<Unit> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Unit> = units
        .into_iter()
        .rev()
        .filter(|unit| seen.insert(unit.key.clone()))
        .collect();
    kept.reverse();
    kept
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use serde_json::{Map, Value};

use crate::bundle::optimize::{remove_duplicates, serialize};
use crate::config::{regex_body, PurgeConfig};
use crate::error::{read_input, Error, Result};
use crate::metrics::{round2, MetricsSink};
use crate::purge::content::UsedSelectors;
use crate::purge::report::{PurgeReport, PurgeStats};
use crate::style::minify::minify;
use crate::style::stylesheet::{font_face_family, CssItem, MediaBlock, StyleRule};
use crate::style::{RegexRuleParser, RuleParser};

static PSEUDO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::?[a-z-]+(?:\([^)]*\))?").expect("pseudo pattern is valid"));
static PSEUDO_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::?[a-z-]+.*$").expect("pseudo tail pattern is valid"));
static CLASS_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([a-zA-Z0-9_-]+)").expect("class token pattern is valid"));
static ID_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([a-zA-Z0-9_-]+)").expect("id token pattern is valid"));
static ATTR_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([a-zA-Z0-9_-]+)").expect("attribute token pattern is valid"));
static TAG_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9-]*)").expect("tag token pattern is valid"));

/// A safelist or blocklist: plain strings and `/regex/` entries.
#[derive(Debug, Clone, Default)]
pub struct SelectorPatterns {
    exact: Vec<String>,
    regexes: Vec<Regex>,
}

impl SelectorPatterns {
    pub fn compile(entries: &[String]) -> Result<Self> {
        let mut patterns = SelectorPatterns::default();
        for entry in entries {
            match regex_body(entry) {
                Some(body) => patterns.regexes.push(
                    Regex::new(body).map_err(|e| Error::Config(format!("bad pattern `{entry}`: {e}")))?,
                ),
                None => patterns.exact.push(entry.clone()),
            }
        }
        Ok(patterns)
    }

    fn is_match_regex(&self, selector: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(selector))
    }
}

/// What one selector part mentions.
#[derive(Debug, Default)]
struct Tokens {
    classes: Vec<String>,
    ids: Vec<String>,
    attributes: Vec<String>,
    tag: Option<String>,
}

impl Tokens {
    /// Pseudo-classes and pseudo-elements are ignored. The leading tag is
    /// only considered when nothing else identifies the selector.
    fn of(selector: &str) -> Self {
        let clean = PSEUDO_RE.replace_all(selector, "");
        let capture_all = |re: &Regex| -> Vec<String> {
            re.captures_iter(&clean).map(|caps| caps[1].to_string()).collect()
        };
        let mut tokens = Tokens {
            classes: capture_all(&*CLASS_TOKEN_RE),
            ids: capture_all(&*ID_TOKEN_RE),
            attributes: capture_all(&*ATTR_TOKEN_RE),
            tag: None,
        };
        if tokens.is_empty() {
            tokens.tag = TAG_TOKEN_RE
                .captures(clean.trim())
                .map(|caps| caps[1].to_ascii_lowercase());
        }
        tokens
    }

    fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.ids.is_empty() && self.attributes.is_empty()
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.classes
            .iter()
            .chain(&self.ids)
            .chain(&self.attributes)
            .chain(&self.tag)
            .map(String::as_str)
    }
}

/// Output of [`UnusedCssPurger::purge`].
#[derive(Debug, Clone)]
pub struct PurgeResult {
    pub css: String,
    pub stats: PurgeStats,
    pub report: PurgeReport,
}

/// Drops rules whose selectors no content file references.
pub struct UnusedCssPurger {
    config: PurgeConfig,
    safelist: SelectorPatterns,
    blocklist: SelectorPatterns,
    parser: Box<dyn RuleParser>,
    metrics: Arc<dyn MetricsSink>,
}

impl UnusedCssPurger {
    pub fn new(config: PurgeConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        Ok(UnusedCssPurger {
            safelist: SelectorPatterns::compile(&config.safelist)?,
            blocklist: SelectorPatterns::compile(&config.blocklist)?,
            config,
            parser: Box::new(RegexRuleParser),
            metrics,
        })
    }

    pub fn with_parser(mut self, parser: Box<dyn RuleParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn scan_content(&self, content_paths: &[PathBuf]) -> Result<UsedSelectors> {
        UsedSelectors::scan_paths(content_paths, &self.config.content_extensions)
    }

    /// Purge `css_path` against `content_paths` and write the result to
    /// `output_path`, by default `<name>.purged.css` next to the input.
    pub fn purge_file(
        &self,
        css_path: &Path,
        content_paths: &[PathBuf],
        output_path: Option<&Path>,
    ) -> Result<PurgeResult> {
        let css = read_input(css_path)?;
        let used = self.scan_content(content_paths)?;
        let result = self.purge(&css, &used);

        let output = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| css_path.with_extension("purged.css"));
        fs::write(&output, &result.css).map_err(|e| Error::io(&output, e))?;
        log::info!(
            "wrote {} ({} of {} rules kept)",
            output.display(),
            result.stats.kept_rules,
            result.stats.total_rules()
        );
        Ok(result)
    }

    pub fn purge(&self, css: &str, used: &UsedSelectors) -> PurgeResult {
        let started = Instant::now();
        let sheet = self.parser.parse(css);
        for warning in &sheet.warnings {
            log::warn!("{warning}");
        }

        // Kept rules may reference keyframes and fonts the content never names.
        let mut references = used.clone();
        let mut kept_rules = 0;
        let mut removed_rules = 0;
        let mut keep = |rule: &StyleRule, references: &mut UsedSelectors| {
            if self.keep_rule(rule, used) {
                references.scan_animations_and_fonts(&rule.declarations);
                kept_rules += 1;
                true
            } else {
                log::debug!("dropping unused rule `{}`", rule.selector);
                removed_rules += 1;
                false
            }
        };

        let mut items = Vec::with_capacity(sheet.items.len());
        for item in sheet.items {
            match item {
                CssItem::Rule(rule) => {
                    if keep(&rule, &mut references) {
                        items.push(CssItem::Rule(rule));
                    }
                }
                CssItem::Media(media) => {
                    let rules: Vec<StyleRule> = media
                        .rules
                        .into_iter()
                        .filter(|rule| keep(rule, &mut references))
                        .collect();
                    if !rules.is_empty() || !media.nested.is_empty() {
                        items.push(CssItem::Media(MediaBlock::new(media.condition, media.nested, rules)));
                    }
                }
                other => items.push(other),
            }
        }

        items.retain(|item| match item {
            CssItem::FontFace(raw) => {
                !self.config.font_face
                    || font_face_family(raw).is_some_and(|family| references.fonts.contains(&family))
            }
            CssItem::Keyframes(keyframes) => {
                !self.config.keyframes || references.keyframes.contains(&keyframes.name)
            }
            _ => true,
        });

        let purged = minify(&serialize(&remove_duplicates(items)));
        let original_size = css.len();
        let stats = PurgeStats {
            original_size,
            purged_size: purged.len(),
            removed_size: original_size.saturating_sub(purged.len()),
            reduction_percentage: if original_size == 0 {
                0.0
            } else {
                round2((1.0 - purged.len() as f64 / original_size as f64) * 100.0)
            },
            selectors_found: used.total(),
            processing_time: started.elapsed().as_secs_f64(),
            kept_rules,
            removed_rules,
        };
        self.record(&stats);

        PurgeResult {
            report: PurgeReport::new(&stats, used),
            css: purged,
            stats,
        }
    }

    fn keep_rule(&self, rule: &StyleRule, used: &UsedSelectors) -> bool {
        if rule.is_at_rule() {
            return true;
        }
        if self.config.variables && rule.selector_parts().any(|part| part == ":root") {
            return true;
        }
        if self.is_blocked(&rule.selector) {
            return false;
        }
        rule.selector_parts().any(|part| self.is_selector_used(part, used))
    }

    fn is_blocked(&self, selector: &str) -> bool {
        self.blocklist.is_match_regex(selector)
            || self.blocklist.exact.iter().any(|blocked| selector.contains(blocked.as_str()))
    }

    fn is_selector_used(&self, selector: &str, used: &UsedSelectors) -> bool {
        if self.safelist.is_match_regex(selector) {
            return true;
        }

        let tokens = Tokens::of(selector);
        let safelisted = self
            .safelist
            .exact
            .iter()
            .any(|safe| safe == selector || tokens.names().any(|name| name == safe));
        if safelisted {
            return true;
        }

        let referenced = tokens.classes.iter().any(|c| used.classes.contains(c))
            || tokens.ids.iter().any(|id| used.ids.contains(id))
            || tokens.attributes.iter().any(|a| used.attributes.contains(a))
            || tokens.tag.as_ref().is_some_and(|t| used.tags.contains(t));
        if referenced {
            return true;
        }
        if tokens.is_empty() && tokens.tag.is_none() && selector.trim_start().starts_with('*') {
            return true;
        }

        // `.btn:hover` is used whenever `.btn` is.
        if PSEUDO_RE.is_match(selector) {
            let base = PSEUDO_TAIL_RE.replace(selector, "");
            let base = base.trim();
            if !base.is_empty() && base != selector && self.is_selector_used(base, used) {
                return true;
            }
        }
        false
    }

    fn record(&self, stats: &PurgeStats) {
        let data = match serde_json::to_value(stats) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        self.metrics.record_metric("css_purge", &data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MemoryMetrics;
    use pretty_assertions::assert_eq;

    fn purger(config: PurgeConfig) -> UnusedCssPurger {
        UnusedCssPurger::new(config, Arc::new(MemoryMetrics::new())).unwrap()
    }

    fn used_by(html: &str) -> UsedSelectors {
        let mut used = UsedSelectors::default();
        used.scan(html, "html");
        used
    }

    #[test]
    fn test_unused_class_is_dropped() {
        let used = used_by(r#"<div class="card"><p>x</p></div>"#);
        let result = purger(PurgeConfig::default()).purge(
            ".card { padding: 1rem } .modal { display: none } p { margin: 0 } .card:hover { color: red }",
            &used,
        );
        assert_eq!(result.css, ".card{padding:1rem}p{margin:0}.card:hover{color:red}");
        assert_eq!(result.stats.kept_rules, 3);
        assert_eq!(result.stats.removed_rules, 1);
    }

    #[test]
    fn test_safelist_and_blocklist() {
        let used = used_by(r#"<div class="todo-item"></div>"#);
        let css = ".is-active{a:b} .error-box{a:b} .todo-item{a:b} ::-webkit-scrollbar{a:b} body{a:b}";
        let result = purger(PurgeConfig::default()).purge(css, &used);
        assert_eq!(result.css, ".is-active{a:b}::-webkit-scrollbar{a:b}body{a:b}");
    }

    #[test]
    fn test_keyframes_follow_kept_rules() {
        let used = used_by(r#"<i class="spinner"></i>"#);
        let css = "@keyframes spin { to { transform: rotate(360deg) } } \
                   @keyframes fade { to { opacity: 0 } } \
                   .spinner { animation: spin 1s linear infinite }";
        let result = purger(PurgeConfig::default()).purge(css, &used);
        assert!(result.css.contains("@keyframes spin"));
        assert!(!result.css.contains("fade"));
    }

    #[test]
    fn test_font_faces_and_variables() {
        let used = used_by(r#"<p class="lead"></p>"#);
        let css = "@font-face { font-family: 'Inter'; src: url(inter.woff2) } \
                   @font-face { font-family: Mono; src: url(mono.woff2) } \
                   :root { --gap: 4px } \
                   .lead { font-family: Inter, sans-serif }";
        let result = purger(PurgeConfig::default()).purge(css, &used);
        assert!(result.css.contains("Inter"));
        assert!(!result.css.contains("mono.woff2"));
        assert!(result.css.contains(":root{--gap:4px}"));
    }

    #[test]
    fn test_empty_media_blocks_are_dropped() {
        let used = used_by(r#"<div class="a"></div>"#);
        let css = "@media (max-width: 600px) { .a { x: 1 } .b { x: 2 } } @media print { .b { x: 3 } }";
        let result = purger(PurgeConfig::default()).purge(css, &used);
        assert_eq!(result.css, "@media (max-width:600px){.a{x:1}}");
    }

    #[test]
    fn test_unclassified_constructs_are_kept() {
        let used = used_by(r#"<div class="a"></div>"#);
        let css = "@layer base, theme; @media print { @page { margin: 1cm } .b { x: 3 } } .a { x: 1 }";
        let result = purger(PurgeConfig::default()).purge(css, &used);
        assert!(result.css.starts_with("@layer base,theme;"), "{}", result.css);
        assert!(result.css.contains("@media print{@page{margin:1cm}}"));
        assert!(!result.css.contains(".b"));
        assert!(result.css.ends_with(".a{x:1}"));
    }

    #[test]
    fn test_metric_and_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let css_path = dir.path().join("main.css");
        let page = dir.path().join("index.html");
        fs::write(&css_path, ".used{a:b} .unused{a:b}").unwrap();
        fs::write(&page, r#"<b class="used"></b>"#).unwrap();

        let metrics = Arc::new(MemoryMetrics::new());
        let purger = UnusedCssPurger::new(PurgeConfig::default(), metrics.clone()).unwrap();
        let result = purger.purge_file(&css_path, &[page], None).unwrap();

        let written = fs::read_to_string(dir.path().join("main.purged.css")).unwrap();
        assert_eq!(written, ".used{a:b}");
        assert_eq!(result.stats.original_size, 23);
        assert_eq!(metrics.records()[0].0, "css_purge");
    }

    #[test]
    fn test_bad_pattern_is_a_config_error() {
        let config = PurgeConfig {
            blocklist: vec!["/(/".into()],
            ..PurgeConfig::default()
        };
        let err = UnusedCssPurger::new(config, Arc::new(MemoryMetrics::new())).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}

use std::fmt;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::error::ParseWarning;
use crate::style::specificity::Specificity;

static FONT_FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"font-family\s*:\s*["']?([^"';}]+)"#).expect("font-family pattern is valid")
});

/// One `selector { declarations }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: String,
    pub specificity: Specificity,
    /// The block exactly as it appeared in the input, comments removed.
    pub raw: String,
    /// Position among all rules of the sheet, media-nested ones included.
    pub source_order: u32,
}

impl StyleRule {
    pub fn new(
        selector: impl Into<String>,
        declarations: impl Into<String>,
        raw: impl Into<String>,
        source_order: u32,
    ) -> Self {
        let selector = selector.into().trim().to_string();
        StyleRule {
            specificity: Specificity::of_selector(&selector),
            selector,
            declarations: declarations.into().trim().to_string(),
            raw: raw.into().trim().to_string(),
            source_order,
        }
    }

    /// `@page`, `@font-face` and other at-rules that parsed as plain blocks.
    pub fn is_at_rule(&self) -> bool {
        self.selector.starts_with('@')
    }

    /// The comma-separated parts of the selector list, trimmed.
    pub fn selector_parts(&self) -> impl Iterator<Item = &str> {
        self.selector
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.selector, self.declarations)
    }
}

/// An `@media` block with one level of nested rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlock {
    /// Prelude after `@media`, trimmed, e.g. `(max-width: 600px)`.
    pub condition: String,
    pub rules: Vec<StyleRule>,
    /// Nested constructs that are not plain rules (`@font-face`,
    /// `@supports`, ...), verbatim. They serialize ahead of `rules`.
    pub nested: Vec<String>,
    pub raw: String,
}

impl MediaBlock {
    pub fn new(condition: impl Into<String>, nested: Vec<String>, rules: Vec<StyleRule>) -> Self {
        let condition = condition.into();
        let raw = wrap_media(
            &condition,
            nested.iter().map(String::as_str).chain(rules.iter().map(|r| r.raw.as_str())),
        );
        MediaBlock {
            condition,
            rules,
            nested,
            raw,
        }
    }

    /// Serialize only `rules` under this block's header.
    pub fn rewrap<'a>(&self, rules: impl IntoIterator<Item = &'a StyleRule>) -> String {
        wrap_media(&self.condition, rules.into_iter().map(|r| r.raw.as_str()))
    }

    /// Serialize the nested constructs and `rules` under this block's header.
    pub fn rewrap_with_nested<'a>(&self, rules: impl IntoIterator<Item = &'a StyleRule>) -> String {
        wrap_media(
            &self.condition,
            self.nested
                .iter()
                .map(String::as_str)
                .chain(rules.into_iter().map(|r| r.raw.as_str())),
        )
    }
}

/// `@media <condition>{<body>...}`.
pub fn wrap_media<'a>(condition: &str, bodies: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = format!("@media {}{{", condition);
    for body in bodies {
        out.push_str(body);
    }
    out.push('}');
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyframes {
    pub name: String,
    pub raw: String,
}

/// A top-level construct, in the order it appeared in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssItem {
    Charset(String),
    Import { url: String, raw: String },
    FontFace(String),
    Keyframes(Keyframes),
    Media(MediaBlock),
    Rule(StyleRule),
    /// Text no other variant describes (`@layer a, b;`, `@supports`
    /// blocks, stray braces). Passed through verbatim.
    Raw(String),
}

impl CssItem {
    pub fn raw(&self) -> &str {
        match self {
            CssItem::Charset(raw) | CssItem::FontFace(raw) | CssItem::Raw(raw) => raw,
            CssItem::Import { raw, .. } => raw,
            CssItem::Keyframes(k) => &k.raw,
            CssItem::Media(m) => &m.raw,
            CssItem::Rule(r) => &r.raw,
        }
    }
}

/// A parsed stylesheet.
///
/// `items` is the faithful, source-ordered view; the other collections are
/// indexes over it.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub charset: Option<String>,
    pub imports: Vec<String>,
    pub font_faces: Vec<String>,
    pub media_queries: Vec<MediaBlock>,
    pub keyframes: Vec<Keyframes>,
    /// `--name` to value.
    pub custom_properties: IndexMap<String, String>,
    /// Top-level rules sorted ascending by specificity score, then source order.
    pub rules: Vec<StyleRule>,
    pub items: Vec<CssItem>,
    pub warnings: Vec<ParseWarning>,
}

impl Stylesheet {
    pub fn from_items(
        items: Vec<CssItem>,
        custom_properties: IndexMap<String, String>,
        warnings: Vec<ParseWarning>,
    ) -> Self {
        let mut sheet = Stylesheet {
            custom_properties,
            warnings,
            ..Default::default()
        };
        for item in &items {
            match item {
                CssItem::Charset(raw) => {
                    if sheet.charset.is_none() {
                        sheet.charset = Some(raw.clone());
                    }
                }
                CssItem::Import { url, .. } => sheet.imports.push(url.clone()),
                CssItem::FontFace(raw) => sheet.font_faces.push(raw.clone()),
                CssItem::Keyframes(k) => sheet.keyframes.push(k.clone()),
                CssItem::Media(m) => sheet.media_queries.push(m.clone()),
                CssItem::Rule(r) => sheet.rules.push(r.clone()),
                CssItem::Raw(_) => {}
            }
        }
        sheet
            .rules
            .sort_by_key(|r| (r.specificity.score(), r.source_order));
        sheet.items = items;
        sheet
    }

    /// Every distinct selector of the sheet, media-nested ones included,
    /// in source order.
    pub fn selectors(&self) -> IndexSet<String> {
        let mut selectors = IndexSet::new();
        for item in &self.items {
            let rules: Vec<&StyleRule> = match item {
                CssItem::Rule(r) => vec![r],
                CssItem::Media(m) => m.rules.iter().collect(),
                _ => continue,
            };
            for rule in rules.into_iter().filter(|r| !r.is_at_rule()) {
                selectors.extend(rule.selector_parts().map(str::to_string));
            }
        }
        selectors
    }

    /// Count of style rules, media-nested ones included.
    pub fn rule_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                CssItem::Rule(_) => 1,
                CssItem::Media(m) => m.rules.len(),
                _ => 0,
            })
            .sum()
    }

    /// Serialize `items` back to text, one construct per line.
    pub fn to_css(&self) -> String {
        self.items
            .iter()
            .map(CssItem::raw)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The family name declared by a `@font-face` block.
pub fn font_face_family(raw: &str) -> Option<String> {
    FONT_FAMILY_RE
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|family| !family.is_empty())
}

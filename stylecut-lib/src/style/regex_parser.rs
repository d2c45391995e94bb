//! Pattern-based CSS mini parser.
//!
//! This is not a CSS tokenizer. It recognises top-level blocks with a single
//! regular expression and one level of `@media` nesting. Text the pattern
//! does not describe (`@layer a, b;`, `@supports { .. }`, deeper nesting,
//! stray braces) becomes a [`CssItem::Raw`] spanning up to the next `;` or
//! balanced block, so serializing the items never loses input.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::error::{ParseWarning, WarningKind};
use crate::style::stylesheet::{CssItem, Keyframes, MediaBlock, StyleRule, Stylesheet};
use crate::style::RuleParser;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("comment pattern is valid")
});

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\A\s*(?:",
        r"(?P<keyframes>@(?:-webkit-|-moz-|-o-)?keyframes\s+(?P<name>[\w-]+)\s*\{(?:[^{}]*\{[^{}]*\})*[^{}]*\})",
        r"|(?P<media>@media(?P<condition>[^{]+)\{(?P<body>[^{}]*(?:\{[^{}]*\}[^{}]*)*)\})",
        r"|(?P<import>@import\s+(?P<target>[^;]+);)",
        r"|(?P<charset>@charset\s+[^;]+;)",
        r"|(?P<rule>(?P<selector>[^{};]+)\{(?P<declarations>[^{}]*)\})",
        r")"
    ))
    .expect("item pattern is valid")
});

static CUSTOM_PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(--[A-Za-z0-9_-]+)\s*:\s*([^;{}]+)").expect("custom property pattern is valid")
});

static IMPORT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:url\(\s*)?["']?([^"')\s]+)"#).expect("import url pattern is valid")
});

/// The default parser backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexRuleParser;

impl RuleParser for RegexRuleParser {
    fn parse(&self, css: &str) -> Stylesheet {
        let css = strip_comments(css);
        let mut warnings = Vec::new();
        let mut order = 0u32;
        let items = parse_items(&css, &mut order, &mut warnings);

        let opens = css.matches('{').count();
        let closes = css.matches('}').count();
        if opens != closes {
            log::warn!("unbalanced braces: {opens} opening, {closes} closing");
            warnings.push(ParseWarning::new(
                WarningKind::UnbalancedBraces,
                format!("{opens} `{{` vs {closes} `}}`"),
            ));
        }

        Stylesheet::from_items(items, custom_properties(&css), warnings)
    }
}

/// Items of `text` in source order. Every non-blank byte ends up in some item.
fn parse_items(text: &str, order: &mut u32, warnings: &mut Vec<ParseWarning>) -> Vec<CssItem> {
    let mut items = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        if rest.trim().is_empty() {
            break;
        }
        if let Some(caps) = ITEM_RE.captures(rest) {
            pos += caps.get(0).map_or(rest.len(), |m| m.end());
            items.push(item_from_captures(&caps, order, warnings));
            continue;
        }
        let start = pos + (rest.len() - rest.trim_start().len());
        let end = start + opaque_len(&text[start..]);
        items.push(raw_item(&text[start..end], warnings));
        pos = end;
    }
    items
}

/// Length of the construct at the start of `text` that the item pattern
/// could not read: through the first top-level `;`, the end of the first
/// balanced block, or a stray `}`.
fn opaque_len(text: &str) -> usize {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            ';' if depth == 0 => return idx + 1,
            '{' => depth += 1,
            '}' if depth <= 1 => return idx + 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    text.len()
}

fn raw_item(text: &str, warnings: &mut Vec<ParseWarning>) -> CssItem {
    let text = text.trim();
    log::debug!("keeping unparsed css verbatim: {}", snippet(text));
    warnings.push(ParseWarning::new(WarningKind::UnparsedCss, snippet(text)));
    CssItem::Raw(text.to_string())
}

/// Remove every `/* ... */` comment.
pub fn strip_comments(css: &str) -> String {
    COMMENT_RE.replace_all(css, "").into_owned()
}

/// All `--name: value` declarations, last definition wins.
pub fn custom_properties(css: &str) -> IndexMap<String, String> {
    CUSTOM_PROPERTY_RE
        .captures_iter(css)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

/// The URL of an `@import` prelude: `url("a.css") screen`, `'a.css'`, `a.css`.
pub fn import_url(target: &str) -> Option<String> {
    IMPORT_URL_RE
        .captures(target.trim())
        .map(|caps| caps[1].to_string())
}

fn item_from_captures(caps: &Captures<'_>, order: &mut u32, warnings: &mut Vec<ParseWarning>) -> CssItem {
    if let Some(m) = caps.name("keyframes") {
        return CssItem::Keyframes(Keyframes {
            name: caps["name"].to_string(),
            raw: m.as_str().trim().to_string(),
        });
    }
    if let Some(m) = caps.name("media") {
        let mut nested = Vec::new();
        let mut rules = Vec::new();
        for item in parse_items(&caps["body"], order, warnings) {
            match item {
                CssItem::Rule(rule) => rules.push(rule),
                other => nested.push(other.raw().to_string()),
            }
        }
        return CssItem::Media(MediaBlock {
            condition: caps["condition"].trim().to_string(),
            rules,
            nested,
            raw: m.as_str().trim().to_string(),
        });
    }
    if let Some(m) = caps.name("import") {
        let raw = m.as_str().trim();
        return match import_url(&caps["target"]) {
            Some(url) => CssItem::Import {
                url,
                raw: raw.to_string(),
            },
            None => raw_item(raw, warnings),
        };
    }
    if let Some(m) = caps.name("charset") {
        return CssItem::Charset(m.as_str().trim().to_string());
    }
    let raw = caps.name("rule").map_or("", |m| m.as_str());
    let selector = caps.name("selector").map_or("", |m| m.as_str()).trim();
    if selector.starts_with("@font-face") {
        return CssItem::FontFace(raw.trim().to_string());
    }
    let declarations = caps.name("declarations").map_or("", |m| m.as_str());
    let rule = StyleRule::new(selector, declarations, raw, *order);
    *order += 1;
    CssItem::Rule(rule)
}

fn snippet(text: &str) -> String {
    const MAX: usize = 60;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(css: &str) -> Stylesheet {
        RegexRuleParser.parse(css)
    }

    #[test]
    fn test_items_keep_source_order() {
        let sheet = parse(
            r#"@charset "utf-8";
            @import url("base.css");
            /* comment { with braces } */
            @font-face { font-family: Inter; src: url(inter.woff2); }
            .b { color: red }
            @media (max-width: 600px) { .a { color: blue } #x { margin: 0 } }
            @keyframes spin { from { transform: rotate(0) } to { transform: rotate(360deg) } }
            a:hover { color: green }"#,
        );

        let kinds: Vec<&str> = sheet
            .items
            .iter()
            .map(|item| match item {
                CssItem::Charset(_) => "charset",
                CssItem::Import { .. } => "import",
                CssItem::FontFace(_) => "font-face",
                CssItem::Keyframes(_) => "keyframes",
                CssItem::Media(_) => "media",
                CssItem::Rule(_) => "rule",
                CssItem::Raw(_) => "raw",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["charset", "import", "font-face", "rule", "media", "keyframes", "rule"]
        );
        assert_eq!(sheet.imports, vec!["base.css"]);
        assert_eq!(sheet.keyframes[0].name, "spin");
        assert_eq!(sheet.media_queries[0].condition, "(max-width: 600px)");
        assert_eq!(sheet.media_queries[0].rules.len(), 2);
        assert!(sheet.warnings.is_empty(), "{:?}", sheet.warnings);
    }

    #[test]
    fn test_rules_sorted_by_specificity() {
        let sheet = parse("#id { a: 1 } .c { a: 2 } p { a: 3 } .d .e { a: 4 }");
        let selectors: Vec<_> = sheet.rules.iter().map(|r| r.selector.as_str()).collect();
        assert_eq!(selectors, vec!["p", ".c", ".d .e", "#id"]);
    }

    #[test]
    fn test_custom_properties() {
        let sheet = parse(":root { --brand: #f00; --gap : 4px } .x { color: var(--brand) }");
        assert_eq!(sheet.custom_properties.get("--brand").map(String::as_str), Some("#f00"));
        assert_eq!(sheet.custom_properties.get("--gap").map(String::as_str), Some("4px"));
        assert_eq!(sheet.custom_properties.len(), 2);
    }

    #[test]
    fn test_garbage_produces_warnings_not_errors() {
        let sheet = parse("body { margin: 0 } }}} .broken { color: red");
        assert_eq!(sheet.rules.len(), 1);
        assert!(sheet
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnbalancedBraces));
        assert!(sheet.warnings.iter().any(|w| w.kind == WarningKind::UnparsedCss));
    }

    #[test]
    fn test_unknown_constructs_pass_through() {
        let sheet = parse(
            "@layer base, theme; @supports (display:grid){.g{display:grid}} \
             @media print{@font-face{font-family:P;src:url(p.woff)} .p{color:red}} .x{color:blue}",
        );
        let raws: Vec<&str> = sheet
            .items
            .iter()
            .filter_map(|item| match item {
                CssItem::Raw(raw) => Some(raw.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            raws,
            vec!["@layer base, theme;", "@supports (display:grid){.g{display:grid}}"]
        );

        let media = &sheet.media_queries[0];
        assert_eq!(media.nested, vec!["@font-face{font-family:P;src:url(p.woff)}"]);
        assert_eq!(media.rules.len(), 1);
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].selector, ".x");
        assert!(sheet.to_css().contains("@media print{@font-face{font-family:P;"));
    }

    #[test]
    fn test_raw_text_is_preserved() {
        let sheet = parse(".btn { color: blue; }");
        assert_eq!(sheet.rules[0].raw, ".btn { color: blue; }");
        assert_eq!(sheet.rules[0].declarations, "color: blue;");
    }

    #[test]
    fn test_import_url_forms() {
        assert_eq!(import_url("url(\"a.css\") screen").as_deref(), Some("a.css"));
        assert_eq!(import_url("'b.css'").as_deref(), Some("b.css"));
        assert_eq!(import_url("url(c)").as_deref(), Some("c"));
    }
}

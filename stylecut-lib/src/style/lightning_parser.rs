//! Alternate parser backend built on lightningcss.
//!
//! Rules are parsed by lightningcss and printed back to text, so `raw`
//! holds normalized CSS rather than the input bytes. Stylesheets that
//! lightningcss rejects are handed to the regex backend.

use indexmap::IndexMap;
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::{style::StyleRule as LightningStyleRule, CssRule};
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;

use crate::error::{ParseWarning, WarningKind};
use crate::style::regex_parser::{self, RegexRuleParser};
use crate::style::stylesheet::{CssItem, Keyframes, MediaBlock, StyleRule, Stylesheet};
use crate::style::RuleParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct LightningRuleParser;

impl RuleParser for LightningRuleParser {
    fn parse(&self, css: &str) -> Stylesheet {
        match parse_with_lightning(css) {
            Ok(sheet) => sheet,
            Err(message) => {
                log::warn!("lightningcss rejected stylesheet ({message}), using regex parser");
                let mut sheet = RegexRuleParser.parse(css);
                sheet
                    .warnings
                    .insert(0, ParseWarning::new(WarningKind::BackendFallback, message));
                sheet
            }
        }
    }
}

fn parse_with_lightning(css: &str) -> Result<Stylesheet, String> {
    let sheet = LightningStyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| e.to_string())?;

    let mut order = 0u32;
    let mut items = Vec::new();
    let mut custom_properties = IndexMap::new();

    for rule in &sheet.rules.0 {
        match rule {
            CssRule::Style(style_rule) => {
                let owned = convert_style_rule(style_rule, &mut order, &mut custom_properties)?;
                items.push(CssItem::Rule(owned));
            }
            CssRule::Media(media_rule) => {
                let condition = media_rule
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| e.to_string())?;
                let mut rules = Vec::new();
                let mut nested = Vec::new();
                for inner_rule in &media_rule.rules.0 {
                    if let CssRule::Style(sr) = inner_rule {
                        rules.push(convert_style_rule(sr, &mut order, &mut custom_properties)?);
                    } else {
                        let text = inner_rule
                            .to_css_string(PrinterOptions::default())
                            .map_err(|e| e.to_string())?;
                        log::debug!("keeping nested at-rule inside @media {condition} verbatim");
                        nested.push(text);
                    }
                }
                items.push(CssItem::Media(MediaBlock::new(condition, nested, rules)));
            }
            other => {
                let raw = other
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| e.to_string())?;
                if let Some(item) = classify_printed_rule(raw) {
                    items.push(item);
                }
            }
        }
    }

    Ok(Stylesheet::from_items(items, custom_properties, Vec::new()))
}

/// Sort a printed at-rule into the matching item kind. Unknown at-rules
/// (`@layer`, `@supports`, `@page`, ...) are kept as raw items.
fn classify_printed_rule(raw: String) -> Option<CssItem> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("@charset") {
        return Some(CssItem::Charset(trimmed.to_string()));
    }
    if let Some(target) = trimmed.strip_prefix("@import") {
        return Some(match regex_parser::import_url(target.trim_end_matches(';')) {
            Some(url) => CssItem::Import {
                url,
                raw: trimmed.to_string(),
            },
            None => CssItem::Raw(trimmed.to_string()),
        });
    }
    if trimmed.starts_with("@font-face") {
        return Some(CssItem::FontFace(trimmed.to_string()));
    }
    if let Some(name) = keyframes_name(trimmed) {
        return Some(CssItem::Keyframes(Keyframes {
            name,
            raw: trimmed.to_string(),
        }));
    }
    Some(CssItem::Raw(trimmed.to_string()))
}

fn keyframes_name(raw: &str) -> Option<String> {
    let rest = raw.strip_prefix('@')?;
    let rest = ["-webkit-", "-moz-", "-o-"]
        .iter()
        .find_map(|prefix| rest.strip_prefix(prefix))
        .unwrap_or(rest);
    let rest = rest.strip_prefix("keyframes")?;
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Copy a lightningcss style rule's selectors and declarations into a [`StyleRule`].
fn convert_style_rule(
    style_rule: &LightningStyleRule<'_>,
    order: &mut u32,
    custom_properties: &mut IndexMap<String, String>,
) -> Result<StyleRule, String> {
    let mut selectors = Vec::new();
    for selector in &style_rule.selectors.0 {
        let text = selector
            .to_css_string(PrinterOptions::default())
            .map_err(|e| e.to_string())?;
        selectors.push(text);
    }
    let selector = selectors.join(", ");

    let block = &style_rule.declarations;
    let mut declarations = Vec::new();
    let normal = block.declarations.iter().map(|p| (p, false));
    let important = block.important_declarations.iter().map(|p| (p, true));
    for (property, is_important) in normal.chain(important) {
        let name = property.property_id().name().to_string();
        let mut value = property
            .value_to_css_string(PrinterOptions::default())
            .map_err(|e| e.to_string())?;
        if name.starts_with("--") {
            custom_properties.insert(name.clone(), value.clone());
        }
        if is_important {
            value.push_str(" !important");
        }
        declarations.push(format!("{name}: {value}"));
    }
    let declarations = declarations.join("; ");

    let raw = format!("{selector} {{ {declarations} }}");
    let rule = StyleRule::new(selector, declarations, raw, *order);
    *order += 1;
    Ok(rule)
}

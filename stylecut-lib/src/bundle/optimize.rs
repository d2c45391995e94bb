//! Bundle optimization passes.
//!
//! Passes work on parsed items, not raw text, so each one only touches
//! whole rules. Constructs the parser could not classify travel through
//! every pass untouched. `combine_selectors` moves later rules up to the
//! first rule with the same declarations, which can change cascade order
//! between rules that match the same element.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::OptimizationFlags;
use crate::metrics::round2;
use crate::style::minify::minify;
use crate::style::stylesheet::{CssItem, MediaBlock, StyleRule};
use crate::style::RuleParser;

const FONT_LONGHANDS: [&str; 5] = ["font-style", "font-weight", "font-size", "line-height", "font-family"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedCss {
    pub css: String,
    pub original_size: usize,
    pub optimized_size: usize,
    /// Percentage saved, two decimals.
    pub reduction: f64,
}

/// Apply the enabled passes, then [`minify`].
pub fn optimize(css: &str, flags: &OptimizationFlags, parser: &dyn RuleParser) -> OptimizedCss {
    let any_pass = flags.remove_duplicates
        || flags.merge_media_queries
        || flags.combine_selectors
        || flags.optimize_fonts;

    let text = if any_pass {
        let sheet = parser.parse(css);
        if !sheet.warnings.is_empty() {
            log::warn!(
                "{} construct(s) could not be parsed and are kept verbatim",
                sheet.warnings.len()
            );
        }
        let mut items = sheet.items;
        if flags.remove_duplicates {
            items = remove_duplicates(items);
        }
        if flags.merge_media_queries {
            items = merge_media_queries(items);
        }
        if flags.combine_selectors {
            items = combine_selectors(items);
        }
        if flags.optimize_fonts {
            items = optimize_fonts(items);
        }
        serialize(&items)
    } else {
        css.to_string()
    };

    let minified = minify(&text);
    let reduction = if css.is_empty() {
        0.0
    } else {
        round2((1.0 - minified.len() as f64 / css.len() as f64) * 100.0)
    };
    OptimizedCss {
        original_size: css.len(),
        optimized_size: minified.len(),
        css: minified,
        reduction,
    }
}

pub fn serialize(items: &[CssItem]) -> String {
    items.iter().map(CssItem::raw).collect::<Vec<_>>().join("\n")
}

/// Drop rules whose selector and declarations both repeat later in the same
/// scope. The last copy is kept.
pub fn remove_duplicates(items: Vec<CssItem>) -> Vec<CssItem> {
    let items = map_media_rules(items, dedupe_rules);
    let mut seen = HashSet::new();
    let mut kept: Vec<CssItem> = items
        .into_iter()
        .rev()
        .filter(|item| match item {
            CssItem::Rule(rule) => seen.insert(rule_key(rule)),
            _ => true,
        })
        .collect();
    kept.reverse();
    kept
}

fn dedupe_rules(rules: Vec<StyleRule>) -> Vec<StyleRule> {
    let mut seen = HashSet::new();
    let mut kept: Vec<StyleRule> = rules
        .into_iter()
        .rev()
        .filter(|rule| seen.insert(rule_key(rule)))
        .collect();
    kept.reverse();
    kept
}

fn rule_key(rule: &StyleRule) -> (String, String) {
    (rule.selector.clone(), rule.declarations.clone())
}

/// Fold `@media` blocks with identical conditions into one block each,
/// appended after all other items in order of first appearance.
pub fn merge_media_queries(items: Vec<CssItem>) -> Vec<CssItem> {
    let mut merged: IndexMap<String, (Vec<String>, Vec<StyleRule>)> = IndexMap::new();
    let mut rest = Vec::with_capacity(items.len());
    for item in items {
        match item {
            CssItem::Media(media) => {
                let (nested, rules) = merged.entry(media.condition).or_default();
                nested.extend(media.nested);
                rules.extend(media.rules);
            }
            other => rest.push(other),
        }
    }
    rest.extend(
        merged
            .into_iter()
            .map(|(condition, (nested, rules))| CssItem::Media(MediaBlock::new(condition, nested, rules))),
    );
    rest
}

/// Rules with byte-identical declarations become one rule with a joined
/// selector list, at the position of the first of them.
pub fn combine_selectors(items: Vec<CssItem>) -> Vec<CssItem> {
    let items = map_media_rules(items, combine_rules);

    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for item in &items {
        if let CssItem::Rule(rule) = item {
            if !rule.is_at_rule() {
                groups
                    .entry(rule.declarations.clone())
                    .or_default()
                    .push(rule.selector.clone());
            }
        }
    }

    let mut emitted = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| match item {
            CssItem::Rule(rule) if !rule.is_at_rule() => {
                let selectors = &groups[&rule.declarations];
                if selectors.len() == 1 {
                    return Some(CssItem::Rule(rule));
                }
                emitted
                    .insert(rule.declarations.clone())
                    .then(|| CssItem::Rule(joined_rule(selectors, &rule)))
            }
            other => Some(other),
        })
        .collect()
}

fn combine_rules(rules: Vec<StyleRule>) -> Vec<StyleRule> {
    let wrapped = rules.into_iter().map(CssItem::Rule).collect();
    combine_selectors(wrapped)
        .into_iter()
        .filter_map(|item| match item {
            CssItem::Rule(rule) => Some(rule),
            _ => None,
        })
        .collect()
}

fn joined_rule(selectors: &[String], first: &StyleRule) -> StyleRule {
    let selector = selectors.join(",");
    let raw = format!("{}{{{}}}", selector, first.declarations);
    StyleRule::new(selector, first.declarations.clone(), raw, first.source_order)
}

/// Replace `font-style`, `font-weight`, `font-size`, `line-height` and
/// `font-family` with one `font` shorthand when a rule sets all five.
pub fn optimize_fonts(items: Vec<CssItem>) -> Vec<CssItem> {
    let items = map_media_rules(items, |rules| rules.into_iter().map(fold_font_shorthand).collect());
    items
        .into_iter()
        .map(|item| match item {
            CssItem::Rule(rule) => CssItem::Rule(fold_font_shorthand(rule)),
            other => other,
        })
        .collect()
}

fn fold_font_shorthand(rule: StyleRule) -> StyleRule {
    if rule.is_at_rule() {
        return rule;
    }
    let declarations = split_declarations(&rule.declarations);
    let mut values: [Option<&str>; 5] = [None; 5];
    let mut first_position = None;
    for (position, (name, value)) in declarations.iter().enumerate() {
        if let Some(slot) = FONT_LONGHANDS.iter().position(|p| name.eq_ignore_ascii_case(p)) {
            // `!important` longhands cannot be folded without changing the cascade.
            if value.contains("!important") {
                return rule;
            }
            values[slot] = Some(value);
            first_position.get_or_insert(position);
        }
    }
    let ([Some(style), Some(weight), Some(size), Some(line_height), Some(family)], Some(at)) =
        (values, first_position)
    else {
        return rule;
    };

    let shorthand = format!("font:{style} {weight} {size}/{line_height} {family}");
    let mut parts = Vec::with_capacity(declarations.len() - 4);
    for (position, (name, value)) in declarations.iter().enumerate() {
        if position == at {
            parts.push(shorthand.clone());
        }
        if !FONT_LONGHANDS.iter().any(|p| name.eq_ignore_ascii_case(p)) {
            parts.push(format!("{name}:{value}"));
        }
    }
    let body = parts.join(";");
    let raw = format!("{}{{{}}}", rule.selector, body);
    StyleRule::new(rule.selector.clone(), body, raw, rule.source_order)
}

/// `(property, value)` pairs, splitting on `;` outside parentheses and quotes.
fn split_declarations(block: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut flush = |current: &mut String| {
        let text = std::mem::take(current);
        if let Some((name, value)) = text.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                out.push((name.to_string(), value.trim().to_string()));
            }
        }
    };
    for ch in block.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                flush(&mut current);
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    flush(&mut current);
    out
}

fn map_media_rules(items: Vec<CssItem>, pass: impl Fn(Vec<StyleRule>) -> Vec<StyleRule>) -> Vec<CssItem> {
    items
        .into_iter()
        .map(|item| match item {
            CssItem::Media(media) => {
                let rules = pass(media.rules);
                CssItem::Media(MediaBlock::new(media.condition, media.nested, rules))
            }
            other => other,
        })
        .collect()
}

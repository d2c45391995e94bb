use std::iter::Peekable;
use std::str::Chars;

/// ------------------------------
/// 1. Compound selector scanning
/// ------------------------------

/// The simple selectors found in one compound selector, e.g. `a.nav#top[href]:hover`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    /// Attribute names only; operators and values are skipped.
    pub attributes: Vec<String>,
    pub pseudo_classes: Vec<String>,
    pub pseudo_elements: Vec<String>,
}

impl CompoundSelector {
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
            && self.pseudo_elements.is_empty()
    }
}

/// Pseudo-elements that may be written with a single colon.
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// Scan a compound selector string, e.g. `div.red#header[disabled]:hover`.
pub fn parse_compound_selector(selector: &str) -> CompoundSelector {
    let mut compound = CompoundSelector::default();
    let mut chars = selector.trim().chars().peekable();

    // A leading identifier or `*` is the type selector.
    if let Some(&ch) = chars.peek() {
        if ch == '*' {
            chars.next();
        } else if ch.is_alphabetic() {
            let tag = take_ident(&mut chars);
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' => push_non_empty(&mut compound.ids, take_ident(&mut chars)),
            '.' => push_non_empty(&mut compound.classes, take_ident(&mut chars)),
            '[' => {
                let body = take_until_bracket_close(&mut chars);
                let name: String = body
                    .trim_start()
                    .chars()
                    .take_while(|c| !matches!(c, '=' | '~' | '|' | '^' | '$' | '*' | '!' | ']') && !c.is_whitespace())
                    .collect();
                push_non_empty(&mut compound.attributes, name);
            }
            ':' => {
                let double = chars.peek() == Some(&':');
                if double {
                    chars.next();
                }
                let name = take_ident(&mut chars);
                if chars.peek() == Some(&'(') {
                    skip_parenthesized(&mut chars);
                }
                if double || LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
                    push_non_empty(&mut compound.pseudo_elements, name);
                } else {
                    push_non_empty(&mut compound.pseudo_classes, name);
                }
            }
            _ => {}
        }
    }

    compound
}

/// Split a selector (or selector list) into its compound parts, dropping
/// combinators (` `, `>`, `+`, `~`) and commas. Brackets, parentheses and
/// quoted strings are kept intact.
pub fn split_compounds(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if depth == 0 && (c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',')) => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn take_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&ch) = chars.peek() {
        if ch == '\\' {
            // Escaped character: keep it verbatim.
            chars.next();
            if let Some(escaped) = chars.next() {
                ident.push(escaped);
            }
            continue;
        }
        if ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            ident.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

fn take_until_bracket_close(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut body = String::new();
    let mut quote: Option<char> = None;
    for ch in chars.by_ref() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == ']' => break,
            None => {}
        }
        body.push(ch);
    }
    body
}

fn skip_parenthesized(chars: &mut Peekable<Chars<'_>>) {
    let mut depth = 0usize;
    for ch in chars.by_ref() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
}

fn push_non_empty(target: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        target.push(value);
    }
}

/// ------------------------------
/// 2. Specificity
/// ------------------------------

/// `(ids, classes + attributes + pseudo-classes, elements + pseudo-elements)`.
///
/// Ordering uses the weighted [`Specificity::score`], not a lexicographic
/// comparison, so eleven type selectors outrank one class. Callers break
/// ties by source order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub elements: u32,
}

impl Specificity {
    pub fn score(&self) -> u32 {
        self.ids * 100 + self.classes * 10 + self.elements
    }

    /// Specificity of a whole selector text. Selector lists are summed.
    /// At-rule preludes (`@font-face`, `@page`) score zero.
    pub fn of_selector(selector: &str) -> Self {
        if selector.trim_start().starts_with('@') {
            return Specificity::default();
        }
        split_compounds(selector)
            .iter()
            .map(|part| compute_specificity(&parse_compound_selector(part)))
            .fold(Specificity::default(), |acc, s| Specificity {
                ids: acc.ids + s.ids,
                classes: acc.classes + s.classes,
                elements: acc.elements + s.elements,
            })
    }
}

/// Compute specificity for a compound selector.
pub fn compute_specificity(compound: &CompoundSelector) -> Specificity {
    Specificity {
        ids: compound.ids.len() as u32,
        classes: (compound.classes.len() + compound.attributes.len() + compound.pseudo_classes.len())
            as u32,
        elements: u32::from(compound.tag.is_some()) + compound.pseudo_elements.len() as u32,
    }
}

use indexmap::IndexSet;

use crate::config::ExtractorConfig;
use crate::dom::dom_tree::{Document, Node};
use crate::parser::dom_indices::DomIndices;

/// Tags whose bare name becomes critical when such an element is marked.
const STRUCTURAL_TAGS: &[&str] = &["header", "nav", "main", "h1", "h2", "h3"];

/// Always added, whatever the document contains.
const VIEWPORT_SELECTORS: &[&str] = &[
    r#"*[class*="hero"]"#,
    r#"*[class*="banner"]"#,
    r#"*[class*="above"]"#,
    r#"img[loading!="lazy"]"#,
    "style",
    r#"link[rel="stylesheet"]"#,
];

/// Selectors assumed to style the first viewport.
///
/// This is a static guess from markup and configuration. Nothing is laid
/// out or measured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalSelectorSet {
    selectors: IndexSet<String>,
}

impl CriticalSelectorSet {
    pub fn from_document(document: &Document, config: &ExtractorConfig) -> Self {
        let excluded = |selector: &str| config.exclude_selectors.iter().any(|e| e == selector);
        let mut selectors: IndexSet<String> = config
            .include_selectors
            .iter()
            .filter(|s| !excluded(s.as_str()))
            .cloned()
            .collect();

        let indices = DomIndices::build(document);
        // Every element with a class or id attribute is marked by definition.
        for class in indices.class_map.keys() {
            let selector = format!(".{class}");
            if !excluded(selector.as_str()) {
                selectors.insert(selector);
            }
        }
        for id in indices.id_map.keys() {
            let selector = format!("#{id}");
            if !excluded(selector.as_str()) {
                selectors.insert(selector);
            }
        }
        for tag in STRUCTURAL_TAGS {
            let marked = indices.elements_by_tag(tag).iter().any(|handle| {
                matches!(&*handle.borrow(), Node::Element(elem)
                    if elem.has_attr("class") || elem.has_attr("id") || elem.has_attr("data-critical"))
            });
            if marked {
                selectors.insert(tag.to_string());
            }
        }

        selectors.extend(VIEWPORT_SELECTORS.iter().map(|s| s.to_string()));
        log::debug!("critical selector set has {} entries", selectors.len());
        CriticalSelectorSet { selectors }
    }

    /// Substring match of any entry against a rule's selector text. This
    /// covers matches against a single part of a complex selector too.
    pub fn matches(&self, rule_selector: &str) -> bool {
        self.selectors.iter().any(|s| rule_selector.contains(s.as_str()))
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.selectors.contains(selector)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(String::as_str)
    }
}

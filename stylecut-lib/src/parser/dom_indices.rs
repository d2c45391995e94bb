use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::dom_tree::{Document, Handle, Node};

/// Lookup tables over a parsed document. Every map iterates in document
/// order of first appearance.
#[derive(Debug, Default)]
pub struct DomIndices {
    /// `id` attribute to the first element carrying it.
    pub id_map: IndexMap<String, Handle>,
    /// Class name to every element carrying it.
    pub class_map: IndexMap<String, Vec<Handle>>,
    /// Lowercase tag name to every element with that tag.
    pub tag_map: IndexMap<String, Vec<Handle>>,
}

impl DomIndices {
    pub fn build(document: &Document) -> Self {
        let mut indices = DomIndices::default();
        Self::traverse(&document.root, &mut indices);
        indices
    }

    fn traverse(node: &Handle, indices: &mut DomIndices) {
        let borrowed = node.borrow();
        if let Node::Element(elem) = &*borrowed {
            indices
                .tag_map
                .entry(elem.tag.clone())
                .or_default()
                .push(Rc::clone(node));

            if let Some(id) = elem.attr("id").map(str::trim).filter(|id| !id.is_empty()) {
                indices
                    .id_map
                    .entry(id.to_string())
                    .or_insert_with(|| Rc::clone(node));
            }
            for class in elem.classes() {
                indices
                    .class_map
                    .entry(class.to_string())
                    .or_default()
                    .push(Rc::clone(node));
            }
        }
        if let Some(children) = borrowed.children() {
            for child in children {
                Self::traverse(child, indices);
            }
        }
    }

    /// Elements with tag `tag`, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> &[Handle] {
        self.tag_map.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::create_dom_tree;

    #[test]
    fn test_indices_follow_document_order() {
        let doc = create_dom_tree(
            "<body><nav class='menu top'></nav><div id='hero' class='top'></div><div id='hero'></div></body>",
        );
        let indices = DomIndices::build(&doc);

        let classes: Vec<_> = indices.class_map.keys().cloned().collect();
        assert_eq!(classes, vec!["menu", "top"]);
        assert_eq!(indices.class_map["top"].len(), 2);
        assert_eq!(indices.id_map.len(), 1);
        assert_eq!(indices.elements_by_tag("div").len(), 2);
        assert!(indices.elements_by_tag("table").is_empty());
    }
}

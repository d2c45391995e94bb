use html5ever::QualName;
use std::cell::RefCell;
use std::rc::Rc;

pub mod dom_tree {
    use super::*;
    use crate::error::ParseWarning;

    pub type Handle = Rc<RefCell<Node>>;

    #[derive(Debug, Clone)]
    pub enum Node {
        DocumentRoot(DocumentRootNode),
        Element(ElementNode),
        Text(String),
        Comment(String),
    }

    impl Node {
        pub fn children(&self) -> Option<&Vec<Handle>> {
            match self {
                Node::DocumentRoot(root) => Some(&root.children),
                Node::Element(elem) => Some(&elem.children),
                Node::Text(_) | Node::Comment(_) => None,
            }
        }

        pub fn children_mut(&mut self) -> Option<&mut Vec<Handle>> {
            match self {
                Node::DocumentRoot(root) => Some(&mut root.children),
                Node::Element(elem) => Some(&mut elem.children),
                Node::Text(_) | Node::Comment(_) => None,
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct DocumentRootNode {
        pub children: Vec<Handle>,
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        /// Lowercase local name, e.g. `div`.
        pub tag: String,
        pub qual_name: QualName,
        /// Attributes in source order.
        pub attributes: Vec<(String, String)>,
        pub children: Vec<Handle>,
    }

    impl ElementNode {
        pub fn new(qual_name: QualName, attributes: Vec<(String, String)>) -> Self {
            ElementNode {
                tag: qual_name.local.to_ascii_lowercase().to_string(),
                qual_name,
                attributes,
                children: Vec::new(),
            }
        }

        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        pub fn has_attr(&self, name: &str) -> bool {
            self.attr(name).is_some()
        }

        /// Whitespace-separated entries of the `class` attribute.
        pub fn classes(&self) -> impl Iterator<Item = &str> {
            self.attr("class").unwrap_or("").split_whitespace()
        }
    }

    #[derive(Debug)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: Handle,
        pub doctype: Option<Doctype>,
        /// Recoverable errors reported while parsing.
        pub warnings: Vec<ParseWarning>,
    }

    impl Document {
        /// Visit every element in document order.
        pub fn walk_elements(&self, visit: &mut dyn FnMut(&ElementNode)) {
            walk(&self.root, visit);
        }
    }

    fn walk(node: &Handle, visit: &mut dyn FnMut(&ElementNode)) {
        let node = node.borrow();
        if let Node::Element(elem) = &*node {
            visit(elem);
        }
        if let Some(children) = node.children() {
            for child in children {
                walk(child, visit);
            }
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Rc::new(RefCell::new(Node::DocumentRoot(DocumentRootNode::default()))),
            doctype: None,
            warnings: Vec::new(),
        }
    }
}

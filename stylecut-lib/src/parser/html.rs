//! Parses HTML into the small DOM of `crate::dom::dom_tree`.
//!
//! html5ever does the tokenizing and tree construction and never fails;
//! the errors it reports are collected as warnings on the document.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink},
    Attribute, LocalName, Namespace, QualName,
};

use crate::dom::dom_tree::{self, Handle, Node};
use crate::error::{ParseWarning, WarningKind};

/// Parse a whole HTML document. Malformed markup is repaired, not rejected.
pub fn create_dom_tree(html_content: &str) -> dom_tree::Document {
    let sink = DomTreeSink::default();
    let document = html5ever::parse_document(sink, Default::default()).one(html_content.to_string());
    if !document.warnings.is_empty() {
        log::debug!("html parsed with {} recoverable errors", document.warnings.len());
    }
    document
}

/// Builds a [`dom_tree::Document`] from html5ever callbacks.
pub struct DomTreeSink {
    document: RefCell<dom_tree::Document>,
    quirks_mode: RefCell<QuirksMode>,
}

impl DomTreeSink {
    pub fn new() -> Self {
        Self {
            document: RefCell::new(dom_tree::new_document()),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    fn root(&self) -> Handle {
        self.document.borrow().root.clone()
    }

    /// Depth-first search for the node that holds `target` as a child.
    fn find_parent(&self, target: &Handle) -> Option<(Handle, usize)> {
        fn search(node: &Handle, target: &Handle) -> Option<(Handle, usize)> {
            let borrowed = node.borrow();
            let children = borrowed.children()?;
            if let Some(idx) = children.iter().position(|c| Rc::ptr_eq(c, target)) {
                return Some((node.clone(), idx));
            }
            children.iter().find_map(|child| search(child, target))
        }
        search(&self.root(), target)
    }

    fn insert_at(parent: &Handle, index: Option<usize>, child: NodeOrText<Handle>) {
        let mut parent = parent.borrow_mut();
        let Some(children) = parent.children_mut() else {
            return;
        };
        let index = index.unwrap_or(children.len());
        match child {
            NodeOrText::AppendNode(node) => children.insert(index, node),
            NodeOrText::AppendText(text) => {
                // Adjacent text runs are merged into the preceding text node.
                if index > 0 {
                    if let Node::Text(existing) = &mut *children[index - 1].borrow_mut() {
                        existing.push_str(&text);
                        return;
                    }
                }
                children.insert(index, Rc::new(RefCell::new(Node::Text(text.to_string()))));
            }
        }
    }
}

impl Default for DomTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct DomElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for DomElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

impl TreeSink for DomTreeSink {
    type Handle = Handle;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = DomElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        log::debug!("html parse error: {}", msg);
        self.document
            .borrow_mut()
            .warnings
            .push(ParseWarning::new(WarningKind::MalformedHtml, msg.into_owned()));
    }

    fn get_document(&self) -> Self::Handle {
        self.root()
    }

    /// Non-element handles get an empty name.
    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        match &*target.borrow() {
            Node::Element(elem) => DomElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            _ => DomElemName {
                ns: Namespace::from(""),
                local: LocalName::from(""),
            },
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, _flags: ElementFlags) -> Self::Handle {
        let attributes = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        Rc::new(RefCell::new(Node::Element(dom_tree::ElementNode::new(name, attributes))))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::Comment(text.to_string())))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::Comment(format!("{} {}", target, data))))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        Self::insert_at(parent, None, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if self.find_parent(element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        self.document.borrow_mut().doctype = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        if let Some((parent, index)) = self.find_parent(sibling) {
            Self::insert_at(&parent, Some(index), child);
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        if let Node::Element(elem) = &mut *target.borrow_mut() {
            for attr in attrs {
                let key = attr.name.local.to_string();
                if !elem.has_attr(&key) {
                    elem.attributes.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        if let Some((parent, index)) = self.find_parent(target) {
            if let Some(children) = parent.borrow_mut().children_mut() {
                children.remove(index);
            }
        }
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let moved = match node.borrow_mut().children_mut() {
            Some(children) => std::mem::take(children),
            None => return,
        };
        if let Some(children) = new_parent.borrow_mut().children_mut() {
            children.extend(moved);
        }
    }
}

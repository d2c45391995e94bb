use std::cell::RefCell;
use std::rc::Rc;

use stylecut_lib::dom::dom_tree;
use stylecut_lib::parser::dom_indices::DomIndices;
use stylecut_lib::parser::html::create_dom_tree;

#[cfg(test)]
pub mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect_structure(node: &Rc<RefCell<dom_tree::Node>>) -> String {
        let mut output = String::new();
        traverse_node(node, 0, &mut output);
        output
    }

    fn traverse_node(node: &Rc<RefCell<dom_tree::Node>>, depth: usize, output: &mut String) {
        let node_ref = node.borrow();
        match &*node_ref {
            dom_tree::Node::DocumentRoot(root_node) => {
                for child in &root_node.children {
                    traverse_node(child, depth, output);
                }
            }
            dom_tree::Node::Element(elem_node) => {
                *output += &format!("{}<{}>\n", "  ".repeat(depth), elem_node.tag);
                for child in &elem_node.children {
                    traverse_node(child, depth + 1, output);
                }
            }
            dom_tree::Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    *output += &format!("{}{}\n", "  ".repeat(depth), trimmed);
                }
            }
            dom_tree::Node::Comment(_) => {}
        }
    }

    #[test]
    fn test_basic_structure() {
        let html = r#"
            <!DOCTYPE html>
            <html>
                <head>
                    <title>Test</title>
                </head>
                <body>
                    <h1>Hello</h1>
                    <p>World</p>
                </body>
            </html>
        "#;

        let document = create_dom_tree(html);
        let structure = collect_structure(&document.root);

        let expected = r#"
<html>
  <head>
    <title>
      Test
  <body>
    <h1>
      Hello
    <p>
      World
"#;
        assert_eq!(structure.trim(), expected.trim());
        assert_eq!(document.doctype.as_ref().unwrap().name, "html");
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let html = r#"<a href="https://example.com" class="cta hero" data-critical="1">Link</a>"#;

        let document = create_dom_tree(html);
        let mut attributes = Vec::new();
        document.walk_elements(&mut |elem| {
            if elem.tag == "a" {
                attributes = elem.attributes.clone();
            }
        });

        assert_eq!(
            attributes,
            vec![
                ("href".to_string(), "https://example.com".to_string()),
                ("class".to_string(), "cta hero".to_string()),
                ("data-critical".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_malformed_html() {
        let html = r#"
            <div>
                <p>Unclosed
                <img>
                </div>
        "#;

        let document = create_dom_tree(html);
        let structure = collect_structure(&document.root);

        let expected = r#"
<html>
  <head>
  <body>
    <div>
      <p>
        Unclosed
        <img>
"#;
        assert_eq!(structure.trim(), expected.trim());
    }

    #[test]
    fn test_table_autocorrection() {
        let document = create_dom_tree("<table><td>Cell</td></table>");
        let structure = collect_structure(&document.root);

        let expected = r#"
<html>
  <head>
  <body>
    <table>
      <tbody>
        <tr>
          <td>
            Cell
"#;
        assert_eq!(structure.trim(), expected.trim());
        assert!(!document.warnings.is_empty());
    }

    #[test]
    fn test_indices_over_parsed_page() {
        let html = r#"
            <header class="site-header hero" id="top">
                <nav class="menu"><a class="menu-link">Home</a><a class="menu-link">About</a></nav>
            </header>
            <main><h1>Title</h1></main>
            <footer class="footer"></footer>
        "#;

        let document = create_dom_tree(html);
        let indices = DomIndices::build(&document);

        let classes: Vec<&str> = indices.class_map.keys().map(String::as_str).collect();
        assert_eq!(classes, vec!["site-header", "hero", "menu", "menu-link", "footer"]);
        assert_eq!(indices.class_map["menu-link"].len(), 2);
        assert!(indices.id_map.contains_key("top"));
        assert_eq!(indices.elements_by_tag("h1").len(), 1);
        assert!(indices.elements_by_tag("aside").is_empty());
    }
}

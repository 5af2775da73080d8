//! Small helpers over the `markup5ever_rcdom` tree shared by the search and
//! scraper tools.

use anyhow::Result;
use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

pub fn parse_html(html: &str) -> Result<RcDom> {
    let parse_options = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let dom = parse_document(RcDom::default(), parse_options)
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(dom)
}

/// Lower-case tag name of an element node.
pub fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn attr(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Concatenated text of a subtree, skipping `<script>` and `<style>`.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { ref name, .. }
            if matches!(&*name.local, "script" | "style" | "noscript") =>
        {
            return
        }
        _ => {}
    }

    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Collapse every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Depth-first visit of every element in document order.
pub fn walk_elements<F>(node: &Handle, visit: &mut F)
where
    F: FnMut(&Handle, &str),
{
    if let Some(name) = element_name(node) {
        visit(node, &name);
    }

    for child in node.children.borrow().iter() {
        walk_elements(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_scripts_and_styles() {
        let dom = parse_html(
            "<html><head><style>p{}</style></head><body><p>Hello <b>world</b></p>\
             <script>var x = 1;</script></body></html>",
        )
        .unwrap();
        assert_eq!(collapse_whitespace(&text_content(&dom.document)), "Hello world");
    }

    #[test]
    fn classes_and_attributes() {
        let dom = parse_html(r#"<a class="result__a big" href="/x">x</a>"#).unwrap();
        let mut found = Vec::new();
        walk_elements(&dom.document, &mut |node, name| {
            if name == "a" {
                found.push((has_class(node, "result__a"), attr(node, "href")));
            }
        });
        assert_eq!(found, vec![(true, Some("/x".to_string()))]);
    }
}

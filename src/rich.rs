//! Allow-list pruning of untrusted HTML.
//!
//! Input is parsed with a full HTML5 parser, the way a browser would parse
//! it, so tricks that depend on parser quirks (`<scr<script>ipt>`, entity
//! encoded schemes, unclosed tags) are resolved before any decision is made.
//! The pruned tree is then serialized from scratch: nothing from the input
//! is copied through as markup.

use scraper::{ElementRef, Html, Node};

use crate::escape::{check_navigable, push_html_escaped};
use crate::policy::{AllowList, URL_ATTRIBUTES};

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Subtrees nested deeper than this are dropped.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RichNode {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<RichNode>,
    },
    Text(String),
}

/// A pruned HTML fragment containing only allow-listed tags and attributes.
///
/// Created per sanitize call and discarded after [`to_html`](Self::to_html).
///
/// # Examples
///
/// ```
/// use escape_core::{AllowList, RichContentDocument};
///
/// let allow = AllowList::new().tags(["a", "b"]).attribute("href");
/// let doc = RichContentDocument::parse(
///     r#"<b>hi</b> <a href="javascript:alert(1)" onclick="x()">link</a>"#,
///     &allow,
/// );
///
/// assert_eq!(doc.to_html(), "<b>hi</b> <a>link</a>");
/// assert_eq!(doc.dropped_attributes(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichContentDocument {
    nodes: Vec<RichNode>,
    dropped_elements: usize,
    dropped_attributes: usize,
}

impl RichContentDocument {
    /// Parses `raw` as an HTML fragment and prunes it to `allow`.
    ///
    /// A disallowed element is dropped together with everything inside it.
    /// Comments, doctypes and processing instructions are dropped.
    pub fn parse(raw: &str, allow: &AllowList) -> Self {
        let fragment = Html::parse_fragment(raw);

        let mut doc = Self {
            nodes: Vec::new(),
            dropped_elements: 0,
            dropped_attributes: 0,
        };
        doc.nodes = doc.prune_children(fragment.root_element(), allow, 0);

        tracing::debug!(
            dropped_elements = doc.dropped_elements,
            dropped_attributes = doc.dropped_attributes,
            "pruned rich content"
        );

        doc
    }

    fn prune_children(
        &mut self,
        parent: ElementRef<'_>,
        allow: &AllowList,
        depth: usize,
    ) -> Vec<RichNode> {
        let mut nodes = Vec::new();

        for child in parent.children() {
            match child.value() {
                Node::Text(text) => nodes.push(RichNode::Text(String::from(&**text))),
                Node::Element(_) => {
                    if let Some(node) =
                        ElementRef::wrap(child).and_then(|el| self.prune_element(el, allow, depth))
                    {
                        nodes.push(node);
                    }
                }
                _ => {}
            }
        }

        nodes
    }

    fn prune_element(
        &mut self,
        element: ElementRef<'_>,
        allow: &AllowList,
        depth: usize,
    ) -> Option<RichNode> {
        let name = element.value().name();
        if depth >= MAX_DEPTH || !allow.allows_tag(name) {
            self.dropped_elements += 1;
            return None;
        }

        let mut attributes = Vec::new();
        for (attr, value) in element.value().attrs() {
            if !allow.allows_attribute(attr) {
                self.dropped_attributes += 1;
                continue;
            }

            let attr = attr.to_ascii_lowercase();
            if URL_ATTRIBUTES.contains(&attr.as_str()) {
                match check_navigable(value) {
                    Some(url) => attributes.push((attr, url)),
                    None => self.dropped_attributes += 1,
                }
            } else {
                attributes.push((attr, value.to_string()));
            }
        }

        let name = name.to_ascii_lowercase();
        let children = if VOID_ELEMENTS.contains(&name.as_str()) {
            Vec::new()
        } else {
            self.prune_children(element, allow, depth + 1)
        };

        Some(RichNode::Element {
            name,
            attributes,
            children,
        })
    }

    /// Serializes the pruned tree. Text and attribute values are entity
    /// escaped; attribute values are always double-quoted.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }

    /// Number of elements removed (each with its subtree).
    pub fn dropped_elements(&self) -> usize {
        self.dropped_elements
    }

    /// Number of attributes removed from kept elements.
    pub fn dropped_attributes(&self) -> usize {
        self.dropped_attributes
    }
}

fn write_node(out: &mut String, node: &RichNode) {
    match node {
        RichNode::Text(text) => push_html_escaped(out, text),
        RichNode::Element {
            name,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attributes {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                push_html_escaped(out, value);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&name.as_str()) {
                return;
            }

            for child in children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

//! Rendering of the record list.
//!
//! Output is built as a small DOM tree instead of markup strings. User data
//! only ever enters the tree as [`Node::Text`], and text is escaped when the
//! tree is serialized, so a subject such as `<script>` is displayed verbatim
//! and can never turn into an element.

use std::fmt;

use crate::record_model::Record;

/// A DOM node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// A text node. Its content is never parsed as markup.
    Text { text: String },

    /// An element with ordered attributes.
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text<S: Into<String>>(text: S) -> Node {
        Node::Text { text: text.into() }
    }

    pub fn element(name: &str, attributes: &[(&str, &str)], children: Vec<Node>) -> Node {
        Node::Element {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    /// Number of elements called `name` in this subtree, including `self`.
    pub fn count_elements(&self, name: &str) -> usize {
        match self {
            Node::Text { .. } => 0,
            Node::Element { name: own, children, .. } => {
                let here = usize::from(own == name);
                here + children.iter().map(|c| c.count_elements(name)).sum::<usize>()
            }
        }
    }

    /// Concatenated text of this subtree, unescaped.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text { text } => text.clone(),
            Node::Element { children, .. } => children.iter().map(Node::text_content).collect(),
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Text { text } => f.write_str(&escape_text(text)),
            Node::Element { name, attributes, children } => {
                write!(f, "<{}", name)?;
                for (key, value) in attributes {
                    write!(f, " {}=\"{}\"", key, escape_attribute(value))?;
                }
                write!(f, ">")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, "</{}>", name)
            }
        }
    }
}

/// Where the store draws the list. Every call replaces the whole content.
pub trait RenderSurface {
    fn replace_all(&mut self, nodes: Vec<Node>);
}

/// A surface that keeps the rendered tree and can serialize it to HTML.
#[derive(Debug, Default, Clone)]
pub struct HtmlSurface {
    nodes: Vec<Node>,
    renders: usize,
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn html(&self) -> String {
        self.nodes.iter().map(|n| n.to_string()).collect()
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl RenderSurface for HtmlSurface {
    fn replace_all(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.renders += 1;
    }
}

/// Builds the nodes for a record collection.
pub struct RecordView;

impl RecordView {
    pub fn build(records: &[Record], empty_message: &str) -> Vec<Node> {
        if records.is_empty() {
            return vec![Node::element(
                "p",
                &[("class", "empty-state")],
                vec![Node::text(empty_message)],
            )];
        }

        let items = records.iter().map(Self::item).collect();
        vec![Node::element("ul", &[("class", "record-list")], items)]
    }

    fn item(record: &Record) -> Node {
        let id = record.id();
        Node::element(
            "li",
            &[("class", "record"), ("data-id", id)],
            vec![
                Node::element("span", &[("class", "record-subject")], vec![Node::text(record.subject())]),
                Node::element(
                    "span",
                    &[("class", "record-frequency")],
                    vec![Node::text(format!("{} a settimana", record.frequency_per_week()))],
                ),
                Node::element(
                    "span",
                    &[("class", "record-students")],
                    vec![Node::text(format!("{} alunni per lezione", record.students_per_session()))],
                ),
                Node::element("span", &[("class", "record-date")], vec![Node::text(record.created_at())]),
                Node::element(
                    "button",
                    &[("type", "button"), ("class", "record-delete"), ("data-id", id)],
                    vec![Node::text("Elimina")],
                ),
            ],
        )
    }
}

//! Typed rich-text tree
//!
//! Remote documents describe rich text as loosely-typed JSON nodes
//! (`{"type": "paragraph", "content": [...]}`). [`MarkupNode::from_value`]
//! turns any JSON value into this closed tree without failing; node types it
//! does not recognize land in [`MarkupNode::Other`].

use serde_json::Value;

/// A node of a rich-text document
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Document(Vec<MarkupNode>),
    Paragraph(Vec<MarkupNode>),
    Heading { level: u8, content: Vec<MarkupNode> },
    BulletList(Vec<MarkupNode>),
    OrderedList(Vec<MarkupNode>),
    ListItem(Vec<MarkupNode>),
    Text { text: String, marks: Vec<Mark> },
    Other { text: Option<String>, content: Vec<MarkupNode> },
}

/// Inline formatting applied to a text node
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Link { href: String },
    Other(String),
}

impl MarkupNode {
    /// Plain text node without marks
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Builds a node from arbitrary JSON
    ///
    /// Arrays become an untyped container, strings become text, other scalars
    /// are stringified and `null` is an empty container.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let content = map
                    .get("content")
                    .map(children_from_value)
                    .unwrap_or_default();
                let tag = map.get("type").and_then(Value::as_str).unwrap_or_default();

                match tag {
                    "doc" | "document" => Self::Document(content),
                    "paragraph" => Self::Paragraph(content),
                    "heading" => Self::Heading {
                        level: heading_level(map.get("attrs")),
                        content,
                    },
                    "bulletList" | "bullet_list" => Self::BulletList(content),
                    "orderedList" | "ordered_list" => Self::OrderedList(content),
                    "listItem" | "list_item" => Self::ListItem(content),
                    "text" => Self::Text {
                        text: map
                            .get("text")
                            .map(scalar_text)
                            .unwrap_or_default(),
                        marks: map
                            .get("marks")
                            .and_then(Value::as_array)
                            .map(|marks| marks.iter().map(Mark::from_value).collect())
                            .unwrap_or_default(),
                    },
                    _ => Self::Other {
                        text: map.get("text").map(scalar_text),
                        content,
                    },
                }
            }
            Value::Array(items) => Self::Other {
                text: None,
                content: items.iter().map(Self::from_value).collect(),
            },
            Value::Null => Self::Other {
                text: None,
                content: Vec::new(),
            },
            scalar => Self::text(scalar_text(scalar)),
        }
    }

    /// Whether this node renders inline (as part of a line) rather than as a block
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

impl Mark {
    fn from_value(value: &Value) -> Self {
        let (tag, attrs) = match value {
            Value::String(tag) => (tag.as_str(), None),
            Value::Object(map) => (
                map.get("type").and_then(Value::as_str).unwrap_or_default(),
                map.get("attrs"),
            ),
            _ => ("", None),
        };

        match tag {
            "bold" | "strong" => Self::Bold,
            "italic" | "em" => Self::Italic,
            "code" => Self::Code,
            "link" => Self::Link {
                href: attrs
                    .and_then(|a| a.get("href"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            other => Self::Other(other.to_string()),
        }
    }
}

fn children_from_value(value: &Value) -> Vec<MarkupNode> {
    match value {
        Value::Array(items) => items.iter().map(MarkupNode::from_value).collect(),
        Value::Null => Vec::new(),
        other => vec![MarkupNode::from_value(other)],
    }
}

fn heading_level(attrs: Option<&Value>) -> u8 {
    attrs
        .and_then(|a| a.get("level"))
        .and_then(Value::as_u64)
        .map(|level| level.clamp(1, 6) as u8)
        .unwrap_or(1)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

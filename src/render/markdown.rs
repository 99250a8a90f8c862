//! Markdown rendering for typed rich-text trees
//!
//! Rendering is a recursive descent over [`MarkupNode`]. It never fails: node
//! types without a dedicated rule fall back to the concatenation of every text
//! leaf they contain.
//!
//! Known limitation: a list nested inside a list item is not rendered as a
//! sub-list. The item's line carries the nested list's text flattened.

use crate::model::{Mark, MarkupNode};
use serde_json::Value;

/// Renders a markup tree as markdown
///
/// # Examples
///
/// ```
/// use sumi_archive::model::MarkupNode;
/// use sumi_archive::render::render_markdown;
///
/// let doc = MarkupNode::Document(vec![
///     MarkupNode::Heading { level: 2, content: vec![MarkupNode::text("Notes")] },
///     MarkupNode::Paragraph(vec![MarkupNode::text("Hello")]),
/// ]);
/// assert_eq!(render_markdown(&doc), "## Notes\n\nHello");
/// ```
pub fn render_markdown(node: &MarkupNode) -> String {
    match node {
        MarkupNode::Document(content) | MarkupNode::Paragraph(content) => join_blocks(content),

        MarkupNode::Heading { level, content } => {
            let level = (*level).clamp(1, 6) as usize;
            format!("{} {}", "#".repeat(level), flatten_all(content))
        }

        MarkupNode::BulletList(items) | MarkupNode::OrderedList(items) => items
            .iter()
            .map(|item| format!("- {}", list_item_text(item)))
            .collect::<Vec<_>>()
            .join("\n"),

        MarkupNode::ListItem(_) => format!("- {}", list_item_text(node)),

        MarkupNode::Text { text, marks } => apply_marks(text, marks),

        MarkupNode::Other { .. } => flatten_text(node),
    }
}

/// Renders a page body as it arrives from the remote
///
/// Strings are already markdown and pass through; objects and arrays are
/// parsed as a markup tree; `null` renders as nothing.
pub fn render_content(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => render_markdown(&MarkupNode::from_value(value)),
        other => other.to_string(),
    }
}

/// Concatenates every text leaf under `node`, depth first, ignoring marks
pub fn flatten_text(node: &MarkupNode) -> String {
    match node {
        MarkupNode::Text { text, .. } => text.clone(),
        MarkupNode::Other { text, content } => {
            let mut out = text.clone().unwrap_or_default();
            out.push_str(&flatten_all(content));
            out
        }
        MarkupNode::Document(content)
        | MarkupNode::Paragraph(content)
        | MarkupNode::Heading { content, .. }
        | MarkupNode::BulletList(content)
        | MarkupNode::OrderedList(content)
        | MarkupNode::ListItem(content) => flatten_all(content),
    }
}

fn flatten_all(nodes: &[MarkupNode]) -> String {
    nodes.iter().map(flatten_text).collect()
}

/// Text of one list line: the item's immediate children, flattened
fn list_item_text(item: &MarkupNode) -> String {
    match item {
        MarkupNode::ListItem(children) => flatten_all(children).trim().to_string(),
        other => flatten_text(other).trim().to_string(),
    }
}

/// Joins rendered children: inline runs are glued, blocks are separated by a blank line
fn join_blocks(content: &[MarkupNode]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut inline_run = String::new();

    for child in content {
        if child.is_inline() {
            inline_run.push_str(&render_markdown(child));
            continue;
        }

        if !inline_run.is_empty() {
            blocks.push(std::mem::take(&mut inline_run));
        }
        let rendered = render_markdown(child);
        if !rendered.trim().is_empty() {
            blocks.push(rendered);
        }
    }

    if !inline_run.is_empty() {
        blocks.push(inline_run);
    }

    blocks.join("\n\n")
}

/// Wraps `text` in each mark's syntax, innermost first in encounter order
fn apply_marks(text: &str, marks: &[Mark]) -> String {
    marks.iter().fold(text.to_string(), |acc, mark| match mark {
        Mark::Bold => format!("**{}**", acc),
        Mark::Italic => format!("*{}*", acc),
        Mark::Code => format!("`{}`", acc),
        Mark::Link { href } => format!("[{}]({})", acc, href),
        Mark::Other(_) => acc,
    })
}

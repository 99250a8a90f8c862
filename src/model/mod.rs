//! Domain model for the archived workspace
//!
//! - `ContentNode`: a container (space, folder, list, document) with a parent reference
//! - `PageNode`: one page of a document
//! - `MarkupNode`: a typed rich-text tree parsed from remote JSON
//! - `TabularRecord`: an arbitrary keyed record (a task) destined for CSV

mod markup;
mod node;

pub use markup::{Mark, MarkupNode};
pub use node::{parse_timestamp, ContentNode, NodeKind, PageNode};

/// An arbitrary keyed bag of JSON values
///
/// `serde_json::Value` is already a closed tagged variant type, so flattening
/// can match on it exhaustively.
pub type TabularRecord = serde_json::Map<String, serde_json::Value>;

/// Returns the identity of a record, accepting string or numeric ids
pub fn record_id(record: &TabularRecord) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

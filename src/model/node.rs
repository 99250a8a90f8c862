use chrono::{DateTime, Utc};
use std::fmt;

/// Kind of a remote container node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Workspace,
    Space,
    Folder,
    /// A leaf-group: an enumerable collection of task records
    List,
    /// A content container whose body is a set of pages
    Document,
    /// Any kind the remote reported that this archiver does not know
    Other(String),
}

impl NodeKind {
    /// Parses a remote type tag; unknown tags are kept verbatim
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "workspace" | "team" => Self::Workspace,
            "space" => Self::Space,
            "folder" | "project" => Self::Folder,
            "list" => Self::List,
            "doc" | "document" => Self::Document,
            _ => Self::Other(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Workspace => "workspace",
            Self::Space => "space",
            Self::Folder => "folder",
            Self::List => "list",
            Self::Document => "document",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote container (space, folder, list or document)
///
/// `parent_id` is a reference, not ownership. `children` stays empty until
/// [`crate::tree::build_forest`] attaches the nodes that reference this one.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<String>,
    pub children: Vec<ContentNode>,
    pub pages: Vec<PageNode>,
}

impl ContentNode {
    /// Creates a node with no parent, children or pages
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: None,
            children: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// Sets the parent reference
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Number of nodes in this subtree, this node included
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ContentNode::subtree_len).sum::<usize>()
    }
}

/// One page of a document
#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    pub id: String,
    pub name: String,
    /// Markdown body, already rendered from the remote representation
    pub content: String,
    /// Either the owning document's id or another page's id
    pub parent_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// False when the content request for this page was rate limited or failed
    pub content_fetched: bool,
}

impl PageNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: String::new(),
            parent_id: None,
            created_at: None,
            updated_at: None,
            content_fetched: true,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Parses a remote timestamp: epoch milliseconds (number or numeric string) or RFC 3339
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        serde_json::Value::String(s) => match s.trim().parse::<i64>() {
            Ok(millis) => DateTime::from_timestamp_millis(millis),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    }
}

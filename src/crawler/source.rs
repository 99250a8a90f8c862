//! The fetch collaborator seam
//!
//! [`WorkspaceSource`] is everything the orchestrator needs from the remote
//! workspace. Capability absence is a value (`Probe::Unsupported`), not an
//! error; a rate limit is its own error variant so callers can tell it apart
//! from real failures.

use crate::model::{ContentNode, NodeKind, PageNode, TabularRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`WorkspaceSource`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Rate limited on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("HTTP {status} from {endpoint}")]
    Http { endpoint: String, status: u16 },

    #[error("Network error on {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("Could not decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// An identifier needed to address the remote is missing
    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether this failure invalidates the enclosing subtree instead of one item
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::MissingIdentifier(_))
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Outcome of asking the remote for something it may not offer
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Found(T),
    /// The remote has no such capability here; treat as zero children
    Unsupported,
}

impl<T> Probe<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Unsupported => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }
}

/// One page of a paginated record listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<TabularRecord>,
    /// The remote reported that no further page exists
    pub last_page: bool,
}

/// Index through which documents are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentIndex {
    /// The document listing filtered by parent container
    Documents,
    /// Document-typed views attached to a container
    Views,
}

/// Both document indexes, in the order they are consulted
pub const DOCUMENT_INDEXES: [DocumentIndex; 2] = [DocumentIndex::Documents, DocumentIndex::Views];

/// Listing calls whose support depends on the parent's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Containers,
    LeafGroups,
    Documents,
}

/// Endpoint shape used to fetch the pages of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStrategy {
    /// One request returning every page with its content
    DocumentPages,
    /// A page listing without content; each page is then fetched on its own
    PageListing,
}

impl PageStrategy {
    /// Whether the pages found need a [`WorkspaceSource::page_detail`] call each
    pub fn fetches_each_page(self) -> bool {
        matches!(self, Self::PageListing)
    }
}

/// Page strategies in the order they are tried; the first success wins
pub const PAGE_STRATEGIES: [PageStrategy; 2] =
    [PageStrategy::DocumentPages, PageStrategy::PageListing];

impl std::fmt::Display for PageStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentPages => f.write_str("document pages"),
            Self::PageListing => f.write_str("page listing"),
        }
    }
}

/// Read access to a remote workspace
///
/// Calls are issued one at a time by the orchestrator, which also applies
/// the pacing delay between them. Every call that reaches the remote is one
/// request.
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    /// Whether `listing` under a `kind` parent reaches the remote
    ///
    /// A source that answers `Probe::Unsupported` locally returns `false`, so
    /// the call is neither paced nor counted as a request.
    fn is_remote(&self, _listing: Listing, _kind: &NodeKind) -> bool {
        true
    }

    /// Sub-containers of `parent`: spaces of a workspace, folders of a space.
    /// Folders and lists usually answer `Unsupported`.
    async fn containers(&self, parent: &ContentNode) -> FetchResult<Probe<Vec<ContentNode>>>;

    /// Record lists directly inside `parent`
    async fn leaf_groups(&self, parent: &ContentNode) -> FetchResult<Probe<Vec<ContentNode>>>;

    /// Documents attached to `parent`, enumerated through `index`
    async fn documents(
        &self,
        parent: &ContentNode,
        index: DocumentIndex,
    ) -> FetchResult<Probe<Vec<ContentNode>>>;

    /// Page `page` (zero-based) of the records of `list`
    async fn records(&self, list: &ContentNode, page: u32) -> FetchResult<Probe<RecordPage>>;

    /// Full version of a single record
    async fn record_detail(&self, record_id: &str) -> FetchResult<Probe<TabularRecord>>;

    /// Every page of `document`, fetched with `strategy`
    ///
    /// With [`PageStrategy::PageListing`] the pages come without content.
    async fn pages(
        &self,
        document: &ContentNode,
        strategy: PageStrategy,
    ) -> FetchResult<Probe<Vec<PageNode>>>;

    /// A single page of `document` with its content
    async fn page_detail(
        &self,
        document: &ContentNode,
        page_id: &str,
    ) -> FetchResult<Probe<PageNode>>;
}

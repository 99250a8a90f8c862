//! HTTP workspace source
//!
//! This module implements [`WorkspaceSource`] over the remote REST API:
//! - Building the HTTP client with user agent, timeout and token
//! - Mapping endpoint status codes onto `Probe`/`FetchError`
//! - Parsing listing bodies into content nodes, records and pages
//!
//! # Status mapping
//!
//! | Condition | Result |
//! |-----------|--------|
//! | 2xx | `Probe::Found` |
//! | 404 / 405 / 501 | `Probe::Unsupported` |
//! | 429 | `FetchError::RateLimited` |
//! | other status | `FetchError::Http` |
//! | transport failure | `FetchError::Network` |
//! | body is not JSON | `FetchError::Decode` |

use crate::config::{ApiConfig, Config};
use crate::crawler::source::{
    DocumentIndex, FetchError, FetchResult, Listing, PageStrategy, Probe, RecordPage,
    WorkspaceSource,
};
use crate::model::{parse_timestamp, ContentNode, NodeKind, PageNode, TabularRecord};
use crate::render::render_content;
use crate::{ArchiveError, ConfigError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client for the remote API
///
/// # Arguments
///
/// * `api` - The API configuration (timeout)
/// * `token` - The resolved API token, sent as the `Authorization` header
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ArchiveError)` - The token is not a valid header value, or the client failed to build
pub fn build_http_client(api: &ApiConfig, token: &str) -> crate::Result<Client> {
    let user_agent = format!("sumi-archive/{}", env!("CARGO_PKG_VERSION"));

    let mut auth = HeaderValue::from_str(token).map_err(|_| {
        ConfigError::Validation("API token contains characters not allowed in a header".to_string())
    })?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(api.timeout_secs))
        .connect_timeout(Duration::from_secs(api.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// [`WorkspaceSource`] backed by the REST API
pub struct HttpSource {
    client: Client,
    base_url: Url,
    workspace_id: String,
}

impl HttpSource {
    /// Creates a source for `workspace_id` served under `base_url`
    pub fn new(
        client: Client,
        base_url: &str,
        workspace_id: impl Into<String>,
    ) -> crate::Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            workspace_id: workspace_id.into(),
        })
    }

    /// Creates a source from the configuration and a resolved token
    pub fn from_config(config: &Config, token: &str) -> Result<Self, ArchiveError> {
        let client = build_http_client(&config.api, token)?;
        Self::new(client, &config.api.base_url, config.workspace.root_id.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn workspace(&self) -> FetchResult<&str> {
        require_id(&self.workspace_id, "workspace")
    }

    /// Issues a GET and maps the status onto `Probe`/`FetchError`
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> FetchResult<Probe<Value>> {
        let url = self.base_url.join(path).map_err(|e| FetchError::Network {
            endpoint: path.to_string(),
            reason: format!("invalid endpoint URL: {}", e),
        })?;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                endpoint: path.to_string(),
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                endpoint: path.to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND
            || status == StatusCode::METHOD_NOT_ALLOWED
            || status == StatusCode::NOT_IMPLEMENTED
        {
            tracing::debug!("{} answered {}, treating as unsupported", path, status.as_u16());
            return Ok(Probe::Unsupported);
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Network {
            endpoint: path.to_string(),
            reason: describe_transport_error(&e),
        })?;

        serde_json::from_str(&body)
            .map(Probe::Found)
            .map_err(|e| FetchError::Decode {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn list_nodes(
        &self,
        path: &str,
        key: &str,
        kind: NodeKind,
        parent_id: &str,
    ) -> FetchResult<Probe<Vec<ContentNode>>> {
        Ok(match self.get_json(path, &[]).await? {
            Probe::Found(body) => Probe::Found(parse_containers(&body, key, kind, parent_id)),
            Probe::Unsupported => Probe::Unsupported,
        })
    }

    async fn document_pages(&self, document_id: &str) -> FetchResult<Probe<Vec<PageNode>>> {
        let path = format!(
            "v3/workspaces/{}/docs/{}/pages",
            self.workspace()?,
            document_id
        );
        let query = [
            ("max_page_depth", "-1".to_string()),
            ("content_format", "text/md".to_string()),
        ];

        Ok(match self.get_json(&path, &query).await? {
            Probe::Found(body) => Probe::Found(parse_pages(&body)),
            Probe::Unsupported => Probe::Unsupported,
        })
    }

    async fn listed_pages(&self, document_id: &str) -> FetchResult<Probe<Vec<PageNode>>> {
        let path = format!(
            "v3/workspaces/{}/docs/{}/page_listing",
            self.workspace()?,
            document_id
        );

        Ok(match self.get_json(&path, &[("max_page_depth", "-1".to_string())]).await? {
            Probe::Found(body) => Probe::Found(parse_pages(&body)),
            Probe::Unsupported => Probe::Unsupported,
        })
    }
}

#[async_trait]
impl WorkspaceSource for HttpSource {
    fn is_remote(&self, listing: Listing, kind: &NodeKind) -> bool {
        match listing {
            Listing::Containers => matches!(kind, NodeKind::Workspace | NodeKind::Space),
            Listing::LeafGroups => matches!(kind, NodeKind::Space | NodeKind::Folder),
            Listing::Documents => {
                matches!(kind, NodeKind::Space | NodeKind::Folder | NodeKind::List)
            }
        }
    }

    async fn containers(&self, parent: &ContentNode) -> FetchResult<Probe<Vec<ContentNode>>> {
        match parent.kind {
            NodeKind::Workspace => {
                let id = require_id(&parent.id, "workspace")?;
                let path = format!("v2/team/{}/space", id);
                self.list_nodes(&path, "spaces", NodeKind::Space, id).await
            }
            NodeKind::Space => {
                let id = require_id(&parent.id, "space")?;
                let path = format!("v2/space/{}/folder", id);
                self.list_nodes(&path, "folders", NodeKind::Folder, id).await
            }
            _ => Ok(Probe::Unsupported),
        }
    }

    async fn leaf_groups(&self, parent: &ContentNode) -> FetchResult<Probe<Vec<ContentNode>>> {
        let path = match parent.kind {
            NodeKind::Space => format!("v2/space/{}/list", require_id(&parent.id, "space")?),
            NodeKind::Folder => format!("v2/folder/{}/list", require_id(&parent.id, "folder")?),
            _ => return Ok(Probe::Unsupported),
        };
        self.list_nodes(&path, "lists", NodeKind::List, &parent.id)
            .await
    }

    async fn documents(
        &self,
        parent: &ContentNode,
        index: DocumentIndex,
    ) -> FetchResult<Probe<Vec<ContentNode>>> {
        let segment = match parent.kind {
            NodeKind::Space => "space",
            NodeKind::Folder => "folder",
            NodeKind::List => "list",
            _ => return Ok(Probe::Unsupported),
        };
        let id = require_id(&parent.id, segment)?;

        match index {
            DocumentIndex::Documents => {
                let path = format!("v3/workspaces/{}/docs", self.workspace()?);
                let query = [("parent_id", id.to_string())];
                Ok(match self.get_json(&path, &query).await? {
                    Probe::Found(body) => Probe::Found(parse_documents(&body)),
                    Probe::Unsupported => Probe::Unsupported,
                })
            }
            DocumentIndex::Views => {
                let path = format!("v2/{}/{}/view", segment, id);
                Ok(match self.get_json(&path, &[]).await? {
                    Probe::Found(body) => Probe::Found(parse_document_views(&body, id)),
                    Probe::Unsupported => Probe::Unsupported,
                })
            }
        }
    }

    async fn records(&self, list: &ContentNode, page: u32) -> FetchResult<Probe<RecordPage>> {
        let path = format!("v2/list/{}/task", require_id(&list.id, "list")?);
        let query = [
            ("page", page.to_string()),
            ("subtasks", "true".to_string()),
            ("include_closed", "true".to_string()),
        ];

        Ok(match self.get_json(&path, &query).await? {
            Probe::Found(body) => Probe::Found(parse_record_page(&body)),
            Probe::Unsupported => Probe::Unsupported,
        })
    }

    async fn record_detail(&self, record_id: &str) -> FetchResult<Probe<TabularRecord>> {
        let path = format!("v2/task/{}", require_id(record_id, "task")?);
        let query = [("include_subtasks", "true".to_string())];

        match self.get_json(&path, &query).await? {
            Probe::Found(Value::Object(record)) => Ok(Probe::Found(record)),
            Probe::Found(_) => Err(FetchError::Decode {
                endpoint: path,
                reason: "task detail is not an object".to_string(),
            }),
            Probe::Unsupported => Ok(Probe::Unsupported),
        }
    }

    async fn pages(
        &self,
        document: &ContentNode,
        strategy: PageStrategy,
    ) -> FetchResult<Probe<Vec<PageNode>>> {
        let id = require_id(&document.id, "document")?;
        match strategy {
            PageStrategy::DocumentPages => self.document_pages(id).await,
            PageStrategy::PageListing => self.listed_pages(id).await,
        }
    }

    async fn page_detail(
        &self,
        document: &ContentNode,
        page_id: &str,
    ) -> FetchResult<Probe<PageNode>> {
        let path = format!(
            "v3/workspaces/{}/docs/{}/pages/{}",
            self.workspace()?,
            require_id(&document.id, "document")?,
            require_id(page_id, "page")?
        );
        let query = [("content_format", "text/md".to_string())];

        Ok(match self.get_json(&path, &query).await? {
            Probe::Found(body) => Probe::Found(page_from(&body, page_id.to_string(), None)),
            Probe::Unsupported => Probe::Unsupported,
        })
    }
}

fn require_id<'a>(id: &'a str, what: &str) -> FetchResult<&'a str> {
    if id.trim().is_empty() {
        Err(FetchError::MissingIdentifier(format!("{} id is empty", what)))
    } else {
        Ok(id)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}

/// Identifier under `key`, accepting strings and numbers
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty string among `keys`
fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Items of a listing body: `body[key]`, or the body itself when it is an array
fn listing_items<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    match body {
        Value::Array(items) => items.as_slice(),
        other => other
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    }
}

fn parse_containers(body: &Value, key: &str, kind: NodeKind, parent_id: &str) -> Vec<ContentNode> {
    listing_items(body, key)
        .iter()
        .filter_map(|item| {
            let Some(id) = id_field(item, "id") else {
                tracing::debug!("Skipping {} entry without id", kind);
                return None;
            };
            let name = text_field(item, &["name"]).unwrap_or_default();
            Some(ContentNode::new(id, name, kind.clone()).with_parent(parent_id))
        })
        .collect()
}

/// Parent reference of a document: an explicit parent document, else the `parent` object
fn document_parent(item: &Value) -> Option<String> {
    id_field(item, "parent_doc_id")
        .or_else(|| id_field(item, "parent_id"))
        .or_else(|| item.get("parent").and_then(|p| id_field(p, "id")))
}

fn parse_documents(body: &Value) -> Vec<ContentNode> {
    listing_items(body, "docs")
        .iter()
        .filter(|item| !item.get("deleted").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|item| {
            let id = id_field(item, "id")?;
            let name = text_field(item, &["name", "title"]).unwrap_or_default();
            let mut node = ContentNode::new(id, name, NodeKind::Document);
            node.parent_id = document_parent(item);
            Some(node)
        })
        .collect()
}

fn parse_document_views(body: &Value, container_id: &str) -> Vec<ContentNode> {
    listing_items(body, "views")
        .iter()
        .filter(|item| {
            item.get("type").and_then(Value::as_str).map(NodeKind::from_tag)
                == Some(NodeKind::Document)
        })
        .filter_map(|item| {
            let id = id_field(item, "id")?;
            let name = text_field(item, &["name"]).unwrap_or_default();
            let parent = item
                .get("parent")
                .and_then(|p| id_field(p, "id"))
                .unwrap_or_else(|| container_id.to_string());
            Some(ContentNode::new(id, name, NodeKind::Document).with_parent(parent))
        })
        .collect()
}

fn parse_record_page(body: &Value) -> RecordPage {
    let records: Vec<TabularRecord> = listing_items(body, "tasks")
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect();
    let last_page = body
        .get("last_page")
        .and_then(Value::as_bool)
        .unwrap_or(records.is_empty());

    RecordPage { records, last_page }
}

/// Flattens a (possibly nested) page array into page nodes
fn parse_pages(body: &Value) -> Vec<PageNode> {
    let mut pages = Vec::new();
    flatten_pages(listing_items(body, "pages"), None, &mut pages);
    pages
}

fn flatten_pages(items: &[Value], nesting_parent: Option<&str>, out: &mut Vec<PageNode>) {
    for item in items {
        let Some(id) = id_field(item, "id") else {
            tracing::debug!("Skipping page entry without id");
            continue;
        };

        out.push(page_from(item, id.clone(), nesting_parent));

        if let Some(children) = item.get("pages").and_then(Value::as_array) {
            flatten_pages(children, Some(id.as_str()), out);
        }
    }
}

/// Builds a page from its JSON object; `nesting_parent` fills a missing `parent_page_id`
fn page_from(item: &Value, id: String, nesting_parent: Option<&str>) -> PageNode {
    let mut page = PageNode::new(id, text_field(item, &["name", "title"]).unwrap_or_default());
    page.content = item.get("content").map(render_content).unwrap_or_default();
    page.parent_id =
        id_field(item, "parent_page_id").or_else(|| nesting_parent.map(str::to_string));
    page.created_at = item.get("date_created").and_then(parse_timestamp);
    page.updated_at = item.get("date_updated").and_then(parse_timestamp);
    page
}

//! Archive coordinator - main traversal logic
//!
//! This module walks the remote hierarchy and writes the archive:
//! - workspace → spaces, each archived in isolation
//! - space/folder → sub-containers, record lists and documents
//! - list → task records (with lazy completion) into one CSV file
//! - document → pages, placed into a page hierarchy of markdown files
//!
//! # Failure policy
//!
//! | Condition | Action |
//! |-----------|--------|
//! | `Probe::Unsupported` | zero children of that kind |
//! | Rate limit | retried after the fixed delay, then handled as below |
//! | Rate limit on a listing | log progress, zero children |
//! | Rate limit on a record detail | keep the partial record |
//! | Rate limit on a page's content | keep the page, marked as not fetched |
//! | Unreadable record page | skip that page, continue with the next one |
//! | Other fetch failure | log, skip the item, siblings continue |
//! | Missing identifier / output not writable | abort the enclosing space |

use crate::config::{Config, TabularMode};
use crate::crawler::discovery::DiscoveryMap;
use crate::crawler::pacing::Pacer;
use crate::crawler::source::{
    FetchError, FetchResult, Listing, Probe, WorkspaceSource, DOCUMENT_INDEXES, PAGE_STRATEGIES,
};
use crate::model::{record_id, ContentNode, NodeKind, PageNode, TabularRecord};
use crate::output::{
    write_batch, write_page_slots, OutputResult, OutputTree, StreamingTableWriter, TableSummary,
    SUMMARY_FILE_NAME,
};
use crate::state::{ContainerStats, ItemOutcome, LevelProgress, RunReport, SubtreeOutcome};
use crate::tree::{build_forest, build_page_hierarchy};
use crate::{ArchiveError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fields whose absence marks a listed record as partial
pub const COMPLETE_FIELDS: [&str; 3] = ["description", "custom_fields", "checklists"];

/// Upper bound on record pages fetched for one list
pub const MAX_RECORD_PAGES: u32 = 1000;

/// Retries of a rate-limited call before its item is given up
pub const RATE_LIMIT_RETRIES: u32 = 2;

/// Unreadable record pages in a row after which a list is given up
const MAX_MISSED_RECORD_PAGES: u32 = 3;

/// Directory under each space holding its documents
const DOCS_DIR: &str = "docs";

/// Issues one source call through the orchestrator's pacer
///
/// A rate-limited call is retried up to [`RATE_LIMIT_RETRIES`] times, each
/// after the fixed delay. A call the source answers locally (`remote` false)
/// is neither paced nor counted.
macro_rules! paced {
    ($orchestrator:ident, $call:expr) => {
        paced!($orchestrator, true, $call)
    };
    ($orchestrator:ident, $remote:expr, $call:expr) => {{
        if $remote {
            let mut retries = 0;
            loop {
                $orchestrator.pacer.wait().await;
                match $call.await {
                    Err(e) if e.is_rate_limited() && retries < RATE_LIMIT_RETRIES => {
                        $orchestrator.pacer.note_rate_limit();
                        retries += 1;
                        tracing::debug!("{}, retry {} of {}", e, retries, RATE_LIMIT_RETRIES);
                    }
                    result => break result,
                }
            }
        } else {
            $call.await
        }
    }};
}

/// What to archive and where, resolved from the configuration
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub workspace_id: String,
    pub scope_id: Option<String>,
    pub output_dir: PathBuf,
    pub include_docs: bool,
    pub include_tasks: bool,
    pub tabular_mode: TabularMode,
    pub request_delay: Duration,
}

impl ArchiveOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workspace_id: config.workspace.root_id.clone(),
            scope_id: config.workspace.scope_id.clone(),
            output_dir: PathBuf::from(&config.export.output_dir),
            include_docs: config.export.include_docs,
            include_tasks: config.export.include_tasks,
            tabular_mode: config.export.tabular_mode,
            request_delay: Duration::from_millis(config.api.request_delay_ms),
        }
    }
}

/// A container with the directory its children are written into
struct Placed {
    node: ContentNode,
    dir: PathBuf,
}

/// A fetch result after failure handling
enum Settled<T> {
    Found(T),
    Unsupported,
    /// Rate limited or failed; already logged and counted
    Missed,
}

/// Destination of one list's records
enum TableSink {
    Streaming(StreamingTableWriter),
    Batch {
        path: PathBuf,
        records: Vec<TabularRecord>,
    },
}

impl TableSink {
    fn new(mode: TabularMode, path: PathBuf) -> Self {
        match mode {
            TabularMode::Streaming => Self::Streaming(StreamingTableWriter::create(path)),
            TabularMode::Batch => Self::Batch {
                path,
                records: Vec::new(),
            },
        }
    }

    fn push(&mut self, record: TabularRecord) -> OutputResult<()> {
        match self {
            Self::Streaming(writer) => writer.observe(&record),
            Self::Batch { records, .. } => {
                records.push(record);
                Ok(())
            }
        }
    }

    fn finish(self) -> OutputResult<TableSummary> {
        match self {
            Self::Streaming(writer) => writer.finalize(),
            Self::Batch { records, .. } if records.is_empty() => Ok(TableSummary::default()),
            Self::Batch { path, records } => write_batch(&path, &records),
        }
    }
}

/// Walks a workspace through a [`WorkspaceSource`] and writes the archive
pub struct Orchestrator<S> {
    source: S,
    options: ArchiveOptions,
    pacer: Pacer,
    /// Documents of the space being archived, merged across discovery paths
    documents: DiscoveryMap<ContentNode>,
    tree: OutputTree,
}

impl<S: WorkspaceSource> Orchestrator<S> {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `source` - The remote workspace to read from
    /// * `options` - What to archive and where
    pub fn new(source: S, options: ArchiveOptions) -> Self {
        let pacer = Pacer::new(options.request_delay);
        Self {
            source,
            options,
            pacer,
            documents: DiscoveryMap::new(),
            tree: OutputTree::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Runs the archive
    ///
    /// Each space is archived in isolation: a structural failure inside one
    /// space is recorded in the report and the next space proceeds. Only a
    /// failure before any space is reached (output root not writable, the
    /// workspace itself not addressable) fails the run.
    pub async fn run(&mut self) -> Result<RunReport> {
        let mut report = RunReport::begin(
            self.options.workspace_id.clone(),
            self.options.scope_id.clone(),
            self.options.output_dir.display().to_string(),
        );
        tracing::info!(
            "Archiving workspace {} into {}",
            self.options.workspace_id,
            self.options.output_dir.display()
        );

        let root = self.options.output_dir.clone();
        fs::create_dir_all(&root)?;
        self.tree.reserve(&root, SUMMARY_FILE_NAME);

        let workspace = ContentNode::new(
            self.options.workspace_id.clone(),
            self.options.workspace_id.clone(),
            NodeKind::Workspace,
        );
        let spaces = {
            let progress = LevelProgress::new("workspace", 1);
            let mut stats = ContainerStats::default();
            let remote = self.source.is_remote(Listing::Containers, &workspace.kind);
            let result = paced!(self, remote, self.source.containers(&workspace));
            self.settle(result, &workspace.id, &progress, &mut stats)?
                .unwrap_or_default()
        };

        let spaces = match &self.options.scope_id {
            Some(scope) => {
                let scoped: Vec<ContentNode> =
                    spaces.into_iter().filter(|s| &s.id == scope).collect();
                if scoped.is_empty() {
                    tracing::warn!(
                        "Scope {} is not a space of workspace {}",
                        scope,
                        self.options.workspace_id
                    );
                }
                scoped
            }
            None => spaces,
        };

        tracing::info!("Found {} space(s) to archive", spaces.len());
        let mut progress = LevelProgress::new("space", spaces.len());

        for space in spaces {
            let mut stats = ContainerStats::default();
            let outcome = match self.archive_space(&space, &mut stats).await {
                Ok(()) => {
                    tracing::info!(
                        "Archived space {} ({} records, {} pages)",
                        space.name,
                        stats.records,
                        stats.pages
                    );
                    SubtreeOutcome::completed(space.id, space.name, stats)
                }
                Err(e) => {
                    tracing::error!("Space {} ({}) aborted: {}", space.name, space.id, e);
                    self.documents.drain();
                    SubtreeOutcome::failed(space.id, space.name, e.to_string(), stats)
                }
            };
            report.subtrees.push(outcome);
            progress.advance();
            tracing::debug!("Progress: {}", progress);
        }

        report.requests = self.pacer.requests();
        report.rate_limit_hits = self.pacer.rate_limit_hits();
        report.finish();
        Ok(report)
    }

    async fn archive_space(&mut self, space: &ContentNode, stats: &mut ContainerStats) -> Result<()> {
        let root = self.options.output_dir.clone();
        let stem = self.tree.allocate(&root, &space.name);
        let space_dir = root.join(stem);
        create_dir(&space.id, &space_dir)?;
        self.tree.reserve(&space_dir, DOCS_DIR);

        let mut walk = LevelProgress::new("container", 1);
        let mut stack = vec![Placed {
            node: space.clone(),
            dir: space_dir.clone(),
        }];

        while let Some(placed) = stack.pop() {
            let children = self.expand(&placed, &walk, stats).await?;
            walk.extend(children.len());
            walk.advance();
            // Reversed so siblings are expanded in listing order
            stack.extend(children.into_iter().rev());
        }

        if self.options.include_docs {
            self.write_documents(&space.id, &space_dir, stats).await?;
        }
        Ok(())
    }

    /// Archives what a container holds directly and returns the containers to visit next
    async fn expand(
        &mut self,
        placed: &Placed,
        walk: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<Vec<Placed>> {
        let node = &placed.node;
        let mut next = Vec::new();

        if node.kind == NodeKind::List && self.options.include_tasks {
            self.archive_list(node, &placed.dir, walk, stats).await?;
        }

        let remote = self.source.is_remote(Listing::Containers, &node.kind);
        let result = paced!(self, remote, self.source.containers(node));
        for child in self.settle(result, &node.id, walk, stats)?.unwrap_or_default() {
            let stem = self.tree.allocate(&placed.dir, &child.name);
            let dir = placed.dir.join(stem);
            create_dir(&child.id, &dir)?;
            if child.kind == NodeKind::Folder {
                stats.folders += 1;
            }
            next.push(Placed { node: child, dir });
        }

        let remote = self.source.is_remote(Listing::LeafGroups, &node.kind);
        let result = paced!(self, remote, self.source.leaf_groups(node));
        for list in self.settle(result, &node.id, walk, stats)?.unwrap_or_default() {
            stats.lists += 1;
            next.push(Placed {
                node: list,
                dir: placed.dir.clone(),
            });
        }

        if self.options.include_docs {
            self.discover_documents(node, walk, stats).await?;
        }

        Ok(next)
    }

    /// Writes the records of `list` to `<dir>/<list>.csv`
    async fn archive_list(
        &mut self,
        list: &ContentNode,
        dir: &Path,
        walk: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<()> {
        let stem = self.tree.allocate(dir, &list.name);
        let path = dir.join(format!("{}.csv", stem));
        let mut sink = TableSink::new(self.options.tabular_mode, path.clone());
        let mut written = 0;
        let mut missed_in_row = 0;

        for page in 0..MAX_RECORD_PAGES {
            let result = paced!(self, self.source.records(list, page));
            let batch = match self.classify(result, &list.id, walk, stats)? {
                Settled::Found(batch) => batch,
                Settled::Unsupported => break,
                Settled::Missed => {
                    missed_in_row += 1;
                    if missed_in_row == MAX_MISSED_RECORD_PAGES {
                        tracing::warn!(
                            "Giving up on list {} after {} unreadable pages in a row",
                            list.id,
                            missed_in_row
                        );
                        break;
                    }
                    tracing::warn!("Skipping record page {} of list {}", page, list.id);
                    continue;
                }
            };
            missed_in_row = 0;

            let done = batch.last_page || batch.records.is_empty();
            let mut progress = LevelProgress::new("record", batch.records.len());

            for record in batch.records {
                let record = self.complete_record(record, &progress, stats).await;
                sink.push(record)
                    .map_err(|e| ArchiveError::structural(&list.id, e.to_string()))?;
                stats.records += 1;
                written += 1;
                progress.advance();
            }

            if done {
                break;
            }
            if page + 1 == MAX_RECORD_PAGES {
                tracing::warn!(
                    "List {} still has records after {} pages, stopping",
                    list.id,
                    MAX_RECORD_PAGES
                );
            }
        }

        let summary = sink
            .finish()
            .map_err(|e| ArchiveError::structural(&list.id, e.to_string()))?;
        if summary.rows > 0 {
            stats.tables += 1;
            tracing::debug!(
                "Wrote {} ({} rows, {} columns)",
                path.display(),
                summary.rows,
                summary.columns
            );
        } else {
            tracing::debug!("List {} has no records, no table written", list.id);
        }
        stats.ragged_rows += summary.ragged_rows;
        debug_assert_eq!(summary.rows, written);
        Ok(())
    }

    /// Replaces a partial record with its detail version when possible
    async fn complete_record(
        &mut self,
        record: TabularRecord,
        progress: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> TabularRecord {
        if is_complete(&record) {
            return record;
        }
        let Some(id) = record_id(&record) else {
            tracing::debug!("Partial record without id, keeping as listed");
            return record;
        };

        let result = paced!(self, self.source.record_detail(&id));
        let (record, outcome) = match result {
            Ok(Probe::Found(full)) => (full, ItemOutcome::Completed),
            Ok(Probe::Unsupported) => (record, ItemOutcome::KeptPartial),
            Err(e) if e.is_rate_limited() => {
                progress.log_rate_limited(&id);
                self.pacer.note_rate_limit();
                stats.records_partial += 1;
                (record, ItemOutcome::RateLimited)
            }
            Err(e) => {
                tracing::warn!("Keeping partial record {}: {}", id, e);
                (record, ItemOutcome::KeptPartial)
            }
        };
        stats.absorb(&outcome);
        record
    }

    /// Collects the documents of `node` from every document index
    async fn discover_documents(
        &mut self,
        node: &ContentNode,
        walk: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<()> {
        let remote = self.source.is_remote(Listing::Documents, &node.kind);
        for index in DOCUMENT_INDEXES {
            let result = paced!(self, remote, self.source.documents(node, index));
            let Some(found) = self.settle(result, &node.id, walk, stats)? else {
                continue;
            };
            tracing::trace!("{:?} index of {} lists {} document(s)", index, node.id, found.len());
            for document in found {
                self.documents.insert(document.id.clone(), document);
            }
        }
        Ok(())
    }

    /// Writes every document discovered in the current space under `<space>/docs`
    async fn write_documents(
        &mut self,
        space_id: &str,
        space_dir: &Path,
        stats: &mut ContainerStats,
    ) -> Result<()> {
        let discovered = self.documents.drain();
        if discovered.is_empty() {
            return Ok(());
        }

        let forest = build_forest(discovered);
        let docs_dir = space_dir.join(DOCS_DIR);
        create_dir(space_id, &docs_dir)?;

        let total = forest.iter().map(ContentNode::subtree_len).sum();
        let mut progress = LevelProgress::new("document", total);
        let mut stack: Vec<(ContentNode, PathBuf)> = forest
            .into_iter()
            .rev()
            .map(|document| (document, docs_dir.clone()))
            .collect();

        while let Some((mut document, parent_dir)) = stack.pop() {
            let stem = self.tree.allocate(&parent_dir, &document.name);
            let doc_dir = parent_dir.join(stem);
            create_dir(&document.id, &doc_dir)?;

            document.pages = self.fetch_pages(&document, &progress, stats).await?;
            let slots = build_page_hierarchy(&document.id, std::mem::take(&mut document.pages));
            let written = write_page_slots(&mut self.tree, &doc_dir, &slots)
                .map_err(|e| ArchiveError::structural(&document.id, e.to_string()))?;

            stats.documents += 1;
            stats.pages += written;
            progress.advance();
            tracing::debug!(
                "Document {} written with {} page(s) ({})",
                document.name,
                written,
                progress
            );

            let children = std::mem::take(&mut document.children);
            stack.extend(children.into_iter().rev().map(|child| (child, doc_dir.clone())));
        }
        Ok(())
    }

    /// Fetches the pages of a document, trying each page strategy in turn
    async fn fetch_pages(
        &mut self,
        document: &ContentNode,
        progress: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<Vec<PageNode>> {
        let mut last_error: Option<FetchError> = None;

        for strategy in PAGE_STRATEGIES {
            let result = paced!(self, self.source.pages(document, strategy));
            match result {
                Ok(Probe::Found(mut pages)) => {
                    tracing::trace!(
                        "{} page(s) of {} via {}",
                        pages.len(),
                        document.id,
                        strategy
                    );
                    if strategy.fetches_each_page() {
                        self.fetch_page_contents(document, &mut pages, stats).await?;
                    }
                    return Ok(pages);
                }
                Ok(Probe::Unsupported) => {
                    tracing::trace!("{} not available for {}", strategy, document.id);
                }
                Err(e) if e.is_rate_limited() => {
                    progress.log_rate_limited(&document.id);
                    self.pacer.note_rate_limit();
                    stats.absorb(&ItemOutcome::RateLimited);
                    return Ok(Vec::new());
                }
                Err(e) if e.is_structural() => {
                    return Err(ArchiveError::structural(&document.id, e.to_string()));
                }
                Err(e) => {
                    tracing::warn!("{} failed for document {}: {}", strategy, document.id, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                stats.absorb(&ItemOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
            None => tracing::debug!("Document {} offers no pages", document.id),
        }
        Ok(Vec::new())
    }

    /// Fills in the content of listed pages, one request per page
    ///
    /// A page whose request is rate limited or fails keeps its place in the
    /// document and is marked as not fetched; the next page is still requested.
    async fn fetch_page_contents(
        &mut self,
        document: &ContentNode,
        pages: &mut [PageNode],
        stats: &mut ContainerStats,
    ) -> Result<()> {
        let mut progress = LevelProgress::new("page", pages.len());

        for page in pages.iter_mut() {
            let result = paced!(self, self.source.page_detail(document, &page.id));
            match self.classify(result, &page.id, &progress, stats)? {
                Settled::Found(detail) => {
                    page.content = detail.content;
                    if page.name.trim().is_empty() {
                        page.name = detail.name;
                    }
                    page.created_at = page.created_at.or(detail.created_at);
                    page.updated_at = page.updated_at.or(detail.updated_at);
                }
                Settled::Unsupported => {
                    tracing::debug!("No content endpoint for page {}", page.id);
                }
                Settled::Missed => page.content_fetched = false,
            }
            progress.advance();
        }
        Ok(())
    }

    /// Classifies a listing result
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - The listing was found
    /// * `Ok(None)` - Unsupported, rate limited or failed; treated as zero children
    /// * `Err(ArchiveError::Structural)` - The enclosing subtree must be aborted
    fn settle<T>(
        &mut self,
        result: FetchResult<Probe<T>>,
        item: &str,
        progress: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<Option<T>> {
        Ok(match self.classify(result, item, progress, stats)? {
            Settled::Found(value) => Some(value),
            Settled::Unsupported | Settled::Missed => None,
        })
    }

    /// Logs and counts a failed fetch, keeping absence apart from failure
    fn classify<T>(
        &mut self,
        result: FetchResult<Probe<T>>,
        item: &str,
        progress: &LevelProgress,
        stats: &mut ContainerStats,
    ) -> Result<Settled<T>> {
        match result {
            Ok(Probe::Found(value)) => Ok(Settled::Found(value)),
            Ok(Probe::Unsupported) => Ok(Settled::Unsupported),
            Err(e) if e.is_rate_limited() => {
                progress.log_rate_limited(item);
                self.pacer.note_rate_limit();
                stats.absorb(&ItemOutcome::RateLimited);
                Ok(Settled::Missed)
            }
            Err(e) if e.is_structural() => Err(ArchiveError::structural(item, e.to_string())),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", item, e);
                stats.absorb(&ItemOutcome::Skipped {
                    reason: e.to_string(),
                });
                Ok(Settled::Missed)
            }
        }
    }
}

/// Whether a listed record already carries every field of [`COMPLETE_FIELDS`]
pub fn is_complete(record: &TabularRecord) -> bool {
    COMPLETE_FIELDS.iter().all(|field| record.contains_key(*field))
}

fn create_dir(id: &str, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        ArchiveError::structural(id, format!("cannot create {}: {}", dir.display(), e))
    })
}

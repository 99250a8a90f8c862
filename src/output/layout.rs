//! On-disk layout of the archive
//!
//! Remote display names become file and directory names through
//! [`sanitize_name`]. Names are allocated per directory so two siblings with
//! the same display name never overwrite each other.

use crate::model::PageNode;
use crate::output::OutputResult;
use crate::tree::PageSlot;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Characters that are not allowed in file names on common filesystems
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest sanitized name, in characters
const MAX_NAME_CHARS: usize = 120;

/// Name used when sanitizing leaves nothing
pub const UNTITLED: &str = "untitled";

/// Body written for pages without content
pub const EMPTY_PAGE_PLACEHOLDER: &str = "_This page has no content._";

/// Body written for pages whose content could not be fetched
pub const UNFETCHED_PAGE_PLACEHOLDER: &str = "_The content of this page could not be fetched._";

/// Turns a display name into a safe file or directory name
///
/// Illegal and control characters become `_`, whitespace runs collapse to a
/// single space, runs of `_`/`-` collapse to one character, and leading or
/// trailing whitespace, dots and separators are trimmed.
///
/// # Examples
///
/// ```
/// use sumi_archive::output::sanitize_name;
///
/// assert_eq!(sanitize_name("  Q1 / Q2   plans?  "), "Q1 _ Q2 plans");
/// assert_eq!(sanitize_name("a<>b"), "a_b");
/// assert_eq!(sanitize_name("..."), "untitled");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last: Option<char> = None;

    for c in name.chars() {
        let mapped = if ILLEGAL_CHARS.contains(&c) || (c.is_control() && !c.is_whitespace()) {
            '_'
        } else if c.is_whitespace() {
            ' '
        } else {
            c
        };

        let collapses = match (last, mapped) {
            (Some(' '), ' ') => true,
            (Some(prev), '_' | '-') => prev == mapped,
            _ => false,
        };
        if !collapses {
            out.push(mapped);
            last = Some(mapped);
        }
    }

    let trimmed = out.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '_' || c == '-');
    let truncated: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        UNTITLED.to_string()
    } else {
        truncated.to_string()
    }
}

/// Hands out unique names within one directory
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a name as taken without allocating it
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_lowercase());
    }

    /// Returns a sanitized name that no earlier call returned
    ///
    /// Comparison ignores case so the layout also holds on case-insensitive
    /// filesystems. Collisions get ` (2)`, ` (3)`, … suffixes.
    pub fn allocate(&mut self, display_name: &str) -> String {
        let base = sanitize_name(display_name);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{} ({})", base, n);
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Name allocators for every directory of the archive
#[derive(Debug, Default)]
pub struct OutputTree {
    dirs: HashMap<PathBuf, NameAllocator>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name` inside `dir`
    pub fn reserve(&mut self, dir: &Path, name: &str) {
        self.dirs.entry(dir.to_path_buf()).or_default().reserve(name);
    }

    /// Allocates a unique name inside `dir` for `display_name`
    pub fn allocate(&mut self, dir: &Path, display_name: &str) -> String {
        self.dirs
            .entry(dir.to_path_buf())
            .or_default()
            .allocate(display_name)
    }
}

/// Markdown text of a page file
pub fn page_markdown(page: &PageNode) -> String {
    let title = if page.name.trim().is_empty() {
        "Untitled"
    } else {
        page.name.trim()
    };

    let body = page.content.trim();
    let body = if !body.is_empty() {
        body
    } else if page.content_fetched {
        EMPTY_PAGE_PLACEHOLDER
    } else {
        UNFETCHED_PAGE_PLACEHOLDER
    };

    format!("# {}\n\n{}\n", title, body)
}

/// Writes a page as `<dir>/<stem>.md`
pub fn write_page_file(dir: &Path, stem: &str, page: &PageNode) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.md", stem));
    fs::write(&path, page_markdown(page))?;
    Ok(path)
}

/// Writes a page hierarchy below `dir`
///
/// Each slot becomes `<name>.md`; a slot with children also gets a `<name>/`
/// directory holding them. Returns the number of page files written.
pub fn write_page_slots(
    tree: &mut OutputTree,
    dir: &Path,
    slots: &[PageSlot],
) -> OutputResult<usize> {
    let mut written = 0;
    for slot in slots {
        let stem = tree.allocate(dir, &slot.page.name);
        let path = write_page_file(dir, &stem, &slot.page)?;
        tracing::trace!("Wrote page {} to {}", slot.page.id, path.display());
        written += 1;

        if !slot.children.is_empty() {
            written += write_page_slots(tree, &dir.join(&stem), &slot.children)?;
        }
    }
    Ok(written)
}

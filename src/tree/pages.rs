//! Page hierarchy under a single document
//!
//! Pages are classified in three passes:
//!
//! 1. root pages: no parent, or the owning document as parent
//! 2. sub-pages: parent is one of the root pages
//! 3. orphans: everything else
//!
//! An orphan is re-attached under its parent's slot when the parent is part of
//! the same page collection, otherwise it becomes an extra root page. A claimed
//! id set guarantees each page id occupies exactly one slot; roots and
//! sub-pages claim their ids before any orphan is looked at.

use crate::model::PageNode;
use std::collections::{HashMap, HashSet};

/// A page together with the pages placed beneath it
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlot {
    pub page: PageNode,
    pub children: Vec<PageSlot>,
}

impl PageSlot {
    /// Number of pages in this slot, nested slots included
    pub fn page_count(&self) -> usize {
        1 + self.children.iter().map(PageSlot::page_count).sum::<usize>()
    }

    /// Finds a slot by page id anywhere below (and including) this one
    pub fn find(&self, id: &str) -> Option<&PageSlot> {
        if self.page.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Total number of pages held by a list of slots
pub fn page_count(slots: &[PageSlot]) -> usize {
    slots.iter().map(PageSlot::page_count).sum()
}

/// Placed pages, addressed by arena index
#[derive(Default)]
struct SlotArena {
    pages: Vec<Option<PageNode>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    by_id: HashMap<String, usize>,
}

impl SlotArena {
    fn place(&mut self, page: PageNode, parent: Option<usize>) -> usize {
        let index = self.pages.len();
        self.by_id.insert(page.id.clone(), index);
        self.pages.push(Some(page));
        self.children.push(Vec::new());
        match parent {
            Some(p) => self.children[p].push(index),
            None => self.roots.push(index),
        }
        index
    }

    fn slot_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    fn is_root(&self, index: usize) -> bool {
        self.roots.contains(&index)
    }

    fn into_slots(mut self) -> Vec<PageSlot> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|root| self.assemble(root))
            .collect()
    }

    fn assemble(&mut self, index: usize) -> Option<PageSlot> {
        let page = self.pages[index].take()?;
        let children = std::mem::take(&mut self.children[index])
            .into_iter()
            .filter_map(|child| self.assemble(child))
            .collect();
        Some(PageSlot { page, children })
    }
}

/// Claims `id`; false when some earlier page already holds it
fn claim(claimed: &mut HashSet<String>, id: &str) -> bool {
    claimed.insert(id.to_string())
}

/// Builds the page hierarchy of the document `owner_id`
///
/// # Examples
///
/// ```
/// use sumi_archive::model::PageNode;
/// use sumi_archive::tree::build_page_hierarchy;
///
/// let slots = build_page_hierarchy("doc", vec![
///     PageNode::new("p1", "Intro"),
///     PageNode::new("p2", "Details").with_parent("p1"),
///     PageNode::new("p3", "Deep").with_parent("p2"),
/// ]);
///
/// assert_eq!(slots.len(), 1);
/// let p2 = &slots[0].children[0];
/// assert_eq!(p2.page.id, "p2");
/// assert_eq!(p2.children[0].page.id, "p3");
/// ```
pub fn build_page_hierarchy(owner_id: &str, pages: Vec<PageNode>) -> Vec<PageSlot> {
    let known: HashSet<String> = pages.iter().map(|p| p.id.clone()).collect();
    let mut claimed: HashSet<String> = HashSet::with_capacity(pages.len());
    let mut arena = SlotArena::default();

    let rest = place_root_pages(owner_id, pages, &mut arena, &mut claimed);
    let orphans = place_sub_pages(rest, &mut arena, &mut claimed);
    place_orphans(orphans, &known, &mut arena, &mut claimed);

    arena.into_slots()
}

fn place_root_pages(
    owner_id: &str,
    pages: Vec<PageNode>,
    arena: &mut SlotArena,
    claimed: &mut HashSet<String>,
) -> Vec<PageNode> {
    let mut rest = Vec::new();
    for page in pages {
        let is_root = match page.parent_id.as_deref() {
            None => true,
            Some(parent) => parent == owner_id || parent.is_empty(),
        };

        if !is_root {
            rest.push(page);
        } else if claim(claimed, &page.id) {
            arena.place(page, None);
        } else {
            tracing::debug!("Dropping repeated page {}", page.id);
        }
    }
    rest
}

fn place_sub_pages(
    pages: Vec<PageNode>,
    arena: &mut SlotArena,
    claimed: &mut HashSet<String>,
) -> Vec<PageNode> {
    let mut orphans = Vec::new();
    for page in pages {
        let root_parent = page
            .parent_id
            .as_deref()
            .and_then(|p| arena.slot_of(p))
            .filter(|&index| arena.is_root(index));

        match root_parent {
            Some(parent) if page.id != page.parent_id.as_deref().unwrap_or_default() => {
                if claim(claimed, &page.id) {
                    arena.place(page, Some(parent));
                } else {
                    tracing::debug!("Dropping repeated page {}", page.id);
                }
            }
            _ => orphans.push(page),
        }
    }
    orphans
}

fn place_orphans(
    mut orphans: Vec<PageNode>,
    known: &HashSet<String>,
    arena: &mut SlotArena,
    claimed: &mut HashSet<String>,
) {
    while !orphans.is_empty() {
        let mut progressed = false;
        let mut waiting = Vec::new();

        for page in orphans {
            if claimed.contains(&page.id) {
                tracing::debug!("Dropping repeated page {}", page.id);
                continue;
            }

            let parent = page.parent_id.clone().unwrap_or_default();
            if let Some(slot) = arena.slot_of(&parent) {
                tracing::debug!("Re-attaching orphan page {} under {}", page.id, parent);
                claim(claimed, &page.id);
                arena.place(page, Some(slot));
                progressed = true;
            } else if known.contains(&parent) {
                // Parent exists but is an orphan not placed yet
                waiting.push(page);
            } else {
                tracing::debug!(
                    "Promoting orphan page {} to root (parent {} not found)",
                    page.id,
                    parent
                );
                claim(claimed, &page.id);
                arena.place(page, None);
                progressed = true;
            }
        }

        if !progressed && !waiting.is_empty() {
            // Orphans waiting on each other form a cycle
            let page = waiting.remove(0);
            tracing::debug!("Promoting page {} to root to break a parent cycle", page.id);
            claim(claimed, &page.id);
            arena.place(page, None);
        }
        orphans = waiting;
    }
}

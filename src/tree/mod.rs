//! Tree reconciliation
//!
//! Remote listings are flat: every node carries an optional parent reference.
//! This module turns those listings back into trees:
//!
//! - `build_forest`: generic forest for any [`Hierarchical`] node (documents)
//! - `build_page_hierarchy`: root / sub-page / orphan placement for the pages of one document

mod forest;
mod pages;

pub use forest::{build_forest, Hierarchical};
pub use pages::{build_page_hierarchy, page_count, PageSlot};

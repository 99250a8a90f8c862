//! Rich-text to markdown rendering

mod markdown;

pub use markdown::{flatten_text, render_content, render_markdown};

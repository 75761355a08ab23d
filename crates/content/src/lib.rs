//! Site content: markdown rendering and the post/page library.

use std::path::PathBuf;

use thiserror::Error;

mod library;
pub mod markdown;

pub use library::{ContentLibrary, Cover, CoverCredit, Page, Post};
pub use markdown::{classify_link, render_markdown, LinkKind, MarkdownRenderer};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no +++ frontmatter block", path.display())]
    MissingFrontmatter { path: PathBuf },
    #[error("invalid frontmatter in {}: {source}", path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid published_at '{value}' in {}", path.display())]
    InvalidDate { path: PathBuf, value: String },
    #[error("{kind} '{slug}' not found")]
    NotFound { kind: &'static str, slug: String },
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}

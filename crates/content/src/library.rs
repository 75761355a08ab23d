use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{markdown::MarkdownRenderer, ContentError};

const FRONTMATTER_FENCE: &str = "+++";
const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverCredit {
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub photo: Option<String>,
    pub credit: Option<CoverCredit>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<NaiveDate>,
    pub cover: Option<Cover>,
    pub html: String,
}

/// Standalone page such as `about.md` at the content root.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
struct PostMatter {
    title: String,
    description: String,
    #[serde(default)]
    published_at: Option<toml::value::Datetime>,
    #[serde(default)]
    cover: Option<CoverMatter>,
}

#[derive(Debug, Deserialize)]
struct CoverMatter {
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    credit: Option<CreditMatter>,
}

#[derive(Debug, Deserialize)]
struct CreditMatter {
    author: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct PageMatter {
    title: String,
}

/// Posts and pages compiled from the content directory at startup.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    posts: Vec<Post>,
    pages: Vec<Page>,
}

impl ContentLibrary {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ContentError> {
        let root = root.as_ref();
        let renderer = MarkdownRenderer::default();

        let mut pages = Vec::new();
        if root.is_dir() {
            for path in markdown_files(root, false)? {
                pages.push(load_page(root, &path, &renderer)?);
            }
        } else {
            debug!(root = %root.display(), "content directory missing; serving no pages");
        }
        pages.sort_by(|a, b| a.slug.cmp(&b.slug));

        let posts_root = root.join(POSTS_DIR);
        let mut posts = Vec::new();
        if posts_root.is_dir() {
            for path in markdown_files(&posts_root, true)? {
                posts.push(load_post(&posts_root, &path, &renderer)?);
            }
        }
        posts.sort_by(newest_first);

        info!(
            root = %root.display(),
            posts = posts.len(),
            pages = pages.len(),
            "content library loaded"
        );
        Ok(Self { posts, pages })
    }

    pub fn from_parts(mut posts: Vec<Post>, pages: Vec<Page>) -> Self {
        posts.sort_by(newest_first);
        Self { posts, pages }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn latest_posts(&self, count: usize) -> &[Post] {
        &self.posts[..count.min(self.posts.len())]
    }

    pub fn post(&self, slug: &str) -> Result<&Post, ContentError> {
        self.posts
            .iter()
            .find(|post| post.slug == slug)
            .ok_or_else(|| ContentError::NotFound {
                kind: "post",
                slug: slug.to_string(),
            })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, slug: &str) -> Result<&Page, ContentError> {
        self.pages
            .iter()
            .find(|page| page.slug == slug)
            .ok_or_else(|| ContentError::NotFound {
                kind: "page",
                slug: slug.to_string(),
            })
    }
}

fn newest_first(a: &Post, b: &Post) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(a_date), Some(b_date)) => b_date.cmp(&a_date).then_with(|| a.slug.cmp(&b.slug)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.slug.cmp(&b.slug),
    }
}

fn load_post(posts_root: &Path, path: &Path, renderer: &MarkdownRenderer) -> Result<Post, ContentError> {
    let raw = read(path)?;
    let (matter, body) = split_frontmatter(&raw).ok_or_else(|| ContentError::MissingFrontmatter {
        path: path.to_path_buf(),
    })?;
    let matter: PostMatter = toml::from_str(matter).map_err(|source| ContentError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;

    let published_at = match matter.published_at {
        Some(value) => Some(toml_date(&value).ok_or_else(|| ContentError::InvalidDate {
            path: path.to_path_buf(),
            value: value.to_string(),
        })?),
        None => None,
    };

    Ok(Post {
        slug: slug_for(posts_root, path),
        title: matter.title,
        description: matter.description,
        published_at,
        cover: matter.cover.map(|cover| Cover {
            photo: cover.photo,
            credit: cover.credit.map(|credit| CoverCredit {
                author: credit.author,
                url: credit.url,
            }),
        }),
        html: renderer.render(body),
    })
}

fn load_page(root: &Path, path: &Path, renderer: &MarkdownRenderer) -> Result<Page, ContentError> {
    let raw = read(path)?;
    let (matter, body) = split_frontmatter(&raw).ok_or_else(|| ContentError::MissingFrontmatter {
        path: path.to_path_buf(),
    })?;
    let matter: PageMatter = toml::from_str(matter).map_err(|source| ContentError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Page {
        slug: slug_for(root, path),
        title: matter.title,
        html: renderer.render(body),
    })
}

fn read(path: &Path) -> Result<String, ContentError> {
    fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Splits `+++`-fenced TOML frontmatter from the markdown body.
pub(crate) fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let rest = raw.trim_start().strip_prefix(FRONTMATTER_FENCE)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_FENCE {
            let matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((matter, body));
        }
        offset += line.len();
    }
    None
}

fn toml_date(value: &toml::value::Datetime) -> Option<NaiveDate> {
    let date = value.date?;
    NaiveDate::from_ymd_opt(i32::from(date.year), u32::from(date.month), u32::from(date.day))
}

fn slug_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn markdown_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ContentError> {
    let mut found = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ContentError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                found.extend(markdown_files(&path, true)?);
            }
            continue;
        }
        let is_markdown = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("mdx"));
        if is_markdown {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
#[path = "tests/library_tests.rs"]
mod tests;

//! Markdown to HTML with the site's element substitutions.
//!
//! Parsing is done by pulldown-cmark; the event stream is rewritten before it
//! reaches the HTML writer so that links, headings, code blocks, images and
//! `<Lead>` paragraphs come out the way the site components render them.

use std::collections::HashMap;

use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

const LEAD_OPEN: &str = "<Lead>";
const LEAD_CLOSE: &str = "</Lead>";
const LEAD_PARAGRAPH: &str = "<p class=\"lead\">";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `#section` on the same page.
    Fragment,
    /// `http`/`https` destination, opened in a new browsing context.
    External,
    /// Anything else is routed inside the site.
    Internal,
}

pub fn classify_link(href: &str) -> LinkKind {
    if href.starts_with('#') {
        LinkKind::Fragment
    } else if href.starts_with("http") {
        LinkKind::External
    } else {
        LinkKind::Internal
    }
}

/// Stateless entry point; see [`MarkdownRenderer`].
pub fn render_markdown(source: &str) -> String {
    MarkdownRenderer::default().render(source)
}

#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }
}

impl MarkdownRenderer {
    pub fn render(&self, source: &str) -> String {
        let events: Vec<Event<'_>> = Parser::new_ext(source, self.options).collect();
        let heading_ids = assign_heading_ids(&events);
        let rewritten = rewrite(events, heading_ids, self.options);

        let mut html_output = String::with_capacity(source.len() * 2);
        html::push_html(&mut html_output, rewritten.into_iter());
        html_output
    }
}

fn rewrite<'a>(events: Vec<Event<'a>>, heading_ids: Vec<String>, options: Options) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut heading_ids = heading_ids.into_iter();
    let mut lead_open = false;
    // Set by a standalone `<Lead>` block; the next paragraph becomes the lead.
    let mut lead_pending = false;
    let mut iter = events.into_iter().peekable();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Paragraph) => {
                let starts_lead = matches!(
                    iter.peek(),
                    Some(Event::InlineHtml(raw)) if raw.trim() == LEAD_OPEN
                );
                if starts_lead {
                    iter.next();
                    lead_open = true;
                    out.push(Event::Html(CowStr::Borrowed(LEAD_PARAGRAPH)));
                } else if lead_pending {
                    lead_pending = false;
                    out.push(Event::Html(CowStr::Borrowed(LEAD_PARAGRAPH)));
                } else {
                    out.push(Event::Start(Tag::Paragraph));
                }
            }
            Event::InlineHtml(raw) if lead_open && raw.trim() == LEAD_CLOSE => {
                lead_open = false;
            }
            Event::End(TagEnd::Paragraph) => {
                lead_open = false;
                out.push(Event::End(TagEnd::Paragraph));
            }
            Event::Start(Tag::Heading { level, .. }) => {
                let id = heading_ids.next().unwrap_or_default();
                out.push(Event::Html(heading_open(level, &id).into()));
                if !id.is_empty() {
                    out.push(Event::Html(heading_anchor(&id).into()));
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                out.push(Event::Html(format!("</{}>\n", heading_tag(level)).into()));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                if dest_url.is_empty() {
                    skip_until_link_end(&mut iter);
                    continue;
                }
                out.push(Event::Html(link_open(&dest_url, &title).into()));
            }
            Event::End(TagEnd::Link) => out.push(Event::Html(CowStr::Borrowed("</a>"))),
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let alt = collect_image_alt(&mut iter);
                out.push(Event::Html(image_tag(&dest_url, &title, &alt).into()));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let open = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let lang = info.split_whitespace().next().unwrap_or_default();
                        if lang.is_empty() {
                            "<pre class=\"code-block\"><code>".to_string()
                        } else {
                            format!(
                                "<pre class=\"code-block\"><code class=\"language-{}\">",
                                escape_attr(lang)
                            )
                        }
                    }
                    CodeBlockKind::Indented => "<pre class=\"code-block\"><code>".to_string(),
                };
                out.push(Event::Html(open.into()));
            }
            Event::End(TagEnd::CodeBlock) => {
                out.push(Event::Html(CowStr::Borrowed("</code></pre>\n")));
            }
            Event::Start(Tag::HtmlBlock) => {
                let block = collect_html_block(&mut iter);
                let trimmed = block.trim();
                if trimmed == LEAD_OPEN {
                    lead_pending = true;
                } else if trimmed == LEAD_CLOSE {
                    lead_pending = false;
                } else if let Some(inner) = trimmed
                    .strip_prefix(LEAD_OPEN)
                    .and_then(|rest| rest.strip_suffix(LEAD_CLOSE))
                {
                    out.push(Event::Html(render_lead_block(inner.trim(), options).into()));
                } else {
                    out.push(Event::Start(Tag::HtmlBlock));
                    out.push(Event::Text(block.into()));
                    out.push(Event::End(TagEnd::HtmlBlock));
                }
            }
            // Raw HTML is shown as text, never injected.
            Event::Html(raw) | Event::InlineHtml(raw) => out.push(Event::Text(raw)),
            other => out.push(other),
        }
    }

    out
}

fn collect_html_block<'a, I>(iter: &mut I) -> String
where
    I: Iterator<Item = Event<'a>>,
{
    let mut block = String::new();
    for event in iter.by_ref() {
        match event {
            Event::End(TagEnd::HtmlBlock) => break,
            Event::Html(raw) | Event::Text(raw) => block.push_str(&raw),
            _ => {}
        }
    }
    block
}

/// `<Lead>` written as its own HTML block: the body is parsed as markdown and
/// its first paragraph takes the lead class.
fn render_lead_block(inner: &str, options: Options) -> String {
    let events: Vec<Event<'_>> = Parser::new_ext(inner, options).collect();
    let heading_ids = assign_heading_ids(&events);
    let mut rewritten = rewrite(events, heading_ids, options);
    if let Some(first) = rewritten
        .iter_mut()
        .find(|event| matches!(event, Event::Start(Tag::Paragraph)))
    {
        *first = Event::Html(CowStr::Borrowed(LEAD_PARAGRAPH));
    }

    let mut html_output = String::with_capacity(inner.len() * 2);
    html::push_html(&mut html_output, rewritten.into_iter());
    html_output
}

fn skip_until_link_end<'a, I>(iter: &mut I)
where
    I: Iterator<Item = Event<'a>>,
{
    for event in iter.by_ref() {
        if matches!(event, Event::End(TagEnd::Link)) {
            break;
        }
    }
}

fn collect_image_alt<'a, I>(iter: &mut I) -> String
where
    I: Iterator<Item = Event<'a>>,
{
    let mut alt = String::new();
    let mut depth = 0usize;
    for event in iter.by_ref() {
        match event {
            Event::Start(Tag::Image { .. }) => depth += 1,
            Event::End(TagEnd::Image) if depth == 0 => break,
            Event::End(TagEnd::Image) => depth -= 1,
            Event::Text(text) | Event::Code(text) => alt.push_str(&text),
            Event::SoftBreak | Event::HardBreak => alt.push(' '),
            _ => {}
        }
    }
    alt
}

fn assign_heading_ids(events: &[Event<'_>]) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(Option<String>, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { id, .. }) => {
                current = Some((id.as_ref().map(|id| id.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((explicit, text)) = current.take() {
                    let base = explicit.unwrap_or_else(|| slugify(&text));
                    ids.push(unique_id(base, &mut seen));
                }
            }
            _ => {}
        }
    }

    ids
}

fn unique_id(base: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    let id = if *count == 0 {
        base
    } else {
        format!("{base}-{count}")
    };
    *count += 1;
    id
}

/// Heading anchor in the style of GitHub: lowercase, punctuation dropped,
/// spaces turned into hyphens.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('-'),
            '_' => Some('_'),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn heading_open(level: HeadingLevel, id: &str) -> String {
    let tag = heading_tag(level);
    let class = match level {
        HeadingLevel::H1 => Some("heading heading-1"),
        HeadingLevel::H2 => Some("heading heading-2"),
        HeadingLevel::H3 => Some("heading heading-3"),
        HeadingLevel::H4 => Some("heading heading-4"),
        HeadingLevel::H5 | HeadingLevel::H6 => None,
    };
    match (id.is_empty(), class) {
        (true, Some(class)) => format!("<{tag} class=\"{class}\">"),
        (true, None) => format!("<{tag}>"),
        (false, Some(class)) => format!("<{tag} id=\"{}\" class=\"{class}\">", escape_attr(id)),
        (false, None) => format!("<{tag} id=\"{}\">", escape_attr(id)),
    }
}

/// Self-link placed at the start of every heading that has an id.
fn heading_anchor(id: &str) -> String {
    format!(
        "<a href=\"#{}\" data-link=\"fragment\"><span class=\"icon icon-link\"></span></a>",
        escape_attr(id)
    )
}

fn link_open(href: &str, title: &str) -> String {
    let mut tag = format!("<a href=\"{}\"", escape_attr(href));
    if !title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    match classify_link(href) {
        LinkKind::Fragment => tag.push_str(" data-link=\"fragment\""),
        LinkKind::External => {
            tag.push_str(" data-link=\"external\" target=\"_blank\" rel=\"noreferrer noopener\"")
        }
        LinkKind::Internal => tag.push_str(" data-link=\"internal\""),
    }
    tag.push('>');
    tag
}

fn image_tag(src: &str, title: &str, alt: &str) -> String {
    let mut tag = format!(
        "<img src=\"{}\" alt=\"{}\" loading=\"lazy\"",
        escape_attr(src),
        escape_attr(alt)
    );
    if !title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    tag.push_str(" />");
    tag
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/markdown_tests.rs"]
mod tests;

use super::*;

#[test]
fn renders_plain_paragraph() {
    assert_eq!(render_markdown("Hello, world!"), "<p>Hello, world!</p>\n");
}

#[test]
fn empty_source_renders_nothing() {
    assert!(render_markdown("").is_empty());
}

#[test]
fn three_link_kinds_render_distinct_anchors() {
    let html = render_markdown(
        "[jump](#section) [post](/posts/x) [site](https://example.com)",
    );

    assert!(html.contains("<a href=\"#section\" data-link=\"fragment\">jump</a>"));
    assert!(html.contains("<a href=\"/posts/x\" data-link=\"internal\">post</a>"));
    assert!(html.contains(
        "<a href=\"https://example.com\" data-link=\"external\" target=\"_blank\" rel=\"noreferrer noopener\">site</a>"
    ));
    assert_eq!(html.matches("target=\"_blank\"").count(), 1);
}

#[test]
fn classifies_links_by_prefix() {
    assert_eq!(classify_link("#top"), LinkKind::Fragment);
    assert_eq!(classify_link("http://example.com"), LinkKind::External);
    assert_eq!(classify_link("https://example.com"), LinkKind::External);
    assert_eq!(classify_link("/talks/rust"), LinkKind::Internal);
    assert_eq!(classify_link("mailto:me@example.com"), LinkKind::Internal);
}

#[test]
fn link_without_destination_is_dropped() {
    let html = render_markdown("before [gone]() after");
    assert!(!html.contains("<a"));
    assert!(!html.contains("gone"));
    assert!(html.contains("before"));
    assert!(html.contains("after"));
}

#[test]
fn link_titles_are_escaped() {
    let html = render_markdown("[x](/a \"say \\\"hi\\\"\")");
    assert!(html.contains("title=\"say &quot;hi&quot;\""));
}

#[test]
fn headings_get_ids_and_classes() {
    let html = render_markdown("# Hello World\n## Why `async`?\n##### Tiny");
    assert!(html.contains(
        "<h1 id=\"hello-world\" class=\"heading heading-1\"><a href=\"#hello-world\" data-link=\"fragment\"><span class=\"icon icon-link\"></span></a>Hello World</h1>"
    ));
    assert!(html.contains("<h2 id=\"why-async\" class=\"heading heading-2\">"));
    assert!(html.contains("<h5 id=\"tiny\"><a href=\"#tiny\" data-link=\"fragment\">"));
}

#[test]
fn headings_link_to_their_own_anchor() {
    let html = render_markdown("## Setup\n## Setup");
    assert!(html.contains("<a href=\"#setup\" data-link=\"fragment\">"));
    assert!(html.contains("<a href=\"#setup-1\" data-link=\"fragment\">"));
    assert_eq!(html.matches("icon-link").count(), 2);
}

#[test]
fn duplicate_headings_get_numbered_ids() {
    let html = render_markdown("## Setup\ntext\n## Setup");
    assert!(html.contains("id=\"setup\""));
    assert!(html.contains("id=\"setup-1\""));
}

#[test]
fn explicit_heading_id_wins() {
    let html = render_markdown("## Install {#getting-started}");
    assert!(html.contains("id=\"getting-started\""));
}

#[test]
fn lead_paragraph_gets_lead_class() {
    let html = render_markdown("<Lead>Short intro.</Lead>\n\nBody text.");
    assert!(html.contains("<p class=\"lead\">Short intro.</p>"));
    assert!(html.contains("<p>Body text.</p>"));
    assert!(!html.contains("Lead&gt;"));
}

#[test]
fn lead_block_on_its_own_lines_gets_lead_class() {
    let html = render_markdown("<Lead>\nShort intro.\n</Lead>\n\nBody.");
    assert_eq!(html, "<p class=\"lead\">Short intro.</p>\n<p>Body.</p>\n");
}

#[test]
fn lead_block_body_is_rendered_as_markdown() {
    let html = render_markdown("<Lead>\nRead the [docs](https://doc.rust-lang.org) *first*.\n</Lead>");
    assert!(html.starts_with("<p class=\"lead\">Read the <a href=\"https://doc.rust-lang.org\""));
    assert!(html.contains("target=\"_blank\""));
    assert!(html.contains("<em>first</em>"));
    assert!(!html.contains("Lead&gt;"));
}

#[test]
fn lead_tags_separated_by_blank_lines_wrap_next_paragraph() {
    let html = render_markdown("<Lead>\n\nIntro text.\n\n</Lead>\n\nBody.");
    assert!(html.contains("<p class=\"lead\">Intro text.</p>"));
    assert!(html.contains("<p>Body.</p>"));
    assert!(!html.contains("Lead"));
}

#[test]
fn other_html_blocks_stay_escaped() {
    let html = render_markdown("<div>\nhello\n</div>");
    assert!(html.contains("&lt;div&gt;"));
    assert!(!html.contains("<div>"));
}

#[test]
fn fenced_code_blocks_keep_language() {
    let html = render_markdown("```rust\nfn main() {}\n```");
    assert!(html.contains("<pre class=\"code-block\"><code class=\"language-rust\">fn main() {}\n</code></pre>"));
}

#[test]
fn code_block_content_is_escaped() {
    let html = render_markdown("```\n<script>\n```");
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn images_are_lazy_with_alt_text() {
    let html = render_markdown("![A *cat*](/img/cat.png \"Cat\")");
    assert!(html.contains("<img src=\"/img/cat.png\" alt=\"A cat\" loading=\"lazy\" title=\"Cat\" />"));
}

#[test]
fn raw_html_is_escaped() {
    let html = render_markdown("hi <b onclick=\"x\">there</b>");
    assert!(!html.contains("<b "));
    assert!(html.contains("&lt;b onclick"));
}

#[test]
fn gfm_tables_and_strikethrough_are_enabled() {
    let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
    assert!(html.contains("<table>"));
    assert!(html.contains("<del>old</del>"));
}

#[test]
fn slugify_drops_punctuation() {
    assert_eq!(slugify("What's New in Rust 2024?"), "whats-new-in-rust-2024");
}

//! Shared fixtures for markdown-codewrap tests.

use markdown_codewrap::{CodeWrapOptions, Content, InlineCopyHandler, RenderContext};

/// A single CSS fence with an attribute selector.
pub const CSS_FENCE: &str = "```css\n#id.class[data-attr=\"test\"] {\n    display: flex !important;\n}\n```\n";

/// What pulldown-cmark renders for [`CSS_FENCE`] on its own.
pub const CSS_FENCE_HTML: &str = "<pre><code class=\"language-css\">#id.class[data-attr=&quot;test&quot;] {\n    display: flex !important;\n}\n</code></pre>\n";

/// A document mixing prose, a fence and an indented block.
pub const MIXED_DOCUMENT: &str =
    "# Setup\n\nRun this:\n\n```sh\ncargo build\n```\n\nOr read:\n\n    indented sample\n";

/// Toolbar label callback showing the block's language in upper case.
pub fn uppercase_language() -> Content {
    Content::computed(|ctx: &RenderContext<'_>| ctx.info().to_uppercase())
}

/// The figure/figcaption setup with the button inside the toolbar.
pub fn figure_options() -> CodeWrapOptions {
    CodeWrapOptions::default()
        .with_wrap_tag("figure")
        .with_wrap_class("codeblock")
        .with_toolbar(true)
        .with_toolbar_tag("figcaption")
        .with_toolbar_class("codeblock-toolbar")
        .with_toolbar_label(uppercase_language())
        .with_button_in_toolbar(true)
        .with_copy_button_attr("class", "codeblock-button")
        .with_copy_button_label("Copy code")
        .with_inline_copy_handler(InlineCopyHandler::BuiltIn)
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

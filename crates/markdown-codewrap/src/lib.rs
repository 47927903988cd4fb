//! Decorates the code block output of a markdown renderer with a wrapper
//! element, an optional toolbar and an optional copy button.
//!
//! ```
//! use markdown_codewrap::{CodeWrapOptions, MarkdownRenderer};
//!
//! let renderer = MarkdownRenderer::new()
//!     .with_code_wrap(CodeWrapOptions::default().with_wrap_class("codeblock"))
//!     .unwrap();
//! let html = renderer.render("```sh\nls\n```\n");
//! assert!(html.starts_with("<div class=\"codeblock\"><pre>"));
//! ```

mod error;
mod options;
mod renderer;
mod token;
mod wrap;

pub use error::{CodeWrapError, CodeWrapResult, TagField};
pub use options::{
    CodeWrapOptions, Content, ContentFn, InlineCopyHandler, DEFAULT_COPY_BUTTON_LABEL, DEFAULT_TAG,
};
pub use pulldown_cmark::Options;
pub use renderer::{Env, MarkdownRenderer, RenderContext, RenderRule, RendererRules};
pub use token::{tokenize, CodeBlockKind, Document, Token};
pub use wrap::{builtin_copy_handler, install, CodeWrap};

use std::fmt;
use std::sync::Arc;

use pulldown_cmark::{html, CowStr, Event, Options};

use crate::error::CodeWrapResult;
use crate::options::CodeWrapOptions;
use crate::token::{tokenize, CodeBlockKind, Document, Segment, Token};
use crate::wrap::install;

/// Caller-supplied payload forwarded untouched to every rule and callback.
pub type Env = serde_json::Value;

/// A per-token rendering hook.
pub type RenderRule = Arc<dyn Fn(&RenderContext<'_>) -> String + Send + Sync>;

/// Everything a rule gets to look at while rendering one code block.
///
/// `idx` always points into `tokens`.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    tokens: &'a [Token],
    idx: usize,
    options: &'a Options,
    env: &'a Env,
    renderer: &'a MarkdownRenderer,
}

impl<'a> RenderContext<'a> {
    /// Returns `None` when `idx` is out of range for `tokens`.
    pub fn new(
        tokens: &'a [Token],
        idx: usize,
        options: &'a Options,
        env: &'a Env,
        renderer: &'a MarkdownRenderer,
    ) -> Option<Self> {
        (idx < tokens.len()).then_some(Self {
            tokens,
            idx,
            options,
            env,
            renderer,
        })
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    pub fn renderer(&self) -> &'a MarkdownRenderer {
        self.renderer
    }

    pub fn token(&self) -> &'a Token {
        &self.tokens[self.idx]
    }

    pub fn info(&self) -> &'a str {
        &self.token().info
    }

    pub fn language(&self) -> Option<&'a str> {
        self.token().language()
    }
}

/// Replaceable hooks for the two kinds of code block.
#[derive(Clone, Default)]
pub struct RendererRules {
    pub fence: Option<RenderRule>,
    pub code_block: Option<RenderRule>,
}

impl RendererRules {
    pub fn for_kind(&self, kind: CodeBlockKind) -> Option<&RenderRule> {
        match kind {
            CodeBlockKind::Fence => self.fence.as_ref(),
            CodeBlockKind::Indented => self.code_block.as_ref(),
        }
    }
}

/// HTML renderer over pulldown-cmark whose code block output can be
/// replaced through [`RendererRules`].
#[derive(Clone)]
pub struct MarkdownRenderer {
    options: Options,
    pub rules: RendererRules,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("options", &self.options)
            .field("fence_rule", &self.rules.fence.is_some())
            .field("code_block_rule", &self.rules.code_block.is_some())
            .finish()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_options(Options::empty())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            rules: RendererRules::default(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Installs the code wrap decorator on this renderer and returns it.
    pub fn with_code_wrap(mut self, options: CodeWrapOptions) -> CodeWrapResult<Self> {
        install(Some(&mut self), options)?;
        Ok(self)
    }

    pub fn tokenize<'s>(&self, source: &'s str) -> Document<'s> {
        tokenize(source, self.options)
    }

    pub fn render(&self, source: &str) -> String {
        self.render_with_env(source, &Env::Null)
    }

    pub fn render_with_env(&self, source: &str, env: &Env) -> String {
        let document = self.tokenize(source);
        self.render_document(&document, env)
    }

    /// Renders the whole document through a single pulldown-cmark writer.
    /// Code blocks with an installed rule are spliced in as raw HTML; the
    /// rest keep their original events.
    pub fn render_document(&self, document: &Document<'_>, env: &Env) -> String {
        let tokens = document.tokens();
        let mut events = Vec::new();

        for segment in &document.segments {
            match segment {
                Segment::Events(run) => events.extend(run.iter().cloned()),
                Segment::Code(idx) => {
                    let token = &tokens[*idx];
                    match self.rules.for_kind(token.kind) {
                        Some(rule) => {
                            let ctx = RenderContext {
                                tokens,
                                idx: *idx,
                                options: &self.options,
                                env,
                                renderer: self,
                            };
                            events.push(Event::Html(CowStr::from(rule(&ctx))));
                        }
                        None => events.extend(token.to_events()),
                    }
                }
            }
        }

        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    /// Generic fallback: renders the token with pulldown-cmark's own writer.
    pub fn render_token(&self, tokens: &[Token], idx: usize) -> String {
        let mut out = String::new();
        if let Some(token) = tokens.get(idx) {
            html::push_html(&mut out, token.to_events().into_iter());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_blocks_through_the_generic_writer() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Title\n\n```css\na < b\n```\n");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<pre><code class=\"language-css\">a &lt; b\n</code></pre>\n"
        );
    }

    #[test]
    fn dispatches_to_the_rule_for_each_kind() {
        let mut renderer = MarkdownRenderer::new();
        renderer.rules.fence = Some(Arc::new(|ctx: &RenderContext<'_>| {
            format!("[fence:{}]", ctx.info())
        }));
        renderer.rules.code_block = Some(Arc::new(|ctx: &RenderContext<'_>| {
            format!("[indented:{}]", ctx.idx())
        }));

        let html = renderer.render("```js\nx\n```\n\n    y\n");
        assert_eq!(html, "[fence:js][indented:1]");
    }

    #[test]
    fn rules_see_the_env() {
        let mut renderer = MarkdownRenderer::new();
        renderer.rules.fence = Some(Arc::new(|ctx: &RenderContext<'_>| {
            ctx.env()["title"].as_str().unwrap_or_default().to_string()
        }));

        let env = serde_json::json!({ "title": "from env" });
        assert_eq!(renderer.render_with_env("```\nx\n```\n", &env), "from env");
    }

    #[test]
    fn renderer_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MarkdownRenderer>();
    }

    #[test]
    fn footnotes_keep_numbering_across_code_blocks() {
        let source = "A[^a]\n\n```\nx\n```\n\nB[^b]\n\n[^a]: one\n[^b]: two\n";
        let mut renderer = MarkdownRenderer::with_options(Options::ENABLE_FOOTNOTES);
        renderer.rules.fence = Some(Arc::new(|_: &RenderContext<'_>| "<div>code</div>".to_string()));

        let html = renderer.render(source);
        assert!(html.contains("B<sup class=\"footnote-reference\"><a href=\"#b\">2</a></sup>"));
        assert!(html.contains("<div>code</div>\n<p>B"));

        let one = html.find("<sup class=\"footnote-definition-label\">1</sup>").unwrap();
        let two = html.find("<sup class=\"footnote-definition-label\">2</sup>").unwrap();
        assert!(one < two);
    }

    #[test]
    fn context_rejects_out_of_range_index() {
        let renderer = MarkdownRenderer::new();
        let document = renderer.tokenize("```\nx\n```\n");
        let env = Env::Null;

        assert!(RenderContext::new(document.tokens(), 1, renderer.options(), &env, &renderer).is_none());
        let ctx = RenderContext::new(document.tokens(), 0, renderer.options(), &env, &renderer)
            .expect("index in range");
        assert_eq!(ctx.idx(), 0);
        assert_eq!(ctx.token().content, "x\n");
    }

    #[test]
    fn render_token_out_of_range_is_empty() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.render_token(&[], 3), "");
    }
}

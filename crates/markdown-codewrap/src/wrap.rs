use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{CodeWrapError, CodeWrapResult};
use crate::options::{CodeWrapOptions, Content, InlineCopyHandler, DEFAULT_TAG};
use crate::renderer::{MarkdownRenderer, RenderContext, RenderRule};

/// Replaces the fence and indented code rules on `host` with wrapping rules.
///
/// Whatever rule was installed before becomes the inner renderer, falling
/// back to [`MarkdownRenderer::render_token`]. Installing again wraps the
/// already wrapped rules, so repeated installs nest.
pub fn install(host: Option<&mut MarkdownRenderer>, options: CodeWrapOptions) -> CodeWrapResult<()> {
    let host = host.ok_or(CodeWrapError::MissingHost)?;
    let wrap = Arc::new(CodeWrap::new(options));

    let fence = host.rules.fence.take().unwrap_or_else(generic_rule);
    let code_block = host.rules.code_block.take().unwrap_or_else(generic_rule);

    host.rules.fence = Some(wrap.decorate(fence));
    host.rules.code_block = Some(wrap.decorate(code_block));

    debug!(
        wrap_tag = %wrap.wrap_tag,
        has_toolbar = wrap.has_toolbar,
        has_copy_button = wrap.has_copy_button,
        "installed code wrap"
    );
    Ok(())
}

fn generic_rule() -> RenderRule {
    Arc::new(|ctx: &RenderContext<'_>| ctx.renderer().render_token(ctx.tokens(), ctx.idx()))
}

/// Validated, ready-to-render form of [`CodeWrapOptions`].
#[derive(Debug)]
pub struct CodeWrap {
    wrap_tag: String,
    wrap_class: String,
    has_toolbar: bool,
    toolbar_tag: String,
    toolbar_class: String,
    toolbar_label: Content,
    has_copy_button: bool,
    is_button_in_toolbar: bool,
    copy_button_label: Content,
    copy_button_attrs: IndexMap<String, Content>,
    inline_copy_handler: Option<String>,
}

impl CodeWrap {
    pub fn new(options: CodeWrapOptions) -> Self {
        let wrap_tag = resolve_tag(options.wrap_tag);
        let toolbar_tag = resolve_tag(options.toolbar_tag);

        let inline_copy_handler = match options.inline_copy_handler {
            InlineCopyHandler::Disabled => None,
            InlineCopyHandler::BuiltIn => Some(builtin_copy_handler(
                options.has_toolbar && options.is_button_in_toolbar,
            )),
            InlineCopyHandler::Custom(script) if script.is_empty() => None,
            InlineCopyHandler::Custom(script) => Some(script),
        };

        Self {
            wrap_tag,
            wrap_class: options.wrap_class,
            has_toolbar: options.has_toolbar,
            toolbar_tag,
            toolbar_class: options.toolbar_class,
            toolbar_label: options.toolbar_label,
            has_copy_button: options.has_copy_button,
            is_button_in_toolbar: options.is_button_in_toolbar,
            copy_button_label: options.copy_button_label,
            copy_button_attrs: options.copy_button_attrs,
            inline_copy_handler,
        }
    }

    /// Wraps `inner` so its output gets decorated on every call.
    pub fn decorate(self: &Arc<Self>, inner: RenderRule) -> RenderRule {
        let wrap = Arc::clone(self);
        Arc::new(move |ctx: &RenderContext<'_>| {
            let inner_markup = inner(ctx);
            wrap.render(&inner_markup, ctx)
        })
    }

    /// Composes the wrapper, toolbar and button around `inner_markup`.
    pub fn render(&self, inner_markup: &str, ctx: &RenderContext<'_>) -> String {
        trace!(idx = ctx.idx(), kind = ctx.token().kind.as_str(), "wrapping code block");

        let button = self.button_markup(ctx);

        let mut out = String::with_capacity(inner_markup.len() + 2 * button.len() + 64);
        if self.wrap_class.is_empty() {
            out.push_str(&format!("<{}>", self.wrap_tag));
        } else {
            out.push_str(&format!("<{} class=\"{}\">", self.wrap_tag, self.wrap_class));
        }

        // The toolbar carries the button whatever the placement flags say.
        if self.has_toolbar {
            out.push_str(&format!(
                "<{tag} class=\"{class}\">{label}{button}</{tag}>",
                tag = self.toolbar_tag,
                class = self.toolbar_class,
                label = self.toolbar_label.resolve(ctx),
            ));
        }

        out.push_str(inner_markup);

        if self.has_copy_button && (!self.has_toolbar || !self.is_button_in_toolbar) {
            out.push_str(&button);
        }

        out.push_str(&format!("</{}>", self.wrap_tag));
        out
    }

    fn button_markup(&self, ctx: &RenderContext<'_>) -> String {
        format!(
            "<button {}>{}</button>",
            self.button_attributes(ctx),
            self.copy_button_label.resolve(ctx)
        )
    }

    fn button_attributes(&self, ctx: &RenderContext<'_>) -> String {
        let mut attrs: IndexMap<&str, std::borrow::Cow<'_, str>> = IndexMap::new();
        attrs.insert("type", "button".into());
        if let Some(handler) = &self.inline_copy_handler {
            attrs.insert("onclick", handler.as_str().into());
        }
        for (name, value) in &self.copy_button_attrs {
            attrs.insert(name.as_str(), value.resolve(ctx));
        }

        attrs
            .iter()
            .map(|(name, value)| format!("{name}=\"{value}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Script that copies the text of the first `pre` under the wrapper. A button
/// inside the toolbar has to climb one extra level to reach the wrapper.
pub fn builtin_copy_handler(button_in_toolbar: bool) -> String {
    format!(
        "navigator.clipboard.writeText(this.parentElement{}.querySelector('pre').innerText)",
        if button_in_toolbar { ".parentElement" } else { "" }
    )
}

/// Unset or empty tags fall back to `div`; anything else is used verbatim.
fn resolve_tag(tag: Option<String>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => tag,
        _ => DEFAULT_TAG.to_string(),
    }
}

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::renderer::RenderContext;

pub const DEFAULT_TAG: &str = "div";
pub const DEFAULT_COPY_BUTTON_LABEL: &str = "Copy";

/// Callback used by [`Content::Computed`].
pub type ContentFn = Arc<dyn Fn(&RenderContext<'_>) -> String + Send + Sync>;

/// A value that is either fixed or computed per code block.
#[derive(Clone)]
pub enum Content {
    Literal(String),
    Computed(ContentFn),
}

impl Content {
    pub fn literal(value: impl Into<String>) -> Self {
        Content::Literal(value.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Content::Computed(Arc::new(f))
    }

    pub fn resolve(&self, ctx: &RenderContext<'_>) -> Cow<'_, str> {
        match self {
            Content::Literal(value) => Cow::Borrowed(value),
            Content::Computed(f) => Cow::Owned(f(ctx)),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Literal(String::new())
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Content::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Literal(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Literal(value)
    }
}

/// How the copy button's `onclick` attribute is produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InlineCopyHandler {
    #[default]
    Disabled,
    /// Copies the `pre` text of the enclosing wrapper to the clipboard.
    BuiltIn,
    Custom(String),
}

impl InlineCopyHandler {
    pub fn is_enabled(&self) -> bool {
        match self {
            InlineCopyHandler::Disabled => false,
            InlineCopyHandler::BuiltIn => true,
            InlineCopyHandler::Custom(script) => !script.is_empty(),
        }
    }
}

impl From<bool> for InlineCopyHandler {
    fn from(enabled: bool) -> Self {
        if enabled {
            InlineCopyHandler::BuiltIn
        } else {
            InlineCopyHandler::Disabled
        }
    }
}

/// User configuration for the code wrap decorator.
///
/// Tags left unset (or empty) fall back to `div`. Nothing here is escaped
/// when rendered, so labels and attribute values may carry raw HTML.
#[derive(Clone, Debug)]
pub struct CodeWrapOptions {
    pub wrap_tag: Option<String>,
    pub wrap_class: String,
    pub has_toolbar: bool,
    pub toolbar_tag: Option<String>,
    pub toolbar_class: String,
    pub toolbar_label: Content,
    pub has_copy_button: bool,
    pub is_button_in_toolbar: bool,
    pub copy_button_label: Content,
    pub copy_button_attrs: IndexMap<String, Content>,
    pub inline_copy_handler: InlineCopyHandler,
}

impl Default for CodeWrapOptions {
    fn default() -> Self {
        Self {
            wrap_tag: None,
            wrap_class: String::new(),
            has_toolbar: false,
            toolbar_tag: None,
            toolbar_class: String::new(),
            toolbar_label: Content::default(),
            has_copy_button: true,
            is_button_in_toolbar: false,
            copy_button_label: Content::literal(DEFAULT_COPY_BUTTON_LABEL),
            copy_button_attrs: IndexMap::new(),
            inline_copy_handler: InlineCopyHandler::Disabled,
        }
    }
}

impl CodeWrapOptions {
    pub fn with_wrap_tag(mut self, tag: impl Into<String>) -> Self {
        self.wrap_tag = Some(tag.into());
        self
    }

    pub fn with_wrap_class(mut self, class: impl Into<String>) -> Self {
        self.wrap_class = class.into();
        self
    }

    pub fn with_toolbar(mut self, enabled: bool) -> Self {
        self.has_toolbar = enabled;
        self
    }

    pub fn with_toolbar_tag(mut self, tag: impl Into<String>) -> Self {
        self.toolbar_tag = Some(tag.into());
        self
    }

    pub fn with_toolbar_class(mut self, class: impl Into<String>) -> Self {
        self.toolbar_class = class.into();
        self
    }

    pub fn with_toolbar_label(mut self, label: impl Into<Content>) -> Self {
        self.toolbar_label = label.into();
        self
    }

    pub fn with_copy_button(mut self, enabled: bool) -> Self {
        self.has_copy_button = enabled;
        self
    }

    pub fn with_button_in_toolbar(mut self, in_toolbar: bool) -> Self {
        self.is_button_in_toolbar = in_toolbar;
        self
    }

    pub fn with_copy_button_label(mut self, label: impl Into<Content>) -> Self {
        self.copy_button_label = label.into();
        self
    }

    /// Adds or replaces one copy button attribute. A replaced key keeps its
    /// original position.
    pub fn with_copy_button_attr(
        mut self,
        name: impl Into<String>,
        value: impl Into<Content>,
    ) -> Self {
        self.copy_button_attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_inline_copy_handler(mut self, handler: impl Into<InlineCopyHandler>) -> Self {
        self.inline_copy_handler = handler.into();
        self
    }
}

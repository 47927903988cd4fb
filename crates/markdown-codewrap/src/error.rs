use thiserror::Error;

/// Which tag option failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Wrap,
    Toolbar,
}

impl TagField {
    pub fn as_str(self) -> &'static str {
        match self {
            TagField::Wrap => "wrap_tag",
            TagField::Toolbar => "toolbar_tag",
        }
    }
}

impl std::fmt::Display for TagField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Setup failures. Rendering itself never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeWrapError {
    #[error("a markdown renderer must be provided")]
    MissingHost,

    /// Only reachable where options arrive untyped, such as config files.
    #[error("the `{field}` option must be provided as a tag name string (received {received})")]
    InvalidTagName { field: TagField, received: String },
}

pub type CodeWrapResult<T> = Result<T, CodeWrapError>;

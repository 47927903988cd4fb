//! Configuration loader for markdown-codewrap.
//!
//! Settings are resolved with the precedence
//! override flag → working directory → git root → built-in defaults,
//! then turned into [`CodeWrapOptions`] for the decorator.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use markdown_codewrap::{
    CodeWrapError, CodeWrapOptions, Content, InlineCopyHandler, RenderContext,
    TagField, DEFAULT_COPY_BUTTON_LABEL,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".markdown-codewrap.toml";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub wrap: WrapSettings,
    pub toolbar: ToolbarSettings,
    pub copy_button: CopyButtonSettings,
    pub sources: ConfigSources,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WrapSettings {
    pub tag: Option<String>,
    pub class: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolbarSettings {
    pub enabled: bool,
    pub tag: Option<String>,
    pub class: String,
    pub label: ValueSource,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CopyButtonSettings {
    pub enabled: bool,
    pub in_toolbar: bool,
    pub label: ValueSource,
    pub inline_handler: InlineCopyHandler,
    pub attrs: IndexMap<String, ValueSource>,
}

impl Default for CopyButtonSettings {
    fn default() -> Self {
        CopyButtonSettings {
            enabled: true,
            in_toolbar: false,
            label: ValueSource::Text(DEFAULT_COPY_BUTTON_LABEL.to_string()),
            inline_handler: InlineCopyHandler::Disabled,
            attrs: IndexMap::new(),
        }
    }
}

/// A label or attribute value: fixed text, or derived from the code block
/// being rendered.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValueSource {
    Text(String),
    Derived {
        from: ContextField,
        #[serde(default)]
        transform: Option<TextTransform>,
    },
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Text(String::new())
    }
}

impl ValueSource {
    pub fn derived(from: ContextField, transform: Option<TextTransform>) -> Self {
        ValueSource::Derived { from, transform }
    }

    pub fn to_content(&self) -> Content {
        match self {
            ValueSource::Text(text) => Content::literal(text.clone()),
            ValueSource::Derived { from, transform } => {
                let (from, transform) = (*from, *transform);
                Content::computed(move |ctx: &RenderContext<'_>| {
                    let value = from.extract(ctx);
                    match transform {
                        Some(transform) => transform.apply(&value),
                        None => value,
                    }
                })
            }
        }
    }
}

/// Piece of the render context a derived value reads.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextField {
    /// First word of the fence info string.
    Language,
    /// Whole fence info string.
    Info,
    /// `fence` or `code_block`.
    Kind,
    /// Position of the block among the document's code blocks.
    Index,
}

impl ContextField {
    fn extract(self, ctx: &RenderContext<'_>) -> String {
        match self {
            ContextField::Language => ctx.language().unwrap_or_default().to_string(),
            ContextField::Info => ctx.info().to_string(),
            ContextField::Kind => ctx.token().kind.as_str().to_string(),
            ContextField::Index => ctx.idx().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    Uppercase,
    Lowercase,
}

impl TextTransform {
    fn apply(self, value: &str) -> String {
        match self {
            TextTransform::Uppercase => value.to_uppercase(),
            TextTransform::Lowercase => value.to_lowercase(),
        }
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn default() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid option in config {path}: {source}")]
    Options {
        path: PathBuf,
        source: CodeWrapError,
    },
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let mut merged = PartialConfig::default();
        let mut layers = vec![ConfigSource::default()];

        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                merged.merge(load_layer(path)?);
                layers.push(ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone()));
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            merged.merge(load_layer(&local_config_path)?);
            layers.push(ConfigSource::for_file(
                ConfigSourceKind::Local,
                local_config_path.clone(),
            ));
        }

        if let Some(path) = override_path {
            merged.merge(load_layer(&path)?);
            layers.push(ConfigSource::for_file(ConfigSourceKind::Override, path));
        }

        Ok(merged.finalize(ConfigSources {
            working_directory: working_dir,
            layers,
        }))
    }

    /// Builds the decorator options described by this configuration.
    pub fn code_wrap_options(&self) -> CodeWrapOptions {
        CodeWrapOptions {
            wrap_tag: self.wrap.tag.clone(),
            wrap_class: self.wrap.class.clone(),
            has_toolbar: self.toolbar.enabled,
            toolbar_tag: self.toolbar.tag.clone(),
            toolbar_class: self.toolbar.class.clone(),
            toolbar_label: self.toolbar.label.to_content(),
            has_copy_button: self.copy_button.enabled,
            is_button_in_toolbar: self.copy_button.in_toolbar,
            copy_button_label: self.copy_button.label.to_content(),
            copy_button_attrs: self
                .copy_button
                .attrs
                .iter()
                .map(|(name, value)| (name.clone(), value.to_content()))
                .collect(),
            inline_copy_handler: self.copy_button.inline_handler.clone(),
        }
    }
}

impl Default for Config {
    /// Built-in defaults, without consulting the filesystem.
    fn default() -> Self {
        PartialConfig::default().finalize(ConfigSources {
            working_directory: PathBuf::from("."),
            layers: vec![ConfigSource::default()],
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

fn load_layer(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    let partial = raw.into_partial().map_err(|source| ConfigError::Options {
        path: path.into(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config layer");
    Ok(partial)
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    wrap_tag: Option<String>,
    wrap_class: Option<String>,
    toolbar_enabled: Option<bool>,
    toolbar_tag: Option<String>,
    toolbar_class: Option<String>,
    toolbar_label: Option<ValueSource>,
    button_enabled: Option<bool>,
    button_in_toolbar: Option<bool>,
    button_label: Option<ValueSource>,
    inline_handler: Option<InlineCopyHandler>,
    button_attrs: IndexMap<String, ValueSource>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.wrap_tag, other.wrap_tag);
        take(&mut self.wrap_class, other.wrap_class);
        take(&mut self.toolbar_enabled, other.toolbar_enabled);
        take(&mut self.toolbar_tag, other.toolbar_tag);
        take(&mut self.toolbar_class, other.toolbar_class);
        take(&mut self.toolbar_label, other.toolbar_label);
        take(&mut self.button_enabled, other.button_enabled);
        take(&mut self.button_in_toolbar, other.button_in_toolbar);
        take(&mut self.button_label, other.button_label);
        take(&mut self.inline_handler, other.inline_handler);
        // Attributes overlay key by key; an overridden key keeps its slot.
        self.button_attrs.extend(other.button_attrs);
    }

    fn finalize(self, sources: ConfigSources) -> Config {
        let button_defaults = CopyButtonSettings::default();
        Config {
            wrap: WrapSettings {
                tag: self.wrap_tag,
                class: self.wrap_class.unwrap_or_default(),
            },
            toolbar: ToolbarSettings {
                enabled: self.toolbar_enabled.unwrap_or(false),
                tag: self.toolbar_tag,
                class: self.toolbar_class.unwrap_or_default(),
                label: self.toolbar_label.unwrap_or_default(),
            },
            copy_button: CopyButtonSettings {
                enabled: self.button_enabled.unwrap_or(button_defaults.enabled),
                in_toolbar: self.button_in_toolbar.unwrap_or(button_defaults.in_toolbar),
                label: self.button_label.unwrap_or(button_defaults.label),
                inline_handler: self
                    .inline_handler
                    .unwrap_or(button_defaults.inline_handler),
                attrs: self.button_attrs,
            },
            sources,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    wrap: Option<RawWrap>,
    #[serde(default)]
    toolbar: Option<RawToolbar>,
    #[serde(default)]
    copy_button: Option<RawCopyButton>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWrap {
    tag: Option<toml::Value>,
    class: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolbar {
    enabled: Option<bool>,
    tag: Option<toml::Value>,
    class: Option<String>,
    label: Option<ValueSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCopyButton {
    enabled: Option<bool>,
    in_toolbar: Option<bool>,
    label: Option<ValueSource>,
    inline_handler: Option<RawInlineHandler>,
    #[serde(default)]
    attrs: IndexMap<String, ValueSource>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInlineHandler {
    Enabled(bool),
    Script(String),
}

impl From<RawInlineHandler> for InlineCopyHandler {
    fn from(raw: RawInlineHandler) -> Self {
        match raw {
            RawInlineHandler::Enabled(enabled) => InlineCopyHandler::from(enabled),
            RawInlineHandler::Script(script) if script.is_empty() => InlineCopyHandler::Disabled,
            RawInlineHandler::Script(script) => InlineCopyHandler::Custom(script),
        }
    }
}

impl RawConfig {
    fn into_partial(self) -> Result<PartialConfig, CodeWrapError> {
        let wrap = self.wrap.unwrap_or_default();
        let toolbar = self.toolbar.unwrap_or_default();
        let button = self.copy_button.unwrap_or_default();

        Ok(PartialConfig {
            wrap_tag: tag_value(TagField::Wrap, wrap.tag)?,
            wrap_class: wrap.class,
            toolbar_enabled: toolbar.enabled,
            toolbar_tag: tag_value(TagField::Toolbar, toolbar.tag)?,
            toolbar_class: toolbar.class,
            toolbar_label: toolbar.label,
            button_enabled: button.enabled,
            button_in_toolbar: button.in_toolbar,
            button_label: button.label,
            inline_handler: button.inline_handler.map(InlineCopyHandler::from),
            button_attrs: button.attrs,
        })
    }
}

/// Tags must be TOML strings; any string is accepted.
fn tag_value(field: TagField, value: Option<toml::Value>) -> Result<Option<String>, CodeWrapError> {
    match value {
        None => Ok(None),
        Some(toml::Value::String(tag)) => Ok(Some(tag)),
        Some(other) => Err(CodeWrapError::InvalidTagName {
            field,
            received: format!("{} `{}`", other.type_str(), other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<PartialConfig, CodeWrapError> {
        let raw: RawConfig = toml::from_str(contents).expect("valid toml");
        raw.into_partial()
    }

    #[test]
    fn non_string_tags_are_rejected() {
        let err = parse("[wrap]\ntag = 5\n").unwrap_err();
        assert_eq!(
            err,
            CodeWrapError::InvalidTagName {
                field: TagField::Wrap,
                received: "integer `5`".to_string(),
            }
        );

        let err = parse("[toolbar]\ntag = true\n").unwrap_err();
        assert!(matches!(
            err,
            CodeWrapError::InvalidTagName {
                field: TagField::Toolbar,
                ..
            }
        ));
    }

    #[test]
    fn any_tag_string_is_accepted() {
        let partial = parse("[wrap]\ntag = \"\"\n").unwrap();
        assert_eq!(partial.wrap_tag.as_deref(), Some(""));

        let partial = parse("[toolbar]\ntag = \"tool_bar\"\n").unwrap();
        assert_eq!(partial.toolbar_tag.as_deref(), Some("tool_bar"));
    }

    #[test]
    fn inline_handler_accepts_bool_or_script() {
        let partial = parse("[copy_button]\ninline_handler = true\n").unwrap();
        assert_eq!(partial.inline_handler, Some(InlineCopyHandler::BuiltIn));

        let partial = parse("[copy_button]\ninline_handler = \"copy(this)\"\n").unwrap();
        assert_eq!(
            partial.inline_handler,
            Some(InlineCopyHandler::Custom("copy(this)".into()))
        );

        let partial = parse("[copy_button]\ninline_handler = \"\"\n").unwrap();
        assert_eq!(partial.inline_handler, Some(InlineCopyHandler::Disabled));
    }

    #[test]
    fn labels_may_be_derived() {
        let partial =
            parse("[toolbar]\nlabel = { from = \"language\", transform = \"uppercase\" }\n")
                .unwrap();
        assert_eq!(
            partial.toolbar_label,
            Some(ValueSource::derived(
                ContextField::Language,
                Some(TextTransform::Uppercase)
            ))
        );
    }

    #[test]
    fn attrs_overlay_keeps_first_position() {
        let mut base = parse("[copy_button.attrs]\nclass = \"a\"\ntitle = \"t\"\n").unwrap();
        base.merge(parse("[copy_button.attrs]\nclass = \"b\"\nrole = \"r\"\n").unwrap());

        let attrs: Vec<(&str, &ValueSource)> = base
            .button_attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("class", &ValueSource::Text("b".into())),
                ("title", &ValueSource::Text("t".into())),
                ("role", &ValueSource::Text("r".into())),
            ]
        );
    }
}

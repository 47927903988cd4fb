use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use markdown_codewrap::{CodeWrapOptions, InlineCopyHandler, MarkdownRenderer, Options};
use markdown_codewrap_config::{Config, ContextField, LoadOptions, TextTransform, ValueSource};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "markdown-codewrap",
    version,
    about = "Render markdown to HTML, wrapping every code block"
)]
pub struct Cli {
    /// Path to markdown file, or `-` to read stdin
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Config file applied on top of discovered `.markdown-codewrap.toml` files
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tag of the element wrapping each code block
    #[arg(long, value_name = "TAG")]
    wrap_tag: Option<String>,

    /// Class of the wrapping element
    #[arg(long, value_name = "CLASS")]
    wrap_class: Option<String>,

    /// Add a toolbar before the code block
    #[arg(long)]
    toolbar: bool,

    #[arg(long, value_name = "TAG")]
    toolbar_tag: Option<String>,

    #[arg(long, value_name = "CLASS")]
    toolbar_class: Option<String>,

    /// Fixed toolbar label
    #[arg(long, value_name = "TEXT", conflicts_with = "toolbar_label_from")]
    toolbar_label: Option<String>,

    /// Derive the toolbar label from the code block
    #[arg(long, value_enum, value_name = "FIELD")]
    toolbar_label_from: Option<LabelField>,

    /// Upper-case the derived toolbar label
    #[arg(long, requires = "toolbar_label_from")]
    uppercase_label: bool,

    /// Do not add a copy button after the code block
    #[arg(long)]
    no_copy_button: bool,

    /// Place the copy button in the toolbar only
    #[arg(long)]
    button_in_toolbar: bool,

    #[arg(long, value_name = "TEXT")]
    copy_label: Option<String>,

    /// Extra copy button attribute (repeatable)
    #[arg(long = "button-attr", value_name = "KEY=VALUE", value_parser = parse_attr)]
    button_attrs: Vec<(String, String)>,

    /// Add the built-in clipboard `onclick` handler
    #[arg(long, conflicts_with_all = ["copy_handler", "no_inline_copy_handler"])]
    inline_copy_handler: bool,

    /// Custom `onclick` script for the copy button
    #[arg(long, value_name = "SCRIPT", conflicts_with = "no_inline_copy_handler")]
    copy_handler: Option<String>,

    /// Drop any configured `onclick` handler
    #[arg(long)]
    no_inline_copy_handler: bool,

    /// Install the wrapper this many times, nesting the output
    #[arg(long, value_name = "N", default_value_t = 1)]
    nest: usize,

    /// Enable tables, strikethrough, footnotes and task lists
    #[arg(long)]
    gfm: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LabelField {
    Language,
    Info,
    Kind,
    Index,
}

impl From<LabelField> for ContextField {
    fn from(field: LabelField) -> Self {
        match field {
            LabelField::Language => ContextField::Language,
            LabelField::Info => ContextField::Info,
            LabelField::Kind => ContextField::Kind,
            LabelField::Index => ContextField::Index,
        }
    }
}

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path);
    }
    let config = Config::load(load).context("Unable to load configuration")?;
    debug!(layers = config.sources.layers.len(), "resolved configuration");

    let options = apply_overrides(config.code_wrap_options(), &cli);
    let renderer = build_renderer(&cli, options)?;

    let source = read_source(&cli.path)
        .with_context(|| format!("Unable to read markdown at: {}", cli.path.display()))?;
    let html = renderer.render(&source);
    info!(bytes = html.len(), "rendered document");

    emit(&html)?;
    Ok(0)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_overrides(mut options: CodeWrapOptions, cli: &Cli) -> CodeWrapOptions {
    if let Some(tag) = &cli.wrap_tag {
        options.wrap_tag = Some(tag.clone());
    }
    if let Some(class) = &cli.wrap_class {
        options.wrap_class = class.clone();
    }
    if cli.toolbar {
        options.has_toolbar = true;
    }
    if let Some(tag) = &cli.toolbar_tag {
        options.toolbar_tag = Some(tag.clone());
    }
    if let Some(class) = &cli.toolbar_class {
        options.toolbar_class = class.clone();
    }
    if let Some(label) = &cli.toolbar_label {
        options.toolbar_label = label.as_str().into();
    }
    if let Some(field) = cli.toolbar_label_from {
        let transform = cli.uppercase_label.then_some(TextTransform::Uppercase);
        options.toolbar_label = ValueSource::derived(field.into(), transform).to_content();
    }
    if cli.no_copy_button {
        options.has_copy_button = false;
    }
    if cli.button_in_toolbar {
        options.is_button_in_toolbar = true;
    }
    if let Some(label) = &cli.copy_label {
        options.copy_button_label = label.as_str().into();
    }
    for (name, value) in &cli.button_attrs {
        options
            .copy_button_attrs
            .insert(name.clone(), value.as_str().into());
    }
    if cli.inline_copy_handler {
        options.inline_copy_handler = InlineCopyHandler::BuiltIn;
    } else if let Some(script) = &cli.copy_handler {
        options.inline_copy_handler = InlineCopyHandler::Custom(script.clone());
    } else if cli.no_inline_copy_handler {
        options.inline_copy_handler = InlineCopyHandler::Disabled;
    }
    options
}

fn build_renderer(cli: &Cli, options: CodeWrapOptions) -> Result<MarkdownRenderer> {
    let markdown_options = if cli.gfm {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_TASKLISTS
    } else {
        Options::empty()
    };

    let mut renderer = MarkdownRenderer::with_options(markdown_options);
    for _ in 0..cli.nest {
        renderer = renderer
            .with_code_wrap(options.clone())
            .context("Invalid code wrap options")?;
    }
    Ok(renderer)
}

fn read_source(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin().lock().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(path)
    }
}

fn parse_attr(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn emit(html: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match handle.write_all(html.as_bytes()).and_then(|_| handle.flush()) {
        Ok(()) => Ok(()),
        Err(err) if should_ignore_pipe_error(&err) => Ok(()),
        Err(err) => Err(err).context("Failed to write rendered HTML"),
    }
}

fn should_ignore_pipe_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WouldBlock
    )
}

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use curve_core::{open_document, Artboard, DecodeOptions, Document, Element, ElementKind};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the .curve or .vectornator file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print the decoded model as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// Only show the artboard at this index
    #[arg(long, value_name = "N")]
    artboard: Option<usize>,

    /// Skip embedding bitmap payloads
    #[arg(long)]
    no_images: bool,

    /// Deepest group nesting to decode
    #[arg(long, value_name = "N")]
    max_group_depth: Option<usize>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(cli.log_level).into())
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match cli.log_format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut options = DecodeOptions::default().with_embed_images(!cli.no_images);
    if let Some(depth) = cli.max_group_depth {
        options = options.with_max_group_depth(depth);
    }

    info!("Reading {:?}", cli.file);
    let mut document = open_document(&cli.file, &options)
        .with_context(|| format!("failed to decode {}", cli.file.display()))?;

    if let Some(index) = cli.artboard {
        if index >= document.artboards.len() {
            bail!(
                "artboard {} out of range, document has {}",
                index,
                document.artboards.len()
            );
        }
        let artboard = document.artboards.swap_remove(index);
        document.artboards = vec![artboard];
    }

    let count = document.all_diagnostics().count();
    for diagnostic in document.all_diagnostics() {
        warn!("{}", diagnostic);
    }
    info!("{} diagnostics", count);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print_document(&document);
    }
    Ok(())
}

fn print_document(document: &Document) {
    println!(
        "{:?} document (app {}, format {}, units {})",
        document.profile.family,
        document.app_version,
        document.profile.file_format_version,
        document.units.as_deref().unwrap_or("unknown")
    );
    for artboard in &document.artboards {
        print_artboard(artboard);
    }
}

fn print_artboard(artboard: &Artboard) {
    println!(
        "Artboard '{}' {}x{}",
        artboard.title, artboard.frame.width, artboard.frame.height
    );
    for layer in &artboard.layers {
        let hidden = if layer.visible { "" } else { " (hidden)" };
        println!("  Layer '{}'{}", layer.name, hidden);
        for element in &layer.elements {
            print_element(element, 2);
        }
    }
    if !artboard.guides.is_empty() {
        println!("  {} guides", artboard.guides.len());
    }
}

fn print_element(element: &Element, depth: usize) {
    let indent = "  ".repeat(depth);
    let detail = match &element.kind {
        ElementKind::Path(path) => format!(" ({} subpaths)", path.geometries.len()),
        ElementKind::Text(text) => format!(" ({:?}, {} runs)", text.string, text.runs.len()),
        ElementKind::Group { children } => format!(" ({} children)", children.len()),
        _ => String::new(),
    };
    println!("{}{} '{}'{}", indent, element.kind.label(), element.name, detail);
    for child in element.children() {
        print_element(child, depth + 1);
    }
}

//! Stampdesk command-line front end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use stampdesk::config::{AppConfig, ConfigError};
use stampdesk::model::{Annotation, AnnotationContent, AnnotationKind, Point};
use stampdesk::pdf::{LopdfBackend, PdfBackend};
use stampdesk::{DocumentSession, Library, SessionEvent, TintColor};

#[derive(Parser, Debug)]
#[command(name = "stampdesk", version, about = "Place stamps and signatures on PDF pages")]
struct Cli {
    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp an image onto a page and write a flattened copy
    Stamp {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Image file to place
        #[arg(long, required_unless_present = "item", conflicts_with = "item")]
        image: Option<PathBuf>,
        /// Library item id to place
        #[arg(long)]
        item: Option<String>,
        /// 0-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Left edge in PDF points from the page's top-left corner
        #[arg(long, default_value_t = 0.0)]
        x: f32,
        /// Top edge in PDF points from the page's top-left corner
        #[arg(long, default_value_t = 0.0)]
        y: f32,
        /// Width in PDF points; height follows the image's aspect ratio
        #[arg(long, default_value_t = 100.0)]
        width: f32,
        /// Tint color as #RRGGBB
        #[arg(long)]
        tint: Option<TintColor>,
        /// Place as a signature instead of a stamp
        #[arg(long)]
        signature: bool,
    },
    /// Print page count and page sizes
    Info { pdf: PathBuf },
    /// Manage the stamp and signature libraries
    Library {
        #[arg(long, value_enum, default_value_t = KindArg::Stamp, global = true)]
        kind: KindArg,
        #[command(subcommand)]
        action: LibraryAction,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// List items, optionally in one category
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Import an image file
    Add {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "General")]
        category: String,
    },
    Rename { id: String, name: String },
    Delete { id: String },
    /// Set an item's tint (#RRGGBB), or clear it with "none"
    Color { id: String, color: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Stamp,
    Signature,
}

impl From<KindArg> for AnnotationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Stamp => AnnotationKind::Stamp,
            KindArg::Signature => AnnotationKind::Signature,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_warning) = load_config(cli.config.as_deref())?;

    env_logger::Builder::new()
        .filter_level(
            config
                .preferences
                .log_level
                .raised(cli.verbose)
                .to_level_filter(),
        )
        .init();
    if let Some(e) = config_warning {
        log::warn!("⚠️ Ignoring default config file, using defaults: {}", e);
    }

    match cli.command {
        Command::Stamp {
            input,
            output,
            image,
            item,
            page,
            x,
            y,
            width,
            tint,
            signature,
        } => {
            let kind = if signature {
                AnnotationKind::Signature
            } else {
                AnnotationKind::Stamp
            };
            let (bytes, name, library_tint) = match (image, item) {
                (Some(path), _) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read image {}", path.display()))?;
                    (bytes, file_stem(&path), None)
                }
                (None, Some(id)) => {
                    let library = open_library(&config, kind)?;
                    let (bytes, item) = library.item_data(&id)?;
                    (bytes, item.name.clone(), item.tint_color)
                }
                (None, None) => bail!("Either --image or --item is required"),
            };
            stamp(&config, &input, &output, StampRequest {
                kind,
                bytes,
                name,
                page,
                top_left: Point::new(x, y),
                width,
                tint: tint.or(library_tint),
            })
        }
        Command::Info { pdf } => info(&pdf),
        Command::Library { kind, action } => library(&config, kind.into(), action),
    }
}

/// Load the config named on the command line, or the default one.
///
/// An explicit `--config` must load. A broken default config falls back to
/// defaults; its error is returned alongside so it can be logged once the
/// logger, whose level the config sets, is running.
fn load_config(path: Option<&Path>) -> Result<(AppConfig, Option<ConfigError>)> {
    match path {
        Some(path) => {
            let config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            Ok((config, None))
        }
        None => Ok(match AppConfig::load_from_default_path() {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (AppConfig::default(), Some(e)),
        }),
    }
}

fn open_library(config: &AppConfig, kind: AnnotationKind) -> Result<Library> {
    let root = config
        .library_root()
        .context("Could not determine a library directory; set library_root in the config")?;
    Ok(Library::open(&root, kind)?)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Stamp".to_string())
}

struct StampRequest {
    kind: AnnotationKind,
    bytes: Vec<u8>,
    name: String,
    page: usize,
    top_left: Point,
    width: f32,
    tint: Option<TintColor>,
}

fn stamp(config: &AppConfig, input: &Path, output: &Path, request: StampRequest) -> Result<()> {
    let decoded = image::load_from_memory(&request.bytes).context("Image could not be decoded")?;
    let ratio = decoded.width() as f32 / decoded.height() as f32;
    if request.width <= 0.0 {
        bail!("Width must be positive");
    }

    let mut session = DocumentSession::with_options(LopdfBackend::new(), config.session_options());
    session.subscribe(Box::new(|event| {
        if let SessionEvent::Saved(path) = event {
            println!("Wrote {}", path.display());
        }
    }));
    let pages = session
        .open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    if request.page >= pages {
        bail!("Page {} out of range ({} pages)", request.page, pages);
    }

    let content = AnnotationContent::new(request.bytes, request.name, ratio).with_tint(request.tint);
    let annotation = Annotation::sized_from_width(
        request.kind,
        request.top_left,
        request.width,
        request.page,
        content,
    );
    session
        .add_annotation(annotation)
        .context("Annotation was rejected")?;
    session.save(output)?;
    Ok(())
}

fn info(pdf: &Path) -> Result<()> {
    let mut backend = LopdfBackend::new();
    let doc = backend
        .open(pdf)
        .with_context(|| format!("Failed to open {}", pdf.display()))?;
    let pages = backend.page_count(doc)?;
    println!("{}: {} pages", pdf.display(), pages);
    for page in 0..pages {
        let size = backend.page_size(doc, page)?;
        println!("  page {}: {:.1} x {:.1} pt", page, size.width, size.height);
    }
    backend.close(doc);
    Ok(())
}

fn library(config: &AppConfig, kind: AnnotationKind, action: LibraryAction) -> Result<()> {
    let mut library = open_library(config, kind)?;
    match action {
        LibraryAction::List { category } => {
            for (id, item) in library.list_items(category.as_deref()) {
                let tint = item.tint_color.map(|c| c.to_hex()).unwrap_or_default();
                println!(
                    "{}  {:<24} {:<12} {}x{} {}",
                    id, item.name, item.category, item.original_width, item.original_height, tint
                );
            }
        }
        LibraryAction::Add {
            file,
            name,
            category,
        } => {
            let name = name.unwrap_or_else(|| file_stem(&file));
            let id = library.import_file(&file, &name, &category)?;
            println!("{}", id);
        }
        LibraryAction::Rename { id, name } => {
            if !library.rename(&id, &name)? {
                bail!("No item {}", id);
            }
        }
        LibraryAction::Delete { id } => {
            if !library.delete(&id)? {
                bail!("No item {}", id);
            }
        }
        LibraryAction::Color { id, color } => {
            let color = if color.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(color.parse::<TintColor>()?)
            };
            if !library.update_color(&id, color)? {
                bail!("No item {}", id);
            }
        }
    }
    Ok(())
}

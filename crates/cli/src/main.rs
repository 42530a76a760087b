use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use pluck_core::{
    Archive, Candidate, Document, FetchMode, Fetcher, Pluck, PluckConfig, PluckError, extract_images, fetch_file,
    fetch_stdin,
};
use tracing_subscriber::EnvFilter;

mod echo;
mod interactive;

use echo::{DownloadBar, format_size, print_banner, print_detail, print_error, print_step, print_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for `--list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFormat {
    Text,
    Json,
}

impl FromStr for ListFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: text, json", s)),
        }
    }
}

/// Download every image of an article page as a zip archive
#[derive(Parser, Debug)]
#[command(name = "pluck")]
#[command(version)]
#[command(about = "Download the images of an article page as a zip archive", long_about = None)]
struct Args {
    /// Article URL
    #[arg(value_name = "URL")]
    url: String,

    /// Archive path (default: suggested name in the current directory)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Read the article HTML from a file, or "-" for stdin, instead of fetching URL
    #[arg(long, value_name = "FILE")]
    html: Option<String>,

    /// Only list the discovered image URLs
    #[arg(short, long)]
    list: bool,

    /// Output format for --list (text, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: ListFormat,

    /// Choose images page by page before packaging
    #[arg(short, long, conflicts_with = "list")]
    interactive: bool,

    /// Fetch images one at a time
    #[arg(long)]
    sequential: bool,

    /// Parallel image downloads
    #[arg(short, long, default_value = "8", value_name = "NUM")]
    jobs: usize,

    /// Document request timeout in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    timeout: u64,

    /// Per-image request timeout in seconds
    #[arg(long, default_value = "5", value_name = "SECS")]
    image_timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// id of the element holding the article body
    #[arg(long, default_value = "js_content", value_name = "ID")]
    content_id: String,

    /// Attribute holding the real image URL
    #[arg(long, default_value = "data-src", value_name = "ATTR")]
    lazy_attr: String,

    /// Ignore image sources shorter than this
    #[arg(long, default_value = "0", value_name = "NUM")]
    min_src_len: usize,

    /// Images per page in interactive mode
    #[arg(long, default_value = "12", value_name = "NUM")]
    page_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> PluckConfig {
        let mut builder = PluckConfig::builder()
            .document_timeout(self.timeout)
            .image_timeout(self.image_timeout)
            .content_id(self.content_id.as_str())
            .lazy_attr(self.lazy_attr.as_str())
            .min_src_len(self.min_src_len)
            .concurrency(self.jobs)
            .page_size(self.page_size)
            .mode(if self.sequential { FetchMode::Sequential } else { FetchMode::Concurrent });

        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.as_str());
        }
        builder.build()
    }

    fn output_path(&self, archive: &Archive) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from(archive.file_name()))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pluck_core=debug,pluck=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Reads the article from `--html` or fetches it
async fn load_html(pluck: &Pluck, args: &Args) -> anyhow::Result<String> {
    match args.html.as_deref() {
        Some("-") => fetch_stdin().context("Failed to read from stdin"),
        Some(path) => fetch_file(path).with_context(|| format!("Failed to read file: {}", path)),
        None => pluck
            .fetcher()
            .fetch_document(args.url.trim())
            .await
            .context("Failed to fetch article"),
    }
}

fn print_list(candidates: &[Candidate], format: ListFormat) -> anyhow::Result<()> {
    match format {
        ListFormat::Text => {
            for candidate in candidates {
                println!("{}", candidate.url);
            }
        }
        ListFormat::Json => {
            let json = serde_json::to_string_pretty(candidates).context("Failed to serialize candidates")?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Writes the archive and reports the outcome
pub(crate) fn save_archive(archive: &Archive, path: &Path) -> anyhow::Result<()> {
    archive
        .write_to(path)
        .with_context(|| format!("Failed to write archive: {}", path.display()))?;

    if archive.is_empty() {
        print_error(&format!(
            "None of the {} images could be downloaded; wrote an empty archive to {}",
            archive.attempted(),
            path.display()
        ));
    } else {
        print_success(&format!(
            "Saved {} of {} images to {} ({})",
            archive.entry_count(),
            archive.attempted(),
            path.display().bright_white(),
            format_size(archive.bytes().len())
        ));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
    }

    let pluck = Pluck::with_config(args.config()).context("Failed to set up HTTP client")?;
    tracing::debug!(
        mode = ?pluck.config().mode,
        concurrency = pluck.config().concurrency,
        page_size = pluck.config().page_size,
        "client configured"
    );
    pluck.validate(&args.url).context("Invalid article URL")?;

    if args.interactive {
        return interactive::run(pluck, &args).await;
    }

    if args.verbose {
        print_step(1, 4, &format!("Loading {}", args.url.bright_white().underline()));
    }
    let html = load_html(&pluck, &args).await?;

    if args.verbose {
        print_detail("Size", &format_size(html.len()));
        print_step(2, 4, "Parsing HTML document");
    }
    let doc = Document::parse(&html).context("Failed to parse article")?;
    if args.verbose {
        if let Some(title) = doc.title() {
            print_detail("Title", &title);
        }
        print_step(3, 4, "Locating images");
    }

    let candidates = extract_images(&doc, &pluck.config().extract).context("Failed to extract images")?;
    if candidates.is_empty() {
        print_error("No images found; the article may have been removed or is unavailable");
        return Err(anyhow::Error::new(PluckError::NoImages).context("Nothing to download"));
    }

    if args.verbose {
        print_detail("Images", &candidates.len().to_string());
    }

    if args.list {
        return print_list(&candidates, args.format);
    }

    if args.verbose {
        print_step(4, 4, "Downloading images");
    }
    let mut bar = DownloadBar::default();
    let archive = pluck
        .package(&candidates, |progress| bar.update(progress))
        .await
        .context("Failed to build archive")?;

    save_archive(&archive, &args.output_path(&archive))
}

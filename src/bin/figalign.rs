//! CLI binary for figalign.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use figalign::{
    inspect_markup, run_batch, BatchConfig, BatchProgressCallback, FigureNumber,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the corpus plus a log line per
/// document.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the document count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Aligning");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} PDFs…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, records: usize) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{records} figures")),
        ));
        self.bar.inc(1);
    }

    fn on_document_skipped(&self, index: usize, total: usize, name: &str, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if reason.chars().count() > 80 {
            let head: String = reason.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            reason.to_string()
        };

        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, processed: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);

        if skipped == 0 {
            eprintln!(
                "{} {} PDFs processed successfully",
                green("✔"),
                bold(&processed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} PDFs processed  ({} skipped)",
                if processed == 0 { red("✘") } else { cyan("⚠") },
                bold(&processed.to_string()),
                total_documents,
                red(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default layout: ./data_pdf + ./data_tei_xml → ./data_figure_html
  figalign

  # Explicit directories, clearing the output of a previous run
  figalign --pdf-dir pdfs --markup-dir tei -o figures --reset-output

  # Render crops at twice the PDF resolution
  figalign --zoom 2 --reset-output

  # Print captions and figure numbers of one TEI file (no PDF needed)
  figalign --inspect tei/paper.tei.xml

  # Batch statistics as JSON
  figalign --json --reset-output > stats.json

OUTPUT LAYOUT:
  <output>/<name>/coord_page_<P>_figure_<N>.png   crops of caption coordinates
  <output>/<name>/extract_page_<P>_image_<I>.png  embedded images, duplicates removed
  <output>/<name>/<name>.html                     figure table + extra images
  <output>/<name>/<name>.json                     the same, machine-readable
  <output>/error_log.tsv                          everything that could not be resolved

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  FIGALIGN_*        Every flag, e.g. FIGALIGN_ZOOM=2
  RUST_LOG          Overrides the log filter
"#;

/// Pair GROBID figure captions with images cropped from the source PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "figalign",
    version,
    about = "Pair GROBID figure captions with images cropped from the source PDFs",
    long_about = "Read GROBID TEI markup next to each PDF, crop every figure whose caption \
carries bitmap coordinates, extract the remaining embedded images (repeated artwork removed), \
and write one HTML/JSON report per PDF plus a batch-wide error log.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDFs.
    #[arg(long, env = "FIGALIGN_PDF_DIR", default_value = "./data_pdf")]
    pdf_dir: PathBuf,

    /// Directory containing the TEI files.
    #[arg(long, env = "FIGALIGN_MARKUP_DIR", default_value = "./data_tei_xml")]
    markup_dir: PathBuf,

    /// Output root directory.
    #[arg(short, long, env = "FIGALIGN_OUTPUT", default_value = "./data_figure_html")]
    output: PathBuf,

    /// Markup file suffix appended to each PDF base name.
    #[arg(long, env = "FIGALIGN_MARKUP_EXT", default_value = ".tei.xml")]
    markup_ext: String,

    /// Render scale for coordinate crops (0.1–10).
    #[arg(long, env = "FIGALIGN_ZOOM", default_value_t = 1.0)]
    zoom: f32,

    /// Delete the contents of a non-empty output directory before the run.
    #[arg(long, env = "FIGALIGN_RESET_OUTPUT")]
    reset_output: bool,

    /// Skip the per-document HTML report.
    #[arg(long, env = "FIGALIGN_NO_HTML")]
    no_html: bool,

    /// Skip the per-document JSON report.
    #[arg(long, env = "FIGALIGN_NO_JSON")]
    no_json: bool,

    /// Path to libpdfium (file, or directory holding it).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print captions and figure numbers of one markup file, no PDF needed.
    #[arg(long, value_name = "MARKUP")]
    inspect: Option<PathBuf>,

    /// Output JSON (batch statistics, or the inspection) on stdout.
    #[arg(long, env = "FIGALIGN_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FIGALIGN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FIGALIGN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FIGALIGN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inspect.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect mode ─────────────────────────────────────────────────────
    if let Some(ref path) = cli.inspect {
        let inspection = inspect_markup(path)
            .with_context(|| format!("Failed to inspect {}", path.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&inspection)
                    .context("Failed to serialise inspection")?
            );
        } else {
            println!("File:      {}", path.display());
            println!("Captions:  {}", inspection.captions.len());
            println!("Unmatched: {}", inspection.unmatched_blocks);
            for caption in &inspection.captions {
                let number = match &caption.figure_number {
                    FigureNumber::Resolved(n) => n.clone(),
                    FigureNumber::Unresolved => red("Error"),
                };
                println!(
                    "  {:<6} {:<28} {}",
                    number,
                    caption.coordinates.as_deref().unwrap_or("-"),
                    caption.description
                );
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let output = run_batch(&config).await.context("Batch failed")?;
    let stats = &output.stats;

    if cli.json {
        let json = serde_json::to_string_pretty(stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} PDFs  {} figures  {} crops  {} extracted  {}ms",
            if stats.failed_documents + stats.skipped_documents == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_documents,
            stats.total_documents,
            stats.aligned_records,
            stats.cropped_images,
            stats.extracted_images,
            stats.total_duration_ms,
        );
        eprintln!(
            "   {} error rows  →  {}",
            dim(&stats.errors_logged.to_string()),
            bold(&output.error_log_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .pdf_dir(&cli.pdf_dir)
        .markup_dir(&cli.markup_dir)
        .output_root(&cli.output)
        .markup_extension(&cli.markup_ext)
        .zoom(cli.zoom)
        .reset_output_root(cli.reset_output)
        .write_html_report(!cli.no_html)
        .write_json_report(!cli.no_json);

    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

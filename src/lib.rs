//! # figalign
//!
//! Correlate figure captions from GROBID TEI markup with images cropped from
//! the source PDFs, and collect the remaining embedded images of each PDF
//! with boilerplate artwork filtered out.
//!
//! ## Why this crate?
//!
//! GROBID finds figure captions and, for bitmap figures, the box on the page
//! where the figure sits. It does not hand back the pixels. This crate
//! renders those boxes, pairs each rendered image with its caption and
//! figure label, and writes one browsable report per paper together with a
//! batch-wide TSV of everything that could not be resolved.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + TEI
//!  │
//!  ├─ 1. Input     pair <name>.pdf with <name>.tei.xml
//!  ├─ 2. Captions  figDesc text + bitmap coords, tables skipped
//!  ├─ 3. Crop      render each coords box via pdfium
//!  ├─ 4. Dedup     embedded images, repeated byte sizes dropped
//!  ├─ 5. Align     caption ↔ crop by position, figure labels resolved
//!  └─ 6. Report    <name>.html + <name>.json, error_log.tsv
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use figalign::{run_batch, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .pdf_dir("data_pdf")
//!         .markup_dir("data_tei_xml")
//!         .output_root("data_figure_html")
//!         .reset_output_root(true)
//!         .build()?;
//!     let output = run_batch(&config).await?;
//!     eprintln!(
//!         "{}/{} documents, {} error rows in {}",
//!         output.stats.processed_documents,
//!         output.stats.total_documents,
//!         output.stats.errors_logged,
//!         output.error_log_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `figalign` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! figalign = { version = "0.1", default-features = false }
//! ```
//!
//! ## Testing without pdfium
//!
//! Every PDF access goes through [`PdfOpener`] / [`PdfSource`]. Implement
//! them over in-memory data and call [`run_batch_with`] to drive the whole
//! pipeline without a pdfium library.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod error_log;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    inspect_markup, prepare_output_root, process_document, run_batch, run_batch_sync,
    run_batch_with, InspectedCaption, MarkupInspection,
};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use error::{CaptionError, FigAlignError};
pub use error_log::{ErrorEntry, ErrorKind, ErrorLog};
pub use output::{
    AlignmentRecord, BatchOutput, BatchStats, CropSlot, DocumentReport, FigureCaption,
    FigureNumber, ImageAsset, ImageOrigin,
};
pub use pipeline::source::{EmbeddedImage, PdfOpener, PdfSource, PdfiumOpener};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};

//! Error types for the figalign library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FigAlignError`]: **Fatal**, either the whole batch cannot proceed
//!   (input directory missing, output root not confirmed for reset, pdfium
//!   not bindable) or a single document cannot proceed (corrupt PDF, crop
//!   list out of step with its captions). Document-level failures are caught
//!   by the orchestrator, written to the error log, and the batch moves on.
//!
//! * [`CaptionError`]: **Non-fatal**, one caption could not be resolved
//!   (no recognisable figure label). The alignment builder substitutes a
//!   placeholder and keeps walking.
//!
//! Everything that ends up in the user-facing TSV is described by
//! [`crate::error_log::ErrorKind`]; these types are the Rust-side view.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the figalign library.
///
/// Per-caption failures use [`CaptionError`] and are logged rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum FigAlignError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An input directory does not exist.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is readable.")]
    InputDirNotFound { path: PathBuf },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Could not read an input file (markup or PDF).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A coordinate string named a page the document does not have.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while rendering a page region.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered image could not be PNG-encoded.
    #[error("Image encoding failed: {0}")]
    ImageEncodingFailed(#[from] image::ImageError),

    // ── Markup errors ─────────────────────────────────────────────────────
    /// A `coords` attribute did not decode to `page,x,y,width,height`.
    #[error("Invalid coordinate string '{raw}': {reason}")]
    InvalidCoordinates { raw: String, reason: String },

    // ── Alignment errors ──────────────────────────────────────────────────
    /// The crop list and the coordinate-bearing captions disagree in length,
    /// so positional pairing would attach images to the wrong captions.
    #[error(
        "Alignment desynchronised for '{document}': {expected} captions carry coordinates \
         but {actual} cropped images were produced"
    )]
    AlignmentDesync {
        document: String,
        expected: usize,
        actual: usize,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output root holds files from a previous run and the caller did not
    /// confirm it may be cleared.
    #[error(
        "Output directory '{path}' is not empty.\n\
         Pass --reset-output to clear it before the run."
    )]
    OutputRootNotEmpty { path: PathBuf },

    /// Resetting the output root would delete an input directory.
    #[error("Output directory '{root}' overlaps input directory '{input}'; refusing to reset it")]
    OutputRootOverlapsInput { root: PathBuf, input: PathBuf },

    /// A document report could not be serialised to JSON.
    #[error("Failed to serialise report: {0}")]
    ReportSerializationFailed(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single caption.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum CaptionError {
    /// No "Figure N" / "Fig. N" / "figure supplement N" label in the caption.
    #[error("No figure number found in description: {description}")]
    NoFigureNumberFound { description: String },
}

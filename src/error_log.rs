//! The batch-wide error log and its TSV serialisation.
//!
//! Every condition the pipeline cannot resolve on its own (a missing TEI
//! file, an unlabelled caption, a boilerplate image, …) becomes one
//! [`ErrorEntry`]. Entries from all documents go to a single [`ErrorLog`]
//! which is written as `error_log.tsv` at the output root when the batch
//! finishes.
//!
//! Appends go through a `Mutex` so one log can be shared by documents
//! processed on different threads.

use crate::error::FigAlignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Header row of `error_log.tsv`.
pub const TSV_HEADER: &str = "PDF Filename\tImage Path\tFigure Description\tError\tExplanation";

/// What went wrong, as shown in the `Error` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The PDF has no `<base>.tei.xml` sibling; the document is skipped.
    MissingTeiFile,
    /// A caption has no recognisable figure label.
    NoFigureNumberFound,
    /// A caption has neither a figure label nor coordinates; it is dropped.
    NoCoordinatesAndNoFigureNumber,
    /// An embedded image shares its byte length with another image.
    DuplicateImageSize,
    /// A coordinate-bearing caption could not be cropped.
    CropFailed,
    /// The PDF could not be opened or decoded; the document is skipped.
    PdfUnreadable,
    /// Captions and cropped images fell out of step; the document is skipped.
    AlignmentDesync,
    /// The TEI file exists but could not be read; the document is skipped.
    TeiUnreadable,
    /// The document's images or reports could not be written; the document
    /// is skipped.
    OutputWriteFailed,
    /// Another PDF, or the error log, already owns this document's output
    /// name; the document is skipped.
    DocumentNameConflict,
}

impl ErrorKind {
    /// Human-readable label written to the TSV.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::MissingTeiFile => "No corresponding TEI file found",
            ErrorKind::NoFigureNumberFound => "No figure number",
            ErrorKind::NoCoordinatesAndNoFigureNumber => "No coordinates and no figure number",
            ErrorKind::DuplicateImageSize => "Duplicate image size detected",
            ErrorKind::CropFailed => "Crop failed",
            ErrorKind::PdfUnreadable => "PDF could not be processed",
            ErrorKind::AlignmentDesync => "Caption/image alignment lost",
            ErrorKind::TeiUnreadable => "TEI file could not be read",
            ErrorKind::OutputWriteFailed => "Output could not be written",
            ErrorKind::DocumentNameConflict => "Document name conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// PDF base name (no extension).
    pub document: String,
    /// Image the row refers to, when one was written.
    pub image_path: Option<PathBuf>,
    /// Caption text or other context (page/index/size for images).
    pub context: String,
    pub kind: ErrorKind,
    pub explanation: String,
}

impl ErrorEntry {
    pub fn new(
        document: impl Into<String>,
        kind: ErrorKind,
        context: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            document: document.into(),
            image_path: None,
            context: context.into(),
            kind,
            explanation: explanation.into(),
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Render as a single TSV line (no trailing newline).
    pub fn to_tsv_row(&self) -> String {
        let image = self
            .image_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        [
            sanitize_field(&self.document),
            sanitize_field(&image),
            sanitize_field(&self.context),
            sanitize_field(self.kind.label()),
            sanitize_field(&self.explanation),
        ]
        .join("\t")
    }
}

/// Tabs and line breaks would split a row; replace them with spaces.
fn sanitize_field(field: &str) -> String {
    field.replace(['\t', '\r', '\n'], " ")
}

/// Append-only, lock-protected collection of [`ErrorEntry`] rows.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Mutex<Vec<ErrorEntry>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn record(&self, entry: ErrorEntry) {
        debug!(
            document = %entry.document,
            kind = ?entry.kind,
            "error log: {}",
            entry.explanation
        );
        self.lock().push(entry);
    }

    /// Move every entry of `other` to the end of this log, preserving order.
    pub fn absorb(&self, other: ErrorLog) {
        let drained = other
            .entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.lock().extend(drained);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.lock().clone()
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// The full TSV document, header included, newline-terminated.
    pub fn to_tsv(&self) -> String {
        let entries = self.lock();
        let mut out = String::with_capacity(64 * (entries.len() + 1));
        out.push_str(TSV_HEADER);
        out.push('\n');
        for entry in entries.iter() {
            out.push_str(&entry.to_tsv_row());
            out.push('\n');
        }
        out
    }

    /// Write the TSV to `path`, creating parent directories as needed.
    pub fn write_tsv(&self, path: &Path) -> Result<(), FigAlignError> {
        let write_err = |source| FigAlignError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut file = std::fs::File::create(path).map_err(write_err)?;
        file.write_all(self.to_tsv().as_bytes()).map_err(write_err)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ErrorEntry>> {
        // A panic while holding the lock cannot leave a half-pushed Vec.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_starts_with_header() {
        let log = ErrorLog::new();
        assert_eq!(log.to_tsv(), format!("{TSV_HEADER}\n"));
        assert!(log.is_empty());
    }

    #[test]
    fn row_has_five_columns_even_without_image() {
        let entry = ErrorEntry::new(
            "paper",
            ErrorKind::MissingTeiFile,
            "",
            "No corresponding TEI file found",
        );
        let row = entry.to_tsv_row();
        assert_eq!(row.split('\t').count(), 5, "row: {row:?}");
        assert!(row.starts_with("paper\t\t\t"));
    }

    #[test]
    fn caption_with_tabs_and_newlines_stays_on_one_row() {
        let entry = ErrorEntry::new(
            "paper",
            ErrorKind::NoFigureNumberFound,
            "line one\nline\ttwo",
            "No figure number found",
        )
        .with_image("out/paper/coord_page_1_figure_1.png");
        let row = entry.to_tsv_row();
        assert!(!row.contains('\n'));
        assert_eq!(row.split('\t').count(), 5);
        assert!(row.contains("line one line two"));
        assert!(row.contains("coord_page_1_figure_1.png"));
    }

    #[test]
    fn absorb_appends_in_order() {
        let batch = ErrorLog::new();
        batch.record(ErrorEntry::new("a", ErrorKind::MissingTeiFile, "", "x"));

        let doc = ErrorLog::new();
        doc.record(ErrorEntry::new("b", ErrorKind::DuplicateImageSize, "", "y"));
        doc.record(ErrorEntry::new("b", ErrorKind::CropFailed, "", "z"));
        batch.absorb(doc);

        let docs: Vec<_> = batch.entries().into_iter().map(|e| e.document).collect();
        assert_eq!(docs, vec!["a", "b", "b"]);
        assert_eq!(batch.count(ErrorKind::DuplicateImageSize), 1);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn write_tsv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/error_log.tsv");
        let log = ErrorLog::new();
        log.record(ErrorEntry::new("doc", ErrorKind::PdfUnreadable, "", "corrupt"));
        log.write_tsv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().contains("PDF could not be processed"));
    }
}

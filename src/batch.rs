//! Batch orchestration: walk the corpus and drive the pipeline per document.
//!
//! ```text
//! prepare_output_root ─▶ discover_documents ─▶ for each document (sorted):
//!     name taken?      ─▶ DocumentNameConflict row, next
//!     markup missing?  ─▶ MissingTEIFile row, next
//!     process_document ─▶ captions → crop → dedup → align → report
//!     failure          ─▶ document directory removed, one failure row, next
//! ─▶ error_log.tsv
//! ```
//!
//! Every document logs into its own [`ErrorLog`], which is folded into the
//! batch log once the document is done. Rows therefore come out in document
//! order whatever the caller's scheduling. A document that fails contributes
//! only its failure row; whatever it had logged or written before failing is
//! discarded.

use crate::config::{BatchConfig, ERROR_LOG_FILE_NAME};
use crate::error::FigAlignError;
use crate::error_log::{ErrorEntry, ErrorKind, ErrorLog};
use crate::output::{BatchOutput, BatchStats, DocumentReport, FigureNumber};
use crate::pipeline::captions::{scan_captions, CaptionScan};
use crate::pipeline::figure_number::extract_figure_number;
use crate::pipeline::input::{self, DocumentJob, OutputNames};
use crate::pipeline::source::{PdfOpener, PdfiumOpener};
use crate::pipeline::{align, crop, dedup, report};
use crate::progress::{BatchProgressCallback, NoopProgressCallback};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub use crate::pipeline::input::discover_documents;

// ── Output root ──────────────────────────────────────────────────────────

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Make `root` an empty directory ready for a run.
///
/// An existing non-empty root is only cleared when `reset` is true. A root
/// that equals or contains one of `inputs` is always refused.
pub fn prepare_output_root(
    root: &Path,
    reset: bool,
    inputs: &[&Path],
) -> Result<(), FigAlignError> {
    let root_abs = normalize(root);
    for input in inputs {
        if normalize(input).starts_with(&root_abs) {
            return Err(FigAlignError::OutputRootOverlapsInput {
                root: root.to_path_buf(),
                input: input.to_path_buf(),
            });
        }
    }

    let write_err = |source| FigAlignError::OutputWriteFailed {
        path: root.to_path_buf(),
        source,
    };

    if root.exists() {
        let mut entries = std::fs::read_dir(root).map_err(write_err)?;
        if entries.next().is_some() {
            if !reset {
                return Err(FigAlignError::OutputRootNotEmpty {
                    path: root.to_path_buf(),
                });
            }
            info!("Clearing output directory {}", root.display());
            std::fs::remove_dir_all(root).map_err(write_err)?;
        }
    }

    std::fs::create_dir_all(root).map_err(write_err)?;
    Ok(())
}

// ── One document ─────────────────────────────────────────────────────────

/// Run the full pipeline for one document and write its reports.
///
/// Caption-level problems go to `error_log`; the returned error is a
/// document-level failure the caller is expected to log.
pub fn process_document(
    opener: &impl PdfOpener,
    job: &DocumentJob,
    config: &BatchConfig,
    error_log: &ErrorLog,
) -> Result<DocumentReport, FigAlignError> {
    let markup = input::read_markup(&job.markup_path)?;
    let scan = scan_captions(&markup);
    if scan.unmatched_blocks > 0 {
        warn!(
            "{}: {} figure block(s) did not match the expected layout",
            job.name, scan.unmatched_blocks
        );
    }

    let doc_dir = config.output_root.join(&job.name);
    let coordinates = scan.coordinates();
    debug!(
        "{}: {} captions, {} with coordinates",
        job.name,
        scan.captions.len(),
        coordinates.len()
    );

    let (crops, extracted) = opener.with_document(&job.pdf_path, |source| {
        let crops = crop::crop_regions(source, &coordinates, &doc_dir, config.zoom)?;
        let extracted = dedup::extract_unique_images(source, &doc_dir, &job.name, error_log)?;
        Ok((crops, extracted))
    })?;

    let cropped_images = crops.iter().filter(|slot| slot.asset().is_some()).count();
    let alignment = align::align(
        &job.name,
        &scan.captions,
        &crops,
        extracted.kept,
        error_log,
    )?;

    let document_report = DocumentReport {
        document: job.name.clone(),
        caption_count: scan.captions.len(),
        unmatched_blocks: scan.unmatched_blocks,
        records: alignment.records,
        gallery: alignment.gallery,
        cropped_images,
        duplicates_excluded: extracted.excluded,
    };

    report::write_reports(
        &document_report,
        &doc_dir,
        config.write_html_report,
        config.write_json_report,
    )?;

    Ok(document_report)
}

/// Error-log kind for a document-level failure of `job`.
fn failure_kind(job: &DocumentJob, err: &FigAlignError) -> ErrorKind {
    match err {
        FigAlignError::AlignmentDesync { .. } => ErrorKind::AlignmentDesync,
        FigAlignError::FileNotFound { path } | FigAlignError::ReadFailed { path, .. }
            if *path == job.markup_path =>
        {
            ErrorKind::TeiUnreadable
        }
        FigAlignError::OutputWriteFailed { .. }
        | FigAlignError::ImageEncodingFailed(_)
        | FigAlignError::ReportSerializationFailed(_) => ErrorKind::OutputWriteFailed,
        _ => ErrorKind::PdfUnreadable,
    }
}

/// Remove what a failed document managed to write.
fn discard_document_output(doc_dir: &Path) {
    if !doc_dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(doc_dir) {
        Ok(()) => debug!("Removed partial output {}", doc_dir.display()),
        Err(e) => warn!("Could not remove partial output {}: {}", doc_dir.display(), e),
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// Process every document of the corpus with `opener`.
///
/// Only batch-level problems are returned as errors: missing input
/// directory, output root refused, error log not writable. Everything else
/// is logged and the batch moves on.
pub fn run_batch_with(
    config: &BatchConfig,
    opener: &impl PdfOpener,
) -> Result<BatchOutput, FigAlignError> {
    let start = Instant::now();
    let noop = NoopProgressCallback;
    let progress: &dyn BatchProgressCallback = match &config.progress_callback {
        Some(cb) => cb.as_ref(),
        None => &noop,
    };

    prepare_output_root(
        &config.output_root,
        config.reset_output_root,
        &[&config.pdf_dir, &config.markup_dir],
    )?;
    let jobs = discover_documents(&config.pdf_dir, &config.markup_dir, &config.markup_extension)?;
    let total = jobs.len();
    info!(
        "Processing {} PDF(s) from {} into {}",
        total,
        config.pdf_dir.display(),
        config.output_root.display()
    );
    progress.on_batch_start(total);

    let batch_log = ErrorLog::new();
    let mut output_names = OutputNames::new([ERROR_LOG_FILE_NAME]);
    let mut stats = BatchStats {
        total_documents: total,
        ..BatchStats::default()
    };
    let mut reports = Vec::new();

    for (i, job) in jobs.iter().enumerate() {
        let index = i + 1;
        progress.on_document_start(index, total, &job.name);

        if let Err(reason) = output_names.claim(&job.name) {
            warn!("{}: {}", job.pdf_path.display(), reason);
            batch_log.record(ErrorEntry::new(
                &job.name,
                ErrorKind::DocumentNameConflict,
                job.pdf_path.display().to_string(),
                reason,
            ));
            stats.skipped_documents += 1;
            progress.on_document_skipped(index, total, &job.name, "name conflict");
            continue;
        }

        if !job.has_markup() {
            warn!("No corresponding TEI file found for {}", job.name);
            batch_log.record(ErrorEntry::new(
                &job.name,
                ErrorKind::MissingTeiFile,
                "",
                format!("Expected {}", job.markup_path.display()),
            ));
            stats.skipped_documents += 1;
            progress.on_document_skipped(index, total, &job.name, "no markup file");
            continue;
        }

        let doc_log = ErrorLog::new();
        match process_document(opener, job, config, &doc_log) {
            Ok(doc) => {
                info!(
                    "{}: {} figure rows, {} crops, {} extracted images",
                    doc.document,
                    doc.records.len(),
                    doc.cropped_images,
                    doc.gallery.len()
                );
                stats.processed_documents += 1;
                stats.captions += doc.caption_count;
                stats.aligned_records += doc.records.len();
                stats.cropped_images += doc.cropped_images;
                stats.extracted_images += doc.gallery.len();
                stats.duplicates_excluded += doc.duplicates_excluded;
                stats.unmatched_blocks += doc.unmatched_blocks;
                progress.on_document_complete(index, total, &job.name, doc.records.len());
                reports.push(doc);
                batch_log.absorb(doc_log);
            }
            Err(e) => {
                warn!("{}: {}", job.name, e);
                if !doc_log.is_empty() {
                    debug!("{}: discarding {} partial row(s)", job.name, doc_log.len());
                }
                discard_document_output(&config.output_root.join(&job.name));
                batch_log.record(ErrorEntry::new(
                    &job.name,
                    failure_kind(job, &e),
                    "",
                    e.to_string(),
                ));
                stats.failed_documents += 1;
                progress.on_document_skipped(index, total, &job.name, &e.to_string());
            }
        }
    }

    let error_log_path = config.error_log_path();
    batch_log.write_tsv(&error_log_path)?;

    stats.errors_logged = batch_log.len();
    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    progress.on_batch_complete(total, stats.processed_documents);
    info!(
        "Batch complete: {}/{} documents, {} error row(s), {}ms",
        stats.processed_documents, total, stats.errors_logged, stats.total_duration_ms
    );

    Ok(BatchOutput {
        reports,
        stats,
        error_log_path,
    })
}

/// Process the corpus described by `config` using pdfium.
///
/// pdfium is bound once and the whole batch runs inside
/// `spawn_blocking`, since pdfium calls are synchronous and CPU-bound.
pub async fn run_batch(config: &BatchConfig) -> Result<BatchOutput, FigAlignError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let opener = PdfiumOpener::bind(config.pdfium_library_path.as_deref())?;
        run_batch_with(&config, &opener)
    })
    .await
    .map_err(|e| FigAlignError::Internal(format!("Batch task panicked: {e}")))?
}

/// Synchronous wrapper around [`run_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_batch_sync(config: &BatchConfig) -> Result<BatchOutput, FigAlignError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FigAlignError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_batch(config))
}

// ── Inspection ───────────────────────────────────────────────────────────

/// One caption as seen by [`inspect_markup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectedCaption {
    pub figure_number: FigureNumber,
    pub description: String,
    pub coordinates: Option<String>,
}

/// Captions of one markup file with their resolved labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupInspection {
    pub captions: Vec<InspectedCaption>,
    pub unmatched_blocks: usize,
}

impl From<CaptionScan> for MarkupInspection {
    fn from(scan: CaptionScan) -> Self {
        let captions = scan
            .captions
            .into_iter()
            .map(|c| InspectedCaption {
                figure_number: match extract_figure_number(&c.description) {
                    Ok(n) => FigureNumber::Resolved(n),
                    Err(_) => FigureNumber::Unresolved,
                },
                description: c.description,
                coordinates: c.coordinates,
            })
            .collect();
        Self {
            captions,
            unmatched_blocks: scan.unmatched_blocks,
        }
    }
}

/// Scan one markup file without touching any PDF.
pub fn inspect_markup(path: &Path) -> Result<MarkupInspection, FigAlignError> {
    let markup = input::read_markup(path)?;
    Ok(scan_captions(&markup).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        prepare_output_root(&root, false, &[]).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn prepare_accepts_existing_empty_root_without_reset() {
        let dir = tempfile::tempdir().unwrap();
        prepare_output_root(dir.path(), false, &[]).unwrap();
    }

    #[test]
    fn prepare_refuses_non_empty_root_without_reset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), "x").unwrap();

        let err = prepare_output_root(dir.path(), false, &[]).unwrap_err();
        assert!(matches!(err, FigAlignError::OutputRootNotEmpty { .. }));
        assert!(dir.path().join("old.txt").exists());
    }

    #[test]
    fn prepare_clears_non_empty_root_with_reset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        std::fs::create_dir_all(root.join("doc")).unwrap();
        std::fs::write(root.join("doc/old.png"), "x").unwrap();

        prepare_output_root(&root, true, &[]).unwrap();
        assert!(root.is_dir());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn prepare_refuses_root_containing_an_input() {
        let dir = tempfile::tempdir().unwrap();
        let pdfs = dir.path().join("pdf");
        std::fs::create_dir_all(&pdfs).unwrap();

        for root in [dir.path(), pdfs.as_path()] {
            let err = prepare_output_root(root, true, &[&pdfs]).unwrap_err();
            assert!(matches!(err, FigAlignError::OutputRootOverlapsInput { .. }));
        }
        assert!(pdfs.is_dir());
    }

    #[test]
    fn failure_kind_tells_markup_pdf_and_output_apart() {
        let job = DocumentJob {
            name: "doc".into(),
            pdf_path: PathBuf::from("pdf/doc.pdf"),
            markup_path: PathBuf::from("tei/doc.tei.xml"),
        };
        let read_failed = |path: &Path| FigAlignError::ReadFailed {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };

        assert_eq!(
            failure_kind(&job, &read_failed(&job.markup_path)),
            ErrorKind::TeiUnreadable
        );
        assert_eq!(
            failure_kind(&job, &read_failed(&job.pdf_path)),
            ErrorKind::PdfUnreadable
        );
        assert_eq!(
            failure_kind(
                &job,
                &FigAlignError::OutputWriteFailed {
                    path: PathBuf::from("out/doc"),
                    source: std::io::Error::from(std::io::ErrorKind::Other),
                }
            ),
            ErrorKind::OutputWriteFailed
        );
    }

    #[test]
    fn discard_removes_partial_document_dir() {
        let dir = tempfile::tempdir().unwrap();
        let doc_dir = dir.path().join("doc");
        std::fs::create_dir_all(&doc_dir).unwrap();
        std::fs::write(doc_dir.join("coord_page_1_figure_1.png"), "x").unwrap();

        discard_document_output(&doc_dir);
        assert!(!doc_dir.exists());
        discard_document_output(&doc_dir);
    }

    #[test]
    fn inspect_resolves_figure_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.tei.xml");
        std::fs::write(
            &path,
            r#"<figure xml:id="f1"><head>Fig. 1</head><label>1</label><figDesc>Figure 1. Cells</figDesc><graphic coords="1,2,3,4,5" type="bitmap"/></figure>
<figure xml:id="f2"><head></head><label></label><figDesc>Overview</figDesc></figure>"#,
        )
        .unwrap();

        let inspection = inspect_markup(&path).unwrap();
        assert_eq!(inspection.captions.len(), 2);
        assert_eq!(
            inspection.captions[0].figure_number,
            FigureNumber::Resolved("1".into())
        );
        assert_eq!(inspection.captions[0].coordinates.as_deref(), Some("1,2,3,4,5"));
        assert_eq!(inspection.captions[1].figure_number, FigureNumber::Unresolved);
    }

    #[test]
    fn inspect_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect_markup(&dir.path().join("nope.tei.xml")).unwrap_err();
        assert!(matches!(err, FigAlignError::FileNotFound { .. }));
    }
}

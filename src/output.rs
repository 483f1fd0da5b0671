//! Data produced by the pipeline: captions, image assets, alignment records,
//! and per-document / per-batch summaries.
//!
//! Everything here is plain data. Values are created once by the stage that
//! owns them and handed downstream as ordered `Vec`s; nothing is mutated
//! after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One figure block lifted from the TEI markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureCaption {
    /// Trimmed `<figDesc>` content.
    pub description: String,
    /// Raw `coords` attribute of the bitmap `<graphic>`, if present.
    pub coordinates: Option<String>,
}

impl FigureCaption {
    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// Which stage created an [`ImageAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOrigin {
    /// Rendered from a caption's coordinate box.
    CoordinateCrop,
    /// Pulled out of the PDF's embedded raster images.
    FullPageExtract,
}

/// An image written to disk by the cropper or the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    /// 1-based page number.
    pub page: usize,
    /// 1-based position among the assets of the same origin on this page.
    pub sequence_index_on_page: usize,
    pub byte_size: usize,
    pub origin: ImageOrigin,
}

impl ImageAsset {
    /// File name only, as used for links inside the document directory.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// One slot of the cropper's output, positionally paired with one
/// coordinate-bearing caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropSlot {
    Saved(ImageAsset),
    Failed { coordinates: String, reason: String },
}

impl CropSlot {
    pub fn asset(&self) -> Option<&ImageAsset> {
        match self {
            CropSlot::Saved(asset) => Some(asset),
            CropSlot::Failed { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.asset().map(|a| a.path.as_path())
    }
}

/// The figure label of a caption, or the error marker when none was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FigureNumber {
    Resolved(String),
    Unresolved,
}

impl fmt::Display for FigureNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FigureNumber::Resolved(n) => f.write_str(n),
            FigureNumber::Unresolved => f.write_str("Error"),
        }
    }
}

/// One row of a document's alignment, in caption order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub figure_number: FigureNumber,
    pub image: Option<PathBuf>,
    pub caption: String,
}

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// PDF base name; also the name of the document's output directory.
    pub document: String,
    pub caption_count: usize,
    /// Non-table figure blocks the caption scanner could not match.
    pub unmatched_blocks: usize,
    pub records: Vec<AlignmentRecord>,
    /// Deduplicated embedded images, none of which is claimed by a caption.
    pub gallery: Vec<ImageAsset>,
    pub cropped_images: usize,
    pub duplicates_excluded: usize,
}

impl DocumentReport {
    /// Copy of this report with every path made relative to `base`.
    ///
    /// Reports written to disk use relative paths so they stay valid when
    /// the output tree is moved, and so two runs into different roots
    /// produce identical files.
    pub fn relative_to(&self, base: &Path) -> DocumentReport {
        let rel = |p: &Path| p.strip_prefix(base).unwrap_or(p).to_path_buf();
        DocumentReport {
            records: self
                .records
                .iter()
                .map(|r| AlignmentRecord {
                    image: r.image.as_deref().map(rel),
                    ..r.clone()
                })
                .collect(),
            gallery: self
                .gallery
                .iter()
                .map(|a| ImageAsset {
                    path: rel(&a.path),
                    ..a.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}

/// Counters for a whole batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub processed_documents: usize,
    /// Documents without a markup file.
    pub skipped_documents: usize,
    /// Documents whose PDF could not be processed.
    pub failed_documents: usize,
    pub captions: usize,
    pub aligned_records: usize,
    pub cropped_images: usize,
    pub extracted_images: usize,
    pub duplicates_excluded: usize,
    pub unmatched_blocks: usize,
    pub errors_logged: usize,
    pub total_duration_ms: u64,
}

/// Reports plus counters for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub reports: Vec<DocumentReport>,
    pub stats: BatchStats,
    pub error_log_path: PathBuf,
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_figure_number_displays_error_marker() {
        assert_eq!(FigureNumber::Unresolved.to_string(), "Error");
        assert_eq!(FigureNumber::Resolved("3B".into()).to_string(), "3B");
    }

    #[test]
    fn relative_to_strips_document_dir() {
        let base = Path::new("/out/paper");
        let report = DocumentReport {
            document: "paper".into(),
            caption_count: 1,
            unmatched_blocks: 0,
            records: vec![AlignmentRecord {
                figure_number: FigureNumber::Resolved("1".into()),
                image: Some(base.join("coord_page_1_figure_1.png")),
                caption: "Figure 1".into(),
            }],
            gallery: vec![ImageAsset {
                path: base.join("extract_page_2_image_1.png"),
                page: 2,
                sequence_index_on_page: 1,
                byte_size: 10,
                origin: ImageOrigin::FullPageExtract,
            }],
            cropped_images: 1,
            duplicates_excluded: 0,
        };

        let rel = report.relative_to(base);
        assert_eq!(
            rel.records[0].image.as_deref(),
            Some(Path::new("coord_page_1_figure_1.png"))
        );
        assert_eq!(rel.gallery[0].path, Path::new("extract_page_2_image_1.png"));
        assert_eq!(rel.gallery[0].file_name(), "extract_page_2_image_1.png");
    }

    #[test]
    fn failed_crop_slot_has_no_path() {
        let slot = CropSlot::Failed {
            coordinates: "9,0,0,1,1".into(),
            reason: "out of range".into(),
        };
        assert!(slot.path().is_none());
    }
}

//! Full-document image extraction with byte-size deduplication.
//!
//! Journal PDFs repeat the same artwork (publisher logo, licence badge) on
//! many pages. Any embedded image whose stored data length (the image stream
//! as it sits in the PDF, filters not applied) occurs more than once in the
//! document is treated as such boilerplate and excluded. Every
//! occurrence is excluded, not only the repeats, and each exclusion is logged
//! as [`ErrorKind::DuplicateImageSize`].
//!
//! Two genuinely different images whose streams happen to have the same
//! length are both dropped. Kept images are written as PNG.
//!
//! The images are enumerated once; the size tally and the filter are two
//! passes over that same list, so the outcome does not depend on the order in
//! which a backend happens to walk the document.

use crate::error::FigAlignError;
use crate::error_log::{ErrorEntry, ErrorKind, ErrorLog};
use crate::output::{ImageAsset, ImageOrigin};
use crate::pipeline::crop::write_image;
use crate::pipeline::source::{EmbeddedImage, PdfSource};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// File name of the `index`-th image (1-based) on 1-based page `page`.
pub fn extract_file_name(page: usize, index: usize) -> String {
    format!("extract_page_{page}_image_{index}.png")
}

/// Images kept and dropped by one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Written images, in page then in-page order.
    pub kept: Vec<ImageAsset>,
    /// Number of images excluded as duplicates.
    pub excluded: usize,
}

/// `raw_len → occurrence_count` over one enumeration.
fn tally_sizes(images: &[EmbeddedImage]) -> HashMap<usize, usize> {
    let mut size_count: HashMap<usize, usize> = HashMap::new();
    for image in images {
        *size_count.entry(image.raw_len).or_insert(0) += 1;
    }
    size_count
}

/// Split `images` into those with a unique stored length and those without.
pub fn partition_by_size(images: Vec<EmbeddedImage>) -> (Vec<EmbeddedImage>, Vec<EmbeddedImage>) {
    let size_count = tally_sizes(&images);
    images
        .into_iter()
        .partition(|image| size_count.get(&image.raw_len).copied().unwrap_or(0) <= 1)
}

/// Extract every embedded image of `source` into `output_dir`, dropping
/// byte-size duplicates.
///
/// `document` names the PDF in the error log rows.
pub fn extract_unique_images(
    source: &dyn PdfSource,
    output_dir: &Path,
    document: &str,
    error_log: &ErrorLog,
) -> Result<DedupOutcome, FigAlignError> {
    std::fs::create_dir_all(output_dir).map_err(|e| FigAlignError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let images = source.embedded_images()?;
    let total = images.len();
    let (unique, duplicates) = partition_by_size(images);

    for image in &duplicates {
        let size = image.raw_len;
        error_log.record(ErrorEntry::new(
            document,
            ErrorKind::DuplicateImageSize,
            format!(
                "Page {} image {} (Size: {} bytes)",
                image.page_index + 1,
                image.index_on_page + 1,
                size
            ),
            "The image is ignored because it has the same size as other images",
        ));
    }

    let mut kept = Vec::with_capacity(unique.len());
    for image in unique {
        let page = image.page_index + 1;
        let index = image.index_on_page + 1;
        let path = output_dir.join(extract_file_name(page, index));
        write_image(&path, &image.bytes)?;
        debug!(
            "Extracted {} ({} bytes stored, {} bytes written)",
            path.display(),
            image.raw_len,
            image.bytes.len()
        );

        kept.push(ImageAsset {
            path,
            page,
            sequence_index_on_page: index,
            byte_size: image.bytes.len(),
            origin: ImageOrigin::FullPageExtract,
        });
    }

    info!(
        "{}: {} embedded images, {} kept, {} excluded as duplicates",
        document,
        total,
        kept.len(),
        duplicates.len()
    );

    Ok(DedupOutcome {
        kept,
        excluded: duplicates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::ClipRect;
    use image::DynamicImage;

    struct ImagesOnly(Vec<EmbeddedImage>);

    impl PdfSource for ImagesOnly {
        fn page_count(&self) -> usize {
            self.0.iter().map(|i| i.page_index + 1).max().unwrap_or(0)
        }

        fn render_clip(&self, _: usize, _: ClipRect, _: f32) -> Result<DynamicImage, FigAlignError> {
            Err(FigAlignError::Internal("not used".into()))
        }

        fn embedded_images(&self) -> Result<Vec<EmbeddedImage>, FigAlignError> {
            Ok(self.0.clone())
        }
    }

    fn img(page_index: usize, index_on_page: usize, raw_len: usize) -> EmbeddedImage {
        EmbeddedImage {
            page_index,
            index_on_page,
            raw_len,
            bytes: vec![page_index as u8; raw_len + index_on_page],
        }
    }

    #[test]
    fn both_copies_of_a_duplicated_size_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new();
        let source = ImagesOnly(vec![img(0, 0, 100), img(0, 1, 250), img(1, 0, 100), img(1, 1, 300)]);

        let outcome = extract_unique_images(&source, dir.path(), "paper", &log).unwrap();

        let names: Vec<_> = outcome.kept.iter().map(|a| a.file_name()).collect();
        assert_eq!(
            names,
            vec!["extract_page_1_image_2.png", "extract_page_2_image_2.png"]
        );
        assert_eq!(outcome.excluded, 2);
        assert_eq!(log.count(ErrorKind::DuplicateImageSize), 2);
        assert!(!dir.path().join("extract_page_1_image_1.png").exists());
        assert!(!dir.path().join("extract_page_2_image_1.png").exists());
    }

    #[test]
    fn kept_image_is_written_as_its_encoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new();
        let source = ImagesOnly(vec![img(2, 0, 42)]);

        let outcome = extract_unique_images(&source, dir.path(), "paper", &log).unwrap();
        let asset = &outcome.kept[0];
        assert_eq!(asset.page, 3);
        assert_eq!(asset.sequence_index_on_page, 1);
        assert_eq!(asset.byte_size, 42);
        assert_eq!(std::fs::read(&asset.path).unwrap(), vec![2u8; 42]);
        assert!(log.is_empty());
    }

    #[test]
    fn stored_length_decides_not_encoded_length() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new();
        let same_stream = |page_index, png_len| EmbeddedImage {
            page_index,
            index_on_page: 0,
            raw_len: 64,
            bytes: vec![1; png_len],
        };
        let same_png = |page_index, raw_len| EmbeddedImage {
            page_index,
            index_on_page: 1,
            raw_len,
            bytes: vec![2; 500],
        };
        let source = ImagesOnly(vec![
            same_stream(0, 300),
            same_png(0, 70),
            same_stream(1, 900),
            same_png(1, 80),
        ]);

        let outcome = extract_unique_images(&source, dir.path(), "paper", &log).unwrap();

        let names: Vec<_> = outcome.kept.iter().map(|a| a.file_name()).collect();
        assert_eq!(
            names,
            vec!["extract_page_1_image_2.png", "extract_page_2_image_2.png"]
        );
        let contexts: Vec<_> = log.entries().into_iter().map(|e| e.context).collect();
        assert_eq!(
            contexts,
            vec![
                "Page 1 image 1 (Size: 64 bytes)",
                "Page 2 image 1 (Size: 64 bytes)"
            ]
        );
    }

    #[test]
    fn partition_is_independent_of_enumeration_order() {
        let forward = vec![img(0, 0, 10), img(0, 1, 20), img(1, 0, 10)];
        let mut backward = forward.clone();
        backward.reverse();

        let (kept_f, dropped_f) = partition_by_size(forward);
        let (kept_b, dropped_b) = partition_by_size(backward);
        assert_eq!(kept_f, kept_b);
        assert_eq!(dropped_f.len(), dropped_b.len());
    }

    #[test]
    fn log_rows_name_page_index_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new();
        let source = ImagesOnly(vec![img(0, 0, 7), img(4, 2, 7)]);
        extract_unique_images(&source, dir.path(), "paper", &log).unwrap();

        let contexts: Vec<_> = log.entries().into_iter().map(|e| e.context).collect();
        assert_eq!(
            contexts,
            vec![
                "Page 1 image 1 (Size: 7 bytes)",
                "Page 5 image 3 (Size: 7 bytes)"
            ]
        );
    }
}

//! Caption ↔ image alignment.
//!
//! Cropped images carry no back-reference to their caption. The link is
//! positional: the n-th crop slot belongs to the n-th caption that carries
//! coordinates. This stage walks the captions with a single cursor into the
//! crop list and turns them into [`AlignmentRecord`]s, logging every caption
//! that cannot be fully resolved.
//!
//! Two counters are kept: `expected` (captions with coordinates) and
//! `consumed` (cursor position). Both must equal the crop count; a mismatch
//! rejects the document with [`FigAlignError::AlignmentDesync`].

use crate::error::FigAlignError;
use crate::error_log::{ErrorEntry, ErrorKind, ErrorLog};
use crate::output::{AlignmentRecord, CropSlot, FigureCaption, FigureNumber, ImageAsset};
use crate::pipeline::figure_number::extract_figure_number;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Result of aligning one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// One record per kept caption, in caption order.
    pub records: Vec<AlignmentRecord>,
    /// Deduplicated images, sorted by page then in-page index.
    pub gallery: Vec<ImageAsset>,
}

/// Pair `captions` with `crops` and attach the deduplicated `gallery`.
///
/// `crops` must hold exactly one slot per coordinate-bearing caption, in
/// caption order, as produced by [`crate::pipeline::crop::crop_regions`].
pub fn align(
    document: &str,
    captions: &[FigureCaption],
    crops: &[CropSlot],
    mut gallery: Vec<ImageAsset>,
    error_log: &ErrorLog,
) -> Result<Alignment, FigAlignError> {
    let expected = captions.iter().filter(|c| c.has_coordinates()).count();
    let desync = |actual: usize| FigAlignError::AlignmentDesync {
        document: document.to_string(),
        expected,
        actual,
    };
    if expected != crops.len() {
        return Err(desync(crops.len()));
    }

    let mut cursor = 0usize;
    let mut records = Vec::with_capacity(captions.len());

    for caption in captions {
        let number = extract_figure_number(&caption.description);

        let image = if caption.has_coordinates() {
            let slot = crops.get(cursor).ok_or_else(|| desync(crops.len()))?;
            cursor += 1;
            claim_slot(document, caption, slot, error_log)
        } else {
            None
        };

        let figure_number = match number {
            Ok(n) => FigureNumber::Resolved(n),
            Err(e) if !caption.has_coordinates() => {
                debug!("{document}: dropping caption: {e}");
                error_log.record(ErrorEntry::new(
                    document,
                    ErrorKind::NoCoordinatesAndNoFigureNumber,
                    &caption.description,
                    "No coordinates and no figure number found",
                ));
                continue;
            }
            Err(e) => {
                debug!("{document}: {e}");
                let mut entry = ErrorEntry::new(
                    document,
                    ErrorKind::NoFigureNumberFound,
                    &caption.description,
                    "No figure number found",
                );
                if let Some(path) = &image {
                    entry = entry.with_image(path.clone());
                }
                error_log.record(entry);
                FigureNumber::Unresolved
            }
        };

        records.push(AlignmentRecord {
            figure_number,
            image,
            caption: caption.description.clone(),
        });
    }

    if cursor != crops.len() {
        return Err(desync(cursor));
    }

    gallery.sort_by_key(|a| (a.page, a.sequence_index_on_page));

    Ok(Alignment { records, gallery })
}

/// Image path of a consumed slot; failed crops are logged and yield `None`.
fn claim_slot(
    document: &str,
    caption: &FigureCaption,
    slot: &CropSlot,
    error_log: &ErrorLog,
) -> Option<PathBuf> {
    match slot {
        CropSlot::Saved(asset) => Some(asset.path.clone()),
        CropSlot::Failed {
            coordinates,
            reason,
        } => {
            warn!("{document}: no image for caption with coords '{coordinates}'");
            error_log.record(ErrorEntry::new(
                document,
                ErrorKind::CropFailed,
                &caption.description,
                format!("Coordinates '{coordinates}': {reason}"),
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ImageOrigin;

    fn caption(desc: &str, coords: Option<&str>) -> FigureCaption {
        FigureCaption {
            description: desc.to_string(),
            coordinates: coords.map(str::to_string),
        }
    }

    fn saved(name: &str, page: usize, seq: usize) -> CropSlot {
        CropSlot::Saved(asset(name, page, seq, ImageOrigin::CoordinateCrop))
    }

    fn asset(name: &str, page: usize, seq: usize, origin: ImageOrigin) -> ImageAsset {
        ImageAsset {
            path: PathBuf::from("/out/doc").join(name),
            page,
            sequence_index_on_page: seq,
            byte_size: 10,
            origin,
        }
    }

    #[test]
    fn resolved_captions_take_crops_in_order() {
        let log = ErrorLog::new();
        let captions = vec![
            caption("Figure 1. A", Some("1,0,0,1,1")),
            caption("Figure 2. B", None),
            caption("Fig. 3 C", Some("2,0,0,1,1")),
        ];
        let crops = vec![saved("a.png", 1, 1), saved("b.png", 2, 1)];

        let out = align("doc", &captions, &crops, Vec::new(), &log).unwrap();
        let got: Vec<_> = out
            .records
            .iter()
            .map(|r| (r.figure_number.to_string(), r.image.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("1".to_string(), Some(PathBuf::from("/out/doc/a.png"))),
                ("2".to_string(), None),
                ("3".to_string(), Some(PathBuf::from("/out/doc/b.png"))),
            ]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn unnumbered_caption_with_coords_consumes_exactly_one_slot() {
        let log = ErrorLog::new();
        let captions = vec![
            caption("A plot of things", Some("1,0,0,1,1")),
            caption("Figure 2. Next", Some("1,5,5,1,1")),
        ];
        let crops = vec![saved("a.png", 1, 1), saved("b.png", 1, 2)];

        let out = align("doc", &captions, &crops, Vec::new(), &log).unwrap();
        assert_eq!(out.records[0].figure_number, FigureNumber::Unresolved);
        assert_eq!(out.records[0].image, Some(PathBuf::from("/out/doc/a.png")));
        assert_eq!(out.records[1].image, Some(PathBuf::from("/out/doc/b.png")));

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ErrorKind::NoFigureNumberFound);
        assert_eq!(entries[0].image_path, Some(PathBuf::from("/out/doc/a.png")));
    }

    #[test]
    fn unnumbered_caption_without_coords_is_dropped() {
        let log = ErrorLog::new();
        let captions = vec![caption("Scheme overview", None), caption("Figure 4", None)];

        let out = align("doc", &captions, &[], Vec::new(), &log).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].caption, "Figure 4");
        assert_eq!(log.count(ErrorKind::NoCoordinatesAndNoFigureNumber), 1);
    }

    #[test]
    fn failed_slot_is_logged_and_cursor_still_advances() {
        let log = ErrorLog::new();
        let captions = vec![
            caption("Figure 1", Some("bad")),
            caption("Figure 2", Some("1,0,0,1,1")),
        ];
        let crops = vec![
            CropSlot::Failed {
                coordinates: "bad".into(),
                reason: "not a number".into(),
            },
            saved("b.png", 1, 1),
        ];

        let out = align("doc", &captions, &crops, Vec::new(), &log).unwrap();
        assert_eq!(out.records[0].image, None);
        assert_eq!(out.records[1].image, Some(PathBuf::from("/out/doc/b.png")));
        assert_eq!(log.count(ErrorKind::CropFailed), 1);
    }

    #[test]
    fn length_mismatch_is_a_desync() {
        let log = ErrorLog::new();
        let captions = vec![caption("Figure 1", Some("1,0,0,1,1"))];

        let err = align("doc", &captions, &[], Vec::new(), &log).unwrap_err();
        assert!(matches!(
            err,
            FigAlignError::AlignmentDesync {
                expected: 1,
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn gallery_is_sorted_by_page_then_index() {
        let log = ErrorLog::new();
        let gallery = vec![
            asset("p2i1.png", 2, 1, ImageOrigin::FullPageExtract),
            asset("p1i3.png", 1, 3, ImageOrigin::FullPageExtract),
            asset("p1i1.png", 1, 1, ImageOrigin::FullPageExtract),
        ];

        let out = align("doc", &[], &[], gallery, &log).unwrap();
        let names: Vec<_> = out.gallery.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["p1i1.png", "p1i3.png", "p2i1.png"]);
    }
}

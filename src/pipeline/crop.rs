//! Coordinate-based cropping: render the bitmap box of each caption.
//!
//! The returned slots are paired *positionally* with the coordinate-bearing
//! captions by the alignment builder; nothing else links a crop back to its
//! caption. The output therefore has exactly one slot per input coordinate
//! string, in input order, and a crop that cannot be produced still occupies
//! its slot as [`CropSlot::Failed`].

use crate::error::FigAlignError;
use crate::output::{CropSlot, ImageAsset, ImageOrigin};
use crate::pipeline::encode;
use crate::pipeline::source::{PdfSource, Region};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// File name of the `n`-th crop (1-based) on 1-based page `page`.
pub fn crop_file_name(page: usize, n: usize) -> String {
    format!("coord_page_{page}_figure_{n}.png")
}

/// Crop every coordinate box in `coordinates` into `output_dir`.
///
/// # Errors
/// Only output I/O failures are fatal. Unparseable coordinates, pages out of
/// range, and render failures become [`CropSlot::Failed`].
pub fn crop_regions(
    source: &dyn PdfSource,
    coordinates: &[String],
    output_dir: &Path,
    zoom: f32,
) -> Result<Vec<CropSlot>, FigAlignError> {
    std::fs::create_dir_all(output_dir).map_err(|e| FigAlignError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let mut figures_per_page: HashMap<usize, usize> = HashMap::new();
    let mut slots = Vec::with_capacity(coordinates.len());

    for raw in coordinates {
        let region = match Region::parse(raw) {
            Ok(region) => region,
            Err(e) => {
                warn!("{e}");
                slots.push(CropSlot::Failed {
                    coordinates: raw.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let counter = figures_per_page.entry(region.page).or_insert(0);
        *counter += 1;
        let figure_num = *counter;

        let image = match source.render_clip(region.page_index(), region.clip(), zoom) {
            Ok(image) => image,
            Err(e) => {
                warn!("Crop of '{}' failed: {}", raw, e);
                slots.push(CropSlot::Failed {
                    coordinates: raw.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let bytes = encode::encode_png(&image)?;
        let path = output_dir.join(crop_file_name(region.page, figure_num));
        write_image(&path, &bytes)?;
        debug!(
            "Cropped page {} figure {} → {}",
            region.page,
            figure_num,
            path.display()
        );

        slots.push(CropSlot::Saved(ImageAsset {
            path,
            page: region.page,
            sequence_index_on_page: figure_num,
            byte_size: bytes.len(),
            origin: ImageOrigin::CoordinateCrop,
        }));
    }

    Ok(slots)
}

pub(crate) fn write_image(path: &Path, bytes: &[u8]) -> Result<(), FigAlignError> {
    std::fs::write(path, bytes).map_err(|e| FigAlignError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

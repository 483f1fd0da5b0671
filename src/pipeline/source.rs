//! The PDF capabilities the pipeline needs, and their pdfium implementation.
//!
//! The cropper and the deduplicator only ever need two things from a PDF:
//!
//! 1. render a rectangle of a page to a raster at a given zoom, and
//! 2. enumerate every embedded raster image, including the ones drawn inside
//!    form XObjects, with its stored length and its pixels.
//!
//! [`PdfSource`] captures exactly that, so the pipeline can be driven by an
//! in-memory source in tests. [`PdfOpener::with_document`] scopes one open
//! handle to a closure: the document is opened once, shared by both stages,
//! and dropped on every exit path before the next document is touched.
//!
//! Coordinates follow GROBID: PDF points with the origin at the top-left of
//! the page, which is also the orientation of pdfium's rendered bitmaps.

use crate::error::FigAlignError;
use crate::pipeline::{encode, input};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

// ── Geometry ─────────────────────────────────────────────────────────────

/// A rectangle on a page in PDF points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ClipRect {
    /// Pixel bounds `(x, y, width, height)` of this rectangle in a page
    /// rendered at `zoom`. Edges are rounded outward; width and height are
    /// at least one pixel.
    pub fn pixel_bounds(&self, zoom: f32) -> (u32, u32, u32, u32) {
        let x0 = (self.left * zoom).floor().max(0.0);
        let y0 = (self.top * zoom).floor().max(0.0);
        let x1 = (self.right * zoom).ceil().max(x0 + 1.0);
        let y1 = (self.bottom * zoom).ceil().max(y0 + 1.0);
        (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// A decoded `coords` attribute: `page,x,y,width,height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// 1-based page number, as written in the markup.
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    /// Decode a coordinate string.
    ///
    /// GROBID writes one box as `page,x,y,w,h` and several boxes separated
    /// by `;`; only the first box is used.
    pub fn parse(raw: &str) -> Result<Self, FigAlignError> {
        let invalid = |reason: &str| FigAlignError::InvalidCoordinates {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let first_box = raw.split(';').next().unwrap_or("").trim();
        let values = first_box
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|e| invalid(&format!("not a number ({e})")))?;

        let &[page, x, y, width, height] = values.as_slice() else {
            return Err(invalid(&format!(
                "expected 5 values (page,x,y,width,height), got {}",
                values.len()
            )));
        };

        if !values.iter().all(|v| v.is_finite()) {
            return Err(invalid("non-finite value"));
        }
        if page < 1.0 || page.fract() != 0.0 {
            return Err(invalid("page must be a whole number ≥ 1"));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(invalid("width and height must be positive"));
        }

        Ok(Self {
            page: page as usize,
            x,
            y,
            width,
            height,
        })
    }

    /// 0-based page index for the renderer.
    pub fn page_index(&self) -> usize {
        self.page - 1
    }

    pub fn clip(&self) -> ClipRect {
        ClipRect {
            left: self.x,
            top: self.y,
            right: self.x + self.width,
            bottom: self.y + self.height,
        }
    }
}

// ── Capability surface ───────────────────────────────────────────────────

/// One embedded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// 0-based page index.
    pub page_index: usize,
    /// 0-based position among the images of this page.
    pub index_on_page: usize,
    /// Length of the image data as stored in the PDF, before any filter is
    /// decoded. Deduplication compares this.
    pub raw_len: usize,
    /// PNG encoding of the decoded image; what gets written to disk.
    pub bytes: Vec<u8>,
}

/// How the image walk sees one page object.
pub(crate) enum ObjectKind<N> {
    Image,
    /// A form XObject and its child objects, in content order.
    Form(Vec<N>),
    Other,
}

/// A page object that is either an image, a container of further objects,
/// or irrelevant to image enumeration.
pub(crate) trait PageObjectNode: Sized {
    fn classify(&self) -> ObjectKind<Self>;
}

/// Visit every image among `objects` in content order, descending into form
/// XObjects depth-first.
pub(crate) fn walk_images<N: PageObjectNode>(
    objects: impl IntoIterator<Item = N>,
    visit: &mut impl FnMut(N),
) {
    for object in objects {
        match object.classify() {
            ObjectKind::Image => visit(object),
            ObjectKind::Form(children) => walk_images(children, visit),
            ObjectKind::Other => {}
        }
    }
}

/// An open PDF, as seen by the cropper and the deduplicator.
pub trait PdfSource {
    fn page_count(&self) -> usize;

    /// Render `clip` of the page at `page_index` (0-based) scaled by `zoom`.
    fn render_clip(
        &self,
        page_index: usize,
        clip: ClipRect,
        zoom: f32,
    ) -> Result<DynamicImage, FigAlignError>;

    /// Every embedded raster image, in page order then in-page order.
    fn embedded_images(&self) -> Result<Vec<EmbeddedImage>, FigAlignError>;
}

/// Opens PDFs for the orchestrator.
pub trait PdfOpener {
    /// Open the PDF at `path`, hand it to `f`, and close it before returning.
    fn with_document<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&dyn PdfSource) -> Result<T, FigAlignError>,
    ) -> Result<T, FigAlignError>;
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PdfOpener`] backed by a bound pdfium library.
pub struct PdfiumOpener {
    pdfium: Pdfium,
}

impl PdfiumOpener {
    /// Bind pdfium.
    ///
    /// With `library_path` set, binds exactly that library (a directory is
    /// searched for the platform library name). Otherwise tries `./` and
    /// then the system library.
    pub fn bind(library_path: Option<&Path>) -> Result<Self, FigAlignError> {
        let bindings = match library_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| FigAlignError::PdfiumBindingFailed(format!("{e:?}")))?;

        info!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfOpener for PdfiumOpener {
    fn with_document<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&dyn PdfSource) -> Result<T, FigAlignError>,
    ) -> Result<T, FigAlignError> {
        input::check_pdf_magic(path)?;

        let document =
            self.pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| FigAlignError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: format!("{e:?}"),
                })?;

        let source = PdfiumSource { document };
        debug!(
            "Opened {} ({} pages)",
            path.display(),
            source.page_count()
        );
        f(&source)
    }
}

struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
}

impl PdfSource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_clip(
        &self,
        page_index: usize,
        clip: ClipRect,
        zoom: f32,
    ) -> Result<DynamicImage, FigAlignError> {
        let total = self.page_count();
        if page_index >= total {
            return Err(FigAlignError::PageOutOfRange {
                page: page_index + 1,
                total,
            });
        }

        let rasterisation_failed = |detail: String| FigAlignError::RasterisationFailed {
            page: page_index + 1,
            detail,
        };

        let page = self
            .document
            .pages()
            .get(page_index as u16)
            .map_err(|e| rasterisation_failed(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| rasterisation_failed(format!("{e:?}")))?;
        let image = bitmap.as_image();

        let (x, y, width, height) = clip.pixel_bounds(zoom);
        if x >= image.width() || y >= image.height() {
            return Err(rasterisation_failed(format!(
                "clip at ({x}, {y}) lies outside the {}x{} px page",
                image.width(),
                image.height()
            )));
        }

        Ok(image.crop_imm(x, y, width, height))
    }

    fn embedded_images(&self) -> Result<Vec<EmbeddedImage>, FigAlignError> {
        let mut images = Vec::new();

        for (page_index, page) in self.document.pages().iter().enumerate() {
            let mut image_objects = Vec::new();
            walk_images(page.objects().iter(), &mut |object| image_objects.push(object));

            for (index_on_page, object) in image_objects.iter().enumerate() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                match read_image(image_object) {
                    Ok((raw_len, raw)) => images.push(EmbeddedImage {
                        page_index,
                        index_on_page,
                        raw_len,
                        bytes: encode::encode_png(&raw)?,
                    }),
                    Err(e) => warn!(
                        "Skipping unreadable image {} on page {}: {:?}",
                        index_on_page + 1,
                        page_index + 1,
                        e
                    ),
                }
            }
        }

        debug!("Enumerated {} embedded images", images.len());
        Ok(images)
    }
}

/// Stored data length and decoded pixels of one image object.
fn read_image(image_object: &PdfPageImageObject) -> Result<(usize, DynamicImage), PdfiumError> {
    let raw_len = image_object.get_raw_image_data()?.len();
    let raw = image_object.get_raw_image()?;
    Ok((raw_len, raw))
}

impl<'a> PageObjectNode for PdfPageObject<'a> {
    fn classify(&self) -> ObjectKind<Self> {
        match self {
            PdfPageObject::Image(_) => ObjectKind::Image,
            PdfPageObject::XObjectForm(form) => {
                ObjectKind::Form((0..form.len()).filter_map(|i| form.get(i).ok()).collect())
            }
            _ => ObjectKind::Other,
        }
    }
}

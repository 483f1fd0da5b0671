//! Configuration for a figure-extraction batch run.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The defaults reproduce the directory layout the
//! upstream GROBID step writes: PDFs in `./data_pdf`, TEI files in
//! `./data_tei_xml`, reports in `./data_figure_html`.

use crate::error::FigAlignError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Lowest accepted zoom factor.
pub const MIN_ZOOM: f32 = 0.1;
/// Highest accepted zoom factor.
pub const MAX_ZOOM: f32 = 10.0;

/// Configuration for a batch run.
///
/// # Example
/// ```rust
/// use figalign::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .pdf_dir("papers")
///     .markup_dir("tei")
///     .output_root("figures")
///     .zoom(2.0)
///     .reset_output_root(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.zoom, 2.0);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory holding the source PDFs. Default: `./data_pdf`.
    pub pdf_dir: PathBuf,

    /// Directory holding one markup file per PDF. Default: `./data_tei_xml`.
    pub markup_dir: PathBuf,

    /// Where per-document directories and `error_log.tsv` go.
    /// Default: `./data_figure_html`.
    pub output_root: PathBuf,

    /// Suffix appended to a PDF's base name to find its markup. Default: `.tei.xml`.
    pub markup_extension: String,

    /// Raster scale applied to coordinate crops. Range: 0.1–10.0. Default: 1.0.
    ///
    /// At 1.0 one PDF point becomes one pixel.
    pub zoom: f32,

    /// Clear `output_root` before the run. Default: false.
    ///
    /// When false and the root already holds files, the run refuses to start.
    pub reset_output_root: bool,

    /// Write `<doc>/<doc>.html`. Default: true.
    pub write_html_report: bool,

    /// Write `<doc>/<doc>.json`. Default: true.
    pub write_json_report: bool,

    /// Explicit path to libpdfium. If None, `./` then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("./data_pdf"),
            markup_dir: PathBuf::from("./data_tei_xml"),
            output_root: PathBuf::from("./data_figure_html"),
            markup_extension: ".tei.xml".to_string(),
            zoom: 1.0,
            reset_output_root: false,
            write_html_report: true,
            write_json_report: true,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("pdf_dir", &self.pdf_dir)
            .field("markup_dir", &self.markup_dir)
            .field("output_root", &self.output_root)
            .field("markup_extension", &self.markup_extension)
            .field("zoom", &self.zoom)
            .field("reset_output_root", &self.reset_output_root)
            .field("write_html_report", &self.write_html_report)
            .field("write_json_report", &self.write_json_report)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

/// File name of the batch error log under the output root.
pub const ERROR_LOG_FILE_NAME: &str = "error_log.tsv";

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the batch error log.
    pub fn error_log_path(&self) -> PathBuf {
        self.output_root.join(ERROR_LOG_FILE_NAME)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn markup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.markup_dir = dir.into();
        self
    }

    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    pub fn markup_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.markup_extension = ext.into();
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            zoom
        };
        self
    }

    pub fn reset_output_root(mut self, v: bool) -> Self {
        self.config.reset_output_root = v;
        self
    }

    pub fn write_html_report(mut self, v: bool) -> Self {
        self.config.write_html_report = v;
        self
    }

    pub fn write_json_report(mut self, v: bool) -> Self {
        self.config.write_json_report = v;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, FigAlignError> {
        let c = &self.config;
        if !c.zoom.is_finite() || c.zoom < MIN_ZOOM || c.zoom > MAX_ZOOM {
            return Err(FigAlignError::InvalidConfig(format!(
                "Zoom must be {MIN_ZOOM}–{MAX_ZOOM}, got {}",
                c.zoom
            )));
        }
        if !c.markup_extension.starts_with('.') || c.markup_extension.len() < 2 {
            return Err(FigAlignError::InvalidConfig(format!(
                "Markup extension must start with '.', got '{}'",
                c.markup_extension
            )));
        }
        if c.output_root.as_os_str().is_empty() {
            return Err(FigAlignError::InvalidConfig(
                "Output root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

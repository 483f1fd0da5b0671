//! Per-document report artifacts: `<doc>.html` and `<doc>.json`.
//!
//! Both renderings take a report whose paths are already relative to the
//! document directory (see [`DocumentReport::relative_to`]), so the output
//! does not depend on where the output root lives.

use crate::error::FigAlignError;
use crate::output::DocumentReport;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Escapes HTML special characters.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn image_cell(src: &Path) -> String {
    format!(
        "<td><img src=\"{}\" alt=\"Image\"></td>\n",
        escape_html(&src.to_string_lossy())
    )
}

/// Render the figure table and the gallery table as a standalone page.
pub fn render_html(report: &DocumentReport) -> String {
    let title = escape_html(&report.document);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n"));

    html.push_str("<table border=\"1\">\n");
    html.push_str("<tr><th>Figure Number</th><th>Image</th><th>Caption</th></tr>\n");
    for record in &report.records {
        html.push_str("<tr>\n");
        html.push_str(&format!(
            "<td>{}</td>\n",
            escape_html(&record.figure_number.to_string())
        ));
        match &record.image {
            Some(path) => html.push_str(&image_cell(path)),
            None => html.push_str("<td></td>\n"),
        }
        html.push_str(&format!("<td>{}</td>\n", escape_html(&record.caption)));
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Additional Images Extracted from PDF</h2>\n");
    html.push_str("<table border=\"1\">\n");
    html.push_str("<tr><th>Image</th></tr>\n");
    for asset in &report.gallery {
        html.push_str("<tr>\n");
        html.push_str(&image_cell(&asset.path));
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");

    html.push_str("</body>\n</html>\n");
    html
}

/// Pretty-printed JSON of the report.
pub fn render_json(report: &DocumentReport) -> Result<String, FigAlignError> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

/// Write the requested artifacts into `doc_dir` and return their paths.
///
/// Paths inside `report` are made relative to `doc_dir` first.
pub fn write_reports(
    report: &DocumentReport,
    doc_dir: &Path,
    html: bool,
    json: bool,
) -> Result<Vec<PathBuf>, FigAlignError> {
    let relative = report.relative_to(doc_dir);
    let mut written = Vec::new();

    if html {
        let path = doc_dir.join(format!("{}.html", report.document));
        write_text(&path, &render_html(&relative))?;
        written.push(path);
    }
    if json {
        let path = doc_dir.join(format!("{}.json", report.document));
        write_text(&path, &render_json(&relative)?)?;
        written.push(path);
    }

    debug!("Wrote {} report file(s) for {}", written.len(), report.document);
    Ok(written)
}

fn write_text(path: &Path, text: &str) -> Result<(), FigAlignError> {
    std::fs::write(path, text).map_err(|e| FigAlignError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AlignmentRecord, FigureNumber, ImageAsset, ImageOrigin};

    fn report(root: &Path) -> DocumentReport {
        DocumentReport {
            document: "paper".into(),
            caption_count: 2,
            unmatched_blocks: 0,
            records: vec![
                AlignmentRecord {
                    figure_number: FigureNumber::Resolved("1".into()),
                    image: Some(root.join("coord_page_1_figure_1.png")),
                    caption: "Figure 1. Growth <fast> & slow".into(),
                },
                AlignmentRecord {
                    figure_number: FigureNumber::Unresolved,
                    image: None,
                    caption: "Overview".into(),
                },
            ],
            gallery: vec![ImageAsset {
                path: root.join("extract_page_2_image_1.png"),
                page: 2,
                sequence_index_on_page: 1,
                byte_size: 99,
                origin: ImageOrigin::FullPageExtract,
            }],
            cropped_images: 1,
            duplicates_excluded: 0,
        }
    }

    #[test]
    fn html_escapes_captions_and_links_relative_images() {
        let root = Path::new("/out/paper");
        let html = render_html(&report(root).relative_to(root));

        assert!(html.contains("<th>Figure Number</th><th>Image</th><th>Caption</th>"));
        assert!(html.contains("Growth &lt;fast&gt; &amp; slow"));
        assert!(html.contains("<img src=\"coord_page_1_figure_1.png\""));
        assert!(html.contains("<td>Error</td>"));
        assert!(html.contains("<h2>Additional Images Extracted from PDF</h2>"));
        assert!(html.contains("<img src=\"extract_page_2_image_1.png\""));
        assert!(!html.contains("/out/paper"));
    }

    #[test]
    fn json_uses_relative_paths() {
        let root = Path::new("/out/paper");
        let json = render_json(&report(root).relative_to(root)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["records"][0]["image"], "coord_page_1_figure_1.png");
        assert_eq!(value["gallery"][0]["path"], "extract_page_2_image_1.png");
        assert_eq!(value["records"][1]["figure_number"], "Unresolved");
    }

    #[test]
    fn write_reports_honours_flags() {
        let dir = tempfile::tempdir().unwrap();
        let r = report(dir.path());

        let written = write_reports(&r, dir.path(), false, true).unwrap();
        assert_eq!(written, vec![dir.path().join("paper.json")]);
        assert!(!dir.path().join("paper.html").exists());

        let first = std::fs::read(dir.path().join("paper.json")).unwrap();
        write_reports(&r, dir.path(), true, true).unwrap();
        assert_eq!(std::fs::read(dir.path().join("paper.json")).unwrap(), first);
        assert!(dir.path().join("paper.html").exists());
    }
}

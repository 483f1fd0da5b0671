//! Input resolution: list the PDF corpus and pair each PDF with its markup.
//!
//! A document is identified by its PDF's base name. Its markup lives in the
//! markup directory as `<base><extension>` (GROBID writes `.tei.xml`). The
//! pairing is purely by name; whether the markup actually exists is decided
//! later by the orchestrator, which logs missing files instead of failing.

use crate::error::FigAlignError;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One PDF of the corpus and where its markup should be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    /// PDF file name without the `.pdf` extension.
    pub name: String,
    pub pdf_path: PathBuf,
    pub markup_path: PathBuf,
}

impl DocumentJob {
    pub fn has_markup(&self) -> bool {
        self.markup_path.is_file()
    }
}

/// Check if a file path has a PDF extension (case-insensitive).
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// List the PDFs in `pdf_dir`, sorted by file name, paired with their
/// expected markup paths.
pub fn discover_documents(
    pdf_dir: &Path,
    markup_dir: &Path,
    markup_extension: &str,
) -> Result<Vec<DocumentJob>, FigAlignError> {
    if !pdf_dir.is_dir() {
        return Err(FigAlignError::InputDirNotFound {
            path: pdf_dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(pdf_dir).map_err(|e| FigAlignError::ReadFailed {
        path: pdf_dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FigAlignError::ReadFailed {
            path: pdf_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && is_pdf_path(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort();

    let jobs: Vec<DocumentJob> = pdfs
        .into_iter()
        .filter_map(|pdf_path| {
            let name = pdf_path.file_stem()?.to_string_lossy().into_owned();
            let markup_path = markup_dir.join(format!("{name}{markup_extension}"));
            Some(DocumentJob {
                name,
                pdf_path,
                markup_path,
            })
        })
        .collect();

    debug!(
        "Discovered {} PDFs in {}",
        jobs.len(),
        pdf_dir.display()
    );
    Ok(jobs)
}

/// Output names handed out so far in one batch.
///
/// Each document writes into `<root>/<name>/`. Names are compared
/// case-insensitively, so `x.pdf` and `x.PDF` cannot share a directory on a
/// case-insensitive file system, and names that collide with files the
/// batch writes at the root are refused.
#[derive(Debug, Default)]
pub struct OutputNames {
    claimed: HashSet<String>,
    reserved: HashSet<String>,
}

impl OutputNames {
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            claimed: HashSet::new(),
            reserved: reserved
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Claim `name` for one document; `Err` carries the reason it is taken.
    pub fn claim(&mut self, name: &str) -> Result<(), String> {
        let key = name.to_lowercase();
        if self.reserved.contains(&key) {
            return Err(format!("'{name}' is reserved for a batch output file"));
        }
        if !self.claimed.insert(key) {
            return Err(format!(
                "Output directory '{name}' is already used by another PDF"
            ));
        }
        Ok(())
    }
}

/// Read a markup file as UTF-8 (invalid sequences are replaced).
pub fn read_markup(path: &Path) -> Result<String, FigAlignError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FigAlignError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => FigAlignError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Verify the `%PDF` magic bytes so a stray file yields a clear error rather
/// than an opaque pdfium failure.
pub fn check_pdf_magic(path: &Path) -> Result<(), FigAlignError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FigAlignError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => FigAlignError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(FigAlignError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_path() {
        assert!(is_pdf_path(Path::new("a/paper.pdf")));
        assert!(is_pdf_path(Path::new("PAPER.PDF")));
        assert!(!is_pdf_path(Path::new("paper.tei.xml")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn discover_sorts_and_pairs_by_base_name() {
        let root = tempfile::tempdir().unwrap();
        let pdf_dir = root.path().join("pdf");
        let tei_dir = root.path().join("tei");
        std::fs::create_dir_all(&pdf_dir).unwrap();
        for name in ["b.pdf", "a.pdf", "notes.txt", "C.PDF"] {
            std::fs::write(pdf_dir.join(name), b"%PDF-1.4").unwrap();
        }

        let jobs = discover_documents(&pdf_dir, &tei_dir, ".tei.xml").unwrap();
        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["C", "a", "b"]);
        assert_eq!(jobs[1].markup_path, tei_dir.join("a.tei.xml"));
        assert!(!jobs[1].has_markup());
    }

    #[test]
    fn discover_fails_for_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let err = discover_documents(&root.path().join("nope"), root.path(), ".tei.xml").unwrap_err();
        assert!(matches!(err, FigAlignError::InputDirNotFound { .. }));
    }

    #[test]
    fn magic_check_rejects_non_pdf() {
        let root = tempfile::tempdir().unwrap();
        let good = root.path().join("good.pdf");
        let bad = root.path().join("bad.pdf");
        std::fs::write(&good, b"%PDF-1.7\n").unwrap();
        std::fs::write(&bad, b"<html>").unwrap();

        assert!(check_pdf_magic(&good).is_ok());
        assert!(matches!(
            check_pdf_magic(&bad),
            Err(FigAlignError::NotAPdf { magic, .. }) if &magic == b"<htm"
        ));
        assert!(matches!(
            check_pdf_magic(&root.path().join("missing.pdf")),
            Err(FigAlignError::FileNotFound { .. })
        ));
    }

    #[test]
    fn output_names_are_claimed_once_ignoring_case() {
        let mut names = OutputNames::new(["error_log.tsv"]);
        assert!(names.claim("paper").is_ok());
        assert!(names.claim("other").is_ok());

        let err = names.claim("PAPER").unwrap_err();
        assert!(err.contains("already used"), "got: {err}");
        let err = names.claim("Error_Log.tsv").unwrap_err();
        assert!(err.contains("reserved"), "got: {err}");
    }

    #[test]
    fn read_markup_replaces_invalid_utf8() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("doc.tei.xml");
        std::fs::write(&path, b"<TEI>\xff</TEI>").unwrap();
        let text = read_markup(&path).unwrap();
        assert!(text.starts_with("<TEI>"));
        assert!(text.contains('\u{FFFD}'));
    }
}

//! Figure-label extraction from caption text.
//!
//! Recognises "Figure 3B", "Fig. 2", "Figs 4", "figure supplement 1" and
//! similar, case-insensitively, and returns the number with its optional
//! panel letter. Only the first label in the caption counts.

use crate::error::CaptionError;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_FIGURE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Fig(?:ure)?(?:\s|\.|s|ure supplement)?\.?\s*(\d+[A-Za-z]?)").unwrap()
});

/// Extract the figure number from a caption description.
///
/// # Errors
/// [`CaptionError::NoFigureNumberFound`] when no label is present. Callers
/// treat this as a per-caption condition, not a document failure.
pub fn extract_figure_number(description: &str) -> Result<String, CaptionError> {
    RE_FIGURE_NUMBER
        .captures(description)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| CaptionError::NoFigureNumberFound {
            description: description.to_string(),
        })
}

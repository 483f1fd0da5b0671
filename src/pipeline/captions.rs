//! Caption scanning: lift figure captions and bitmap coordinates out of TEI.
//!
//! GROBID's TEI output is not always well-formed XML, so figures are found
//! with a tolerant pattern rather than a parser. A figure block is accepted
//! when it has the shape
//!
//! ```text
//! <figure …>  <head>…</head>  <label>…</label>  <figDesc>…</figDesc>
//!   [ <graphic … coords="p,x,y,w,h" … type="bitmap" … /> ]
//! ```
//!
//! and its opening tag is not marked `type="table"`. Anything else is skipped.
//! Skipped blocks are not reported in the error log; they are only counted
//! in [`CaptionScan::unmatched_blocks`].

use crate::output::FigureCaption;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_FIGURE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)<figure([^>]*)>\s*",
        r"<head>[^<]*</head>\s*",
        r"<label>[^<]*</label>\s*",
        r"<figDesc>(.*?)</figDesc>\s*",
        r#"(<graphic[^>]*coords="([^"]+)"[^>]*type="bitmap"[^>]*/>)?"#,
    ))
    .unwrap()
});

static RE_FIGURE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<figure([^>]*)>").unwrap());

static RE_TABLE_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\btype="table""#).unwrap());

/// Result of scanning one markup document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionScan {
    /// Captions in document order.
    pub captions: Vec<FigureCaption>,
    /// Non-table `<figure>` tags that did not produce a caption.
    pub unmatched_blocks: usize,
}

impl CaptionScan {
    /// Coordinate strings of the captions that have them, in caption order.
    pub fn coordinates(&self) -> Vec<String> {
        self.captions
            .iter()
            .filter_map(|c| c.coordinates.clone())
            .collect()
    }
}

fn is_table(open_tag_attrs: &str) -> bool {
    RE_TABLE_TYPE.is_match(open_tag_attrs)
}

/// Scan `markup` for figure captions.
pub fn scan_captions(markup: &str) -> CaptionScan {
    let captions: Vec<FigureCaption> = RE_FIGURE_BLOCK
        .captures_iter(markup)
        .filter(|caps| !is_table(&caps[1]))
        .map(|caps| FigureCaption {
            description: caps[2].trim().to_string(),
            coordinates: caps.get(4).map(|m| m.as_str().trim().to_string()),
        })
        .collect();

    let figure_tags = RE_FIGURE_OPEN
        .captures_iter(markup)
        .filter(|caps| !is_table(&caps[1]))
        .count();
    let unmatched_blocks = figure_tags.saturating_sub(captions.len());

    debug!(
        "Scanned markup: {} captions ({} with coordinates), {} unmatched figure blocks",
        captions.len(),
        captions.iter().filter(|c| c.has_coordinates()).count(),
        unmatched_blocks
    );

    CaptionScan {
        captions,
        unmatched_blocks,
    }
}

/// Plain caption sequence of `markup`.
pub fn extract_captions(markup: &str) -> Vec<FigureCaption> {
    scan_captions(markup).captions
}

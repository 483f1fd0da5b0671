//! Pipeline stages for figure–caption correlation.
//!
//! Each submodule implements exactly one transformation step and is driven
//! per document by [`crate::batch`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ captions ──▶ crop ──────┐
//! (pairing)  (TEI scan)   (coords)  ├──▶ align ──▶ report
//!                    dedup ─────────┘   (cursor)   (html/json)
//!                    (embedded images)
//! ```
//!
//! 1. [`input`]    — list the PDFs and pair each with its markup file
//! 2. [`captions`] — lift `<figure>` blocks (description + coords) from TEI
//! 3. [`crop`]     — render each coordinate box to a PNG, one slot per box
//! 4. [`dedup`]    — extract embedded images, dropping byte-size duplicates
//! 5. [`align`]    — pair captions with crops positionally, log what fails
//! 6. [`report`]   — write the per-document HTML and JSON
//!
//! [`figure_number`] resolves labels for [`align`]; [`source`] is the PDF
//! capability surface shared by [`crop`] and [`dedup`]; [`encode`] turns
//! rasters into the PNG bytes both of them write.

pub mod align;
pub mod captions;
pub mod crop;
pub mod dedup;
pub mod encode;
pub mod figure_number;
pub mod input;
pub mod report;
pub mod source;

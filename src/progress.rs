//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the orchestrator walks the corpus. The library never prints; the CLI
//! turns these events into an `indicatif` progress bar.
//!
//! # Example
//!
//! ```rust
//! use figalign::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, name: &str, records: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {name}: {records} figures");
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after the corpus has been listed.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document's markup is read.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document's reports have been written.
    ///
    /// `records` is the number of alignment rows produced.
    fn on_document_complete(&self, index: usize, total: usize, name: &str, records: usize) {
        let _ = (index, total, name, records);
    }

    /// Called when a document is skipped (missing markup) or fails.
    fn on_document_skipped(&self, index: usize, total: usize, name: &str, reason: &str) {
        let _ = (index, total, name, reason);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, processed: usize) {
        let _ = (total_documents, processed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

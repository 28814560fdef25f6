//! Progress-callback trait for per-diagram conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while the pipeline rasterises diagrams, which is the only slow step
//! before the export engine takes over.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_diagram_complete(&self, index: usize, total: usize, file_name: &str) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Diagram {}/{} → {}", index + 1, total, file_name);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     rendered: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it renders each diagram.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
///
/// With `diagram_concurrency > 1` the per-diagram methods may be called in
/// completion order rather than index order.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first diagram is rendered.
    ///
    /// # Arguments
    /// * `total_diagrams`: number of diagrams found in the documents
    fn on_conversion_start(&self, total_diagrams: usize) {
        let _ = total_diagrams;
    }

    /// Called just before a diagram's page is opened.
    ///
    /// # Arguments
    /// * `index`: 0-based diagram index
    /// * `total`: total diagrams
    fn on_diagram_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a diagram was captured to a PNG.
    ///
    /// # Arguments
    /// * `index`:     0-based diagram index
    /// * `total`:     total diagrams
    /// * `file_name`: PNG file name inside the working directory
    fn on_diagram_complete(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called when a diagram failed; its placeholder stays in the document.
    ///
    /// # Arguments
    /// * `index`: 0-based diagram index
    /// * `total`: total diagrams
    /// * `error`: human-readable error description
    fn on_diagram_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every diagram has been attempted.
    ///
    /// # Arguments
    /// * `total`:         total diagrams
    /// * `success_count`: diagrams that produced an image
    fn on_conversion_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

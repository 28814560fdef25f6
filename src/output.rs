//! Result types returned by the conversion entry points.

use crate::error::DiagramError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of rendering one diagram.
///
/// Exactly one `DiagramResult` exists per extracted diagram. A result with
/// `image: None` leaves the diagram's placeholder token in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramResult {
    /// 0-based index in order of appearance.
    pub index: usize,
    /// PNG file name inside the working directory, if rendering succeeded.
    pub image: Option<String>,
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
    pub error: Option<DiagramError>,
}

impl DiagramResult {
    pub fn rendered(index: usize, image: String, width: u32, height: u32, duration_ms: u64) -> Self {
        Self {
            index,
            image: Some(image),
            width,
            height,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(error: DiagramError, duration_ms: u64) -> Self {
        Self {
            index: error.index(),
            image: None,
            width: 0,
            height: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.image.is_some()
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Input documents merged (the cover is not counted).
    pub documents: usize,
    pub has_cover: bool,
    pub diagrams_found: usize,
    pub diagrams_rendered: usize,
    pub diagrams_failed: usize,
    /// Size of the styled HTML handed to the export engine.
    pub html_bytes: usize,
    pub total_duration_ms: u64,
    pub diagram_duration_ms: u64,
    pub export_duration_ms: u64,
}

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Where the PDF was written.
    pub output_path: PathBuf,
    /// One entry per diagram, sorted by index.
    pub diagrams: Vec<DiagramResult>,
    pub stats: ConversionStats,
    /// Working directory, when it was kept (`keep_work_dir`).
    pub work_dir: Option<PathBuf>,
}

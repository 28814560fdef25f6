//! Error types for the edgequake-md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`]: **Fatal**: the run cannot produce a PDF at all
//!   (missing input, missing cover, export engine failure). Returned as
//!   `Err(Md2PdfError)` from the top-level `convert*` functions.
//!
//! * [`DiagramError`]: **Non-fatal**: a single diagram failed to render
//!   (timeout, browser glitch) but the document is still exported. Stored
//!   inside [`crate::output::DiagramResult`]; the diagram's placeholder token
//!   stays visible in the PDF so the gap is easy to spot.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-md2pdf library.
///
/// Diagram-level failures use [`DiagramError`] and are stored in
/// [`crate::output::DiagramResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No Markdown document was given.
    #[error("No input files given.\nUsage: md2pdf [--cover cover.md] <input.md> [input2.md...] [output.pdf]")]
    NoInputFiles,

    /// An input document was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The `--cover` document was not found.
    #[error("Cover file not found: '{path}'")]
    CoverNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Working directory errors ──────────────────────────────────────────
    /// The transient working directory could not be created.
    #[error("Failed to create working directory in '{parent}': {source}")]
    WorkDirFailed {
        parent: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An intermediate file inside the working directory could not be written.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Browser errors ────────────────────────────────────────────────────
    /// Headless Chromium could not be started.
    ///
    /// The conversion pipeline downgrades this to one
    /// [`DiagramError::BrowserUnavailable`] per diagram; it only reaches
    /// callers who launch [`crate::pipeline::rasterize::BrowserRasterizer`]
    /// themselves.
    #[error(
        "Failed to launch headless Chromium: {detail}\n\
Install Chrome or Chromium, or point --chrome / CHROME at the executable."
    )]
    BrowserLaunchFailed { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The export engine binary could not be started.
    #[error(
        "PrinceXML not found ('{binary}'): {detail}\n\n\
Make sure PrinceXML is installed:\n\
  • brew install prince\n\
  • Or download from: https://www.princexml.com/\n\
  • Or point --prince / PRINCE_BIN at the executable.\n\n\
Debug files kept in: {work_dir:?}"
    )]
    ExportEngineNotFound {
        binary: PathBuf,
        detail: String,
        work_dir: PathBuf,
    },

    /// The export engine ran but did not produce a PDF.
    #[error(
        "PrinceXML Error: {message}\n\n\
Make sure PrinceXML is installed:\n\
  • brew install prince\n\
  • Or download from: https://www.princexml.com/\n\n\
Debug files kept in: {work_dir:?}"
    )]
    ExportFailed { message: String, work_dir: PathBuf },

    /// Could not move the finished PDF to the requested output path.
    #[error("Failed to write output file '{path}': {source}\nRendered PDF kept in: {work_dir:?}")]
    OutputWriteFailed {
        path: PathBuf,
        work_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single diagram.
///
/// The diagram's placeholder token is left in the final document. `index`
/// is 0-based; messages number diagrams from 1, like the log and the CLI.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DiagramError {
    /// The rendered SVG never appeared in the page.
    #[error("Diagram {n}: no rendered SVG after {secs}s", n = .index + 1)]
    Timeout { index: usize, secs: u64 },

    /// The browser failed while loading the page or taking the screenshot.
    #[error("Diagram {n}: rendering failed: {detail}", n = .index + 1)]
    RenderFailed { index: usize, detail: String },

    /// A screenshot was written but is not a readable PNG.
    #[error("Diagram {n}: screenshot is not a valid PNG: {detail}", n = .index + 1)]
    InvalidImage { index: usize, detail: String },

    /// No browser was available for this run.
    #[error("Diagram {n}: browser unavailable: {detail}", n = .index + 1)]
    BrowserUnavailable { index: usize, detail: String },
}

impl DiagramError {
    /// Index of the diagram this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            DiagramError::Timeout { index, .. }
            | DiagramError::RenderFailed { index, .. }
            | DiagramError::InvalidImage { index, .. }
            | DiagramError::BrowserUnavailable { index, .. } => *index,
        }
    }
}

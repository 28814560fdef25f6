//! Conversion entry points.
//!
//! A run has two halves:
//!
//! * [`prepare`] reads, joins, parses and annotates Markdown. It needs no
//!   external tools and never touches the file system beyond reading the
//!   inputs.
//! * The rest rasterises diagrams into a fresh working directory, composes
//!   the styled document and hands it to PrinceXML.
//!
//! [`convert`] drives a real headless browser; [`convert_with_rasterizer`]
//! accepts any [`DiagramRasterizer`], which is how the integration tests run
//! the full pipeline without Chromium.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::{ConversionOutput, ConversionStats, DiagramResult};
use crate::pipeline::assemble;
use crate::pipeline::export::{self, WorkDir};
use crate::pipeline::extract::{reinsert, DiagramSource, Extractor, Segment};
use crate::pipeline::input::InputSet;
use crate::pipeline::markup::{annotate_segments, MarkupOptions};
use crate::pipeline::rasterize::{self, BrowserRasterizer, DiagramRasterizer};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A parsed document, with diagram slots still open.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    cover: Option<Vec<Segment>>,
    body: Vec<Segment>,
    diagrams: Vec<DiagramSource>,
    documents: usize,
}

impl PreparedDocument {
    /// Every diagram found, cover first, in order of appearance.
    pub fn diagrams(&self) -> &[DiagramSource] {
        &self.diagrams
    }

    pub fn has_cover(&self) -> bool {
        self.cover.is_some()
    }

    /// Number of body documents merged.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Close every diagram slot and compose the styled document.
    ///
    /// `images` maps diagram index → PNG path relative to the document;
    /// indices without an entry keep their placeholder token.
    pub fn to_html(&self, images: &BTreeMap<usize, String>, config: &ConversionConfig) -> String {
        let cover = self.cover.as_ref().map(|c| reinsert(c, images));
        let body = reinsert(&self.body, images);
        export::compose_document(config, cover.as_deref(), &body)
    }
}

/// Read the inputs and parse everything that does not need a browser.
///
/// The cover is extracted before the body, so its diagrams take the first
/// indices.
pub async fn prepare(inputs: &InputSet) -> Result<PreparedDocument, Md2PdfError> {
    let text = assemble::read_inputs(inputs).await?;
    let mut extractor = Extractor::new();

    let cover = text
        .cover
        .as_deref()
        .map(|cover| annotate_segments(extractor.extract(cover), MarkupOptions::COVER));
    let body = annotate_segments(extractor.extract(&text.body), MarkupOptions::BODY);

    let diagrams = extractor.into_diagrams();
    info!("Found {} Mermaid diagram(s)", diagrams.len());

    Ok(PreparedDocument {
        cover,
        body,
        diagrams,
        documents: inputs.documents().len(),
    })
}

/// Convert `inputs` into a PDF at `output`.
///
/// Diagrams are rendered in headless Chromium, launched only when the
/// document contains at least one diagram. A browser that fails to start
/// leaves every diagram unresolved; the PDF is still produced.
///
/// # Errors
/// Returns `Err(Md2PdfError)` for fatal errors only:
/// - an input can no longer be read
/// - the working directory cannot be created
/// - PrinceXML is missing or fails, or the PDF cannot be put in place (the
///   working directory is kept for inspection)
pub async fn convert(
    inputs: &InputSet,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let started = Instant::now();
    let output = output.as_ref();
    let (prepared, work_dir) = begin(inputs, output, config).await?;

    let diagram_start = Instant::now();
    let diagrams = if prepared.diagrams().is_empty() {
        Vec::new()
    } else {
        match BrowserRasterizer::launch(config).await {
            Ok(browser) => {
                let results =
                    rasterize::rasterize_all(&browser, prepared.diagrams(), work_dir.path(), config)
                        .await;
                browser.close().await;
                results
            }
            Err(e) => {
                warn!("{e}");
                rasterize::all_unavailable(prepared.diagrams(), &e.to_string(), config)
            }
        }
    };
    let diagram_ms = diagram_start.elapsed().as_millis() as u64;

    finish(prepared, diagrams, diagram_ms, work_dir, output, config, started).await
}

/// Like [`convert`], with diagrams rendered by `rasterizer`.
pub async fn convert_with_rasterizer<R: DiagramRasterizer>(
    inputs: &InputSet,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
    rasterizer: &R,
) -> Result<ConversionOutput, Md2PdfError> {
    let started = Instant::now();
    let output = output.as_ref();
    let (prepared, work_dir) = begin(inputs, output, config).await?;

    let diagram_start = Instant::now();
    let diagrams =
        rasterize::rasterize_all(rasterizer, prepared.diagrams(), work_dir.path(), config).await;
    let diagram_ms = diagram_start.elapsed().as_millis() as u64;

    finish(prepared, diagrams, diagram_ms, work_dir, output, config, started).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    inputs: &InputSet,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, output, config))
}

async fn begin(
    inputs: &InputSet,
    output: &Path,
    config: &ConversionConfig,
) -> Result<(PreparedDocument, WorkDir), Md2PdfError> {
    info!("Starting conversion → {}", output.display());
    let prepared = prepare(inputs).await?;

    let parent = config
        .work_dir_parent
        .clone()
        .unwrap_or_else(|| export::default_work_parent(output));
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|source| Md2PdfError::WorkDirFailed {
            parent: parent.clone(),
            source,
        })?;
    let work_dir = WorkDir::create(&parent)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(prepared.diagrams().len());
    }
    Ok((prepared, work_dir))
}

async fn finish(
    prepared: PreparedDocument,
    diagrams: Vec<DiagramResult>,
    diagram_duration_ms: u64,
    work_dir: WorkDir,
    output: &Path,
    config: &ConversionConfig,
    started: Instant,
) -> Result<ConversionOutput, Md2PdfError> {
    let rendered = diagrams.iter().filter(|d| d.is_rendered()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(diagrams.len(), rendered);
    }

    let images: BTreeMap<usize, String> = diagrams
        .iter()
        .filter_map(|d| d.image.clone().map(|file| (d.index, file)))
        .collect();
    let html = prepared.to_html(&images, config);
    let html_path = export::write_document(&work_dir, &html).await?;

    let export_start = Instant::now();
    if let Err(e) =
        export::export_pdf(&config.prince_binary, &html_path, work_dir.path(), output).await
    {
        let kept = work_dir.keep();
        debug!("Kept working directory {}", kept.display());
        return Err(e);
    }
    let export_duration_ms = export_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        documents: prepared.documents(),
        has_cover: prepared.has_cover(),
        diagrams_found: diagrams.len(),
        diagrams_rendered: rendered,
        diagrams_failed: diagrams.len() - rendered,
        html_bytes: html.len(),
        total_duration_ms: started.elapsed().as_millis() as u64,
        diagram_duration_ms,
        export_duration_ms,
    };

    info!(
        "Conversion complete: {}/{} diagrams, {}ms total",
        rendered, stats.diagrams_found, stats.total_duration_ms
    );
    let work_dir = if config.keep_work_dir {
        Some(work_dir.keep())
    } else {
        None
    };

    Ok(ConversionOutput {
        output_path: output.to_path_buf(),
        diagrams,
        stats,
        work_dir,
    })
}

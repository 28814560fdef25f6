//! Diagram rasterisation in headless Chromium.
//!
//! One browser is launched per run and each diagram gets its own page:
//! the host page loads Mermaid, Mermaid replaces the source with an `<svg>`,
//! and the `<svg>` element is screenshotted to `mermaid-{index}.png` in the
//! working directory.
//!
//! ## Failure model
//!
//! A diagram that times out or fails to render produces a
//! [`DiagramError`] in its [`DiagramResult`]; the other diagrams and the
//! rest of the run carry on. If the browser cannot be launched at all,
//! every diagram is marked [`DiagramError::BrowserUnavailable`].
//!
//! ## Concurrency
//!
//! [`rasterize_all`] drives any [`DiagramRasterizer`] with
//! `buffer_unordered(diagram_concurrency)`. The default of 1 renders one
//! page at a time; higher values open several pages on the same browser.

use crate::config::ConversionConfig;
use crate::error::{DiagramError, Md2PdfError};
use crate::output::DiagramResult;
use crate::pipeline::extract::DiagramSource;
use crate::templates::diagram_host_page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Element, Page};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Element Mermaid produces once a diagram has rendered.
const SVG_SELECTOR: &str = ".mermaid svg";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for loading the host page, Mermaid script included.
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// File name of the PNG for diagram `index`, relative to the working directory.
pub fn diagram_file_name(index: usize) -> String {
    format!("mermaid-{index}.png")
}

/// Renders one diagram definition to a PNG file.
///
/// Implemented by [`BrowserRasterizer`]; tests and embedders can supply
/// their own (e.g. a renderer that writes pre-built images).
pub trait DiagramRasterizer: Send + Sync {
    /// Write the rendered diagram to `target` as PNG.
    fn rasterize(
        &self,
        diagram: &DiagramSource,
        target: &Path,
    ) -> impl Future<Output = Result<(), DiagramError>> + Send;
}

/// A headless Chromium instance shared by every diagram of one run.
pub struct BrowserRasterizer {
    browser: Browser,
    handler: JoinHandle<()>,
    mermaid_url: String,
    mermaid_theme: String,
    timeout: Duration,
    settle: Duration,
}

impl BrowserRasterizer {
    /// Launch the browser configured by `config`.
    ///
    /// Uses `config.chrome_executable` when set, otherwise the first
    /// Chromium/Chrome found on the system.
    pub async fn launch(config: &ConversionConfig) -> Result<Self, Md2PdfError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Default::default()
            });
        if let Some(ref exe) = config.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        let browser_config = builder
            .build()
            .map_err(|detail| Md2PdfError::BrowserLaunchFailed { detail })?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| Md2PdfError::BrowserLaunchFailed {
                    detail: e.to_string(),
                })?;

        // CDP events must be polled for the browser to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("Browser launched");
        Ok(Self {
            browser,
            handler,
            mermaid_url: config.mermaid_url.clone(),
            mermaid_theme: config.mermaid_theme.clone(),
            timeout: config.diagram_timeout(),
            settle: config.diagram_settle(),
        })
    }

    /// Shut the browser down and wait for its event loop to finish.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait: {e}");
        }
        self.handler.abort();
        debug!("Browser closed");
    }

    async fn render_on(&self, page: &Page, diagram: &DiagramSource, target: &Path) -> Result<(), DiagramError> {
        let index = diagram.index;
        let html = diagram_host_page(&diagram.source, &self.mermaid_url, &self.mermaid_theme);

        tokio::time::timeout(PAGE_LOAD_TIMEOUT, page.set_content(html))
            .await
            .map_err(|_| DiagramError::RenderFailed {
                index,
                detail: format!("page did not load within {}s", PAGE_LOAD_TIMEOUT.as_secs()),
            })?
            .map_err(|e| DiagramError::RenderFailed {
                index,
                detail: format!("cannot load page: {e}"),
            })?;

        let svg = tokio::time::timeout(self.timeout, wait_for_svg(page))
            .await
            .map_err(|_| DiagramError::Timeout {
                index,
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| DiagramError::RenderFailed {
                index,
                detail: e.to_string(),
            })?;

        // Fonts and layout may still shift after the <svg> appears.
        tokio::time::sleep(self.settle).await;

        svg.save_screenshot(CaptureScreenshotFormat::Png, target)
            .await
            .map_err(|e| DiagramError::RenderFailed {
                index,
                detail: format!("screenshot failed: {e}"),
            })?;
        Ok(())
    }
}

impl DiagramRasterizer for BrowserRasterizer {
    async fn rasterize(&self, diagram: &DiagramSource, target: &Path) -> Result<(), DiagramError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DiagramError::RenderFailed {
                index: diagram.index,
                detail: format!("cannot open page: {e}"),
            })?;

        let result = self.render_on(&page, diagram, target).await;

        if let Err(e) = page.close().await {
            debug!("Page close for diagram {}: {e}", diagram.index);
        }
        result
    }
}

/// Poll until Mermaid has replaced the source with an `<svg>`.
///
/// An empty match means "not rendered yet"; any protocol error ends the
/// wait.
async fn wait_for_svg(page: &Page) -> Result<Element, CdpError> {
    loop {
        if let Some(element) = page.find_elements(SVG_SELECTOR).await?.into_iter().next() {
            return Ok(element);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Render every diagram into `work_dir`, one [`DiagramResult`] per diagram
/// in index order.
///
/// Each PNG is decoded after it is written; a file that is not a valid
/// image counts as a failure.
pub async fn rasterize_all<R: DiagramRasterizer>(
    rasterizer: &R,
    diagrams: &[DiagramSource],
    work_dir: &Path,
    config: &ConversionConfig,
) -> Vec<DiagramResult> {
    let total = diagrams.len();
    let mut results: Vec<DiagramResult> = stream::iter(diagrams.iter().map(|diagram| async move {
        if let Some(ref cb) = config.progress_callback {
            cb.on_diagram_start(diagram.index, total);
        }
        let result = render_one(rasterizer, diagram, work_dir).await;
        if let Some(ref cb) = config.progress_callback {
            match (&result.image, &result.error) {
                (Some(file), _) => cb.on_diagram_complete(diagram.index, total, file),
                (None, Some(e)) => cb.on_diagram_error(diagram.index, total, &e.to_string()),
                (None, None) => {}
            }
        }
        result
    }))
    .buffer_unordered(config.diagram_concurrency.max(1))
    .collect()
    .await;

    results.sort_by_key(|r| r.index);
    results
}

async fn render_one<R: DiagramRasterizer>(
    rasterizer: &R,
    diagram: &DiagramSource,
    work_dir: &Path,
) -> DiagramResult {
    let index = diagram.index;
    let file_name = diagram_file_name(index);
    let target = work_dir.join(&file_name);
    let started = Instant::now();

    let outcome = match rasterizer.rasterize(diagram, &target).await {
        Ok(()) => image::image_dimensions(&target).map_err(|e| DiagramError::InvalidImage {
            index,
            detail: e.to_string(),
        }),
        Err(e) => Err(e),
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok((width, height)) => {
            info!("Diagram {} → {file_name} ({width}x{height})", index + 1);
            DiagramResult::rendered(index, file_name, width, height, duration_ms)
        }
        Err(e) => {
            warn!("{e}");
            DiagramResult::failed(e, duration_ms)
        }
    }
}

/// Results for a run whose browser never started.
pub fn all_unavailable(
    diagrams: &[DiagramSource],
    detail: &str,
    config: &ConversionConfig,
) -> Vec<DiagramResult> {
    let total = diagrams.len();
    diagrams
        .iter()
        .map(|d| {
            let error = DiagramError::BrowserUnavailable {
                index: d.index,
                detail: detail.to_string(),
            };
            if let Some(ref cb) = config.progress_callback {
                cb.on_diagram_error(d.index, total, &error.to_string());
            }
            DiagramResult::failed(error, 0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ConversionProgressCallback;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubRasterizer {
        fail: Vec<usize>,
        garbage: Vec<usize>,
    }

    impl DiagramRasterizer for StubRasterizer {
        async fn rasterize(&self, diagram: &DiagramSource, target: &Path) -> Result<(), DiagramError> {
            if self.fail.contains(&diagram.index) {
                return Err(DiagramError::Timeout {
                    index: diagram.index,
                    secs: 10,
                });
            }
            if self.garbage.contains(&diagram.index) {
                std::fs::write(target, b"not a png").unwrap();
                return Ok(());
            }
            let width = 10 + diagram.index as u32;
            RgbaImage::from_pixel(width, 8, Rgba([255, 255, 255, 255]))
                .save(target)
                .unwrap();
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counting {
        completed: AtomicUsize,
        failed: AtomicUsize,
    }

    impl ConversionProgressCallback for Counting {
        fn on_diagram_complete(&self, _index: usize, _total: usize, _file_name: &str) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_diagram_error(&self, _index: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sources(n: usize) -> Vec<DiagramSource> {
        (0..n)
            .map(|index| DiagramSource {
                index,
                source: format!("graph TD; A{index}-->B"),
            })
            .collect()
    }

    #[test]
    fn test_diagram_file_name() {
        assert_eq!(diagram_file_name(0), "mermaid-0.png");
        assert_eq!(diagram_file_name(12), "mermaid-12.png");
    }

    #[tokio::test]
    async fn test_rasterize_all_records_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let progress = Arc::new(Counting::default());
        let config = ConversionConfig::builder()
            .diagram_concurrency(3)
            .progress_callback(progress.clone())
            .build()
            .unwrap();
        let stub = StubRasterizer {
            fail: vec![1],
            garbage: vec![3],
        };

        let results = rasterize_all(&stub, &sources(4), dir.path(), &config).await;

        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(results[0].is_rendered());
        assert_eq!((results[0].width, results[0].height), (10, 8));
        assert!(matches!(results[1].error, Some(DiagramError::Timeout { index: 1, .. })));
        assert!(results[2].is_rendered());
        assert!(matches!(results[3].error, Some(DiagramError::InvalidImage { index: 3, .. })));
        assert_eq!(progress.completed.load(Ordering::SeqCst), 2);
        assert_eq!(progress.failed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_all_unavailable() {
        let config = ConversionConfig::default();
        let results = all_unavailable(&sources(2), "no chrome", &config);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_rendered()));
        assert!(matches!(
            results[1].error,
            Some(DiagramError::BrowserUnavailable { index: 1, .. })
        ));
    }
}

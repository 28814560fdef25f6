//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs between the library and the CLI, print them
//! for debugging, and diff two runs to understand why their outputs differ.

use crate::error::Md2PdfError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Mermaid release loaded by the diagram host page unless overridden.
pub const DEFAULT_MERMAID_URL: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10.6.1/dist/mermaid.min.js";

/// Configuration for a Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .page_size("Letter")
///     .diagram_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// `<title>` of the styled document; Prince copies it into the PDF
    /// metadata. Default: "Document".
    pub title: String,

    /// Bookmark text of the synthetic entry that stands in for the whole
    /// cover section. Default: "Cover".
    pub cover_label: String,

    /// CSS `@page` size. Default: "A4".
    pub page_size: String,

    /// CSS `@page` margin. Default: "18mm".
    pub page_margin: String,

    /// Extra CSS appended after the built-in stylesheet. Default: None.
    pub extra_stylesheet: Option<String>,

    /// How long to wait for a diagram's SVG to appear, in seconds. Default: 10.
    ///
    /// A diagram that misses the deadline is left unresolved; the others
    /// carry on.
    pub diagram_timeout_secs: u64,

    /// Pause between the SVG appearing and the screenshot, in milliseconds.
    /// Default: 1000.
    ///
    /// Mermaid keeps adjusting label positions for a short while after the
    /// `<svg>` is inserted.
    pub diagram_settle_ms: u64,

    /// Diagrams rendered at once, each in its own page of the shared
    /// browser. Default: 1 (strictly sequential).
    pub diagram_concurrency: usize,

    /// Browser viewport width in pixels. Default: 1400.
    pub viewport_width: u32,

    /// Browser viewport height in pixels. Default: 1000.
    pub viewport_height: u32,

    /// Script URL the host page loads Mermaid from.
    pub mermaid_url: String,

    /// Mermaid theme name. Default: "default".
    pub mermaid_theme: String,

    /// Chrome/Chromium executable. If None, chromiumoxide auto-detects one.
    pub chrome_executable: Option<PathBuf>,

    /// PrinceXML executable. Default: "prince" (looked up on `PATH`).
    pub prince_binary: PathBuf,

    /// Where the transient working directory is created. If None, next to
    /// the output file.
    pub work_dir_parent: Option<PathBuf>,

    /// Keep the working directory after a successful export. Default: false.
    ///
    /// It is always kept when the export engine fails.
    pub keep_work_dir: bool,

    /// Optional progress callback for per-diagram events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            title: "Document".to_string(),
            cover_label: "Cover".to_string(),
            page_size: "A4".to_string(),
            page_margin: "18mm".to_string(),
            extra_stylesheet: None,
            diagram_timeout_secs: 10,
            diagram_settle_ms: 1000,
            diagram_concurrency: 1,
            viewport_width: 1400,
            viewport_height: 1000,
            mermaid_url: DEFAULT_MERMAID_URL.to_string(),
            mermaid_theme: "default".to_string(),
            chrome_executable: None,
            prince_binary: PathBuf::from("prince"),
            work_dir_parent: None,
            keep_work_dir: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("title", &self.title)
            .field("cover_label", &self.cover_label)
            .field("page_size", &self.page_size)
            .field("page_margin", &self.page_margin)
            .field(
                "extra_stylesheet",
                &self.extra_stylesheet.as_ref().map(|css| css.len()),
            )
            .field("diagram_timeout_secs", &self.diagram_timeout_secs)
            .field("diagram_settle_ms", &self.diagram_settle_ms)
            .field("diagram_concurrency", &self.diagram_concurrency)
            .field("viewport_width", &self.viewport_width)
            .field("viewport_height", &self.viewport_height)
            .field("mermaid_url", &self.mermaid_url)
            .field("mermaid_theme", &self.mermaid_theme)
            .field("chrome_executable", &self.chrome_executable)
            .field("prince_binary", &self.prince_binary)
            .field("work_dir_parent", &self.work_dir_parent)
            .field("keep_work_dir", &self.keep_work_dir)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn diagram_timeout(&self) -> Duration {
        Duration::from_secs(self.diagram_timeout_secs)
    }

    pub fn diagram_settle(&self) -> Duration {
        Duration::from_millis(self.diagram_settle_ms)
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn cover_label(mut self, label: impl Into<String>) -> Self {
        self.config.cover_label = label.into();
        self
    }

    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.config.page_size = size.into();
        self
    }

    pub fn page_margin(mut self, margin: impl Into<String>) -> Self {
        self.config.page_margin = margin.into();
        self
    }

    pub fn extra_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.extra_stylesheet = Some(css.into());
        self
    }

    pub fn diagram_timeout_secs(mut self, secs: u64) -> Self {
        self.config.diagram_timeout_secs = secs.max(1);
        self
    }

    pub fn diagram_settle_ms(mut self, ms: u64) -> Self {
        self.config.diagram_settle_ms = ms;
        self
    }

    pub fn diagram_concurrency(mut self, n: usize) -> Self {
        self.config.diagram_concurrency = n.max(1);
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width.max(100);
        self.config.viewport_height = height.max(100);
        self
    }

    pub fn mermaid_url(mut self, url: impl Into<String>) -> Self {
        self.config.mermaid_url = url.into();
        self
    }

    pub fn mermaid_theme(mut self, theme: impl Into<String>) -> Self {
        self.config.mermaid_theme = theme.into();
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn prince_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.prince_binary = path.into();
        self
    }

    pub fn work_dir_parent(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.work_dir_parent = Some(path.into());
        self
    }

    pub fn keep_work_dir(mut self, v: bool) -> Self {
        self.config.keep_work_dir = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if c.page_size.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "Page size must not be empty".into(),
            ));
        }
        if c.mermaid_url.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "Mermaid script URL must not be empty".into(),
            ));
        }
        if c.prince_binary.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "PrinceXML binary path must not be empty".into(),
            ));
        }
        if c.diagram_concurrency == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Diagram concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

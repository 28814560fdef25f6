//! Layout and export: styled document → PrinceXML → PDF.
//!
//! The styled HTML and the diagram PNGs live side by side in a transient
//! working directory so the relative `<img src="mermaid-N.png">` references
//! resolve. Prince writes to a staging file inside that directory; the
//! requested output path is only touched once Prince has succeeded.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::pipeline::assemble::PAGE_BREAK;
use crate::pipeline::markup::escape_html;
use crate::templates::stylesheet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// File name of the styled document inside the working directory.
pub const HTML_FILE_NAME: &str = "output.html";

const STAGING_FILE_NAME: &str = "output.pdf";

/// Uniquely named transient directory for one run.
///
/// Removed when dropped unless [`WorkDir::keep`] is called.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create `.md2pdf-XXXXXX` inside `parent`.
    pub fn create(parent: &Path) -> Result<Self, Md2PdfError> {
        let dir = tempfile::Builder::new()
            .prefix(".md2pdf-")
            .tempdir_in(parent)
            .map_err(|source| Md2PdfError::WorkDirFailed {
                parent: parent.to_path_buf(),
                source,
            })?;
        debug!("Working directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn html_path(&self) -> PathBuf {
        self.dir.path().join(HTML_FILE_NAME)
    }

    /// Persist the directory and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// Directory the working directory is created in for `output`.
pub fn default_work_parent(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Build the complete styled document.
///
/// With a cover, the document opens with a cover section holding a hidden
/// `h1#cover` (the single outline entry for the cover) followed by a page
/// break; the body follows.
pub fn compose_document(config: &ConversionConfig, cover_html: Option<&str>, body_html: &str) -> String {
    let mut html = String::with_capacity(body_html.len() + 8 * 1024);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(&config.title)));
    html.push_str("  <style>");
    html.push_str(&stylesheet(&config.page_size, &config.page_margin));
    html.push_str("  </style>\n");
    if let Some(ref css) = config.extra_stylesheet {
        html.push_str("  <style>\n");
        html.push_str(css);
        html.push_str("\n  </style>\n");
    }
    html.push_str("</head>\n<body>\n");

    if let Some(cover) = cover_html {
        html.push_str(&format!(
            "<section class=\"cover-section\">\n<h1 id=\"cover\">{}</h1>\n<div class=\"cover-content\">\n",
            escape_html(&config.cover_label)
        ));
        html.push_str(cover);
        html.push_str("</div>\n</section>\n");
        html.push_str(PAGE_BREAK);
        html.push('\n');
    }

    html.push_str(body_html);
    html.push_str("</body>\n</html>\n");
    html
}

/// Write the styled document into the working directory.
pub async fn write_document(work_dir: &WorkDir, html: &str) -> Result<PathBuf, Md2PdfError> {
    let path = work_dir.html_path();
    tokio::fs::write(&path, html)
        .await
        .map_err(|source| Md2PdfError::WriteFailed {
            path: path.clone(),
            source,
        })?;
    info!("HTML created: {}", path.display());
    Ok(path)
}

/// Run the export engine on `html` and place the PDF at `output`.
///
/// `output` is left untouched on any failure.
pub async fn export_pdf(
    prince: &Path,
    html: &Path,
    work_dir: &Path,
    output: &Path,
) -> Result<(), Md2PdfError> {
    let staging = work_dir.join(STAGING_FILE_NAME);
    info!("Converting to PDF with {}", prince.display());

    let run = tokio::process::Command::new(prince)
        .arg(html)
        .arg("-o")
        .arg(&staging)
        .output()
        .await
        .map_err(|e| Md2PdfError::ExportEngineNotFound {
            binary: prince.to_path_buf(),
            detail: e.to_string(),
            work_dir: work_dir.to_path_buf(),
        })?;

    let stderr = String::from_utf8_lossy(&run.stderr);
    if !run.status.success() {
        let message = match stderr.trim() {
            "" => format!("{} exited with {}", prince.display(), run.status),
            text => text.to_string(),
        };
        return Err(Md2PdfError::ExportFailed {
            message,
            work_dir: work_dir.to_path_buf(),
        });
    }
    for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
        warn!("prince: {line}");
    }

    if !staging.is_file() {
        return Err(Md2PdfError::ExportFailed {
            message: format!("{} reported success but wrote no PDF", prince.display()),
            work_dir: work_dir.to_path_buf(),
        });
    }

    place_output(&staging, output)
        .await
        .map_err(|source| Md2PdfError::OutputWriteFailed {
            path: output.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            source,
        })?;
    info!("PDF created: {}", output.display());
    Ok(())
}

/// Move the staging PDF into place, copying when a rename is not possible
/// (e.g. across file systems).
///
/// The copy goes to a temporary sibling of `output` that is renamed over it
/// once complete, so a failed copy never leaves a truncated PDF behind.
async fn place_output(staging: &Path, output: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(staging, output).await {
        Ok(()) => return Ok(()),
        Err(e) => debug!("rename into place failed ({e}), copying instead"),
    }

    let staging = staging.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || copy_into_place(&staging, &output))
        .await
        .map_err(std::io::Error::other)?
}

fn copy_into_place(staging: &Path, output: &Path) -> std::io::Result<()> {
    let mut source = std::fs::File::open(staging)?;
    let mut partial = tempfile::Builder::new()
        .prefix(".md2pdf-out-")
        .suffix(".pdf")
        .tempfile_in(default_work_parent(output))?;
    std::io::copy(&mut source, partial.as_file_mut())?;
    partial.as_file().sync_all()?;
    partial.persist(output).map_err(|e| e.error)?;
    Ok(())
}

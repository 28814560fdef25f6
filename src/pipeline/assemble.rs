//! Document assembly: read every input and join them into one Markdown body.
//!
//! Documents are separated by a raw HTML page-break marker that the
//! stylesheet turns into `page-break-before: always`. The cover is kept in
//! its own field rather than spliced into the body between sentinel lines,
//! so no authored text can ever be mistaken for the cover boundary.

use crate::error::Md2PdfError;
use crate::pipeline::input::InputSet;
use std::path::Path;
use tracing::{debug, info};

/// Raw HTML block inserted between consecutive documents.
pub const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

/// The merged Markdown, cover and body kept apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledText {
    pub cover: Option<String>,
    pub body: String,
}

/// Read the cover (if any) and every document, in input-set order.
pub async fn read_inputs(inputs: &InputSet) -> Result<AssembledText, Md2PdfError> {
    let cover = match inputs.cover() {
        Some(path) => {
            info!("Processing cover page: {}", path.display());
            Some(read_document(path).await?)
        }
        None => None,
    };

    let mut documents = Vec::with_capacity(inputs.documents().len());
    for path in inputs.documents() {
        documents.push(read_document(path).await?);
    }

    info!(
        "Merged {} file(s){}",
        documents.len(),
        if cover.is_some() { " + cover" } else { "" }
    );

    Ok(AssembledText {
        cover,
        body: join_documents(&documents),
    })
}

/// Join documents with [`PAGE_BREAK`] between each pair, none after the last.
pub fn join_documents<S: AsRef<str>>(documents: &[S]) -> String {
    let separator = format!("\n\n{PAGE_BREAK}\n\n");
    documents
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&separator)
}

async fn read_document(path: &Path) -> Result<String, Md2PdfError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Md2PdfError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Md2PdfError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Md2PdfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
    debug!("Read {} ({} bytes)", path.display(), raw.len());
    Ok(normalise(&raw))
}

/// Strip a leading BOM and normalise line endings to LF.
///
/// Fence detection works line by line on `\n`; a Windows-edited chapter
/// would otherwise hide its diagrams behind `\r`.
pub fn normalise(input: &str) -> String {
    let s = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    s.replace("\r\n", "\n").replace('\r', "\n")
}

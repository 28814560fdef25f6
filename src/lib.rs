//! # edgequake-md2pdf
//!
//! Merge Markdown documents into one bookmarked PDF, with Mermaid diagrams
//! rendered to images.
//!
//! ## Why this crate?
//!
//! Markdown-to-PDF tools either drop Mermaid blocks on the floor or print
//! them as code. This crate renders each diagram in headless Chromium the
//! way a browser-based Markdown preview would, then lets PrinceXML paginate
//! the result so every heading becomes a clickable PDF bookmark.
//!
//! ## Pipeline Overview
//!
//! ```text
//! *.md (+ cover.md)
//!  │
//!  ├─ 1. Input      natural sort, every path checked up front
//!  ├─ 2. Assemble   join documents with page breaks, cover kept apart
//!  ├─ 3. Extract    one pulldown-cmark parse, ```mermaid blocks → typed diagram slots
//!  ├─ 4. Markup     heading ids for bookmarks, cover vs body line breaks
//!  ├─ 5. Rasterize  headless Chromium → mermaid-N.png
//!  ├─ 6. Reinsert   slots → <img> (or a visible %%MERMAID_N%% token), events → HTML
//!  └─ 7. Export     styled HTML → PrinceXML → PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{convert, ConversionConfig, InputSet};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inputs = InputSet::new(
//!         vec![PathBuf::from("ch1.md"), PathBuf::from("ch2.md")],
//!         Some(PathBuf::from("cover.md")),
//!     )?;
//!     let config = ConversionConfig::builder().title("Handbook").build()?;
//!     let output = convert(&inputs, "handbook.pdf", &config).await?;
//!     eprintln!(
//!         "{} of {} diagrams rendered",
//!         output.stats.diagrams_rendered, output.stats.diagrams_found
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Tool | Needed for | Override |
//! |------|------------|----------|
//! | Chrome / Chromium | diagrams only | `ConversionConfig::chrome_executable` |
//! | PrinceXML | every run | `ConversionConfig::prince_binary` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, convert_with_rasterizer, prepare, PreparedDocument};
pub use error::{DiagramError, Md2PdfError};
pub use output::{ConversionOutput, ConversionStats, DiagramResult};
pub use pipeline::input::InputSet;
pub use pipeline::rasterize::{BrowserRasterizer, DiagramRasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};

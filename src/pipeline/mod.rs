//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step so each is
//! independently testable, and the two external systems (the browser and
//! the export engine) stay behind the last two.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ assemble ──▶ extract ──▶ markup ──▶ rasterize ──▶ extract::reinsert ──▶ export
//! (paths)   (text)       (segments)  (segments) (PNG files)   (body HTML)           (PDF)
//! ```
//!
//! 1. [`input`]:     split positional arguments, sort, check every file exists
//! 2. [`assemble`]:  read and join documents with page breaks, cover kept apart
//! 3. [`extract`]:   parse once, lift ```` ```mermaid ```` blocks out into typed segments
//! 4. [`markup`]:    heading ids and line breaks, cover vs body passes
//! 5. [`rasterize`]: headless Chromium renders each diagram to a PNG
//! 6. [`export`]:    stylesheet + body → working file → PrinceXML → PDF

pub mod assemble;
pub mod export;
pub mod extract;
pub mod input;
pub mod markup;
pub mod rasterize;

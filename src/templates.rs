//! HTML and CSS templates used by the pipeline.
//!
//! Keeping every template here means the look of the PDF and of the
//! diagram host page can be changed in exactly one place, and unit tests
//! can inspect the text directly without launching a browser or the export
//! engine.
//!
//! Users extend the layout through
//! [`crate::config::ConversionConfig::extra_stylesheet`], which is appended
//! after [`DOCUMENT_STYLES`] so its rules win on equal specificity.

use crate::pipeline::markup::escape_html;

/// Outline rules read by the export engine.
///
/// Body headings h1–h4 map to outline levels 1–4. Cover headings carry
/// `no-bookmark`; the synthetic `h1#cover` is the only cover entry.
pub const BOOKMARK_STYLES: &str = r#"
    h1 { prince-bookmark-level: 1; }
    h2 { prince-bookmark-level: 2; }
    h3 { prince-bookmark-level: 3; }
    h4 { prince-bookmark-level: 4; }

    h1.no-bookmark, h2.no-bookmark, h3.no-bookmark, h4.no-bookmark,
    h5.no-bookmark, h6.no-bookmark {
      prince-bookmark-level: none;
    }

    .cover-section h1#cover {
      position: absolute;
      left: -9999px;
      prince-bookmark-level: 1;
    }
"#;

/// Layout classes for hand-written HTML cover pages.
///
/// A cover document may be raw HTML built from these classes (a centred
/// `.cover-page` with header, highlight box, phase strip, detail table,
/// domain grid and footer).
pub const COVER_PAGE_STYLES: &str = r#"
    .cover-page {
      display: flex;
      flex-direction: column;
      justify-content: center;
      align-items: center;
      text-align: center;
      height: 95vh;
      font-family: "PingFang SC", "Hiragino Sans GB", "Microsoft YaHei", sans-serif;
    }
    .cover-header h1 {
      font-size: 2.8em;
      color: #2c3e50;
      border-bottom: none;
      margin-bottom: 10px;
    }
    .cover-header .subtitle {
      font-size: 1.5em;
      color: #7f8c8d;
      margin-top: 0;
      margin-bottom: 40px;
    }
    .cover-methodology {
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      border-radius: 12px;
      padding: 25px 35px;
      margin-bottom: 40px;
      width: 85%;
      box-shadow: 0 4px 15px rgba(102, 126, 234, 0.3);
    }
    .methodology-text {
      font-size: 1.15em;
      color: #ffffff;
      line-height: 1.8;
      margin: 0;
      text-align: left;
    }
    .methodology-text strong { color: #ffd700; font-weight: 700; }
    .nist-phases {
      display: flex;
      justify-content: center;
      align-items: center;
      margin-bottom: 40px;
      width: 90%;
      gap: 8px;
    }
    .phase-card {
      background: #f8f9fa;
      border: 1px solid #dee2e6;
      border-radius: 6px;
      padding: 10px 16px;
      font-size: 0.95em;
      color: #495057;
      font-weight: 500;
      box-shadow: 0 2px 4px rgba(0,0,0,0.05);
      white-space: nowrap;
      flex-shrink: 0;
    }
    .phase-arrow { font-size: 1.4em; color: #adb5bd; font-weight: normal; flex-shrink: 0; }
    .cover-details {
      background: #f8f9fa;
      border: 1px solid #dee2e6;
      border-radius: 8px;
      padding: 20px;
      margin-bottom: 40px;
      width: 80%;
    }
    .detail-item {
      display: flex;
      justify-content: space-between;
      padding: 8px 0;
      border-bottom: 1px solid #e9ecef;
    }
    .detail-item:last-child { border-bottom: none; }
    .detail-item strong { color: #495057; }
    .detail-item span { color: #212529; }
    .security-domains-grid {
      display: grid;
      grid-template-columns: repeat(4, 1fr);
      gap: 15px;
      width: 90%;
      margin-bottom: 50px;
    }
    .domain-card {
      background: #ffffff;
      border: 1px solid #dee2e6;
      border-radius: 8px;
      padding: 20px;
      font-size: 1.1em;
      color: #34495e;
      box-shadow: 0 2px 4px rgba(0,0,0,0.05);
    }
    .cover-footer { position: absolute; bottom: 60px; font-size: 0.9em; color: #95a5a6; }
    .confidential-warning {
      position: absolute;
      bottom: 20px;
      font-size: 1em;
      color: #c0392b;
      font-weight: bold;
    }
"#;

/// Typography, cover and diagram container rules.
pub const DOCUMENT_STYLES: &str = r#"
    .cover-content h1,
    .cover-content h2 {
      border-bottom: none;
      padding-bottom: 0;
    }

    .cover-content hr {
      border: none;
      border-top: 1px solid #e0e0e0;
      margin: 15px 0;
      opacity: 0.5;
    }

    .page-break { page-break-before: always; }

    body {
      font-family: "PingFang SC", "Hiragino Sans GB", "Microsoft YaHei", Arial, sans-serif;
      color: #333;
      font-size: 12pt;
      line-height: 1.6;
    }

    h1, h2, h3, h4 {
      font-weight: 600;
      margin: 24px 0 16px 0;
      page-break-after: avoid;
    }
    h1 { font-size: 2em; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
    h2 { font-size: 1.5em; border-bottom: 1px solid #ddd; padding-bottom: 8px; }
    h3 { font-size: 1.25em; }
    h4 { font-size: 1.1em; }

    p { margin: 10px 0; }
    ul, ol { margin: 10px 0; padding-left: 2em; }
    li { margin: 4px 0; }

    code { background: #f5f5f5; padding: 2px 6px; border-radius: 3px; font-size: 0.9em; }
    pre { background: #f6f8fa; padding: 16px; border-radius: 6px; margin: 16px 0; page-break-inside: avoid; }
    pre code { background: transparent; padding: 0; }

    .mermaid-diagram {
      margin: 20px 0;
      padding: 20px;
      background: #fff;
      border: 1px solid #ddd;
      border-radius: 6px;
      text-align: center;
      page-break-inside: avoid;
    }
    .mermaid-diagram img {
      max-width: 100%;
      height: auto;
    }
    .mermaid-unresolved {
      font-family: monospace;
      color: #c0392b;
    }

    blockquote { border-left: 4px solid #3498db; padding-left: 16px; margin: 16px 0; color: #666; }
    hr { border: none; border-top: 2px solid #ddd; margin: 20px 0; }
    table { width: 100%; border-collapse: collapse; margin: 16px 0; page-break-inside: avoid; }
    th, td { border: 1px solid #ddd; padding: 8px; }
    th { background: #f5f5f5; font-weight: 600; }
    tr:nth-child(even) { background: #fafafa; }
    a { color: #3498db; text-decoration: none; }
    strong { font-weight: 600; }
"#;

/// Full built-in stylesheet for the given page geometry.
pub fn stylesheet(page_size: &str, page_margin: &str) -> String {
    format!("\n    @page {{ size: {page_size}; margin: {page_margin}; }}\n{BOOKMARK_STYLES}{COVER_PAGE_STYLES}{DOCUMENT_STYLES}")
}

/// Standalone page that renders one diagram with Mermaid.
///
/// The source is HTML-escaped; Mermaid decodes entities before parsing, so
/// `A-->B` and `<br>` labels survive unchanged.
pub fn diagram_host_page(source: &str, mermaid_url: &str, theme: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <script src="{url}"></script>
  <style>
    body {{ margin: 0; padding: 20px; background: white; }}
    .mermaid {{ text-align: center; }}
  </style>
</head>
<body>
  <div class="mermaid">{source}</div>
  <script>
    mermaid.initialize({{
      startOnLoad: true,
      theme: '{theme}',
      fontFamily: 'Arial, sans-serif',
      flowchart: {{ useMaxWidth: false, htmlLabels: true }}
    }});
  </script>
</body>
</html>"#,
        url = escape_html(mermaid_url),
        source = escape_html(source),
        theme = theme.replace(['\'', '\\', '<'], ""),
    )
}

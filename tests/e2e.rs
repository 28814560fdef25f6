//! End-to-end integration tests for edgequake-md2pdf.
//!
//! Most tests run the whole pipeline with two stand-ins: a rasterizer that
//! writes real PNGs with the `image` crate, and (on Unix) a shell script in
//! place of PrinceXML that copies the styled HTML to the output path. The
//! "PDF" they produce is therefore the exact document Prince would have
//! received, which is what the assertions inspect.
//!
//! `test_live_*` tests need Chromium and PrinceXML and are gated behind the
//! `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Live tests:
//!   E2E_ENABLED=1 cargo test --test e2e test_live -- --nocapture

use edgequake_md2pdf::pipeline::assemble::PAGE_BREAK;
use edgequake_md2pdf::pipeline::extract::DiagramSource;
use edgequake_md2pdf::{
    convert, convert_with_rasterizer, BrowserRasterizer, ConversionConfig, DiagramError,
    DiagramRasterizer, InputSet, Md2PdfError,
};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Writes a small PNG per diagram, failing the listed indices with a timeout.
struct FakeRasterizer {
    fail: Vec<usize>,
}

impl FakeRasterizer {
    fn ok() -> Self {
        Self { fail: Vec::new() }
    }
}

impl DiagramRasterizer for FakeRasterizer {
    async fn rasterize(&self, diagram: &DiagramSource, target: &Path) -> Result<(), DiagramError> {
        if self.fail.contains(&diagram.index) {
            return Err(DiagramError::Timeout {
                index: diagram.index,
                secs: 10,
            });
        }
        RgbaImage::from_pixel(64, 32, Rgba([30, 144, 255, 255]))
            .save(target)
            .map_err(|e| DiagramError::RenderFailed {
                index: diagram.index,
                detail: e.to_string(),
            })
    }
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[cfg(unix)]
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = write(dir, name, body);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stand-in for `prince <html> -o <pdf>` that copies the HTML through.
#[cfg(unix)]
fn copying_prince(dir: &Path) -> PathBuf {
    script(dir, "fake-prince.sh", "#!/bin/sh\ncp \"$1\" \"$3\"\n")
}

#[cfg(unix)]
fn failing_prince(dir: &Path) -> PathBuf {
    script(
        dir,
        "broken-prince.sh",
        "#!/bin/sh\necho 'prince: error: could not load font' >&2\nexit 1\n",
    )
}

fn config_for(dir: &Path, prince: &Path) -> ConversionConfig {
    ConversionConfig::builder()
        .prince_binary(prince)
        .work_dir_parent(dir)
        .diagram_settle_ms(0)
        .build()
        .unwrap()
}

/// `.md2pdf-*` directories currently inside `parent`.
fn work_dirs(parent: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(parent)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(".md2pdf-"))
        })
        .collect()
}

fn diagrams_md(n: usize) -> String {
    (0..n)
        .map(|i| format!("## Step {i}\n\n```mermaid\ngraph TD; S{i}-->E{i}\n```\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Full pipeline with stand-ins ─────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn test_all_diagrams_rendered_leaves_no_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "flow.md", &format!("# Flows\n\n{}", diagrams_md(3)));
    let output = dir.path().join("flow.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(!html.contains("%%MERMAID_"), "leftover placeholder");
    assert!(!html.contains("```mermaid"));
    for i in 0..3 {
        assert!(html.contains(&format!(r#"<img src="mermaid-{i}.png" alt="Mermaid Diagram {}" />"#, i + 1)));
    }

    assert_eq!(result.stats.diagrams_found, 3);
    assert_eq!(result.stats.diagrams_rendered, 3);
    assert_eq!(result.stats.diagrams_failed, 0);
    assert!(result.diagrams.iter().all(|d| d.width == 64 && d.height == 32));
    assert_eq!(result.output_path, output);
}

#[cfg(unix)]
#[tokio::test]
async fn test_diagrams_in_lists_and_quotes_are_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let md = "1. Plan\n   - Detail\n\n     ```mermaid\n     graph TD; A-->B\n     ```\n\n\
> ```mermaid\n> pie\n> ```\n\nSee [the docs].\n\n[the docs]: https://example.com\n";
    let doc = write(dir.path(), "nested.md", md);
    let output = dir.path().join("nested.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    assert_eq!(result.stats.diagrams_found, 2);
    assert_eq!(result.stats.diagrams_rendered, 2);

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(!html.contains("language-mermaid"), "{html}");
    assert!(!html.contains("%%MERMAID_"));
    assert!(html.contains(r#"<a href="https://example.com">the docs</a>"#));
}

#[cfg(unix)]
#[tokio::test]
async fn test_one_failed_diagram_keeps_exactly_its_token() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "flow.md", &diagrams_md(3));
    let output = dir.path().join("out.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer { fail: vec![1] })
        .await
        .unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert_eq!(html.matches("%%MERMAID_").count(), 1);
    assert!(html.contains("%%MERMAID_1%%"));
    assert!(html.contains("mermaid-0.png"));
    assert!(html.contains("mermaid-2.png"));

    assert_eq!(result.stats.diagrams_failed, 1);
    assert!(matches!(
        result.diagrams[1].error,
        Some(DiagramError::Timeout { index: 1, .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_documents_merge_in_natural_order_with_page_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![
        write(dir.path(), "a10.md", "# Ten\n"),
        write(dir.path(), "a2.md", "# Two\n"),
        write(dir.path(), "a1.md", "# One\n"),
    ];
    let output = dir.path().join("book.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(docs, None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert_eq!(html.matches(PAGE_BREAK).count(), 2);
    let one = html.find(r#"id="one""#).unwrap();
    let two = html.find(r#"id="two""#).unwrap();
    let ten = html.find(r#"id="ten""#).unwrap();
    assert!(one < two && two < ten);
    assert_eq!(result.stats.documents, 3);
    assert!(!result.stats.has_cover);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cover_yields_single_bookmark_before_body() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write(
        dir.path(),
        "cover.md",
        "# Security Review\n\n## Prepared for ACME\n\n```mermaid\ngraph LR; A-->B\n```\n",
    );
    let doc = write(dir.path(), "body.md", "# Findings\n\n## Summary\n\n```mermaid\ngraph LR; C-->D\n```\n");
    let output = dir.path().join("report.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], Some(cover)).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    let html = std::fs::read_to_string(&output).unwrap();

    // One synthetic cover heading; every authored cover heading is excluded.
    assert_eq!(html.matches(r#"<h1 id="cover">Cover</h1>"#).count(), 1);
    assert!(html.contains(r#"<h1 id="security-review" class="no-bookmark">"#));
    assert!(html.contains(r#"<h2 id="prepared-for-acme" class="no-bookmark">"#));
    assert!(html.contains(r#"<h1 id="findings">Findings</h1>"#));
    assert!(html.contains(r#"<h2 id="summary">Summary</h2>"#));

    // Cover, then a page break, then the body.
    let cover_at = html.find(r#"id="cover""#).unwrap();
    let break_at = html.find(PAGE_BREAK).unwrap();
    let body_at = html.find(r#"id="findings""#).unwrap();
    assert!(cover_at < break_at && break_at < body_at);

    // Cover diagrams come first.
    assert!(html.find("mermaid-0.png").unwrap() < break_at);
    assert!(html.find("mermaid-1.png").unwrap() > break_at);
    assert!(result.stats.has_cover);
}

#[cfg(unix)]
#[tokio::test]
async fn test_success_removes_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "a.md", &diagrams_md(1));
    let output = dir.path().join("a.pdf");
    let config = config_for(dir.path(), &copying_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    assert!(result.work_dir.is_none());
    assert!(work_dirs(dir.path()).is_empty());
    assert!(output.is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_keep_work_dir_preserves_intermediate_files() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "a.md", &diagrams_md(2));
    let output = dir.path().join("a.pdf");
    let config = ConversionConfig::builder()
        .prince_binary(copying_prince(dir.path()))
        .work_dir_parent(dir.path())
        .keep_work_dir(true)
        .build()
        .unwrap();

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let result = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap();

    let kept = result.work_dir.expect("work dir kept");
    assert!(kept.join("output.html").is_file());
    assert!(kept.join("mermaid-0.png").is_file());
    assert!(kept.join("mermaid-1.png").is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_export_failure_keeps_work_dir_and_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "a.md", &diagrams_md(1));
    let output = dir.path().join("a.pdf");
    let config = config_for(dir.path(), &failing_prince(dir.path()));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let err = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap_err();

    match err {
        Md2PdfError::ExportFailed { message, work_dir } => {
            assert!(message.contains("could not load font"), "{message}");
            assert!(work_dir.join("output.html").is_file());
            assert!(work_dir.join("mermaid-0.png").is_file());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
    assert_eq!(work_dirs(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_missing_export_engine() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "a.md", "# A\n");
    let output = dir.path().join("a.pdf");
    let config = config_for(dir.path(), Path::new("/nonexistent/prince-md2pdf-e2e"));

    let inputs = InputSet::new(vec![doc], None).unwrap();
    let err = convert_with_rasterizer(&inputs, &output, &config, &FakeRasterizer::ok())
        .await
        .unwrap_err();

    let msg = err.to_string();
    match err {
        Md2PdfError::ExportEngineNotFound { work_dir, .. } => {
            assert!(work_dir.join("output.html").is_file());
            assert!(msg.contains(&format!("{work_dir:?}")), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(msg.contains("brew install prince"));
    assert!(!output.exists());
    assert_eq!(work_dirs(dir.path()).len(), 1);
}

// ── Input failures never create a working directory ──────────────────────────

#[test]
fn test_missing_input_fails_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let present = write(dir.path(), "a.md", "# A\n");
    let err = InputSet::new(vec![present, dir.path().join("b.md")], None).unwrap_err();

    assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    assert!(work_dirs(dir.path()).is_empty());
}

#[tokio::test]
async fn test_input_removed_after_validation_creates_no_work_dir() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "a.md", "# A\n");
    let inputs = InputSet::new(vec![doc.clone()], None).unwrap();
    std::fs::remove_file(&doc).unwrap();

    let config = config_for(dir.path(), Path::new("prince"));
    let err = convert_with_rasterizer(&inputs, dir.path().join("a.pdf"), &config, &FakeRasterizer::ok())
        .await
        .unwrap_err();

    assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    assert!(work_dirs(dir.path()).is_empty());
}

// ── Live tests (Chromium + PrinceXML) ────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run live e2e tests");
            return;
        }
    }};
}

#[tokio::test]
async fn test_live_convert_with_diagrams_and_cover() {
    e2e_skip_unless_ready!();

    let dir = tempfile::tempdir().unwrap();
    let cover = write(dir.path(), "cover.md", "# Live Test\n\nGenerated by the e2e suite.\n");
    let ch1 = write(
        dir.path(),
        "ch1.md",
        "# Chapter One\n\n```mermaid\ngraph TD; Start-->Finish\n```\n",
    );
    let ch2 = write(
        dir.path(),
        "ch2.md",
        "# Chapter Two\n\n```mermaid\nsequenceDiagram\n  Alice->>Bob: Hi\n```\n",
    );
    let output = dir.path().join("live.pdf");

    let mut builder = ConversionConfig::builder().title("Live Test");
    if let Ok(prince) = std::env::var("PRINCE_BIN") {
        builder = builder.prince_binary(prince);
    }
    if let Ok(chrome) = std::env::var("CHROME") {
        builder = builder.chrome_executable(chrome);
    }
    let config = builder.build().unwrap();

    let inputs = InputSet::new(vec![ch2, ch1], Some(cover)).unwrap();
    let result = convert(&inputs, &output, &config).await.unwrap();

    println!(
        "✓ {} — {}/{} diagrams, {}ms",
        output.display(),
        result.stats.diagrams_rendered,
        result.stats.diagrams_found,
        result.stats.total_duration_ms
    );
    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(result.stats.diagrams_found, 2);
    assert!(work_dirs(dir.path()).is_empty());
}

#[tokio::test]
async fn test_live_missing_svg_is_a_timeout() {
    e2e_skip_unless_ready!();

    // Nothing listens on the discard port, so Mermaid never loads.
    let mut builder = ConversionConfig::builder()
        .mermaid_url("http://127.0.0.1:9/mermaid.min.js")
        .diagram_timeout_secs(1)
        .diagram_settle_ms(0);
    if let Ok(chrome) = std::env::var("CHROME") {
        builder = builder.chrome_executable(chrome);
    }
    let config = builder.build().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let browser = BrowserRasterizer::launch(&config).await.unwrap();
    let diagram = DiagramSource {
        index: 0,
        source: "graph TD; A-->B".into(),
    };
    let err = browser
        .rasterize(&diagram, &dir.path().join("mermaid-0.png"))
        .await
        .unwrap_err();
    browser.close().await;

    assert!(
        matches!(err, DiagramError::Timeout { index: 0, secs: 1 }),
        "unexpected error: {err}"
    );
}

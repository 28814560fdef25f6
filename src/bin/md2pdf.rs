//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_md2pdf::pipeline::input::split_output;
use edgequake_md2pdf::{
    convert, ConversionConfig, ConversionOutput, ConversionProgressCallback, InputSet,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar for diagram rendering plus one log
/// line per diagram. Diagrams may finish out of order when
/// `--diagram-concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the diagram count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading Markdown…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} diagrams  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_diagrams: usize) {
        if total_diagrams == 0 {
            self.bar.set_prefix("Exporting");
            self.bar.set_message("no diagrams");
            return;
        }
        self.activate_bar(total_diagrams);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_diagrams} Mermaid diagram(s)…"))
        ));
    }

    fn on_diagram_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(format!("diagram {}", index + 1));
    }

    fn on_diagram_complete(&self, index: usize, total: usize, file_name: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Diagram {:>3}/{:<3}  → {:<16}  {}",
            green("✓"),
            index + 1,
            total,
            file_name,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_diagram_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep the log line on one terminal row.
        let prefix = format!("Diagram {}: ", index + 1);
        let first_line = error.lines().next().unwrap_or_default();
        let first_line = first_line.strip_prefix(&prefix).unwrap_or(first_line);
        let msg = match first_line.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &first_line[..cut]),
            None => first_line.to_string(),
        };

        self.bar.println(format!(
            "  {} Diagram {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if total == 0 {
            return;
        }

        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} diagram(s) rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} diagrams rendered  ({} left as placeholders)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One document → notes.pdf
  md2pdf notes.md

  # Several chapters, explicit output (chapters are sorted naturally)
  md2pdf ch1.md ch2.md ch10.md handbook.pdf

  # Shell globs work; ch2 comes before ch10
  md2pdf chapters/*.md book.pdf

  # With a cover page (may appear anywhere on the command line)
  md2pdf --cover cover.md ch*.md report.pdf

  # Letter paper, custom CSS, keep the working directory for inspection
  md2pdf --page-size Letter --stylesheet print.css --keep-temp notes.md

  # JSON summary for scripting
  md2pdf --json --no-progress *.md out.pdf > result.json

OUTPUT NAME:
  The last argument is the output when it ends in .pdf. Otherwise a single
  input notes.md produces notes.pdf and several inputs produce output.pdf.

DIAGRAMS:
  ```mermaid blocks are rendered in headless Chrome/Chromium. A diagram that
  fails to render stays in the PDF as a visible %%MERMAID_N%% token; the
  rest of the document is still exported.

ENVIRONMENT VARIABLES:
  CHROME                  Chrome/Chromium executable (auto-detected otherwise)
  PRINCE_BIN              PrinceXML executable (default: prince)
  MD2PDF_*                Every option below has an MD2PDF_ equivalent
  RUST_LOG                Override the log filter (e.g. edgequake_md2pdf=debug)

SETUP:
  1. Install PrinceXML:   brew install prince  (or https://www.princexml.com/)
  2. Install Chrome or Chromium (only needed for Mermaid diagrams)
  3. Convert:             md2pdf notes.md
"#;

/// Merge Markdown documents into one bookmarked PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Merge Markdown documents into one bookmarked PDF with rendered Mermaid diagrams",
    long_about = "Merge one or more Markdown documents into a single PDF. Headings become \
clickable bookmarks, ```mermaid blocks are rendered to images in headless Chromium, and \
PrinceXML lays out the pages.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input Markdown files, optionally followed by the output .pdf.
    #[arg(required = true, value_name = "INPUT.md... [OUTPUT.pdf]")]
    files: Vec<PathBuf>,

    /// Markdown file rendered as a cover section before the documents.
    #[arg(long, env = "MD2PDF_COVER")]
    cover: Option<PathBuf>,

    /// Document title (HTML <title>, PDF metadata).
    #[arg(long, env = "MD2PDF_TITLE", default_value = "Document")]
    title: String,

    /// Bookmark label for the cover section.
    #[arg(long, env = "MD2PDF_COVER_LABEL", default_value = "Cover")]
    cover_label: String,

    /// CSS page size (A4, Letter, "210mm 297mm", …).
    #[arg(long, env = "MD2PDF_PAGE_SIZE", default_value = "A4")]
    page_size: String,

    /// CSS page margin.
    #[arg(long, env = "MD2PDF_MARGIN", default_value = "18mm")]
    margin: String,

    /// Extra CSS file appended after the built-in stylesheet.
    #[arg(long, env = "MD2PDF_STYLESHEET")]
    stylesheet: Option<PathBuf>,

    /// Seconds to wait for each diagram to render.
    #[arg(long, env = "MD2PDF_DIAGRAM_TIMEOUT", default_value_t = 10)]
    diagram_timeout: u64,

    /// Milliseconds to wait after a diagram appears before capturing it.
    #[arg(long, env = "MD2PDF_DIAGRAM_SETTLE_MS", default_value_t = 1000)]
    diagram_settle_ms: u64,

    /// Diagrams rendered at the same time (browser pages in flight).
    #[arg(long, env = "MD2PDF_DIAGRAM_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..=32))]
    diagram_concurrency: u16,

    /// Mermaid script URL loaded by the diagram page.
    #[arg(long, env = "MD2PDF_MERMAID_URL")]
    mermaid_url: Option<String>,

    /// Mermaid theme: default, neutral, dark, forest, base.
    #[arg(long, env = "MD2PDF_MERMAID_THEME", default_value = "default")]
    mermaid_theme: String,

    /// Chrome/Chromium executable.
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// PrinceXML executable.
    #[arg(long, env = "PRINCE_BIN", default_value = "prince")]
    prince: PathBuf,

    /// Keep the working directory (styled HTML + PNGs) after success.
    #[arg(long, env = "MD2PDF_KEEP_TEMP")]
    keep_temp: bool,

    /// Print a JSON summary (ConversionOutput) on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors exit 1 like every other failure; --help/--version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve inputs ───────────────────────────────────────────────────
    let (documents, output_path) = split_output(cli.files.clone())?;
    let inputs = InputSet::new(documents, cli.cover.clone())?;

    if !cli.quiet && !cli.json {
        print_banner(&inputs, &output_path);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&inputs, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, show_progress);
    }

    Ok(())
}

fn print_banner(inputs: &InputSet, output: &std::path::Path) {
    if let Some(cover) = inputs.cover() {
        eprintln!("{} {}", cyan("◆"), bold(&format!("Cover: {}", cover.display())));
    }
    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!("Merging {} file(s):", inputs.documents().len()))
    );
    for (i, path) in inputs.documents().iter().enumerate() {
        eprintln!("  {}. {}", i + 1, path.display());
    }
    eprintln!("  {} {}", dim("→"), output.display());
}

fn print_summary(output: &ConversionOutput, show_progress: bool) {
    let stats = &output.stats;

    // The callback already printed the diagram tally when the bar was on.
    if !show_progress && stats.diagrams_found > 0 {
        eprintln!(
            "Rendered {}/{} diagrams",
            stats.diagrams_rendered, stats.diagrams_found
        );
    }

    eprintln!(
        "{}  PDF created  {}ms  →  {}",
        if stats.diagrams_failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.total_duration_ms,
        bold(&output.output_path.display().to_string()),
    );
    if let Some(ref dir) = output.work_dir {
        eprintln!("   {} {}", dim("working files kept in"), dir.display());
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .title(&cli.title)
        .cover_label(&cli.cover_label)
        .page_size(&cli.page_size)
        .page_margin(&cli.margin)
        .diagram_timeout_secs(cli.diagram_timeout)
        .diagram_settle_ms(cli.diagram_settle_ms)
        .diagram_concurrency(cli.diagram_concurrency as usize)
        .mermaid_theme(&cli.mermaid_theme)
        .prince_binary(&cli.prince)
        .keep_work_dir(cli.keep_temp);

    if let Some(ref path) = cli.stylesheet {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stylesheet from {:?}", path))?;
        builder = builder.extra_stylesheet(css);
    }
    if let Some(ref url) = cli.mermaid_url {
        builder = builder.mermaid_url(url);
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

//! Input resolution: positional arguments → ordered, validated input set.
//!
//! Every path is checked before any document is read or any working
//! directory is created, so a typo in the tenth file name fails the run
//! immediately instead of after the browser has rendered nine documents'
//! worth of diagrams.

use crate::error::Md2PdfError;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output file name used when several inputs are given without one.
pub const DEFAULT_OUTPUT: &str = "output.pdf";

/// Ordered Markdown documents plus an optional cover.
///
/// Only constructed through [`InputSet::new`], so holding one means every
/// path existed and was readable at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSet {
    documents: Vec<PathBuf>,
    cover: Option<PathBuf>,
}

impl InputSet {
    /// Sort `documents` in natural order and validate every path.
    ///
    /// Fails on the first missing document (in sorted order), then on a
    /// missing cover.
    pub fn new(mut documents: Vec<PathBuf>, cover: Option<PathBuf>) -> Result<Self, Md2PdfError> {
        if documents.is_empty() {
            return Err(Md2PdfError::NoInputFiles);
        }

        documents.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

        for path in &documents {
            check_readable(path).map_err(|e| match e {
                Unreadable::Missing => Md2PdfError::FileNotFound { path: path.clone() },
                Unreadable::Denied => Md2PdfError::PermissionDenied { path: path.clone() },
            })?;
        }

        if let Some(ref path) = cover {
            check_readable(path).map_err(|e| match e {
                Unreadable::Missing => Md2PdfError::CoverNotFound { path: path.clone() },
                Unreadable::Denied => Md2PdfError::PermissionDenied { path: path.clone() },
            })?;
        }

        debug!(
            "Resolved {} input(s){}",
            documents.len(),
            if cover.is_some() { " + cover" } else { "" }
        );
        Ok(Self { documents, cover })
    }

    pub fn documents(&self) -> &[PathBuf] {
        &self.documents
    }

    pub fn cover(&self) -> Option<&Path> {
        self.cover.as_deref()
    }
}

/// Split positional arguments into input documents and the output path.
///
/// The last argument is the output when it ends in `.pdf` and at least one
/// other argument remains. Otherwise a single input `notes.md` produces
/// `notes.pdf` and several inputs produce [`DEFAULT_OUTPUT`].
pub fn split_output(mut args: Vec<PathBuf>) -> Result<(Vec<PathBuf>, PathBuf), Md2PdfError> {
    if args.is_empty() {
        return Err(Md2PdfError::NoInputFiles);
    }

    if args.len() > 1 && args.last().is_some_and(|p| is_pdf(p)) {
        let output = args.pop().ok_or(Md2PdfError::NoInputFiles)?;
        return Ok((args, output));
    }

    let output = if args.len() == 1 {
        args[0].with_extension("pdf")
    } else {
        PathBuf::from(DEFAULT_OUTPUT)
    };
    Ok((args, output))
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

enum Unreadable {
    Missing,
    Denied,
}

fn check_readable(path: &Path) -> Result<(), Unreadable> {
    if !path.exists() {
        return Err(Unreadable::Missing);
    }
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(Unreadable::Denied),
        Err(_) => Err(Unreadable::Missing),
    }
}

/// Compare two file names the way a person would order them.
///
/// Runs of ASCII digits compare by numeric value (`file2` < `file10`),
/// everything else compares case-insensitively. Names that are equal under
/// those rules fall back to a plain byte comparison so the order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = split_chunks(a);
    let right = split_chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (is_digits(x), is_digits(y)) {
            (true, true) => cmp_numeric(x, y),
            _ => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

fn split_chunks(s: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) {
            chunks.push(&s[start..i]);
            start = i;
        }
        prev_digit = Some(digit);
    }
    if start < s.len() {
        chunks.push(&s[start..]);
    }
    chunks
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Compare digit runs of any length without parsing into a fixed-width int.
fn cmp_numeric(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

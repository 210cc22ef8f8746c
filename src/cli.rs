use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::inspect::{InspectOptions, Inspection, inspect};
use crate::png::{DecodeOptions, LineFeedClass, SignatureOptions, TruncationPolicy, VerifyOptions};

#[derive(Parser, Debug)]
#[command(name = "pngverify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check PNG files for newline transcoding damage, truncated chunks and CRC mismatches", long_about = None)]
pub struct Cli {
    /// Files or directories to check
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,

    /// Also verify chunks at and after IEND
    #[arg(long)]
    pub verify_terminal: bool,

    /// Bytes counted as line feeds while reading the signature
    #[arg(long, value_enum, default_value_t = LfClassArg::Lf)]
    pub lf_class: LfClassArg,

    /// Line feeds that end the signature
    #[arg(long, default_value = "2")]
    pub min_line_feeds: usize,

    /// Most bytes read while looking for the end of the signature
    #[arg(long, default_value = "32")]
    pub max_signature_len: usize,

    /// Keep a chunk cut short by end of file instead of failing the decode
    #[arg(long)]
    pub keep_truncated: bool,

    /// Verify chunks on the rayon thread pool
    #[arg(long)]
    pub parallel: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LfClassArg {
    Lf,
    LfSub,
}

impl From<LfClassArg> for LineFeedClass {
    fn from(arg: LfClassArg) -> Self {
        match arg {
            LfClassArg::Lf => LineFeedClass::Lf,
            LfClassArg::LfSub => LineFeedClass::LfAndSub,
        }
    }
}

impl Cli {
    pub fn inspect_options(&self) -> InspectOptions {
        let signature = SignatureOptions::new()
            .with_line_feed_class(self.lf_class.into())
            .with_min_line_feeds(self.min_line_feeds)
            .with_max_len(self.max_signature_len);

        let truncation = if self.keep_truncated {
            TruncationPolicy::Keep
        } else {
            TruncationPolicy::Reject
        };

        InspectOptions::new()
            .with_decode(
                DecodeOptions::new()
                    .with_signature(signature)
                    .with_truncation(truncation),
            )
            .with_verify(
                VerifyOptions::new()
                    .stop_at_terminal(!self.verify_terminal)
                    .parallel(self.parallel),
            )
    }
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub inspection: Inspection,
}

impl FileReport {
    pub fn is_clean(&self) -> bool {
        self.inspection.is_clean()
    }

    /// Text lines in the order the checks ran.
    pub fn render_text(&self) -> Vec<String> {
        let path = self.path.display();
        let inspection = &self.inspection;
        let mut lines = Vec::new();

        if let Some(Err(e)) = &inspection.signature_result {
            lines.push(format!("{path}: {e}"));
        }

        for chunk in &inspection.chunks {
            match &chunk.result {
                Ok(()) => lines.push(format!("{path}: Chunk {} is OK!", chunk.tag)),
                Err(e) => lines.push(format!(
                    "{path}: Chunk {} has an error! Chunk CRC: {:x}, Data CRC: {:x} Error {e}",
                    chunk.tag, chunk.stored_crc, chunk.computed_crc
                )),
            }
        }

        if let Some(e) = &inspection.decode_error {
            lines.push(format!("{path}: {e}"));
        }

        lines
    }
}

/// Expands directories into the `.png` files they hold, sorted by path.
/// Explicitly named files are kept whatever their extension.
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let meta = fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
        if meta.is_dir() {
            walk_dir(path, recursive, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }

    Ok(files)
}

fn walk_dir(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                walk_dir(&path, recursive, out)?;
            }
        } else if has_png_extension(&path) {
            out.push(path);
        } else {
            tracing::trace!(path = %path.display(), "skipping non-png file");
        }
    }

    Ok(())
}

pub fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

pub fn check_file(path: &Path, options: &InspectOptions) -> Result<FileReport> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let inspection = inspect(file, options);

    if inspection.is_clean() {
        tracing::info!(path = %path.display(), chunks = inspection.chunk_count, "file is clean");
    } else {
        tracing::info!(
            path = %path.display(),
            chunks = inspection.chunk_count,
            kinds = ?inspection.error_kinds(),
            "file has structural damage"
        );
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        inspection,
    })
}

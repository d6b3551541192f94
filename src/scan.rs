//! Source tree scanning.
//!
//! Walks a source root and feeds every file to [`Context::parse_file`]. The
//! directory layout becomes the collection hierarchy:
//!
//! ```text
//! content/                      # Source root (context name "site")
//! ├── hyde.toml                 # Configuration (optional, never parsed)
//! ├── about.md                  # → item site/about
//! ├── posts/                    # → collection site/posts (placeholder)
//! │   └── 2024/
//! │       └── hello-world.md    # → item site/posts/2024/hello-world
//! ├── posts.md                  # → merged into collection site/posts
//! └── images/cover.jpg          # skipped (extension not permitted)
//! ```
//!
//! Entries are visited depth-first in file-name order, so a directory is
//! always walked before a sibling file with the same stem (`posts/` sorts
//! before `posts.md`). Hidden files and directories are ignored.

use crate::config::{self, CONFIG_FILENAME, HydeConfig};
use crate::context::Context;
use crate::model::{ModelError, ModelRef};
use crate::parser::{FileOptions, ParseError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Record files that fail to parse instead of aborting the scan.
    pub keep_going: bool,
}

/// A file that produced an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub model: ModelRef,
}

/// A file that failed to parse while `keep_going` was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// What happened to every file under the source root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub parsed: Vec<ParsedFile>,
    /// Files whose extension the parse mode does not permit.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Scan `root` with the configuration found there.
pub fn scan(root: &Path) -> Result<(Context, ScanReport), ScanError> {
    let config = config::load_config(root)?;
    scan_with(root, &config, &ScanOptions::default())
}

/// Scan `root` with an already loaded configuration.
pub fn scan_with(
    root: &Path,
    config: &HydeConfig,
    options: &ScanOptions,
) -> Result<(Context, ScanReport), ScanError> {
    let mut ctx = Context::from_config(config)?;
    let report = scan_into(&mut ctx, root, options)?;
    Ok((ctx, report))
}

/// Scan `root` into an existing context.
pub fn scan_into(
    ctx: &mut Context,
    root: &Path,
    options: &ScanOptions,
) -> Result<ScanReport, ScanError> {
    let mut report = ScanReport::default();
    let file_options = FileOptions {
        id: None,
        input_root: Some(root.to_path_buf()),
    };

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || is_root_config(&entry) {
            continue;
        }
        let path = entry.into_path();

        match ctx.parse_file(&path, &file_options) {
            Ok(Some(model)) => report.parsed.push(ParsedFile { path, model }),
            Ok(None) => report.skipped.push(path),
            Err(source) if options.keep_going => {
                warn!(path = %path.display(), error = %source, "failed to parse file");
                report.failed.push(FailedFile {
                    path,
                    error: source.to_string(),
                });
            }
            Err(source) => return Err(ScanError::Parse { path, source }),
        }
    }

    info!(
        root = %root.display(),
        parsed = report.parsed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        items = ctx.items().len(),
        collections = ctx.collections().len(),
        "scan finished"
    );
    Ok(report)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_root_config(entry: &DirEntry) -> bool {
    entry.depth() == 1 && entry.file_name() == CONFIG_FILENAME
}

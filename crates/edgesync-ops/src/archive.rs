//! Deployment artifact packaging
//!
//! Walks a source tree and writes a single deflate-compressed zip,
//! skipping development-only files and build-cache directories.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::OpsError;

/// What to package and what to leave out
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    /// File suffixes to skip, e.g. ".py", ".zip"
    pub exclude_extensions: Vec<String>,
    /// Exact file names to skip anywhere in the tree
    pub exclude_files: Vec<String>,
    /// Directory names pruned from the walk, e.g. "__pycache__"
    pub exclude_dirs: Vec<String>,
}

fn is_pruned_dir(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && exclude_dirs
            .iter()
            .any(|d| entry.file_name().to_str() == Some(d.as_str()))
}

/// Package the source tree into a single zip archive.
///
/// Returns the archive entry names actually written, relative to the
/// source root with `/` separators.
pub fn package_directory(spec: &PackageSpec) -> Result<Vec<String>, OpsError> {
    let source = &spec.source_dir;
    if !source.is_dir() {
        return Err(OpsError::InvalidInput(format!(
            "{} is not a directory",
            source.display()
        )));
    }
    if spec.output.starts_with(source) {
        return Err(OpsError::InvalidInput(
            "archive output must live outside the packaged tree".to_string(),
        ));
    }

    info!(
        source = %source.display(),
        output = %spec.output.display(),
        "Creating deployment archive"
    );

    let file = File::create(&spec.output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::new();

    let walker = WalkDir::new(source)
        .into_iter()
        .filter_entry(|e| !is_pruned_dir(e, &spec.exclude_dirs));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if spec.exclude_files.iter().any(|f| f == &name) {
            debug!(file = %name, "Skipping excluded file");
            continue;
        }
        if spec.exclude_extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            debug!(file = %name, "Skipping excluded extension");
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| OpsError::InvalidInput(e.to_string()))?;
        let archive_name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(archive_name.as_str(), options)?;
        let mut source_file = File::open(entry.path())?;
        io::copy(&mut source_file, &mut zip)?;
        debug!(entry = %archive_name, "Added archive entry");
        entries.push(archive_name);
    }

    zip.finish()?;
    info!(count = entries.len(), "Archive written");
    Ok(entries)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use super::artifact::ArtifactSet;

/// How [`write_project`] treats the output directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Overwrite files that already exist
    pub force: bool,
    /// Report what would be written without touching the filesystem
    pub dry_run: bool,
}

/// Outcome of one [`write_project`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Files a dry run would have written
    pub planned: Vec<PathBuf>,
}

/// Write every artifact under `out_dir` using its conventional file name.
///
/// Existing files are left alone unless `options.force` is set. Each file is
/// written to a sibling temporary path first and renamed into place, so a
/// reader never sees a half-written artifact.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be written.
pub fn write_project(
    artifacts: &ArtifactSet,
    out_dir: &Path,
    options: WriteOptions,
) -> anyhow::Result<WriteReport> {
    let mut report = WriteReport::default();

    if options.dry_run {
        for artifact in artifacts.iter() {
            report.planned.push(out_dir.join(&artifact.file_name));
        }
        return Ok(report);
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {out_dir:?}"))?;

    for artifact in artifacts.iter() {
        let path = out_dir.join(&artifact.file_name);
        if path.exists() && !options.force {
            warn!(path = ?path, "skipping existing file (use --force to overwrite)");
            report.skipped.push(path);
            continue;
        }
        write_atomically(&path, &artifact.content)?;
        info!(path = ?path, role = %artifact.role, "wrote artifact");
        report.written.push(path);
    }
    Ok(report)
}

fn write_atomically(path: &Path, content: &str) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Artifact path has no file name: {path:?}"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, content).with_context(|| format!("Failed to write {tmp:?}"))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {tmp:?} to {path:?}"))?;
    Ok(())
}

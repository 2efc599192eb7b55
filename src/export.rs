//! Writing rendered outputs to disk, one by one or bundled into a flat zip.

use crate::compositor::RenderedOutput;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const ARCHIVE_NAME: &str = "watermarked_images.zip";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No outputs to archive")]
    NoOutputs,

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Write a single output into `dir` under its own filename.
pub async fn export_one(output: &RenderedOutput, dir: &Path) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&output.filename);
    tokio::fs::write(&path, &output.bytes).await?;
    info!("Saved {} ({} bytes)", path.display(), output.bytes.len());
    Ok(path)
}

/// Bundle outputs into an in-memory zip with one stored entry each.
pub fn build_archive(outputs: &[RenderedOutput]) -> Result<Vec<u8>, ArchiveError> {
    if outputs.is_empty() {
        return Err(ArchiveError::NoOutputs);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (output, name) in outputs.iter().zip(entry_names(outputs)) {
        debug!("Adding {} to archive ({} bytes)", name, output.bytes.len());
        writer.start_file(name, options)?;
        writer.write_all(&output.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Write `watermarked_images.zip` into `dir`.
pub async fn export_all(outputs: &[RenderedOutput], dir: &Path) -> Result<PathBuf, ArchiveError> {
    let archive = build_archive(outputs)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(ARCHIVE_NAME);
    tokio::fs::write(&path, &archive).await?;
    info!(
        "Saved {} outputs to {} ({} bytes)",
        outputs.len(),
        path.display(),
        archive.len()
    );
    Ok(path)
}

/// Entry names in output order. Repeated filenames become `name (2).jpg`,
/// `name (3).jpg` and so on.
fn entry_names(outputs: &[RenderedOutput]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(outputs.len());

    for output in outputs {
        let mut name = output.filename.clone();
        let mut count = *seen.get(&name).unwrap_or(&0);
        while seen.contains_key(&name) {
            count += 1;
            name = numbered(&output.filename, count + 1);
        }
        seen.insert(output.filename.clone(), count);
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}

fn numbered(filename: &str, n: usize) -> String {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({}){}", &filename[..idx], n, &filename[idx..]),
        _ => format!("{} ({})", filename, n),
    }
}

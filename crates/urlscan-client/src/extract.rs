//! Unpacking downloaded data dumps.
//!
//! Dumps come either as a single gzip file (`20260101.gz`) or as a gzipped
//! tarball (`20260101.tar.gz`). Both may consist of several concatenated
//! gzip members.

use crate::error::{ClientError, Result};
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Extract a `.gz` or `.tar.gz` file into `outdir`, creating it if needed.
///
/// A `.gz` file is decompressed to `outdir/<name without .gz>`. A `.tar.gz`
/// file is unpacked; entries that would land outside `outdir` are skipped.
///
/// # Errors
/// Returns [`ClientError::InvalidArgument`] for any other file type, or an
/// I/O error if reading or writing fails.
pub fn extract(path: &Path, outdir: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ClientError::InvalidArgument(format!("invalid file name '{}'", path.display()))
        })?;

    if name.ends_with(".tar.gz") {
        fs::create_dir_all(outdir)?;
        let mut archive = Archive::new(decoder(path)?);
        archive.set_ignore_zeros(true);
        archive.unpack(outdir)?;
        debug!("Unpacked {} into {}", path.display(), outdir.display());
        return Ok(());
    }

    if let Some(stem) = name.strip_suffix(".gz").filter(|stem| !stem.is_empty()) {
        fs::create_dir_all(outdir)?;
        let target = outdir.join(stem);
        let mut output = File::create(&target)?;
        let written = io::copy(&mut decoder(path)?, &mut output)?;
        debug!("Decompressed {} to {} ({written} bytes)", path.display(), target.display());
        return Ok(());
    }

    Err(ClientError::InvalidArgument(format!(
        "unsupported file type: {name}"
    )))
}

fn decoder(path: &Path) -> Result<MultiGzDecoder<BufReader<File>>> {
    Ok(MultiGzDecoder::new(BufReader::new(File::open(path)?)))
}

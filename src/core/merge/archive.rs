//! Zip archive utilities for the merge engine

use crate::domain::MergeError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip local-file-header magic number (PK\x03\x04)
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Tests whether the given bytes start a zip file
///
/// Matches only the local-file-header magic number; empty archives
/// (PK\x05\x06) and spanned archives (PK\x07\x08) are rejected.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZIP_MAGIC
}

/// Packs the files of a directory into a zip archive
///
/// Only regular files directly inside the directory are packed, in
/// lexicographic order so the output is deterministic.
pub fn zip_directory(directory: &Path, target: &Path) -> Result<(), MergeError> {
    let mut paths: Vec<_> = std::fs::read_dir(directory)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path != target)
        .collect();
    paths.sort();

    let file = File::create(target)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in paths {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                MergeError::Encoding(format!("Non-UTF-8 file name: {}", path.display()))
            })?;
        writer.start_file(name, options)?;
        let mut source = BufReader::new(File::open(&path)?);
        std::io::copy(&mut source, &mut writer)?;
    }

    writer.finish()?.flush()?;
    Ok(())
}

//! Zip bundling for multi-file exports.

use std::io::{Cursor, Write};

use anyhow::Result;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Bundles (name, bytes) pairs into a single zip archive, in order.
pub fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, bytes) in files {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::error::StreamError;
use crate::traits::capture_recorder::CaptureSource;

/// [`CaptureSource`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCaptureSource;

impl CaptureSource for FileCaptureSource {
    fn current_file_size(&self, uri: &Path) -> Result<u64, StreamError> {
        match fs::metadata(uri) {
            Ok(meta) => Ok(meta.len()),
            // The recorder may not have flushed its first buffer yet.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StreamError::ReadFailure(format!("stat {} failed: {}", uri.display(), e))),
        }
    }

    fn read_range(&self, uri: &Path, offset: u64, length: usize) -> Result<Vec<u8>, StreamError> {
        let mut file =
            File::open(uri).map_err(|e| StreamError::ReadFailure(format!("open {} failed: {}", uri.display(), e)))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| StreamError::ReadFailure(e.to_string()))?;

        let mut buf = Vec::with_capacity(length);
        file.take(length as u64)
            .read_to_end(&mut buf)
            .map_err(|e| StreamError::ReadFailure(format!("read {} failed: {}", uri.display(), e)))?;
        Ok(buf)
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, StreamError> {
    let data = fs::read(path)
        .map_err(|e| StreamError::ReadFailure(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

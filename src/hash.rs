//! Streaming SHA-512 digests.
//!
//! The same accumulator verifies previously cached files and hashes fresh
//! download bytes as they are written, so both paths are held to an
//! identical standard.

use crate::error::Result;
use sha2::{Digest, Sha512};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Threshold for showing checksum progress (100MB)
const PROGRESS_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Length of a SHA-512 digest in hex characters.
pub const SHA512_HEX_LEN: usize = 128;

/// Incremental SHA-512 accumulator for bytes that arrive chunk by chunk
/// (the download path feeds this while writing to disk).
pub struct Sha512Stream {
    hasher: Sha512,
}

impl Sha512Stream {
    pub fn new() -> Self {
        Self {
            hasher: Sha512::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Finalize into a lower-case hex digest string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Default for Sha512Stream {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash an entire readable source, consuming it in bounded chunks.
pub fn digest_reader(reader: &mut impl Read) -> Result<String> {
    digest_reader_with_progress(reader, 0, false)
}

/// Hash a file on disk. Shows incremental progress for large files
/// (the gcc tarball runs to hundreds of megabytes).
pub fn digest_file(path: &Path) -> Result<String> {
    let mut f = std::fs::File::open(path)?;
    let file_size = f.metadata().map(|m| m.len()).unwrap_or(0);
    digest_reader_with_progress(&mut f, file_size, file_size > PROGRESS_THRESHOLD)
}

fn digest_reader_with_progress(
    reader: &mut impl Read,
    total_size: u64,
    show_progress: bool,
) -> Result<String> {
    let mut stream = Sha512Stream::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total_read = 0u64;
    let mut last_percent = 0u8;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }

        stream.update(&buffer[..n]);
        total_read += n as u64;

        if show_progress && total_size > 0 {
            let percent = ((total_read * 100) / total_size) as u8;
            if percent >= last_percent + 10 {
                print!("\r     checksum: {}%...", percent);
                std::io::Write::flush(&mut std::io::stdout()).ok();
                last_percent = percent;
            }
        }
    }

    if show_progress {
        println!();
    }

    Ok(stream.finish())
}

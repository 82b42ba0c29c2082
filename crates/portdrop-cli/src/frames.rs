//! Hex frame files
//!
//! One frame per line as hex; blank lines and `#` comments are skipped.
//! Whitespace and `:` separators inside a line are ignored so dumps like
//! `08:00:45 00` paste straight in.

use std::io::BufRead;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid hex: {source}")]
    Hex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },
}

/// Decode a single hex frame
pub fn parse_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(cleaned)
}

/// Read every frame from `reader`
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<Vec<u8>>, FrameFileError> {
    let mut frames = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let body = line.split('#').next().unwrap_or("").trim();
        if body.is_empty() {
            continue;
        }
        let frame = parse_hex(body).map_err(|source| FrameFileError::Hex {
            line: idx + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

//! Splits file content into overlapping fixed-size line windows.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use atelier_core::{IndexConfig, Result};

/// A contiguous line-range slice of one file, the unit of embedding and
/// retrieval.
///
/// `text` carries a one-line file/line-range header so the embedding is
/// biased toward file identity; `raw_text` is the unprefixed body used for
/// display and insertion. Chunks are immutable and replaced wholesale on
/// re-index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Chunk {
    /// Path of the source file
    pub file_path: String,
    /// First line covered, 1-indexed
    pub start_line: usize,
    /// Last line covered, 1-indexed inclusive
    pub end_line: usize,
    /// Chunk body prefixed with the file/line-range header
    pub text: String,
    /// Chunk body without the header
    pub raw_text: String,
}

/// Splits `content` into overlapping chunks of `chunk_size` lines with
/// `chunk_overlap` lines shared between consecutive windows.
///
/// Windows whose trimmed text is shorter than `min_chunk_chars` are
/// skipped, so blank or near-empty regions contribute nothing. The walk
/// stops after the window covering the last line. Same input always yields
/// the same chunks.
///
/// # Errors
/// Returns a configuration error if the overlap is not smaller than the
/// chunk size.
pub fn chunk_file(file_path: &str, content: &str, config: &IndexConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let lines: Vec<&str> = content.lines().collect();
    let stride = config.stride();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < lines.len() {
        let end = (start + config.chunk_size).min(lines.len());
        let body = lines[start..end].join("\n");

        if body.trim().len() >= config.min_chunk_chars {
            let start_line = start + 1;
            chunks.push(Chunk {
                file_path: file_path.to_owned(),
                start_line,
                end_line: end,
                text: format!("// File: {file_path} (lines {start_line}-{end})\n{body}"),
                raw_text: body,
            });
        }

        if start + config.chunk_size >= lines.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::Error;

    fn numbered_lines(count: usize) -> String {
        (1..=count)
            .map(|number| format!("line number {number} with some content"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn consecutive_chunks_advance_by_stride() {
        let config = IndexConfig::default();
        let content = numbered_lines(250);
        let chunks = chunk_file("src/big.rs", &content, &config).unwrap();

        assert!(chunks.len() > 2, "250 lines should produce several chunks");
        for pair in chunks.windows(2) {
            assert_eq!(
                pair[1].start_line - pair[0].start_line,
                50,
                "Non-final chunks must advance by chunk_size - overlap"
            );
        }
    }

    #[test]
    fn chunk_ranges_cover_every_line() {
        let config = IndexConfig::default();
        let total = 137;
        let content = numbered_lines(total);
        let chunks = chunk_file("src/mid.rs", &content, &config).unwrap();

        let mut covered = vec![false; total + 1];
        for chunk in &chunks {
            assert!(chunk.end_line - chunk.start_line + 1 <= config.chunk_size);
            for line in chunk.start_line..=chunk.end_line {
                covered[line] = true;
            }
        }
        assert!(
            covered[1..].iter().all(|seen| *seen),
            "Union of chunk ranges must cover [1, N] with no gap"
        );
        assert_eq!(chunks.last().map(|chunk| chunk.end_line), Some(total));
    }

    #[test]
    fn eighty_lines_yield_two_chunks_with_default_stride() {
        let config = IndexConfig::default();
        let content = numbered_lines(80);
        let chunks = chunk_file("a.py", &content, &config).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 60));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (51, 80));
    }

    #[test]
    fn near_empty_windows_are_skipped() {
        let config = IndexConfig::default();
        let chunks = chunk_file("b.py", "x = 1\n\n\n", &config).unwrap();
        assert!(
            chunks.is_empty(),
            "Windows below the minimum length threshold produce no chunks"
        );
    }

    #[test]
    fn header_identifies_file_and_range() {
        let config = IndexConfig::default();
        let content = numbered_lines(10);
        let chunks = chunk_file("src/lib.rs", &content, &config).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("// File: src/lib.rs (lines 1-10)\n"));
        assert!(
            !chunks[0].raw_text.contains("// File:"),
            "raw_text must omit the header"
        );
        assert!(chunks[0].text.ends_with(&chunks[0].raw_text));
    }

    #[test]
    fn overlap_not_below_chunk_size_fails() {
        let config = IndexConfig {
            chunk_size: 10,
            chunk_overlap: 12,
            ..IndexConfig::default()
        };
        let result = chunk_file("a.rs", "content", &config);
        assert!(result.is_err());
        if let Err(error) = result {
            assert!(matches!(error, Error::Config(_)));
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let config = IndexConfig::default();
        let content = numbered_lines(123);
        let first = chunk_file("src/same.rs", &content, &config).unwrap();
        let second = chunk_file("src/same.rs", &content, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        let config = IndexConfig::default();
        let chunks = chunk_file("empty.rs", "", &config).unwrap();
        assert!(chunks.is_empty());
    }
}

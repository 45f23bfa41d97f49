//! Character-count text splitter.
//!
//! Lengths are measured in Unicode scalar values, so a segment never ends
//! in the middle of a multi-byte character.

use newslens_core::error::NewslensError;

/// Split `text` into segments of at most `chunk_size` characters.
///
/// Each segment after the first starts `overlap` characters before the end
/// of the previous one. With `overlap == 0` the segments concatenate back to
/// the original text. Empty input yields no segments.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, NewslensError> {
    if chunk_size == 0 {
        return Err(NewslensError::Config(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(NewslensError::Config(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut segments = Vec::new();
    if char_count == 0 {
        return Ok(segments);
    }

    let step = chunk_size - overlap;
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        segments.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(segments)
}

/// A splitter with fixed, validated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, NewslensError> {
        // Reuse the parameter checks.
        split("", chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        split(text, self.chunk_size, self.overlap).unwrap_or_default()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

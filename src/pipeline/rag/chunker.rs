//! Line-based chunking with character overlap for retrieval.

use std::collections::VecDeque;

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

use super::types::{Chunker, TextChunk};

const SEPARATOR: char = '\n';

/// Splits report text on line breaks and packs lines into chunks of at most
/// `chunk_size` characters. Consecutive chunks share trailing lines totalling
/// at most `chunk_overlap` characters.
///
/// A single line longer than `chunk_size` becomes its own oversized chunk.
#[derive(Debug, Clone, Copy)]
pub struct ReportChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ReportChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size),
        }
    }
}

impl Default for ReportChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker for ReportChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(usize, &str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for (offset, line) in lines_with_offsets(text) {
            let len = line.chars().count();
            let sep = usize::from(!window.is_empty());

            if total + sep + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    tracing::debug!(chars = total, limit = self.chunk_size, "Oversized chunk");
                }
                push_chunk(&mut chunks, &window);

                while let Some(&(_, _, front_len)) = window.front() {
                    let sep = usize::from(!window.is_empty());
                    let over_overlap = total > self.chunk_overlap;
                    let no_room = total > 0 && total + sep + len > self.chunk_size;
                    if !(over_overlap || no_room) {
                        break;
                    }
                    window.pop_front();
                    total -= front_len + usize::from(!window.is_empty());
                }
            }

            total += len + usize::from(!window.is_empty());
            window.push_back((offset, line, len));
        }

        if !window.is_empty() {
            push_chunk(&mut chunks, &window);
        }
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<TextChunk>, window: &VecDeque<(usize, &str, usize)>) {
    let Some(&(char_offset, _, _)) = window.front() else {
        return;
    };
    let content = window
        .iter()
        .map(|(_, line, _)| *line)
        .collect::<Vec<_>>()
        .join("\n");
    chunks.push(TextChunk {
        content,
        chunk_index: chunks.len(),
        char_offset,
    });
}

/// Non-blank trimmed lines with the byte offset of each trimmed line.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split(SEPARATOR).filter_map(move |raw| {
        let start = offset;
        offset += raw.len() + SEPARATOR.len_utf8();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lead = raw.len() - raw.trim_start().len();
        Some((start + lead, trimmed))
    })
}

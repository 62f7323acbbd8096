//! Recursive character splitter: paragraphs, then lines, sentences, words,
//! and finally raw characters until every piece fits the chunk budget.
//! Sizes are counted in chars, not bytes, so Korean and Japanese pages get the
//! same budget as English ones.

use super::Document;

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SplitterError {
    #[error("chunk_size must be positive")]
    ZeroChunkSize,
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.split_into(text, 0, &mut pieces);
        self.merge(pieces)
    }

    /// Splits each document; every chunk keeps the parent's metadata plus a
    /// `chunk` index.
    pub fn split_documents(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut out = Vec::new();
        for doc in documents {
            for (i, chunk) in self.split_text(&doc.content).into_iter().enumerate() {
                let mut piece = Document {
                    content: chunk,
                    metadata: doc.metadata.clone(),
                };
                piece.metadata.insert("chunk".to_string(), i.to_string());
                out.push(piece);
            }
        }
        out
    }

    /// Breaks `text` into pieces no longer than `chunk_size`, each keeping its
    /// trailing separator so merging restores the original spacing.
    fn split_into(&self, text: &str, level: usize, out: &mut Vec<String>) {
        if char_len(text) <= self.chunk_size {
            out.push(text.to_string());
            return;
        }
        let Some(separator) = SEPARATORS.get(level) else {
            let chars: Vec<char> = text.chars().collect();
            out.extend(chars.chunks(self.chunk_size).map(|c| c.iter().collect()));
            return;
        };
        if !text.contains(separator) {
            self.split_into(text, level + 1, out);
            return;
        }
        for part in text.split_inclusive(separator) {
            self.split_into(part, level + 1, out);
        }
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            if !current.is_empty() && char_len(&current) + char_len(&piece) > self.chunk_size {
                let finished = current.trim().to_string();
                current = self.overlap_tail(&current);
                if !finished.is_empty() {
                    chunks.push(finished);
                }
                // The carried tail must still leave room for the next piece.
                if char_len(&current) + char_len(&piece) > self.chunk_size {
                    current.clear();
                }
            }
            current.push_str(&piece);
        }

        let last = current.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }
        chunks
    }

    /// Last `chunk_overlap` chars of `text`, starting at a word boundary when
    /// one exists.
    fn overlap_tail(&self, text: &str) -> String {
        if self.chunk_overlap == 0 {
            return String::new();
        }
        let total = char_len(text);
        if total <= self.chunk_overlap {
            return text.to_string();
        }
        let start = text
            .char_indices()
            .nth(total - self.chunk_overlap)
            .map_or(0, |(i, _)| i);
        let tail = &text[start..];
        match tail.find(char::is_whitespace) {
            Some(ws) if ws + 1 < tail.len() => tail[ws..].trim_start().to_string(),
            _ => tail.to_string(),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

//! Document chunking.
//!
//! [`RecursiveChunker`] cuts text into windows of at most `chunk_size`
//! characters. Each window ends at the best boundary available inside the
//! size budget, trying in order:
//!
//! - a paragraph break (`\n\n`)
//! - a sentence end (`.`, `!` or `?` followed by whitespace)
//! - a word boundary
//! - a hard cut at exactly `chunk_size` characters
//!
//! The next window starts inside the last `chunk_overlap` characters of the
//! previous chunk's content, at a word start when there is one, so text
//! spanning a cut appears in both chunks. Whitespace runs at a cut are never
//! counted as overlap.

use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with content and metadata but no
/// embeddings. Embeddings are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Blank page segments are skipped. Returns an empty `Vec` if the whole
    /// document is blank.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// A half-open range of character (not byte) offsets into the split text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Offset of the first character.
    pub start: usize,
    /// Offset one past the last non-whitespace character.
    pub end: usize,
}

impl ChunkSpan {
    /// Number of characters covered by the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the span covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits text on paragraph, then sentence, then word boundaries, falling
/// back to a hard character cut, with a fixed overlap between neighbors.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// An overlap that is not smaller than `chunk_size` is clamped to
    /// `chunk_size - 1`; [`RagConfig`] rejects such values up front.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    /// Create a chunker from the sizes in a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` and return the chunk boundaries as character offsets.
    pub fn split_spans(&self, text: &str) -> Vec<ChunkSpan> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_for(&chars)
    }

    /// Split `text` into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_for(&chars)
            .into_iter()
            .map(|span| chars[span.start..span.end].iter().collect())
            .collect()
    }

    fn spans_for(&self, chars: &[char]) -> Vec<ChunkSpan> {
        let mut spans = Vec::new();
        let mut start = skip_whitespace(chars, 0);

        while start < chars.len() {
            let end = self.find_end(chars, start);
            let trimmed_end = trim_end(chars, start, end);
            if trimmed_end > start {
                spans.push(ChunkSpan { start, end: trimmed_end });
            }
            let next_content = skip_whitespace(chars, end);
            if next_content >= chars.len() {
                break;
            }
            start = self.next_start(chars, start, trimmed_end, next_content);
        }

        spans
    }

    /// Pick the end of the window starting at `start`.
    ///
    /// A boundary only counts if the chunk it produces, once trailing
    /// whitespace is dropped, still holds more than `chunk_overlap`
    /// characters. Trimmed ends then strictly increase from chunk to chunk.
    fn find_end(&self, chars: &[char], start: usize) -> usize {
        let limit = start + self.chunk_size;
        if limit >= chars.len() {
            return chars.len();
        }

        let min_end = start + self.chunk_overlap + 1;
        for boundary in [Boundary::Paragraph, Boundary::Sentence, Boundary::Word] {
            let found = (min_end..=limit).rev().find(|&pos| {
                boundary.ends_at(chars, pos) && trim_end(chars, start, pos) >= min_end
            });
            if let Some(pos) = found {
                return pos;
            }
        }

        limit
    }

    /// Pick the start of the window that follows the chunk
    /// `start..trimmed_end`, given that the next non-whitespace character
    /// after the cut is at `next_content`.
    ///
    /// The new window starts within the last `chunk_overlap` characters of
    /// the chunk's content, at a word start when there is one, and early
    /// enough to still reach `next_content`. If no such position exists
    /// (a single-character chunk, or a whitespace gap of `chunk_size - 1` or
    /// more), it starts at `next_content` with no overlap.
    fn next_start(
        &self,
        chars: &[char],
        start: usize,
        trimmed_end: usize,
        next_content: usize,
    ) -> usize {
        if self.chunk_overlap == 0 {
            return next_content;
        }

        let floor = trimmed_end
            .saturating_sub(self.chunk_overlap)
            .max(start + 1)
            .max((next_content + 1).saturating_sub(self.chunk_size));
        let window = floor..trimmed_end.max(floor);

        let word_start = window.clone().find(|&pos| {
            !chars[pos].is_whitespace() && (pos == 0 || chars[pos - 1].is_whitespace())
        });

        word_start
            .or_else(|| window.clone().find(|&pos| !chars[pos].is_whitespace()))
            .unwrap_or(next_content)
    }
}

/// Boundary kinds, in order of preference.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
}

impl Boundary {
    /// Whether a cut between `pos - 1` and `pos` lands on this boundary.
    fn ends_at(self, chars: &[char], pos: usize) -> bool {
        if pos == 0 || pos > chars.len() {
            return false;
        }
        let prev = chars[pos - 1];
        match self {
            Boundary::Paragraph => pos >= 2 && prev == '\n' && chars[pos - 2] == '\n',
            Boundary::Sentence => {
                pos >= 2 && prev.is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?')
            }
            Boundary::Word => prev.is_whitespace(),
        }
    }
}

fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn trim_end(chars: &[char], start: usize, mut end: usize) -> usize {
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    end
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces: Vec<(usize, String)> = document
            .pages
            .iter()
            .enumerate()
            .filter(|(_, page)| !page.trim().is_empty())
            .flat_map(|(index, page)| {
                self.split_text(page).into_iter().map(move |text| (index + 1, text))
            })
            .collect();

        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, (segment, content))| Chunk {
                id: Uuid::new_v4().to_string(),
                content,
                metadata: ChunkMetadata {
                    source: document.source.clone(),
                    page: i + 1,
                    total_pages: total,
                    segment,
                    extra: Default::default(),
                },
                embedding: Vec::new(),
            })
            .collect()
    }
}

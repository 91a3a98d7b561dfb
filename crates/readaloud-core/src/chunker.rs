//! Word-bounded chunking of page text for speech synthesis.
//!
//! Text is split on whitespace only and consecutive words are grouped into
//! units of at most `max_unit_size` words. Offsets are reconstructed from the
//! normalized form (words joined by a single space), so they drift from the
//! source whenever it contains runs of whitespace. Callers that cut the source
//! text by offset accept that approximation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Default number of words per unit.
pub const DEFAULT_MAX_UNIT_WORDS: usize = 50;

/// A contiguous slice of the active page's text queued for synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TextUnit {
    pub id: String,
    pub text: String,
    /// Character offset (not byte) of the first character.
    #[ts(type = "number")]
    pub start_offset: usize,
    /// Exclusive character offset.
    #[ts(type = "number")]
    pub end_offset: usize,
}

impl TextUnit {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Split `text` into units of at most `max_unit_size` words.
///
/// A size of zero is treated as one. Empty or whitespace-only input yields no
/// units.
pub fn chunk(text: &str, max_unit_size: usize) -> Vec<TextUnit> {
    let max_words = max_unit_size.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut units = Vec::with_capacity(words.len().div_ceil(max_words));
    let mut offset = 0usize;

    for (group_idx, group) in words.chunks(max_words).enumerate() {
        let text = group.join(" ");
        let len = text.chars().count();
        units.push(TextUnit {
            // Ids follow the index of the unit's first word.
            id: format!("chunk-{}", group_idx * max_words),
            text,
            start_offset: offset,
            end_offset: offset + len,
        });
        offset += len + 1;
    }

    units
}

/// Whitespace-normalized form of `text`: words joined by single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

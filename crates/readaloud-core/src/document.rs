//! Fixed-size pagination of a plain-text document.
//!
//! Pages are cut every `chars_per_page` characters with no attempt to respect
//! word or paragraph boundaries, so a word may straddle two pages. The
//! controller only ever sees the text of the current page.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_CHARS_PER_PAGE: usize = 4000;

/// Page-level view of the document being read.
pub trait PageSource: Send {
    fn current_text(&self) -> &str;

    /// Zero-based index of the current page.
    fn page_index(&self) -> usize;

    fn page_count(&self) -> usize;

    fn has_next_page(&self) -> bool {
        self.page_index() + 1 < self.page_count()
    }

    /// Move to the next page and return its text.
    fn advance_page(&mut self) -> Option<String>;

    fn supports_discard(&self) -> bool {
        false
    }

    /// Permanently drop everything before `page_offset` characters into the
    /// current page, including all earlier pages.
    fn discard_consumed(&mut self, page_offset: usize) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PagedDocument {
    text: String,
    chars_per_page: usize,
    pages: Vec<Page>,
    current: usize,
    backing_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct Page {
    start: usize,
    text: String,
}

impl PagedDocument {
    pub fn new(text: &str, chars_per_page: usize) -> Self {
        let mut document = Self {
            text: text.nfc().collect(),
            chars_per_page: chars_per_page.max(1),
            pages: Vec::new(),
            current: 0,
            backing_file: None,
        };
        document.repaginate();
        document
    }

    /// Read a UTF-8 text file. The file is not modified unless
    /// [`with_backing_file`](Self::with_backing_file) is used.
    pub fn load(path: &Path, chars_per_page: usize) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read text from {}", path.display()))?;
        let document = Self::new(&text, chars_per_page);
        info!(
            path = %path.display(),
            chars = document.char_count(),
            pages = document.page_count(),
            "Loaded document"
        );
        Ok(document)
    }

    /// Write the remaining text back to `path` whenever consumed text is
    /// discarded.
    pub fn with_backing_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.backing_file = Some(path.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Jump to `page`, clamped to the last page.
    pub fn set_page(&mut self, page: usize) {
        self.current = page.min(self.pages.len().saturating_sub(1));
    }

    pub fn page_text(&self, page: usize) -> Option<&str> {
        self.pages.get(page).map(|page| page.text.as_str())
    }

    fn repaginate(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        self.pages = if chars.is_empty() {
            vec![Page {
                start: 0,
                text: String::new(),
            }]
        } else {
            chars
                .chunks(self.chars_per_page)
                .enumerate()
                .map(|(idx, chunk)| Page {
                    start: idx * self.chars_per_page,
                    text: chunk.iter().collect(),
                })
                .collect()
        };
        self.set_page(self.current);
    }
}

impl PageSource for PagedDocument {
    fn current_text(&self) -> &str {
        self.pages
            .get(self.current)
            .map(|page| page.text.as_str())
            .unwrap_or("")
    }

    fn page_index(&self) -> usize {
        self.current
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn advance_page(&mut self) -> Option<String> {
        if !self.has_next_page() {
            return None;
        }
        self.current += 1;
        Some(self.current_text().to_string())
    }

    fn supports_discard(&self) -> bool {
        true
    }

    fn discard_consumed(&mut self, page_offset: usize) -> Result<()> {
        let page = self
            .pages
            .get(self.current)
            .context("current page is out of range")?;
        // Unit offsets are counted from the first word, not the page start.
        let page_len = page.text.chars().count();
        let leading = page.text.chars().take_while(|c| c.is_whitespace()).count();
        let within_page = (leading + page_offset).min(page_len);
        let cut = (page.start + within_page).min(self.char_count());

        self.text = self.text.chars().skip(cut).collect();
        self.current = 0;
        self.repaginate();
        debug!(cut, remaining = self.char_count(), "Cut consumed text");

        if let Some(path) = &self.backing_file {
            fs::write(path, &self.text)
                .with_context(|| format!("failed to write remaining text to {}", path.display()))?;
        }
        Ok(())
    }
}

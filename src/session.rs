use anyhow::Result;
use readaloud_core::cache::save_last_page;
use readaloud_core::document::{PageSource, PagedDocument};
use std::path::PathBuf;

/// Document wrapper that remembers the listening position across runs.
pub struct BookmarkedDocument {
    inner: PagedDocument,
    cache_root: PathBuf,
    doc_path: PathBuf,
}

impl BookmarkedDocument {
    pub fn new(inner: PagedDocument, cache_root: PathBuf, doc_path: PathBuf) -> Self {
        Self {
            inner,
            cache_root,
            doc_path,
        }
    }

    fn save(&self) {
        save_last_page(&self.cache_root, &self.doc_path, self.inner.page_index());
    }
}

impl PageSource for BookmarkedDocument {
    fn current_text(&self) -> &str {
        self.inner.current_text()
    }

    fn page_index(&self) -> usize {
        self.inner.page_index()
    }

    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn advance_page(&mut self) -> Option<String> {
        let text = self.inner.advance_page();
        if text.is_some() {
            self.save();
        }
        text
    }

    fn supports_discard(&self) -> bool {
        self.inner.supports_discard()
    }

    fn discard_consumed(&mut self, page_offset: usize) -> Result<()> {
        self.inner.discard_consumed(page_offset)?;
        self.save();
        Ok(())
    }
}

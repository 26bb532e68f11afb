//! Ordered, deduplicated stores of staged files and document pages.
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::PathBuf;

use thiserror::Error;

use crate::validate::{format_bytes, FileCandidate};

/// Something that can sit in a [`SelectionStore`].
pub trait Staged {
    type Identity: PartialEq + Debug;

    /// Two items with equal identities may not coexist in one store.
    fn identity(&self) -> Self::Identity;

    /// Short user-facing name used in warnings.
    fn label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl From<FileCandidate> for StagedFile {
    fn from(candidate: FileCandidate) -> Self {
        Self {
            name: candidate.name,
            size_bytes: candidate.size_bytes,
            path: candidate.path,
        }
    }
}

impl Staged for StagedFile {
    type Identity = (String, u64);

    fn identity(&self) -> Self::Identity {
        (self.name.clone(), self.size_bytes)
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, format_bytes(self.size_bytes))
    }
}

/// One-based page number within the staged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Page(pub u32);

impl Staged for Page {
    type Identity = u32;

    fn identity(&self) -> u32 {
        self.0
    }

    fn label(&self) -> String {
        format!("page {}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("{label} is already added")]
    Duplicate { label: String },
    #[error("position {position} is out of range ({len} item(s) staged)")]
    OutOfRange { position: usize, len: usize },
    #[error("page {page} is not part of the document")]
    UnknownPage { page: u32 },
    #[error("page selection is only available when extracting pages")]
    NotPageMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStore<T> {
    items: Vec<T>,
}

impl<T> Default for SelectionStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Staged> SelectionStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn contains(&self, identity: &T::Identity) -> bool {
        self.items.iter().any(|item| item.identity() == *identity)
    }

    /// Appends `item`, returning its position. Duplicates leave the store untouched.
    pub fn add(&mut self, item: T) -> Result<usize, SelectionError> {
        if self.contains(&item.identity()) {
            return Err(SelectionError::Duplicate { label: item.label() });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    pub fn remove(&mut self, position: usize) -> Result<T, SelectionError> {
        self.check_position(position)?;
        Ok(self.items.remove(position))
    }

    /// Moves the item at `from` to `to` in one splice.
    ///
    /// Both positions refer to the store as it is now; stale positions are
    /// rejected rather than clamped.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), SelectionError> {
        self.check_position(from)?;
        self.check_position(to)?;
        if from == to {
            return Ok(());
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    fn check_position(&self, position: usize) -> Result<(), SelectionError> {
        if position < self.items.len() {
            Ok(())
        } else {
            Err(SelectionError::OutOfRange {
                position,
                len: self.items.len(),
            })
        }
    }
}

/// Pages of one document plus the subset marked for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageStore {
    pages: SelectionStore<Page>,
    selected: BTreeSet<u32>,
}

impl PageStore {
    pub fn with_page_count(page_count: u32) -> Self {
        let mut pages = SelectionStore::new();
        for number in 1..=page_count {
            // Fresh store with increasing numbers: cannot collide.
            let _ = pages.add(Page(number));
        }
        Self {
            pages,
            selected: BTreeSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        self.pages.items()
    }

    pub fn is_selected(&self, page: u32) -> bool {
        self.selected.contains(&page)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Selected page numbers in ascending order.
    pub fn selected_sorted(&self) -> Vec<u32> {
        self.selected.iter().copied().collect()
    }

    /// Smallest and largest selected page, if anything is selected.
    pub fn selected_range(&self) -> Option<(u32, u32)> {
        let first = self.selected.first()?;
        let last = self.selected.last()?;
        Some((*first, *last))
    }

    /// Flips the page's membership in the selection and returns the new state.
    pub fn toggle_page(&mut self, page: u32) -> Result<bool, SelectionError> {
        if !self.pages.contains(&page) {
            return Err(SelectionError::UnknownPage { page });
        }
        if self.selected.remove(&page) {
            Ok(false)
        } else {
            self.selected.insert(page);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.pages.items().iter().map(|page| page.0).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn reset(&mut self) {
        self.pages.reset();
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> StagedFile {
        StagedFile::from(FileCandidate::new(name, size, name))
    }

    fn names(store: &SelectionStore<StagedFile>) -> Vec<&str> {
        store.items().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn duplicate_identity_is_rejected_but_same_name_other_size_is_not() {
        let mut store = SelectionStore::new();
        assert_eq!(store.add(file("a.pdf", 10)), Ok(0));
        assert!(matches!(
            store.add(file("a.pdf", 10)),
            Err(SelectionError::Duplicate { .. })
        ));
        assert_eq!(store.add(file("a.pdf", 11)), Ok(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_closes_the_gap() {
        let mut store = SelectionStore::new();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            store.add(file(name, 1)).unwrap();
        }
        let removed = store.remove(1).unwrap();
        assert_eq!(removed.name, "b.pdf");
        assert_eq!(names(&store), vec!["a.pdf", "c.pdf"]);
        assert_eq!(
            store.remove(2),
            Err(SelectionError::OutOfRange { position: 2, len: 2 })
        );
    }

    #[test]
    fn reorder_moves_forward_and_backward() {
        let mut store = SelectionStore::new();
        for name in ["a", "b", "c", "d"] {
            store.add(file(name, 1)).unwrap();
        }
        store.reorder(0, 2).unwrap();
        assert_eq!(names(&store), vec!["b", "c", "a", "d"]);
        store.reorder(3, 0).unwrap();
        assert_eq!(names(&store), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn reorder_to_same_position_is_noop() {
        let mut store = SelectionStore::new();
        for name in ["a", "b"] {
            store.add(file(name, 1)).unwrap();
        }
        let before = store.clone();
        store.reorder(1, 1).unwrap();
        assert_eq!(store, before);
    }

    #[test]
    fn reorder_rejects_stale_positions() {
        let mut store = SelectionStore::new();
        store.add(file("a", 1)).unwrap();
        store.add(file("b", 1)).unwrap();
        let before = store.clone();
        assert_eq!(
            store.reorder(0, 2),
            Err(SelectionError::OutOfRange { position: 2, len: 2 })
        );
        assert_eq!(store, before);
    }

    #[test]
    fn page_toggle_does_not_touch_page_order() {
        let mut pages = PageStore::with_page_count(4);
        assert_eq!(pages.toggle_page(3), Ok(true));
        assert_eq!(pages.toggle_page(1), Ok(true));
        assert_eq!(pages.toggle_page(3), Ok(false));
        assert_eq!(pages.selected_sorted(), vec![1]);
        assert_eq!(
            pages.pages().iter().map(|p| p.0).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(pages.toggle_page(9), Err(SelectionError::UnknownPage { page: 9 }));
    }

    #[test]
    fn select_all_and_clear_replace_selection() {
        let mut pages = PageStore::with_page_count(3);
        pages.select_all();
        assert_eq!(pages.selected_range(), Some((1, 3)));
        pages.clear_selection();
        assert_eq!(pages.selected_count(), 0);
        assert_eq!(pages.selected_range(), None);
        pages.reset();
        assert_eq!(pages.page_count(), 0);
    }
}

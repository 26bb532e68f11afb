use relay_logging::{relay_debug, relay_info};

use crate::config::{ToolConfig, ToolMode};
use crate::selection::{PageStore, SelectionError, SelectionStore, Staged, StagedFile};
use crate::validate::{validate, FileCandidate, Rejection};

/// Outcome of offering a batch of files to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub duplicates: Vec<String>,
    /// Extra candidates offered to a single-document tool.
    pub ignored: Vec<String>,
}

/// Why the submit action is currently locked regardless of the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagingLock {
    #[default]
    Open,
    Uploading,
    Processing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSnapshot {
    pub count: usize,
    pub can_submit: bool,
    pub action_label: String,
}

/// Binds a selection to one tool mode and derives what the UI may offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingController {
    tool: ToolConfig,
    files: SelectionStore<StagedFile>,
    pages: PageStore,
    lock: StagingLock,
}

impl StagingController {
    pub fn new(tool: ToolConfig) -> Self {
        Self {
            tool,
            files: SelectionStore::new(),
            pages: PageStore::default(),
            lock: StagingLock::Open,
        }
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    pub fn mode(&self) -> ToolMode {
        self.tool.mode
    }

    pub fn files(&self) -> &SelectionStore<StagedFile> {
        &self.files
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    pub fn set_lock(&mut self, lock: StagingLock) {
        self.lock = lock;
    }

    /// Validates and stages a batch. Each candidate is judged on its own.
    pub fn stage_files(&mut self, candidates: Vec<FileCandidate>) -> BatchReport {
        let mut report = BatchReport::default();
        match self.tool.mode {
            ToolMode::Merge => {
                for candidate in candidates {
                    if let Err(rejection) = validate(&candidate, &self.tool) {
                        report.rejected.push(rejection);
                        continue;
                    }
                    let name = candidate.name.clone();
                    match self.files.add(StagedFile::from(candidate)) {
                        Ok(_) => report.accepted.push(name),
                        Err(_) => report.duplicates.push(name),
                    }
                }
            }
            ToolMode::PageExtract | ToolMode::SingleFile => {
                let mut chosen = false;
                for candidate in candidates {
                    if chosen {
                        report.ignored.push(candidate.name);
                        continue;
                    }
                    if let Err(rejection) = validate(&candidate, &self.tool) {
                        report.rejected.push(rejection);
                        continue;
                    }
                    chosen = true;
                    let file = StagedFile::from(candidate);
                    if self.files.contains(&file.identity()) {
                        report.duplicates.push(file.name);
                        continue;
                    }
                    self.files.reset();
                    self.pages.reset();
                    let name = file.name.clone();
                    // The store was just emptied.
                    let _ = self.files.add(file);
                    report.accepted.push(name);
                }
            }
        }
        relay_debug!(
            "Staged batch for {}: accepted={} rejected={} duplicates={} ignored={}",
            self.tool.slug,
            report.accepted.len(),
            report.rejected.len(),
            report.duplicates.len(),
            report.ignored.len()
        );
        report
    }

    /// Populates the page store once the staged document has been inspected.
    pub fn load_pages(&mut self, page_count: u32) -> Result<(), SelectionError> {
        if self.tool.mode != ToolMode::PageExtract {
            return Err(SelectionError::NotPageMode);
        }
        relay_info!("Document has {} page(s)", page_count);
        self.pages = PageStore::with_page_count(page_count);
        Ok(())
    }

    pub fn remove_file(&mut self, position: usize) -> Result<StagedFile, SelectionError> {
        let removed = self.files.remove(position)?;
        if self.tool.mode == ToolMode::PageExtract {
            self.pages.reset();
        }
        Ok(removed)
    }

    pub fn reorder_files(&mut self, from: usize, to: usize) -> Result<(), SelectionError> {
        self.files.reorder(from, to)
    }

    pub fn toggle_page(&mut self, page: u32) -> Result<bool, SelectionError> {
        self.page_store_mut()?.toggle_page(page)
    }

    pub fn select_all_pages(&mut self) -> Result<(), SelectionError> {
        self.page_store_mut()?.select_all();
        Ok(())
    }

    pub fn clear_page_selection(&mut self) -> Result<(), SelectionError> {
        self.page_store_mut()?.clear_selection();
        Ok(())
    }

    /// Empties files, pages and selection and reopens the submit action.
    pub fn reset(&mut self) {
        self.files.reset();
        self.pages.reset();
        self.lock = StagingLock::Open;
    }

    /// Items the submit action would act on.
    pub fn count(&self) -> usize {
        match self.tool.mode {
            ToolMode::Merge | ToolMode::SingleFile => self.files.len(),
            ToolMode::PageExtract => self.pages.selected_count(),
        }
    }

    /// True when the selection meets the mode threshold and nothing is locking it.
    pub fn can_submit(&self) -> bool {
        self.lock == StagingLock::Open && self.meets_threshold()
    }

    pub fn snapshot(&self) -> StagingSnapshot {
        StagingSnapshot {
            count: self.count(),
            can_submit: self.can_submit(),
            action_label: self.action_label(),
        }
    }

    fn meets_threshold(&self) -> bool {
        match self.tool.mode {
            ToolMode::Merge => self.files.len() >= 2,
            ToolMode::PageExtract => self.files.len() == 1 && self.pages.selected_count() >= 1,
            ToolMode::SingleFile => self.files.len() == 1,
        }
    }

    fn action_label(&self) -> String {
        match self.lock {
            StagingLock::Open => {}
            StagingLock::Uploading => return "Uploading…".to_string(),
            StagingLock::Processing => return "Processing…".to_string(),
            StagingLock::Finished => return "Start over to run again".to_string(),
        }
        match self.tool.mode {
            ToolMode::Merge => match self.files.len() {
                0 => "Add at least 2 files".to_string(),
                1 => "Add 1 more file".to_string(),
                n => format!("Merge {n} files"),
            },
            ToolMode::PageExtract => {
                if self.files.is_empty() {
                    return "Load a document".to_string();
                }
                match self.pages.selected_count() {
                    0 => "Select pages to extract".to_string(),
                    1 => "Extract 1 page".to_string(),
                    n => format!("Extract {n} pages"),
                }
            }
            ToolMode::SingleFile => match self.files.get(0) {
                Some(file) => format!("Convert {}", file.name),
                None => "Choose a file".to_string(),
            },
        }
    }

    fn page_store_mut(&mut self) -> Result<&mut PageStore, SelectionError> {
        if self.tool.mode == ToolMode::PageExtract {
            Ok(&mut self.pages)
        } else {
            Err(SelectionError::NotPageMode)
        }
    }
}

//! In-place filtering of a configuration file.

use crate::{XmlEventReader, XmlEventWriter, XmlFilter};
use confmig_core::{MigrationError, Result, TaskName, TaskResult, TaskStatus};
use confmig_execution::{Task, TaskContext};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Runs an [`XmlFilter`] over a file, replacing it only if something changed.
///
/// The output goes to a temporary file next to the document, which is moved
/// over the document once the pass succeeds. A failed pass leaves the
/// document as it was.
pub struct XmlFilterTask {
    name: TaskName,
    path: PathBuf,
    filter: RefCell<XmlFilter>,
}

impl XmlFilterTask {
    /// Create a task filtering `path`.
    pub fn new(name: impl Into<TaskName>, path: impl Into<PathBuf>, filter: XmlFilter) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            filter: RefCell::new(filter),
        }
    }

    /// Get the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn filter_into(&self, temp: &mut NamedTempFile) -> std::result::Result<crate::FilterSummary, crate::XmlError> {
        let mut input = BufReader::new(File::open(&self.path)?);
        let mut output = BufWriter::new(temp.as_file_mut());
        let summary = {
            let mut reader = XmlEventReader::new(&mut input);
            let mut writer = XmlEventWriter::new(&mut output);
            self.filter.borrow_mut().run(&mut reader, &mut writer)?
        };
        output.flush()?;
        Ok(summary)
    }
}

impl Task for XmlFilterTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn run(&self, _context: &mut TaskContext<'_>) -> Result<TaskResult> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(directory).map_err(|e| MigrationError::document(&self.path, e))?;
        let summary = self
            .filter_into(&mut temp)
            .map_err(|e| e.for_document(&self.path))?;

        if !summary.is_modified() {
            debug!(path = %self.path.display(), events = summary.events, "document unchanged");
            return Ok(TaskResult::skipped_because("document unchanged"));
        }

        let permissions = fs::metadata(&self.path)?.permissions();
        fs::set_permissions(temp.path(), permissions)?;
        temp.persist(&self.path)
            .map_err(|e| MigrationError::document(&self.path, e.error))?;
        info!(path = %self.path.display(), changes = summary.changes, "document rewritten");

        Ok(TaskResult::builder(TaskStatus::Success)
            .attribute("path", self.path.display().to_string())
            .attribute("changes", summary.changes)
            .build())
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::data::model::Worksheet;
use crate::graph::{GraphLayer, GraphPage};

// ---------------------------------------------------------------------------
// Page references
// ---------------------------------------------------------------------------

/// Compose a `[page]item` reference.
pub fn page_ref(page: &str, item: &str) -> String {
    format!("[{page}]{item}")
}

/// Split a `[page]item` reference into its parts.
pub fn split_ref(reference: &str) -> Option<(&str, &str)> {
    let rest = reference.strip_prefix('[')?;
    let (page, item) = rest.split_once(']')?;
    (!page.is_empty() && !item.is_empty()).then_some((page, item))
}

// ---------------------------------------------------------------------------
// WorksheetPage
// ---------------------------------------------------------------------------

/// A workbook created from a worksheet template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetPage {
    pub name: String,
    pub template: PathBuf,
    pub sheets: Vec<Worksheet>,
}

impl WorksheetPage {
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Root container for every page created during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub books: Vec<WorksheetPage>,
    pub graphs: Vec<GraphPage>,
    #[serde(skip)]
    modified: bool,
    #[serde(skip)]
    next_book: usize,
    #[serde(skip)]
    next_graph: usize,
}

impl Project {
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Forget unsaved changes so closing the project won't ask to save.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Add a workbook with one sheet called `sheet_name`; returns the sheet reference.
    pub fn add_book(&mut self, template: &Path, sheet_name: &str) -> String {
        self.next_book += 1;
        let name = format!("Book{}", self.next_book);
        let reference = page_ref(&name, sheet_name);
        self.books.push(WorksheetPage {
            name,
            template: template.to_path_buf(),
            sheets: vec![Worksheet::new(sheet_name)],
        });
        self.modified = true;
        reference
    }

    /// Add a graph page; returns its active layer reference.
    pub fn add_graph(&mut self, template: &Path) -> String {
        self.next_graph += 1;
        let page = GraphPage::new(format!("Graph{}", self.next_graph), template);
        let reference = page.active_layer_ref();
        self.graphs.push(page);
        self.modified = true;
        reference
    }

    pub fn worksheet(&self, reference: &str) -> Option<&Worksheet> {
        let (page, sheet) = split_ref(reference)?;
        self.books.iter().find(|b| b.name == page)?.sheet(sheet)
    }

    pub fn worksheet_mut(&mut self, reference: &str) -> Option<&mut Worksheet> {
        let (page, sheet) = split_ref(reference)?;
        self.modified = true;
        self.books
            .iter_mut()
            .find(|b| b.name == page)?
            .sheet_mut(sheet)
    }

    pub fn layer(&self, reference: &str) -> Option<&GraphLayer> {
        let (page, layer) = split_ref(reference)?;
        self.graphs.iter().find(|g| g.name == page)?.layer(layer)
    }

    /// Split borrow: a mutable layer alongside the (immutable) worksheets.
    pub(crate) fn layer_and_books(
        &mut self,
        reference: &str,
    ) -> Option<(&mut GraphLayer, &[WorksheetPage])> {
        let (page, layer) = split_ref(reference)?;
        self.modified = true;
        let layer = self
            .graphs
            .iter_mut()
            .find(|g| g.name == page)?
            .layer_mut(layer)?;
        Some((layer, &self.books))
    }

    /// Write the project as pretty JSON.
    pub fn save_json(&mut self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("serializing project")?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        self.modified = false;
        info!("project saved to {}", path.display());
        Ok(())
    }
}

/// Resolve a sheet reference against a list of workbooks.
pub(crate) fn find_sheet<'a>(books: &'a [WorksheetPage], reference: &str) -> Option<&'a Worksheet> {
    let (page, sheet) = split_ref(reference)?;
    books.iter().find(|b| b.name == page)?.sheet(sheet)
}

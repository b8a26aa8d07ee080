//! The host application surface the workflow drives.
//!
//! Everything the workflow needs from "the application" goes through
//! [`Host`]: project lifecycle, page creation from templates, ASCII import,
//! plot binding and rescale. [`LocalHost`] keeps the project in memory and
//! reads templates and data from the file system; tests substitute their
//! own implementations.

mod local;

use std::path::Path;

pub use local::LocalHost;

use crate::data::loader::{ImportOptions, ImportSpec};
use crate::data::model::Worksheet;
use crate::data::range::DataRange;
use crate::error::HostError;
use crate::graph::{AxisBounds, GraphLayer};
use crate::project::Project;

pub type HostResult<T> = Result<T, HostError>;

pub trait Host {
    /// Drop the project's modified flag so the next open doesn't prompt to save.
    fn clear_modified(&mut self);

    /// Replace the current project with an empty one.
    fn open_project(&mut self) -> HostResult<()>;

    /// Create a workbook from `template` holding one sheet named `sheet_name`.
    /// Returns the sheet reference (`[Book1]Sheet1`), which becomes active.
    fn create_worksheet_page(&mut self, template: &Path, sheet_name: &str) -> HostResult<String>;

    fn worksheet(&self, sheet: &str) -> HostResult<&Worksheet>;

    /// Work out how `file` should be imported.
    fn read_import_spec(&self, file: &Path, options: &ImportOptions) -> HostResult<ImportSpec>;

    /// Import into `sheet`, replacing its contents. Returns the row count.
    fn import_ascii(&mut self, sheet: &str, spec: ImportSpec) -> HostResult<usize>;

    /// Create a graph page from `template`; returns its active layer reference.
    fn create_graph_page(&mut self, template: &Path) -> HostResult<String>;

    fn layer(&self, layer: &str) -> HostResult<&GraphLayer>;

    /// Bind `range` to `layer`. Returns the plot index, negative on failure.
    fn add_plot(&mut self, layer: &str, range: &DataRange) -> HostResult<i32>;

    /// Recompute the layer's axis bounds from its bound data.
    fn rescale(&mut self, layer: &str) -> HostResult<Option<AxisBounds>>;

    fn project(&self) -> Option<&Project>;

    fn project_mut(&mut self) -> Option<&mut Project>;
}

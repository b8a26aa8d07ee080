use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{Host, HostResult};
use crate::data::loader::{self, ImportOptions, ImportSpec};
use crate::data::model::Worksheet;
use crate::data::range::DataRange;
use crate::error::HostError;
use crate::graph::{AxisBounds, GraphLayer};
use crate::project::{find_sheet, Project};

/// In-process host: the project lives in memory, templates and data files
/// on disk. Relative template paths are also looked up in `template_dirs`.
#[derive(Debug, Default)]
pub struct LocalHost {
    project: Option<Project>,
    template_dirs: Vec<PathBuf>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also search `dir` for relative template paths.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(dir.into());
        self
    }

    fn resolve_template(&self, template: &Path) -> HostResult<PathBuf> {
        if template.is_file() {
            return Ok(template.to_path_buf());
        }
        if template.is_relative() {
            if let Some(found) = self
                .template_dirs
                .iter()
                .map(|dir| dir.join(template))
                .find(|p| p.is_file())
            {
                return Ok(found);
            }
        }
        Err(HostError::TemplateNotFound {
            path: template.to_path_buf(),
        })
    }

    fn open(&self) -> HostResult<&Project> {
        self.project.as_ref().ok_or(HostError::NoProject)
    }

    fn open_mut(&mut self) -> HostResult<&mut Project> {
        self.project.as_mut().ok_or(HostError::NoProject)
    }
}

impl Host for LocalHost {
    fn clear_modified(&mut self) {
        if let Some(project) = &mut self.project {
            project.clear_modified();
        }
    }

    fn open_project(&mut self) -> HostResult<()> {
        if self.project.as_ref().is_some_and(Project::is_modified) {
            return Err(HostError::UnsavedChanges);
        }
        self.project = Some(Project::default());
        debug!("opened a new project");
        Ok(())
    }

    fn create_worksheet_page(&mut self, template: &Path, sheet_name: &str) -> HostResult<String> {
        let template = self.resolve_template(template)?;
        let project = self.open_mut()?;
        let sheet = project.add_book(&template, sheet_name);
        info!("created worksheet {sheet} from {}", template.display());
        Ok(sheet)
    }

    fn worksheet(&self, sheet: &str) -> HostResult<&Worksheet> {
        self.open()?
            .worksheet(sheet)
            .ok_or_else(|| HostError::UnknownWorksheet(sheet.to_string()))
    }

    fn read_import_spec(&self, file: &Path, options: &ImportOptions) -> HostResult<ImportSpec> {
        loader::read_import_spec(file, options)
    }

    fn import_ascii(&mut self, sheet: &str, spec: ImportSpec) -> HostResult<usize> {
        // resolve the target before touching the file
        self.worksheet(sheet)?;
        let path = spec.path.clone();
        let table = loader::read_table(spec)?;

        let worksheet = self
            .open_mut()?
            .worksheet_mut(sheet)
            .ok_or_else(|| HostError::UnknownWorksheet(sheet.to_string()))?;
        worksheet.fill(table);
        let rows = worksheet.row_count();
        debug!(
            "imported {} into {sheet}: {rows} rows × {} columns",
            path.display(),
            worksheet.column_count()
        );
        Ok(rows)
    }

    fn create_graph_page(&mut self, template: &Path) -> HostResult<String> {
        let template = self.resolve_template(template)?;
        let layer = self.open_mut()?.add_graph(&template);
        info!("created graph {layer} from {}", template.display());
        Ok(layer)
    }

    fn layer(&self, layer: &str) -> HostResult<&GraphLayer> {
        self.open()?
            .layer(layer)
            .ok_or_else(|| HostError::UnknownLayer(layer.to_string()))
    }

    fn add_plot(&mut self, layer: &str, range: &DataRange) -> HostResult<i32> {
        let (target, books) = self
            .open_mut()?
            .layer_and_books(layer)
            .ok_or_else(|| HostError::UnknownLayer(layer.to_string()))?;
        let Some(sheet) = find_sheet(books, &range.sheet) else {
            warn!("{layer}: range refers to unknown sheet {}", range.sheet);
            return Ok(crate::graph::PLOT_FAILED);
        };
        Ok(target.add_plot(range, sheet))
    }

    fn rescale(&mut self, layer: &str) -> HostResult<Option<AxisBounds>> {
        let (target, books) = self
            .open_mut()?
            .layer_and_books(layer)
            .ok_or_else(|| HostError::UnknownLayer(layer.to_string()))?;
        let bounds = target.rescale(|sheet| find_sheet(books, sheet));
        debug!("{layer} rescaled: {bounds:?}");
        Ok(bounds)
    }

    fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_refuses_to_discard_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("PRF.otw");
        std::fs::write(&template, "").unwrap();

        let mut host = LocalHost::new();
        host.open_project().unwrap();
        host.create_worksheet_page(&template, "Sheet1").unwrap();
        assert!(matches!(host.open_project(), Err(HostError::UnsavedChanges)));

        host.clear_modified();
        host.open_project().unwrap();
        assert!(host.project().unwrap().books.is_empty());
    }

    #[test]
    fn templates_resolve_through_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PRF_IMG.otp"), "").unwrap();

        let mut host = LocalHost::new().with_template_dir(dir.path());
        host.open_project().unwrap();
        let layer = host.create_graph_page(Path::new("PRF_IMG.otp")).unwrap();
        assert_eq!(layer, "[Graph1]Layer1");

        let err = host
            .create_graph_page(Path::new("missing.otp"))
            .unwrap_err();
        assert!(matches!(err, HostError::TemplateNotFound { .. }));
    }

    #[test]
    fn pages_need_an_open_project() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("PRF.otw");
        std::fs::write(&template, "").unwrap();

        let mut host = LocalHost::new();
        let err = host.create_worksheet_page(&template, "Sheet1").unwrap_err();
        assert!(matches!(err, HostError::NoProject));
    }

    #[test]
    fn unknown_layers_are_reported() {
        let mut host = LocalHost::new();
        host.open_project().unwrap();
        assert!(matches!(
            host.rescale("[Graph9]Layer1"),
            Err(HostError::UnknownLayer(_))
        ));
    }
}

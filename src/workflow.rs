use std::fmt;
use std::path::Path;

use log::{error, info, warn};

use crate::config::{ImportFailurePolicy, WorkflowConfig};
use crate::data::loader::ImportOptions;
use crate::data::range::{Binding, DataRange};
use crate::error::{HostError, Stage, WorkflowError, WorkflowResult};
use crate::graph::AxisBounds;
use crate::host::Host;

/// Status line emitted after a successful import.
pub const IMPORT_OK: &str = "Import data successful.";

// ---------------------------------------------------------------------------
// Workflow state
// ---------------------------------------------------------------------------

/// Where a run is. Advances strictly forward; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    ProjectOpen,
    WorksheetReady,
    Imported,
    RangeBuilt,
    GraphCreated,
    Plotted,
    Failed(Stage),
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Init => f.write_str("Init"),
            WorkflowState::ProjectOpen => f.write_str("ProjectOpen"),
            WorkflowState::WorksheetReady => f.write_str("WorksheetReady"),
            WorkflowState::Imported => f.write_str("Imported"),
            WorkflowState::RangeBuilt => f.write_str("RangeBuilt"),
            WorkflowState::GraphCreated => f.write_str("GraphCreated"),
            WorkflowState::Plotted => f.write_str("Plotted"),
            WorkflowState::Failed(stage) => write!(f, "Failed({stage})"),
        }
    }
}

/// The outcome of binding a range to a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotHandle {
    pub layer: String,
    pub index: usize,
    pub bounds: Option<AxisBounds>,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Drives a [`Host`] through open → worksheet → import → range → graph → plot.
#[derive(Debug)]
pub struct Workflow<H: Host> {
    host: H,
    state: WorkflowState,
    import_retries: u32,
    on_import_failure: ImportFailurePolicy,
    status: Vec<String>,
}

impl<H: Host> Workflow<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: WorkflowState::Init,
            import_retries: 1,
            on_import_failure: ImportFailurePolicy::Abort,
            status: Vec::new(),
        }
    }

    /// Extra import attempts after a transient file-system error.
    pub fn with_import_retries(mut self, retries: u32) -> Self {
        self.import_retries = retries;
        self
    }

    pub fn with_import_failure_policy(mut self, policy: ImportFailurePolicy) -> Self {
        self.on_import_failure = policy;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Human-readable status lines produced so far.
    pub fn status_lines(&self) -> &[String] {
        &self.status
    }

    /// Reject the call unless the workflow is in one of `allowed`.
    fn expect_state(&self, stage: Stage, allowed: &[WorkflowState]) -> WorkflowResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WorkflowError::OutOfOrder {
                stage,
                actual: self.state,
            })
        }
    }

    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        self.state = WorkflowState::Failed(err.stage());
        error!("{err}");
        err
    }

    // -- stages --

    /// Clear the modified flag and open a fresh project.
    pub fn open_project(&mut self) -> WorkflowResult<()> {
        self.expect_state(Stage::OpenProject, &[WorkflowState::Init])?;
        self.host.clear_modified();
        if let Err(source) = self.host.open_project() {
            return Err(self.fail(WorkflowError::ProjectOpenFailed { source }));
        }
        self.state = WorkflowState::ProjectOpen;
        Ok(())
    }

    /// Create a workbook from `template`; returns the `[BookN]sheet` reference.
    pub fn create_worksheet(&mut self, template: &Path, sheet_name: &str) -> WorkflowResult<String> {
        self.expect_state(Stage::CreateWorksheet, &[WorkflowState::ProjectOpen])?;
        match self.host.create_worksheet_page(template, sheet_name) {
            Ok(sheet) => {
                self.state = WorkflowState::WorksheetReady;
                Ok(sheet)
            }
            Err(e) => Err(self.fail(WorkflowError::from_host(Stage::CreateWorksheet, e))),
        }
    }

    /// Import `file` into `sheet`. Returns the number of rows read.
    ///
    /// A failed import leaves the workflow in `WorksheetReady`.
    pub fn import_ascii(
        &mut self,
        sheet: &str,
        file: &Path,
        options: &ImportOptions,
    ) -> WorkflowResult<usize> {
        self.expect_state(Stage::Import, &[WorkflowState::WorksheetReady])?;

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            let result = self
                .host
                .read_import_spec(file, options)
                .and_then(|spec| self.host.import_ascii(sheet, spec));
            match result {
                Err(e) if e.is_transient() && attempt <= self.import_retries => {
                    warn!("import attempt {attempt} failed ({e}), retrying");
                }
                other => break other,
            }
        };

        match outcome {
            Ok(rows) => {
                info!("{IMPORT_OK} ({rows} rows from {})", file.display());
                self.status.push(IMPORT_OK.to_string());
                self.state = WorkflowState::Imported;
                Ok(rows)
            }
            Err(source) => {
                let err = import_failed(file, source);
                match self.on_import_failure {
                    ImportFailurePolicy::Abort => error!("{err}"),
                    ImportFailurePolicy::Continue => warn!("{err}; continuing"),
                }
                Err(err)
            }
        }
    }

    /// Bind worksheet columns to plot roles, validating each index.
    pub fn build_range(&mut self, sheet: &str, bindings: &[Binding]) -> WorkflowResult<DataRange> {
        let allowed: &[WorkflowState] = match self.on_import_failure {
            ImportFailurePolicy::Abort => &[WorkflowState::Imported],
            ImportFailurePolicy::Continue => {
                &[WorkflowState::Imported, WorkflowState::WorksheetReady]
            }
        };
        self.expect_state(Stage::BuildRange, allowed)?;

        let worksheet = match self.host.worksheet(sheet) {
            Ok(ws) => ws,
            Err(e) => return Err(self.fail(WorkflowError::from_host(Stage::BuildRange, e))),
        };
        match DataRange::build(sheet, worksheet, bindings) {
            Ok(range) => {
                info!("built range {range}");
                self.state = WorkflowState::RangeBuilt;
                Ok(range)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Create a graph page from `template`; returns its active layer reference.
    pub fn create_graph(&mut self, template: &Path) -> WorkflowResult<String> {
        self.expect_state(Stage::CreateGraph, &[WorkflowState::RangeBuilt])?;
        match self.host.create_graph_page(template) {
            Ok(layer) => {
                self.state = WorkflowState::GraphCreated;
                Ok(layer)
            }
            Err(e) => Err(self.fail(WorkflowError::from_host(Stage::CreateGraph, e))),
        }
    }

    /// Bind `range` to `layer` and rescale. Calling it again with the same
    /// range reuses the existing plot and yields the same bounds.
    pub fn plot_and_rescale(&mut self, layer: &str, range: &DataRange) -> WorkflowResult<PlotHandle> {
        self.expect_state(
            Stage::Plot,
            &[WorkflowState::GraphCreated, WorkflowState::Plotted],
        )?;

        let code = match self.host.add_plot(layer, range) {
            Ok(code) => code,
            Err(e) => return Err(self.fail(WorkflowError::from_host(Stage::Plot, e))),
        };
        let Ok(index) = usize::try_from(code) else {
            return Err(self.fail(WorkflowError::PlotCreationFailed {
                layer: layer.to_string(),
                code,
            }));
        };

        let bounds = match self.host.rescale(layer) {
            Ok(bounds) => bounds,
            Err(e) => return Err(self.fail(WorkflowError::from_host(Stage::Plot, e))),
        };
        info!("plotted {range} on {layer} as #{index}");
        self.state = WorkflowState::Plotted;
        Ok(PlotHandle {
            layer: layer.to_string(),
            index,
            bounds,
        })
    }

    /// Run every stage in order from `config`, adopting its retry count and
    /// import failure policy. Stops at the first fatal error.
    pub fn run(&mut self, config: &WorkflowConfig) -> WorkflowResult<PlotHandle> {
        self.import_retries = config.import_retries;
        self.on_import_failure = config.on_import_failure;
        self.open_project()?;
        let sheet = self.create_worksheet(&config.worksheet_template, &config.sheet_name)?;
        if let Err(e) = self.import_ascii(&sheet, &config.data_file, &config.import) {
            if self.on_import_failure == ImportFailurePolicy::Abort {
                return Err(e);
            }
        }
        let range = self.build_range(&sheet, &config.bindings)?;
        let layer = self.create_graph(&config.graph_template)?;
        self.plot_and_rescale(&layer, &range)
    }
}

fn import_failed(file: &Path, source: HostError) -> WorkflowError {
    WorkflowError::ImportFailed {
        path: file.to_path_buf(),
        source,
    }
}

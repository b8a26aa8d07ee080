use std::path::{Path, PathBuf};

use plotbook::data::loader::{ImportOptions, ImportSpec};
use plotbook::data::model::Worksheet;
use plotbook::data::range::{parse_bindings, Binding, DataRange, Role};
use plotbook::graph::{AxisBounds, GraphLayer};
use plotbook::host::HostResult;
use plotbook::project::Project;
use plotbook::{
    Host, HostError, LocalHost, Stage, Workflow, WorkflowConfig, WorkflowError, WorkflowState,
};

/// Wraps a `LocalHost`, counts imports and can fail the first few with an I/O error.
#[derive(Debug, Default)]
struct RecordingHost {
    inner: LocalHost,
    imports: usize,
    transient_failures: usize,
    refuse_open: bool,
}

impl Host for RecordingHost {
    fn clear_modified(&mut self) {
        self.inner.clear_modified()
    }

    fn open_project(&mut self) -> HostResult<()> {
        if self.refuse_open {
            return Err(HostError::NoProject);
        }
        self.inner.open_project()
    }

    fn create_worksheet_page(&mut self, template: &Path, sheet_name: &str) -> HostResult<String> {
        self.inner.create_worksheet_page(template, sheet_name)
    }

    fn worksheet(&self, sheet: &str) -> HostResult<&Worksheet> {
        self.inner.worksheet(sheet)
    }

    fn read_import_spec(&self, file: &Path, options: &ImportOptions) -> HostResult<ImportSpec> {
        self.inner.read_import_spec(file, options)
    }

    fn import_ascii(&mut self, sheet: &str, spec: ImportSpec) -> HostResult<usize> {
        self.imports += 1;
        if self.imports <= self.transient_failures {
            return Err(HostError::Io {
                path: spec.path,
                source: std::io::Error::new(std::io::ErrorKind::WouldBlock, "file locked"),
            });
        }
        self.inner.import_ascii(sheet, spec)
    }

    fn create_graph_page(&mut self, template: &Path) -> HostResult<String> {
        self.inner.create_graph_page(template)
    }

    fn layer(&self, layer: &str) -> HostResult<&GraphLayer> {
        self.inner.layer(layer)
    }

    fn add_plot(&mut self, layer: &str, range: &DataRange) -> HostResult<i32> {
        self.inner.add_plot(layer, range)
    }

    fn rescale(&mut self, layer: &str) -> HostResult<Option<AxisBounds>> {
        self.inner.rescale(layer)
    }

    fn project(&self) -> Option<&Project> {
        self.inner.project()
    }

    fn project_mut(&mut self) -> Option<&mut Project> {
        self.inner.project_mut()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: WorkflowConfig,
}

/// Templates plus a 10-row, 4-column whitespace-delimited `test.dat` whose
/// header also names the background column FullProf leaves out of the data.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let worksheet_template = dir.path().join("PRF.otw");
    let graph_template = dir.path().join("PRF_IMG.otp");
    std::fs::write(&worksheet_template, "").unwrap();
    std::fs::write(&graph_template, "").unwrap();

    let mut data = String::from("2Theta Yobs Ycal Yobs-Ycal Backg\n");
    for i in 0..10 {
        let x = 20.0 + i as f64;
        data.push_str(&format!("{x} {} {} {}\n", 100 + i, 98 + i, i as f64 - 5.0));
    }
    let data_file = dir.path().join("test.dat");
    std::fs::write(&data_file, data).unwrap();

    let config = WorkflowConfig {
        worksheet_template,
        graph_template,
        data_file,
        ..WorkflowConfig::default()
    };
    Fixture { _dir: dir, config }
}

#[test]
fn prf_scenario_reaches_plotted() {
    let fx = fixture();
    let mut wf = Workflow::new(LocalHost::new());
    let handle = wf.run(&fx.config).unwrap();

    assert_eq!(wf.state(), WorkflowState::Plotted);
    assert_eq!(wf.status_lines(), ["Import data successful."]);
    assert_eq!(handle.index, 0);

    let project = wf.host().project().unwrap();
    let sheet = project.worksheet("[Book1]test").unwrap();
    assert_eq!(sheet.row_count(), 10);
    assert_eq!(sheet.column_count(), 4);

    assert_eq!(project.graphs.len(), 1);
    assert_eq!(project.graphs[0].layers.len(), 1);
    let layer = wf.host().layer(&handle.layer).unwrap();
    assert_eq!(layer.plots.len(), 1);
    assert_eq!(
        layer.plots[0].range.bindings(),
        &[
            Binding::new(0, Role::X),
            Binding::new(1, Role::Y),
            Binding::new(3, Role::Y)
        ]
    );

    let bounds = handle.bounds.unwrap();
    assert_eq!(bounds.x.min, 20.0);
    assert_eq!(bounds.x.max, 29.0);
    assert_eq!(bounds.y.min, -5.0);
    assert_eq!(bounds.y.max, 109.0);
}

#[test]
fn missing_template_stops_before_import() {
    let fx = fixture();
    let config = WorkflowConfig {
        worksheet_template: PathBuf::from("/nonexistent/PRF.otw"),
        ..fx.config.clone()
    };
    let mut wf = Workflow::new(RecordingHost::default());
    let err = wf.run(&config).unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::TemplateNotFound {
            stage: Stage::CreateWorksheet,
            ..
        }
    ));
    assert_eq!(wf.state(), WorkflowState::Failed(Stage::CreateWorksheet));
    assert_eq!(wf.host().imports, 0);
}

#[test]
fn unparseable_file_stays_in_worksheet_ready() {
    let fx = fixture();
    std::fs::write(&fx.config.data_file, "no numbers here\njust text\n").unwrap();

    let mut wf = Workflow::new(LocalHost::new());
    let err = wf.run(&fx.config).unwrap_err();

    assert!(matches!(err, WorkflowError::ImportFailed { .. }));
    assert_eq!(err.stage(), Stage::Import);
    assert_eq!(wf.state(), WorkflowState::WorksheetReady);
    assert!(wf.status_lines().is_empty());
    assert!(wf.host().project().unwrap().graphs.is_empty());
}

#[test]
fn parse_errors_are_not_retried() {
    let fx = fixture();
    std::fs::write(&fx.config.data_file, "header only\n").unwrap();

    let config = WorkflowConfig {
        import_retries: 3,
        ..fx.config.clone()
    };
    let mut wf = Workflow::new(RecordingHost::default());
    wf.run(&config).unwrap_err();
    assert_eq!(wf.host().imports, 1);
}

#[test]
fn transient_import_error_is_retried_once() {
    let fx = fixture();
    let host = RecordingHost {
        transient_failures: 1,
        ..RecordingHost::default()
    };
    let mut wf = Workflow::new(host);
    wf.run(&fx.config).unwrap();
    assert_eq!(wf.host().imports, 2);
    assert_eq!(wf.state(), WorkflowState::Plotted);
}

#[test]
fn retries_are_bounded() {
    let fx = fixture();
    let host = RecordingHost {
        transient_failures: 5,
        ..RecordingHost::default()
    };
    let mut wf = Workflow::new(host);
    let err = wf.run(&fx.config).unwrap_err();
    match err {
        WorkflowError::ImportFailed { source, .. } => assert!(source.is_transient()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(wf.host().imports, 2);
}

#[test]
fn refused_open_is_fatal() {
    let fx = fixture();
    let host = RecordingHost {
        refuse_open: true,
        ..RecordingHost::default()
    };
    let mut wf = Workflow::new(host);
    let err = wf.run(&fx.config).unwrap_err();
    assert!(matches!(err, WorkflowError::ProjectOpenFailed { .. }));
    assert_eq!(wf.state(), WorkflowState::Failed(Stage::OpenProject));
}

#[test]
fn column_four_is_out_of_range() {
    let fx = fixture();
    let mut wf = Workflow::new(LocalHost::new());
    wf.open_project().unwrap();
    let sheet = wf
        .create_worksheet(&fx.config.worksheet_template, "test")
        .unwrap();
    wf.import_ascii(&sheet, &fx.config.data_file, &ImportOptions::default())
        .unwrap();

    // the header names a fifth column, but only four hold data
    let err = wf
        .build_range(&sheet, &parse_bindings("0:X,1:Y,4:Y").unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::ColumnOutOfRange {
            index: 4,
            columns: 4,
            ..
        }
    ));
    assert_eq!(wf.state(), WorkflowState::Failed(Stage::BuildRange));
}

#[test]
fn plot_and_rescale_twice_gives_same_bounds() {
    let fx = fixture();
    let mut wf = Workflow::new(LocalHost::new());
    wf.open_project().unwrap();
    let sheet = wf
        .create_worksheet(&fx.config.worksheet_template, "test")
        .unwrap();
    wf.import_ascii(&sheet, &fx.config.data_file, &ImportOptions::default())
        .unwrap();
    let range = wf
        .build_range(&sheet, &parse_bindings("0:X,1:Y,3:Y").unwrap())
        .unwrap();
    let layer = wf.create_graph(&fx.config.graph_template).unwrap();

    let first = wf.plot_and_rescale(&layer, &range).unwrap();
    let second = wf.plot_and_rescale(&layer, &range).unwrap();
    assert_eq!(first, second);
    assert_eq!(wf.host().layer(&layer).unwrap().plots.len(), 1);
}

#[test]
fn range_on_empty_columns_fails_to_plot() {
    let fx = fixture();
    // column 2 holds text only, so it has nothing to draw
    std::fs::write(&fx.config.data_file, "1 2 a\n3 4 b\n").unwrap();
    let config = WorkflowConfig {
        bindings: parse_bindings("2:Y").unwrap(),
        import: ImportOptions {
            header_rows: Some(0),
            ..ImportOptions::default()
        },
        ..fx.config.clone()
    };
    let mut wf = Workflow::new(LocalHost::new());
    let err = wf.run(&config).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::PlotCreationFailed { code: -1, .. }
    ));
    assert_eq!(wf.state(), WorkflowState::Failed(Stage::Plot));
    // pages created before the failure are kept
    assert_eq!(wf.host().project().unwrap().graphs.len(), 1);
}

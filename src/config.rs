use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::ImportOptions;
use crate::data::range::{Binding, Role};

/// What to do when the data file cannot be imported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFailurePolicy {
    /// Stop the run.
    #[default]
    Abort,
    /// Log the failure and carry on with whatever the sheet holds.
    Continue,
}

/// Everything one workflow run needs. Missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub worksheet_template: PathBuf,
    pub graph_template: PathBuf,
    pub data_file: PathBuf,
    /// Name of the sheet inside the new workbook.
    pub sheet_name: String,
    pub bindings: Vec<Binding>,
    pub import: ImportOptions,
    /// Extra attempts after a transient file-system error during import.
    pub import_retries: u32,
    pub on_import_failure: ImportFailurePolicy,
    /// Extra directory searched for relative template paths.
    pub template_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            worksheet_template: PathBuf::from("../template/PRF.otw"),
            graph_template: PathBuf::from("../template/PRF_IMG.otp"),
            data_file: PathBuf::from("./test.dat"),
            sheet_name: "test".to_string(),
            bindings: vec![
                Binding::new(0, Role::X),
                Binding::new(1, Role::Y),
                Binding::new(3, Role::Y),
            ],
            import: ImportOptions::default(),
            import_retries: 1,
            on_import_failure: ImportFailurePolicy::Abort,
            template_dir: None,
        }
    }
}

impl WorkflowConfig {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::workflow::WorkflowState;

// ---------------------------------------------------------------------------
// Stage – which step of the pipeline an error belongs to
// ---------------------------------------------------------------------------

/// The pipeline step that was running when an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OpenProject,
    CreateWorksheet,
    Import,
    BuildRange,
    CreateGraph,
    Plot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OpenProject => "open project",
            Stage::CreateWorksheet => "create worksheet",
            Stage::Import => "import",
            Stage::BuildRange => "build range",
            Stage::CreateGraph => "create graph",
            Stage::Plot => "plot",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// HostError – failures reported by a host implementation
// ---------------------------------------------------------------------------

/// Errors raised at the host boundary.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("no such worksheet: {0}")]
    UnknownWorksheet(String),

    #[error("no such graph layer: {0}")]
    UnknownLayer(String),

    #[error("no project is open")]
    NoProject,

    #[error("the open project has unsaved changes")]
    UnsavedChanges,

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
}

impl HostError {
    /// File-system failures may go away on a second attempt; parse failures won't.
    pub fn is_transient(&self) -> bool {
        matches!(self, HostError::Io { .. })
    }
}

// ---------------------------------------------------------------------------
// WorkflowError – what the pipeline surfaces to its caller
// ---------------------------------------------------------------------------

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("[{}] failed to open project: {source}", Stage::OpenProject)]
    ProjectOpenFailed {
        #[source]
        source: HostError,
    },

    #[error("[{stage}] template not found: {}", .path.display())]
    TemplateNotFound { stage: Stage, path: PathBuf },

    #[error("[{}] import of {} failed: {source}", Stage::Import, .path.display())]
    ImportFailed {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    #[error(
        "[{}] column {index} is out of range for {sheet} ({columns} columns)",
        Stage::BuildRange
    )]
    ColumnOutOfRange {
        sheet: String,
        index: usize,
        columns: usize,
    },

    #[error("[{}] plot creation failed on {layer} (host returned {code})", Stage::Plot)]
    PlotCreationFailed { layer: String, code: i32 },

    #[error("[{stage}] cannot run in state {actual}")]
    OutOfOrder { stage: Stage, actual: WorkflowState },

    #[error("[{stage}] {source}")]
    Host {
        stage: Stage,
        #[source]
        source: HostError,
    },
}

impl WorkflowError {
    /// The stage this error aborted.
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::ProjectOpenFailed { .. } => Stage::OpenProject,
            WorkflowError::TemplateNotFound { stage, .. } => *stage,
            WorkflowError::ImportFailed { .. } => Stage::Import,
            WorkflowError::ColumnOutOfRange { .. } => Stage::BuildRange,
            WorkflowError::PlotCreationFailed { .. } => Stage::Plot,
            WorkflowError::OutOfOrder { stage, .. } => *stage,
            WorkflowError::Host { stage, .. } => *stage,
        }
    }

    /// Map a host error raised while running `stage`.
    pub(crate) fn from_host(stage: Stage, err: HostError) -> Self {
        match err {
            HostError::TemplateNotFound { path } => WorkflowError::TemplateNotFound { stage, path },
            other => WorkflowError::Host {
                stage,
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_errors_keep_their_stage() {
        let err = WorkflowError::from_host(
            Stage::CreateGraph,
            HostError::TemplateNotFound {
                path: PathBuf::from("missing.otp"),
            },
        );
        assert_eq!(err.stage(), Stage::CreateGraph);
        assert!(matches!(err, WorkflowError::TemplateNotFound { .. }));
        assert!(err.to_string().starts_with("[create graph]"));
    }

    #[test]
    fn only_io_errors_are_transient() {
        let io = HostError::Io {
            path: PathBuf::from("a.dat"),
            source: std::io::Error::new(std::io::ErrorKind::Interrupted, "busy"),
        };
        let parse = HostError::Parse {
            path: PathBuf::from("a.dat"),
            reason: "no data rows".into(),
        };
        assert!(io.is_transient());
        assert!(!parse.is_transient());
    }
}

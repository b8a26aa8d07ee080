//! Import ASCII data into a worksheet, bind columns to plot roles and draw
//! them on a graph layer created from a template.
//!
//! The application side (project, pages, import, plotting) sits behind the
//! [`host::Host`] trait; [`workflow::Workflow`] sequences the stages and
//! turns every host status into a typed error.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod host;
pub mod project;
pub mod workflow;

pub use config::{ImportFailurePolicy, WorkflowConfig};
pub use error::{HostError, Stage, WorkflowError, WorkflowResult};
pub use host::{Host, LocalHost};
pub use workflow::{PlotHandle, Workflow, WorkflowState};

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::model::Worksheet;
use crate::error::{WorkflowError, WorkflowResult};

// ---------------------------------------------------------------------------
// Role / Binding
// ---------------------------------------------------------------------------

/// What a column contributes to a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    X,
    Y,
    /// Y data drawn against the right-hand axis.
    Y2,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::X => f.write_str("X"),
            Role::Y => f.write_str("Y"),
            Role::Y2 => f.write_str("Y2"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Role::X),
            "Y" => Ok(Role::Y),
            "Y2" => Ok(Role::Y2),
            other => bail!("unknown column role '{other}' (expected X, Y or Y2)"),
        }
    }
}

/// A `(column_index, role)` pair. Serialized as `"COLUMN:ROLE"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Binding {
    pub column: usize,
    pub role: Role,
}

impl Binding {
    pub const fn new(column: usize, role: Role) -> Self {
        Binding { column, role }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.role)
    }
}

impl FromStr for Binding {
    type Err = anyhow::Error;

    /// `"3:Y"` → column 3 bound as Y.
    fn from_str(s: &str) -> Result<Self> {
        let (col, role) = s
            .split_once(':')
            .with_context(|| format!("binding '{s}' is not of the form COLUMN:ROLE"))?;
        let column = col
            .trim()
            .parse::<usize>()
            .with_context(|| format!("binding '{s}': '{col}' is not a column index"))?;
        Ok(Binding::new(column, role.parse()?))
    }
}

impl TryFrom<String> for Binding {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Binding> for String {
    fn from(b: Binding) -> Self {
        b.to_string()
    }
}

/// Parse a comma-separated binding list such as `0:X,1:Y,3:Y`.
pub fn parse_bindings(s: &str) -> Result<Vec<Binding>> {
    s.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(str::parse)
        .collect()
}

// ---------------------------------------------------------------------------
// DataRange
// ---------------------------------------------------------------------------

/// An ordered view binding columns of one worksheet to plot roles.
/// Holds indices only; the data stays in the worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRange {
    /// Reference of the sheet, e.g. `[Book1]Sheet1`.
    pub sheet: String,
    bindings: Vec<Binding>,
}

impl DataRange {
    pub fn new(sheet: impl Into<String>) -> Self {
        DataRange {
            sheet: sheet.into(),
            bindings: Vec::new(),
        }
    }

    /// Build a range over `worksheet`, checking every column exists.
    pub fn build(sheet: &str, worksheet: &Worksheet, bindings: &[Binding]) -> WorkflowResult<Self> {
        let mut range = DataRange::new(sheet);
        for binding in bindings {
            range.add(worksheet, *binding)?;
        }
        Ok(range)
    }

    /// Append one binding. Repeated Y roles are allowed.
    pub fn add(&mut self, worksheet: &Worksheet, binding: Binding) -> WorkflowResult<()> {
        let columns = worksheet.column_count();
        if binding.column >= columns {
            return Err(WorkflowError::ColumnOutOfRange {
                sheet: self.sheet.clone(),
                index: binding.column,
                columns,
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Pair each Y/Y2 column with the nearest preceding X column.
    /// A Y with no X before it is plotted against the row number.
    pub fn series(&self) -> Vec<SeriesSpec> {
        let mut current_x = None;
        let mut out = Vec::new();
        for b in &self.bindings {
            match b.role {
                Role::X => current_x = Some(b.column),
                Role::Y | Role::Y2 => out.push(SeriesSpec {
                    x: current_x,
                    y: b.column,
                    right_axis: b.role == Role::Y2,
                }),
            }
        }
        out
    }
}

impl fmt::Display for DataRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sheet)?;
        for (i, b) in self.bindings.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "," })?;
            write!(f, "{b}")?;
        }
        Ok(())
    }
}

/// One drawable XY series derived from a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub x: Option<usize>,
    pub y: usize,
    pub right_axis: bool,
}

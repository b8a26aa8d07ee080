use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single worksheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as produced by the ASCII importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Classify a raw token. Blank tokens become `Empty`.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return CellValue::Empty;
        }
        match token.parse::<f64>() {
            Ok(v) => CellValue::Number(v),
            Err(_) => CellValue::Text(token.to_string()),
        }
    }

    /// Numeric value, if the cell holds a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// One worksheet column. `cells.len()` always equals the sheet's row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Short name (`A`, `B`, …).
    pub name: String,
    /// Long name taken from the file's header line, if any.
    pub long_name: Option<String>,
    pub kind: ColumnKind,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(index: usize, long_name: Option<String>, cells: Vec<CellValue>) -> Self {
        let kind = if cells
            .iter()
            .all(|c| matches!(c, CellValue::Number(_) | CellValue::Empty))
        {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        };
        Column {
            name: short_name(index),
            long_name,
            kind,
            cells,
        }
    }

    /// Finite numeric values paired with their row index.
    pub fn numbers(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(row, c)| c.as_f64().map(|v| (row, v)))
    }
}

/// Spreadsheet-style column letters: 0 → A, 25 → Z, 26 → AA.
pub fn short_name(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

// ---------------------------------------------------------------------------
// Table – what an import produces
// ---------------------------------------------------------------------------

/// Parsed contents of a data file, ready to be written into a worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub long_names: Vec<Option<String>>,
    /// Row-major cells; rows may be ragged.
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Widest data row determines the column count. Header names past it are dropped.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Transpose into padded columns.
    pub fn into_columns(self) -> Vec<Column> {
        let width = self.column_count();
        let height = self.rows.len();
        let mut cells: Vec<Vec<CellValue>> = (0..width).map(|_| Vec::with_capacity(height)).collect();
        for row in self.rows {
            let len = row.len();
            for (col, value) in row.into_iter().enumerate() {
                cells[col].push(value);
            }
            for column in cells.iter_mut().skip(len) {
                column.push(CellValue::Empty);
            }
        }
        let mut long_names = self.long_names;
        long_names.resize(width, None);
        cells
            .into_iter()
            .zip(long_names)
            .enumerate()
            .map(|(i, (cells, long_name))| Column::new(i, long_name, cells))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

/// A named table of ordered, typed columns living inside a worksheet page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Replace the sheet contents with an imported table.
    pub fn fill(&mut self, table: Table) {
        self.columns = table.into_columns();
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.cells.len())
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }
}

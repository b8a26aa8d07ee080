use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{CellValue, Table};
use crate::error::HostError;

/// How many leading lines are inspected when sniffing a file's layout.
const SNIFF_LINES: usize = 50;

/// Progress is reported every this many rows when enabled.
const PROGRESS_EVERY: usize = 1000;

// ---------------------------------------------------------------------------
// Import options
// ---------------------------------------------------------------------------

/// Column separator of an ASCII data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// Any run of spaces and tabs.
    Whitespace,
    Tab,
    Comma,
    Semicolon,
}

impl Delimiter {
    fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Whitespace => None,
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Comma => Some(b','),
            Delimiter::Semicolon => Some(b';'),
        }
    }

    fn split(self, line: &str) -> Vec<&str> {
        match self.byte() {
            None => line.split_whitespace().collect(),
            Some(b) => line.split(b as char).map(str::trim).collect(),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delimiter::Whitespace => "whitespace",
            Delimiter::Tab => "tab",
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
        };
        f.write_str(name)
    }
}

impl FromStr for Delimiter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "whitespace" | "space" | "ws" => Ok(Delimiter::Whitespace),
            "tab" | "\\t" => Ok(Delimiter::Tab),
            "comma" | "," => Ok(Delimiter::Comma),
            "semicolon" | ";" => Ok(Delimiter::Semicolon),
            other => bail!("unknown delimiter '{other}'"),
        }
    }
}

/// User-facing import options. Unset fields are sniffed from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub delimiter: Option<Delimiter>,
    pub header_rows: Option<usize>,
    /// Report import progress through the log.
    pub show_progress: bool,
}

/// Fully resolved description of one import. Consumed by the import itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub path: PathBuf,
    pub delimiter: Delimiter,
    pub header_rows: usize,
    pub show_progress: bool,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Inspect `path` and resolve the import layout, letting explicit options win.
pub fn read_import_spec(path: &Path, options: &ImportOptions) -> Result<ImportSpec, HostError> {
    let text = read_text(path)?;
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(&text));
    let header_rows = options
        .header_rows
        .unwrap_or_else(|| sniff_header_rows(&text, delimiter));
    debug!(
        "import spec for {}: delimiter={delimiter}, header_rows={header_rows}",
        path.display()
    );
    Ok(ImportSpec {
        path: path.to_path_buf(),
        delimiter,
        header_rows,
        show_progress: options.show_progress,
    })
}

/// Read the file described by `spec` into a table.
pub fn read_table(spec: ImportSpec) -> Result<Table, HostError> {
    let text = read_text(&spec.path)?;
    parse_table(&text, &spec).map_err(|e| HostError::Parse {
        path: spec.path.clone(),
        reason: format!("{e:#}"),
    })
}

fn read_text(path: &Path) -> Result<String, HostError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::InvalidData {
            HostError::Parse {
                path: path.to_path_buf(),
                reason: "file is not valid UTF-8 text".into(),
            }
        } else {
            HostError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Sniffing
// ---------------------------------------------------------------------------

/// The first character delimiter that splits some line into numbers wins.
/// Header and comment lines don't vote, so `# x, y` over space-separated
/// data stays whitespace.
fn sniff_delimiter(text: &str) -> Delimiter {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    [Delimiter::Tab, Delimiter::Comma, Delimiter::Semicolon]
        .into_iter()
        .find(|d| {
            d.byte().is_some_and(|b| {
                sample
                    .iter()
                    .any(|l| l.contains(b as char) && is_numeric_line(l, *d))
            })
        })
        .unwrap_or(Delimiter::Whitespace)
}

/// Lines before the first all-numeric line are header lines.
fn sniff_header_rows(text: &str, delimiter: Delimiter) -> usize {
    let mut lines = text.lines().take(SNIFF_LINES).enumerate();
    lines
        .find(|(_, line)| is_numeric_line(line, delimiter))
        .map_or_else(|| text.lines().count(), |(i, _)| i)
}

fn is_numeric_line(line: &str, delimiter: Delimiter) -> bool {
    let tokens = delimiter.split(line);
    !line.trim().is_empty()
        && tokens
            .iter()
            .filter(|t| !t.is_empty())
            .all(|t| t.parse::<f64>().is_ok())
        && tokens.iter().any(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_table(text: &str, spec: &ImportSpec) -> Result<Table> {
    let header: Vec<&str> = text.lines().take(spec.header_rows).collect();
    let long_names: Vec<Option<String>> = header
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| {
            spec.delimiter
                .split(l.trim_start().trim_start_matches('#'))
                .into_iter()
                .map(|t| t.trim_end_matches([',', ';']))
                .map(|t| (!t.is_empty()).then(|| t.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let body: Vec<&str> = text
        .lines()
        .skip(spec.header_rows)
        .filter(|l| !l.trim().is_empty())
        .collect();
    if body.is_empty() {
        bail!("no data rows after {} header line(s)", spec.header_rows);
    }

    let mut progress = Progress::new(&spec.path, body.len(), spec.show_progress);
    let rows: Vec<Vec<CellValue>> = match spec.delimiter.byte() {
        None => body
            .iter()
            .map(|l| {
                progress.tick();
                l.split_whitespace().map(CellValue::parse).collect()
            })
            .collect(),
        Some(b) => parse_delimited(&body.join("\n"), b, &mut progress)?,
    };
    progress.finish();

    let table = Table { long_names, rows };
    if !table
        .rows
        .iter()
        .flatten()
        .any(|c| matches!(c, CellValue::Number(_)))
    {
        bail!("no numeric values found");
    }
    Ok(table)
}

fn parse_delimited(
    body: &str,
    delimiter: u8,
    progress: &mut Progress<'_>,
) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("data row {row_no}"))?;
        rows.push(record.iter().map(CellValue::parse).collect());
        progress.tick();
    }
    Ok(rows)
}

/// Logs every [`PROGRESS_EVERY`] rows as they are parsed.
struct Progress<'a> {
    path: &'a Path,
    total: usize,
    enabled: bool,
    done: usize,
    reports: usize,
}

impl<'a> Progress<'a> {
    fn new(path: &'a Path, total: usize, enabled: bool) -> Self {
        Progress {
            path,
            total,
            enabled,
            done: 0,
            reports: 0,
        }
    }

    fn tick(&mut self) {
        self.done += 1;
        if self.enabled && self.done % PROGRESS_EVERY == 0 {
            self.report();
        }
    }

    fn finish(&mut self) {
        if self.enabled && self.done % PROGRESS_EVERY != 0 {
            self.report();
        }
    }

    fn report(&mut self) {
        self.reports += 1;
        debug!(
            "importing {}: {}/{} rows",
            self.path.display(),
            self.done,
            self.total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn load(contents: &str, options: &ImportOptions) -> Result<Table, HostError> {
        let f = write_temp(contents);
        let spec = read_import_spec(f.path(), options)?;
        read_table(spec)
    }

    #[test]
    fn sniffs_whitespace_and_header() {
        let f = write_temp("2Theta  Yobs  Ycal\n10.0  5  4\n10.1  6  5\n");
        let spec = read_import_spec(f.path(), &ImportOptions::default()).unwrap();
        assert_eq!(spec.delimiter, Delimiter::Whitespace);
        assert_eq!(spec.header_rows, 1);

        let table = read_table(spec).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.long_names[2].as_deref(), Some("Ycal"));
        assert_eq!(table.rows[1][0], CellValue::Number(10.1));
    }

    #[test]
    fn sniffs_tab_and_comma() {
        let f = write_temp("a\tb\n1\t2\n");
        let spec = read_import_spec(f.path(), &ImportOptions::default()).unwrap();
        assert_eq!(spec.delimiter, Delimiter::Tab);

        let table = load("1,2,3\n4,5,6\n", &ImportOptions::default()).unwrap();
        assert_eq!(table.column_count(), 3);
        assert!(table.long_names.is_empty());
    }

    #[test]
    fn explicit_options_override_sniffing() {
        let options = ImportOptions {
            delimiter: Some(Delimiter::Semicolon),
            header_rows: Some(2),
            show_progress: true,
        };
        let table = load("title\nx;y\n1;2\n3;4\n", &options).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.long_names[1].as_deref(), Some("y"));
    }

    #[test]
    fn header_only_file_is_a_parse_error() {
        let err = load("x y\nfoo bar\n", &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, HostError::Parse { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_import_spec(Path::new("/nonexistent/test.dat"), &ImportOptions::default())
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn binary_file_is_a_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xff, 0xfe, 0x00, 0x81]).unwrap();
        let err = read_import_spec(f.path(), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, HostError::Parse { .. }));
    }

    #[test]
    fn comment_header_with_commas_keeps_whitespace_data() {
        let f = write_temp("# 2Theta, Yobs, Ycal, diff\n1 2 3 4\n5 6 7 8\n");
        let spec = read_import_spec(f.path(), &ImportOptions::default()).unwrap();
        assert_eq!(spec.delimiter, Delimiter::Whitespace);
        assert_eq!(spec.header_rows, 1);

        let table = read_table(spec).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.long_names[0].as_deref(), Some("2Theta"));
        assert_eq!(table.long_names[3].as_deref(), Some("diff"));
    }

    #[test]
    fn header_naming_more_columns_than_the_data_has() {
        let table = load(
            "2Theta Yobs Ycal Yobs-Ycal Backg\n1 2 3 4\n5 6 7 8\n",
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.long_names.len(), 5);
    }

    #[test]
    fn progress_is_reported_while_rows_are_parsed() {
        let path = Path::new("big.dat");
        let mut progress = Progress::new(path, 2500, true);
        for _ in 0..2500 {
            progress.tick();
        }
        assert_eq!(progress.reports, 2);
        progress.finish();
        assert_eq!(progress.reports, 3);

        let mut quiet = Progress::new(path, 2500, false);
        for _ in 0..2500 {
            quiet.tick();
        }
        quiet.finish();
        assert_eq!(quiet.reports, 0);

        let mut body = String::new();
        for i in 0..2500 {
            body.push_str(&format!("{i},{}\n", i * 2));
        }
        let mut progress = Progress::new(path, 2500, true);
        let rows = parse_delimited(&body, b',', &mut progress).unwrap();
        assert_eq!(rows.len(), 2500);
        assert_eq!(progress.done, 2500);
        assert_eq!(progress.reports, 2);
    }

    #[test]
    fn parses_delimiter_names() {
        assert_eq!("TAB".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!(",".parse::<Delimiter>().unwrap(), Delimiter::Comma);
        assert!("pipe".parse::<Delimiter>().is_err());
    }
}

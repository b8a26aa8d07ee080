//! FullProf `.prf` profile → tab-delimited XY table.
//!
//! A `.prf` file has free-form preamble lines, a header line containing
//! `2Theta`, one row per profile point (`2θ Yobs Ycal Yobs-Ycal Backg …`) and,
//! starting at the first line containing `(`, the reflection list
//! (`2θ phase … (h k l) …`).
//!
//! The written table repeats 2θ before every value column
//! (`2Theta Yobs 2Theta Ycal 2Theta Yobs-Ycal`), so each curve is its own
//! X/Y pair and the default `0:X,1:Y,3:Y` bindings draw Yobs and Ycal.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;

/// File name the converted table gets next to its source.
pub const DEFAULT_OUTPUT_NAME: &str = "origin.dat";

#[derive(Debug, Clone, PartialEq)]
pub struct PrfProfile {
    /// Names of the profile columns, `2Theta` first.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// `(2θ, tick mark)` per reflection.
    pub reflections: Vec<(f64, f64)>,
}

/// Parse the text of a `.prf` file.
pub fn parse_prf(text: &str) -> Result<PrfProfile> {
    let lines: Vec<&str> = text.lines().collect();
    let header_at = lines
        .iter()
        .position(|l| l.contains("2Theta"))
        .context("no '2Theta' header line")?;
    let header: Vec<&str> = lines[header_at].split_whitespace().collect();

    let mut rows = Vec::new();
    let mut next = header_at + 1;
    while let Some(line) = lines.get(next) {
        if line.contains('(') {
            break;
        }
        next += 1;
        if line.trim().is_empty() {
            continue;
        }
        let values = parse_numbers(line).with_context(|| format!("profile line {next}"))?;
        if values.len() < 3 {
            bail!("profile line {next} has {} values, need at least 3", values.len());
        }
        // trailing background column is not carried over
        rows.push(values[..values.len() - 1].to_vec());
    }
    let Some(first) = rows.first() else {
        bail!("no profile rows after the '2Theta' header");
    };
    let width = first.len();
    if let Some(bad) = rows.iter().position(|r| r.len() != width) {
        bail!(
            "profile row {bad} has {} values, expected {}",
            rows[bad].len() + 1,
            width + 1
        );
    }

    // tick baseline sits at a third of the first point's penultimate value
    let baseline = first[width - 1] / 3.0;
    let reflections = lines[next..]
        .iter()
        .filter_map(|l| parse_reflection(l, baseline))
        .collect();

    let columns = (0..width)
        .map(|i| {
            header
                .get(i)
                .map(|h| h.to_string())
                .unwrap_or_else(|| format!("Y{i}"))
        })
        .collect();

    Ok(PrfProfile {
        columns,
        rows,
        reflections,
    })
}

fn parse_numbers(line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .with_context(|| format!("'{t}' is not a number"))
        })
        .collect()
}

/// `2θ phase …` → `(2θ, baseline + phase)`. Lines that don't fit are skipped.
fn parse_reflection(line: &str, baseline: f64) -> Option<(f64, f64)> {
    let mut tokens = line.split_whitespace();
    let pos = tokens.next()?.parse::<f64>().ok()?;
    let phase = tokens.next()?.parse::<i64>().ok()?;
    Some((pos, baseline + phase as f64))
}

impl PrfProfile {
    /// Write the profile as a tab-delimited table of `(2θ, value)` column
    /// pairs with one header line.
    pub fn write_xy<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(out);

        let Some((x_name, names)) = self.columns.split_first() else {
            bail!("profile has no columns");
        };
        let mut header: Vec<String> = names
            .iter()
            .flat_map(|name| [x_name.clone(), name.clone()])
            .collect();
        let width = header.len();
        if !self.reflections.is_empty() {
            header.push("Bragg_2Theta".into());
            header.push("Bragg_Mark".into());
        }
        writer.write_record(&header)?;

        let height = self.rows.len().max(self.reflections.len());
        for i in 0..height {
            let mut record: Vec<String> = match self.rows.get(i).and_then(|r| r.split_first()) {
                Some((x, values)) => values
                    .iter()
                    .flat_map(|v| [x.to_string(), v.to_string()])
                    .collect(),
                None => vec![String::new(); width],
            };
            if let Some((pos, mark)) = self.reflections.get(i) {
                record.push(pos.to_string());
                record.push(mark.to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Where `convert` writes when no output path is given: `origin.dat` beside the source.
pub fn default_output(prf: &Path) -> PathBuf {
    prf.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_OUTPUT_NAME)
}

/// Convert `prf` into a table at `out`. Returns the number of profile rows.
pub fn convert(prf: &Path, out: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(prf)
        .with_context(|| format!("reading {}", prf.display()))?;
    let profile = parse_prf(&text).with_context(|| format!("parsing {}", prf.display()))?;
    let file = std::fs::File::create(out)
        .with_context(|| format!("creating {}", out.display()))?;
    profile.write_xy(std::io::BufWriter::new(file))?;
    info!(
        "converted {} → {} ({} points, {} reflections)",
        prf.display(),
        out.display(),
        profile.rows.len(),
        profile.reflections.len()
    );
    Ok(profile.rows.len())
}

use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::color::{generate_palette, Rgb};
use crate::data::model::Worksheet;
use crate::data::range::{DataRange, SeriesSpec};

/// Returned by [`GraphLayer::add_plot`] when nothing in the range can be drawn.
pub const PLOT_FAILED: i32 = -1;

// ---------------------------------------------------------------------------
// Axis bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut it = values.into_iter();
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        // a single value still needs a visible span
        if min == max {
            return Some(Interval {
                min: min - 0.5,
                max: max + 0.5,
            });
        }
        Some(Interval { min, max })
    }
}

/// Axis extents of a layer, as left by the last rescale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub x: Interval,
    pub y: Interval,
    /// Right-hand axis, present only when a Y2 series is bound.
    pub y2: Option<Interval>,
}

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(flatten)]
    pub spec: SeriesSpec,
    pub color: Rgb,
}

impl Series {
    /// Finite `(x, y)` points. Without an X column the 1-based row number is used.
    pub fn points<'a>(&self, sheet: &'a Worksheet) -> impl Iterator<Item = (f64, f64)> + 'a {
        let spec = self.spec;
        let ys = sheet.column(spec.y);
        let xs = spec.x.and_then(|x| sheet.column(x));
        ys.into_iter().flat_map(move |ys| {
            ys.numbers().filter_map(move |(row, y)| match (spec.x, xs) {
                (None, _) => Some((row as f64 + 1.0, y)),
                (Some(_), Some(xs)) => xs.cells.get(row)?.as_f64().map(|x| (x, y)),
                (Some(_), None) => None,
            })
        })
    }
}

/// One plot: a data range and the series drawn from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub range: DataRange,
    pub series: Vec<Series>,
}

// ---------------------------------------------------------------------------
// GraphLayer / GraphPage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLayer {
    pub name: String,
    pub plots: Vec<Plot>,
    pub bounds: Option<AxisBounds>,
}

impl GraphLayer {
    pub fn new(name: impl Into<String>) -> Self {
        GraphLayer {
            name: name.into(),
            plots: Vec::new(),
            bounds: None,
        }
    }

    /// Bind `range` (whose data lives in `sheet`) to this layer.
    ///
    /// Returns the zero-based plot index, or [`PLOT_FAILED`] when the range
    /// has no drawable points. Binding a range that is already plotted
    /// returns the existing index.
    pub fn add_plot(&mut self, range: &DataRange, sheet: &Worksheet) -> i32 {
        if let Some(existing) = self.plots.iter().position(|p| &p.range == range) {
            debug!("{}: range {range} already plotted as #{existing}", self.name);
            return existing as i32;
        }

        let specs = range.series();
        let colors = generate_palette(specs.len());
        let series: Vec<Series> = specs
            .into_iter()
            .zip(colors)
            .map(|(spec, color)| Series { spec, color })
            .collect();

        if !series.iter().any(|s| s.points(sheet).next().is_some()) {
            return PLOT_FAILED;
        }

        self.plots.push(Plot {
            range: range.clone(),
            series,
        });
        (self.plots.len() - 1) as i32
    }

    /// Recompute axis bounds from every bound plot. `lookup` resolves a
    /// sheet reference to its worksheet.
    pub fn rescale<'a, F>(&mut self, lookup: F) -> Option<AxisBounds>
    where
        F: Fn(&str) -> Option<&'a Worksheet>,
    {
        self.bounds = compute_bounds(&self.plots, lookup);
        self.bounds
    }
}

fn compute_bounds<'a, F>(plots: &[Plot], lookup: F) -> Option<AxisBounds>
where
    F: Fn(&str) -> Option<&'a Worksheet>,
{
    let mut left = Vec::new();
    let mut right = Vec::new();
    for plot in plots {
        let Some(sheet) = lookup(&plot.range.sheet) else {
            continue;
        };
        for series in &plot.series {
            let target = if series.spec.right_axis {
                &mut right
            } else {
                &mut left
            };
            target.extend(series.points(sheet));
        }
    }

    let x = Interval::of(left.iter().chain(&right).map(|p| p.0))?;
    let y = Interval::of(left.iter().map(|p| p.1));
    let y2 = Interval::of(right.iter().map(|p| p.1));
    Some(AxisBounds {
        x,
        // a layer with only Y2 data still needs a left axis
        y: y.or(y2)?,
        y2,
    })
}

/// Name of the layer every new graph page starts with.
pub const DEFAULT_LAYER: &str = "Layer1";

/// A graph page created from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPage {
    pub name: String,
    pub template: PathBuf,
    pub layers: Vec<GraphLayer>,
    pub active_layer: usize,
}

impl GraphPage {
    pub fn new(name: impl Into<String>, template: impl Into<PathBuf>) -> Self {
        GraphPage {
            name: name.into(),
            template: template.into(),
            layers: vec![GraphLayer::new(DEFAULT_LAYER)],
            active_layer: 0,
        }
    }

    /// Reference of the active layer, e.g. `[Graph1]Layer1`.
    /// Falls back to the last layer, or to `Layer1` on a page without layers.
    pub fn active_layer_ref(&self) -> String {
        let layer = self
            .layers
            .get(self.active_layer)
            .or_else(|| self.layers.last())
            .map_or(DEFAULT_LAYER, |l| l.name.as_str());
        format!("[{}]{}", self.name, layer)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut GraphLayer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    pub fn layer(&self, name: &str) -> Option<&GraphLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}

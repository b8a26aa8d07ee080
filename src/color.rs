use std::fmt;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Series colours
// ---------------------------------------------------------------------------

/// An 8-bit sRGB colour assigned to a plotted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Olive, used when a plot holds a single series.
    pub const OLIVE: Rgb = Rgb(130, 130, 0);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    match n {
        0 => Vec::new(),
        1 => vec![Rgb::OLIVE],
        _ => (0..n)
            .map(|i| {
                let hue = (i as f32 / n as f32) * 360.0;
                let hsl = Hsl::new(hue, 0.75, 0.55);
                let rgb: Srgb = hsl.into_color();
                Rgb(
                    (rgb.red * 255.0) as u8,
                    (rgb.green * 255.0) as u8,
                    (rgb.blue * 255.0) as u8,
                )
            })
            .collect(),
    }
}

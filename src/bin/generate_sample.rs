//! Writes a synthetic powder-diffraction table (`2Theta Yobs Ycal Yobs-Ycal`)
//! for trying out `plotbook run`.
//!
//! Usage: `generate_sample [OUTPUT] [POINTS]` (defaults: `test.dat`, 10).

use std::io::Write;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn pattern(two_theta: f64, peaks: &[(f64, f64, f64)], background: f64) -> f64 {
    background
        + peaks
            .iter()
            .map(|&(mu, sigma, amp)| gaussian(two_theta, mu, sigma, amp))
            .sum::<f64>()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "test.dat".to_string());
    let points: usize = args
        .next()
        .map(|s| s.parse().expect("POINTS must be a positive integer"))
        .unwrap_or(10);

    let mut rng = SimpleRng::new(42);

    // LaB6-like reflections: (2θ, width, height)
    let peaks = [(21.36, 0.05, 900.0), (30.38, 0.05, 1500.0), (37.44, 0.06, 600.0)];
    let start = 20.0;
    let end = 40.0;
    let step = if points > 1 {
        (end - start) / (points - 1) as f64
    } else {
        0.0
    };

    let file = std::fs::File::create(&output_path).expect("Failed to create output file");
    let mut out = std::io::BufWriter::new(file);
    writeln!(out, "2Theta\tYobs\tYcal\tYobs-Ycal").expect("Failed to write header");

    for i in 0..points {
        let two_theta = start + i as f64 * step;
        let ycal = pattern(two_theta, &peaks, 100.0);
        let yobs = ycal + rng.gauss(0.0, ycal.sqrt());
        writeln!(
            out,
            "{two_theta:.4}\t{yobs:.3}\t{ycal:.3}\t{:.3}",
            yobs - ycal
        )
        .expect("Failed to write row");
    }
    out.flush().expect("Failed to flush output");

    println!("Wrote {points} points (4 columns) to {output_path}");
}

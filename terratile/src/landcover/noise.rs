//! Seamlessly tiling coherent noise
//!
//! Fractal noise over a fixed reference grid, periodic on the unit
//! square so that adjacent tiles evaluated at the reference level see
//! a continuous field with no seams. Periodicity comes from sampling
//! 4-D Perlin noise on the surface of a torus: each axis of the unit
//! square maps to a circle, so u and u+1 land on the same point.

use std::f64::consts::TAU;

use noise::{NoiseFn, Perlin};

/// Fractal parameters matching the coverage warping field.
const OCTAVES: u32 = 8;
const FREQUENCY: f64 = 4.0;
const PERSISTENCE: f64 = 0.8;
const LACUNARITY: f64 = 2.2;

/// Coherent 2-D noise, periodic with period 1 on both axes, output
/// normalized to [0, 1]. Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct TiledNoise {
    perlin: Perlin,
}

impl TiledNoise {
    /// Creates a noise field from a seed.
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
        }
    }

    /// Samples the field at (u, v).
    pub fn get(&self, u: f64, v: f64) -> f64 {
        // Wrap before embedding so u = 0 and u = 1 produce the same
        // bits: sin(TAU) is not exactly zero in floating point, which
        // would land the two edges in different lattice cells.
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;
        let mut frequency = FREQUENCY;

        for _ in 0..OCTAVES {
            // Torus embedding: scaling the circle by the frequency
            // changes feature size without changing the period, which
            // stays exactly 1 on both axes.
            let r = 1.0 / TAU;
            let point = [
                (u * TAU).cos() * r * frequency,
                (u * TAU).sin() * r * frequency,
                (v * TAU).cos() * r * frequency,
                (v * TAU).sin() * r * frequency,
            ];
            sum += self.perlin.get(point) * amplitude;
            max_amplitude += amplitude;
            amplitude *= PERSISTENCE;
            frequency *= LACUNARITY;
        }

        // Normalize [-1, 1] fractal sum into [0, 1].
        ((sum / max_amplitude + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

use itertools::iproduct;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::Uniform;

use crate::error::{Error, Result};

/// How candidate initial conditions are drawn from the rectangular bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Uniformly at random per axis.
    #[default]
    Random,
    /// A regular 3D meshgrid covering the bounds.
    Grid,
}

/// Per-axis `(min, max)` bounds. An axis with `min == max` is pinned.
pub type AxisLimits = [(f64, f64); 3];

/// Draws `count` vectors from the given bounds.
pub fn sample_vectors(
    limits: &AxisLimits,
    count: usize,
    mode: SamplingMode,
) -> Result<Vec<Vector3<f64>>> {
    for &(min, max) in limits {
        if min > max {
            return Err(Error::InvalidParameter(format!(
                "axis limits must satisfy min <= max, got ({min}, {max})"
            )));
        }
    }
    match mode {
        SamplingMode::Random => sample_random(limits, count),
        SamplingMode::Grid => Ok(sample_grid(limits, count)),
    }
}

fn sample_random(limits: &AxisLimits, count: usize) -> Result<Vec<Vector3<f64>>> {
    let mut rng = rand::rng();
    let ranges: Vec<Uniform<f64>> = limits
        .iter()
        .map(|&(min, max)| {
            Uniform::new_inclusive(min, max)
                .map_err(|e| Error::InvalidParameter(format!("axis limits ({min}, {max}): {e}")))
        })
        .collect::<Result<_>>()?;

    Ok((0..count)
        .map(|_| {
            Vector3::new(
                rng.sample(&ranges[0]),
                rng.sample(&ranges[1]),
                rng.sample(&ranges[2]),
            )
        })
        .collect())
}

fn sample_grid(limits: &AxisLimits, count: usize) -> Vec<Vector3<f64>> {
    // Pinned axes get a single tick; the varying axes share the count so
    // the full grid has at least `count` nodes.
    let varying = limits.iter().filter(|&&(min, max)| min < max).count();
    let ticks_per_axis = if varying == 0 {
        1
    } else {
        (count as f64).powf(1.0 / varying as f64).ceil() as usize
    };

    let axes: Vec<Vec<f64>> = limits
        .iter()
        .map(|&(min, max)| {
            if min == max {
                vec![min]
            } else {
                linspace(min, max, ticks_per_axis)
            }
        })
        .collect();

    iproduct!(axes[0].iter(), axes[1].iter(), axes[2].iter())
        .map(|(&x, &y, &z)| Vector3::new(x, y, z))
        .take(count)
        .collect()
}

fn linspace(min: f64, max: f64, ticks: usize) -> Vec<f64> {
    if ticks <= 1 {
        return vec![(min + max) / 2.0];
    }
    (0..ticks)
        .map(|i| min + (max - min) * i as f64 / (ticks - 1) as f64)
        .collect()
}

//! Grid-search fit of the linear transport model `Q(a) = Q(a0) + m·(a − a0)/R`.

use std::collections::BTreeMap;

use granflow_core::{ErrorInfo, FlowError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::StatTable;

/// Closed interval and sample count of the candidate resistances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResistanceGrid {
    /// Smallest candidate.
    pub start: f64,
    /// Largest candidate.
    pub stop: f64,
    /// Number of equally spaced candidates, endpoints included.
    pub samples: usize,
}

impl Default for ResistanceGrid {
    fn default() -> Self {
        Self {
            start: 1.5,
            stop: 9.5,
            samples: 800,
        }
    }
}

impl ResistanceGrid {
    /// Distance between consecutive candidates.
    pub fn step(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            (self.stop - self.start) / (self.samples - 1) as f64
        }
    }

    /// Candidates in ascending order. The last one is exactly `stop`.
    pub fn candidates(&self) -> Vec<f64> {
        let step = self.step();
        let mut values: Vec<f64> = (0..self.samples)
            .map(|idx| self.start + idx as f64 * step)
            .collect();
        if self.samples > 1 {
            values[self.samples - 1] = self.stop;
        }
        values
    }
}

/// One point of the squared-error curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorPoint {
    /// Candidate resistance.
    pub resistance: f64,
    /// Total squared error of the model at this candidate.
    pub squared_error: f64,
}

/// Result of fitting one obstacle count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceFit {
    /// Candidate with the smallest squared error (first one on ties).
    pub best_resistance: f64,
    /// Error of every candidate, in ascending candidate order.
    pub squared_error: Vec<ErrorPoint>,
}

impl ResistanceFit {
    /// Smallest squared error on the curve.
    pub fn min_error(&self) -> f64 {
        self.squared_error
            .iter()
            .map(|point| point.squared_error)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Fitted curve per obstacle count.
pub type ResistanceCurve = BTreeMap<u32, ResistanceFit>;

fn invalid(message: impl Into<String>) -> FlowError {
    FlowError::InsufficientData(ErrorInfo::new("resistance-fit", message))
}

/// Fits the resistance over the default grid. `points` are
/// `(acceleration, mean flow rate)` pairs in any order.
pub fn fit_resistance(points: &[(f64, f64)], mass: f64) -> Result<ResistanceFit, FlowError> {
    fit_resistance_on(&ResistanceGrid::default(), points, mass)
}

/// Fits the resistance over an explicit grid.
pub fn fit_resistance_on(
    grid: &ResistanceGrid,
    points: &[(f64, f64)],
    mass: f64,
) -> Result<ResistanceFit, FlowError> {
    if points.is_empty() {
        return Err(invalid("no flow-rate points to fit"));
    }
    if grid.samples == 0 {
        return Err(invalid("resistance grid has no candidates"));
    }
    if !(mass.is_finite() && mass > 0.0) {
        return Err(invalid("particle mass must be positive").with_context("mass", mass));
    }
    if let Some((a, q)) = points
        .iter()
        .find(|(a, q)| !a.is_finite() || !q.is_finite())
    {
        return Err(invalid("non-finite flow-rate point")
            .with_context("acceleration", a)
            .with_context("flow_rate", q));
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0));
    let (a0, q0) = sorted[0];

    let mut best: Option<(f64, f64)> = None;
    let mut curve = Vec::with_capacity(grid.samples);
    for resistance in grid.candidates() {
        let squared_error: f64 = sorted
            .iter()
            .map(|(a, q)| {
                let model = q0 + mass * (a - a0) / resistance;
                (q - model).powi(2)
            })
            .sum();
        if best.map_or(true, |(_, err)| squared_error < err) {
            best = Some((resistance, squared_error));
        }
        curve.push(ErrorPoint {
            resistance,
            squared_error,
        });
    }
    let best_resistance = best.map_or(grid.start, |(resistance, _)| resistance);
    Ok(ResistanceFit {
        best_resistance,
        squared_error: curve,
    })
}

/// Fits every obstacle count of a mean flow-rate table independently.
/// `masses` gives the particle mass per obstacle count.
pub fn fit_all(
    grid: &ResistanceGrid,
    means: &StatTable,
    masses: &BTreeMap<u32, f64>,
) -> Result<ResistanceCurve, FlowError> {
    let mut curve = ResistanceCurve::new();
    for obstacle_count in means.rows() {
        let points: Vec<(f64, f64)> = means
            .row(obstacle_count)
            .map(|(acceleration, mean)| (acceleration.value(), *mean))
            .collect();
        let mass = masses.get(&obstacle_count).copied().ok_or_else(|| {
            invalid("no particle mass recorded").with_context("obstacle_count", obstacle_count)
        })?;
        let fit = fit_resistance_on(grid, &points, mass)
            .map_err(|err| err.with_context("obstacle_count", obstacle_count))?;
        debug!(
            obstacle_count,
            best_resistance = fit.best_resistance,
            points = points.len(),
            "resistance fitted"
        );
        curve.insert(obstacle_count, fit);
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_spans_closed_interval() {
        let candidates = ResistanceGrid::default().candidates();
        assert_eq!(candidates.len(), 800);
        assert_eq!(candidates[0], 1.5);
        assert_eq!(candidates[799], 9.5);
        assert!(candidates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn ties_resolve_to_smallest_candidate() {
        let fit = fit_resistance(&[(1.0, 3.0)], 1.0).expect("fit");
        assert_eq!(fit.best_resistance, 1.5);
        assert!(fit.squared_error.iter().all(|point| point.squared_error == 0.0));
    }

    #[test]
    fn empty_points_are_insufficient() {
        let err = fit_resistance(&[], 1.0).expect_err("empty");
        assert!(matches!(err, FlowError::InsufficientData(_)));
    }

    #[test]
    fn unsorted_points_are_anchored_at_smallest_acceleration() {
        let r_true = 4.0;
        let points = [(3.0, 2.0 + 2.0 / r_true), (1.0, 2.0), (2.0, 2.0 + 1.0 / r_true)];
        let fit = fit_resistance(&points, 1.0).expect("fit");
        assert!((fit.best_resistance - r_true).abs() <= ResistanceGrid::default().step());
    }
}

//! Sweep plans: physical base parameters, parameter ranges and the trial grid.

use std::fs;
use std::path::Path;

use granflow_core::serde::{from_yaml_slice, to_yaml_string};
use granflow_core::{stable_hash_string, ErrorInfo, FlowError, SimulationConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn plan_error(code: &str, field: &str, message: impl Into<String>) -> FlowError {
    FlowError::Config(ErrorInfo::new(code, message).with_context("field", field))
}

/// Physical parameters shared by every trial of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseParams {
    /// Channel width.
    pub width: f64,
    /// Channel length.
    pub length: f64,
    /// Number of particles.
    pub particle_count: u32,
    /// Obstacle radius.
    pub obstacle_radius: f64,
    /// Particle radius.
    pub particle_radius: f64,
    /// Particle mass.
    pub particle_mass: f64,
    /// Normal contact stiffness.
    pub normal_stiffness: f64,
    /// Tangential contact stiffness.
    pub tangential_stiffness: f64,
    /// Integration time step.
    pub integration_step: f64,
    /// Snapshot interval.
    pub snapshot_step: f64,
    /// Simulated duration.
    pub max_time: f64,
    /// Damping constant of the normal force.
    pub gravity_scale: f64,
}

impl Default for BaseParams {
    fn default() -> Self {
        let normal_stiffness = 250.0;
        Self {
            width: 40.0,
            length: 140.0,
            particle_count: 100,
            obstacle_radius: 1.0,
            particle_radius: 1.0,
            particle_mass: 1.0,
            normal_stiffness,
            tangential_stiffness: 2.0 * normal_stiffness,
            integration_step: 0.001,
            snapshot_step: 0.01,
            max_time: 10.0,
            gravity_scale: normal_stiffness / 100.0,
        }
    }
}

impl BaseParams {
    fn validate(&self) -> Result<(), FlowError> {
        let positives = [
            ("width", self.width),
            ("length", self.length),
            ("obstacle_radius", self.obstacle_radius),
            ("particle_radius", self.particle_radius),
            ("particle_mass", self.particle_mass),
            ("normal_stiffness", self.normal_stiffness),
            ("tangential_stiffness", self.tangential_stiffness),
            ("integration_step", self.integration_step),
            ("snapshot_step", self.snapshot_step),
            ("max_time", self.max_time),
        ];
        for (field, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(plan_error(
                    "plan-param",
                    field,
                    format!("{field} must be positive, got {value}"),
                ));
            }
        }
        if self.particle_count == 0 {
            return Err(plan_error(
                "plan-param",
                "particle_count",
                "particle_count must be positive",
            ));
        }
        if !(self.gravity_scale.is_finite() && self.gravity_scale >= 0.0) {
            return Err(plan_error(
                "plan-param",
                "gravity_scale",
                "gravity_scale must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Inclusive, evenly spaced range of `steps` values from `start` to `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRange {
    /// First value.
    pub start: f64,
    /// Last value (inclusive).
    pub stop: f64,
    /// Number of values.
    pub steps: usize,
}

impl LinearRange {
    /// Creates a range descriptor.
    pub fn new(start: f64, stop: f64, steps: usize) -> Self {
        Self { start, stop, steps }
    }

    /// Materialises the range. The last value is exactly `stop` when
    /// `steps > 1`.
    pub fn values(&self) -> Vec<f64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = (self.stop - self.start) / (n - 1) as f64;
                let mut values: Vec<f64> =
                    (0..n).map(|idx| self.start + idx as f64 * step).collect();
                values[n - 1] = self.stop;
                values
            }
        }
    }

    /// Materialises the range truncated to integers, dropping duplicates.
    pub fn integer_values(&self) -> Vec<u32> {
        let mut values: Vec<u32> = self
            .values()
            .into_iter()
            .map(|value| value.trunc() as u32)
            .collect();
        let before = values.len();
        values.dedup();
        if values.len() < before {
            warn!(
                start = self.start,
                stop = self.stop,
                steps = self.steps,
                kept = values.len(),
                "integer range produced duplicate values; duplicates dropped"
            );
        }
        values
    }

    fn validate(&self, field: &str) -> Result<(), FlowError> {
        if self.steps == 0 {
            return Err(plan_error("plan-range", field, "steps must be at least 1"));
        }
        if !(self.start.is_finite() && self.stop.is_finite()) {
            return Err(plan_error("plan-range", field, "range bounds must be finite"));
        }
        if self.stop < self.start {
            return Err(plan_error(
                "plan-range",
                field,
                format!("stop {} is below start {}", self.stop, self.start),
            ));
        }
        Ok(())
    }
}

/// External simulation engine invocation: program plus leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the parameter flags.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineSpec {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: vec!["-jar".to_string(), "granular-dynamics.jar".to_string()],
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    /// Number of trials executed simultaneously.
    #[serde(default = "Scheduler::default_parallelism")]
    pub parallelism: usize,
}

impl Scheduler {
    fn default_parallelism() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            parallelism: Self::default_parallelism(),
        }
    }
}

fn default_repetitions() -> u32 {
    5
}

/// Parametric sweep over accelerations and obstacle counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Physical parameters common to all trials.
    #[serde(default)]
    pub base: BaseParams,
    /// Driving accelerations to visit.
    pub accelerations: LinearRange,
    /// Obstacle counts to visit (truncated to integers).
    pub obstacle_counts: LinearRange,
    /// Trials per configuration.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// External engine invocation.
    #[serde(default)]
    pub engine: EngineSpec,
    /// Worker pool settings.
    #[serde(default)]
    pub scheduler: Scheduler,
    /// Keep per-trial engine output after it has been absorbed.
    #[serde(default)]
    pub keep_raw_outputs: bool,
}

impl SweepPlan {
    /// Checks parameter ranges and pool width.
    pub fn validate(&self) -> Result<(), FlowError> {
        self.base.validate()?;
        self.accelerations.validate("accelerations")?;
        self.obstacle_counts.validate("obstacle_counts")?;
        if self.obstacle_counts.start < 0.0 {
            return Err(plan_error(
                "plan-range",
                "obstacle_counts",
                "obstacle counts cannot be negative",
            ));
        }
        if self.repetitions == 0 {
            return Err(plan_error(
                "plan-param",
                "repetitions",
                "repetitions must be at least 1",
            ));
        }
        if self.scheduler.parallelism == 0 {
            return Err(plan_error(
                "plan-param",
                "scheduler.parallelism",
                "parallelism must be at least 1",
            ));
        }
        Ok(())
    }

    /// Deterministic hash of the plan contents.
    pub fn plan_hash(&self) -> Result<String, FlowError> {
        stable_hash_string(self)
    }

    /// YAML rendering of the plan.
    pub fn to_yaml_string(&self) -> Result<String, FlowError> {
        to_yaml_string(self)
    }

    /// Full Cartesian product of accelerations, obstacle counts and
    /// repetitions, in submission order.
    pub fn trials(&self) -> Vec<SimulationConfig> {
        let accelerations = self.accelerations.values();
        let obstacle_counts = self.obstacle_counts.integer_values();
        let mut trials = Vec::with_capacity(
            accelerations.len() * obstacle_counts.len() * self.repetitions as usize,
        );
        for &acceleration in &accelerations {
            for &obstacle_count in &obstacle_counts {
                for repetition_index in 0..self.repetitions {
                    trials.push(self.trial_config(obstacle_count, acceleration, repetition_index));
                }
            }
        }
        trials
    }

    fn trial_config(
        &self,
        obstacle_count: u32,
        acceleration: f64,
        repetition_index: u32,
    ) -> SimulationConfig {
        let base = &self.base;
        SimulationConfig {
            width: base.width,
            length: base.length,
            obstacle_count,
            particle_count: base.particle_count,
            obstacle_radius: base.obstacle_radius,
            particle_radius: base.particle_radius,
            particle_mass: base.particle_mass,
            acceleration,
            normal_stiffness: base.normal_stiffness,
            tangential_stiffness: base.tangential_stiffness,
            integration_step: base.integration_step,
            snapshot_step: base.snapshot_step,
            max_time: base.max_time,
            gravity_scale: base.gravity_scale,
            repetition_index,
        }
    }
}

/// Loads and validates a sweep plan from a YAML file.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<SweepPlan, FlowError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        FlowError::Config(
            ErrorInfo::new("plan-read", err.to_string())
                .with_context("path", path.display()),
        )
    })?;
    let plan: SweepPlan = from_yaml_slice(&bytes)?;
    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_range_matches_endpoints() {
        let values = LinearRange::new(0.5, 5.0, 4).values();
        assert_eq!(values, vec![0.5, 2.0, 3.5, 5.0]);
        assert_eq!(LinearRange::new(3.0, 9.0, 1).values(), vec![3.0]);
    }

    #[test]
    fn integer_range_truncates_and_dedups() {
        assert_eq!(
            LinearRange::new(80.0, 120.0, 4).integer_values(),
            vec![80, 93, 106, 120]
        );
        assert_eq!(LinearRange::new(1.0, 2.0, 4).integer_values(), vec![1, 2]);
    }

    #[test]
    fn default_base_matches_documented_defaults() {
        let base = BaseParams::default();
        assert_eq!(base.gravity_scale, 2.5);
        assert_eq!(base.tangential_stiffness, 500.0);
    }
}

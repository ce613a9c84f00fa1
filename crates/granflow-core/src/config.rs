//! Physical parameter tuples describing a single trial.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Total-ordered wrapper around an acceleration value so it can key maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accel(
    /// Raw acceleration value.
    pub f64,
);

impl Accel {
    /// Returns the raw acceleration value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Accel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Accel {}

impl PartialOrd for Accel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Accel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Accel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Accel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Accel {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Logical aggregation key of a trial: obstacle count and acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    /// Number of obstacles in the channel.
    pub obstacle_count: u32,
    /// Driving acceleration.
    pub acceleration: Accel,
}

impl ConfigKey {
    /// Builds a key from raw values.
    pub fn new(obstacle_count: u32, acceleration: f64) -> Self {
        Self {
            obstacle_count,
            acceleration: Accel(acceleration),
        }
    }
}

/// Immutable parameter tuple handed to the simulation engine for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Channel width.
    pub width: f64,
    /// Channel length.
    pub length: f64,
    /// Number of obstacles.
    pub obstacle_count: u32,
    /// Number of particles.
    pub particle_count: u32,
    /// Obstacle radius.
    pub obstacle_radius: f64,
    /// Particle radius.
    pub particle_radius: f64,
    /// Particle mass.
    pub particle_mass: f64,
    /// Driving acceleration.
    pub acceleration: f64,
    /// Normal contact stiffness (k_n).
    pub normal_stiffness: f64,
    /// Tangential contact stiffness (k_t).
    pub tangential_stiffness: f64,
    /// Integration time step.
    pub integration_step: f64,
    /// Interval between trajectory snapshots.
    pub snapshot_step: f64,
    /// Simulated duration.
    pub max_time: f64,
    /// Damping constant of the normal force.
    pub gravity_scale: f64,
    /// Repetition index distinguishing otherwise identical trials.
    pub repetition_index: u32,
}

impl SimulationConfig {
    /// Aggregation key of this trial.
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(self.obstacle_count, self.acceleration)
    }

    /// Subset of the configuration retained with the trial result.
    pub fn trial_config(&self) -> TrialConfig {
        TrialConfig {
            obstacle_count: self.obstacle_count,
            acceleration: self.acceleration,
            particle_mass: self.particle_mass,
            max_time: self.max_time,
        }
    }

    /// Deterministic directory name, unique per obstacle count, acceleration
    /// and repetition.
    pub fn trial_dir_name(&self) -> String {
        format!(
            "m{}_a{}_r{}",
            self.obstacle_count, self.acceleration, self.repetition_index
        )
    }
}

/// Configuration subset kept alongside each trial result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Number of obstacles.
    #[serde(deserialize_with = "integral_count")]
    pub obstacle_count: u32,
    /// Driving acceleration.
    pub acceleration: f64,
    /// Particle mass.
    pub particle_mass: f64,
    /// Simulated duration.
    pub max_time: f64,
}

impl TrialConfig {
    /// Aggregation key of this trial.
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(self.obstacle_count, self.acceleration)
    }
}

/// Converts a float-encoded count to `u32`, rejecting fractional, negative,
/// non-finite and out-of-range values.
pub fn integral_count_from_f64(raw: f64) -> Result<u32, String> {
    if !raw.is_finite() || raw.fract() != 0.0 || raw < 0.0 || raw > u32::MAX as f64 {
        return Err(format!("count must be a non-negative integer, got {raw}"));
    }
    Ok(raw as u32)
}

// Result files written by other tools store every config value as a float.
fn integral_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    integral_count_from_f64(raw).map_err(serde::de::Error::custom)
}

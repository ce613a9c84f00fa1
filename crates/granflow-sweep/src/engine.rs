//! Invocation of the external discrete-element simulation engine.

use std::path::Path;
use std::process::Command;

use granflow_core::{ErrorInfo, FlowError, SimulationConfig};
use tracing::debug;

use crate::plan::EngineSpec;

/// Runs one simulation trial, writing its artefacts into `out_dir`.
pub trait SimulationEngine: Send + Sync {
    /// Executes the trial synchronously. A failure is scoped to this trial.
    fn run(&self, config: &SimulationConfig, out_dir: &Path) -> Result<(), FlowError>;
}

/// Engine backed by an external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEngine {
    program: String,
    leading_args: Vec<String>,
}

impl ProcessEngine {
    /// Creates an engine running `program` with `leading_args` before the
    /// parameter flags.
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    /// Builds the engine described by a plan.
    pub fn from_spec(spec: &EngineSpec) -> Self {
        Self::new(spec.program.clone(), spec.args.clone())
    }
}

/// Parameter flags understood by the engine, in invocation order.
pub fn engine_args(config: &SimulationConfig, out_dir: &Path) -> Vec<String> {
    let pairs: [(&str, String); 15] = [
        ("-W", config.width.to_string()),
        ("-L", config.length.to_string()),
        ("-M", config.obstacle_count.to_string()),
        ("-N", config.particle_count.to_string()),
        ("-R", config.obstacle_radius.to_string()),
        ("-r", config.particle_radius.to_string()),
        ("-m", config.particle_mass.to_string()),
        ("-A", config.acceleration.to_string()),
        ("-k_n", config.normal_stiffness.to_string()),
        ("-k_t", config.tangential_stiffness.to_string()),
        ("-dt", config.integration_step.to_string()),
        ("-dt2", config.snapshot_step.to_string()),
        ("-tf", config.max_time.to_string()),
        ("-g", config.gravity_scale.to_string()),
        ("-out", out_dir.display().to_string()),
    ];
    pairs
        .into_iter()
        .flat_map(|(flag, value)| [flag.to_string(), value])
        .collect()
}

fn failure(config: &SimulationConfig, code: &str, message: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("obstacle_count", config.obstacle_count)
        .with_context("acceleration", config.acceleration)
        .with_context("repetition", config.repetition_index)
        .with_context("max_time", config.max_time)
}

impl SimulationEngine for ProcessEngine {
    fn run(&self, config: &SimulationConfig, out_dir: &Path) -> Result<(), FlowError> {
        let args = engine_args(config, out_dir);
        debug!(program = %self.program, ?args, "launching simulation engine");
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .output()
            .map_err(|err| {
                FlowError::SimulationFailure(
                    failure(config, "engine-spawn", "failed to launch simulation engine")
                        .with_context("program", &self.program)
                        .with_hint(err.to_string()),
                )
            })?;
        if output.status.success() {
            return Ok(());
        }
        let mut diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            if !diagnostics.is_empty() {
                diagnostics.push('\n');
            }
            diagnostics.push_str(stdout.trim());
        }
        Err(FlowError::SimulationFailure(
            failure(
                config,
                "engine-exit",
                format!("simulation engine exited with {}", output.status),
            )
            .with_hint(diagnostics),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn args_follow_flag_order() {
        let config = SimulationConfig {
            width: 40.0,
            length: 140.0,
            obstacle_count: 80,
            particle_count: 100,
            obstacle_radius: 1.0,
            particle_radius: 1.0,
            particle_mass: 1.0,
            acceleration: 0.5,
            normal_stiffness: 250.0,
            tangential_stiffness: 500.0,
            integration_step: 0.001,
            snapshot_step: 0.01,
            max_time: 10.0,
            gravity_scale: 2.5,
            repetition_index: 0,
        };
        let args = engine_args(&config, &PathBuf::from("out/m80_a0.5_r0"));
        assert_eq!(args.len(), 30);
        assert_eq!(&args[0..2], ["-W", "40"]);
        assert_eq!(&args[4..6], ["-M", "80"]);
        assert_eq!(&args[14..16], ["-A", "0.5"]);
        assert_eq!(&args[28..30], ["-out", "out/m80_a0.5_r0"]);
    }
}

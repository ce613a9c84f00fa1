#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use granflow_core::{ErrorInfo, FlowError, SimulationConfig};
use granflow_sweep::{SimulationEngine, SweepPlan};

/// Deterministic in-process engine: discharges at a rate proportional to the
/// acceleration, failing for the configured obstacle counts.
pub struct FakeEngine {
    pub failing_obstacles: Vec<u32>,
    pub panicking_obstacles: Vec<u32>,
    pub delay: Duration,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeEngine {
    pub fn new(failing_obstacles: Vec<u32>) -> Self {
        Self {
            failing_obstacles,
            panicking_obstacles: Vec::new(),
            delay: Duration::from_millis(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_panic_on(mut self, obstacles: Vec<u32>) -> Self {
        self.panicking_obstacles = obstacles;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SimulationEngine for FakeEngine {
    fn run(&self, config: &SimulationConfig, out_dir: &Path) -> Result<(), FlowError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.panicking_obstacles.contains(&config.obstacle_count) {
            panic!("engine wrapper lost its output handle");
        }

        if self.failing_obstacles.contains(&config.obstacle_count) {
            return Err(FlowError::SimulationFailure(
                ErrorInfo::new("engine-exit", "exit status: 1")
                    .with_context("obstacle_count", config.obstacle_count),
            ));
        }
        let count = (config.acceleration * 4.0).round() as usize + 2;
        let step = config.max_time / count as f64;
        let mut body = format!("{count}\n");
        for idx in 1..=count {
            body.push_str(&format!("{:.5}\n", idx as f64 * step));
        }
        fs::write(out_dir.join("discharges.txt"), body)
            .map_err(|err| FlowError::Io(ErrorInfo::new("fake-write", err.to_string())))?;
        fs::write(out_dir.join("config.txt"), "40\n140\n").ok();
        Ok(())
    }
}

pub fn small_plan(parallelism: usize) -> SweepPlan {
    let mut plan: SweepPlan = serde_yaml::from_str(
        "accelerations: {start: 0.5, stop: 2.0, steps: 2}\nobstacle_counts: {start: 80, stop: 100, steps: 3}\nrepetitions: 3\n",
    )
    .expect("plan yaml");
    plan.scheduler.parallelism = parallelism;
    plan
}

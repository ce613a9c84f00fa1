#![cfg(unix)]

use std::fs;
use std::path::Path;

use granflow_core::FlowError;
use granflow_sweep::{run_sweep, ProcessEngine, SweepPlan};

// Stand-in engine: writes discharges for any obstacle count except 93,
// which exits non-zero with a diagnostic on stderr.
const SCRIPT: &str = r#"#!/bin/sh
out=""
obstacles=""
while [ $# -gt 0 ]; do
  case "$1" in
    -out) out="$2"; shift 2 ;;
    -M) obstacles="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ "$obstacles" = "93" ]; then
  echo "overlap detected while placing obstacles" >&2
  exit 3
fi
printf '4\n6.0\n7.0\n8.5\n9.0\n' > "$out/discharges.txt"
"#;

fn write_script(dir: &Path) -> String {
    let path = dir.join("fake-engine.sh");
    fs::write(&path, SCRIPT).expect("write script");
    path.display().to_string()
}

#[test]
fn process_engine_reports_exit_failures() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let script = write_script(temp.path());
    let mut plan: SweepPlan = serde_yaml::from_str(
        "accelerations: {start: 1.0, stop: 1.0, steps: 1}\nobstacle_counts: {start: 80, stop: 120, steps: 4}\nrepetitions: 2\nscheduler: {parallelism: 2}\n",
    )
    .expect("plan");
    plan.engine.program = "/bin/sh".to_string();
    plan.engine.args = vec![script];

    let engine = ProcessEngine::from_spec(&plan.engine);
    let out = temp.path().join("sweep");
    let outcome = run_sweep(&plan, &engine, &out).expect("sweep completes");

    assert_eq!(outcome.store.len(), 6);
    assert_eq!(outcome.report.failed, 2);
    let failure = &outcome.report.failures[0];
    assert_eq!(failure.obstacle_count, 93);
    match &failure.error {
        FlowError::SimulationFailure(info) => {
            assert_eq!(info.code, "engine-exit");
            assert!(info
                .hint
                .as_deref()
                .unwrap_or_default()
                .contains("overlap detected"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(outcome.store.trials()[0].exit_times, vec![6.0, 7.0, 8.5, 9.0]);
}

#[test]
fn missing_program_is_a_trial_failure() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let mut plan: SweepPlan = serde_yaml::from_str(
        "accelerations: {start: 1.0, stop: 1.0, steps: 1}\nobstacle_counts: {start: 80, stop: 80, steps: 1}\nrepetitions: 1\nscheduler: {parallelism: 1}\n",
    )
    .expect("plan");
    plan.engine.program = temp.path().join("no-such-engine").display().to_string();
    let engine = ProcessEngine::from_spec(&plan.engine);
    let outcome = run_sweep(&plan, &engine, temp.path()).expect("sweep completes");
    assert!(outcome.store.is_empty());
    assert_eq!(outcome.report.failures[0].error.info().code, "engine-spawn");
}

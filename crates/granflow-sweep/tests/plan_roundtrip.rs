use std::fs;

use granflow_core::FlowError;
use granflow_sweep::{load_plan, SweepPlan};

#[test]
fn plan_loads_with_defaults() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("plan.yaml");
    fs::write(
        &path,
        "accelerations: {start: 0.5, stop: 5.0, steps: 4}\nobstacle_counts: {start: 80, stop: 120, steps: 4}\nbase:\n  max_time: 20.0\nengine:\n  program: java\n  args: [-jar, engine.jar]\n",
    )
    .expect("write");
    let plan = load_plan(&path).expect("load");
    assert_eq!(plan.repetitions, 5);
    assert_eq!(plan.base.max_time, 20.0);
    assert_eq!(plan.base.width, 40.0);
    assert!(plan.scheduler.parallelism >= 1);
    assert_eq!(plan.trials().len(), 4 * 4 * 5);

    let yaml = plan.to_yaml_string().expect("yaml");
    let again: SweepPlan = serde_yaml::from_str(&yaml).expect("reparse");
    assert_eq!(again, plan);
    assert_eq!(again.plan_hash().expect("hash"), plan.plan_hash().expect("hash"));
}

#[test]
fn trials_cover_the_cartesian_product_once() {
    let plan: SweepPlan = serde_yaml::from_str(
        "accelerations: {start: 1.0, stop: 3.0, steps: 3}\nobstacle_counts: {start: 10, stop: 20, steps: 2}\nrepetitions: 2\n",
    )
    .expect("plan");
    let trials = plan.trials();
    let mut dirs: Vec<_> = trials.iter().map(|t| t.trial_dir_name()).collect();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 3 * 2 * 2);
}

#[test]
fn invalid_plans_are_rejected() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("plan.yaml");
    fs::write(
        &path,
        "accelerations: {start: 5.0, stop: 0.5, steps: 4}\nobstacle_counts: {start: 80, stop: 120, steps: 4}\n",
    )
    .expect("write");
    let err = load_plan(&path).expect_err("reversed range");
    assert!(matches!(err, FlowError::Config(_)));
    assert_eq!(
        err.info().context.get("field").map(String::as_str),
        Some("accelerations")
    );

    fs::write(
        &path,
        "accelerations: {start: 0.5, stop: 5.0, steps: 4}\nobstacle_counts: {start: 80, stop: 120, steps: 4}\nrepetitions: 0\n",
    )
    .expect("write");
    assert!(load_plan(&path).is_err());
    assert!(load_plan(temp.path().join("absent.yaml")).is_err());
}

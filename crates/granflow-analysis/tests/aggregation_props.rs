use granflow_analysis::{
    flow_rate_samples, mean_table, std_table, CutoffPolicy, SlopeEstimator, StatTable,
};
use granflow_core::{Accel, TrialConfig, TrialResult};
use proptest::prelude::*;

fn trial(obstacle_count: u32, acceleration: f64, exit_times: Vec<f64>) -> TrialResult {
    TrialResult::new(
        TrialConfig {
            obstacle_count,
            acceleration,
            particle_mass: 1.0,
            max_time: 10.0,
        },
        exit_times,
    )
}

fn arb_trials() -> impl Strategy<Value = Vec<TrialResult>> {
    let obstacle = prop::sample::select(vec![80u32, 90, 100]);
    let acceleration = prop::sample::select(vec![0.5f64, 1.25, 2.0]);
    let times = prop::collection::vec(0.0f64..10.0, 0..30);
    prop::collection::vec((obstacle, acceleration, times), 1..24).prop_map(|specs| {
        specs
            .into_iter()
            .map(|(m, a, times)| trial(m, a, times))
            .collect()
    })
}

fn stats(trials: &[TrialResult], estimator: SlopeEstimator) -> (StatTable, StatTable) {
    let samples = flow_rate_samples(trials, CutoffPolicy::default(), estimator);
    (mean_table(&samples.rates), std_table(&samples.rates))
}

proptest! {
    #[test]
    fn statistics_do_not_depend_on_completion_order(
        (trials, shuffled) in arb_trials().prop_flat_map(|trials| {
            let shuffled = Just(trials.clone()).prop_shuffle();
            (Just(trials), shuffled)
        })
    ) {
        for estimator in [SlopeEstimator::LeastSquares, SlopeEstimator::Endpoint] {
            prop_assert_eq!(stats(&trials, estimator), stats(&shuffled, estimator));
        }
    }

    #[test]
    fn pivot_twice_is_identity(
        cells in prop::collection::btree_map((0u32..200, 0i32..40), -1.0e6f64..1.0e6, 0..40)
    ) {
        let table: StatTable = cells
            .into_iter()
            .map(|((m, a), v)| (m, Accel(f64::from(a) * 0.25), v))
            .collect();
        let back = table.pivot().pivot();
        prop_assert_eq!(&back, &table);
        prop_assert_eq!(table.pivot().len(), table.len());
    }
}

#[test]
fn every_table_cell_has_at_least_one_sample() {
    let trials = vec![
        trial(80, 1.0, vec![6.0, 7.0, 9.0]),
        trial(80, 2.0, vec![]),
        trial(90, 1.0, vec![5.5, 8.0]),
        trial(90, 1.0, vec![4.0]),
    ];
    let samples = flow_rate_samples(&trials, CutoffPolicy::default(), SlopeEstimator::LeastSquares);
    assert!(samples.rates.iter().all(|(_, _, rates)| !rates.is_empty()));
    assert_eq!(samples.rates.len(), 2);
    assert_eq!(samples.excluded.len(), 2);
}

#[test]
fn mean_and_std_follow_population_statistics() {
    let trials = vec![
        trial(80, 1.0, vec![5.0, 6.0]),
        trial(80, 1.0, vec![5.0, 5.5]),
    ];
    let samples = flow_rate_samples(&trials, CutoffPolicy::default(), SlopeEstimator::Endpoint);
    let mean = mean_table(&samples.rates);
    let std = std_table(&samples.rates);
    assert_eq!(mean.get(80, Accel(1.0)), Some(&1.5));
    assert_eq!(std.get(80, Accel(1.0)), Some(&0.5));
}

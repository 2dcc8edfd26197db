//! Property-based tests for scenario runs

use proptest::prelude::*;
use trunc_oracle::constants::{MAX_CAP_TICKS, MAX_TICK, MIN_TICK};
use trunc_oracle::OracleConfig;
use trunc_oracle_sim::{Scenario, ScenarioKind, ScenarioRunner};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_random_walk_respects_bounds(
        seed in any::<u64>(),
        steps in 1u32..60,
        volatility in 0i32..=MAX_CAP_TICKS as i32,
        start_tick in MIN_TICK..=MAX_TICK,
    ) {
        let config = OracleConfig::default();
        let policy = config.policy_defaults;
        let mut scenario = Scenario::new(ScenarioKind::RandomWalk)
            .with_steps(steps)
            .with_seed(seed)
            .with_volatility(volatility);
        scenario.start_tick = start_tick;

        let report = ScenarioRunner::new(config).run(&scenario).unwrap();

        prop_assert!((MIN_TICK..=MAX_TICK).contains(&report.final_live_tick));
        prop_assert!((MIN_TICK..=MAX_TICK).contains(&report.mean_tick));
        prop_assert_eq!(report.cap_history.len(), steps as usize);
        prop_assert!(report
            .cap_history
            .iter()
            .all(|cap| (policy.min_cap..=policy.max_cap).contains(cap)));
        prop_assert!(report.capped_updates <= steps as u64);
    }
}

//! # Oracle Service Tests
//!
//! End-to-end behavior of `TruncOracle` through its public entry points.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use trunc_oracle::constants::{MAX_CARDINALITY, ONE_DAY_PPM};
use trunc_oracle::*;

/// Pool whose live state the test sets directly
#[derive(Default)]
struct TestPool {
    live: Mutex<LiveMarketState>,
}

impl TestPool {
    fn set(&self, tick: i32, liquidity: u128) {
        *self.live.lock() = LiveMarketState { tick, liquidity };
    }
}

impl MarketStateProvider for TestPool {
    fn live_state(&self, _market: &MarketId) -> OracleResult<LiveMarketState> {
        Ok(*self.live.lock())
    }
}

struct Harness {
    oracle: Arc<TruncOracle>,
    pool: Arc<TestPool>,
    store: Arc<InMemoryPolicyStore>,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingEventSink>,
    source: Identity,
    governance: Identity,
    market: MarketId,
}

impl Harness {
    fn new() -> Self {
        let mut config = OracleConfig::new(Identity::new("hook"), Identity::new("dao"));
        config.initial_cardinality_next = 64;
        Self::with_config(config)
    }

    fn with_config(config: OracleConfig) -> Self {
        let pool = Arc::new(TestPool::default());
        let store = Arc::new(InMemoryPolicyStore::new());
        let clock = Arc::new(ManualClock::new(10_000));
        let sink = Arc::new(RecordingEventSink::new());
        let source = config.update_source.clone();
        let governance = config.governance.clone();
        let oracle = TruncOracle::new(config, pool.clone(), store.clone(), clock.clone())
            .unwrap()
            .with_event_sink(sink.clone());
        Self {
            oracle: Arc::new(oracle),
            pool,
            store,
            clock,
            sink,
            source,
            governance,
            market: MarketId::from(1),
        }
    }

    fn enable(&self, tick: i32) {
        self.pool.set(tick, 1_000_000);
        self.oracle.enable_market(&self.source, &self.market).unwrap();
    }

    fn record(&self, advance: u32, tick: i32) -> ObservationOutcome {
        self.clock.advance(advance);
        self.pool.set(tick, 1_000_000);
        self.oracle.record_observation(&self.source, &self.market).unwrap()
    }
}

#[test]
fn test_record_caps_large_move() {
    let h = Harness::new();
    h.enable(100);
    assert_eq!(h.oracle.max_ticks_per_block(&h.market).unwrap(), 50);

    let outcome = h.record(1, 180);
    assert!(outcome.capped);
    assert_eq!(outcome.live_tick, 180);
    assert_eq!(outcome.recorded_tick, 150);

    let latest = h.oracle.latest_observation(&h.market).unwrap();
    assert_eq!(latest.tick, 150);
    assert_eq!(latest.tick_cumulative, 100);
    assert_eq!(h.sink.count("TickCapped"), 1);
    assert_eq!(h.oracle.cap_frequency(&h.market).unwrap(), ONE_DAY_PPM);

    // Within the cap the live tick passes through
    let outcome = h.record(1, 170);
    assert!(!outcome.capped);
    assert_eq!(outcome.recorded_tick, 170);
}

#[test]
fn test_authorization() {
    let h = Harness::new();
    h.enable(0);

    let err = h.oracle.record_observation(&h.governance, &h.market).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = h.oracle.refresh_policy(&h.source, &h.market).unwrap_err();
    assert!(matches!(err, OracleError::NotGovernance { .. }));
    assert!(h.oracle.set_auto_tune_paused(&h.source, &h.market, true).is_err());
    assert!(h.oracle.set_max_ticks_per_block(&h.source, &h.market, 10).is_err());
    assert!(h.oracle.increase_cardinality_next(&h.source, &h.market, 100).is_err());

    let other = MarketId::from(2);
    assert_eq!(
        h.oracle.record_observation(&h.source, &other),
        Err(OracleError::MarketNotEnabled(other))
    );
    assert_eq!(h.oracle.observe(&other, &[0]).unwrap_err().kind(), ErrorKind::Uninitialized);
}

#[test]
fn test_bootstrap_exclusivity() {
    let h = Harness::new();
    h.enable(5);
    h.record(10, 7);
    let before = h.oracle.export_market(&h.market).unwrap();

    h.pool.set(999, 1);
    let err = h.oracle.enable_market(&h.source, &h.market).unwrap_err();
    assert_eq!(err, OracleError::MarketAlreadyEnabled(h.market));
    assert_eq!(err.kind(), ErrorKind::AlreadyInitialized);
    assert_eq!(h.oracle.export_market(&h.market).unwrap(), before);
}

#[test]
fn test_same_timestamp_write_is_idempotent() {
    let h = Harness::new();
    h.enable(0);
    h.record(5, 10);
    let state = h.oracle.observation_state(&h.market).unwrap();

    h.record(0, 20);
    assert_eq!(h.oracle.observation_state(&h.market).unwrap(), state);
    let latest = h.oracle.latest_observation(&h.market).unwrap();
    assert_eq!(latest.tick, 20);
    assert_eq!(latest.tick_cumulative, 0);
}

#[test]
fn test_out_of_range_tick_leaves_state_untouched() {
    let h = Harness::new();
    h.enable(0);
    let before = h.oracle.export_market(&h.market).unwrap();

    h.clock.advance(3);
    h.pool.set(constants::MAX_TICK + 1, 1);
    let err = h.oracle.record_observation(&h.source, &h.market).unwrap_err();
    assert!(matches!(err, OracleError::TickOutOfRange(_)));
    assert_eq!(h.oracle.export_market(&h.market).unwrap(), before);
}

#[test]
fn test_observe_and_consult() {
    let h = Harness::new();
    h.enable(10);
    h.record(10, 20);
    h.record(10, 30);

    let result = h.oracle.observe(&h.market, &[0, 20, 15]).unwrap();
    let latest = h.oracle.latest_observation(&h.market).unwrap();
    assert_eq!(result.tick_cumulatives[0], latest.tick_cumulative);
    assert_eq!(result.tick_cumulatives[1], 0);
    assert_eq!(result.tick_cumulatives[2], 10 * 5);

    // Ten seconds at 10 then ten at 20
    let mean = h.oracle.consult(&h.market, 20).unwrap();
    assert_eq!(mean.arithmetic_mean_tick, 15);
    assert_eq!(mean.harmonic_mean_liquidity, 1_000_000);

    let err = h.oracle.observe(&h.market, &[21]).unwrap_err();
    assert!(matches!(err, OracleError::TargetTooOld { .. }));
    assert_eq!(h.oracle.consult(&h.market, 0), Err(OracleError::ZeroLookback));
}

#[test]
fn test_controller_loosens_then_tightens() {
    let h = Harness::new();
    h.enable(0);
    let policy = h.oracle.cached_policy(&h.market).unwrap();

    // A single event per day sits exactly on budget, which still tightens
    let outcome = h.record(policy.update_interval, 100_000);
    assert!(outcome.capped);
    assert_eq!(outcome.max_ticks_per_block, policy.initial_cap - 1);

    // Capping on every update: cap only goes up, to the ceiling
    let mut last_cap = outcome.max_ticks_per_block;
    let mut tick = 100_000;
    for _ in 0..400 {
        tick = -tick;
        let outcome = h.record(policy.update_interval, tick);
        assert!(outcome.capped);
        assert!(outcome.max_ticks_per_block >= last_cap);
        last_cap = outcome.max_ticks_per_block;
    }
    assert_eq!(last_cap, policy.max_cap);
    assert!(h.sink.count("CapUpdated") > 0);

    // Calm market: cap only goes down, to the floor
    let steady = h.oracle.latest_observation(&h.market).unwrap().tick;
    for _ in 0..2_000 {
        let outcome = h.record(policy.update_interval, steady);
        assert!(!outcome.capped);
        assert!(outcome.max_ticks_per_block <= last_cap);
        last_cap = outcome.max_ticks_per_block;
    }
    assert_eq!(last_cap, policy.min_cap);
}

#[test]
fn test_refresh_policy_clamps_cap() {
    let h = Harness::new();
    h.enable(0);
    h.sink.drain();

    h.store.set(h.market, PolicyParam::MaxCap, 20);
    h.store.set(h.market, PolicyParam::MinCap, 5);
    let policy = h.oracle.refresh_policy(&h.governance, &h.market).unwrap();
    assert_eq!(policy.version, 1);
    assert_eq!(policy.max_cap, 20);
    assert_eq!(h.oracle.max_ticks_per_block(&h.market).unwrap(), 20);

    let events = h.sink.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[1],
        OracleEvent::CapUpdated {
            old_cap: 50,
            new_cap: 20,
            reason: CapUpdateReason::PolicyClamp,
            ..
        }
    ));

    // A bad refresh keeps the previous snapshot
    h.store.set(h.market, PolicyParam::DecayWindow, 0);
    let err = h.oracle.refresh_policy(&h.governance, &h.market).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(h.oracle.cached_policy(&h.market).unwrap(), policy);
    assert!(h.sink.events().is_empty());
}

#[test]
fn test_pause_freezes_cap() {
    let h = Harness::new();
    h.enable(0);
    h.oracle.set_auto_tune_paused(&h.governance, &h.market, true).unwrap();

    for _ in 0..10 {
        h.record(10_000, 0);
    }
    assert_eq!(h.oracle.max_ticks_per_block(&h.market).unwrap(), 50);
    assert!(h.oracle.controller_state(&h.market).unwrap().auto_tune_paused);

    h.oracle.set_auto_tune_paused(&h.governance, &h.market, false).unwrap();
    let outcome = h.record(10_000, 0);
    assert_eq!(outcome.cap_adjustment.map(|a| a.new_cap), Some(49));
    assert_eq!(h.sink.count("AutoTunePaused"), 2);
}

#[test]
fn test_manual_override() {
    let h = Harness::new();
    h.enable(0);

    let err = h
        .oracle
        .set_max_ticks_per_block(&h.governance, &h.market, 5_000)
        .unwrap_err();
    assert_eq!(
        err,
        OracleError::CapOutOfBounds {
            cap: 5_000,
            min_cap: 1,
            max_cap: 1_000
        }
    );

    h.clock.advance(5_000);
    let old = h.oracle.set_max_ticks_per_block(&h.governance, &h.market, 300).unwrap();
    assert_eq!(old, 50);
    assert_eq!(h.oracle.max_ticks_per_block(&h.market).unwrap(), 300);

    // The controller waits a full interval before touching the override
    let outcome = h.record(60, 0);
    assert_eq!(outcome.max_ticks_per_block, 300);
}

#[test]
fn test_increase_cardinality_next() {
    let h = Harness::new();
    h.enable(0);

    assert_eq!(
        h.oracle.increase_cardinality_next(&h.governance, &h.market, 1_000).unwrap(),
        1_000
    );
    assert_eq!(
        h.oracle.increase_cardinality_next(&h.governance, &h.market, 10).unwrap(),
        1_000
    );
    assert_eq!(h.sink.count("CardinalityNextIncreased"), 1);

    let err = h
        .oracle
        .increase_cardinality_next(&h.governance, &h.market, MAX_CARDINALITY as u32 + 1)
        .unwrap_err();
    assert!(matches!(err, OracleError::CardinalityTooLarge { .. }));

    for _ in 0..70 {
        h.record(1, 0);
    }
    assert_eq!(h.oracle.observation_state(&h.market).unwrap().cardinality, 71);
}

#[test]
fn test_export_import() {
    let h = Harness::new();
    h.enable(3);
    h.record(4, 6);
    let snapshot = h.oracle.export_market(&h.market).unwrap();

    let copy = Harness::new();
    assert!(copy
        .oracle
        .import_market(&copy.source, &copy.market, &snapshot)
        .is_err());
    copy.oracle
        .import_market(&copy.governance, &copy.market, &snapshot)
        .unwrap();
    assert_eq!(
        copy.oracle.latest_observation(&copy.market).unwrap(),
        h.oracle.latest_observation(&h.market).unwrap()
    );
    assert_eq!(
        copy.oracle
            .import_market(&copy.governance, &copy.market, &snapshot),
        Err(OracleError::MarketAlreadyEnabled(copy.market))
    );
}

/// Provider that calls back into the oracle while it is being read
struct CallbackPool {
    oracle: Mutex<Option<Arc<TruncOracle>>>,
    source: Identity,
    inner: Mutex<Vec<OracleResult<()>>>,
}

impl MarketStateProvider for CallbackPool {
    fn live_state(&self, market: &MarketId) -> OracleResult<LiveMarketState> {
        let oracle = self.oracle.lock().clone();
        if let Some(oracle) = oracle {
            let write = oracle.record_observation(&self.source, market).map(|_| ());
            let read = oracle.latest_observation(market).map(|_| ());
            self.inner.lock().extend([write, read]);
        }
        Ok(LiveMarketState {
            tick: 1,
            liquidity: 1,
        })
    }
}

#[test]
fn test_reentrant_write_rejected() {
    let source = Identity::new("hook");
    let pool = Arc::new(CallbackPool {
        oracle: Mutex::new(None),
        source: source.clone(),
        inner: Mutex::new(Vec::new()),
    });
    let clock = Arc::new(ManualClock::new(1));
    let oracle = Arc::new(
        TruncOracle::new(
            OracleConfig::new(source.clone(), Identity::new("dao")),
            pool.clone(),
            Arc::new(InMemoryPolicyStore::new()),
            clock.clone(),
        )
        .unwrap()
        .with_event_sink(Arc::new(NoopEventSink)),
    );
    let market = MarketId::from(1);
    oracle.enable_market(&source, &market).unwrap();

    *pool.oracle.lock() = Some(oracle.clone());
    clock.advance(1);
    oracle.record_observation(&source, &market).unwrap();
    *pool.oracle.lock() = None;

    let inner = pool.inner.lock().clone();
    assert_eq!(inner[0], Err(OracleError::ReentrancyDetected(market)));
    assert!(inner[1].is_ok());
    assert_eq!(oracle.observation_state(&market).unwrap().index, 0);
    assert_eq!(oracle.latest_observation(&market).unwrap().timestamp, 2);
}

/// Sink that calls back into the oracle's write paths on its first notification
struct CallbackSink {
    oracle: Mutex<Option<Arc<TruncOracle>>>,
    source: Identity,
    governance: Identity,
    inner: Mutex<Vec<OracleResult<()>>>,
}

impl EventSink for CallbackSink {
    fn emit(&self, event: &OracleEvent) {
        let oracle = self.oracle.lock().take();
        if let Some(oracle) = oracle {
            let market = event.market();
            let record = oracle.record_observation(&self.source, market).map(|_| ());
            let refresh = oracle.refresh_policy(&self.governance, market).map(|_| ());
            let read = oracle.cap_frequency(market).map(|_| ());
            self.inner.lock().extend([record, refresh, read]);
        }
    }
}

#[test]
fn test_reentrant_write_from_sink_rejected() {
    let source = Identity::new("hook");
    let governance = Identity::new("dao");
    let pool = Arc::new(TestPool::default());
    let sink = Arc::new(CallbackSink {
        oracle: Mutex::new(None),
        source: source.clone(),
        governance: governance.clone(),
        inner: Mutex::new(Vec::new()),
    });
    let clock = Arc::new(ManualClock::new(1));
    let mut config = OracleConfig::new(source.clone(), governance.clone());
    config.initial_cardinality_next = 8;
    let oracle = Arc::new(
        TruncOracle::new(
            config,
            pool.clone(),
            Arc::new(InMemoryPolicyStore::new()),
            clock.clone(),
        )
        .unwrap()
        .with_event_sink(sink.clone()),
    );
    let market = MarketId::from(1);
    pool.set(0, 1_000);
    oracle.enable_market(&source, &market).unwrap();

    // A capped update notifies the sink while the write section is open
    *sink.oracle.lock() = Some(oracle.clone());
    clock.advance(1);
    pool.set(10_000, 1_000);
    let outcome = oracle.record_observation(&source, &market).unwrap();
    assert!(outcome.capped);

    let inner = sink.inner.lock().clone();
    assert_eq!(inner.len(), 3);
    assert_eq!(inner[0], Err(OracleError::ReentrancyDetected(market)));
    assert_eq!(inner[1], Err(OracleError::ReentrancyDetected(market)));
    assert!(inner[2].is_ok());
    assert_eq!(oracle.cached_policy(&market).unwrap().version, 0);
    assert_eq!(oracle.observation_state(&market).unwrap().index, 1);

    // The guard was released with the outer call
    clock.advance(1);
    let outcome = oracle.record_observation(&source, &market).unwrap();
    assert_eq!(outcome.timestamp, 3);
    assert_eq!(oracle.observation_state(&market).unwrap().index, 2);
    assert_eq!(oracle.refresh_policy(&governance, &market).unwrap().version, 1);
}

#[test]
fn test_concurrent_writers_and_readers() {
    let mut config = OracleConfig::new(Identity::new("hook"), Identity::new("dao"));
    config.initial_cardinality_next = 1_000;
    let h = Harness::with_config(config);
    h.enable(0);
    let start = h.clock.block_timestamp();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let oracle = h.oracle.clone();
        let clock = h.clock.clone();
        let source = h.source.clone();
        let market = h.market;
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                clock.advance(1);
                oracle.record_observation(&source, &market).unwrap();
            }
            worker
        }));
    }
    for _ in 0..2 {
        let oracle = h.oracle.clone();
        let market = h.market;
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let latest = oracle.latest_observation(&market).unwrap();
                assert!(latest.initialized);
                oracle.observe(&market, &[0]).unwrap();
            }
            0
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let latest = h.oracle.latest_observation(&h.market).unwrap();
    assert_eq!(latest.timestamp, start + 400);
    let state = h.oracle.observation_state(&h.market).unwrap();
    assert!(state.cardinality > 1 && state.cardinality <= 401);
}

//! Scenario definitions and the runner that plays them against a fresh oracle

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use trunc_oracle::constants::{MAX_CAP_TICKS, MAX_CARDINALITY};
use trunc_oracle::{
    InMemoryPolicyStore, ManualClock, MarketId, OracleConfig, RecordingEventSink, TruncOracle,
};

use crate::market::SimulatedMarket;
use crate::tracker::CapEventTracker;
use crate::{SimulationError, SimulationResult};

/// How the simulated market moves between updates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ScenarioKind {
    /// Price holds still; the cap should drift down to its floor
    Calm,
    /// Price swings far past the cap on every update; the cap should climb
    /// to its ceiling
    Volatile,
    /// Seeded random walk with steps up to `volatility` ticks
    RandomWalk,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    /// Number of recorded updates after bootstrap
    pub steps: u32,
    /// Seconds between updates
    pub interval: u32,
    pub seed: u64,
    pub start_tick: i32,
    pub liquidity: u128,
    /// Swing size for volatile runs, maximum step for random walks
    pub volatility: i32,
    /// Liquidity set at each update, cycled; empty keeps `liquidity`
    pub liquidity_schedule: Vec<u128>,
}

impl Scenario {
    /// Hourly updates for one day, as in the fee tests this harness mirrors
    pub fn new(kind: ScenarioKind) -> Self {
        Self {
            kind,
            steps: 24,
            interval: 3_600,
            seed: 7,
            start_tick: 0,
            liquidity: 1_000_000_000_000,
            volatility: 100_000,
            liquidity_schedule: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_volatility(mut self, volatility: i32) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_liquidity(mut self, liquidity: u128) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_liquidity_schedule(mut self, schedule: Vec<u128>) -> Self {
        self.liquidity_schedule = schedule;
        self
    }

    fn validate(&self) -> SimulationResult<()> {
        if self.steps == 0 {
            return Err(SimulationError::InvalidParameter(
                "steps must be greater than 0".to_string(),
            ));
        }
        if self.interval == 0 {
            return Err(SimulationError::InvalidParameter(
                "interval must be greater than 0".to_string(),
            ));
        }
        if self.volatility < 0 || self.volatility as u32 > MAX_CAP_TICKS {
            return Err(SimulationError::InvalidParameter(format!(
                "volatility {} must lie in [0, {}]",
                self.volatility, MAX_CAP_TICKS
            )));
        }
        Ok(())
    }

    /// Move `market` for update `step` (1-based)
    fn apply_step(&self, step: u32, market: &SimulatedMarket, rng: &mut StdRng) {
        match self.kind {
            ScenarioKind::Calm => market.set_tick(self.start_tick),
            ScenarioKind::Volatile => {
                if step % 2 == 1 {
                    market.set_tick(self.start_tick.saturating_add(self.volatility));
                } else {
                    market.set_tick(self.start_tick.saturating_sub(self.volatility));
                }
            }
            ScenarioKind::RandomWalk => {
                // Mean of three uniform draws approximates a bell curve
                let v = self.volatility as i64;
                let draw = (0..3).map(|_| rng.gen_range(-v..=v)).sum::<i64>() / 3;
                // |draw| <= volatility <= MAX_CAP_TICKS
                market.move_by(draw as i32);
            }
        }

        if !self.liquidity_schedule.is_empty() {
            let slot = (step as usize - 1) % self.liquidity_schedule.len();
            market.set_liquidity(self.liquidity_schedule[slot]);
        }
    }
}

/// Summary of a finished run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub kind: ScenarioKind,
    pub steps: u32,
    pub initial_cap: u32,
    pub final_cap: u32,
    pub min_cap_seen: u32,
    pub max_cap_seen: u32,
    pub capped_updates: u64,
    pub cap_episodes: usize,
    /// `CapUpdated` notifications emitted
    pub cap_notifications: usize,
    /// Time-weighted mean tick over the retained part of the run
    pub mean_tick: i32,
    /// Harmonic mean liquidity over the same window
    pub harmonic_mean_liquidity: u128,
    pub final_live_tick: i32,
    pub cap_history: Vec<u32>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario:          {:?}", self.kind)?;
        writeln!(f, "steps:             {}", self.steps)?;
        writeln!(
            f,
            "cap:               {} -> {} (range seen {}..={})",
            self.initial_cap, self.final_cap, self.min_cap_seen, self.max_cap_seen
        )?;
        writeln!(f, "capped updates:    {}", self.capped_updates)?;
        writeln!(f, "cap episodes:      {}", self.cap_episodes)?;
        writeln!(f, "cap notifications: {}", self.cap_notifications)?;
        writeln!(f, "mean tick:         {}", self.mean_tick)?;
        writeln!(f, "mean liquidity:    {}", self.harmonic_mean_liquidity)?;
        write!(f, "final live tick:   {}", self.final_live_tick)
    }
}

/// Plays scenarios against a freshly enabled market
pub struct ScenarioRunner {
    config: OracleConfig,
    policy_store: Arc<InMemoryPolicyStore>,
    market_id: MarketId,
}

impl ScenarioRunner {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            policy_store: Arc::new(InMemoryPolicyStore::new()),
            market_id: MarketId::from(1),
        }
    }

    /// Use `store` for the market's governance parameters
    pub fn with_policy_store(mut self, store: Arc<InMemoryPolicyStore>) -> Self {
        self.policy_store = store;
        self
    }

    pub fn market_id(&self) -> MarketId {
        self.market_id
    }

    pub fn run(&self, scenario: &Scenario) -> SimulationResult<ScenarioReport> {
        scenario.validate()?;

        let market = Arc::new(SimulatedMarket::new(scenario.start_tick, scenario.liquidity));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let sink = Arc::new(RecordingEventSink::new());
        let oracle = TruncOracle::new(
            self.config.clone(),
            market.clone(),
            self.policy_store.clone(),
            clock.clone(),
        )?
        .with_event_sink(sink.clone());

        let source = &self.config.update_source;
        let governance = &self.config.governance;
        let id = &self.market_id;

        oracle.enable_market(source, id)?;
        let retained = scenario.steps.min(MAX_CARDINALITY as u32 - 1);
        oracle.increase_cardinality_next(governance, id, retained + 1)?;
        let initial_cap = oracle.max_ticks_per_block(id)?;

        tracing::info!(
            kind = ?scenario.kind,
            steps = scenario.steps,
            interval = scenario.interval,
            initial_cap,
            "starting scenario"
        );

        let mut rng = StdRng::seed_from_u64(scenario.seed);
        let mut tracker = CapEventTracker::new();
        for step in 1..=scenario.steps {
            clock.advance(scenario.interval);
            scenario.apply_step(step, &market, &mut rng);

            let outcome = oracle.record_observation(source, id)?;
            tracker.observe(&outcome);
            tracing::debug!(
                step,
                live_tick = outcome.live_tick,
                liquidity = market.liquidity(),
                recorded_tick = outcome.recorded_tick,
                cap = outcome.max_ticks_per_block,
                "step"
            );
        }

        let window = retained.saturating_mul(scenario.interval);
        let mean = oracle.consult(id, window)?;

        let history = tracker.cap_history();
        let report = ScenarioReport {
            kind: scenario.kind,
            steps: scenario.steps,
            initial_cap,
            final_cap: oracle.max_ticks_per_block(id)?,
            min_cap_seen: history.iter().copied().min().unwrap_or(initial_cap),
            max_cap_seen: history.iter().copied().max().unwrap_or(initial_cap),
            capped_updates: tracker.capped_updates(),
            cap_episodes: tracker.episodes().len(),
            cap_notifications: sink.count("CapUpdated"),
            mean_tick: mean.arithmetic_mean_tick,
            harmonic_mean_liquidity: mean.harmonic_mean_liquidity,
            final_live_tick: market.tick(),
            cap_history: history.to_vec(),
        };

        tracing::info!(
            final_cap = report.final_cap,
            capped_updates = report.capped_updates,
            "scenario finished"
        );
        Ok(report)
    }
}

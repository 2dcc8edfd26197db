//! Paged observation store for TWAP tracking.
//!
//! Observations live in a ring of `cardinality` populated slots addressed by a
//! global `u16` index. Slots are grouped into fixed-size pages that are only
//! allocated once the ring reaches (or is grown into) their range.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CARDINALITY, PAGE_SIZE};
use crate::error::{OracleError, OracleResult};
use crate::utils::{elapsed, lte, seconds_per_liquidity_x64};

/// Single tick/liquidity observation
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Observation {
    /// 32-bit wrapping timestamp of this observation
    pub timestamp: u32,
    /// Tick recorded at this observation (after capping)
    pub tick: i32,
    /// Liquidity in force from this observation onward
    pub liquidity: u128,
    /// Sum of tick * seconds since bootstrap, wrapping
    pub tick_cumulative: i64,
    /// Sum of seconds / max(liquidity, 1) since bootstrap, Q64.64, wrapping
    pub seconds_per_liquidity_cumulative_x64: u128,
    /// Whether this slot holds a real observation
    pub initialized: bool,
}

impl Observation {
    /// Project this observation forward to `timestamp`, accruing the interval
    /// with `interval_tick` and `interval_liquidity`. The projected record
    /// carries the same tick and liquidity it accrued with.
    pub fn transform(&self, timestamp: u32, interval_tick: i32, interval_liquidity: u128) -> Self {
        let delta = elapsed(self.timestamp, timestamp);
        Self {
            timestamp,
            tick: interval_tick,
            liquidity: interval_liquidity,
            tick_cumulative: self
                .tick_cumulative
                .wrapping_add(interval_tick as i64 * delta as i64),
            seconds_per_liquidity_cumulative_x64: self
                .seconds_per_liquidity_cumulative_x64
                .wrapping_add(seconds_per_liquidity_x64(delta, interval_liquidity)),
            initialized: true,
        }
    }
}

/// Ring cursor and capacity of a market's observation history
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct ObservationState {
    /// Global index of the most recent observation
    pub index: u16,
    /// Number of populated slots
    pub cardinality: u16,
    /// Capacity the ring may grow into
    pub cardinality_next: u16,
}

/// Fixed-capacity block of observations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ObservationPage {
    slots: Vec<Observation>,
}

impl ObservationPage {
    pub fn new() -> Self {
        Self {
            slots: vec![Observation::default(); PAGE_SIZE],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for ObservationPage {
    fn default() -> Self {
        Self::new()
    }
}

/// Contiguous run of slots whose timestamps ascend with the physical index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub first: u16,
    pub last: u16,
}

/// Paged observation ring for one market
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct ObservationBook {
    state: ObservationState,
    pages: BTreeMap<u16, ObservationPage>,
}

impl ObservationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ObservationState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.cardinality > 0
    }

    /// Number of allocated pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the bootstrap observation
    pub fn initialize(&mut self, timestamp: u32, tick: i32, liquidity: u128) -> OracleResult<()> {
        if self.is_initialized() {
            return Err(OracleError::AlreadyInitialized);
        }

        *self.slot_mut(0) = Observation {
            timestamp,
            tick,
            liquidity,
            tick_cumulative: 0,
            seconds_per_liquidity_cumulative_x64: 0,
            initialized: true,
        };
        self.state = ObservationState {
            index: 0,
            cardinality: 1,
            cardinality_next: 1,
        };

        Ok(())
    }

    /// Record an observation at `timestamp`.
    ///
    /// A write at the latest observation's timestamp replaces its tick and
    /// liquidity in place. Otherwise the interval since the latest observation
    /// is accrued with the latest tick and liquidity and the cursor advances.
    pub fn write(&mut self, timestamp: u32, tick: i32, liquidity: u128) -> OracleResult<Observation> {
        let last = self.latest()?;

        if last.timestamp == timestamp {
            let slot = self.slot_mut(self.state.index);
            slot.tick = tick;
            slot.liquidity = liquidity;
            return Ok(*slot);
        }

        let mut next = last.transform(timestamp, last.tick, last.liquidity);
        next.tick = tick;
        next.liquidity = liquidity;

        let index = self.state.index as u32;
        let cardinality = self.state.cardinality as u32;
        // The ring only extends into fresh slots when the cursor sits on the
        // last populated slot, so the oldest record stays at `index + 1`.
        let next_index = if index + 1 == cardinality
            && self.state.cardinality < self.state.cardinality_next
        {
            self.state.cardinality += 1;
            index + 1
        } else {
            (index + 1) % cardinality
        };

        self.state.index = next_index as u16;
        *self.slot_mut(self.state.index) = next;

        Ok(next)
    }

    /// Raise `cardinality_next` to `requested`, pre-populating the new slots.
    /// Returns the resulting `cardinality_next`.
    pub fn grow(&mut self, requested: u32) -> OracleResult<u16> {
        if !self.is_initialized() {
            return Err(OracleError::NotInitialized);
        }
        if requested > MAX_CARDINALITY as u32 {
            return Err(OracleError::CardinalityTooLarge {
                requested,
                max: MAX_CARDINALITY,
            });
        }

        let current = self.state.cardinality_next;
        if requested <= current as u32 {
            return Ok(current);
        }

        let first_page = current as usize / PAGE_SIZE;
        let last_page = (requested as usize - 1) / PAGE_SIZE;
        for page in first_page..=last_page {
            self.pages.entry(page as u16).or_default();
        }

        self.state.cardinality_next = requested as u16;
        Ok(self.state.cardinality_next)
    }

    /// Most recent observation
    pub fn latest(&self) -> OracleResult<Observation> {
        if !self.is_initialized() {
            return Err(OracleError::NotInitialized);
        }
        Ok(self.at(self.state.index))
    }

    /// Oldest retained observation
    pub fn oldest(&self) -> OracleResult<Observation> {
        if !self.is_initialized() {
            return Err(OracleError::NotInitialized);
        }
        let oldest_index = (self.state.index as u32 + 1) % self.state.cardinality as u32;
        Ok(self.at(oldest_index as u16))
    }

    /// Observation at a global index, if its page is allocated
    pub fn get(&self, index: u16) -> Option<&Observation> {
        let (page, offset) = Self::locate(index);
        self.pages.get(&page).map(|p| &p.slots[offset])
    }

    /// Observation at a global index; unallocated slots read as uninitialized
    pub fn at(&self, index: u16) -> Observation {
        self.get(index).copied().unwrap_or_default()
    }

    /// Contiguous runs of populated slots, newest run first.
    ///
    /// Walking backward in time from the cursor visits the cursor's page up to
    /// the cursor, then every lower page, then (after the ring wrap) every
    /// higher page, and finally the part of the cursor's page above the
    /// cursor, which holds the oldest records.
    pub fn segments_newest_first(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        if !self.is_initialized() {
            return segments;
        }

        let index = self.state.index as usize;
        let top = self.state.cardinality as usize - 1;
        let cursor_page = index / PAGE_SIZE;
        let page_count = top / PAGE_SIZE + 1;
        let page_end = |page: usize| (page * PAGE_SIZE + PAGE_SIZE - 1).min(top);

        segments.push(Segment {
            first: (cursor_page * PAGE_SIZE) as u16,
            last: index as u16,
        });
        for page in (0..cursor_page).rev() {
            segments.push(Segment {
                first: (page * PAGE_SIZE) as u16,
                last: page_end(page) as u16,
            });
        }
        for page in (cursor_page + 1..page_count).rev() {
            segments.push(Segment {
                first: (page * PAGE_SIZE) as u16,
                last: page_end(page) as u16,
            });
        }
        if index < page_end(cursor_page) {
            segments.push(Segment {
                first: (index + 1) as u16,
                last: page_end(cursor_page) as u16,
            });
        }

        segments
    }

    /// Rebuild a book from raw parts, checking the ring invariants
    pub fn from_parts(
        state: ObservationState,
        pages: BTreeMap<u16, ObservationPage>,
    ) -> OracleResult<Self> {
        let book = Self { state, pages };
        book.validate()?;
        Ok(book)
    }

    /// Check the ring invariants of a restored book
    pub fn validate(&self) -> OracleResult<()> {
        let state = self.state;
        if state.cardinality == 0 {
            return Err(OracleError::InvalidSnapshot("cardinality is zero"));
        }
        if state.cardinality > state.cardinality_next {
            return Err(OracleError::InvalidSnapshot("cardinality exceeds cardinality_next"));
        }
        if state.index >= state.cardinality {
            return Err(OracleError::InvalidSnapshot("index outside populated range"));
        }
        if self.pages.values().any(|page| page.len() != PAGE_SIZE) {
            return Err(OracleError::InvalidSnapshot("page has wrong capacity"));
        }
        if (0..state.cardinality).any(|i| !self.at(i).initialized) {
            return Err(OracleError::InvalidSnapshot("populated slot is uninitialized"));
        }

        // Oldest to newest, every timestamp must be at or after its predecessor
        let time = self.at(state.index).timestamp;
        let mut previous: Option<u32> = None;
        for segment in self.segments_newest_first().iter().rev() {
            for index in segment.first..=segment.last {
                let timestamp = self.at(index).timestamp;
                if let Some(previous) = previous {
                    if !lte(time, previous, timestamp) {
                        return Err(OracleError::InvalidSnapshot(
                            "observations out of time order",
                        ));
                    }
                }
                previous = Some(timestamp);
            }
        }
        Ok(())
    }

    fn locate(index: u16) -> (u16, usize) {
        let index = index as usize;
        ((index / PAGE_SIZE) as u16, index % PAGE_SIZE)
    }

    fn slot_mut(&mut self, index: u16) -> &mut Observation {
        let (page, offset) = Self::locate(index);
        &mut self.pages.entry(page).or_default().slots[offset]
    }
}

//! ID Generation
//!
//! Generators are owned by whoever builds the workflow; nothing here is
//! process-global, so independent workflows (and parallel tests) never share
//! a counter.

use chrono::Datelike;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::clock::Clock;

/// Produces unique opaque identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Year-scoped sequential references: `APP-2024-000001`, `APP-2024-000002`, ...
///
/// The sequence restarts at 1 when the clock's year changes.
pub struct SequentialIdGenerator {
    prefix: String,
    clock: Arc<dyn Clock>,
    state: Mutex<CounterState>,
}

#[derive(Debug, Default)]
struct CounterState {
    year: i32,
    last: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            prefix: prefix.into(),
            clock,
            state: Mutex::new(CounterState::default()),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        // counter is always left consistent, so poisoning is ignored
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // a reading older than the stored year keeps issuing from the stored year
        let year = self.clock.today().year();
        if year > state.year {
            state.year = year;
            state.last = 0;
        }
        state.last += 1;
        format!("{}-{}-{:06}", self.prefix, state.year, state.last)
    }
}

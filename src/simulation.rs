use std::path::Path;

use log::{info, trace};

use crate::address::Geometry;
use crate::error::{Error, Result};
use crate::lru::{CacheHit, LruCache};
use crate::simulation_result::SimulationResult;
use crate::trace::{Operation, TraceEvent, TraceFile};

/// Replays trace events against an [`LruCache`] and counts the outcomes.
#[derive(Debug)]
pub struct Simulation {
    lru_cache: LruCache,
    result: SimulationResult,
}

/// Cache outcome of one event, `store` is only set for a modify.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub load: CacheHit,
    pub store: Option<CacheHit>,
}

impl std::fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.store {
            Some(store) => write!(f, "{} {}", self.load, store),
            None => write!(f, "{}", self.load),
        }
    }
}

impl Simulation {
    pub fn new(geometry: Geometry) -> Result<Self> {
        let lru_cache = LruCache::new(geometry)?;
        info!("{}", lru_cache.format_info());

        Ok(Self {
            lru_cache,
            result: SimulationResult::new(),
        })
    }

    /// Opens, parses and replays the trace at `file` on a fresh cache.
    pub fn run_file(geometry: Geometry, file: impl AsRef<Path>) -> Result<SimulationResult> {
        let trace_file = TraceFile::open(file)?;
        info!("replaying {}", trace_file.path().display());

        Self::new(geometry)?.replay(trace_file.events().map(|event| event.map_err(Error::from)))
    }

    pub fn lru_cache(&self) -> &LruCache {
        &self.lru_cache
    }

    pub fn result(&self) -> SimulationResult {
        self.result
    }

    /// Feeds every event into the cache in order, stopping at the first error.
    pub fn replay<E>(
        &mut self,
        events: impl IntoIterator<Item = Result<TraceEvent, E>>,
    ) -> Result<SimulationResult, E> {
        for event in events {
            self.step(&event?);
        }

        Ok(self.result)
    }

    pub fn step(&mut self, event: &TraceEvent) -> EventOutcome {
        let decoded = self.lru_cache.geometry().decode(event.address);

        let load = self.lru_cache.access(decoded.tag, decoded.set_index);
        self.result.record(load);

        // the store half always finds the line the load just touched
        let store = (event.operation == Operation::Modify).then(|| {
            let store = self.lru_cache.access(decoded.tag, decoded.set_index);
            self.result.record(store);
            store
        });

        self.lru_cache.tick();

        let outcome = EventOutcome { load, store };
        trace!("{} {outcome}", event.to_string().trim_start());
        outcome
    }
}

use crate::lru::CacheHit;

/// Hit, miss and eviction counters of one replay.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl SimulationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, cache_hit: CacheHit) {
        match cache_hit {
            CacheHit::Hit => self.hits += 1,
            CacheHit::Miss => self.misses += 1,
            CacheHit::Eviction { .. } => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn percent_hit(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        100.0 * self.hits as f64 / self.accesses() as f64
    }

    pub fn percent_miss(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        100.0 * self.misses as f64 / self.accesses() as f64
    }
}

impl std::fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tallies_outcomes() {
        let mut result = SimulationResult::new();
        result.record(CacheHit::Miss);
        result.record(CacheHit::Hit);
        result.record(CacheHit::Eviction { prev_tag: 3 });
        result.record(CacheHit::Hit);

        assert_eq!(result.hits(), 2);
        assert_eq!(result.misses(), 2);
        assert_eq!(result.evictions(), 1);
        assert_eq!(result.accesses(), 4);
        assert_eq!(result.percent_hit(), 50.0);
        assert_eq!(result.to_string(), "hits:2 misses:2 evictions:1");
    }

    #[test]
    fn empty_result_has_no_rates() {
        let result = SimulationResult::new();

        assert_eq!(result.percent_hit(), 0.0);
        assert_eq!(result.percent_miss(), 0.0);
        assert_eq!(result.to_string(), "hits:0 misses:0 evictions:0");
    }
}

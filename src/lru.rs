use crate::address::Geometry;
use crate::error::{Error, Result};

/// Set-associative cache with least-recently-used replacement.
///
/// All `S * E` lines live in one contiguous allocation, set `i` owns the
/// lines `i * E .. (i + 1) * E`.
#[derive(Debug)]
pub struct LruCache {
    geometry: Geometry,
    lines: Box<[CacheLine]>,
    // lines accessed since the last tick, they keep a recency of 0
    touched: Vec<usize>,
}

impl LruCache {
    pub fn new(geometry: Geometry) -> Result<Self> {
        let total_lines = geometry.total_lines().ok_or_else(|| {
            Error::Configuration(format!("cache {geometry} has too many lines"))
        })?;

        let mut lines = Vec::new();
        lines.try_reserve_exact(total_lines).map_err(|e| {
            Error::Configuration(format!(
                "unable to allocate {total_lines} cache-lines for {geometry}: {e}"
            ))
        })?;
        lines.resize(total_lines, CacheLine::default());

        Ok(Self {
            geometry,
            lines: lines.into_boxed_slice(),
            touched: Vec::with_capacity(2),
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn format_info(&self) -> String {
        let geometry = &self.geometry;
        let block_size = geometry.block_size();

        let total_size = block_size
            .and_then(|block_size| block_size.checked_mul(self.lines.len() as u64))
            .map_or_else(|| "overflow".to_string(), |size| format!("{size}B"));
        let block_size =
            block_size.map_or_else(|| "overflow".to_string(), |size| format!("{size}B"));

        [
            "LRU Cache:".to_string(),
            format!("\tTotal Size: {total_size}"),
            format!("\tSets: {}", geometry.sets()),
            format!("\tWays: {}", geometry.lines_per_set()),
            format!("\tLine-Size: {block_size}"),
            format!(
                "\t| {} tag bits | {} set bits | {} offset bits |",
                geometry.tag_bits(),
                geometry.set_bits(),
                geometry.block_bits()
            ),
        ]
        .join("\n")
    }

    pub fn reset(&mut self) {
        self.lines.fill(CacheLine::default());
        self.touched.clear();
    }

    pub fn get(&mut self, address: u64) -> CacheHit {
        let decoded = self.geometry.decode(address);
        self.access(decoded.tag, decoded.set_index)
    }

    /// Looks up `tag` in set `set_index`, filling or evicting a line on a miss.
    ///
    /// Panics if `set_index` is not below the number of sets.
    pub fn access(&mut self, tag: u64, set_index: usize) -> CacheHit {
        let ways = self.geometry.lines_per_set();
        let base = set_index * ways;

        let set = CacheSet {
            lines: &mut self.lines[base..base + ways],
        };
        let (way, cache_hit) = set.get(tag);

        self.touched.push(base + way);
        cache_hit
    }

    /// Ages every valid line that was not accessed since the previous tick.
    pub fn tick(&mut self) {
        for (index, line) in self.lines.iter_mut().enumerate() {
            if line.valid && !self.touched.contains(&index) {
                line.recency = line.recency.saturating_add(1);
            }
        }
        self.touched.clear();
    }

    pub fn lines(&self, set_index: usize) -> &[CacheLine] {
        let ways = self.geometry.lines_per_set();
        &self.lines[set_index * ways..(set_index + 1) * ways]
    }
}

struct CacheSet<'a> {
    lines: &'a mut [CacheLine],
}

impl CacheSet<'_> {
    fn get(self, tag: u64) -> (usize, CacheHit) {
        // linear search for cache_line with tag
        let cache_line = self
            .lines
            .iter()
            .position(|line| line.valid && line.tag == tag);

        if let Some(way) = cache_line {
            debug_assert!(
                self.lines
                    .iter()
                    .enumerate()
                    .all(|(i, line)| i == way || !line.valid || line.tag != tag),
                "tag {tag:#x} held by more than one line of a set"
            );

            self.lines[way].recency = 0;
            return (way, CacheHit::Hit);
        }

        if let Some(way) = self.lines.iter().position(|line| !line.valid) {
            self.lines[way] = CacheLine {
                valid: true,
                tag,
                recency: 0,
            };
            return (way, CacheHit::Miss);
        }

        // least recently used line has the largest recency, the first one wins a tie
        let mut way = 0;
        for (i, line) in self.lines.iter().enumerate().skip(1) {
            if line.recency > self.lines[way].recency {
                way = i;
            }
        }

        let lru_line = &mut self.lines[way];
        let prev_tag = lru_line.tag;
        lru_line.tag = tag;
        lru_line.recency = 0;

        (way, CacheHit::Eviction { prev_tag })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheLine {
    valid: bool,
    tag: u64,
    recency: u64,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Tag of the block held by this line, `None` if the line is empty.
    pub fn tag(&self) -> Option<u64> {
        self.valid.then_some(self.tag)
    }

    /// Completed events since the line was last accessed.
    pub fn recency(&self) -> u64 {
        self.recency
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheHit {
    Hit,
    /// Miss that filled an empty line.
    Miss,
    /// Miss that replaced the block tagged `prev_tag`.
    Eviction { prev_tag: u64 },
}

impl std::fmt::Display for CacheHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheHit::Hit => f.write_str("hit"),
            CacheHit::Miss => f.write_str("miss"),
            CacheHit::Eviction { .. } => f.write_str("miss eviction"),
        }
    }
}

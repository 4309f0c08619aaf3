use crate::error::{Error, Result};

/// Shape of the simulated cache.
///
/// - `set_bits` (s): number of set-index bits, the cache has `2^s` sets
/// - `lines_per_set` (E): number of cache-lines in a set
/// - `block_bits` (b): number of block-offset bits, a line holds `2^b` bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Geometry {
    set_bits: u32,
    lines_per_set: usize,
    block_bits: u32,
    set_index_mask: u64,
    offset_mask: u64,
}

/// An address split into its `| tag | set index | block offset |` fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: usize,
    pub offset: u64,
}

impl Geometry {
    pub fn new(set_bits: u32, lines_per_set: usize, block_bits: u32) -> Result<Self> {
        if lines_per_set == 0 {
            return Err(Error::Configuration(
                "a set needs at least one line (-E >= 1)".to_string(),
            ));
        }

        if set_bits.saturating_add(block_bits) > u64::BITS {
            return Err(Error::Configuration(format!(
                "not enough bits in address to index all elements in the cache: \
                 s={set_bits} + b={block_bits} exceeds {}",
                u64::BITS
            )));
        }

        if set_bits >= usize::BITS {
            return Err(Error::Configuration(format!(
                "2^{set_bits} sets cannot be addressed on this platform"
            )));
        }

        let geometry = Self {
            set_bits,
            lines_per_set,
            block_bits,
            set_index_mask: low_mask(set_bits),
            offset_mask: low_mask(block_bits),
        };

        geometry.total_lines().ok_or_else(|| {
            Error::Configuration(format!(
                "{} sets of {lines_per_set} lines overflow the line count",
                geometry.sets()
            ))
        })?;

        Ok(geometry)
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    pub fn lines_per_set(&self) -> usize {
        self.lines_per_set
    }

    pub fn sets(&self) -> usize {
        1 << self.set_bits
    }

    pub fn tag_bits(&self) -> u32 {
        u64::BITS - (self.set_bits + self.block_bits)
    }

    /// Bytes per line, `None` if it does not fit in a `u64`.
    pub fn block_size(&self) -> Option<u64> {
        1u64.checked_shl(self.block_bits)
    }

    pub fn total_lines(&self) -> Option<usize> {
        self.sets().checked_mul(self.lines_per_set)
    }

    pub fn decode(&self, address: u64) -> DecodedAddress {
        // shifting out all 64 bits leaves nothing, not an overflow
        let set_index = address.checked_shr(self.block_bits).unwrap_or(0) & self.set_index_mask;
        let tag = address
            .checked_shr(self.set_bits + self.block_bits)
            .unwrap_or(0);

        DecodedAddress {
            tag,
            set_index: set_index as usize,
            offset: address & self.offset_mask,
        }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "s={}, E={}, b={}",
            self.set_bits, self.lines_per_set, self.block_bits
        )
    }
}

fn low_mask(bits: u32) -> u64 {
    (!0u64).checked_shl(bits).map_or(u64::MAX, |high| !high)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_splits_fields() {
        let geometry = Geometry::new(4, 2, 4).unwrap();
        let decoded = geometry.decode(0x1234);

        assert_eq!(decoded.offset, 0x4);
        assert_eq!(decoded.set_index, 0x3);
        assert_eq!(decoded.tag, 0x12);
    }

    #[test]
    fn decode_without_set_or_offset_bits() {
        let geometry = Geometry::new(0, 1, 0).unwrap();
        let decoded = geometry.decode(0xdead_beef);

        assert_eq!(decoded.offset, 0);
        assert_eq!(decoded.set_index, 0);
        assert_eq!(decoded.tag, 0xdead_beef);
    }

    #[test]
    fn decode_uses_all_64_bits() {
        let geometry = Geometry::new(0, 1, 64).unwrap();
        let decoded = geometry.decode(u64::MAX);

        assert_eq!(decoded.offset, u64::MAX);
        assert_eq!(decoded.set_index, 0);
        assert_eq!(decoded.tag, 0);

        let geometry = Geometry::new(8, 1, 56).unwrap();
        let decoded = geometry.decode(0xab00_0000_0000_0001);
        assert_eq!(decoded.set_index, 0xab);
        assert_eq!(decoded.offset, 1);
        assert_eq!(decoded.tag, 0);
    }

    #[test]
    fn high_addresses_stay_unsigned() {
        let geometry = Geometry::new(1, 1, 1).unwrap();
        let decoded = geometry.decode(0xffff_ffff_ffff_fffe);

        assert_eq!(decoded.offset, 0);
        assert_eq!(decoded.set_index, 1);
        assert_eq!(decoded.tag, 0x3fff_ffff_ffff_ffff);
    }

    #[test]
    fn derived_sizes() {
        let geometry = Geometry::new(5, 1, 5).unwrap();

        assert_eq!(geometry.sets(), 32);
        assert_eq!(geometry.block_size(), Some(32));
        assert_eq!(geometry.total_lines(), Some(32));
        assert_eq!(geometry.tag_bits(), 54);
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert!(matches!(
            Geometry::new(1, 0, 1),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Geometry::new(40, 1, 30),
            Err(Error::Configuration(_))
        ));
    }
}

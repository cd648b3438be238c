//! Cache geometry and address decomposition

use std::fmt;

use thiserror::Error;

use crate::{
    bin::{extract, shl},
    common::Addr,
};

pub const ADDR_BITS: u32 = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("block size {0} is not a power of two")]
    BlockSize(u32),
    #[error("associativity {0} is neither 0 (fully associative) nor a power of two")]
    Associativity(u32),
    #[error("capacity must not be 0 KB")]
    ZeroCapacity,
    #[error("{capacity_kb} KB cannot be divided evenly into sets of {ways} x {block_size} bytes")]
    Indivisible {
        capacity_kb: u32,
        block_size: u32,
        ways: u32,
    },
    #[error("{what} count {count} is not a power of two")]
    NotPowerOfTwo { what: &'static str, count: u64 },
    #[error("set index and block offset need {0} bits, more than a 32-bit address has")]
    TooWide(u32),
}

/// Shape of one cache level, validated once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    block_size: u32,
    associativity: u32,
    capacity_kb: u32,
    set_count: usize,
    lines_per_set: usize,
    offset_bits: u32,
    index_bits: u32,
    tag_bits: u32,
}

/// An address split into its tag, set index and block offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposed {
    pub tag: u32,
    pub set_index: u32,
    pub offset: u32,
}

impl Geometry {
    /// `associativity == 0` makes the cache fully associative: a single set
    /// holding every line.
    pub fn new(block_size: u32, associativity: u32, capacity_kb: u32) -> Result<Self, GeometryError> {
        if !block_size.is_power_of_two() {
            return Err(GeometryError::BlockSize(block_size));
        }
        if associativity != 0 && !associativity.is_power_of_two() {
            return Err(GeometryError::Associativity(associativity));
        }
        if capacity_kb == 0 {
            return Err(GeometryError::ZeroCapacity);
        }
        let capacity = u64::from(capacity_kb) * 1024;
        let ways = associativity.max(1);
        let set_bytes = u64::from(block_size) * u64::from(ways);
        if capacity % set_bytes != 0 {
            return Err(GeometryError::Indivisible {
                capacity_kb,
                block_size,
                ways,
            });
        }
        let (set_count, lines_per_set) = if associativity == 0 {
            (1, capacity / u64::from(block_size))
        } else {
            (capacity / set_bytes, u64::from(associativity))
        };
        if !set_count.is_power_of_two() {
            return Err(GeometryError::NotPowerOfTwo {
                what: "set",
                count: set_count,
            });
        }
        if !lines_per_set.is_power_of_two() {
            return Err(GeometryError::NotPowerOfTwo {
                what: "line",
                count: lines_per_set,
            });
        }
        let offset_bits = block_size.trailing_zeros();
        let index_bits = set_count.trailing_zeros();
        if offset_bits + index_bits > ADDR_BITS {
            return Err(GeometryError::TooWide(offset_bits + index_bits));
        }
        Ok(Self {
            block_size,
            associativity,
            capacity_kb,
            set_count: set_count as usize,
            lines_per_set: lines_per_set as usize,
            offset_bits,
            index_bits,
            tag_bits: ADDR_BITS - index_bits - offset_bits,
        })
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }
    pub fn associativity(&self) -> u32 {
        self.associativity
    }
    pub fn capacity_kb(&self) -> u32 {
        self.capacity_kb
    }
    pub fn is_fully_associative(&self) -> bool {
        self.associativity == 0
    }
    pub fn set_count(&self) -> usize {
        self.set_count
    }
    pub fn lines_per_set(&self) -> usize {
        self.lines_per_set
    }
    pub fn total_lines(&self) -> usize {
        self.set_count * self.lines_per_set
    }
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }
    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    /// splits `addr` into `(tag, set index, offset)`.
    /// ```
    /// use cache_sim::{common::Addr, geometry::Geometry};
    ///
    /// // 16 byte blocks, direct mapped, 1 KB: 64 sets
    /// let g = Geometry::new(16, 1, 1).unwrap();
    /// let d = g.decompose(Addr::new(0x0000_0437));
    ///
    /// assert_eq!(d.offset, 0x7);
    /// assert_eq!(d.set_index, 0x3);
    /// assert_eq!(d.tag, 0x1);
    /// ```
    pub fn decompose(&self, addr: Addr) -> Decomposed {
        let addr = addr.inner();
        let index_start = self.offset_bits;
        let tag_start = self.offset_bits + self.index_bits;
        Decomposed {
            tag: extract(addr, tag_start..ADDR_BITS),
            set_index: extract(addr, index_start..tag_start),
            offset: extract(addr, 0..index_start),
        }
    }

    /// rebuilds the block address named by `(tag, set_index)`; the offset is zero.
    /// ```
    /// use cache_sim::{common::Addr, geometry::Geometry};
    ///
    /// let g = Geometry::new(16, 1, 1).unwrap();
    ///
    /// assert_eq!(g.compose(0x1, 0x3), Addr::new(0x0000_0430));
    /// ```
    pub fn compose(&self, tag: u32, set_index: u32) -> Addr {
        let tag = shl(tag, self.index_bits + self.offset_bits);
        let index = shl(set_index, self.offset_bits);
        Addr::new(tag | index)
    }

    /// `addr` with its block offset cleared.
    pub fn block_addr(&self, addr: Addr) -> Addr {
        let Decomposed { tag, set_index, .. } = self.decompose(addr);
        self.compose(tag, set_index)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ways = if self.is_fully_associative() {
            "fully associative".to_string()
        } else {
            format!("{}-way", self.associativity)
        };
        write!(
            f,
            "{} KB, {} B blocks, {ways}, {} sets (tag/index/offset = {}/{}/{})",
            self.capacity_kb,
            self.block_size,
            self.set_count,
            self.tag_bits,
            self.index_bits,
            self.offset_bits
        )
    }
}

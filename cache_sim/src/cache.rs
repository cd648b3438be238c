use crate::{
    common::Addr,
    geometry::{Decomposed, Geometry, GeometryError},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    valid: bool,
    tag: u32,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    /// tag of the resident block, if any.
    pub fn tag(&self) -> Option<u32> {
        self.valid.then_some(self.tag)
    }
}

/// Lines sharing one set index, replaced round robin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    lines: Vec<CacheLine>,
    /// next line to overwrite, regardless of hits
    cursor: usize,
}

impl Set {
    fn new(num_lines: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); num_lines],
            cursor: 0,
        }
    }
    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }
    pub fn cursor(&self) -> usize {
        self.cursor
    }
    fn find(&self, tag: u32) -> Option<usize> {
        self.lines.iter().position(|l| l.is_valid() && l.tag == tag)
    }
    /// installs `tag` at the cursor. returns the tag it displaced.
    fn replace(&mut self, tag: u32) -> Option<u32> {
        let line = &mut self.lines[self.cursor];
        let displaced = line.tag();
        *line = CacheLine { valid: true, tag };
        self.cursor = (self.cursor + 1) % self.lines.len();
        displaced
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Hit,
    /// the block was allocated; `evicted` is the block it displaced.
    Miss { allocated: Addr, evicted: Option<Addr> },
}

impl ReadOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ReadOutcome::Hit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Hit,
    Miss,
}

/// One cache level. Tracks which blocks are resident; holds no data.
#[derive(Debug, Clone)]
pub struct Cache {
    geometry: Geometry,
    sets: Vec<Set>,
}

impl Cache {
    pub fn new(block_size: u32, associativity: u32, capacity_kb: u32) -> Result<Self, GeometryError> {
        Ok(Self::with_geometry(Geometry::new(
            block_size,
            associativity,
            capacity_kb,
        )?))
    }
    pub fn with_geometry(geometry: Geometry) -> Self {
        Self {
            sets: vec![Set::new(geometry.lines_per_set()); geometry.set_count()],
            geometry,
        }
    }
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
    pub fn sets(&self) -> &[Set] {
        &self.sets
    }
    pub fn valid_lines(&self) -> usize {
        self.sets
            .iter()
            .map(|s| s.lines.iter().filter(|l| l.is_valid()).count())
            .sum()
    }

    pub fn contains(&self, addr: Addr) -> bool {
        let Decomposed { tag, set_index, .. } = self.geometry.decompose(addr);
        self.sets[set_index as usize].find(tag).is_some()
    }

    /// looks `addr` up, allocating it on a miss.
    pub fn probe_read(&mut self, addr: Addr) -> ReadOutcome {
        let Decomposed { tag, set_index, .. } = self.geometry.decompose(addr);
        if self.sets[set_index as usize].find(tag).is_some() {
            return ReadOutcome::Hit;
        }
        let evicted = self.allocate_tag(tag, set_index);
        ReadOutcome::Miss {
            allocated: self.geometry.block_addr(addr),
            evicted,
        }
    }

    /// looks `addr` up. writes never allocate.
    pub fn probe_write(&self, addr: Addr) -> WriteOutcome {
        if self.contains(addr) {
            WriteOutcome::Hit
        } else {
            WriteOutcome::Miss
        }
    }

    /// installs the block of `addr`, returning the block address it displaced.
    pub fn allocate(&mut self, addr: Addr) -> Option<Addr> {
        let Decomposed { tag, set_index, .. } = self.geometry.decompose(addr);
        self.allocate_tag(tag, set_index)
    }

    pub fn allocate_tag(&mut self, tag: u32, set_index: u32) -> Option<Addr> {
        let displaced = self.sets[set_index as usize].replace(tag)?;
        Some(self.geometry.compose(displaced, set_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(v: u32) -> Addr {
        Addr::new(v)
    }

    /// `n` distinct block addresses that all map to set `set_index`.
    fn same_set(cache: &Cache, set_index: u32, n: u32) -> Vec<Addr> {
        (0..n)
            .map(|tag| cache.geometry().compose(tag + 1, set_index))
            .collect()
    }

    #[test]
    fn test_read_miss_then_hit() {
        let mut c = Cache::new(16, 2, 2).unwrap();
        assert_eq!(
            c.probe_read(addr(0x1234)),
            ReadOutcome::Miss {
                allocated: addr(0x1230),
                evicted: None
            }
        );
        assert_eq!(c.probe_read(addr(0x1234)), ReadOutcome::Hit);
        // same block, different offset
        assert_eq!(c.probe_read(addr(0x123f)), ReadOutcome::Hit);
        assert_eq!(c.valid_lines(), 1);
    }
    #[test]
    fn test_hit_does_not_mutate() {
        let mut c = Cache::new(16, 4, 4).unwrap();
        for a in same_set(&c, 5, 3) {
            c.probe_read(a);
        }
        let before = c.sets().to_vec();
        let a = same_set(&c, 5, 1)[0];
        assert!(c.probe_read(a).is_hit());
        assert_eq!(c.sets(), &before[..]);
        assert_eq!(c.sets()[5].cursor(), 3);
    }
    #[test]
    fn test_fifo_replacement() {
        let ways = 4;
        let mut c = Cache::new(32, ways, 8).unwrap();
        let addrs = same_set(&c, 7, ways + 1);
        for &a in &addrs[..ways as usize] {
            assert_eq!(
                c.probe_read(a),
                ReadOutcome::Miss {
                    allocated: a,
                    evicted: None
                }
            );
        }
        // hits on the oldest block do not protect it
        assert!(c.probe_read(addrs[0]).is_hit());
        assert!(c.probe_read(addrs[0]).is_hit());
        assert_eq!(
            c.probe_read(addrs[ways as usize]),
            ReadOutcome::Miss {
                allocated: addrs[ways as usize],
                evicted: Some(addrs[0])
            }
        );
        assert!(!c.contains(addrs[0]));
        for &a in &addrs[1..] {
            assert!(c.contains(a));
        }
    }
    #[test]
    fn test_direct_mapped_conflict() {
        let mut c = Cache::new(16, 1, 1).unwrap();
        c.probe_read(addr(0x0));
        assert_eq!(
            c.probe_read(addr(0x400)),
            ReadOutcome::Miss {
                allocated: addr(0x400),
                evicted: Some(addr(0x0))
            }
        );
        assert_eq!(c.sets()[0].cursor(), 0);
    }
    #[test]
    fn test_fully_associative() {
        // 4 lines in one set
        let mut c = Cache::new(256, 0, 1).unwrap();
        assert_eq!(c.sets().len(), 1);
        assert_eq!(c.sets()[0].lines().len(), 4);
        for i in 0..4 {
            assert!(!c.probe_read(addr(i * 0x1000)).is_hit());
        }
        for i in 0..4 {
            assert!(c.probe_read(addr(i * 0x1000 + 0x10)).is_hit());
        }
        assert_eq!(
            c.probe_read(addr(0x8000)),
            ReadOutcome::Miss {
                allocated: addr(0x8000),
                evicted: Some(addr(0x0))
            }
        );
    }
    #[test]
    fn test_occupancy_bounded() {
        let mut c = Cache::new(16, 2, 1).unwrap();
        let total = c.geometry().total_lines();
        for i in 0..(4 * total as u32) {
            c.probe_read(addr(i * 16));
            assert!(c.valid_lines() <= total);
        }
        assert_eq!(c.valid_lines(), total);
    }
    #[test]
    fn test_writes_never_allocate() {
        let mut c = Cache::new(16, 2, 1).unwrap();
        c.probe_read(addr(0x40));
        let before = c.sets().to_vec();
        assert_eq!(c.probe_write(addr(0x40)), WriteOutcome::Hit);
        assert_eq!(c.probe_write(addr(0x4000)), WriteOutcome::Miss);
        assert_eq!(c.probe_write(addr(0x4000)), WriteOutcome::Miss);
        assert_eq!(c.sets(), &before[..]);
    }
    #[test]
    fn test_line_validity() {
        let mut c = Cache::new(16, 2, 2).unwrap();
        assert!(c.sets().iter().all(|s| s.lines().iter().all(|l| !l.is_valid())));
        c.probe_read(addr(0x1234));
        let set = &c.sets()[0x23];
        assert!(set.lines()[0].is_valid());
        assert_eq!(set.lines()[0].tag(), Some(0x4));
        assert!(!set.lines()[1].is_valid());
        assert_eq!(set.lines()[1].tag(), None);
    }
    #[test]
    fn test_allocate_reports_previous_tag() {
        let mut c = Cache::new(16, 1, 1).unwrap();
        assert_eq!(c.allocate(addr(0x10)), None);
        assert_eq!(c.allocate(addr(0x410)), Some(addr(0x10)));
        assert_eq!(c.allocate_tag(2, 1), Some(addr(0x410)));
        assert!(c.contains(addr(0x81f)));
    }
}

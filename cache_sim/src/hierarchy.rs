use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    cache::{Cache, ReadOutcome, WriteOutcome},
    common::Addr,
    config::HierarchyConfig,
    geometry::GeometryError,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// Per-level result of one access. The discriminant is the code written to
/// the result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AccessState {
    NoAction = 0,
    ReadHit = 1,
    ReadMiss = 2,
    WriteHit = 3,
    WriteMiss = 4,
}

use AccessState::*;

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

impl Op {
    /// only an exact `R` reads; every other token is a write.
    pub fn from_token(token: &str) -> Self {
        if token == "R" {
            Op::Read
        } else {
            Op::Write
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessResult {
    pub l1: AccessState,
    pub l2: AccessState,
}

impl AccessResult {
    pub fn new(l1: AccessState, l2: AccessState) -> Self {
        Self { l1, l2 }
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.l1, self.l2)
    }
}

/// L1 backed by L2. Reads allocate at both levels and push blocks evicted
/// from L1 down into L2; writes only probe.
pub struct Hierarchy {
    l1: Cache,
    l2: Cache,
    #[cfg(feature = "stat")]
    stat: stat::HierarchyStat,
}

impl Hierarchy {
    pub fn new(l1: Cache, l2: Cache) -> Self {
        Self {
            l1,
            l2,
            #[cfg(feature = "stat")]
            stat: Default::default(),
        }
    }
    pub fn from_config(config: &HierarchyConfig) -> Result<Self, GeometryError> {
        let l1 = Cache::with_geometry(config.l1.geometry()?);
        let l2 = Cache::with_geometry(config.l2.geometry()?);
        log::info!("L1: {}", l1.geometry());
        log::info!("L2: {}", l2.geometry());
        Ok(Self::new(l1, l2))
    }
    pub fn l1(&self) -> &Cache {
        &self.l1
    }
    pub fn l2(&self) -> &Cache {
        &self.l2
    }

    pub fn access(&mut self, op: Op, addr: Addr) -> AccessResult {
        let res = match op {
            Op::Read => self.read(addr),
            Op::Write => self.write(addr),
        };
        #[cfg(feature = "stat")]
        self.stat.record(res);
        res
    }

    fn read(&mut self, addr: Addr) -> AccessResult {
        let ReadOutcome::Miss { allocated, evicted } = self.l1.probe_read(addr) else {
            return AccessResult::new(ReadHit, NoAction);
        };
        let l2 = match self.l2.probe_read(addr) {
            ReadOutcome::Hit => ReadHit,
            ReadOutcome::Miss {
                evicted: l2_evicted,
                ..
            } => {
                if let Some(e) = l2_evicted {
                    log::debug!("L2 evicted {e} for {addr}");
                    #[cfg(feature = "stat")]
                    self.stat.l2.on_evict();
                }
                ReadMiss
            }
        };
        if let Some(evicted) = evicted.filter(|&e| e != allocated) {
            log::debug!("L1 evicted {evicted} for {addr}; forwarding to L2");
            let displaced = self.l2.allocate(evicted);
            #[cfg(feature = "stat")]
            {
                self.stat.l1.on_evict();
                self.stat.l2.on_receive();
                if displaced.is_some() {
                    self.stat.l2.on_evict();
                }
            }
            if let Some(d) = displaced {
                log::debug!("L2 evicted {d} for forwarded {evicted}");
            }
        }
        AccessResult::new(ReadMiss, l2)
    }

    fn write(&self, addr: Addr) -> AccessResult {
        match self.l1.probe_write(addr) {
            WriteOutcome::Hit => AccessResult::new(WriteHit, NoAction),
            WriteOutcome::Miss => {
                let l2 = match self.l2.probe_write(addr) {
                    WriteOutcome::Hit => WriteHit,
                    WriteOutcome::Miss => WriteMiss,
                };
                AccessResult::new(WriteMiss, l2)
            }
        }
    }
}

#[cfg(feature = "stat")]
impl AddStats for Hierarchy {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat.l1.report("L1 cache stat", &self.l1)));
        buf.push(Box::new(self.stat.l2.report("L2 cache stat", &self.l2)));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::{AccessResult, AccessState};
    use crate::{cache::Cache, stat::*};

    #[derive(Default, Clone, Copy)]
    pub struct LevelStat {
        pub read_hit: usize,
        pub read_miss: usize,
        pub write_hit: usize,
        pub write_miss: usize,
        pub evictions: usize,
        /// blocks pushed down from the level above
        pub received: usize,
    }

    impl LevelStat {
        pub fn on_access(&mut self, s: AccessState) {
            match s {
                AccessState::NoAction => {}
                AccessState::ReadHit => self.read_hit += 1,
                AccessState::ReadMiss => self.read_miss += 1,
                AccessState::WriteHit => self.write_hit += 1,
                AccessState::WriteMiss => self.write_miss += 1,
            }
        }
        pub fn on_evict(&mut self) {
            self.evictions += 1;
        }
        pub fn on_receive(&mut self) {
            self.received += 1;
        }
        pub fn report(&self, header: &'static str, cache: &Cache) -> LevelReport {
            LevelReport {
                header,
                stat: *self,
                valid_lines: cache.valid_lines(),
                total_lines: cache.geometry().total_lines(),
            }
        }
    }

    #[derive(Default)]
    pub struct HierarchyStat {
        pub l1: LevelStat,
        pub l2: LevelStat,
    }

    impl HierarchyStat {
        pub fn record(&mut self, res: AccessResult) {
            self.l1.on_access(res.l1);
            self.l2.on_access(res.l2);
        }
    }

    pub struct LevelReport {
        header: &'static str,
        stat: LevelStat,
        valid_lines: usize,
        total_lines: usize,
    }

    impl Stat for LevelReport {
        fn view(&self, max_width: usize) -> Box<dyn StatView + '_> {
            Box::new(LevelStatView::new(self, max_width))
        }
    }

    /// `  <name>: <count>`
    const COUNT_WIDTH: usize = 24;
    /// `  <name>: <count> (<percent>%)`
    const RATIO_WIDTH: usize = COUNT_WIDTH + 14;

    pub struct LevelStatView<'a> {
        report: &'a LevelReport,
        /// percentages are dropped when they do not fit
        ratios: bool,
    }

    impl<'a> LevelStatView<'a> {
        pub fn new(report: &'a LevelReport, max_width: usize) -> Self {
            Self {
                report,
                ratios: max_width >= RATIO_WIDTH,
            }
        }
    }

    impl StatView for LevelStatView<'_> {
        fn header(&self) -> &'static str {
            self.report.header
        }
        fn width(&self) -> usize {
            if self.ratios {
                RATIO_WIDTH
            } else {
                COUNT_WIDTH
            }
        }
    }

    fn pct(n: usize, total: usize) -> String {
        if total == 0 {
            format!("{:.6}", 0.)
        } else {
            format!("{:.6}", 100. * n as f64 / total as f64)
        }
    }

    impl fmt::Display for LevelStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = &self.report.stat;
            let reads = s.read_hit + s.read_miss;
            let writes = s.write_hit + s.write_miss;
            macro_rules! output {
                ($kind:ident / $total:ident => $name:expr) => {{
                    let n = s.$kind;
                    if self.ratios {
                        let p = pct(n, $total);
                        writeln!(f, "  {:>10}: {n:>10} ({p:>10}%)", $name)
                    } else {
                        writeln!(f, "  {:>10}: {n:>10}", $name)
                    }
                }};
            }
            output!(read_hit / reads => "read hit")?;
            output!(read_miss / reads => "read miss")?;
            output!(write_hit / writes => "write hit")?;
            output!(write_miss / writes => "write miss")?;
            writeln!(f, "  {:>10}: {:>10}", "evictions", s.evictions)?;
            writeln!(f, "  {:>10}: {:>10}", "received", s.received)?;
            let occupancy = format!("{} / {}", self.report.valid_lines, self.report.total_lines);
            write!(f, "  {:>10}: {occupancy:>10}", "occupancy")
        }
    }
}

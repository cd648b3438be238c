use std::io;

use anyhow::Result;

use crate::{
    config::HierarchyConfig,
    hierarchy::{AccessResult, Hierarchy},
    io::{Output, TextOutput},
    trace::{TraceEntry, TraceReader},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// Feeds trace entries through a [`Hierarchy`], one result line per entry.
pub struct Simulator<O> {
    hierarchy: Hierarchy,
    output: O,
    accesses: usize,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl<O: Output> Simulator<O> {
    pub fn new(hierarchy: Hierarchy, output: O) -> Self {
        Self {
            hierarchy,
            output,
            accesses: 0,
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        }
    }

    pub fn step(&mut self, entry: TraceEntry) -> Result<AccessResult> {
        let res = self.hierarchy.access(entry.op, entry.addr);
        self.output.record(res)?;
        self.accesses += 1;
        Ok(res)
    }

    /// simulates every entry in order. returns the number of accesses run.
    pub fn run<I>(&mut self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = io::Result<TraceEntry>>,
    {
        let before = self.accesses;
        for entry in entries {
            self.step(entry?)?;
        }
        #[cfg(feature = "stat")]
        self.stat_builder.stop_timer();
        let n = self.accesses - before;
        log::info!("simulated {n} accesses.");
        Ok(n)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }
    pub fn accesses(&self) -> usize {
        self.accesses
    }
    pub fn into_output(self) -> O {
        self.output
    }
}

impl<O> Simulator<O> {
    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl<O> AddStats for Simulator<O> {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish(self.accesses)));
        self.hierarchy.add_stats(buf);
    }
}

/// runs `trace` against caches built from the plain parameter text `config`
/// and returns the result file contents.
pub fn simulate_str(config: &str, trace: &str) -> Result<String> {
    let config = HierarchyConfig::parse(config)?;
    let hierarchy = Hierarchy::from_config(&config)?;
    let mut sim = Simulator::new(hierarchy, TextOutput::new(Vec::new()));
    sim.run(TraceReader::new(trace.as_bytes()))?;
    let buf = sim.into_output().finish()?;
    Ok(String::from_utf8(buf)?)
}

#[cfg(feature = "stat")]
mod stat {
    use std::{fmt, time};

    use crate::stat::*;

    pub struct SimStatBuilder {
        begin: time::Instant,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                elapsed: None,
            }
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(self.begin.elapsed())
        }
        pub fn finish(&self, accesses: usize) -> SimStat {
            SimStat {
                accesses,
                elapsed: self.elapsed.unwrap_or_else(|| self.begin.elapsed()),
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        accesses: usize,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> &'static str {
            "simulator stat"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ms = format!("{} ms", self.elapsed.as_millis());
            writeln!(f, "  elapsed total: {ms:>10}")?;
            let accesses = format!("#{}", self.accesses);
            write!(f, "  accesses total: {accesses:>9}")
        }
    }
}

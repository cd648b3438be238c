use std::fmt;

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn len(&self) -> usize {
        self.stats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
    /// lays every report out in one frame no wider than `max_width`.
    pub fn view(&self, max_width: usize) -> StatsView<'_> {
        let views: Vec<_> = self.stats.iter().map(|s| s.view(max_width)).collect();
        let width = views
            .iter()
            .map(|v| v.header().len().max(v.width()))
            .max()
            .unwrap_or(0)
            .min(max_width);
        StatsView { views, width }
    }
}

pub struct StatsView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
    /// width of the frame rules
    width: usize,
}

impl fmt::Display for StatsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width;
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            writeln!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

use std::io::Write;

use anyhow::Result;

use crate::hierarchy::AccessResult;

pub trait Output {
    fn record(&mut self, res: AccessResult) -> Result<()>;
}

/// Discards every result.
pub struct EmptyIO {}

impl EmptyIO {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for EmptyIO {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for EmptyIO {
    fn record(&mut self, _: AccessResult) -> Result<()> {
        Ok(())
    }
}

/// Writes one `<L1 state> <L2 state>` line per access.
pub struct TextOutput<W: Write> {
    inner: W,
}

impl<W: Write> TextOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
    /// flushes and hands back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Output for TextOutput<W> {
    fn record(&mut self, res: AccessResult) -> Result<()> {
        writeln!(self.inner, "{res}")?;
        Ok(())
    }
}

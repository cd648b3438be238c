use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// a byte address in the simulated 32-bit address space
pub struct Addr(u32);

impl Addr {
    pub const fn new(v: u32) -> Self {
        Self(v)
    }
    pub const fn inner(self) -> u32 {
        self.0
    }
}

impl From<u32> for Addr {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_display() {
        assert_eq!("0x00000400", Addr::new(0x400).to_string());
        assert_eq!("0xffffffff", Addr::from(u32::MAX).to_string());
    }
}

use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use nom::{
    bytes::complete::take_till1,
    character::complete::{multispace0, u32},
    IResult,
};
use serde::Deserialize;

use crate::geometry::{Geometry, GeometryError};

/// Parameters of one cache level, as read from the parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    pub block_size: u32,
    /// lines per set; 0 for fully associative
    pub associativity: u32,
    pub capacity_kb: u32,
}

impl CacheConfig {
    pub fn new(block_size: u32, associativity: u32, capacity_kb: u32) -> Self {
        Self {
            block_size,
            associativity,
            capacity_kb,
        }
    }
    pub fn geometry(&self) -> Result<Geometry, GeometryError> {
        Geometry::new(self.block_size, self.associativity, self.capacity_kb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HierarchyConfig {
    pub l1: CacheConfig,
    pub l2: CacheConfig,
}

impl HierarchyConfig {
    /// parses the plain parameter file: a label followed by block size,
    /// associativity and capacity in KB, first for L1 and then for L2.
    /// tokens are separated by any whitespace.
    pub fn parse(s: &str) -> Result<Self> {
        let (rest, config) = hierarchy(s).map_err(|e| anyhow!("failed to parse cache parameters: {e}"))?;
        if !rest.trim().is_empty() {
            log::debug!("ignoring trailing cache parameters: {:?}", rest.trim());
        }
        Ok(config)
    }

    pub fn deser(file: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(file)?)
    }

    /// reads `path`, choosing the JSON form for a `.json` extension.
    pub fn load(path: &Path) -> Result<Self> {
        let is_json = path.extension().map_or(false, |e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::deser(fs::File::open(path)?)
        } else {
            Self::parse(&fs::read_to_string(path)?)
        }
    }
}

fn label(input: &str) -> IResult<&str, &str> {
    let (input, _) = multispace0(input)?;
    take_till1(char::is_whitespace)(input)
}

fn number(input: &str) -> IResult<&str, u32> {
    let (input, _) = multispace0(input)?;
    u32(input)
}

fn level(input: &str) -> IResult<&str, CacheConfig> {
    let (input, _) = label(input)?;
    let (input, block_size) = number(input)?;
    let (input, associativity) = number(input)?;
    let (input, capacity_kb) = number(input)?;
    Ok((input, CacheConfig::new(block_size, associativity, capacity_kb)))
}

fn hierarchy(input: &str) -> IResult<&str, HierarchyConfig> {
    let (input, l1) = level(input)?;
    let (input, l2) = level(input)?;
    Ok((input, HierarchyConfig { l1, l2 }))
}

mod bin;
pub mod cache;
pub mod common;
pub mod config;
pub mod geometry;
pub mod hierarchy;
pub mod io;
pub mod sim;
pub mod trace;

#[cfg(feature = "stat")]
pub mod stat;

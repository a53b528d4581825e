//! InfluxDB client for the Plex collector.

pub mod client;
pub mod config;
pub mod health;
pub mod line;

pub use client::*;
pub use config::*;

//! Background polling for the Plex collector.
//!
//! - Poll loop (sessions → points → InfluxDB, library reports on a slower interval)
//! - Sink writer (create-database-and-retry-once write path)

pub mod config;
pub mod poll;
pub mod writer;

pub use config::*;
pub use poll::*;
pub use writer::*;

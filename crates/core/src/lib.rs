//! Core types and the session metrics pipeline for the Plex collector.

pub mod aggregate;
pub mod error;
pub mod library;
pub mod media;
pub mod point;
pub mod server;
pub mod session;
pub mod stream;

pub use aggregate::*;
pub use error::{Error, Result};
pub use library::{LibraryInventoryReporter, LibraryReport, SectionInventory};
pub use media::*;
pub use point::{FieldValue, Point};
pub use server::{MediaServer, PointSink};
pub use session::*;
pub use stream::{extract, position_percent, ExtractedStream, NormalizedStreamMetrics, TranscodeType};

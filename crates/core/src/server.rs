//! Seams to the media server and the metrics store.

use async_trait::async_trait;

use crate::error::Result;
use crate::media::{LibrarySection, RawSession, RecentItem, ShowSummary};
use crate::point::Point;

/// A media server the collector polls.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Value of the `host` tag for this server's points.
    fn host(&self) -> &str;

    async fn list_active_sessions(&self) -> Result<Vec<RawSession>>;

    async fn list_library_sections(&self) -> Result<Vec<LibrarySection>>;

    /// Number of top-level items in a section.
    async fn count_items(&self, section: &LibrarySection) -> Result<u64>;

    /// Every show in a `show` section with its season and episode counts.
    async fn list_shows(&self, section: &LibrarySection) -> Result<Vec<ShowSummary>>;

    async fn list_recently_added(
        &self,
        section: &LibrarySection,
        max: usize,
    ) -> Result<Vec<RecentItem>>;
}

/// A store that accepts batches of points.
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Writes a batch. A missing target database must surface as
    /// [`Error::DatabaseNotFound`](crate::Error::DatabaseNotFound).
    async fn write_points(&self, points: &[Point]) -> Result<()>;

    async fn create_database(&self) -> Result<()>;
}

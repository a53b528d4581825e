//! Library inventory and recently-added reporting.
//!
//! Stateless: every run queries the server afresh. Counting episodes and
//! seasons walks every show of a `show` section, so this is meant to run on
//! a longer interval than session polling.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::media::{LibrarySection, RecentItem};
use crate::point::Point;
use crate::server::MediaServer;

pub const LIBRARIES: &str = "libraries";
pub const RECENTLY_ADDED: &str = "recently_added";

/// Items fetched per section for the recently-added report.
pub const RECENTLY_ADDED_MAX: usize = 10;

/// Counts for one library section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionInventory {
    pub section: LibrarySection,
    pub items: u64,
    /// Present only for `show` sections.
    pub episodes: Option<u64>,
    pub seasons: Option<u64>,
}

impl SectionInventory {
    pub fn to_point(&self, host: &str) -> Point {
        let mut point = Point::new(LIBRARIES)
            .tag("host", host)
            .tag("lib_name", self.section.title.as_str())
            .tag("lib_type", self.section.kind.as_str())
            .field("items", self.items);

        if let Some(episodes) = self.episodes {
            point = point.field("episodes", episodes);
        }
        if let Some(seasons) = self.seasons {
            point = point.field("seasons", seasons);
        }
        point
    }
}

/// Builds the `recently_added` point for an item.
pub fn recently_added_point(host: &str, item: &RecentItem) -> Point {
    let title = match item.grandparent_title.as_deref() {
        Some(grandparent) if !grandparent.is_empty() => format!("{} - {}", grandparent, item.title),
        _ => item.title.clone(),
    };

    Point::new(RECENTLY_ADDED)
        .tag("host", host)
        .field("media_type", title_case(&item.kind))
        .field("added_at", format_added_at(item.added_at))
        .field("title", title)
}

/// ISO-8601 UTC with second precision.
pub fn format_added_at(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Upper-cases the first letter of each word and lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}

/// Per-section outcome of a library run.
#[derive(Debug, Default)]
pub struct LibraryReport {
    pub points: Vec<Point>,
    /// Sections that failed, with the error. Other sections still report.
    pub failures: Vec<(String, Error)>,
}

/// Collects library inventory and recently-added points from a server.
pub struct LibraryInventoryReporter;

impl LibraryInventoryReporter {
    /// Counts one section, summing episodes and seasons over its shows.
    pub async fn inventory(
        server: &dyn MediaServer,
        section: &LibrarySection,
    ) -> Result<SectionInventory> {
        let items = server.count_items(section).await?;

        let (episodes, seasons) = if section.is_show() {
            let shows = server.list_shows(section).await?;
            let episodes = shows.iter().map(|s| s.episodes).sum();
            let seasons = shows.iter().map(|s| s.seasons).sum();
            (Some(episodes), Some(seasons))
        } else {
            (None, None)
        };

        Ok(SectionInventory {
            section: section.clone(),
            items,
            episodes,
            seasons,
        })
    }

    /// One `libraries` point per section.
    pub async fn library_points(server: &dyn MediaServer) -> Result<LibraryReport> {
        let sections = server.list_library_sections().await?;
        let mut report = LibraryReport::default();

        for section in &sections {
            match Self::inventory(server, section).await {
                Ok(inventory) => report.points.push(inventory.to_point(server.host())),
                Err(e) => report.failures.push((section.title.clone(), e)),
            }
        }

        Ok(report)
    }

    /// One `recently_added` point per item, up to
    /// [`RECENTLY_ADDED_MAX`] items per section.
    pub async fn recently_added_points(server: &dyn MediaServer) -> Result<LibraryReport> {
        let sections = server.list_library_sections().await?;
        let mut report = LibraryReport::default();

        for section in &sections {
            match server.list_recently_added(section, RECENTLY_ADDED_MAX).await {
                Ok(items) => report.points.extend(
                    items
                        .iter()
                        .take(RECENTLY_ADDED_MAX)
                        .map(|item| recently_added_point(server.host(), item)),
                ),
                Err(e) => report.failures.push((section.title.clone(), e)),
            }
        }

        Ok(report)
    }
}

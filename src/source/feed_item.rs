//! The entry type every feed source produces.
//!
//! A `FeedItem` is an immutable snapshot of one `<item>` as it looked on the
//! poll that fetched it.  Nothing downstream edits one in place: the filter
//! keeps or drops items, and each poll replaces the whole list.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// A single feed entry.
///
/// ## Identity
///
/// Change detection compares entries by [`title`](FeedItem::title) alone.
/// Two distinct deals that share a headline therefore count as one, and an
/// upstream edit to a headline counts as new content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Headline.  `(untitled)` when the source omitted it.
    pub title: String,

    /// URL of the full post, if the feed gave one.
    pub link: Option<String>,

    /// Description text; empty when the feed has none.
    pub summary: String,

    /// Publication timestamp.  `None` if the feed omitted it or it could not
    /// be parsed.
    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Calendar day of publication on the host's local clock.
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.published
            .map(|ts| ts.with_timezone(&Local).date_naive())
    }

    /// Whether the entry was published on `day` (local calendar date).
    /// Undated entries are never new.
    pub fn is_published_on(&self, day: NaiveDate) -> bool {
        self.published_on() == Some(day)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Feed fetching.
//!
//! [`DataSource`] is the seam between the poller and the network: one call,
//! one fetch, one parse.  [`RssSource`] is the only production
//! implementation; tests substitute scripted sources.

mod feed_item;
mod rss;

pub use feed_item::FeedItem;
pub use rss::RssSource;

#[cfg(test)]
pub(crate) use feed_item::tests::make_item;

use crate::error::FetchError;

/// Something the poller can fetch entries from.
///
/// `fetch` runs on the scheduler thread, so implementations must be
/// [`Send`] and [`Sync`].  It must not retry: the next tick is the retry.
/// It should bound its own latency, because a fetch that never returns
/// stalls every later poll.
pub trait DataSource: Send + Sync {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    /// Fetch and parse the current list of entries, in feed order.
    fn fetch(&self) -> Result<Vec<FeedItem>, FetchError>;
}

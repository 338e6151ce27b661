//! Entry filtering.

use chrono::NaiveDate;

use crate::settings::FilterRule;
use crate::source::FeedItem;

/// An entry that passed the filter, plus whether it was published on the day
/// the poll ran.  The display marks such entries `[new]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleEntry {
    pub item: FeedItem,
    pub new_today: bool,
}

/// Apply `rule` to `items`, preserving feed order.
///
/// Keyword matching is plain substring containment on the lowercased title
/// and summary joined by a space, so `"sale"` also matches `"wholesale"`.
/// `today` is taken once per poll so every entry in a cycle is judged
/// against the same date.
pub fn apply(items: Vec<FeedItem>, rule: &FilterRule, today: NaiveDate) -> Vec<VisibleEntry> {
    let keywords: &[String] = match rule {
        FilterRule::AllEntries => &[],
        FilterRule::KeywordMatch(keywords) => keywords,
    };

    items
        .into_iter()
        .filter(|item| keywords.is_empty() || matches_any(item, keywords))
        .map(|item| VisibleEntry {
            new_today: item.is_published_on(today),
            item,
        })
        .collect()
}

fn matches_any(item: &FeedItem, keywords: &[String]) -> bool {
    let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

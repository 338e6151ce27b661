//! Change detection between consecutive polls.
//!
//! Entries are identified by title only, and the comparison is a plain set
//! comparison: any title added, removed or renamed is a change, while a
//! reordering of the same titles is not.  "Three new deals" and "the whole
//! list was replaced" are indistinguishable here.  Duplicate titles collapse
//! into one identity, so a second deal reusing a headline goes unnoticed.

use std::collections::HashSet;

use crate::filter::VisibleEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub changed: bool,
    /// Title set of the current entries; becomes the next poll's baseline.
    pub titles: HashSet<String>,
}

pub fn detect(previous: &HashSet<String>, current: &[VisibleEntry]) -> Detection {
    let titles: HashSet<String> = current.iter().map(|e| e.item.title.clone()).collect();
    Detection {
        changed: titles != *previous,
        titles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::make_item;

    fn entries(titles: &[&str]) -> Vec<VisibleEntry> {
        titles
            .iter()
            .map(|t| VisibleEntry {
                item: make_item(t, ""),
                new_today: false,
            })
            .collect()
    }

    fn set(titles: &[&str]) -> HashSet<String> {
        titles.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn same_titles_in_any_order_are_unchanged() {
        let previous = set(&["A", "B", "C"]);

        let detection = detect(&previous, &entries(&["C", "A", "B"]));

        assert!(!detection.changed);
        assert_eq!(detection.titles, previous);
    }

    #[test]
    fn added_title_is_a_change() {
        let detection = detect(&set(&["A", "B"]), &entries(&["A", "B", "C"]));

        assert!(detection.changed);
        assert_eq!(detection.titles, set(&["A", "B", "C"]));
    }

    #[test]
    fn removed_title_is_a_change() {
        assert!(detect(&set(&["A", "B"]), &entries(&["A"])).changed);
    }

    #[test]
    fn renamed_title_is_a_change() {
        assert!(detect(&set(&["A", "B"]), &entries(&["A", "B (updated)"])).changed);
    }

    #[test]
    fn first_non_empty_poll_is_a_change() {
        assert!(detect(&HashSet::new(), &entries(&["A"])).changed);
    }

    #[test]
    fn empty_after_empty_is_unchanged() {
        assert!(!detect(&HashSet::new(), &entries(&[])).changed);
    }

    #[test]
    fn duplicate_titles_collapse_to_one_identity() {
        // Known limitation: a second entry reusing a title is not new content.
        let detection = detect(&set(&["Deal"]), &entries(&["Deal", "Deal"]));

        assert!(!detection.changed);
        assert_eq!(detection.titles.len(), 1);
    }
}

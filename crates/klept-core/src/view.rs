//! Derived display list
//!
//! Ordering is never persisted; it is recomputed from the collection and the
//! current query every time the presentation layer renders.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::Bookmark;

/// Search text and tag filter selected by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub tag: Option<String>,
}

impl ViewQuery {
    /// An empty tag means no tag filter
    pub fn new(search: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            search: search.into(),
            tag: tag.filter(|t| !t.is_empty()),
        }
    }

    /// The tag filter, if one is set
    pub fn selected_tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }

    /// Select a tag, or clear the filter if it is already selected
    pub fn toggle_tag(&mut self, tag: &str) {
        if self.tag.as_deref() == Some(tag) {
            self.tag = None;
        } else {
            self.tag = Some(tag.to_string());
        }
    }

    /// Top entry of the view for this query
    pub fn first_match<'a>(&self, bookmarks: &'a [Bookmark]) -> Option<&'a Bookmark> {
        visible_bookmarks(bookmarks, self).into_iter().next()
    }

    /// Whether any filter is active
    pub fn is_filtered(&self) -> bool {
        !self.search.trim().is_empty() || self.selected_tag().is_some()
    }
}

/// Filter and order bookmarks for display
///
/// 1. Keep entries whose title, url or any tag contains the trimmed search
///    text, ignoring case.
/// 2. With a tag selected, keep entries carrying it and sort by title.
/// 3. Otherwise pinned entries come first sorted by title, followed by the
///    rest newest first.
pub fn visible_bookmarks<'a>(bookmarks: &'a [Bookmark], query: &ViewQuery) -> Vec<&'a Bookmark> {
    let needle = query.search.trim().to_lowercase();
    let matching = bookmarks.iter().filter(|b| matches_search(b, &needle));

    if let Some(tag) = query.selected_tag() {
        let mut tagged: Vec<&Bookmark> = matching.filter(|b| b.has_tag(tag)).collect();
        tagged.sort_by(|a, b| compare_titles(&a.title, &b.title));
        return tagged;
    }

    let (mut pinned, mut rest): (Vec<&Bookmark>, Vec<&Bookmark>) = matching.partition(|b| b.pinned);
    pinned.sort_by(|a, b| compare_titles(&a.title, &b.title));
    rest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    pinned.extend(rest);
    pinned
}

fn matches_search(bookmark: &Bookmark, needle: &str) -> bool {
    needle.is_empty()
        || bookmark.title.to_lowercase().contains(needle)
        || bookmark.url.to_lowercase().contains(needle)
        || bookmark.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Case-insensitive title order, raw text as tiebreak
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Every tag in the collection, sorted and deduplicated
pub fn all_tags(bookmarks: &[Bookmark]) -> Vec<String> {
    bookmarks
        .iter()
        .flat_map(|b| b.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

//! List sort/filter projection
//!
//! Pure functions deriving the displayed list from a fetched collection.
//! The source slice is never modified; identical inputs give identical
//! output, so results can be memoized by the caller.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Extracts the timestamp a list is ordered by
pub type SortKey<T> = fn(&T) -> DateTime<Utc>;

/// Items for which this returns `true` are listed ahead of the rest
pub type Pinned<T> = fn(&T) -> bool;

/// Extracts the text fields searched by a filter
pub type TextFields<T> = fn(&T) -> Vec<&str>;

/// Case-insensitive substring filter over one or more text fields
pub struct TextFilter<T> {
    pub query: String,
    pub fields: TextFields<T>,
}

impl<T> Clone for TextFilter<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            fields: self.fields,
        }
    }
}

impl<T> TextFilter<T> {
    pub fn new(query: impl Into<String>, fields: TextFields<T>) -> Self {
        Self {
            query: query.into(),
            fields,
        }
    }

    /// Whether `item` passes; an empty (or blank) query passes everything
    pub fn matches(&self, item: &T) -> bool {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        (self.fields)(item)
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// How to derive a view list
pub struct Projection<T> {
    pub sort_key: Option<SortKey<T>>,
    pub sort_order: SortOrder,
    /// Leading group; `sort_key` orders items within each group
    pub pinned: Option<Pinned<T>>,
    pub text_filter: Option<TextFilter<T>>,
    /// Additional predicate, e.g. the selected tab
    pub predicate: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            sort_key: self.sort_key,
            sort_order: self.sort_order,
            pinned: self.pinned,
            text_filter: self.text_filter.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> Default for Projection<T> {
    fn default() -> Self {
        Self {
            sort_key: None,
            sort_order: SortOrder::Descending,
            pinned: None,
            text_filter: None,
            predicate: None,
        }
    }
}

impl<T> Projection<T> {
    /// Newest first by `key`, the default for time-ordered lists
    pub fn newest_first(key: SortKey<T>) -> Self {
        Self {
            sort_key: Some(key),
            sort_order: SortOrder::Descending,
            ..Self::default()
        }
    }

    pub fn with_pinned(mut self, pinned: Pinned<T>) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn with_text_filter(mut self, query: impl Into<String>, fields: TextFields<T>) -> Self {
        self.text_filter = Some(TextFilter::new(query, fields));
        self
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

/// Filter then sort `items` according to `projection`
///
/// Sorting is stable: items with equal keys keep their input order.
pub fn project<T: Clone>(items: &[T], projection: &Projection<T>) -> Vec<T> {
    let mut view: Vec<T> = items
        .iter()
        .filter(|item| {
            projection
                .text_filter
                .as_ref()
                .is_none_or(|filter| filter.matches(*item))
        })
        .filter(|item| {
            projection
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate(*item))
        })
        .cloned()
        .collect();

    if projection.sort_key.is_some() || projection.pinned.is_some() {
        view.sort_by(|a, b| {
            let group = match projection.pinned {
                // `true` sorts after `false`, so compare reversed
                Some(pinned) => pinned(b).cmp(&pinned(a)),
                None => Ordering::Equal,
            };
            group.then_with(|| match projection.sort_key {
                Some(key) => compare(key(a), key(b), projection.sort_order),
                None => Ordering::Equal,
            })
        });
    }

    view
}

fn compare(a: DateTime<Utc>, b: DateTime<Utc>, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => a.cmp(&b),
        SortOrder::Descending => b.cmp(&a),
    }
}

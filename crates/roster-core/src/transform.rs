//! Pure list transforms: search, sort,
//! paginate. Applied in that order by
//! the record viewer.

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use tracing::trace;

use crate::record::{
  Record,
  SortDirection,
  SortKey
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct SortSpec {
  pub key:       SortKey,
  pub direction: SortDirection
}

/// `needle` must already be lowercased.
/// An empty needle matches everything.
pub fn matches_query(
  record: &Record,
  needle: &str
) -> bool {
  needle.is_empty()
    || record
      .searchable_fields()
      .iter()
      .any(|field| {
        field
          .to_lowercase()
          .contains(needle)
      })
}

pub fn search<'a>(
  records: &'a [Record],
  query: &str
) -> Vec<&'a Record> {
  let needle = query.to_lowercase();
  let rows: Vec<&Record> = records
    .iter()
    .filter(|record| {
      matches_query(record, &needle)
    })
    .collect();
  trace!(
    query,
    matched = rows.len(),
    "searched records"
  );
  rows
}

/// Stable sort by an extracted key; equal
/// keys keep their input order in both
/// directions.
pub fn sort_by_extractor<T, K, F>(
  items: &mut [T],
  direction: SortDirection,
  extract: F
) where
  K: Ord,
  F: Fn(&T) -> K
{
  items.sort_by(|a, b| {
    let ord = extract(a).cmp(&extract(b));
    match direction {
      | SortDirection::Ascending => ord,
      | SortDirection::Descending => {
        ord.reverse()
      }
    }
  });
}

pub fn sort_records(
  rows: &mut [&Record],
  spec: SortSpec
) {
  sort_by_extractor(
    rows,
    spec.direction,
    |record| record.sort_value(spec.key)
  );
}

pub fn total_pages(
  count: usize,
  page_size: NonZeroUsize
) -> usize {
  count.div_ceil(page_size.get())
}

/// Rows of 1-based `page`; empty when the
/// page lies past the end.
pub fn page_window<T>(
  items: &[T],
  page: usize,
  page_size: NonZeroUsize
) -> &[T] {
  let size = page_size.get();
  let start = page
    .saturating_sub(1)
    .saturating_mul(size);
  if start >= items.len() {
    return &[];
  }
  let end =
    start.saturating_add(size).min(items.len());
  &items[start..end]
}

/// `None` when there are no pages.
pub fn clamp_page(
  requested: i64,
  total_pages: usize
) -> Option<usize> {
  if total_pages == 0 {
    return None;
  }
  let upper = i64::try_from(total_pages)
    .unwrap_or(i64::MAX);
  let clamped = match requested.cmp(&1) {
    | Ordering::Less => 1,
    | _ => requested.min(upper)
  };
  usize::try_from(clamped).ok()
}

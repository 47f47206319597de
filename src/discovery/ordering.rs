//! Sort and limit, the last two stages of every query.

use crate::model::{Query, Record, SortOrder};

/// Stable-sort records by a string key.
///
/// Records with equal keys keep their relative order in both directions.
pub fn sort_records_by<F>(records: &mut [Record], order: SortOrder, key: F)
where
    F: Fn(&Record) -> &str,
{
    match order {
        SortOrder::Ascending => records.sort_by(|a, b| key(a).cmp(key(b))),
        SortOrder::Descending => records.sort_by(|a, b| key(b).cmp(key(a))),
    }
}

/// Truncate to `limit` records; 0 means no limit.
pub fn apply_limit(records: &mut Vec<Record>, limit: usize) {
    if limit > 0 && records.len() > limit {
        records.truncate(limit);
    }
}

/// Apply a query's sort and limit directives.
///
/// `sortable` lists the annotation keys the provider knows how to sort
/// by. A `sortBy` outside that list leaves discovery order untouched.
pub fn finish_query(mut records: Vec<Record>, query: &Query, sortable: &[&str]) -> Vec<Record> {
    if let Some(sort_by) = query.sort_by.as_deref() {
        if sortable.contains(&sort_by) {
            sort_records_by(&mut records, query.order(), |record| {
                record.annotation(sort_by).unwrap_or("")
            });
        }
    }
    apply_limit(&mut records, query.limit);
    records
}

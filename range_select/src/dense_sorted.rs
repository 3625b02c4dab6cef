//! `C3`: the two strategies that never touch the column's values array.
//!
//! A dense column (values form an ascending arithmetic run, e.g. a
//! surrogate-key column) answers a range predicate with pure index
//! arithmetic. A sorted (or reverse-sorted) column answers it with two binary
//! searches. Both reduce to a contiguous physical-position range -- or, for
//! an anti-select, its complement -- which is then optionally intersected
//! with the candidate list before virtualizing.

use std::cmp::Ordering;

use bitm::partition_point_with_index;

use crate::candidates::Candidates;
use crate::column::Column;
use crate::predicate::Predicate;
use crate::result::{virtualize_double, SelectResult};
use crate::value::ColumnValue;

/// The `[lo, hi)` physical position range matching `predicate` in a dense column.
fn dense_position_range<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>) -> (usize, usize) {
    let n = column.len() as i128;
    let base = column.values().first().map_or(0, |v| v.to_i128());
    let lo = (predicate.tl.to_i128() - base).clamp(0, n) as usize;
    let hi = (predicate.th.to_i128() - base + 1).clamp(0, n) as usize;
    (lo, hi.max(lo))
}

/// The `[lo, hi)` physical position range matching `predicate` in a sorted
/// (ascending or descending) column, found by binary search.
fn sorted_position_range<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>) -> (usize, usize) {
    let values = column.values();
    if column.sorted() {
        let lo = partition_point_with_index(values, |&v, _| v.total_cmp(predicate.tl) == Ordering::Less);
        let hi = partition_point_with_index(values, |&v, _| v.total_cmp(predicate.th) != Ordering::Greater);
        (lo, hi)
    } else {
        debug_assert!(column.rev_sorted());
        let lo = partition_point_with_index(values, |&v, _| v.total_cmp(predicate.th) == Ordering::Greater);
        let hi = partition_point_with_index(values, |&v, _| v.total_cmp(predicate.tl) != Ordering::Less);
        (lo, hi)
    }
}

/// The non-NIL sub-range `[nonnil_lo, nonnil_hi)` of the column's physical
/// positions: NIL sorts smallest, so on a `nonnil=false` column it occupies a
/// contiguous prefix when ascending or a contiguous suffix when descending.
/// An anti-select's complement ranges must stay within these bounds -- §8
/// invariant 5 requires every NIL row excluded even from the complement.
fn nonnil_position_bounds<T: ColumnValue>(column: &Column<T>) -> (usize, usize) {
    let len = column.len();
    if column.nonnil() {
        return (0, len);
    }
    let values = column.values();
    if column.sorted() {
        let lo = partition_point_with_index(values, |&v, _| v.is_nil());
        (lo, len)
    } else {
        debug_assert!(column.rev_sorted());
        let hi = partition_point_with_index(values, |&v, _| !v.is_nil());
        (0, hi)
    }
}

/// Row identifiers in `[base, base+count)` that also appear in `candidates`.
fn intersect_range_with_candidates(base: crate::value::RowId, count: usize, candidates: &Candidates) -> Vec<crate::value::RowId> {
    if count == 0 { return Vec::new(); }
    let lo = candidates.find_first_ge(base);
    let hi = candidates.find_first_ge(base + count as u64);
    candidates.slice(lo, hi).iter().collect()
}

fn finish<T: ColumnValue>(
    column: &Column<T>,
    lo: usize,
    hi: usize,
    nonnil_lo: usize,
    nonnil_hi: usize,
    anti: bool,
    candidates: Option<&Candidates>,
) -> SelectResult {
    if anti {
        let r1 = (column.id_at(nonnil_lo), lo.saturating_sub(nonnil_lo));
        let r2 = (column.id_at(hi), nonnil_hi.saturating_sub(hi));
        match candidates {
            None => virtualize_double(r1, r2),
            Some(c) => {
                let mut ids = intersect_range_with_candidates(r1.0, r1.1, c);
                ids.extend(intersect_range_with_candidates(r2.0, r2.1, c));
                SelectResult::finalize_sorted(ids)
            }
        }
    } else {
        let base = column.id_at(lo);
        let count = hi - lo;
        match candidates {
            None => SelectResult::Dense { base, count },
            Some(c) => SelectResult::finalize_sorted(intersect_range_with_candidates(base, count, c)),
        }
    }
}

/// C3.1: positional select over a column flagged [`Column::dense`].
pub fn select_dense<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>, candidates: Option<&Candidates>) -> SelectResult {
    debug_assert!(column.dense());
    let (lo, hi) = dense_position_range(column, predicate);
    finish(column, lo, hi, 0, column.len(), predicate.anti, candidates)
}

/// C3.2: binary-search select over a column flagged [`Column::sorted`] or [`Column::rev_sorted`].
pub fn select_sorted<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>, candidates: Option<&Candidates>) -> SelectResult {
    debug_assert!(column.sorted() || column.rev_sorted());
    let (lo, hi) = sorted_position_range(column, predicate);
    let (nonnil_lo, nonnil_hi) = nonnil_position_bounds(column);
    finish(column, lo, hi, nonnil_lo, nonnil_hi, predicate.anti, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RowId;

    fn col(values: Vec<i32>) -> Column<i32> {
        Column::new(values, RowId(0))
    }

    fn pred(tl: i32, th: i32, anti: bool) -> Predicate<i32> {
        Predicate { tl, th, anti, equi: tl == th }
    }

    #[test]
    fn dense_range_maps_directly_to_row_ids() {
        let c = col((100..110).collect()).with_dense(true);
        let r = select_dense(&c, &pred(103, 105, false), None);
        assert_eq!(r, SelectResult::Dense { base: RowId(3), count: 3 });
    }

    #[test]
    fn dense_anti_produces_double_range() {
        let c = col((0..10).collect()).with_dense(true);
        let r = select_dense(&c, &pred(3, 5, true), None);
        assert_eq!(
            r,
            SelectResult::DoubleRange { r1: (RowId(0), 3), r2: (RowId(6), 4) }
        );
    }

    #[test]
    fn sorted_ascending_binary_searches_the_range() {
        let c = col(vec![1, 3, 3, 5, 8, 8, 8, 20]);
        let r = select_sorted(&c, &pred(3, 8, false), None);
        assert_eq!(r, SelectResult::Dense { base: RowId(1), count: 6 });
    }

    #[test]
    fn sorted_descending_binary_searches_the_range() {
        let c = col(vec![20, 8, 8, 8, 5, 3, 3, 1]).with_sorted(false, true);
        let r = select_sorted(&c, &pred(3, 8, false), None);
        assert_eq!(r, SelectResult::Dense { base: RowId(1), count: 6 });
    }

    #[test]
    fn sorted_with_candidates_intersects() {
        let c = col(vec![1, 3, 3, 5, 8, 8, 8, 20]);
        let s = Candidates::new_materialized(vec![RowId(0), RowId(2), RowId(4), RowId(7)]).unwrap();
        let r = select_sorted(&c, &pred(3, 8, false), Some(&s));
        assert_eq!(r.to_vec(), vec![RowId(2), RowId(4)]);
    }

    #[test]
    fn equi_on_sorted_column_finds_the_run() {
        let c = col(vec![1, 3, 3, 3, 5]);
        let r = select_sorted(&c, &pred(3, 3, false), None);
        assert_eq!(r, SelectResult::Dense { base: RowId(1), count: 3 });
    }

    #[test]
    fn ascending_anti_select_excludes_leading_nil_run() {
        // NIL sorts smallest, so it occupies the physical prefix here.
        let c = col(vec![i32::NIL, i32::NIL, 3, 5, 8, 20]);
        let r = select_sorted(&c, &pred(5, 8, true), None);
        // complement of [5,8] is {NIL, NIL, 3} below and {20} above; the NILs must not appear.
        assert_eq!(r.to_vec(), vec![RowId(2), RowId(5)]);
    }

    #[test]
    fn descending_anti_select_excludes_trailing_nil_run() {
        // NIL sorts smallest, so it occupies the physical suffix in a rev_sorted column.
        let c = col(vec![20, 8, 5, 3, i32::NIL, i32::NIL]).with_sorted(false, true);
        let r = select_sorted(&c, &pred(5, 8, true), None);
        assert_eq!(r.to_vec(), vec![RowId(0), RowId(3)]);
    }

    #[test]
    fn ascending_anti_select_over_whole_range_yields_only_nonnil_complement() {
        let c = col(vec![i32::NIL, 1, 2, 3]);
        let r = select_sorted(&c, &pred(1, 3, true), None);
        assert!(r.to_vec().is_empty());
    }
}

//! `C5`/`C6`: the fallback linear scan, optionally pruned by an imprint index.
//!
//! The four decision axes -- candidates present or not, imprints available or
//! not, anti or not, column `nonnil` or not -- are all resolved once, outside
//! the per-row loop, by picking which of the functions below to call and which
//! branch inside them to take; the inner loop itself never re-checks them.

use std::cmp::Ordering;

use crate::candidates::Candidates;
use crate::column::Column;
use crate::predicate::Predicate;
use crate::result::{grow_capacity, SelectResult};
use crate::value::{ColumnValue, RowId};

#[inline]
pub(crate) fn row_matches<T: ColumnValue>(v: T, predicate: &Predicate<T>, nonnil: bool) -> bool {
    if !nonnil && v.is_nil() {
        return false;
    }
    if predicate.anti {
        v.total_cmp(predicate.tl) != Ordering::Greater || v.total_cmp(predicate.th) != Ordering::Less
    } else {
        v.total_cmp(predicate.tl) != Ordering::Less && v.total_cmp(predicate.th) != Ordering::Greater
    }
}

fn ensure_capacity(out: &mut Vec<RowId>, matched: usize, seen: usize, remaining: usize) {
    let needed = matched + remaining.min(64);
    if out.capacity() < needed {
        let target = grow_capacity(out.capacity(), matched, seen, remaining);
        if target > out.capacity() {
            out.reserve(target - out.capacity());
        }
    }
}

/// Scans physical positions `[phys_start, phys_end)`, pruning whole pages via
/// the imprint index when `use_imprints` is set and one has been (or can be)
/// built for this column. `has_candidates` disables the whole-column
/// disjointness shortcut: it is only sound when the caller's range already
/// *is* the whole column (no dense-candidate sub-range is narrowing it).
fn scan_range<T: ColumnValue>(
    column: &Column<T>,
    predicate: &Predicate<T>,
    phys_start: usize,
    phys_end: usize,
    use_imprints: bool,
    has_candidates: bool,
) -> SelectResult {
    let values = column.values();
    let nonnil = column.nonnil();
    let total = phys_end - phys_start;
    let mut out = Vec::with_capacity((total / 16).clamp(16, 4096));
    let mut seen = 0usize;

    if use_imprints {
        let imps = column.build_imprints();

        // §4.6's preliminary min/max rejection: only sound when there are no
        // candidates narrowing the range and this column isn't a view sharing
        // a parent's imprints, whose stats span more than this column's own data.
        if !has_candidates && !column.is_view() && imps.column_disjoint_from(predicate.tl, predicate.th, predicate.anti) {
            return SelectResult::empty();
        }

        let imp_offset = column.imprint_physical_offset();
        let (outer, inner) = imps.predicate_masks(predicate.tl, predicate.th, predicate.anti, nonnil);
        for page in imps.pages(phys_start + imp_offset, phys_end + imp_offset) {
            // Translate the page's (possibly parent-wide) physical range back
            // to this column's own local coordinates, clamped to the range
            // actually requested -- a page straddling `phys_start` must not
            // leak the positions before it.
            let lo = page.first_pos.max(phys_start + imp_offset) - imp_offset;
            let hi = (page.first_pos + page.len) - imp_offset;
            seen += hi - lo;
            if page.mask & outer == 0 {
                continue;
            }
            ensure_capacity(&mut out, out.len(), seen, total - seen);
            if page.mask & !inner == 0 {
                out.extend((lo..hi).map(|p| column.id_at(p)));
            } else {
                for p in lo..hi {
                    if row_matches(values[p], predicate, nonnil) {
                        out.push(column.id_at(p));
                    }
                }
            }
        }
    } else {
        for p in phys_start..phys_end {
            if row_matches(values[p], predicate, nonnil) {
                out.push(column.id_at(p));
            }
            seen += 1;
            if seen % 4096 == 0 {
                ensure_capacity(&mut out, out.len(), seen, total - seen);
            }
        }
    }

    SelectResult::finalize_sorted(out)
}

/// Tests each element of an explicit candidate list directly; imprint pruning
/// doesn't pay off over a sparse, arbitrary position set.
fn scan_candidates<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>, candidates: &Candidates) -> SelectResult {
    let nonnil = column.nonnil();
    let total = candidates.len();
    let mut out = Vec::with_capacity((total / 16).clamp(16, 4096));
    for (seen, id) in candidates.iter().enumerate() {
        let p = column.pos_of(id);
        if row_matches(column.values()[p], predicate, nonnil) {
            out.push(id);
        }
        if seen % 4096 == 0 {
            ensure_capacity(&mut out, out.len(), seen + 1, total - seen - 1);
        }
    }
    SelectResult::finalize_sorted(out)
}

/// C5's entry point: full scan, optionally restricted to `candidates` and
/// optionally imprint-pruned.
pub fn select_scan<T: ColumnValue>(
    column: &Column<T>,
    predicate: &Predicate<T>,
    candidates: Option<&Candidates>,
    use_imprints: bool,
) -> SelectResult {
    match candidates {
        None => scan_range(column, predicate, 0, column.len(), use_imprints, false),
        Some(Candidates::Dense { base, count }) => {
            let start = column.pos_of(*base);
            scan_range(column, predicate, start, start + count, use_imprints, true)
        }
        Some(c @ Candidates::Materialized(_)) => scan_candidates(column, predicate, c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(tl: i32, th: i32, anti: bool) -> Predicate<i32> {
        Predicate { tl, th, anti, equi: tl == th }
    }

    #[test]
    fn plain_scan_finds_matches_in_order() {
        let c = Column::new(vec![5, 1, 8, 3, 9, 2], RowId(100));
        let r = select_scan(&c, &pred(2, 5, false), None, false);
        assert_eq!(r.to_vec(), vec![RowId(100), RowId(103), RowId(105)]);
    }

    #[test]
    fn scan_skips_nil_even_in_anti_select() {
        let c = Column::new(vec![1, i32::NIL, 3], RowId(0));
        let r = select_scan(&c, &pred(10, 20, true), None, false);
        // anti-select of [10,20]: every non-NIL value qualifies, NIL never does.
        assert_eq!(r.to_vec(), vec![RowId(0), RowId(2)]);
    }

    #[test]
    fn imprint_pruned_scan_matches_plain_scan() {
        let values: Vec<i32> = (0..5000).map(|i| (i * 7) % 1000).collect();
        let c = Column::new(values, RowId(0));
        let plain = select_scan(&c, &pred(100, 200, false), None, false);
        let pruned = select_scan(&c, &pred(100, 200, false), None, true);
        assert_eq!(plain.to_vec(), pruned.to_vec());
    }

    #[test]
    fn scan_over_dense_candidates_restricts_range() {
        let c = Column::new((0..20).collect(), RowId(0));
        let s = Candidates::Dense { base: RowId(5), count: 5 }; // rows 5..10
        let r = select_scan(&c, &pred(0, 100, false), Some(&s), false);
        assert_eq!(r.to_vec(), (5..10).map(RowId).collect::<Vec<_>>());
    }

    #[test]
    fn scan_over_materialized_candidates_tests_each_one() {
        let c = Column::new(vec![10, 20, 30, 40, 50], RowId(0));
        let s = Candidates::new_materialized(vec![RowId(0), RowId(2), RowId(4)]).unwrap();
        let r = select_scan(&c, &pred(25, 45, false), Some(&s), false);
        assert_eq!(r.to_vec(), vec![RowId(2)]);
    }

    #[test]
    fn imprint_pruned_scan_over_mid_page_candidates_matches_plain_scan() {
        // rows_per_page for i32 is 2048; base=1000/count=1500 straddles that
        // boundary on both ends, so a page-aligned copy must still be clamped.
        let values: Vec<i32> = (0..5000).map(|i| (i * 7) % 1000).collect();
        let c = Column::new(values, RowId(0)).with_persistent(true);
        let s = Candidates::Dense { base: RowId(1000), count: 1500 };
        let plain = select_scan(&c, &pred(100, 200, false), Some(&s), false);
        let pruned = select_scan(&c, &pred(100, 200, false), Some(&s), true);
        assert_eq!(plain.to_vec(), pruned.to_vec());
    }

    #[test]
    fn imprint_disjoint_whole_column_short_circuits_scan() {
        let values: Vec<i32> = (0..5000).collect();
        let c = Column::new(values, RowId(0)).with_persistent(true);
        let r = select_scan(&c, &pred(100_000, 200_000, false), None, true);
        assert!(r.is_empty());
    }

    #[test]
    fn view_over_parent_shares_and_correctly_offsets_imprints() {
        let values: Vec<i32> = (0..5000).map(|i| (i * 7) % 1000).collect();
        let parent = Column::new(values, RowId(0)).with_persistent(true);
        // A view onto physical positions 2000..3000 of the parent, with its own row-id head.
        let view = Column::as_view(&parent, 2000, 1000, RowId(500));
        let pruned = select_scan(&view, &pred(100, 200, false), None, true);
        let plain = select_scan(&view, &pred(100, 200, false), None, false);
        assert_eq!(pruned.to_vec(), plain.to_vec());
        assert!(!pruned.is_empty());
        for id in pruned.to_vec() {
            assert!(id.0 >= 500 && id.0 < 1500);
        }
    }
}

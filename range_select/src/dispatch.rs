//! `C2`: the strategy dispatcher. Normalizes the predicate, then picks among
//! the positional, sorted, hash and scan strategies the same way the
//! reference engine does: dense/sorted columns always win outright (no cost
//! model needed, the answer is a couple of binary searches); otherwise an
//! upper bound on the result size is refined as cheaply as possible (key
//! column arithmetic, then -- only if still unknown and hashing would
//! otherwise pay off -- a fixed-size three-slice sample), and that decides
//! between building a hash index or falling back to an imprint-pruned scan.

use std::cmp::Ordering;

use crate::candidates::Candidates;
use crate::column::Column;
use crate::dense_sorted::{select_dense, select_sorted};
use crate::predicate::{normalize, Normalized, Predicate, RawPredicate};
use crate::result::SelectResult;
use crate::scan::{row_matches, select_scan};
use crate::trace::trace;
use crate::value::{ColumnValue, RowId};

/// Above this estimated-selectivity-to-count ratio, a scan (possibly
/// imprint-pruned) is assumed cheaper than building a hash index; below it,
/// hashing wins. Mirrors the reference engine's `estimate < count/100`.
const HASH_SELECTIVITY_DIVISOR: usize = 100;

/// Columns narrower than this (in bytes) are cheap enough to scan that
/// building a hash index over them is never worth it.
const HASH_MIN_VALUE_SIZE: usize = 3;

/// A hash index is only built if it would stay under this many bytes.
const HASH_MAX_MEMORY_BYTES: u128 = 1 << 30;

/// The select kernel's entry point. Normalizes `predicate`, short-circuits
/// the cases that are trivially empty, and dispatches to whichever strategy
/// applies.
pub fn select<T: ColumnValue>(column: &Column<T>, predicate: RawPredicate<T>, candidates: Option<&Candidates>) -> SelectResult {
    if column.is_empty() || candidates.is_some_and(Candidates::is_empty) {
        return SelectResult::empty();
    }
    if let Some(Candidates::Dense { base, count }) = candidates {
        let col_end = column.id_at(column.len());
        if *base >= col_end || *base + *count as u64 <= column.base() {
            return SelectResult::empty();
        }
    }

    let predicate = match normalize(predicate, column.nonnil()) {
        Normalized::Empty => return SelectResult::empty(),
        Normalized::Range(p) => p,
    };

    if column.sorted() || column.rev_sorted() {
        trace!("positional/sorted path, dense={}", column.dense());
        return if column.dense() {
            select_dense(column, &predicate, candidates)
        } else {
            select_sorted(column, &predicate, candidates)
        };
    }

    let mut maximum = column.len();
    if let Some(c) = candidates {
        maximum = maximum.min(c.len());
    }

    let exact_estimate = exact_estimate(column, &predicate);
    if let Some(e) = exact_estimate {
        maximum = maximum.min(e);
    }

    let hash_capable = predicate.equi
        && column.persistent()
        && std::mem::size_of::<T>() > HASH_MIN_VALUE_SIZE
        && (column.len() as u128) * (std::mem::size_of::<T>() as u128 + 2 * std::mem::size_of::<RowId>() as u128) < HASH_MAX_MEMORY_BYTES;

    let mut hash_wins_on_estimate = hash_capable;
    if hash_capable && exact_estimate.is_none() && column.hash_index().is_none() {
        let estimate = sample_estimate(column, &predicate, maximum);
        hash_wins_on_estimate = estimate < column.len() / HASH_SELECTIVITY_DIVISOR;
    }
    let use_hash = predicate.equi && (column.hash_index().is_some() || hash_wins_on_estimate);

    if use_hash {
        trace!("hash select");
        select_hash(column, &predicate, candidates)
    } else {
        let use_imprints = !predicate.equi && column.persistent();
        trace!("scan select, imprints={use_imprints}");
        select_scan(column, &predicate, candidates, use_imprints)
    }
}

/// An exact result-size bound, available only when the column is known
/// duplicate-free (`key`): one row for an equality select, or the number of
/// representable values in range otherwise.
fn exact_estimate<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>) -> Option<usize> {
    if !column.key() {
        return None;
    }
    if predicate.equi {
        Some(1)
    } else if !predicate.anti {
        Some((predicate.th.to_i128() - predicate.tl.to_i128() + 1).max(0) as usize)
    } else {
        None
    }
}

/// A deterministic selectivity estimate from three fixed-size samples taken
/// from the beginning, middle and end of the column, extrapolated to the
/// whole column with a 10% margin.
fn sample_estimate<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>, maximum: usize) -> usize {
    let count = column.len();
    if count <= 10_000 {
        return maximum;
    }
    const DELTA: usize = 1000 / 3 / 2;
    let skip = (count - 2 * DELTA) / 2;
    let values = column.values();
    let nonnil = column.nonnil();

    let mut sampled = 0usize;
    let mut matched = 0usize;
    let mut pos = DELTA;
    loop {
        let lo = pos - DELTA;
        let hi = (pos + DELTA).min(count);
        sampled += hi - lo;
        matched += values[lo..hi].iter().filter(|&&v| row_matches(v, predicate, nonnil)).count();
        if skip == 0 || pos + skip >= count {
            break;
        }
        pos += skip;
    }

    if sampled > 0 && matched > 0 {
        ((matched as f64 / sampled as f64) * count as f64 * 1.1) as usize
    } else if sampled > 0 {
        (count / HASH_SELECTIVITY_DIVISOR).saturating_sub(1)
    } else {
        maximum
    }
}

/// C4: probes the hash index for the one distinct value an equi-select
/// looks for, then verifies each candidate position (hash collisions are
/// expected) and intersects with `candidates` if given.
fn select_hash<T: ColumnValue>(column: &Column<T>, predicate: &Predicate<T>, candidates: Option<&Candidates>) -> SelectResult {
    let index = column.build_hash();
    let values = column.values();
    let mut out: Vec<RowId> = index
        .probe(predicate.tl)
        .iter()
        .copied()
        .filter(|&p| values[p as usize].total_cmp(predicate.tl) == Ordering::Equal)
        .map(|p| column.id_at(p as usize))
        .collect();
    if let Some(c) = candidates {
        out.retain(|id| c.contains(*id));
    }
    SelectResult::finalize_unsorted(out)
}

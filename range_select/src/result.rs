//! `R`: the kernel's output, and the result finalizer (C7).

use dyn_size_of::GetSize;
use crate::candidates::Candidates;
use crate::value::RowId;

/// Row identifiers satisfying the predicate, in ascending order.
///
/// `Dense` and `DoubleRange` are "virtual": no materialized array backs them.
/// `Materialized` is the fallback produced by the hash and scan paths before
/// [`SelectResult::finalize`]/[`SelectResult::virtualize`] has a chance to collapse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectResult {
    /// `count` consecutive identifiers starting at `base`.
    Dense { base: RowId, count: usize },
    /// Two disjoint ascending dense ranges, `r1` entirely below `r2` with a gap
    /// between them (the anti-select case on a dense/sorted column).
    DoubleRange { r1: (RowId, usize), r2: (RowId, usize) },
    /// An explicit ascending array of identifiers.
    Materialized(Vec<RowId>),
}

impl SelectResult {
    pub fn empty() -> Self { Self::Dense { base: RowId(0), count: 0 } }

    pub fn len(&self) -> usize {
        match self {
            Self::Dense { count, .. } => *count,
            Self::DoubleRange { r1, r2 } => r1.1 + r2.1,
            Self::Materialized(v) => v.len(),
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn iter(&self) -> ResultIter<'_> {
        match self {
            Self::Dense { base, count } => ResultIter::Dense { base: *base, remaining: *count },
            Self::DoubleRange { r1, r2 } => ResultIter::Double { r1: *r1, r2: *r2, in_first: true, i: 0 },
            Self::Materialized(v) => ResultIter::Slice(v.iter()),
        }
    }

    pub fn to_vec(&self) -> Vec<RowId> { self.iter().collect() }

    /// Re-views this result as a candidate list, e.g. for select-through-candidates
    /// (§8 round-trip property): `select(B, S, P) == select(select(B, S, P).as_candidates(), None, P)`.
    pub fn as_candidates(&self) -> Candidates {
        match self {
            Self::Dense { base, count } => Candidates::Dense { base: *base, count: *count },
            _ => Candidates::new_materialized(self.to_vec())
                .expect("a SelectResult is always sorted ascending with no duplicates"),
        }
    }

    /// Builds a result from a buffer produced by the scan path (C5): already
    /// ascending by construction (the walk over B or over S is monotone), so only
    /// virtualization remains.
    pub fn finalize_sorted(values: Vec<RowId>) -> Self {
        virtualize(values)
    }

    /// Builds a result from a buffer produced by the hash path (C4): hash-probe
    /// order is arbitrary, so the values must be sorted before virtualizing.
    pub fn finalize_unsorted(mut values: Vec<RowId>) -> Self {
        values.sort_unstable();
        virtualize(values)
    }
}

/// Rewrites a materialized ascending array as a dense `(base, count)` descriptor
/// when its identifiers form a contiguous run (C7: "virtualize").
fn virtualize(values: Vec<RowId>) -> SelectResult {
    if values.len() <= 1 {
        return match values.first() {
            Some(&base) => SelectResult::Dense { base, count: 1 },
            None => SelectResult::empty(),
        };
    }
    let first = values[0];
    let last = values[values.len() - 1];
    if first + (values.len() as u64 - 1) == last {
        SelectResult::Dense { base: first, count: values.len() }
    } else {
        SelectResult::Materialized(values)
    }
}

/// Virtualizes a two-range (anti-select) result: if the interior gap has zero
/// length the two ranges are adjacent and collapse into one dense range.
pub fn virtualize_double(r1: (RowId, usize), r2: (RowId, usize)) -> SelectResult {
    if r1.1 == 0 {
        return SelectResult::Dense { base: r2.0, count: r2.1 };
    }
    if r2.1 == 0 {
        return SelectResult::Dense { base: r1.0, count: r1.1 };
    }
    if r1.0 + r1.1 as u64 == r2.0 {
        SelectResult::Dense { base: r1.0, count: r1.1 + r2.1 }
    } else {
        SelectResult::DoubleRange { r1, r2 }
    }
}

/// The load-bearing result-buffer growth law: grows fast enough to avoid
/// quadratic reallocation under unpredictable selectivity, without grossly
/// over-allocating for highly selective queries. `seen` and `remaining` are
/// counted in source rows (or candidates); `matched` is the number of hits so far.
///
/// `new_cap = capacity + matched * remaining / seen * 1.1 + 1024`, capped at
/// `capacity + remaining` (no point reserving more than what could still match).
pub fn grow_capacity(capacity: usize, matched: usize, seen: usize, remaining: usize) -> usize {
    let seen = seen.max(1);
    let growth = (matched as f64 / seen as f64 * remaining as f64 * 1.1) as usize + 1024;
    capacity + growth.min(remaining)
}

pub enum ResultIter<'a> {
    Dense { base: RowId, remaining: usize },
    Double { r1: (RowId, usize), r2: (RowId, usize), in_first: bool, i: usize },
    Slice(std::slice::Iter<'a, RowId>),
}

impl<'a> Iterator for ResultIter<'a> {
    type Item = RowId;
    fn next(&mut self) -> Option<RowId> {
        match self {
            Self::Dense { base, remaining } => {
                if *remaining == 0 { return None; }
                let v = *base;
                *base = *base + 1;
                *remaining -= 1;
                Some(v)
            }
            Self::Double { r1, r2, in_first, i } => {
                loop {
                    if *in_first {
                        if *i < r1.1 {
                            let v = r1.0 + *i as u64;
                            *i += 1;
                            return Some(v);
                        }
                        *in_first = false;
                        *i = 0;
                    } else {
                        if *i >= r2.1 { return None; }
                        let v = r2.0 + *i as u64;
                        *i += 1;
                        return Some(v);
                    }
                }
            }
            Self::Slice(it) => it.next().copied(),
        }
    }
}

impl GetSize for SelectResult {
    fn size_bytes_dyn(&self) -> usize {
        match self {
            Self::Dense { .. } => 0,
            Self::DoubleRange { .. } => 0,
            Self::Materialized(v) => v.size_bytes_dyn(),
        }
    }
    const USES_DYN_MEM: bool = true;
}

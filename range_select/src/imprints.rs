//! `I`: the bitmap-per-page imprint index and the pruning logic of C6.
//!
//! An imprint partitions the column's value domain into `K` bins (`K` one of
//! 8/16/32/64), and stores one `K`-bit mask per page of the column: bit `b` set
//! iff the page contains a value falling in bin `b`. A predicate is turned into
//! two masks -- `outer` (candidate bins) and `inner` (bins that are *wholly*
//! inside the predicate) -- and each page's mask is classified against them
//! without ever touching the page's actual values unless the classification is
//! ambiguous. The `dict` run-length-encodes repeated page masks, which is the
//! common case for roughly-sorted or low-cardinality columns.

use bitm::{n_lowest_bits_1_64, partition_point_with_index};
use dyn_size_of::GetSize;

use crate::value::ColumnValue;

/// Bytes per imprint page; `rows_per_page` below divides this by `size_of::<T>()`.
const IMPS_PAGE_BYTES: usize = 8192;

/// One run of the dictionary: either `count` consecutive pages that all share
/// the single mask recorded at this position in `imps`, or `count` consecutive
/// pages each with its own individually-recorded mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub repeat: bool,
    pub count: u32,
}

/// Per-bin summary: the minimum and maximum non-NIL value observed to fall in
/// the bin, and how many non-NIL values fell in it.
#[derive(Debug, Clone, Copy)]
pub struct BinStats<T> {
    pub min: T,
    pub max: T,
    pub count: usize,
}

pub struct ImprintIndex<T: ColumnValue> {
    bins: Box<[T]>,
    imps: Box<[u64]>,
    dict: Box<[DictEntry]>,
    stats: Box<[BinStats<T>]>,
    rows_per_page: usize,
}

impl<T: ColumnValue> ImprintIndex<T> {
    pub fn bits(&self) -> usize { self.bins.len() }
    pub fn rows_per_page(&self) -> usize { self.rows_per_page }

    /// Picks `K` from the column length the way a real imprint builder would:
    /// enough bins to be useful, never more than there are pages to distinguish.
    fn choose_k(n: usize) -> usize {
        if n < 64 { 8 } else if n < 1024 { 16 } else if n < 1_000_000 { 32 } else { 64 }
    }

    pub fn build(values: &[T]) -> Self {
        let k = Self::choose_k(values.len());
        let rows_per_page = (IMPS_PAGE_BYTES / std::mem::size_of::<T>().max(1)).max(1);

        let mut sorted: Vec<T> = values.iter().copied().filter(|v| !v.is_nil()).collect();
        sorted.sort_by(|a, b| a.total_cmp(*b));
        let hi = sorted.last().copied().unwrap_or(T::MAX);

        let bins = build_bin_boundaries(&sorted, hi, k);
        let mut stats: Vec<BinStats<T>> = bins.iter().map(|&b| BinStats { min: b, max: b, count: 0 }).collect();

        let page_count = (values.len() + rows_per_page - 1) / rows_per_page.max(1);
        let mut page_masks = Vec::with_capacity(page_count);
        for page in values.chunks(rows_per_page) {
            let mut mask: u64 = 0;
            for &v in page {
                let b = bin_of(&bins, v);
                if !v.is_nil() {
                    let st = &mut stats[b];
                    if st.count == 0 || v.total_cmp(st.min) == std::cmp::Ordering::Less { st.min = v; }
                    if st.count == 0 || v.total_cmp(st.max) == std::cmp::Ordering::Greater { st.max = v; }
                    st.count += 1;
                }
                mask |= 1u64 << b;
            }
            page_masks.push(mask);
        }

        let (dict, imps) = run_length_encode(&page_masks);

        Self {
            bins: bins.into_boxed_slice(),
            imps: imps.into_boxed_slice(),
            dict: dict.into_boxed_slice(),
            stats: stats.into_boxed_slice(),
            rows_per_page,
        }
    }

    #[inline] fn bin_of(&self, v: T) -> usize { bin_of(&self.bins, v) }

    /// §4.6: the `outer`/`inner` mask pair for a closed predicate `[tl, th]`,
    /// already complemented and swapped for an anti-select.
    pub fn predicate_masks(&self, tl: T, th: T, anti: bool, nonnil: bool) -> (u64, u64) {
        let k = self.bits();
        let domain_mask = n_lowest_bits_1_64(k as u8);
        let lbin = self.bin_of(tl);
        let hbin = self.bin_of(th);
        let mut mask: u64 = ((((1u64 << hbin) - 1) << 1) | 1).wrapping_sub((1u64 << lbin).wrapping_sub(1));
        mask &= domain_mask;
        let mut inner = mask;
        if !nonnil || tl.total_cmp(T::MIN) != std::cmp::Ordering::Equal {
            inner &= !(1u64 << lbin);
        }
        if th.total_cmp(T::MAX) != std::cmp::Ordering::Equal {
            inner &= !(1u64 << hbin);
        }
        if anti {
            let outer_before = mask;
            mask = (!inner) & domain_mask;
            inner = (!outer_before) & domain_mask;
        }
        (mask, inner)
    }

    /// §4.6's preliminary min/max rejection: `true` if the whole column can be
    /// skipped without looking at a single imprint entry. Only valid when there
    /// are no candidates and no aliasing view, exactly as in the reference engine.
    pub fn column_disjoint_from(&self, tl: T, th: T, anti: bool) -> bool {
        let mut imp_min = None::<T>;
        let mut imp_max = None::<T>;
        for st in self.stats.iter() {
            if st.count == 0 { continue; }
            imp_min.get_or_insert(st.min);
            imp_max = Some(st.max);
        }
        let (Some(imp_min), Some(imp_max)) = (imp_min, imp_max) else { return true; };
        if anti {
            tl.total_cmp(imp_min) == std::cmp::Ordering::Less && th.total_cmp(imp_max) == std::cmp::Ordering::Greater
        } else {
            tl.total_cmp(imp_max) == std::cmp::Ordering::Greater || th.total_cmp(imp_min) == std::cmp::Ordering::Less
        }
    }

    /// Walks the dictionary/imps structure page by page, yielding each page's
    /// mask together with the range of physical positions it covers.
    pub fn pages(&self, physical_start: usize, physical_end: usize) -> ImprintPages<'_> {
        ImprintPages {
            dict: &self.dict,
            imps: &self.imps,
            rows_per_page: self.rows_per_page,
            dict_idx: 0,
            run_pos: 0,
            im_idx: 0,
            page_no: 0,
            physical_end,
            physical_start,
        }
    }
}

/// Page-by-page walk over the dictionary/imps run-length structure: the three
/// cursors are the dictionary entry (`dict_idx`), the position within that
/// entry's run (`run_pos`), and the index into `imps` for non-repeat entries
/// (`im_idx`). Kept as an explicit iterator rather than flattened so that the
/// page-skip decision in `crate::scan` never has to materialize a mask per row.
pub struct ImprintPages<'a> {
    dict: &'a [DictEntry],
    imps: &'a [u64],
    rows_per_page: usize,
    dict_idx: usize,
    run_pos: u32,
    im_idx: usize,
    page_no: usize,
    physical_start: usize,
    physical_end: usize,
}

/// One page's classification input: its mask and the physical position range it spans.
pub struct Page {
    pub mask: u64,
    pub first_pos: usize,
    pub len: usize,
}

impl<'a> Iterator for ImprintPages<'a> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        loop {
            let entry = *self.dict.get(self.dict_idx)?;
            if self.run_pos >= entry.count {
                self.dict_idx += 1;
                self.run_pos = 0;
                if !entry.repeat {
                    // im_idx already advanced one per page below; nothing more to do.
                }
                continue;
            }
            let first_pos = self.page_no * self.rows_per_page;
            if first_pos >= self.physical_end {
                return None;
            }
            let mask = if entry.repeat {
                self.imps[self.im_idx]
            } else {
                let m = self.imps[self.im_idx];
                self.im_idx += 1;
                m
            };
            self.run_pos += 1;
            if entry.repeat && self.run_pos == entry.count {
                self.im_idx += 1;
            }
            self.page_no += 1;
            let len = self.rows_per_page.min(self.physical_end - first_pos);
            if first_pos + len <= self.physical_start {
                continue;
            }
            return Some(Page { mask, first_pos, len });
        }
    }
}

/// Equi-depth bin boundaries: `bins[i]` is the largest value assigned to bin
/// `i`, chosen so each bin holds roughly `sorted.len() / k` values. Built from
/// the observed values rather than the type's domain width, so it needs no
/// arithmetic beyond `total_cmp` and works uniformly across integer, float and
/// row-id columns. `bins[k-1] == hi` always, which `predicate_masks` relies on
/// for its "th is the domain max" check.
fn build_bin_boundaries<T: ColumnValue>(sorted: &[T], hi: T, k: usize) -> Vec<T> {
    if sorted.is_empty() {
        return vec![hi; k];
    }
    let mut bins = Vec::with_capacity(k);
    for i in 0..k {
        if i == k - 1 {
            bins.push(hi);
        } else {
            let idx = ((i + 1) * sorted.len() / k).saturating_sub(1).min(sorted.len() - 1);
            bins.push(sorted[idx]);
        }
    }
    bins
}

fn bin_of<T: ColumnValue>(bins: &[T], v: T) -> usize {
    if v.is_nil() { return 0; }
    let idx = partition_point_with_index(bins, |&b, _| b.total_cmp(v) == std::cmp::Ordering::Less);
    idx.min(bins.len() - 1)
}

fn run_length_encode(page_masks: &[u64]) -> (Vec<DictEntry>, Vec<u64>) {
    let mut dict = Vec::new();
    let mut imps = Vec::new();
    let mut i = 0;
    while i < page_masks.len() {
        if i + 1 < page_masks.len() && page_masks[i + 1] == page_masks[i] {
            let mut j = i + 1;
            while j < page_masks.len() && page_masks[j] == page_masks[i] { j += 1; }
            dict.push(DictEntry { repeat: true, count: (j - i) as u32 });
            imps.push(page_masks[i]);
            i = j;
        } else {
            let mut j = i;
            while j < page_masks.len() && !(j + 1 < page_masks.len() && page_masks[j + 1] == page_masks[j]) {
                j += 1;
            }
            dict.push(DictEntry { repeat: false, count: (j - i) as u32 });
            imps.extend_from_slice(&page_masks[i..j]);
            i = j;
        }
    }
    (dict, imps)
}

impl<T: ColumnValue> GetSize for ImprintIndex<T> {
    fn size_bytes_dyn(&self) -> usize {
        self.bins.len() * std::mem::size_of::<T>()
            + self.imps.len() * std::mem::size_of::<u64>()
            + self.dict.len() * std::mem::size_of::<DictEntry>()
            + self.stats.len() * std::mem::size_of::<BinStats<T>>()
    }
    const USES_DYN_MEM: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_boundaries_span_the_domain() {
        let idx = ImprintIndex::<i32>::build(&(0..200).collect::<Vec<_>>());
        assert_eq!(idx.bin_of(0), 0);
        assert_eq!(idx.bin_of(199), idx.bits() - 1);
    }

    #[test]
    fn pages_cover_the_whole_column_exactly_once() {
        let values: Vec<i32> = (0..1000).collect();
        let idx = ImprintIndex::<i32>::build(&values);
        let covered: usize = idx.pages(0, values.len()).map(|p| p.len).sum();
        assert_eq!(covered, values.len());
    }

    #[test]
    fn constant_column_run_length_encodes_to_one_entry() {
        let values = vec![7i32; 10_000];
        let idx = ImprintIndex::<i32>::build(&values);
        assert_eq!(idx.dict.len(), 1);
        assert!(idx.dict[0].repeat);
    }

    #[test]
    fn disjoint_predicate_is_detected_without_scanning() {
        let values: Vec<i32> = (0..1000).collect();
        let idx = ImprintIndex::<i32>::build(&values);
        assert!(idx.column_disjoint_from(2000, 3000, false));
        assert!(!idx.column_disjoint_from(10, 20, false));
    }

    #[test]
    fn masks_are_complemented_and_swapped_for_anti() {
        let values: Vec<i32> = (0..1000).collect();
        let idx = ImprintIndex::<i32>::build(&values);
        let (outer, inner) = idx.predicate_masks(100, 200, false, true);
        let (anti_outer, anti_inner) = idx.predicate_masks(100, 200, true, true);
        let domain_mask = n_lowest_bits_1_64(idx.bits() as u8);
        assert_eq!(anti_outer, !inner & domain_mask);
        assert_eq!(anti_inner, !outer & domain_mask);
    }
}

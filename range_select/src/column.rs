//! `B`: the column the kernel reads from, plus lazily-built hash/imprint indexes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::hashindex::HashIndex;
use crate::imprints::ImprintIndex;
use crate::value::{ColumnValue, RowId};

/// A view onto a parent column: the values physically live in the parent's
/// storage (`Column::values` below is an `Rc` clone of the same buffer, sliced
/// by `offset`/`len`), and any imprint index is built over and shared from the
/// parent's own cell, mirroring `VIEWtparent`/`imprints = parent->T->imprints`
/// in the reference engine -- a predicate evaluated against a view prunes
/// using the same per-page masks the parent would, just walked starting at
/// this view's `physical_offset` rather than page 0.
pub(crate) struct ParentView<T: ColumnValue> {
    pub persistent: bool,
    /// Offset, in physical positions within the shared buffer, of this view's first element.
    pub physical_offset: usize,
    pub imprints: Rc<RefCell<Option<Rc<ImprintIndex<T>>>>>,
}

/// A logical array of values of one primitive type, with the metadata the
/// dispatcher needs: row-id head, ordering/density/nil/uniqueness flags, and
/// (for the hash and imprint paths) lazily-built index collaborators.
pub struct Column<T: ColumnValue> {
    /// The full backing buffer: for a view, this is an `Rc` clone of the
    /// parent's own buffer, not a copy, so the two share pages of an imprint
    /// index built once over the whole thing. `offset`/`len` locate this
    /// column's own logical range within it (`0..values.len()` for a
    /// non-view column).
    values: Rc<[T]>,
    offset: usize,
    len: usize,
    /// `H0`: logical row identifier of physical position 0.
    base: RowId,
    sorted: bool,
    rev_sorted: bool,
    /// Values are `H0 + offset` (a dense arithmetic sequence), enabling the
    /// positional dense path (C3.1) without touching `values` at all.
    dense: bool,
    nonnil: bool,
    key: bool,
    persistent: bool,
    parent: Option<ParentView<T>>,
    hash_index: RefCell<Option<Rc<HashIndex>>>,
    /// Shared via `Rc` (not a plain `RefCell`) so that [`Self::imprint_cell`]
    /// can hand a view a live alias of this same cell rather than a snapshot.
    imprints: Rc<RefCell<Option<Rc<ImprintIndex<T>>>>>,
}

impl<T: ColumnValue> Column<T> {
    pub fn new(values: Vec<T>, base: RowId) -> Self {
        let sorted = values.windows(2).all(|w| w[0].total_cmp(w[1]) != std::cmp::Ordering::Greater);
        let rev_sorted = values.windows(2).all(|w| w[0].total_cmp(w[1]) != std::cmp::Ordering::Less);
        let nonnil = !values.iter().any(|v| v.is_nil());
        let key = is_key(&values);
        let len = values.len();
        Self {
            values: Rc::from(values),
            offset: 0,
            len,
            base,
            sorted,
            rev_sorted,
            dense: false,
            nonnil,
            key,
            persistent: false,
            parent: None,
            hash_index: RefCell::new(None),
            imprints: Rc::new(RefCell::new(None)),
        }
    }

    pub fn with_sorted(mut self, sorted: bool, rev_sorted: bool) -> Self {
        self.sorted = sorted;
        self.rev_sorted = rev_sorted;
        self
    }

    pub fn with_dense(mut self, dense: bool) -> Self {
        self.dense = dense;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_key(mut self, key: bool) -> Self {
        self.key = key;
        self
    }

    #[inline] pub fn len(&self) -> usize { self.len }
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }
    #[inline] pub fn base(&self) -> RowId { self.base }
    #[inline] pub fn sorted(&self) -> bool { self.sorted }
    #[inline] pub fn rev_sorted(&self) -> bool { self.rev_sorted }
    #[inline] pub fn dense(&self) -> bool { self.dense }
    #[inline] pub fn nonnil(&self) -> bool { self.nonnil }
    #[inline] pub fn key(&self) -> bool { self.key }
    #[inline] pub fn persistent(&self) -> bool { self.persistent || self.parent.as_ref().is_some_and(|p| p.persistent) }
    #[inline] pub fn values(&self) -> &[T] { &self.values[self.offset..self.offset + self.len] }

    /// Logical identifier at physical position `p` (`p` local to this column, i.e. `0..len()`).
    #[inline] pub fn id_at(&self, p: usize) -> RowId { self.base + p as u64 }

    /// Physical position of logical identifier `o`, assuming `o` is within range.
    #[inline] pub fn pos_of(&self, o: RowId) -> usize { (o - self.base) as usize }

    #[inline] pub(crate) fn is_view(&self) -> bool { self.parent.is_some() }

    pub(crate) fn hash_index(&self) -> Option<Rc<HashIndex>> { self.hash_index.borrow().clone() }

    /// Idempotent, synchronous hash-index construction (the `build_hash` collaborator).
    /// Always built over this column's own logical range, view or not -- unlike
    /// imprints, the reference engine never shares a hash index across a view.
    pub(crate) fn build_hash(&self) -> Rc<HashIndex> {
        if let Some(existing) = self.hash_index() { return existing; }
        let built = Rc::new(HashIndex::build(self.values()));
        *self.hash_index.borrow_mut() = Some(built.clone());
        built
    }

    /// Idempotent, synchronous imprint-index construction (the `build_imprints`
    /// collaborator). For a view, built over (and cached on) the *parent's*
    /// cell and its whole backing buffer, so every view sharing that buffer
    /// reuses the same index -- `imprint_physical_offset` is what lets
    /// `crate::scan` address into it using this view's own coordinates.
    pub(crate) fn build_imprints(&self) -> Rc<ImprintIndex<T>> {
        let cell = self.parent.as_ref().map_or(&self.imprints, |p| &p.imprints);
        if let Some(existing) = cell.borrow().clone() { return existing; }
        let source: &[T] = if self.parent.is_some() { &self.values } else { self.values() };
        let built = Rc::new(ImprintIndex::build(source));
        *cell.borrow_mut() = Some(built.clone());
        built
    }

    pub(crate) fn imprints(&self) -> Option<Rc<ImprintIndex<T>>> {
        self.parent.as_ref().map_or_else(
            || self.imprints.borrow().clone(),
            |p| p.imprints.borrow().clone(),
        )
    }

    /// `pr_off` in the reference engine: offset (in physical positions) of this
    /// view's first element within the buffer the imprints were built over.
    /// Zero for a non-view column, since its own buffer *is* that coordinate space.
    pub(crate) fn imprint_physical_offset(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.physical_offset)
    }

    /// Constructs a view over `physical_offset..physical_offset+len` of `parent`'s
    /// own backing buffer (no copy), sharing `parent`'s imprint cell per §4.6's
    /// `VIEWtparent` handling. `base` is this view's own row-id head.
    pub fn as_view(parent: &Column<T>, physical_offset: usize, len: usize, base: RowId) -> Self {
        debug_assert!(!parent.is_view(), "a view shares a real column's storage, not another view's");
        debug_assert!(physical_offset + len <= parent.values.len());
        let values = parent.values.clone();
        let slice = &values[physical_offset..physical_offset + len];
        let sorted = slice.windows(2).all(|w| w[0].total_cmp(w[1]) != std::cmp::Ordering::Greater);
        let rev_sorted = slice.windows(2).all(|w| w[0].total_cmp(w[1]) != std::cmp::Ordering::Less);
        let nonnil = !slice.iter().any(|v| v.is_nil());
        let key = is_key(slice);
        Self {
            values,
            offset: physical_offset,
            len,
            base,
            sorted,
            rev_sorted,
            dense: false,
            nonnil,
            key,
            persistent: false,
            parent: Some(ParentView {
                persistent: parent.persistent,
                physical_offset,
                imprints: parent.imprint_cell(),
            }),
            hash_index: RefCell::new(None),
            imprints: Rc::new(RefCell::new(None)),
        }
    }

    /// Shareable handle to this column's own imprint cell, for constructing views onto it:
    /// a clone of the `Rc`, not a snapshot, so a build triggered through either the
    /// parent or any view populates the same cell for all of them.
    pub(crate) fn imprint_cell(&self) -> Rc<RefCell<Option<Rc<ImprintIndex<T>>>>> {
        debug_assert!(!self.is_view(), "views only ever share a real column's cell, not another view's");
        self.imprints.clone()
    }
}

/// Whether `values` are pairwise distinct, used to infer the `key` flag for
/// freshly constructed columns. Not on the kernel's hot path.
fn is_key<T: ColumnValue>(values: &[T]) -> bool {
    let mut sorted: Vec<T> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(*b));
    sorted.windows(2).all(|w| w[0].total_cmp(w[1]) != std::cmp::Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_sorted_key_nonnil_flags() {
        let c = Column::<i32>::new(vec![1, 2, 3], RowId(0));
        assert!(c.sorted());
        assert!(c.key());
        assert!(c.nonnil());
        assert!(!c.rev_sorted());
    }

    #[test]
    fn detects_reverse_sorted() {
        let c = Column::<i32>::new(vec![3, 2, 1], RowId(0));
        assert!(c.rev_sorted());
        assert!(!c.sorted());
    }

    #[test]
    fn detects_nil_and_duplicate() {
        let c = Column::<i32>::new(vec![1, i32::NIL, 1], RowId(0));
        assert!(!c.nonnil());
        assert!(!c.key());
    }

    #[test]
    fn id_and_pos_round_trip() {
        let c = Column::<i32>::new(vec![10, 20, 30], RowId(100));
        assert_eq!(c.id_at(1), RowId(101));
        assert_eq!(c.pos_of(RowId(101)), 1);
    }
}

//! `C1`: turns a possibly one-sided, possibly NIL-bounded, possibly negated
//! range argument into the kernel's canonical closed-range form, or determines
//! that the predicate can never match anything.
//!
//! Canonical form always has both bounds valued (`tl <= th`) and `li = hi =
//! !anti`: an ordinary select reads as `tl <= x <= th`, an anti-select as
//! `x <= tl || th <= x` (both with `x` restricted to non-NIL values). A
//! one-sided or NIL-bounded input normalizes by substituting the column
//! domain's `MIN`/`MAX`, shifting the open side to the next/previous
//! representable value, and -- for an anti-select bounded only at one end --
//! degenerating the predicate into a plain half-range select.

use std::cmp::Ordering;

use crate::value::ColumnValue;

/// A range argument exactly as a caller would state it: "`tl <[=] x <[=] th`",
/// negated if `anti`, with `th = None` meaning a point select against `tl`.
///
/// `li`/`hi` are only meaningful when paired with a non-NIL bound: a NIL `tl`
/// with `th` present means "unbounded below", and `li` must be `false` in that
/// case (there is no literal bound to be inclusive or exclusive about).
#[derive(Debug, Clone, Copy)]
pub struct RawPredicate<T: ColumnValue> {
    pub tl: T,
    pub th: Option<T>,
    pub li: bool,
    pub hi: bool,
    pub anti: bool,
}

/// The canonical closed-range predicate a strategy (C3/C4/C5) evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate<T: ColumnValue> {
    pub tl: T,
    pub th: T,
    pub anti: bool,
    /// Set when the original argument was a point select (`tl == th`,
    /// originally a true equality test rather than a degenerate unit range):
    /// lets the dense/sorted/hash paths pick an equality-specialized routine.
    pub equi: bool,
}

/// The outcome of normalizing a [`RawPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized<T: ColumnValue> {
    /// No row can possibly match; the caller should short-circuit to an empty result.
    Empty,
    Range(Predicate<T>),
}

/// Normalizes `raw` against a column known to contain no NIL values (`nonnil`)
/// or not.
pub fn normalize<T: ColumnValue>(raw: RawPredicate<T>, nonnil: bool) -> Normalized<T> {
    let RawPredicate { tl: raw_tl, th: raw_th, mut li, mut hi, mut anti } = raw;

    let lnil = raw_tl.is_nil();
    let mut lval = !lnil || raw_th.is_none();
    let mut equi = raw_th.is_none() || (lval && raw_tl.total_cmp(raw_th.unwrap()) == Ordering::Equal);

    let mut tl = raw_tl;
    let mut th: T;
    let mut hval: bool;
    if equi {
        if raw_th.is_none() {
            hi = li;
        }
        th = tl;
        hval = true;
    } else {
        let raw_th = raw_th.unwrap();
        th = raw_th;
        hval = !raw_th.is_nil();
    }

    if anti {
        if lval != hval {
            // One endpoint is unbounded and the other isn't: swap the two
            // sub-ranges so the unbounded side ends up on the right, same as
            // "-inf < x < vl" rewritten as "vl <[=] x < +inf" with roles flipped.
            let (new_li, new_hi) = (!hi, !li);
            li = new_li;
            hi = new_hi;
            std::mem::swap(&mut tl, &mut th);
            std::mem::swap(&mut lval, &mut hval);
            anti = false;
        } else if !lval && !hval {
            // anti-select over the unbounded nil-to-nil range: every non-NIL
            // value is "in range", so the complement is empty.
            return Normalized::Empty;
        } else if equi && lnil {
            // anti-select for NIL itself: becomes "everything but NIL".
            equi = false;
            anti = false;
            lval = false;
            hval = false;
        } else if equi {
            equi = false;
            if !(li && hi) {
                // anti-select for nothing (an open unit range): becomes
                // "everything but NIL".
                anti = false;
                lval = false;
                hval = false;
            }
        }
    }

    debug_assert!(!equi || (lval && hval));

    if hval && ((equi && !(li && hi)) || tl.total_cmp(th) == Ordering::Greater) {
        return Normalized::Empty;
    }
    if equi && lnil && nonnil {
        return Normalized::Empty;
    }

    if anti && li {
        if tl.total_cmp(T::MIN) == Ordering::Equal {
            anti = false;
            tl = th;
            li = !hi;
            hval = false;
        } else {
            tl = tl.prev();
            li = false;
        }
    }
    if anti && hi {
        if th.total_cmp(T::MAX) == Ordering::Equal {
            anti = false;
            th = tl;
            hi = !li;
            lval = false;
        } else {
            th = th.next();
            hi = false;
        }
    }
    if !anti {
        if lval {
            if !li {
                if tl.total_cmp(T::MAX) == Ordering::Equal {
                    return Normalized::Empty;
                }
                tl = tl.next();
                li = true;
            }
        } else {
            tl = T::MIN;
            li = true;
            lval = true;
        }
        if hval {
            if !hi {
                if th.total_cmp(T::MIN) == Ordering::Equal {
                    return Normalized::Empty;
                }
                th = th.prev();
                hi = true;
            }
        } else {
            th = T::MAX;
            hi = true;
            hval = true;
        }
    }

    debug_assert!(lval && hval);
    debug_assert!(li != anti);
    debug_assert!(hi != anti);

    Normalized::Range(Predicate { tl, th, anti, equi })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(tl: i32, th: i32, anti: bool) -> RawPredicate<i32> {
        RawPredicate { tl, th: Some(th), li: true, hi: true, anti }
    }

    #[test]
    fn closed_range_is_already_canonical() {
        let Normalized::Range(p) = normalize(closed(10, 20, false), true) else { panic!() };
        assert_eq!(p, Predicate { tl: 10, th: 20, anti: false, equi: false });
    }

    #[test]
    fn open_lower_bound_shifts_by_one() {
        let raw = RawPredicate { tl: 10, th: Some(20), li: false, hi: true, anti: false };
        let Normalized::Range(p) = normalize(raw, true) else { panic!() };
        assert_eq!(p.tl, 11);
        assert_eq!(p.th, 20);
    }

    #[test]
    fn one_sided_upper_fills_domain_min() {
        let raw = RawPredicate { tl: i32::NIL, th: Some(20), li: false, hi: true, anti: false };
        let Normalized::Range(p) = normalize(raw, true) else { panic!() };
        assert_eq!(p.tl, i32::MIN);
        assert_eq!(p.th, 20);
    }

    #[test]
    fn point_select_is_equi() {
        let raw = RawPredicate { tl: 7, th: None, li: true, hi: true, anti: false };
        let Normalized::Range(p) = normalize(raw, true) else { panic!() };
        assert!(p.equi);
        assert_eq!(p.tl, 7);
        assert_eq!(p.th, 7);
    }

    #[test]
    fn reversed_bounds_are_empty() {
        assert_eq!(normalize(closed(20, 10, false), true), Normalized::Empty);
    }

    #[test]
    fn anti_select_of_nil_becomes_everything_but_nil() {
        let raw = RawPredicate { tl: i32::NIL, th: None, li: true, hi: true, anti: true };
        let Normalized::Range(p) = normalize(raw, false) else { panic!() };
        assert!(!p.anti);
        assert_eq!(p.tl, i32::MIN);
        assert_eq!(p.th, i32::MAX);
    }

    #[test]
    fn equi_select_of_nil_on_nonnil_column_is_empty() {
        let raw = RawPredicate { tl: i32::NIL, th: None, li: true, hi: true, anti: false };
        assert_eq!(normalize(raw, true), Normalized::Empty);
    }

    #[test]
    fn anti_open_unit_range_is_left_in_double_ended_form() {
        // "5 < x < 6" negated is "x <= 5 || x >= 6"; for an integer domain that
        // matches everything, but the normalizer doesn't special-case it -- it
        // stays a double-ended anti predicate and the strategy layer (which
        // already has to handle the general anti case) produces the right set.
        let raw = RawPredicate { tl: 5, th: Some(6), li: false, hi: false, anti: true };
        let Normalized::Range(p) = normalize(raw, false) else { panic!() };
        assert_eq!(p, Predicate { tl: 5, th: 6, anti: true, equi: false });
    }

    #[test]
    fn anti_half_range_degenerates_to_plain_half_select() {
        // "-inf < x < 10", negated, degenerates to "10 <= x < +inf".
        let raw = RawPredicate { tl: i32::NIL, th: Some(10), li: false, hi: false, anti: true };
        let Normalized::Range(p) = normalize(raw, true) else { panic!() };
        assert!(!p.anti);
        assert_eq!(p.tl, 10);
        assert_eq!(p.th, i32::MAX);
    }

    #[test]
    fn anti_nil_to_nil_range_is_empty() {
        let raw = RawPredicate { tl: i32::NIL, th: Some(i32::NIL), li: false, hi: false, anti: true };
        assert_eq!(normalize(raw, true), Normalized::Empty);
    }
}

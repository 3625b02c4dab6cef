//! The `=`/`<`/`<=`/`>`/`>=`/`<>`/`!=` operator surface over [`crate::dispatch::select`].
//!
//! Theta select never returns NIL row values (handled by normalization, same
//! as every other entry point) and a NIL comparison value always yields an
//! empty result, since no value is ever equal to, less than, or greater than NIL.

use crate::candidates::Candidates;
use crate::column::Column;
use crate::dispatch::select;
use crate::error::{Result, SelectError};
use crate::predicate::RawPredicate;
use crate::result::SelectResult;
use crate::value::ColumnValue;

/// Evaluates `column <op> value`, restricted to `candidates` if given.
///
/// `op` must be one of `"="`, `"=="`, `"<"`, `"<="`, `">"`, `">="`, `"<>"`, `"!="`.
pub fn theta_select<T: ColumnValue>(
    column: &Column<T>,
    value: T,
    op: &str,
    candidates: Option<&Candidates>,
) -> Result<SelectResult> {
    if value.is_nil() {
        return Ok(SelectResult::empty());
    }
    let raw = match op {
        "=" | "==" => RawPredicate { tl: value, th: None, li: true, hi: true, anti: false },
        "!=" | "<>" => RawPredicate { tl: value, th: None, li: true, hi: true, anti: true },
        "<" => RawPredicate { tl: T::NIL, th: Some(value), li: false, hi: false, anti: false },
        "<=" => RawPredicate { tl: T::NIL, th: Some(value), li: false, hi: true, anti: false },
        ">" => RawPredicate { tl: value, th: Some(T::NIL), li: false, hi: false, anti: false },
        ">=" => RawPredicate { tl: value, th: Some(T::NIL), li: true, hi: false, anti: false },
        other => return Err(SelectError::Unsupported(format!("unknown theta-select operator {other:?}"))),
    };
    Ok(select(column, raw, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RowId;

    fn col() -> Column<i32> {
        Column::new(vec![1, 5, 3, 5, 2], RowId(0))
    }

    #[test]
    fn equality_operator() {
        let r = theta_select(&col(), 5, "=", None).unwrap();
        let mut got = r.to_vec();
        got.sort();
        assert_eq!(got, vec![RowId(1), RowId(3)]);
    }

    #[test]
    fn not_equal_operator_excludes_matches_and_nil() {
        let c = Column::new(vec![1, i32::NIL, 3], RowId(0));
        let r = theta_select(&c, 1, "!=", None).unwrap();
        assert_eq!(r.to_vec(), vec![RowId(2)]);
    }

    #[test]
    fn less_than_operator() {
        let r = theta_select(&col(), 3, "<", None).unwrap();
        let mut got = r.to_vec();
        got.sort();
        assert_eq!(got, vec![RowId(0), RowId(4)]);
    }

    #[test]
    fn greater_equal_operator() {
        let r = theta_select(&col(), 3, ">=", None).unwrap();
        let mut got = r.to_vec();
        got.sort();
        assert_eq!(got, vec![RowId(1), RowId(2), RowId(3)]);
    }

    #[test]
    fn nil_comparison_value_is_always_empty() {
        let r = theta_select(&col(), i32::NIL, "=", None).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn unknown_operator_is_an_error_not_a_panic() {
        let err = theta_select(&col(), 1, "~=", None).unwrap_err();
        assert!(matches!(err, SelectError::Unsupported(_)));
    }
}

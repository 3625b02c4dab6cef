#![doc = include_str!("../README.md")]

mod candidates;
mod column;
mod dense_sorted;
mod dispatch;
mod error;
mod hashindex;
mod imprints;
mod predicate;
mod result;
mod scan;
mod theta;
mod trace;
mod value;

pub use candidates::Candidates;
pub use column::Column;
pub use dispatch::select;
pub use error::{Result, SelectError};
pub use predicate::{Normalized, Predicate, RawPredicate};
pub use result::SelectResult;
pub use theta::theta_select;
pub use value::{ColumnValue, RowId};

use std::fmt;

/// Errors surfaced by [`crate::select`] and [`crate::theta_select`].
///
/// A "definitely empty" predicate is *not* an error: it is a successful call that
/// returns an empty [`crate::result::SelectResult`]. Only the three cases below --
/// malformed call arguments, a failed allocation, and an unrecognized theta-select
/// operator -- are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// A precondition on the call arguments was violated: an inclusivity flag
    /// outside `{0, 1}`, a candidate list that is not sorted ascending, or a
    /// column whose row-id head is not dense.
    InvalidArgument(String),
    /// A result or intermediate buffer could not be allocated or grown.
    OutOfMemory,
    /// `theta_select` was called with an operator string other than
    /// `"=" "==" "<>" "!=" "<" "<=" ">" ">="`.
    Unsupported(String),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Unsupported(op) => write!(f, "unsupported operator: {op}"),
        }
    }
}

impl std::error::Error for SelectError {}

pub type Result<T> = std::result::Result<T, SelectError>;

//! Three-valued reduction over check results.
//!
//! Two constant tables, one per operator, indexed by result rank. Under And
//! the precedence is Fail > Error > Unknown, with Pass an identity for the
//! determinate kinds; under Or it is Pass > Error > Unknown with Fail the
//! identity. Combining a value with a skip kind of strictly greater rank
//! yields the value unchanged, so the skip kinds absorb downward to the
//! minimum rank.
//!
//! ```text
//! AND  P  F  U  E  N    OR  P  F  U  E  N         P  F  U  E  N
//!   P  P  F  U  E  P     P  P  P  P  P  P    neg  F  P  U  E  N
//!   F  F  F  F  F  F     F  P  F  U  E  F
//!   U  U  F  U  E  U     U  P  U  U  E  U
//!   E  E  F  E  E  E     E  P  E  E  E  E
//!   N  P  F  U  E  N     N  P  F  U  E  N
//! ```

use crate::types::common::{BoolOperator, ResultKind};
use tracing::error;

/*                                     P  F  E  U  N  K  S  I  */
const RESULT_TABLE_AND: [[usize; 9]; 9] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 2, 3, 4, 1, 1, 1, 1], /* P (pass) */
    [0, 2, 2, 2, 2, 2, 2, 2, 2], /* F (fail) */
    [0, 3, 2, 3, 3, 3, 3, 3, 3], /* E (error) */
    [0, 4, 2, 3, 4, 4, 4, 4, 4], /* U (unknown) */
    [0, 1, 2, 3, 4, 5, 5, 5, 5], /* N (notapplicable) */
    [0, 1, 2, 3, 4, 5, 6, 6, 6], /* K (notchecked) */
    [0, 1, 2, 3, 4, 5, 6, 7, 7], /* S (notselected) */
    [0, 1, 2, 3, 4, 5, 6, 7, 8], /* I (informational) */
];

/*                                    P  F  E  U  N  K  S  I  */
const RESULT_TABLE_OR: [[usize; 9]; 9] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1], /* P (pass) */
    [0, 1, 2, 3, 4, 2, 2, 2, 2], /* F (fail) */
    [0, 1, 3, 3, 3, 3, 3, 3, 3], /* E (error) */
    [0, 1, 4, 3, 4, 4, 4, 4, 4], /* U (unknown) */
    [0, 1, 2, 3, 4, 5, 5, 5, 5], /* N (notapplicable) */
    [0, 1, 2, 3, 4, 5, 6, 6, 6], /* K (notchecked) */
    [0, 1, 2, 3, 4, 5, 6, 7, 7], /* S (notselected) */
    [0, 1, 2, 3, 4, 5, 6, 7, 8], /* I (informational) */
];

/// Reduce two results under the given operator. `Fixed` participates as
/// `Pass`, its scoring alias.
pub fn combine(a: ResultKind, b: ResultKind, operator: BoolOperator) -> ResultKind {
    let table = match operator {
        BoolOperator::And => &RESULT_TABLE_AND,
        BoolOperator::Or => &RESULT_TABLE_OR,
    };
    match ResultKind::from_rank(table[a.rank()][b.rank()]) {
        Some(kind) => kind,
        None => {
            error!(a = %a, b = %b, "bad test results in reduction");
            ResultKind::Unknown
        }
    }
}

pub fn and(a: ResultKind, b: ResultKind) -> ResultKind {
    combine(a, b, BoolOperator::And)
}

pub fn or(a: ResultKind, b: ResultKind) -> ResultKind {
    combine(a, b, BoolOperator::Or)
}

/// Negation swaps Pass and Fail and leaves everything else alone. Applied
/// exactly once at the root of each check, never pushed into a complex tree.
pub fn negate(value: ResultKind) -> ResultKind {
    match value {
        ResultKind::Pass => ResultKind::Fail,
        ResultKind::Fail => ResultKind::Pass,
        other => other,
    }
}

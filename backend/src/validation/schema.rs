//! Positional header check.

use crate::models::{CountMismatch, HeaderMismatch, Table};

/// Compare a table's columns against the expected schema, position by position.
///
/// A different column count short-circuits with [`CountMismatch`]; no
/// positional diff is attempted in that case. Otherwise every position is
/// visited and each differing pair is returned, in column order.
pub fn check_headers<S: AsRef<str>>(
    table: &Table,
    expected: &[S],
) -> Result<Vec<HeaderMismatch>, CountMismatch> {
    let actual = table.columns();
    if actual.len() != expected.len() {
        return Err(CountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    Ok(expected
        .iter()
        .zip(actual)
        .filter(|(e, a)| e.as_ref() != a.as_str())
        .map(|(e, a)| HeaderMismatch {
            expected: e.as_ref().to_string(),
            actual: a.clone(),
        })
        .collect())
}

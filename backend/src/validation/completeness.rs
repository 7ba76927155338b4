//! Null detection.

use crate::models::Table;

/// Names of the columns holding at least one null, in schema order.
///
/// Each column is reported once however many rows are null; the offending
/// rows themselves are not reported.
pub fn check_nulls(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| table.rows().iter().any(|row| row[*idx].is_null()))
        .map(|(_, name)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    #[test]
    fn test_no_nulls() {
        let t = Table::from_rows(
            ["fscs_id", "tag"],
            vec![vec!["KY0069".into(), "tag 1".into()]],
        );
        assert!(check_nulls(&t).is_empty());
    }

    #[test]
    fn test_nulls_reported_once_in_schema_order() {
        let t = Table::from_rows(
            ["fscs_id", "name", "address", "tag"],
            vec![
                vec!["KY0069".into(), "Library 1".into(), "1 Main St".into(), Value::Null],
                vec![Value::Null, "Library 2".into(), "2 Main St".into(), "tag 2".into()],
                vec![Value::Null, "Library 3".into(), "3 Main St".into(), Value::Null],
            ],
        );
        assert_eq!(check_nulls(&t), vec!["fscs_id", "tag"]);
    }

    #[test]
    fn test_empty_table_has_no_nulls() {
        let t = Table::new(vec!["fscs_id".into()]);
        assert!(check_nulls(&t).is_empty());
    }
}

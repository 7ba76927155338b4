//! Credential enrichment.
//!
//! Adds a generated credential column to a validated table and writes the
//! result next to the input as `extended_<name>.csv`.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use crate::error::{AdminError, AdminResult};
use crate::logs::Diagnostics;
use crate::models::{Table, Value};
use crate::parser::write_csv_file;

/// Prefix of the enriched file name.
pub const EXTENDED_PREFIX: &str = "extended_";

/// Words per generated passphrase.
pub const DEFAULT_WORD_COUNT: usize = 6;

static WORDLIST: Lazy<Vec<&'static str>> = Lazy::new(|| {
    include_str!("wordlist.txt")
        .lines()
        .map(str::trim)
        .filter(|w| (5..=8).contains(&w.len()))
        .collect()
});

/// Produces one opaque credential per call.
pub trait TokenSource {
    fn generate(&mut self) -> String;
}

impl<F: FnMut() -> String> TokenSource for F {
    fn generate(&mut self) -> String {
        self()
    }
}

/// xkcd-style passphrases: dictionary words of 5 to 8 letters joined by `-`.
///
/// Words are drawn from an embedded list with a cryptographically secure RNG.
/// Successive passphrases are independent; nothing prevents two rows from
/// getting the same one.
pub struct PassphraseGenerator {
    word_count: usize,
    rng: StdRng,
}

impl PassphraseGenerator {
    pub fn new() -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_word_count(mut self, word_count: usize) -> Self {
        self.word_count = word_count.max(1);
        self
    }
}

impl Default for PassphraseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for PassphraseGenerator {
    fn generate(&mut self) -> String {
        (0..self.word_count)
            .filter_map(|_| WORDLIST.choose(&mut self.rng).copied())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// New table with `column` appended, one fresh credential per row.
///
/// The input table is left untouched.
pub fn enrich(table: &Table, column: &str, source: &mut impl TokenSource) -> Table {
    table.with_column(column, |_| Value::Text(source.generate()))
}

/// `dir/extended_name.csv` for `dir/name.csv`.
pub fn extended_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", EXTENDED_PREFIX, name))
}

/// Write the enriched table to `path`.
///
/// An existing file is only replaced when `overwrite` is set.
pub fn write_extended(
    table: &Table,
    path: &Path,
    overwrite: bool,
    diag: &Diagnostics,
) -> AdminResult<()> {
    if path.exists() {
        if !overwrite {
            let err = AdminError::OutputExists(path.to_path_buf());
            diag.error(err.to_string());
            return Err(err);
        }
        std::fs::remove_file(path)?;
        diag.info(format!(
            "'{}' removed and new extended CSV written",
            path.display()
        ));
    }

    write_csv_file(path, table)?;
    diag.success(format!(
        "Wrote {} rows to {}",
        table.len(),
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{API_KEY, EXPECTED_HEADERS};
    use crate::validation::{check_headers, check_nulls};

    fn good_table() -> Table {
        Table::from_rows(
            EXPECTED_HEADERS,
            vec![
                vec![
                    "KY0069".into(),
                    "Library 1".into(),
                    "123 Sesame Street, Public Television, TV 40404".into(),
                    "tag 1".into(),
                ],
                vec![
                    "ME0119".into(),
                    "Library 2".into(),
                    "1800F St NW, Lewiston, ME, 04240".into(),
                    "tag 2".into(),
                ],
            ],
        )
    }

    #[test]
    fn test_wordlist_loaded() {
        assert!(WORDLIST.len() > 100);
        assert!(WORDLIST.iter().all(|w| (5..=8).contains(&w.len())));
    }

    #[test]
    fn test_passphrase_shape() {
        let mut gen = PassphraseGenerator::with_seed(7);
        let phrase = gen.generate();
        let words: Vec<_> = phrase.split('-').collect();

        assert_eq!(words.len(), DEFAULT_WORD_COUNT);
        assert!(words.iter().all(|w| WORDLIST.contains(w)));
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let a = PassphraseGenerator::with_seed(42).with_word_count(4).generate();
        let b = PassphraseGenerator::with_seed(42).with_word_count(4).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_enrich_adds_one_complete_column() {
        let table = good_table();
        let mut gen = PassphraseGenerator::with_seed(1);

        let extended = enrich(&table, API_KEY, &mut gen);

        let mut expected: Vec<&str> = EXPECTED_HEADERS.to_vec();
        expected.push(API_KEY);
        assert_eq!(check_headers(&extended, &expected), Ok(vec![]));
        assert!(check_nulls(&extended).is_empty());
        assert_eq!(extended.len(), table.len());
        assert_eq!(table.columns().len(), 4);
    }

    #[test]
    fn test_one_generation_call_per_row() {
        let table = good_table();
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            format!("token-{}", calls)
        };

        let extended = enrich(&table, "passphrase", &mut source);

        assert_eq!(calls, 2);
        assert_eq!(extended.rows()[0][4], Value::from("token-1"));
        assert_eq!(extended.rows()[1][4], Value::from("token-2"));
    }

    #[test]
    fn test_extended_path() {
        assert_eq!(
            extended_path(Path::new("data/libraries.csv")),
            PathBuf::from("data/extended_libraries.csv")
        );
    }

    #[test]
    fn test_write_extended_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extended_libraries.csv");
        let diag = Diagnostics::silent();
        let table = good_table();

        write_extended(&table, &path, false, &diag).unwrap();
        assert!(matches!(
            write_extended(&table, &path, false, &diag),
            Err(AdminError::OutputExists(_))
        ));
        write_extended(&table, &path, true, &diag).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("fscs_id,name,address,tag\n"));
    }
}

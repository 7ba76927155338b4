//! FSCS identifier format check.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::ConfigError;
use crate::models::{Table, Value};

/// Two uppercase letters then four digits, at the start of the value.
pub const PREFIX_PATTERN: &str = r"^[A-Z]{2}[0-9]{4}";

/// The whole value is `AA0000`, optionally followed by `-000`.
pub const STRICT_PATTERN: &str = r"^[A-Z]{2}[0-9]{4}(-[0-9]{3})?$";

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PREFIX_PATTERN).expect("Invalid embedded identifier pattern"));

static STRICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(STRICT_PATTERN).expect("Invalid embedded identifier pattern"));

/// Lexical rule an identifier must satisfy.
///
/// Matching is a regex search, so a pattern without a trailing `$` accepts
/// any value that merely starts with a valid id (`KY0069-001`).
#[derive(Clone)]
pub struct IdentifierPattern {
    regex: Regex,
}

impl IdentifierPattern {
    /// `^[A-Z]{2}[0-9]{4}` with prefix semantics.
    pub fn prefix() -> Self {
        Self {
            regex: PREFIX_RE.clone(),
        }
    }

    /// `AA0000` or `AA0000-000`, nothing else.
    pub fn strict() -> Self {
        Self {
            regex: STRICT_RE.clone(),
        }
    }

    pub fn custom(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl Default for IdentifierPattern {
    fn default() -> Self {
        Self::prefix()
    }
}

impl fmt::Debug for IdentifierPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdentifierPattern").field(&self.as_str()).finish()
    }
}

/// Identifier values of `column` that fail `pattern`, in row order.
///
/// Duplicates are kept. A null cell fails and is reported as an empty string;
/// a missing column yields no findings here; `validate_table` rejects that
/// case before calling this.
pub fn check_identifiers(table: &Table, column: &str, pattern: &IdentifierPattern) -> Vec<String> {
    let Some(values) = table.column_values(column) else {
        return Vec::new();
    };

    values
        .filter(|v| match v {
            Value::Null => true,
            other => !pattern.is_match(&other.as_cell()),
        })
        .map(Value::as_cell)
        .collect()
}

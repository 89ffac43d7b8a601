use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Length of a well-formed CNPJ after normalization.
pub const CNPJ_LEN: usize = 14;

static NON_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]+").unwrap());

/// Strips every character that is not an ASCII decimal digit. Non-ASCII
/// decimal digits (Arabic-Indic, fullwidth) are stripped as well.
pub fn normalize(raw: &str) -> String {
    NON_DIGITS.replace_all(raw, "").into_owned()
}

/// A normalized CNPJ. Length is not enforced; malformed input is carried
/// through as-is and only reported by [`Cnpj::is_well_formed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cnpj(String);

impl Cnpj {
    pub fn normalized(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == CNPJ_LEN
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat view of one registry lookup. Every text field is empty when the
/// provider omitted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub cnpj: String,
    pub state_registration: String,
    pub legal_name: String,
    pub alternate_name: String,
    pub trade_name: String,
    pub street: String,
    pub postal_code: String,
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("11.222.333/0001-44"), "11222333000144");
    }

    #[test]
    fn normalize_garbage_is_empty() {
        assert_eq!(normalize("aaa"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn well_formed_requires_fourteen_digits() {
        assert!(Cnpj::normalized("11.222.333/0001-44").is_well_formed());
        assert!(!Cnpj::normalized("1234").is_well_formed());
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Validated ticker, normalized to uppercase ASCII.
///
/// Accepts 1 to 15 characters: a leading letter followed by letters, digits,
/// `.` or `-` (class shares and exchange suffixes use both).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

const MAX_LEN: usize = 15;

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let candidate = input.trim().to_ascii_uppercase();

        let first = candidate.chars().next().ok_or(ValidationError::EmptySymbol)?;
        if !first.is_ascii_alphabetic() {
            return Err(ValidationError::SymbolInvalidStart { ch: first });
        }

        let len = candidate.chars().count();
        if len > MAX_LEN {
            return Err(ValidationError::SymbolTooLong { len, max: MAX_LEN });
        }

        let body_violation = candidate
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric() && *ch != '.' && *ch != '-');
        if let Some((index, ch)) = body_violation {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

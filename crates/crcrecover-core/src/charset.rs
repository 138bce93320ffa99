//! Ordered character sets that candidates are drawn from.

use std::fmt;

/// Letters and digits, the default alphabet
pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Printable ASCII punctuation appended to [`ALPHANUMERIC`] in symbol mode
pub const SYMBOLS: &str = "!@#$%^&*()_+-=[]{};':\",./<>?\\|`~";

/// An ordered set of distinct characters.
///
/// Order is significant: it defines the enumeration order of candidates.
/// Duplicates are dropped on construction, keeping the first occurrence,
/// since they only widen the branching factor without adding new strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    chars: Vec<char>,
}

impl Charset {
    /// Builds a charset from the characters of `s`
    pub fn new(s: &str) -> Self {
        Self::from_chars(s.chars())
    }

    /// Builds a charset from an iterator of characters
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut out: Vec<char> = Vec::new();
        for c in chars {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        Self { chars: out }
    }

    /// `[a-zA-Z0-9]`
    pub fn alphanumeric() -> Self {
        Self::new(ALPHANUMERIC)
    }

    /// `[a-zA-Z0-9]` followed by ASCII punctuation
    pub fn with_symbols() -> Self {
        Self::from_chars(ALPHANUMERIC.chars().chain(SYMBOLS.chars()))
    }

    /// Selects one of the built-in sets
    pub fn for_symbols(use_symbols: bool) -> Self {
        if use_symbols {
            Self::with_symbols()
        } else {
            Self::alphanumeric()
        }
    }

    /// Number of distinct characters
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns true if the charset has no characters
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at position `index` in enumeration order
    pub fn get(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// Characters in enumeration order
    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::alphanumeric()
    }
}

impl From<&str> for Charset {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

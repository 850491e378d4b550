//! The lookup command grammar.
//!
//! The planner model may answer with exactly one of:
//!
//! ```text
//! get <key>
//! lrange <key> [<start> <stop>]
//! None
//! ```
//!
//! Verbs are case-sensitive. `lrange` bounds are accepted for compatibility
//! with what models tend to write, but the whole list is always fetched.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::LookupError;

/// Literal the planner answers with when no lookup is needed.
pub const NO_LOOKUP_SENTINEL: &str = "None";

static GET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^get\s+(\S+)$").expect("Invalid get regex"));

static LRANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^lrange\s+(\S+)(?:\s+-?\d+\s+-?\d+)?$").expect("Invalid lrange regex")
});

/// Quote characters models like to wrap commands in.
const WRAPPING_QUOTES: &[char] = &['"', '\'', '`', '\u{201c}', '\u{201d}'];

/// A parsed planner decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupCommand {
    /// Single string value at `key`.
    FetchKey { key: String },
    /// Whole list at `key`.
    FetchRange { key: String },
    /// No store access needed.
    NoLookup,
}

impl LookupCommand {
    /// Strictly parse planner output.
    ///
    /// Surrounding whitespace and quote characters are ignored. Anything
    /// that is not the sentinel or one of the two command shapes is
    /// rejected with [`LookupError::Unsupported`] carrying the raw text.
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let text = normalize(raw);

        if text == NO_LOOKUP_SENTINEL {
            return Ok(LookupCommand::NoLookup);
        }

        if let Some(caps) = GET_RE.captures(text) {
            return Ok(LookupCommand::FetchKey {
                key: caps[1].to_string(),
            });
        }

        if let Some(caps) = LRANGE_RE.captures(text) {
            return Ok(LookupCommand::FetchRange {
                key: caps[1].to_string(),
            });
        }

        Err(LookupError::Unsupported(raw.to_string()))
    }

    /// The key this command reads, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            LookupCommand::FetchKey { key } | LookupCommand::FetchRange { key } => Some(key),
            LookupCommand::NoLookup => None,
        }
    }
}

impl fmt::Display for LookupCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupCommand::FetchKey { key } => write!(f, "get {}", key),
            LookupCommand::FetchRange { key } => write!(f, "lrange {} 0 -1", key),
            LookupCommand::NoLookup => f.write_str(NO_LOOKUP_SENTINEL),
        }
    }
}

fn normalize(raw: &str) -> &str {
    raw.trim().trim_matches(WRAPPING_QUOTES).trim()
}

use std::borrow::Cow;

use crate::command::NO_LOOKUP_SENTINEL;
use crate::error::LookupError;

/// What the answer stage is told about the lookup stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupData {
    /// The planner decided no store data was needed.
    NotRequested,
    /// Text produced by the lookup, including the not-found message.
    Retrieved(String),
    /// The lookup could not run or the store failed.
    Failed(String),
}

impl LookupData {
    /// Text embedded in the answer prompt.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            LookupData::NotRequested => Cow::Borrowed(NO_LOOKUP_SENTINEL),
            LookupData::Retrieved(data) => Cow::Borrowed(data),
            LookupData::Failed(reason) => Cow::Owned(format!("Lookup failed: {}", reason)),
        }
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self, LookupData::NotRequested)
    }
}

impl From<Result<Option<String>, LookupError>> for LookupData {
    fn from(result: Result<Option<String>, LookupError>) -> Self {
        match result {
            Ok(Some(data)) => LookupData::Retrieved(data),
            Ok(None) => LookupData::NotRequested,
            Err(e) => LookupData::Failed(e.to_string()),
        }
    }
}

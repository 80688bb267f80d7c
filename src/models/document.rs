use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the zero-padded sequence part of a document number.
pub const SEQUENCE_WIDTH: usize = 6;

/// Document families that receive sequential, tenant-scoped numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    JournalEntry,
    CreditNote,
    DebitNote,
}

impl DocumentType {
    /// Prefix used both in the formatted number and as the sequence key.
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentType::JournalEntry => "JE",
            DocumentType::CreditNote => "CN",
            DocumentType::DebitNote => "DN",
        }
    }

    /// Formats a sequence value, e.g. `JE-000042`.
    pub fn format_number(&self, sequence: i64) -> String {
        format!("{}-{:0width$}", self.prefix(), sequence, width = SEQUENCE_WIDTH)
    }

    /// Extracts the sequence value from a formatted number of this type.
    pub fn parse_sequence(&self, number: &str) -> Option<i64> {
        number
            .strip_prefix(self.prefix())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

use super::money::{fits_money, is_money};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Posting state of a journal entry. `Posted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryState {
    Draft,
    Posted,
}

/// Header of a double-entry journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub is_posted: bool,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn state(&self) -> EntryState {
        if self.is_posted {
            EntryState::Posted
        } else {
            EntryState::Draft
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// A single debit or credit line of a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntryLine {
    pub id: Uuid,
    pub journal_entry_id: Uuid,
    pub line_number: i32,
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
}

/// Journal entry header together with its ordered lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntryWithLines {
    pub entry: JournalEntry,
    pub lines: Vec<JournalEntryLine>,
}

/// Line as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLineInput {
    pub account_id: Uuid,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    pub description: Option<String>,
}

impl JournalLineInput {
    pub fn debit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    pub fn credit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request to create a draft journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJournalEntryRequest {
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub lines: Vec<JournalLineInput>,
}

/// Filters accepted by the journal entry listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalEntryFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Only entries with at least one line on this account.
    pub account_id: Option<Uuid>,
    /// Case-insensitive match against number, description or reference.
    pub search: Option<String>,
    pub is_posted: Option<bool>,
}

/// Debit and credit sums over a line set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

impl EntryTotals {
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// Reasons a journal line set is rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalLineError {
    NoLines,
    NegativeAmount { line: usize },
    InvalidPrecision { line: usize },
    EmptyLine { line: usize },
    BothSides { line: usize },
    AmountOutOfRange { line: usize },
    TotalOutOfRange,
    Unbalanced {
        total_debit: Decimal,
        total_credit: Decimal,
    },
}

impl std::fmt::Display for JournalLineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalLineError::NoLines => write!(f, "Journal entry requires at least one line"),
            JournalLineError::NegativeAmount { line } => {
                write!(f, "Line {}: amounts cannot be negative", line)
            }
            JournalLineError::InvalidPrecision { line } => write!(
                f,
                "Line {}: amounts cannot be finer than the smallest currency unit",
                line
            ),
            JournalLineError::EmptyLine { line } => {
                write!(f, "Line {}: either debit or credit must be positive", line)
            }
            JournalLineError::BothSides { line } => {
                write!(f, "Line {}: cannot carry both a debit and a credit", line)
            }
            JournalLineError::AmountOutOfRange { line } => {
                write!(f, "Line {}: amount exceeds the supported range", line)
            }
            JournalLineError::TotalOutOfRange => {
                write!(f, "Entry totals exceed the supported range")
            }
            JournalLineError::Unbalanced {
                total_debit,
                total_credit,
            } => write!(
                f,
                "Unbalanced entry: total debit {} != total credit {}",
                total_debit, total_credit
            ),
        }
    }
}

impl std::error::Error for JournalLineError {}

/// Validates every line and sums both sides; the set must balance exactly.
/// Line numbers in errors are 1-based.
pub fn balanced_totals(lines: &[JournalLineInput]) -> Result<EntryTotals, JournalLineError> {
    if lines.is_empty() {
        return Err(JournalLineError::NoLines);
    }

    let mut totals = EntryTotals {
        total_debit: Decimal::ZERO,
        total_credit: Decimal::ZERO,
    };

    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(JournalLineError::NegativeAmount { line: line_no });
        }
        if !is_money(&line.debit) || !is_money(&line.credit) {
            return Err(JournalLineError::InvalidPrecision { line: line_no });
        }
        if !fits_money(&line.debit) || !fits_money(&line.credit) {
            return Err(JournalLineError::AmountOutOfRange { line: line_no });
        }
        match (line.debit.is_zero(), line.credit.is_zero()) {
            (true, true) => return Err(JournalLineError::EmptyLine { line: line_no }),
            (false, false) => return Err(JournalLineError::BothSides { line: line_no }),
            _ => {}
        }
        totals.total_debit = checked_total(totals.total_debit, line.debit)?;
        totals.total_credit = checked_total(totals.total_credit, line.credit)?;
    }

    if !totals.is_balanced() {
        return Err(JournalLineError::Unbalanced {
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
        });
    }

    Ok(totals)
}

fn checked_total(total: Decimal, amount: Decimal) -> Result<Decimal, JournalLineError> {
    total
        .checked_add(amount)
        .filter(fits_money)
        .ok_or(JournalLineError::TotalOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balanced_fractional_cents() {
        let cash = Uuid::new_v4();
        let revenue = Uuid::new_v4();
        let lines = vec![
            JournalLineInput::debit(cash, dec!(100.10)),
            JournalLineInput::credit(revenue, dec!(100.10)),
        ];

        let totals = balanced_totals(&lines).unwrap();
        assert_eq!(totals.total_debit, dec!(100.10));
        assert_eq!(totals.total_credit, dec!(100.10));
    }

    #[test]
    fn test_unbalanced_by_five_cents() {
        let lines = vec![
            JournalLineInput::debit(Uuid::new_v4(), dec!(100.10)),
            JournalLineInput::credit(Uuid::new_v4(), dec!(100.05)),
        ];

        assert_eq!(
            balanced_totals(&lines),
            Err(JournalLineError::Unbalanced {
                total_debit: dec!(100.10),
                total_credit: dec!(100.05),
            })
        );
    }

    #[test]
    fn test_split_lines_balance() {
        let lines = vec![
            JournalLineInput::debit(Uuid::new_v4(), dec!(0.10)),
            JournalLineInput::debit(Uuid::new_v4(), dec!(0.20)),
            JournalLineInput::credit(Uuid::new_v4(), dec!(0.30)),
        ];

        assert!(balanced_totals(&lines).unwrap().is_balanced());
    }

    #[test]
    fn test_rejects_empty_line_set() {
        assert_eq!(balanced_totals(&[]), Err(JournalLineError::NoLines));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let account = Uuid::new_v4();

        let negative = vec![JournalLineInput::debit(account, dec!(-5))];
        assert_eq!(
            balanced_totals(&negative),
            Err(JournalLineError::NegativeAmount { line: 1 })
        );

        let empty = vec![
            JournalLineInput::debit(account, dec!(5)),
            JournalLineInput::debit(account, Decimal::ZERO),
        ];
        assert_eq!(
            balanced_totals(&empty),
            Err(JournalLineError::EmptyLine { line: 2 })
        );

        let both = vec![JournalLineInput {
            account_id: account,
            debit: dec!(5),
            credit: dec!(5),
            description: None,
        }];
        assert_eq!(
            balanced_totals(&both),
            Err(JournalLineError::BothSides { line: 1 })
        );

        let precise = vec![
            JournalLineInput::debit(account, dec!(1.005)),
            JournalLineInput::credit(account, dec!(1.005)),
        ];
        assert_eq!(
            balanced_totals(&precise),
            Err(JournalLineError::InvalidPrecision { line: 1 })
        );
    }

    #[test]
    fn test_rejects_amounts_beyond_storage_range() {
        let account = Uuid::new_v4();

        let huge = vec![
            JournalLineInput::debit(account, Decimal::MAX),
            JournalLineInput::debit(account, Decimal::MAX),
            JournalLineInput::credit(account, Decimal::MAX),
        ];
        assert_eq!(
            balanced_totals(&huge),
            Err(JournalLineError::AmountOutOfRange { line: 1 })
        );

        let near_limit = dec!(99999999999999999.99);
        let summed = vec![
            JournalLineInput::debit(account, near_limit),
            JournalLineInput::debit(account, near_limit),
            JournalLineInput::credit(account, near_limit),
            JournalLineInput::credit(account, near_limit),
        ];
        assert_eq!(
            balanced_totals(&summed),
            Err(JournalLineError::TotalOutOfRange)
        );

        let at_limit = vec![
            JournalLineInput::debit(account, near_limit),
            JournalLineInput::credit(account, near_limit),
        ];
        assert!(balanced_totals(&at_limit).is_ok());
    }

    #[test]
    fn test_entry_state() {
        let now = Utc::now();
        let mut entry = JournalEntry {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            entry_number: "JE-000001".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            description: "Opening balance".to_string(),
            reference: None,
            total_debit: dec!(10),
            total_credit: dec!(10),
            is_posted: false,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(entry.state(), EntryState::Draft);
        assert!(entry.is_balanced());

        entry.is_posted = true;
        entry.posted_at = Some(now);
        assert_eq!(entry.state(), EntryState::Posted);
    }

    #[test]
    fn test_line_input_defaults_missing_side_to_zero() {
        let account = Uuid::new_v4();
        let json = serde_json::json!({ "account_id": account, "debit": "12.50" });
        let line: JournalLineInput = serde_json::from_value(json).unwrap();

        assert_eq!(line.debit, dec!(12.50));
        assert!(line.credit.is_zero());
    }
}

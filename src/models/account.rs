use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Account types of the chart of accounts.
/// Each type has a "normal balance" that determines how debits and credits affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Resources owned. Normal balance is DEBIT.
    Asset,
    /// Amounts owed. Normal balance is CREDIT.
    Liability,
    /// Owner's residual interest. Normal balance is CREDIT.
    Equity,
    /// Income earned. Normal balance is CREDIT.
    Revenue,
    /// Costs incurred. Normal balance is DEBIT.
    Expense,
}

impl AccountType {
    /// Returns true if the account type has a normal debit balance.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Returns true if the account type has a normal credit balance.
    pub fn is_credit_normal(&self) -> bool {
        !self.is_debit_normal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Equity => "EQUITY",
            AccountType::Revenue => "REVENUE",
            AccountType::Expense => "EXPENSE",
        }
    }
}

/// A tenant-scoped account of the chart of accounts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        tenant_id: Uuid,
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code,
            name,
            account_type,
            parent_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks if the account can receive journal lines.
    pub fn accepts_postings(&self) -> bool {
        self.is_active
    }

    /// Applies a patch and returns the resulting account, leaving `self` untouched.
    pub fn patched(&self, patch: &AccountPatch) -> Self {
        let mut updated = self.clone();
        if let Some(code) = &patch.code {
            updated.code = code.trim().to_string();
        }
        if let Some(name) = &patch.name {
            updated.name = name.trim().to_string();
        }
        if let Some(account_type) = patch.account_type {
            updated.account_type = account_type;
        }
        if let Some(parent_id) = patch.parent_id {
            updated.parent_id = parent_id;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }
        updated.updated_at = Utc::now();
        updated
    }
}

/// Request to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
}

/// Partial update of an account. `parent_id: Some(None)` detaches the account
/// from its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AccountPatch {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// Filters accepted by the account listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFilter {
    /// Case-insensitive match against code or name.
    pub search: Option<String>,
    pub account_type: Option<AccountType>,
    pub is_active: Option<bool>,
    pub parent_id: Option<Uuid>,
}

/// Compact reference to an account, used for parent/child summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccountRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// An account with its position in the hierarchy and its usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountListing {
    pub account: Account,
    pub parent: Option<AccountRef>,
    pub children: Vec<AccountRef>,
    /// Number of journal lines referencing the account.
    pub line_count: i64,
}

impl AccountListing {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// True when neither children nor journal lines block deletion.
    pub fn is_deletable(&self) -> bool {
        self.children.is_empty() && self.line_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash_account() -> Account {
        Account::new(
            Uuid::new_v4(),
            "1000".to_string(),
            "Cash".to_string(),
            AccountType::Asset,
            None,
        )
    }

    #[test]
    fn test_account_type_normal_balance() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(AccountType::Liability.is_credit_normal());
        assert!(AccountType::Equity.is_credit_normal());
        assert!(AccountType::Revenue.is_credit_normal());
    }

    #[test]
    fn test_account_creation() {
        let account = cash_account();

        assert_eq!(account.code, "1000");
        assert_eq!(account.account_type, AccountType::Asset);
        assert!(account.is_active);
        assert!(account.parent_id.is_none());
        assert!(account.accepts_postings());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let account = cash_account();
        let parent = Uuid::new_v4();

        let patched = account.patched(&AccountPatch {
            name: Some("  Petty Cash ".to_string()),
            parent_id: Some(Some(parent)),
            is_active: Some(false),
            ..Default::default()
        });

        assert_eq!(patched.code, "1000");
        assert_eq!(patched.name, "Petty Cash");
        assert_eq!(patched.parent_id, Some(parent));
        assert!(!patched.accepts_postings());
        assert_eq!(account.name, "Cash");
    }

    #[test]
    fn test_patch_can_detach_parent() {
        let mut account = cash_account();
        account.parent_id = Some(Uuid::new_v4());

        let patched = account.patched(&AccountPatch {
            parent_id: Some(None),
            ..Default::default()
        });

        assert!(patched.parent_id.is_none());
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateAccountRequest {
            code: String::new(),
            name: "Cash".to_string(),
            account_type: AccountType::Asset,
            parent_id: None,
        };
        assert!(request.validate().is_err());

        let request = CreateAccountRequest {
            code: "1000".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_account_type_serialization() {
        let json = serde_json::to_string(&AccountType::Liability).unwrap();
        assert_eq!(json, "\"LIABILITY\"");

        let parsed: AccountType = serde_json::from_str("\"EQUITY\"").unwrap();
        assert_eq!(parsed, AccountType::Equity);
    }
}

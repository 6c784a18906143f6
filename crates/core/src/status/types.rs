//! Published state shapes.

use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountSummary};

/// Externally observable snapshot of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Whether the scheduling loop is active.
    pub running: bool,
    /// Number of registered accounts; always `account_status.len()`.
    pub accounts_num: usize,
    /// Outstanding jobs across all accounts that are not disabled.
    pub jobs_left: u64,
    /// Configured concurrency ceiling.
    pub concurrent: usize,
    /// Estimated seconds until `jobs_left` reaches zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u64>,
    /// Status code per account, in registry order.
    pub account_status: Vec<i32>,
}

/// User-adjustable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub concurrent: usize,
}

/// Account as exchanged with the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixAiAccount {
    pub email: String,
    pub password: String,
    /// Lower-case status name. Ignored on input.
    #[serde(default)]
    pub status: String,
}

impl PixAiAccount {
    /// Outbound view of an account. The password is never sent back.
    pub fn redacted(summary: &AccountSummary) -> Self {
        Self {
            email: summary.email.clone(),
            password: String::new(),
            status: summary.status.as_str().to_string(),
        }
    }
}

impl From<PixAiAccount> for Account {
    fn from(value: PixAiAccount) -> Self {
        Account::new(value.email, value.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountEntry, AccountStatus};

    #[test]
    fn test_app_state_wire_shape() {
        let state = AppState {
            running: true,
            accounts_num: 2,
            jobs_left: 3,
            concurrent: 1,
            time_left: Some(12),
            account_status: vec![2, 0],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["accounts_num"], 2);
        assert_eq!(json["time_left"], 12);
        assert_eq!(json["account_status"], serde_json::json!([2, 0]));

        let unknown = AppState {
            time_left: None,
            ..state
        };
        let json = serde_json::to_value(&unknown).unwrap();
        assert!(json.get("time_left").is_none());
    }

    #[test]
    fn test_redacted_account() {
        let mut entry = AccountEntry::new(Account::new("a@example.com", "hunter2"));
        entry.status = AccountStatus::Errored;

        let view = PixAiAccount::redacted(&AccountSummary::from(&entry));
        assert_eq!(view.email, "a@example.com");
        assert_eq!(view.password, "");
        assert_eq!(view.status, "errored");
    }

    #[test]
    fn test_inbound_account_without_status() {
        let view: PixAiAccount =
            serde_json::from_str(r#"{"email":"a@example.com","password":"pw"}"#).unwrap();
        let account: Account = view.into();
        assert_eq!(account, Account::new("a@example.com", "pw"));
    }
}

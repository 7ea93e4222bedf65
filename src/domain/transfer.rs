use serde::{Deserialize, Serialize};

use super::AccountId;

pub type TransferId = String;

/// A money movement between two accounts, recorded upstream.
/// Transfers are immutable and only ever read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Creation time as recorded by the upstream system (kept verbatim)
    pub timestamp: String,
    /// Amount in currency units
    pub amount: i64,
    pub status: String,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
}

/// Flat, human-facing record of a transfer joined with the customers owning
/// both of its accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    pub id: TransferId,
    pub timestamp: String,
    pub amount: i64,
    pub status: String,
    #[serde(rename = "source_customer")]
    pub source_customer_display_name: String,
    pub source_account_id: AccountId,
    #[serde(rename = "destination_customer")]
    pub dest_customer_display_name: String,
    #[serde(rename = "destination_account_id")]
    pub dest_account_id: AccountId,
}

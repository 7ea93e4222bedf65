use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CustomerId;

pub type AccountId = String;

/// A bank account owned by exactly one customer.
///
/// This is also the shape returned to callers after provisioning: the submitted
/// fields echoed back together with the generated `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub account_holder_name: String,
    pub account_number: String,
    pub routing_number: String,
}

/// Payload for provisioning a new account. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub customer_id: CustomerId,
    pub account_holder_name: String,
    pub account_number: String,
    pub routing_number: String,
}

impl NewAccount {
    pub fn new(
        customer_id: impl Into<CustomerId>,
        account_holder_name: impl Into<String>,
        account_number: impl Into<String>,
        routing_number: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            account_holder_name: account_holder_name.into(),
            account_number: account_number.into(),
            routing_number: routing_number.into(),
        }
    }

    /// Attach a freshly generated identifier.
    pub fn into_account(self) -> Account {
        self.into_account_with_id(Uuid::new_v4().to_string())
    }

    pub fn into_account_with_id(self, id: impl Into<AccountId>) -> Account {
        Account {
            id: id.into(),
            customer_id: self.customer_id,
            account_holder_name: self.account_holder_name,
            account_number: self.account_number,
            routing_number: self.routing_number,
        }
    }
}

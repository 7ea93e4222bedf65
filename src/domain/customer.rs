use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = String;

/// Identity anchor for accounts. Customers are never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
}

impl Customer {
    /// Create a customer with a freshly generated identifier.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), first_name, last_name)
    }

    /// Create a customer with an identifier assigned elsewhere.
    pub fn with_id(
        id: impl Into<CustomerId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Name shown on joined transfer records: first and last name separated by a space.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

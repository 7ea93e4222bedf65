// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;
use transfer_ledger::application::LedgerService;
use transfer_ledger::domain::{Account, Customer, Transfer};
use transfer_ledger::storage::Repository;

pub const VALID_ROUTING: &str = "021000021";
pub const INVALID_ROUTING: &str = "123456789";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Open the database created by [`test_service`] through a pool with a single
/// connection. Holding a writer from the returned repository starves the
/// service, so its store deadline expires on the next call.
pub async fn single_connection_service(
    temp_dir: &TempDir,
    store_timeout: Duration,
) -> Result<(LedgerService, Repository)> {
    let db_path = temp_dir.path().join("test.db");
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    let repo = Repository::new(pool);
    let service = LedgerService::new(repo.clone()).with_store_timeout(store_timeout);
    Ok((service, repo))
}

pub fn transfer(id: &str, amount: i64, source: &str, dest: &str) -> Transfer {
    Transfer {
        id: id.to_string(),
        timestamp: format!("2024-01-15T10:00:{:02}Z", amount % 60),
        amount,
        status: "completed".to_string(),
        source_account_id: source.to_string(),
        dest_account_id: dest.to_string(),
    }
}

/// Test fixture: two customers with one account each, and transfers between them.
pub struct StandardLedger;

impl StandardLedger {
    pub const ADA: &'static str = "cust-ada";
    pub const ALAN: &'static str = "cust-alan";
    pub const ADA_ACCOUNT: &'static str = "acct-ada";
    pub const ALAN_ACCOUNT: &'static str = "acct-alan";

    /// Create the customers and their accounts
    pub async fn create_parties(service: &LedgerService) -> Result<()> {
        service
            .import_customer(&Customer::with_id(Self::ADA, "Ada", "Lovelace"))
            .await?;
        service
            .import_customer(&Customer::with_id(Self::ALAN, "Alan", "Turing"))
            .await?;

        service
            .import_account(&Account {
                id: Self::ADA_ACCOUNT.into(),
                customer_id: Self::ADA.into(),
                account_holder_name: "A. Lovelace".into(),
                account_number: "10001".into(),
                routing_number: VALID_ROUTING.into(),
            })
            .await?;
        service
            .import_account(&Account {
                id: Self::ALAN_ACCOUNT.into(),
                customer_id: Self::ALAN.into(),
                account_holder_name: "A. Turing".into(),
                account_number: "20002".into(),
                routing_number: "011000015".into(),
            })
            .await?;
        Ok(())
    }

    /// Parties plus two resolvable transfers: t1 Ada -> Alan, t2 Alan -> Ada
    pub async fn create(service: &LedgerService) -> Result<()> {
        Self::create_parties(service).await?;
        service
            .import_transfer(&transfer("t1", 2500, Self::ADA_ACCOUNT, Self::ALAN_ACCOUNT))
            .await?;
        service
            .import_transfer(&transfer("t2", 700, Self::ALAN_ACCOUNT, Self::ADA_ACCOUNT))
            .await?;
        Ok(())
    }
}

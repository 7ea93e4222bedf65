use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DEFAULT_STORE_TIMEOUT;
use crate::domain::{Account, Customer, NewAccount, Transfer, TransferView, is_valid_routing_number};
use crate::storage::{Repository, RepositoryWriter};

use super::AppError;

/// Application service providing the ledger's query and provisioning operations.
/// This is the primary interface for any client (CLI, HTTP, tests).
///
/// Reads are bounded by `store_timeout`. Writes are bounded only while waiting
/// for a connection; once a write statement is issued it runs to completion,
/// limited by the store's busy timeout, so a reported timeout never hides a commit.
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
    store_timeout: Duration,
}

/// A customer together with the accounts it owns.
pub struct CustomerInfo {
    pub customer: Customer,
    pub accounts: Vec<Account>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the deadline applied to every store call.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Release the connection pool.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                warn!(operation, deadline = ?self.store_timeout, "store call timed out");
                Err(AppError::StoreTimeout {
                    operation,
                    deadline: self.store_timeout,
                })
            }
        }
    }

    /// Check out a connection for a write, bounded by `store_timeout`.
    async fn writer(&self, operation: &'static str) -> Result<RepositoryWriter, AppError> {
        self.bounded(operation, self.repo.writer()).await
    }

    // ========================
    // Transfer queries
    // ========================

    /// List every transfer whose source and destination resolve to customers.
    /// Result order is not part of the contract.
    pub async fn list_transfers(&self) -> Result<Vec<TransferView>, AppError> {
        let views = self
            .bounded("list_transfers", self.repo.list_transfers_joined())
            .await?;
        debug!(count = views.len(), "listed transfers");
        Ok(views)
    }

    /// Get one joined transfer. A transfer that exists but whose account or
    /// customer chain is broken is reported as not found, same as a missing one.
    pub async fn get_transfer(&self, id: &str) -> Result<TransferView, AppError> {
        self.bounded("get_transfer", self.repo.get_transfer_joined(id))
            .await?
            .ok_or_else(|| AppError::TransferNotFound(id.to_string()))
    }

    /// Number of stored transfer rows, including orphaned ones.
    pub async fn count_transfers(&self) -> Result<i64, AppError> {
        self.bounded("count_transfers", self.repo.count_transfers()).await
    }

    // ========================
    // Account provisioning
    // ========================

    /// Parse a JSON provisioning payload and create the account.
    pub async fn provision_account_json(&self, payload: &[u8]) -> Result<Account, AppError> {
        let request: NewAccount =
            serde_json::from_slice(payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
        self.create_account(request).await
    }

    /// Create an account for an existing customer.
    ///
    /// Checks run in order and stop at the first failure: routing checksum,
    /// then customer existence. The existence check and the insert are one
    /// store statement, so no account is written for a rejected request.
    pub async fn create_account(&self, request: NewAccount) -> Result<Account, AppError> {
        if !is_valid_routing_number(&request.routing_number) {
            info!(routing_number = %request.routing_number, "rejected account: invalid routing number");
            return Err(AppError::InvalidRoutingNumber);
        }

        let customer_id = request.customer_id.clone();
        let mut writer = self.writer("insert_account").await?;
        let inserted = writer.insert_account_for_customer(request).await?;
        let Some(account) = inserted else {
            info!(customer_id = %customer_id, "rejected account: unknown customer");
            return Err(AppError::UnknownCustomer(customer_id));
        };

        info!(account_id = %account.id, customer_id = %account.customer_id, "account created");
        Ok(account)
    }

    /// Store an account whose identifier was assigned upstream, applying the
    /// same checks as [`create_account`](Self::create_account). The customer
    /// check and the insert are one statement.
    pub async fn import_account(&self, account: &Account) -> Result<(), AppError> {
        if !is_valid_routing_number(&account.routing_number) {
            return Err(AppError::InvalidRoutingNumber);
        }
        let mut writer = self.writer("save_account").await?;
        if !writer.save_account_for_customer(account).await? {
            return Err(AppError::UnknownCustomer(account.customer_id.clone()));
        }
        Ok(())
    }

    /// Run the provisioning checks against an account without storing it.
    /// Used for dry runs; the answer can go stale before any later write.
    pub async fn check_account(&self, account: &Account) -> Result<(), AppError> {
        if !is_valid_routing_number(&account.routing_number) {
            return Err(AppError::InvalidRoutingNumber);
        }
        if !self.customer_exists(&account.customer_id).await? {
            return Err(AppError::UnknownCustomer(account.customer_id.clone()));
        }
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Account, AppError> {
        self.bounded("get_account", self.repo.get_account(id))
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    pub async fn account_exists(&self, id: &str) -> Result<bool, AppError> {
        self.bounded("account_exists", self.repo.account_exists(id)).await
    }

    pub async fn count_accounts(&self) -> Result<i64, AppError> {
        self.bounded("count_accounts", self.repo.count_accounts()).await
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a customer under a freshly generated identifier.
    pub async fn register_customer(
        &self,
        first_name: String,
        last_name: String,
    ) -> Result<Customer, AppError> {
        let customer = Customer::new(first_name, last_name);
        self.import_customer(&customer).await?;
        Ok(customer)
    }

    /// Store a customer whose identifier was assigned upstream.
    pub async fn import_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let mut writer = self.writer("save_customer").await?;
        writer.save_customer(customer).await?;
        debug!(customer_id = %customer.id, "customer stored");
        Ok(())
    }

    /// Existence probe; absence is `Ok(false)`.
    pub async fn customer_exists(&self, id: &str) -> Result<bool, AppError> {
        self.bounded("customer_exists", self.repo.customer_exists(id)).await
    }

    /// Get a customer together with the accounts it owns.
    pub async fn get_customer_info(&self, id: &str) -> Result<CustomerInfo, AppError> {
        let customer = self
            .bounded("get_customer", self.repo.get_customer(id))
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(id.to_string()))?;
        let accounts = self
            .bounded("list_accounts", self.repo.list_accounts_for_customer(id))
            .await?;
        Ok(CustomerInfo { customer, accounts })
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.bounded("list_customers", self.repo.list_customers()).await
    }

    // ========================
    // Upstream ledger loading
    // ========================

    /// Store a transfer recorded upstream. Account references are not checked;
    /// unresolvable transfers are simply invisible to the joined queries.
    pub async fn import_transfer(&self, transfer: &Transfer) -> Result<(), AppError> {
        let mut writer = self.writer("save_transfer").await?;
        writer.save_transfer(transfer).await?;
        Ok(())
    }
}

use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Account, Customer, NewAccount, Transfer, TransferView};

use super::MIGRATION_001_INITIAL;

/// Transfer joined twice through accounts to customers, once per side.
/// Inner joins: a transfer whose source or destination chain does not
/// resolve produces no row.
const JOINED_TRANSFER_SELECT: &str = r#"
    SELECT
        t.id AS id, t.timestamp AS timestamp, t.amount AS amount, t.status AS status,
        src_cust.first_name || ' ' || src_cust.last_name AS source_customer,
        src_acc.id AS source_account_id,
        dest_cust.first_name || ' ' || dest_cust.last_name AS dest_customer,
        dest_acc.id AS dest_account_id
    FROM transfers t
    JOIN accounts src_acc ON t.source_account_id = src_acc.id
    JOIN customers src_cust ON src_acc.customer_id = src_cust.id
    JOIN accounts dest_acc ON t.dest_account_id = dest_acc.id
    JOIN customers dest_cust ON dest_acc.customer_id = dest_cust.id
"#;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for querying customers, accounts and transfers.
///
/// Every method is a single statement against the pool, so each call is atomic
/// on its own and the repository can be shared between concurrent callers.
/// Writes go through a [`RepositoryWriter`] checked out with [`Repository::writer`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close the underlying pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check out a pooled connection for writing.
    pub async fn writer(&self) -> Result<RepositoryWriter> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire database connection")?;
        Ok(RepositoryWriter { conn })
    }

    // ========================
    // Customer operations
    // ========================

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, first_name, last_name FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        Ok(row.as_ref().map(Self::row_to_customer))
    }

    /// List all customers, ordered by last then first name.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name FROM customers ORDER BY last_name, first_name, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        Ok(rows.iter().map(Self::row_to_customer).collect())
    }

    /// Existence probe. A missing customer is `Ok(false)`, not an error.
    pub async fn customer_exists(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM customers WHERE id = ?) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check customer existence")?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Customer {
        Customer {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, account_holder_name, account_number, routing_number
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        Ok(row.as_ref().map(Self::row_to_account))
    }

    /// List the accounts of one customer.
    pub async fn list_accounts_for_customer(&self, customer_id: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, account_holder_name, account_number, routing_number
            FROM accounts
            WHERE customer_id = ?
            ORDER BY account_holder_name, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for customer")?;

        Ok(rows.iter().map(Self::row_to_account).collect())
    }

    /// Existence probe for accounts.
    pub async fn account_exists(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = ?) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account existence")?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    pub async fn count_accounts(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?;
        Ok(row.get("count"))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Account {
        Account {
            id: row.get("id"),
            customer_id: row.get("customer_id"),
            account_holder_name: row.get("account_holder_name"),
            account_number: row.get("account_number"),
            routing_number: row.get("routing_number"),
        }
    }

    // ========================
    // Transfer operations
    // ========================

    /// Count raw transfer rows, resolvable or not.
    pub async fn count_transfers(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transfers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transfers")?;
        Ok(row.get("count"))
    }

    /// List every transfer whose source and destination both resolve to a
    /// customer. Orphaned transfers are silently left out.
    pub async fn list_transfers_joined(&self) -> Result<Vec<TransferView>> {
        let query = format!("{JOINED_TRANSFER_SELECT} ORDER BY t.timestamp, t.id");

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transfers")?;

        Ok(rows.iter().map(Self::row_to_transfer_view).collect())
    }

    /// Get one joined transfer. `None` covers both a missing transfer and one
    /// whose account or customer chain does not resolve.
    pub async fn get_transfer_joined(&self, id: &str) -> Result<Option<TransferView>> {
        let query = format!("{JOINED_TRANSFER_SELECT} WHERE t.id = ?");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transfer")?;

        Ok(row.as_ref().map(Self::row_to_transfer_view))
    }

    fn row_to_transfer_view(row: &sqlx::sqlite::SqliteRow) -> TransferView {
        TransferView {
            id: row.get("id"),
            timestamp: row.get("timestamp"),
            amount: row.get("amount"),
            status: row.get("status"),
            source_customer_display_name: row.get("source_customer"),
            source_account_id: row.get("source_account_id"),
            dest_customer_display_name: row.get("dest_customer"),
            dest_account_id: row.get("dest_account_id"),
        }
    }
}

/// A checked-out connection on which writes are issued.
///
/// Each write is one statement. Callers bound the checkout, never the
/// statement: a dropped in-flight write would still commit on SQLite's worker.
pub struct RepositoryWriter {
    conn: PoolConnection<Sqlite>,
}

impl RepositoryWriter {
    /// Save a customer.
    pub async fn save_customer(&mut self, customer: &Customer) -> Result<()> {
        sqlx::query("INSERT INTO customers (id, first_name, last_name) VALUES (?, ?, ?)")
            .bind(&customer.id)
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .execute(&mut *self.conn)
            .await
            .context("Failed to save customer")?;
        Ok(())
    }

    /// Persist a new account under a freshly generated identifier.
    /// Business rules are the caller's concern; this only fails on store errors,
    /// including the foreign key on `customer_id`.
    pub async fn insert_account(&mut self, request: NewAccount) -> Result<Account> {
        let account = request.into_account();
        self.save_account(&account).await?;
        Ok(account)
    }

    /// Persist a new account under a freshly generated identifier, only if
    /// its customer exists. `None` when the customer is absent.
    pub async fn insert_account_for_customer(&mut self, request: NewAccount) -> Result<Option<Account>> {
        let account = request.into_account();
        if self.save_account_for_customer(&account).await? {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    /// Save an account only if its customer exists, as one statement.
    /// Returns `false`, with nothing written, when the customer is absent.
    pub async fn save_account_for_customer(&mut self, account: &Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, customer_id, account_holder_name, account_number, routing_number)
            SELECT ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM customers WHERE id = ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.customer_id)
        .bind(&account.account_holder_name)
        .bind(&account.account_number)
        .bind(&account.routing_number)
        .bind(&account.customer_id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to insert account")?;

        Ok(result.rows_affected() > 0)
    }

    /// Save an account as given. Only the `customer_id` foreign key guards it.
    pub async fn save_account(&mut self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, customer_id, account_holder_name, account_number, routing_number)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.customer_id)
        .bind(&account.account_holder_name)
        .bind(&account.account_number)
        .bind(&account.routing_number)
        .execute(&mut *self.conn)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Save a transfer recorded by an upstream system.
    /// Account references are stored as given and are not checked.
    pub async fn save_transfer(&mut self, transfer: &Transfer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transfers (id, timestamp, amount, status, source_account_id, dest_account_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.timestamp)
        .bind(transfer.amount)
        .bind(&transfer.status)
        .bind(&transfer.source_account_id)
        .bind(&transfer.dest_account_id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to save transfer")?;
        Ok(())
    }
}

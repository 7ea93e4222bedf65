use anyhow::Result;
use serde::de::DeserializeOwned;
use std::io::Read;

use crate::application::LedgerService;
use crate::domain::{Account, Customer, Transfer};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Parse and validate rows without storing them
    pub dry_run: bool,
}

/// Importer for loading records produced by upstream systems.
///
/// CSV layouts (header row required, columns matched by name):
/// - customers: `id,first_name,last_name`
/// - accounts: `id,customer_id,account_holder_name,account_number,routing_number`
/// - transfers: `id,timestamp,amount,status,source_account_id,dest_account_id`
///
/// A bad row is reported and skipped; it never aborts the rest of the file.
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import customers from CSV
    pub async fn import_customers_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let (rows, mut result) = read_rows::<Customer, R>(reader);

        for (line, customer) in rows {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self.service.import_customer(&customer).await {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    error: format!("Customer '{}' not stored: {}", customer.id, e),
                }),
            }
        }

        result.errors.sort_by_key(|e| e.line);
        Ok(result)
    }

    /// Import accounts from CSV. Rows go through the same routing number and
    /// customer checks as provisioning, even on a dry run.
    pub async fn import_accounts_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let (rows, mut result) = read_rows::<Account, R>(reader);

        for (line, account) in rows {
            let outcome = if options.dry_run {
                self.service.check_account(&account).await
            } else {
                self.service.import_account(&account).await
            };
            match outcome {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    error: format!("Account '{}' not stored: {}", account.id, e),
                }),
            }
        }

        result.errors.sort_by_key(|e| e.line);
        Ok(result)
    }

    /// Import transfers from CSV. Account references are stored as given.
    pub async fn import_transfers_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let (rows, mut result) = read_rows::<Transfer, R>(reader);

        for (line, transfer) in rows {
            if options.dry_run {
                result.imported += 1;
                continue;
            }
            match self.service.import_transfer(&transfer).await {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    error: format!("Transfer '{}' not stored: {}", transfer.id, e),
                }),
            }
        }

        result.errors.sort_by_key(|e| e.line);
        Ok(result)
    }
}

/// Deserialize every CSV record, pairing good rows with their file line and
/// collecting parse failures into the result.
fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> (Vec<(usize, T)>, ImportResult) {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    let mut result = ImportResult::default();

    for (index, record) in csv_reader.deserialize::<T>().enumerate() {
        let line = index + 2; // +2 for header and 0-indexing
        match record {
            Ok(row) => rows.push((line, row)),
            Err(e) => result.errors.push(ImportError {
                line,
                error: format!("CSV parse error: {}", e),
            }),
        }
    }

    (rows, result)
}

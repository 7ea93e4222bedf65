use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

use crate::application::LedgerService;
use crate::config::{DEFAULT_BIND, DEFAULT_DATABASE, ServerConfig, init_tracing};
use crate::domain::{NewAccount, TransferView, is_valid_routing_number};

/// Transfer ledger - query transfers and provision bank accounts
#[derive(Parser)]
#[command(name = "transfer-ledger")]
#[command(about = "Query a transfer ledger and provision routing-number-checked bank accounts")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Deadline for each database call, in milliseconds
    #[arg(long, env = "LEDGER_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LEDGER_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
    },

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Account provisioning commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// List transfers with both parties resolved
    Transfers,

    /// Show one transfer
    #[command(name = "show")]
    ShowTransfer {
        /// Transfer ID
        id: String,
    },

    /// Check a routing number against the ABA checksum
    Routing {
        /// 9-digit routing number
        number: String,
    },

    /// Import customers, accounts or transfers from CSV
    Import {
        /// What to import: customers, accounts, transfers
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate rows without storing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Export joined transfers
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: json, csv
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Add {
        first_name: String,
        last_name: String,
    },

    /// List all customers
    List,

    /// Show a customer and its accounts
    Show {
        /// Customer ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create an account for an existing customer
    Create {
        /// Owning customer ID
        #[arg(long)]
        customer: String,

        /// Account holder name
        #[arg(long)]
        holder: String,

        /// Account number
        #[arg(long)]
        number: String,

        /// 9-digit ABA routing number
        #[arg(long)]
        routing: String,
    },

    /// Show an account
    Show {
        /// Account ID
        id: String,
    },
}

impl Cli {
    fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    async fn connect(&self) -> Result<LedgerService> {
        let service = LedgerService::connect(&self.database)
            .await
            .with_context(|| format!("Failed to open database '{}'", self.database))?;
        Ok(service.with_store_timeout(self.store_timeout()))
    }

    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        match &self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let config = ServerConfig::new(self.database.clone(), *bind)
                    .with_store_timeout(self.store_timeout());
                crate::http::serve(config).await?;
            }

            Commands::Customer(cmd) => {
                let service = self.connect().await?;
                run_customer_command(&service, cmd).await?;
            }

            Commands::Account(cmd) => {
                let service = self.connect().await?;
                run_account_command(&service, cmd).await?;
            }

            Commands::Transfers => {
                let service = self.connect().await?;
                run_transfers_command(&service).await?;
            }

            Commands::ShowTransfer { id } => {
                let service = self.connect().await?;
                let view = service.get_transfer(id).await?;
                print_transfer(&view);
            }

            Commands::Routing { number } => {
                if is_valid_routing_number(number) {
                    println!("{}: valid", number);
                } else {
                    anyhow::bail!("{}: invalid routing number", number);
                }
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
            } => {
                let service = self.connect().await?;
                run_import_command(&service, import_type, input.as_deref(), *dry_run).await?;
            }

            Commands::Export { output, format } => {
                let service = self.connect().await?;
                run_export_command(&service, output.as_deref(), format).await?;
            }
        }

        Ok(())
    }
}

async fn run_customer_command(service: &LedgerService, cmd: &CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Add {
            first_name,
            last_name,
        } => {
            let customer = service
                .register_customer(first_name.clone(), last_name.clone())
                .await?;
            println!("Registered customer: {} ({})", customer.display_name(), customer.id);
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!("{:<38} NAME", "ID");
                println!("{}", "-".repeat(64));
                for customer in customers {
                    println!("{:<38} {}", customer.id, customer.display_name());
                }
            }
        }

        CustomerCommands::Show { id } => {
            let info = service.get_customer_info(id).await?;

            println!("Customer: {}", info.customer.display_name());
            println!("  ID:       {}", info.customer.id);
            println!("  Accounts: {}", info.accounts.len());
            for account in &info.accounts {
                println!(
                    "    - {} {} / {} ({})",
                    account.account_holder_name,
                    account.routing_number,
                    account.account_number,
                    account.id
                );
            }
        }
    }
    Ok(())
}

async fn run_account_command(service: &LedgerService, cmd: &AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            customer,
            holder,
            number,
            routing,
        } => {
            let account = service
                .create_account(NewAccount::new(
                    customer.as_str(),
                    holder.as_str(),
                    number.as_str(),
                    routing.as_str(),
                ))
                .await?;
            println!("Created account: {}", account.id);
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;

            println!("Account: {}", account.id);
            println!("  Customer:       {}", account.customer_id);
            println!("  Holder:         {}", account.account_holder_name);
            println!("  Account number: {}", account.account_number);
            println!("  Routing number: {}", account.routing_number);
        }
    }
    Ok(())
}

async fn run_transfers_command(service: &LedgerService) -> Result<()> {
    let transfers = service.list_transfers().await?;

    if transfers.is_empty() {
        println!("No transfers found.");
        return Ok(());
    }

    println!(
        "{:<25} {:>12} {:<10} {:<20} {:<20}",
        "TIMESTAMP", "AMOUNT", "STATUS", "FROM", "TO"
    );
    println!("{}", "-".repeat(91));

    for view in &transfers {
        println!(
            "{:<25} {:>12} {:<10} {:<20} {:<20}",
            truncate(&view.timestamp, 25),
            view.amount,
            truncate(&view.status, 10),
            truncate(&view.source_customer_display_name, 20),
            truncate(&view.dest_customer_display_name, 20)
        );
    }

    let stored = service.count_transfers().await?;
    let hidden = stored - transfers.len() as i64;
    if hidden > 0 {
        println!();
        println!("{} transfer(s) hidden: unresolved account or customer", hidden);
    }

    Ok(())
}

fn print_transfer(view: &TransferView) {
    println!("Transfer: {}", view.id);
    println!("  Timestamp: {}", view.timestamp);
    println!("  Amount:    {}", view.amount);
    println!("  Status:    {}", view.status);
    println!(
        "  From:      {} ({})",
        view.source_customer_display_name, view.source_account_id
    );
    println!(
        "  To:        {} ({})",
        view.dest_customer_display_name, view.dest_account_id
    );
}

async fn run_import_command(
    service: &LedgerService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions { dry_run };

    let result = match import_type {
        "customers" => importer.import_customers_csv(reader, &options).await?,
        "accounts" => importer.import_accounts_csv(reader, &options).await?,
        "transfers" => importer.import_transfers_csv(reader, &options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: customers, accounts, transfers",
                import_type
            );
        }
    };

    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!("  Line {}: {}", error.line, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more", result.errors.len() - 10);
        }
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    output: Option<&str>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        "json" => exporter.export_transfers_json(writer).await?,
        "csv" => exporter.export_transfers_csv(writer).await?,
        _ => anyhow::bail!("Invalid format '{}'. Valid formats: json, csv", format),
    };

    if output.is_some() {
        eprintln!("Exported {} transfers", count);
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

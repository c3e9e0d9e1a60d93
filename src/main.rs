use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use momo_checkout::application::checkout::Checkout;
use momo_checkout::application::poller::PollPolicy;
use momo_checkout::config::CheckoutConfig;
use momo_checkout::domain::access::{RequestContext, Role};
use momo_checkout::domain::payment::{Amount, ResponseCodes};
use momo_checkout::domain::phone::PhoneNumber;
use momo_checkout::domain::ports::{SharedGateway, SharedStore};
use momo_checkout::infrastructure::http::HttpGateway;
use momo_checkout::infrastructure::in_memory::{InMemoryTransactionStore, ScriptedGateway};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the payments API (e.g. https://tickets.example.rw)
    #[arg(long, env = "MOMO_GATEWAY_URL", global = true)]
    gateway_url: Option<String>,

    /// Bearer token attached to every gateway request
    #[arg(long, env = "MOMO_GATEWAY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Role the caller acts as: client, team or admin
    #[arg(long, env = "MOMO_ROLE", default_value = "client", global = true)]
    role: Role,

    /// Delay between status checks, in milliseconds
    #[arg(long, default_value_t = 5000, global = true)]
    poll_interval_ms: u64,

    /// Status checks before giving up
    #[arg(long, default_value_t = 60, global = true)]
    max_attempts: u32,

    /// Per-request HTTP timeout, in seconds
    #[arg(long, default_value_t = 10, global = true)]
    request_timeout_secs: u64,

    /// Response codes meaning success (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    success_codes: Vec<String>,

    /// Response codes meaning failure (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    failure_codes: Vec<String>,

    /// Response codes meaning still pending (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pending_codes: Vec<String>,

    /// Use a built-in scripted gateway instead of the network
    #[arg(long, value_enum, global = true)]
    simulate: Option<Simulation>,

    /// Path to a persistent transaction journal. If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check and format a phone number
    Validate { phone: String },
    /// Pay for one purchase and print the completion as JSON
    Pay {
        #[arg(long)]
        phone: String,
        /// Amount in RWF
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value = "Ticket purchase")]
        description: String,
    },
    /// Run every row of a `phone,amount,description` CSV and print outcomes as CSV
    Batch { input: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Simulation {
    Approve,
    Decline,
    Timeout,
}

impl Cli {
    fn config(&self) -> CheckoutConfig {
        let defaults = ResponseCodes::default();
        let or_default = |codes: &[String], fallback: Vec<String>| {
            if codes.is_empty() { fallback } else { codes.to_vec() }
        };

        CheckoutConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            policy: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.max_attempts,
            },
            codes: ResponseCodes {
                success: or_default(&self.success_codes, defaults.success),
                failure: or_default(&self.failure_codes, defaults.failure),
                pending: or_default(&self.pending_codes, defaults.pending),
            },
        }
    }

    fn gateway(&self, config: &CheckoutConfig) -> Result<SharedGateway> {
        if let Some(simulation) = self.simulate {
            let gateway = match simulation {
                Simulation::Approve => ScriptedGateway::approving_on(2),
                Simulation::Decline => ScriptedGateway::declining_on(2, "Transaction declined by subscriber"),
                Simulation::Timeout => ScriptedGateway::always_pending(),
            };
            return Ok(Arc::new(gateway));
        }

        let Some(url) = self.gateway_url.clone() else {
            miette::bail!("--gateway-url (or MOMO_GATEWAY_URL) is required unless --simulate is given");
        };
        let gateway = HttpGateway::new(url, config.request_timeout).into_diagnostic()?;
        Ok(Arc::new(gateway))
    }

    fn journal(&self) -> Result<SharedStore> {
        if let Some(db_path) = &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            {
                use momo_checkout::infrastructure::rocksdb::RocksDBStore;
                let store = RocksDBStore::open(db_path).into_diagnostic()?;
                info!(path = %db_path.display(), "journaling transactions to RocksDB");
                return Ok(Arc::new(store));
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            warn!(
                path = %db_path.display(),
                "WARNING: Persistent journal requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory journal."
            );
        }
        Ok(Arc::new(InMemoryTransactionStore::new()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Validate { phone } => {
            let number = PhoneNumber::parse(phone).into_diagnostic()?;
            println!("{} ({})", number.formatted(), number.carrier());
        }
        Command::Pay {
            phone,
            amount,
            description,
        } => {
            let config = cli.config();
            let checkout = Checkout::new(cli.gateway(&config)?, &config)
                .into_diagnostic()?
                .with_journal(cli.journal()?);
            let ctx = RequestContext::new(cli.role, cli.token.clone());
            let amount = Amount::new(*amount).into_diagnostic()?;

            let completion = checkout
                .pay(&ctx, phone, amount, description)
                .await
                .into_diagnostic()?;
            info!(transaction = %completion.transaction_id, "payment completed");
            println!("{}", serde_json::to_string_pretty(&completion).into_diagnostic()?);
        }
        Command::Batch { input } => {
            let config = cli.config();
            let checkout = Checkout::new(cli.gateway(&config)?, &config)
                .into_diagnostic()?
                .with_journal(cli.journal()?);
            let ctx = RequestContext::new(cli.role, cli.token.clone());

            let file = File::open(input).into_diagnostic()?;
            let stdout = io::stdout();
            let summary = checkout
                .run_batch(&ctx, file, stdout.lock())
                .await
                .into_diagnostic()?;
            if summary.failed > 0 {
                warn!(failed = summary.failed, "some payments did not complete");
            }
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand, ValueEnum};
use kiosk_ledger::application::kiosk::Kiosk;
use kiosk_ledger::application::lifecycle::Fulfillment;
use kiosk_ledger::config::{DEFAULT_DAILY_RETURN_CAP, KioskConfig};
use kiosk_ledger::domain::catalog::{DepositPolicy, RewardBand};
use kiosk_ledger::domain::money::Cents;
use kiosk_ledger::domain::order::{OrderRequestItem, PaymentOutcome};
use kiosk_ledger::domain::ports::StoreHandle;
use kiosk_ledger::domain::recycle::ReturnDecision;
use kiosk_ledger::infrastructure::dispenser::RandomDispenser;
use kiosk_ledger::infrastructure::in_memory::InMemoryKioskStore;
#[cfg(feature = "storage-rocksdb")]
use kiosk_ledger::infrastructure::rocksdb::RocksDBStore;
use kiosk_ledger::interfaces::csv::seed_reader::{read_customers, read_items};
use kiosk_ledger::telemetry::init_tracing;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "KIOSK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Catalog items CSV, upserted before the command runs
    #[arg(long, env = "KIOSK_ITEMS")]
    items: Option<PathBuf>,

    /// Members CSV, upserted before the command runs
    #[arg(long, env = "KIOSK_CUSTOMERS")]
    customers: Option<PathBuf>,

    /// How paid orders are fulfilled
    #[arg(long, value_enum, env = "KIOSK_FULFILLMENT", default_value_t = FulfillmentArg::Direct)]
    fulfillment: FulfillmentArg,

    /// How zero catalog deposits are treated
    #[arg(
        long,
        value_enum,
        env = "KIOSK_DEPOSIT_POLICY",
        default_value_t = DepositPolicyArg::Dynamic
    )]
    deposit_policy: DepositPolicyArg,

    /// Lower bound of the recycling reward band, in minor units
    #[arg(long, env = "KIOSK_MIN_REWARD", default_value_t = 500)]
    min_reward: i64,

    /// Upper bound of the recycling reward band, in minor units
    #[arg(long, env = "KIOSK_MAX_REWARD", default_value_t = 1500)]
    max_reward: i64,

    /// Accepted returns per member and item per day before warning
    #[arg(long, env = "KIOSK_DAILY_RETURN_CAP", default_value_t = DEFAULT_DAILY_RETURN_CAP)]
    daily_return_cap: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum FulfillmentArg {
    Direct,
    Randomized,
}

#[derive(Clone, Copy, ValueEnum)]
enum DepositPolicyArg {
    Dynamic,
    Catalog,
}

#[derive(Subcommand)]
enum Command {
    /// List active items with their rewards
    Catalog,
    /// Resolve a member number
    Member { member_no: String },
    /// Create an order from ITEM or ITEM=QTY pairs
    Order {
        #[arg(long)]
        member: Option<String>,
        #[arg(required = true, value_parser = parse_order_line)]
        items: Vec<OrderRequestItem>,
    },
    /// Apply a payment outcome (success, fail, timeout)
    Pay {
        order_id: Uuid,
        outcome: PaymentOutcome,
    },
    /// Show an order with its lines and member
    Show { order_id: Uuid },
    /// Dispense a paid order (randomized fulfillment)
    Dispense { order_id: Uuid },
    /// Show the dispense attempts of an order
    DispenseLog { order_id: Uuid },
    /// Check a return code without booking it
    RecycleCheck {
        #[arg(long)]
        member: Option<String>,
        code: String,
    },
    /// Book a returned container
    Recycle {
        #[arg(long)]
        member: Option<String>,
        /// Record the container as rejected instead of accepting it
        #[arg(long)]
        reject: bool,
        code: String,
    },
    /// Revenue, deposit and recycling figures
    Metrics,
}

fn parse_order_line(raw: &str) -> std::result::Result<OrderRequestItem, String> {
    match raw.split_once('=') {
        Some((item_id, quantity)) => {
            let quantity = quantity
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
            Ok(OrderRequestItem::new(item_id.trim(), quantity))
        }
        None => Ok(OrderRequestItem::new(raw.trim(), 1)),
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<StoreHandle> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBStore::open(path)?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "persistent storage requested via --db-path, but the 'storage-rocksdb' feature \
                 is not enabled; falling back to in-memory storage"
            );
            Ok(Arc::new(InMemoryKioskStore::new()))
        }
        None => Ok(Arc::new(InMemoryKioskStore::new())),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = KioskConfig {
        reward_band: RewardBand::new(Cents(cli.min_reward), Cents(cli.max_reward))?,
        deposit_policy: match cli.deposit_policy {
            DepositPolicyArg::Dynamic => DepositPolicy::DynamicFallback,
            DepositPolicyArg::Catalog => DepositPolicy::Catalog,
        },
        daily_return_cap: cli.daily_return_cap,
        ..KioskConfig::default()
    };
    let fulfillment = match cli.fulfillment {
        FulfillmentArg::Direct => Fulfillment::DirectCommit,
        FulfillmentArg::Randomized => {
            Fulfillment::RandomizedDispense(Arc::new(RandomDispenser::default()))
        }
    };

    let store = open_store(cli.db_path)?;
    let kiosk = Kiosk::new(store, config, fulfillment);

    let items = cli.items.as_deref().map(read_items).transpose()?;
    let customers = cli.customers.as_deref().map(read_customers).transpose()?;
    if items.is_some() || customers.is_some() {
        kiosk
            .seed(items.unwrap_or_default(), customers.unwrap_or_default())
            .await?;
    }

    match cli.command {
        Command::Catalog => print_json(&kiosk.list_catalog().await?),
        Command::Member { member_no } => print_json(&kiosk.resolve_customer(&member_no).await?),
        Command::Order { member, items } => {
            print_json(&kiosk.create_order(member.as_deref(), &items).await?)
        }
        Command::Pay { order_id, outcome } => {
            print_json(&kiosk.confirm_payment(order_id, outcome).await?)
        }
        Command::Show { order_id } => print_json(&kiosk.get_order(order_id).await?),
        Command::Dispense { order_id } => print_json(&kiosk.dispense(order_id).await?),
        Command::DispenseLog { order_id } => print_json(&kiosk.dispense_log(order_id).await?),
        Command::RecycleCheck { member, code } => {
            print_json(&kiosk.recycle_precheck(member.as_deref(), &code).await?)
        }
        Command::Recycle {
            member,
            reject,
            code,
        } => {
            let decision = if reject {
                ReturnDecision::Reject
            } else {
                ReturnDecision::Accept
            };
            print_json(
                &kiosk
                    .recycle_confirm(member.as_deref(), &code, decision)
                    .await?,
            )
        }
        Command::Metrics => print_json(&kiosk.metrics_summary().await?),
    }
}

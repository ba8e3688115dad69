use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::OrderSide;
use executor::{AllowAllGate, OrderService};
use ledger::{InMemoryLedger, LedgerStore, RetryPolicy};
use market_data::{InMemoryPriceFeed, PriceSource};
use matcher::{InMemorySweepLock, LimitOrderMatcher, MatcherScheduler, SweepLock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// The main entry point for the Papertrade engine.
#[tokio::main]
async fn main() {
    // Load environment variables from a .env file when one is present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Demo(args) => {
            if let Err(e) = handle_demo(args).await {
                eprintln!("Error during demo: {}", e);
            }
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A simulated order-execution and portfolio ledger engine.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted trading session against an in-memory ledger.
    Demo(DemoArgs),
}

#[derive(Parser)]
struct DemoArgs {
    /// The symbol to trade (e.g., "BTCUSDT").
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    /// The starting reference price for the symbol.
    #[arg(long, default_value = "50000")]
    price: Decimal,

    /// The quantity for each demo order.
    #[arg(long, default_value = "0.5")]
    quantity: Decimal,
}

// ==============================================================================
// Demo Command Logic
// ==============================================================================

/// Wires the in-memory engine and walks one user through both execution
/// paths: an immediate market fill, then a resting limit order matched by
/// the sweep after the price crosses it.
async fn handle_demo(args: DemoArgs) -> anyhow::Result<()> {
    let config = configuration::load_config()?;

    let ledger = Arc::new(InMemoryLedger::new());
    let prices = Arc::new(InMemoryPriceFeed::new());
    let retry = RetryPolicy::new(
        config.retry.max_attempts,
        Duration::from_millis(config.retry.base_backoff_ms),
    );
    let service = OrderService::new(
        Arc::clone(&ledger) as Arc<dyn LedgerStore>,
        Arc::clone(&prices) as Arc<dyn PriceSource>,
        Arc::new(AllowAllGate),
        config.execution.clone(),
        retry,
    );
    let sweeper = Arc::new(LimitOrderMatcher::new(
        Arc::clone(&ledger) as Arc<dyn LedgerStore>,
        Arc::clone(&prices) as Arc<dyn PriceSource>,
        service.fill_engine(),
    ));
    let scheduler = MatcherScheduler::new(
        sweeper,
        Arc::new(InMemorySweepLock::new()) as Arc<dyn SweepLock>,
        config.matcher.clone(),
    );

    let user_id = Uuid::new_v4();
    prices.set_price(&args.symbol, args.price);

    println!(
        "Reference price for {} set to {}. Starting balance: {}.",
        args.symbol, args.price, config.execution.starting_balance
    );

    // --- 1. Synchronous path: a market buy fills immediately ---
    let market = service
        .place_market_order(user_id, &args.symbol, OrderSide::Buy, args.quantity)
        .await?;
    println!(
        "\nMarket buy filled: {} {} @ {} (commission {})",
        market.filled_quantity,
        market.symbol,
        market.average_price.unwrap_or_default(),
        market.commission
    );

    // --- 2. Asynchronous path: a limit buy rests 2% below the market ---
    let limit_price = (args.price * dec!(0.98)).round_dp(config.execution.price_scale);
    let resting = service
        .place_limit_order(user_id, &args.symbol, OrderSide::Buy, args.quantity, limit_price)
        .await?;
    println!(
        "Limit buy admitted at {} while the market is at {}.",
        limit_price, args.price
    );

    // A sweep above the limit leaves the order pending.
    scheduler.run_once().await;

    // The market drops through the limit; the next sweep fills at the
    // limit price, not at the crossing reference.
    let crossed = (limit_price * dec!(0.999)).round_dp(config.execution.price_scale);
    prices.set_price(&args.symbol, crossed);
    println!("Reference price dropped to {}; sweeping again.", crossed);
    scheduler.run_once().await;

    let matched = service.get_order(user_id, resting.id).await?;
    println!(
        "Limit order is now {:?} at average price {}.",
        matched.status,
        matched.average_price.unwrap_or_default()
    );

    // --- 3. Read side: orders and the marked-to-market account ---
    let mut orders_table = Table::new();
    orders_table.set_header(vec![
        "Order", "Type", "Side", "Status", "Qty", "Filled", "Avg Price", "Commission",
    ]);
    for order in service.list_orders(user_id).await? {
        orders_table.add_row(vec![
            order.id.to_string()[..8].to_string(),
            format!("{:?}", order.order_type),
            format!("{:?}", order.side),
            format!("{:?}", order.status),
            order.quantity.to_string(),
            order.filled_quantity.to_string(),
            order
                .average_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            order.commission.to_string(),
        ]);
    }
    println!("\nOrders:\n{orders_table}");

    let snapshot = service.portfolio_snapshot(user_id).await?;
    let mut account_table = Table::new();
    account_table.set_header(vec![
        "Balance", "Invested", "Market Value", "Total Value", "Unrealized PnL",
    ]);
    account_table.add_row(vec![
        snapshot.virtual_balance.to_string(),
        snapshot.total_invested.to_string(),
        snapshot.market_value.to_string(),
        snapshot.total_value.to_string(),
        snapshot.unrealized_pnl.to_string(),
    ]);
    println!("Account:\n{account_table}");

    Ok(())
}

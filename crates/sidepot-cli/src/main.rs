//! # sidepot CLI Entry Point
//!
//! Assembles subcommands and wires the in-memory stack for the `serve`
//! command: ledger, escrow manager, negotiation service, dispute monitor,
//! and the Axum API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;

use sidepot_api::{app, AppState};
use sidepot_core::{fees, PartyId, TokenSymbol};
use sidepot_dispute::{DisputeMonitor, InMemoryDisputeStore, MonitorConfig};
use sidepot_escrow::{EscrowManager, InMemoryLedger};
use sidepot_negotiation::{InMemoryChallengeStore, NegotiationService, TracingNotifier};

/// sidepot — peer challenge wager negotiation and escrow settlement.
#[derive(Parser, Debug)]
#[command(name = "sidepot", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the API server and the dispute resolution monitor.
    Serve(ServeArgs),
    /// Print the pot/fee/payout breakdown for a wager.
    Fees(FeesArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Dispute sweep interval in seconds.
    #[arg(long, default_value_t = 300)]
    poll_interval_secs: u64,

    /// Token symbols the in-memory ledger honors.
    #[arg(long, value_delimiter = ',', default_value = "USDC")]
    tokens: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct FeesArgs {
    /// Wager amount per party.
    wager: Decimal,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Fees(args) => fees_report(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let tokens = args
        .tokens
        .iter()
        .map(|t| TokenSymbol::new(t.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let ledger = Arc::new(InMemoryLedger::new(PartyId::new(), tokens));
    let escrow = Arc::new(EscrowManager::new(ledger));
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let disputes = Arc::new(InMemoryDisputeStore::new());
    let notifier = Arc::new(TracingNotifier);

    let negotiation = Arc::new(NegotiationService::new(
        challenges.clone(),
        escrow.clone(),
        notifier.clone(),
    ));
    let monitor = Arc::new(DisputeMonitor::new(
        disputes,
        challenges,
        escrow,
        notifier,
        MonitorConfig {
            poll_interval: Duration::from_secs(args.poll_interval_secs),
        },
    ));

    tokio::spawn(Arc::clone(&monitor).run());

    let state = AppState::new(negotiation, monitor);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "sidepot API listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn fees_report(args: FeesArgs) -> anyhow::Result<()> {
    if args.wager < Decimal::ZERO {
        anyhow::bail!("wager must be non-negative, got {}", args.wager);
    }
    let breakdown = fees::breakdown(args.wager);
    let refund = fees::tie_refund(&breakdown);
    println!("wager (per party): {}", args.wager.normalize());
    println!("total pot:         {}", breakdown.total_pot.normalize());
    println!("platform fee:      {}", breakdown.fee.normalize());
    println!("winner payout:     {}", breakdown.winner_payout.normalize());
    println!("tie refund each:   {}", refund.normalize());
    Ok(())
}

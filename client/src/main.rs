use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use ethers::types::{Address, U256};
use swapkit_client::listener::{
    counterpart_event_filter, payment_received_filter, swap_event_filter, LogListener,
};
use swapkit_client::{
    load_config, CloseSwapParams, EthereumClient, Operation, SdkBuilder, Stage, SwapContract,
    TxEvent,
};
use swapkit_core::{AssetError, IntoAmount};
use tracing_subscriber::EnvFilter;

const DEFAULT_SDK_CONFIG_PATH: &str = "./swapkit_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let client = SdkBuilder::from_config(&config).connect().await?;

    match cli.command {
        Commands::Payment => {
            let payment = client.payment().await?;
            println!("{}", serde_json::to_string_pretty(&payment)?);
        }
        Commands::References => {
            let references = client.reference_addresses().await?;
            println!("{}", serde_json::to_string_pretty(&references)?);
        }
        Commands::Details { maker, id } => {
            let intent = client.swap_details(maker, id).await?;
            println!("{}", serde_json::to_string_pretty(&intent)?);
        }
        Commands::Assets { id } => {
            let assets = client.swap_assets(id).await?;
            println!("{}", serde_json::to_string_pretty(&assets)?);
        }
        Commands::Cancel { id } => {
            trace_lifecycle(&client, Operation::CancelSwap);
            let receipt = client.cancel_swap(id, None).await?;
            tracing::info!(tx_hash = ?receipt.transaction_hash, "Swap cancelled");
        }
        Commands::EditTaker { id, taker } => {
            trace_lifecycle(&client, Operation::EditTaker);
            let receipt = client.edit_taker(id, taker, None).await?;
            tracing::info!(tx_hash = ?receipt.transaction_hash, "Swap taker updated");
        }
        Commands::Close {
            maker,
            id,
            referral,
        } => {
            trace_lifecycle(&client, Operation::CloseSwap);
            let mut params = CloseSwapParams::new(maker, id);
            if let Some(referral) = referral {
                params.referral = referral;
            }
            let receipt = client.close_swap(&params, None).await?;
            tracing::info!(tx_hash = ?receipt.transaction_hash, "Swap closed");
        }
        Commands::Watch { ws_url, event } => {
            let contract = client.contract().address();
            let filter = match event {
                WatchedEvent::Swap => swap_event_filter(contract, None, None, None),
                WatchedEvent::Counterpart => counterpart_event_filter(contract, None, None),
                WatchedEvent::Payment => payment_received_filter(contract, None),
            };
            let listener = LogListener::connect(&ws_url, contract).await?;
            listener
                .watch(filter, |log| tracing::info!(?log, "Contract event"))
                .await?;
        }
    }

    Ok(())
}

// Swap ids are decimal unless `0x`-prefixed.
fn parse_uint(s: &str) -> Result<U256, AssetError> {
    s.into_amount()
}

/// Logs every lifecycle event of `op`.
fn trace_lifecycle(client: &EthereumClient, op: Operation) {
    for stage in [Stage::Created, Stage::Mined, Stage::Error] {
        let channel = op.channel(stage);
        client.subscribe(channel, move |event| match event {
            TxEvent::Created { tx_hash } => tracing::info!(%channel, ?tx_hash),
            TxEvent::Mined { receipt } => {
                tracing::info!(%channel, block = ?receipt.block_number)
            }
            TxEvent::Failed { phase, error } => tracing::error!(%channel, %phase, %error),
        });
    }
}

#[derive(Parser)]
#[command(name = "swapkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long,
        global = true,
        value_parser,
        default_value = DEFAULT_SDK_CONFIG_PATH,
        value_hint = ValueHint::FilePath)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the contract's fee configuration
    Payment,
    /// Show the contract's reference addresses
    References,
    /// Show a stored swap intent
    Details {
        #[arg(short, long)]
        maker: Address,
        #[arg(short, long, value_parser = parse_uint)]
        id: U256,
    },
    /// Show both asset lists of a swap
    Assets {
        #[arg(short, long, value_parser = parse_uint)]
        id: U256,
    },
    /// Cancel a swap you created
    Cancel {
        #[arg(short, long, value_parser = parse_uint)]
        id: U256,
    },
    /// Replace the designated taker of a swap you created
    EditTaker {
        #[arg(short, long, value_parser = parse_uint)]
        id: U256,
        #[arg(short, long)]
        taker: Address,
    },
    /// Close a swap as its taker
    Close {
        #[arg(short, long)]
        maker: Address,
        #[arg(short, long, value_parser = parse_uint)]
        id: U256,
        #[arg(short, long)]
        referral: Option<Address>,
    },
    /// Stream contract events over a websocket endpoint
    Watch {
        #[arg(short, long, value_hint = ValueHint::Url)]
        ws_url: String,
        #[arg(short, long, value_enum, default_value_t = WatchedEvent::Swap)]
        event: WatchedEvent,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum WatchedEvent {
    Swap,
    Counterpart,
    Payment,
}

//! swapwatch - HTLC swap state CLI
//!
//! Commands:
//!   swapwatch order-id <secret_hash> <initiator>
//!   swapwatch utxo-status <initiator_pubkey> <redeemer_pubkey> <amount_sats> <secret_hash> <wait_blocks>
//!   swapwatch order-status <initiator> <redeemer> <secret_hash> <amount> <expiry>
//!   swapwatch secret <initiator> <secret_hash> [--window <blocks>]
//!   swapwatch backfill <from> <to> [--window <blocks>]
//!   swapwatch watch [--from <block>]

use primitive_types::U256;
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use swapwatch::common::{self, ConfigError};
use swapwatch::evm::{abi, derive_order_id, BlockWindows};
use swapwatch::{
    query_events_in_range, AccountSwap, Asset, ContractReader, EsploraClient, EventWatcher,
    EvmRpcClient, Result, SwapError, TrackerConfig, UtxoSwap,
};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = common::init_from_config(&config) {
        eprintln!("Warning: {}", e);
    }

    let result = match args[1].as_str() {
        "order-id" => run_order_id(&args[2..]),
        "utxo-status" => run_utxo_status(&config, &args[2..]).await,
        "order-status" => run_order_status(&config, &args[2..]).await,
        "secret" => run_secret(&config, &args[2..]).await,
        "backfill" => run_backfill(&config, &args[2..]).await,
        "watch" => run_watch(&config, &args[2..]).await,
        "config" => {
            config.print_summary();
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("swapwatch - HTLC swap state tracker");
    println!();
    println!("Usage:");
    println!("  swapwatch order-id <secret_hash> <initiator>");
    println!("  swapwatch utxo-status <initiator_pubkey> <redeemer_pubkey> <amount_sats> <secret_hash> <wait_blocks>");
    println!("  swapwatch order-status <initiator> <redeemer> <secret_hash> <amount> <expiry>");
    println!("  swapwatch secret <initiator> <secret_hash> [--window <blocks>]");
    println!("  swapwatch backfill <from> <to> [--window <blocks>]");
    println!("  swapwatch watch [--from <block>]");
    println!("  swapwatch config");
    println!();
    println!("Environment Variables:");
    println!("  SWAP_NETWORK            mainnet | testnet | signet | regtest");
    println!("  SWAP_ESPLORA_URL        Esplora API endpoint");
    println!("  SWAP_EVM_RPC            EVM JSON-RPC endpoint");
    println!("  SWAP_HTLC_CONTRACT      Swapper contract address");
    println!("  SWAP_ORDER_LAYOUT       standard | extended");
    println!("  SWAP_SECRET_WINDOW      Blocks per log query (default: 500)");
    println!("  SWAP_POLL_INTERVAL_MS   Subscription poll interval (default: 4000)");
    println!("  SWAP_LOG_LEVEL          trace | debug | info | warn | error");
    println!("  SWAP_LOG_JSON           Set to 1 for JSON logs");
}

// ============================================================================
// Argument helpers
// ============================================================================

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| SwapError::MissingArgument(name.to_string()))
}

fn parse_u64(value: &str, name: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), "must be a number".to_string()).into())
}

/// Value of `--flag <value>` anywhere in `args`
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn evm_client(config: &TrackerConfig) -> EvmRpcClient {
    EvmRpcClient::new(&config.evm_rpc, config.order_layout)
        .with_poll_interval(config.poll_interval)
        .with_window(config.secret_window)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn print_settled(state: &swapwatch::SwapState) {
    println!("Settled: {}", if state.is_terminal() { "yes" } else { "no" });
}

// ============================================================================
// Commands
// ============================================================================

fn run_order_id(args: &[String]) -> Result<()> {
    let secret_hash = abi::parse_h256(arg(args, 0, "secret_hash")?)?;
    let initiator = abi::parse_h160(arg(args, 1, "initiator")?)?;

    println!("{:#x}", derive_order_id(&secret_hash, &initiator));
    Ok(())
}

async fn run_utxo_status(config: &TrackerConfig, args: &[String]) -> Result<()> {
    let swap = UtxoSwap::new(
        config.network.bitcoin_network(),
        arg(args, 0, "initiator_pubkey")?,
        arg(args, 1, "redeemer_pubkey")?,
        parse_u64(arg(args, 2, "amount_sats")?, "amount_sats")?,
        abi::parse_h256(arg(args, 3, "secret_hash")?)?.to_fixed_bytes(),
        // Out-of-range values are rejected by the timelock check
        parse_u64(arg(args, 4, "wait_blocks")?, "wait_blocks")?.min(u32::MAX as u64) as u32,
    )?;
    let indexer = EsploraClient::new(&config.esplora_url);

    println!("=== UTXO Swap ===");
    println!("Funding Address: {}", swap.funding_address());
    println!("Initiator: {}", swap.initiator());
    println!("Redeemer: {}", swap.redeemer());
    println!("Amount: {}", swapwatch::units::format_sats(swap.amount()));
    println!();

    let state = swap.state(&indexer).await?;
    common::log_swap_state(&swap.funding_address().to_string(), &state);
    print_json(&state);
    print_settled(&state);

    if !matches!(state, swapwatch::SwapState::Unfunded) {
        let funders = swap.query_funders(&indexer).await?;
        if !funders.is_empty() {
            println!("Funders:");
            for funder in funders {
                println!("  {}", funder);
            }
        }
    }

    Ok(())
}

async fn run_order_status(config: &TrackerConfig, args: &[String]) -> Result<()> {
    let swap = AccountSwap::new(
        abi::parse_h160(arg(args, 0, "initiator")?)?,
        abi::parse_h160(arg(args, 1, "redeemer")?)?,
        config.require_contract()?,
        abi::parse_h256(arg(args, 2, "secret_hash")?)?,
        U256::from_dec_str(arg(args, 3, "amount")?)
            .map_err(|_| ConfigError::InvalidValue("amount".to_string(), "must be a number".to_string()))?,
        parse_u64(arg(args, 4, "expiry")?, "expiry")?,
    );
    let reader = evm_client(config);

    println!("Order ID: {:#x}", swap.order_id());

    let state = swap.state(&reader, Some(config.secret_window)).await?;
    common::log_swap_state(&format!("{:#x}", swap.order_id()), &state);
    print_json(&state);
    print_settled(&state);
    Ok(())
}

async fn run_secret(config: &TrackerConfig, args: &[String]) -> Result<()> {
    let initiator = abi::parse_h160(arg(args, 0, "initiator")?)?;
    let secret_hash = abi::parse_h256(arg(args, 1, "secret_hash")?)?;
    let window = match flag(args, "--window") {
        Some(w) => parse_u64(w, "--window")?,
        None => config.secret_window,
    };

    // The scan is keyed by order id and secret hash only
    let swap = AccountSwap::new(
        initiator,
        Default::default(),
        config.require_contract()?,
        secret_hash,
        U256::zero(),
        0,
    );

    let secret = swap.query_secret(&evm_client(config), Some(window)).await?;
    println!("{}", hex::encode(secret));
    Ok(())
}

async fn run_backfill(config: &TrackerConfig, args: &[String]) -> Result<()> {
    let from = parse_u64(arg(args, 0, "from")?, "from")?;
    let to = parse_u64(arg(args, 1, "to")?, "to")?;
    if from > to {
        return Err(SwapError::InvalidRange { from, to });
    }
    let window = match flag(args, "--window") {
        Some(w) => parse_u64(w, "--window")?,
        None => config.secret_window,
    };

    let asset = Asset::Native {
        swapper: config.require_contract()?,
    };
    let reader = evm_client(config);

    let mut total = 0;
    for (start, end) in BlockWindows::new(from, to, window) {
        for event in query_events_in_range(&reader, &asset, start, end).await? {
            common::log_htlc_event(&event, None);
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Failed to serialize event: {}", e),
            }
            total += 1;
        }
    }

    eprintln!("{} events in blocks {}..={}", total, from, to);
    Ok(())
}

async fn run_watch(config: &TrackerConfig, args: &[String]) -> Result<()> {
    let asset = Asset::Native {
        swapper: config.require_contract()?,
    };
    let client = evm_client(config);

    let start_block = match flag(args, "--from") {
        Some(b) => parse_u64(b, "--from")?,
        None => client.block_number().await?,
    };

    let cancel = CancellationToken::new();
    let watcher = EventWatcher::new(Arc::new(client));
    let mut stream = watcher.watch(cancel.clone(), start_block, &asset)?;

    println!("Watching {} from block {}", asset, start_block);
    println!("Press Ctrl+C to stop");

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    while let Some(event) = stream.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to serialize event: {}", e),
        }
    }

    if !cancel.is_cancelled() {
        eprintln!("Watch session ended (subscription closed)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_argument_names_the_argument() {
        let args = vec!["0xabc".to_string()];

        assert_eq!(arg(&args, 0, "secret_hash").unwrap(), "0xabc");
        let err = arg(&args, 1, "initiator").unwrap_err();
        assert!(matches!(&err, SwapError::MissingArgument(name) if name == "initiator"));
        assert_eq!(err.error_code(), "MISSING_ARGUMENT");
    }

    #[test]
    fn test_flag_lookup() {
        let args: Vec<String> = ["1", "--window", "50"].iter().map(|s| s.to_string()).collect();

        assert_eq!(flag(&args, "--window"), Some("50"));
        assert_eq!(flag(&args, "--from"), None);
        assert!(parse_u64("x", "--window").is_err());
    }
}

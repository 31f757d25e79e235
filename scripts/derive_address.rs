use anyhow::Result;
use scheduled_tx_dispatcher::config::DEFAULT_CONFIG_PATH;
use scheduled_tx_dispatcher::{ChainConfig, LocalTxSigner, TxSigner};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [CONFIG_PATH]", args[0]);
        std::process::exit(1);
    }

    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
    let config = ChainConfig::load(config_path)?;
    println!("🔐 Deriving sender address from ${}", config.signer.private_key_env);

    let private_key = config.read_private_key()?;
    let signer = LocalTxSigner::from_private_key(
        &private_key,
        config.chain.chain_id,
        config.gas_price_wei()?,
    )?;

    println!("✅ Sender address: {}", signer.address());
    println!("💰 Fund this address for gas on chain {}", config.chain.chain_id);

    Ok(())
}

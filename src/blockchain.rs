use crate::error::DispatchError;
use crate::transaction_monitor::{TransactionMonitor, TransactionReceipt};
use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// The three chain operations the dispatcher needs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Transaction count of `address` including pending transactions.
    async fn get_pending_nonce(&self, address: Address) -> Result<u64, DispatchError>;

    /// Broadcasts an already signed, EIP-2718 encoded transaction.
    async fn submit(&self, signed: Bytes) -> Result<B256, DispatchError>;

    /// Waits at most `timeout` for the receipt. A receipt that never shows up
    /// comes back with `TransactionStatus::Timeout`.
    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<TransactionReceipt, DispatchError>;
}

pub struct BlockchainClient {
    provider: Arc<dyn Provider<Ethereum>>,
    monitor: TransactionMonitor,
}

impl BlockchainClient {
    pub async fn connect(rpc_url: &str, expected_chain_id: u64, poll_interval: Duration) -> Result<Self> {
        info!("🔗 Connecting to RPC: {}", rpc_url);

        let url = Url::parse(rpc_url)?;

        // Transactions arrive fully signed, so no filler may touch them.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url);

        let chain_id = provider.get_chain_id().await?;
        if chain_id != expected_chain_id {
            return Err(anyhow::anyhow!(
                "Chain ID mismatch: expected {}, got {}",
                expected_chain_id,
                chain_id
            ));
        }

        info!("✅ Connected to chain {}", expected_chain_id);

        let provider: Arc<dyn Provider<Ethereum>> = Arc::new(provider);
        Ok(Self {
            monitor: TransactionMonitor::new(provider.clone(), poll_interval),
            provider,
        })
    }

}

#[async_trait]
impl ChainClient for BlockchainClient {
    async fn get_pending_nonce(&self, address: Address) -> Result<u64, DispatchError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| DispatchError::Rpc(e.to_string()))
    }

    async fn submit(&self, signed: Bytes) -> Result<B256, DispatchError> {
        let pending = self
            .provider
            .send_raw_transaction(&signed)
            .await
            .map_err(|e| DispatchError::Rpc(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> Result<TransactionReceipt, DispatchError> {
        Ok(self.monitor.monitor_transaction(tx_hash, timeout).await)
    }
}


use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::Provider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Log entry of a mined transaction, detached from the RPC types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub status: TransactionStatus,
    pub logs: Vec<ReceiptLog>,
}

impl TransactionReceipt {
    pub fn timed_out(hash: B256) -> Self {
        Self {
            hash,
            block_number: 0,
            gas_used: 0,
            status: TransactionStatus::Timeout,
            logs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Failed,
    Timeout,
}

pub struct TransactionMonitor {
    provider: Arc<dyn Provider<Ethereum>>,
    poll_interval: Duration,
}

impl TransactionMonitor {
    pub fn new(provider: Arc<dyn Provider<Ethereum>>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
        }
    }

    /// Polls for the receipt of `tx_hash` until it is mined or `max_wait` has
    /// elapsed. Lookup errors are logged and polling continues.
    pub async fn monitor_transaction(&self, tx_hash: B256, max_wait: Duration) -> TransactionReceipt {
        info!("🔍 Monitoring transaction: {:?}", tx_hash);

        let start_time = Instant::now();

        loop {
            if start_time.elapsed() > max_wait {
                warn!("⏰ Transaction monitoring timeout after {:?}", max_wait);
                return TransactionReceipt::timed_out(tx_hash);
            }

            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status() {
                        TransactionStatus::Success
                    } else {
                        TransactionStatus::Failed
                    };

                    info!("✅ Transaction confirmed: {:?} (Status: {:?})", tx_hash, status);

                    let logs = receipt
                        .inner
                        .logs()
                        .iter()
                        .map(|log| ReceiptLog {
                            address: log.inner.address,
                            topics: log.inner.data.topics().to_vec(),
                            data: log.inner.data.data.clone(),
                        })
                        .collect();

                    return TransactionReceipt {
                        hash: tx_hash,
                        block_number: receipt.block_number.unwrap_or(0),
                        gas_used: receipt.gas_used,
                        status,
                        logs,
                    };
                }
                Ok(None) => {
                    debug!("⏳ Transaction pending, waiting...");
                }
                Err(e) => {
                    warn!("❌ Error checking transaction status: {}", e);
                }
            }

            sleep(self.poll_interval).await;
        }
    }
}

use crate::blockchain::ChainClient;
use crate::error::DispatchError;
use alloy::primitives::Address;
use tracing::{debug, info};

/// Per-run nonce sequence. Seeded from the chain's pending count on first use
/// and after every invalidation; never persisted across runs.
#[derive(Debug, Default)]
pub struct NonceCounter {
    next: Option<u64>,
}

impl NonceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&mut self, client: &dyn ChainClient, address: Address) -> Result<u64, DispatchError> {
        if let Some(nonce) = self.next {
            return Ok(nonce);
        }

        let nonce = client.get_pending_nonce(address).await?;
        info!("🔢 Pending nonce for {}: {}", address, nonce);
        self.next = Some(nonce);
        Ok(nonce)
    }

    /// The last acquired nonce was accepted by the network.
    pub fn advance(&mut self) {
        if let Some(nonce) = self.next.as_mut() {
            *nonce += 1;
        }
    }

    /// Forget the local value; the next `acquire` asks the chain again.
    pub fn invalidate(&mut self) {
        debug!("Nonce invalidated, will re-fetch");
        self.next = None;
    }
}

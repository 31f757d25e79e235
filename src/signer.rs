use crate::error::DispatchError;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;
use tracing::info;

/// Everything that varies between two submissions. Built fresh per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAttempt {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub data: Bytes,
    pub nonce: u64,
}

#[async_trait]
pub trait TxSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Signs `attempt` and returns the EIP-2718 encoded transaction.
    async fn sign(&self, attempt: &DispatchAttempt) -> Result<Bytes, DispatchError>;
}

/// Legacy transactions at a fixed gas price, signed with a local key.
pub struct LocalTxSigner {
    wallet: EthereumWallet,
    address: Address,
    chain_id: u64,
    gas_price_wei: u128,
}

impl LocalTxSigner {
    pub fn from_private_key(private_key: &str, chain_id: u64, gas_price_wei: u128) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| anyhow::anyhow!("Invalid private key: {}", e))?;
        let address = signer.address();

        info!("🔑 Wallet address: {}", address);

        Ok(Self {
            wallet: EthereumWallet::from(signer),
            address,
            chain_id,
            gas_price_wei,
        })
    }
}

#[async_trait]
impl TxSigner for LocalTxSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, attempt: &DispatchAttempt) -> Result<Bytes, DispatchError> {
        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(attempt.to)
            .with_value(attempt.value)
            .with_gas_limit(attempt.gas_limit)
            .with_gas_price(self.gas_price_wei)
            .with_nonce(attempt.nonce)
            .with_chain_id(self.chain_id)
            .with_input(attempt.data.clone());

        let envelope = request
            .build(&self.wallet)
            .await
            .map_err(|e| DispatchError::Signing(e.to_string()))?;

        Ok(envelope.encoded_2718().into())
    }
}

pub mod blockchain;
pub mod calldata;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod dispatcher;
pub mod error;
pub mod nonce;
pub mod output_store;
pub mod retry;
pub mod schedule;
pub mod signer;
pub mod transaction_monitor;

pub use blockchain::{BlockchainClient, ChainClient};
pub use catalog::{standard_catalog, CatalogAddresses, TransactionKind, TransactionSpec};
pub use config::ChainConfig;
pub use dispatcher::{DispatchSettings, Dispatcher, RunSummary, SpecOutcome, SpecReport};
pub use error::DispatchError;
pub use output_store::OutputStore;
pub use retry::{execute_with_retry, RetryConfig};
pub use schedule::{due_specs, ScheduleSlot};
pub use signer::{DispatchAttempt, LocalTxSigner, TxSigner};
pub use transaction_monitor::{TransactionMonitor, TransactionReceipt, TransactionStatus};

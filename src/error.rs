use alloy::primitives::B256;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// Provider error phrases worth resubmitting for, matched on word boundaries
/// against the lowercased message.
static TRANSIENT_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:nonce too low|nonce too high|invalid nonce|already known|known transaction|replacement transaction underpriced|timeout|timed out|connection (?:refused|reset|closed|aborted)|error sending request|temporarily unavailable|service unavailable|bad gateway|gateway timeout|rate limit(?:ed)?|too many requests|failed to estimate gas|gas required exceeds allowance)\b",
    )
    .expect("transient phrase pattern is valid")
});

/// HTTP status codes only count when the message presents them as a status.
static TRANSIENT_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:status code|status|http)\b[^0-9a-z]*(?:error[^0-9a-z]*)?(?:429|502|503|504)\b")
        .expect("transient status pattern is valid")
});

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: B256, block_number: u64 },

    #[error("no receipt for {tx_hash} after {waited:?}")]
    ReceiptTimeout { tx_hash: B256, waited: Duration },

    #[error("cannot encode call data: {0}")]
    Encoding(String),

    #[error("output store: {0}")]
    Store(String),
}

impl DispatchError {
    /// Only provider errors can be transient; a mined revert or a lost receipt is final.
    pub fn is_transient(&self) -> bool {
        match self {
            DispatchError::Rpc(message) => is_transient_message(message),
            _ => false,
        }
    }
}

fn is_transient_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase().replace('_', " ");
    TRANSIENT_PHRASES.is_match(&message) || TRANSIENT_STATUS.is_match(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_errors_are_classified_by_message() {
        assert!(DispatchError::Rpc("nonce too low: next nonce 7".into()).is_transient());
        assert!(DispatchError::Rpc("error sending request: Connection refused".into()).is_transient());
        assert!(DispatchError::Rpc("HTTP error 503".into()).is_transient());
        assert!(DispatchError::Rpc("ALREADY_KNOWN".into()).is_transient());
        assert!(!DispatchError::Rpc("insufficient funds for gas * price + value".into()).is_transient());
        assert!(!DispatchError::Rpc("execution reverted".into()).is_transient());
        assert!(DispatchError::Rpc("HTTP status server error (502 Bad Gateway)".into()).is_transient());
        assert!(DispatchError::Rpc("status code: 429".into()).is_transient());
        assert!(DispatchError::Rpc("request timed out".into()).is_transient());
    }

    #[test]
    fn test_numbers_inside_messages_are_not_status_codes() {
        let insufficient = DispatchError::Rpc(
            "insufficient funds for gas * price + value: address 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf have 4290000000000 want 5000000000000".into(),
        );
        let reverted = DispatchError::Rpc("execution reverted: amount 15031 too small".into());
        let address_with_code = DispatchError::Rpc(
            "execution reverted: sender 0x5020000000000000000000000000000000000503".into(),
        );

        assert!(!insufficient.is_transient());
        assert!(!reverted.is_transient());
        assert!(!address_with_code.is_transient());
        assert!(!DispatchError::Rpc("execution reverted: connectionless pool".into()).is_transient());
    }

    #[test]
    fn test_non_rpc_errors_are_never_transient() {
        let reverted = DispatchError::Reverted {
            tx_hash: B256::ZERO,
            block_number: 10,
        };
        let timeout = DispatchError::ReceiptTimeout {
            tx_hash: B256::ZERO,
            waited: Duration::from_secs(120),
        };

        assert!(!reverted.is_transient());
        assert!(!timeout.is_transient());
        assert!(!DispatchError::Signing("connection".into()).is_transient());
    }
}

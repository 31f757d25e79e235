use crate::transaction_monitor::ReceiptLog;
use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

pub fn transfer_topic() -> B256 {
    IERC20::Transfer::SIGNATURE_HASH
}

/// Value of the first `Transfer` emitted by `token` to `recipient`.
///
/// Logs with fewer than three topics or a short data section are ignored, as
/// are transfers of other tokens or to other addresses.
pub fn received_amount(logs: &[ReceiptLog], token: Address, recipient: Address) -> Option<U256> {
    let topic = transfer_topic();
    let recipient_topic = recipient.into_word();

    logs.iter()
        .filter(|log| log.address == token)
        .filter(|log| log.topics.len() >= 3 && log.topics[0] == topic)
        .filter(|log| log.topics[2] == recipient_topic)
        .find_map(|log| log.data.get(..32).map(U256::from_be_slice))
}

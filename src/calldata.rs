use alloy::primitives::{b256, Address, Bytes, Selector, B256, U256};
use alloy::sol_types::{abi::TokenSeq, SolType, SolValue};

/// Fixed trailer words the DEX router expects after the swap arguments.
/// Their meaning is not documented by the router; they are sent as-is.
pub const SWAP_TRAILER: [B256; 2] = [
    b256!("00000000000000000000000000000000000000000000000000036861bb4b0c4b"),
    B256::ZERO,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub input_token: Address,
    pub output_token: Address,
    pub amount_in: U256,
    pub recipient: Address,
    pub deadline: u64,
    pub min_output: U256,
}

/// Selector followed by the ABI encoding of `params` as function arguments.
pub fn encode_call<T: SolValue>(selector: Selector, params: &T) -> Bytes
where
    for<'a> <T::SolType as SolType>::Token<'a>: TokenSeq<'a>,
{
    let mut data = selector.to_vec();
    data.extend_from_slice(&params.abi_encode_params());
    data.into()
}

pub fn encode_selector_only(selector: Selector) -> Bytes {
    Bytes::copy_from_slice(selector.as_slice())
}

pub fn encode_amount_call(selector: Selector, amount: U256) -> Bytes {
    encode_call(selector, &(amount,))
}

/// Layout: input token, output token, amount in, recipient, deadline,
/// minimum output, then the two trailer words.
pub fn encode_swap_call(selector: Selector, swap: &SwapCall) -> Bytes {
    encode_call(
        selector,
        &(
            swap.input_token,
            swap.output_token,
            swap.amount_in,
            swap.recipient,
            U256::from(swap.deadline),
            swap.min_output,
            SWAP_TRAILER[0],
            SWAP_TRAILER[1],
        ),
    )
}


#[cfg(test)]
mod tests {
    use super::test_utils::{argument_word, uint_word};
    use super::*;
    use alloy::primitives::{address, fixed_bytes};

    #[test]
    fn test_amount_call_is_selector_plus_padded_word() {
        let data = encode_amount_call(fixed_bytes!("c9107def"), U256::from(90_000_000_000_000_000u64));

        assert_eq!(
            hex::encode(&data),
            "c9107def000000000000000000000000000000000000000000000000013fbe85edc90000"
        );
    }

    #[test]
    fn test_swap_call_layout() {
        let swap = SwapCall {
            input_token: address!("aDC7bcB5d8fe053Ef19b4E0C861c262Af6e0db60"),
            output_token: address!("0000000088827d2d103ee2d9A6b781773AE03FfB"),
            amount_in: U256::from(10_000u64),
            recipient: address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"),
            deadline: 1_700_000_600,
            min_output: U256::from(1u64),
        };

        let data = encode_swap_call(fixed_bytes!("414bf389"), &swap);

        assert_eq!(data.len(), 4 + 8 * 32);
        assert_eq!(&data[..4], &[0x41, 0x4b, 0xf3, 0x89]);
        assert_eq!(argument_word(&data, 0), Some(swap.input_token.into_word()));
        assert_eq!(argument_word(&data, 1), Some(swap.output_token.into_word()));
        assert_eq!(argument_word(&data, 2), Some(uint_word(U256::from(10_000u64))));
        assert_eq!(argument_word(&data, 3), Some(swap.recipient.into_word()));
        assert_eq!(argument_word(&data, 4), Some(uint_word(U256::from(1_700_000_600u64))));
        assert_eq!(argument_word(&data, 5), Some(uint_word(U256::from(1u64))));
        assert_eq!(
            hex::encode(&data[4 + 6 * 32..]),
            "00000000000000000000000000000000000000000000000000036861bb4b0c4b\
             0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(argument_word(&data, 8), None);
    }

    #[test]
    fn test_selector_only_call() {
        let data = encode_selector_only(fixed_bytes!("d0e30db0"));
        assert_eq!(data.as_ref(), &[0xd0, 0xe3, 0x0d, 0xb0]);
    }
}

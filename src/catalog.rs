//! The fixed set of transactions this keeper sends and how each one is encoded.

use crate::calldata::{encode_amount_call, encode_selector_only, encode_swap_call, SwapCall};
use crate::schedule::ScheduleSlot;
use alloy::primitives::utils::{parse_ether, parse_units};
use alloy::primitives::{fixed_bytes, Address, Bytes, Selector, U256};
use anyhow::Result;
use std::fmt;

pub const STAKE_SELECTOR: Selector = fixed_bytes!("8aa2799c");
pub const WARP_SELECTOR: Selector = fixed_bytes!("d0e30db0"); // deposit()
pub const UNSTAKE_SELECTOR: Selector = fixed_bytes!("c9107def");
pub const SWAP_SELECTOR: Selector = fixed_bytes!("414bf389");

pub const STAKE_GAS_LIMIT: u64 = 5_297_304;
pub const WARP_GAS_LIMIT: u64 = 52_619;
pub const UNSTAKE_GAS_LIMIT: u64 = 6_623_965;
pub const SWAP_GAS_LIMIT: u64 = 657_795;

pub const NATIVE_DECIMALS: u8 = 18;
pub const TOKEN_A_DECIMALS: u8 = 6;
pub const TOKEN_B_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Stake,
    Unstake,
    Warp,
    SwapAToB,
    SwapBToA,
}

impl TransactionKind {
    pub fn is_swap(&self) -> bool {
        matches!(self, TransactionKind::SwapAToB | TransactionKind::SwapBToA)
    }

    /// Whether a successful submission records its received amount for a later swap.
    pub fn produces_chained_output(&self) -> bool {
        matches!(self, TransactionKind::SwapAToB)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TransactionKind::Stake => "STAKE",
            TransactionKind::Unstake => "UNSTAKE",
            TransactionKind::Warp => "WARP",
            TransactionKind::SwapAToB => "SWAP_A_TO_B",
            TransactionKind::SwapBToA => "SWAP_B_TO_A",
        };
        f.write_str(tag)
    }
}

/// Where a swap's input amount comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapInput {
    Fixed(U256),
    /// Read from the output store. Each own slot names the key it consumes.
    Chained {
        sources: Vec<(ScheduleSlot, String)>,
        test_mode_key: String,
    },
}

impl SwapInput {
    /// Output store key to consume for the slot that fired.
    pub fn source_key(&self, matched_slot: Option<ScheduleSlot>, test_mode: bool) -> Option<&str> {
        let SwapInput::Chained {
            sources,
            test_mode_key,
        } = self
        else {
            return None;
        };

        match matched_slot {
            Some(slot) => sources
                .iter()
                .find(|(source_slot, _)| *source_slot == slot)
                .map(|(_, key)| key.as_str())
                .or_else(|| test_mode.then_some(test_mode_key.as_str())),
            None if test_mode => Some(test_mode_key.as_str()),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub input_token: Address,
    pub output_token: Address,
    pub input: SwapInput,
    pub min_output: U256,
    pub recipient: Address,
    pub input_decimals: u8,
    pub output_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSpec {
    pub name: String,
    pub kind: TransactionKind,
    pub target: Address,
    pub selector: Selector,
    /// Native amount attached to the call, zero when the amount travels in `data`.
    pub value: U256,
    pub repeat_count: u32,
    pub gas_limit: u64,
    pub schedule: Vec<ScheduleSlot>,
    pub amount_parameter: Option<U256>,
    pub swap: Option<SwapParams>,
}

impl TransactionSpec {
    pub fn validate(&self, test_mode: bool) -> Result<()> {
        if self.repeat_count == 0 {
            return Err(anyhow::anyhow!("{}: repeat_count must be at least 1", self.name));
        }
        if self.schedule.is_empty() && !test_mode {
            return Err(anyhow::anyhow!("{}: schedule is empty", self.name));
        }
        if let Some(slot) = self.schedule.iter().find(|slot| !slot.is_valid()) {
            return Err(anyhow::anyhow!("{}: invalid schedule slot {}", self.name, slot));
        }
        if self.kind.is_swap() && self.swap.is_none() {
            return Err(anyhow::anyhow!("{}: swap parameters missing", self.name));
        }
        if self.kind == TransactionKind::Unstake && self.amount_parameter.is_none() {
            return Err(anyhow::anyhow!("{}: unstake amount missing", self.name));
        }
        Ok(())
    }

    /// Call data for one submission. `input_amount` overrides the swap input
    /// (chained swaps must supply it); `deadline` is a unix timestamp.
    pub fn call_data(&self, input_amount: Option<U256>, deadline: u64) -> Result<Bytes> {
        match self.kind {
            TransactionKind::Stake | TransactionKind::Warp => Ok(encode_selector_only(self.selector)),
            TransactionKind::Unstake => {
                let amount = self
                    .amount_parameter
                    .ok_or_else(|| anyhow::anyhow!("{}: unstake amount missing", self.name))?;
                Ok(encode_amount_call(self.selector, amount))
            }
            TransactionKind::SwapAToB | TransactionKind::SwapBToA => {
                let swap = self
                    .swap
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("{}: swap parameters missing", self.name))?;
                let amount_in = match (&swap.input, input_amount) {
                    (_, Some(amount)) => amount,
                    (SwapInput::Fixed(amount), None) => *amount,
                    (SwapInput::Chained { .. }, None) => {
                        return Err(anyhow::anyhow!(
                            "{}: chained swap needs an input amount",
                            self.name
                        ))
                    }
                };
                Ok(encode_swap_call(
                    self.selector,
                    &SwapCall {
                        input_token: swap.input_token,
                        output_token: swap.output_token,
                        amount_in,
                        recipient: swap.recipient,
                        deadline,
                        min_output: swap.min_output,
                    },
                ))
            }
        }
    }
}

/// Contract addresses the standard catalogue targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogAddresses {
    pub staking: Address,
    pub wrapped_native: Address,
    pub dex_router: Address,
    pub token_a: Address,
    pub token_b: Address,
}

/// Stake, wrap, unstake, and the A→B / B→A swap pair. B→A at 20:00 spends the
/// output of the 12:00 A→B swap; at 00:00 it spends the 19:00 output.
pub fn standard_catalog(addresses: &CatalogAddresses, recipient: Address) -> Result<Vec<TransactionSpec>> {
    Ok(vec![
        TransactionSpec {
            name: "Stake".to_string(),
            kind: TransactionKind::Stake,
            target: addresses.staking,
            selector: STAKE_SELECTOR,
            value: parse_ether("0.1")?,
            repeat_count: 1,
            gas_limit: STAKE_GAS_LIMIT,
            schedule: vec![ScheduleSlot::at(5, 30)],
            amount_parameter: None,
            swap: None,
        },
        TransactionSpec {
            name: "Warp".to_string(),
            kind: TransactionKind::Warp,
            target: addresses.wrapped_native,
            selector: WARP_SELECTOR,
            value: parse_ether("0.001")?,
            repeat_count: 50,
            gas_limit: WARP_GAS_LIMIT,
            schedule: vec![
                ScheduleSlot::at(6, 0),
                ScheduleSlot::at(9, 0),
                ScheduleSlot::at(14, 0),
                ScheduleSlot::at(18, 0),
                ScheduleSlot::at(23, 0),
            ],
            amount_parameter: None,
            swap: None,
        },
        TransactionSpec {
            name: "Unstake".to_string(),
            kind: TransactionKind::Unstake,
            target: addresses.staking,
            selector: UNSTAKE_SELECTOR,
            value: U256::ZERO,
            repeat_count: 1,
            gas_limit: UNSTAKE_GAS_LIMIT,
            schedule: vec![ScheduleSlot::at(14, 10)],
            amount_parameter: Some(parse_units("0.09", NATIVE_DECIMALS)?.get_absolute()),
            swap: None,
        },
        TransactionSpec {
            name: "Swap A to B".to_string(),
            kind: TransactionKind::SwapAToB,
            target: addresses.dex_router,
            selector: SWAP_SELECTOR,
            value: U256::ZERO,
            repeat_count: 1,
            gas_limit: SWAP_GAS_LIMIT,
            schedule: vec![ScheduleSlot::at(12, 0), ScheduleSlot::at(19, 0)],
            amount_parameter: None,
            swap: Some(SwapParams {
                input_token: addresses.token_a,
                output_token: addresses.token_b,
                input: SwapInput::Fixed(parse_units("0.01", TOKEN_A_DECIMALS)?.get_absolute()),
                min_output: U256::from(1u64),
                recipient,
                input_decimals: TOKEN_A_DECIMALS,
                output_decimals: TOKEN_B_DECIMALS,
            }),
        },
        TransactionSpec {
            name: "Swap B to A".to_string(),
            kind: TransactionKind::SwapBToA,
            target: addresses.dex_router,
            selector: SWAP_SELECTOR,
            value: U256::ZERO,
            repeat_count: 1,
            gas_limit: SWAP_GAS_LIMIT,
            schedule: vec![ScheduleSlot::at(20, 0), ScheduleSlot::at(0, 0)],
            amount_parameter: None,
            swap: Some(SwapParams {
                input_token: addresses.token_b,
                output_token: addresses.token_a,
                input: SwapInput::Chained {
                    sources: vec![
                        (ScheduleSlot::at(20, 0), "12:00".to_string()),
                        (ScheduleSlot::at(0, 0), "19:00".to_string()),
                    ],
                    test_mode_key: "12:00".to_string(),
                },
                min_output: U256::from(1u64),
                recipient,
                input_decimals: TOKEN_B_DECIMALS,
                output_decimals: TOKEN_A_DECIMALS,
            }),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calldata::test_utils::{argument_word, uint_word};
    use alloy::primitives::address;

    fn addresses() -> CatalogAddresses {
        CatalogAddresses {
            staking: address!("494401396FD1cf51cDD13e29eCFA769F49e1F5D3"),
            wrapped_native: address!("0000000088827d2d103ee2d9A6b781773AE03FfB"),
            dex_router: address!("822f872763B7Be16c9b9687D8b9D73f1b5017Df0"),
            token_a: address!("aDC7bcB5d8fe053Ef19b4E0C861c262Af6e0db60"),
            token_b: address!("0000000088827d2d103ee2d9A6b781773AE03FfB"),
        }
    }

    fn find(catalog: &[TransactionSpec], kind: TransactionKind) -> &TransactionSpec {
        catalog.iter().find(|spec| spec.kind == kind).unwrap()
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = standard_catalog(&addresses(), Address::repeat_byte(7)).unwrap();

        assert_eq!(catalog.len(), 5);
        for spec in &catalog {
            spec.validate(false).unwrap();
        }
        assert_eq!(find(&catalog, TransactionKind::Warp).repeat_count, 50);
        assert_eq!(
            find(&catalog, TransactionKind::Stake).value,
            U256::from(100_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_native_value_specs_send_bare_selector() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();
        let warp = find(&catalog, TransactionKind::Warp);

        assert_eq!(warp.call_data(None, 0).unwrap().as_ref(), WARP_SELECTOR.as_slice());
    }

    #[test]
    fn test_unstake_carries_amount_in_data() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();
        let unstake = find(&catalog, TransactionKind::Unstake);
        let data = unstake.call_data(None, 0).unwrap();

        assert_eq!(unstake.value, U256::ZERO);
        assert_eq!(
            argument_word(&data, 0),
            Some(uint_word(U256::from(90_000_000_000_000_000u64)))
        );
    }

    #[test]
    fn test_fixed_swap_uses_configured_amount() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();
        let swap = find(&catalog, TransactionKind::SwapAToB);
        let data = swap.call_data(None, 1_000).unwrap();

        assert_eq!(argument_word(&data, 2), Some(uint_word(U256::from(10_000u64))));
        assert_eq!(argument_word(&data, 4), Some(uint_word(U256::from(1_000u64))));
    }

    #[test]
    fn test_chained_swap_requires_input_amount() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();
        let swap = find(&catalog, TransactionKind::SwapBToA);

        assert!(swap.call_data(None, 0).is_err());
        let data = swap.call_data(Some(U256::from(500u64)), 0).unwrap();
        assert_eq!(argument_word(&data, 2), Some(uint_word(U256::from(500u64))));
    }

    #[test]
    fn test_chained_source_key_by_slot() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();
        let input = &find(&catalog, TransactionKind::SwapBToA).swap.as_ref().unwrap().input;

        assert_eq!(input.source_key(Some(ScheduleSlot::at(20, 0)), false), Some("12:00"));
        assert_eq!(input.source_key(Some(ScheduleSlot::at(0, 0)), false), Some("19:00"));
        assert_eq!(input.source_key(None, true), Some("12:00"));
        assert_eq!(input.source_key(None, false), None);
    }

    #[test]
    fn test_validate_rejects_broken_specs() {
        let catalog = standard_catalog(&addresses(), Address::ZERO).unwrap();

        let mut no_repeats = catalog[0].clone();
        no_repeats.repeat_count = 0;
        assert!(no_repeats.validate(false).is_err());

        let mut unscheduled = catalog[0].clone();
        unscheduled.schedule.clear();
        assert!(unscheduled.validate(false).is_err());
        assert!(unscheduled.validate(true).is_ok());

        let mut bad_slot = catalog[0].clone();
        bad_slot.schedule = vec![ScheduleSlot::at(25, 0)];
        assert!(bad_slot.validate(false).is_err());
    }
}

//! Pure input validation: amounts, addresses, and transaction hashes.
//!
//! Everything here is synchronous and side-effect free. Callers above this
//! layer only ever see parsed, canonical values ([`alloy::primitives::U256`]
//! base units, [`UniversalAddress`], [`UniversalTxHash`]) and never re-check
//! formats downstream.

use std::str::FromStr;

use alloy::primitives::{Address, TxHash, U256};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::chain::{ChainError, ChainId, ChainKind, NetworkEnv, domain_of};
use crate::{UniversalAddress, UniversalTxHash};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount has more than one decimal point")]
    MultipleDecimalPoints,
    #[error("amount contains an invalid character: {character:?}")]
    InvalidCharacter { character: char },
    #[error("amount has more than {max} decimal places")]
    TooManyDecimals { max: u8 },
    #[error("amount is below the minimum of {min}")]
    BelowMinimum { min: String },
    #[error("amount is above the maximum of {max}")]
    AboveMaximum { max: String },
    #[error("amount exceeds the available balance of {balance}")]
    ExceedsBalance { balance: String },
    #[error("amount does not fit in a 256-bit integer")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("EVM address must be 0x followed by 40 hex characters, got {value:?}")]
    MalformedEvm { value: String },
    #[error("Solana address is not valid base58 of the expected length: {value:?}")]
    MalformedSolana { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxHashError {
    #[error("transaction hash is empty")]
    Empty,
    #[error("EVM transaction hash must be 0x followed by 64 hex characters, got {value:?}")]
    MalformedEvm { value: String },
    #[error("Solana signature is not valid base58 of the expected length: {value:?}")]
    MalformedSolana { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no source chain selected")]
    MissingSource,
    #[error("no destination chain selected")]
    MissingDestination,
    #[error("source and destination chain must differ")]
    SameChain,
    #[error(transparent)]
    Unsupported(#[from] ChainError),
}

/// Limits applied on top of format checks in [`validate_amount`]. All bounds
/// are in base units and optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountBounds {
    pub min: Option<U256>,
    pub max: Option<U256>,
    pub balance: Option<U256>,
}

/// Parses a human-entered decimal amount into base units scaled by
/// `10^decimals`.
///
/// Commas are accepted as thousands separators and stripped before parsing.
/// At most one decimal point is allowed, with at most `decimals` fractional
/// digits. Bounds are checked after parsing so the error names the violated
/// limit in human units.
pub fn validate_amount(
    input: &str,
    decimals: u8,
    bounds: AmountBounds,
) -> Result<U256, AmountError> {
    let cleaned = input.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut parts = cleaned.splitn(3, '.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(AmountError::MultipleDecimalPoints);
    }
    if integer.is_empty() && fraction.is_empty() {
        return Err(AmountError::Empty);
    }
    if let Some(character) = cleaned
        .chars()
        .find(|c| !c.is_ascii_digit() && *c != '.')
    {
        return Err(AmountError::InvalidCharacter { character });
    }
    if fraction.len() > usize::from(decimals) {
        return Err(AmountError::TooManyDecimals { max: decimals });
    }

    let scale = U256::from(10).pow(U256::from(decimals));
    let integer_units = if integer.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(integer, 10).map_err(|_| AmountError::Overflow)?
    };
    let fraction_units = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padding = usize::from(decimals) - fraction.len();
        let scaled = U256::from_str_radix(fraction, 10).map_err(|_| AmountError::Overflow)?;
        scaled
            .checked_mul(U256::from(10).pow(U256::from(padding)))
            .ok_or(AmountError::Overflow)?
    };
    let amount = integer_units
        .checked_mul(scale)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or(AmountError::Overflow)?;

    if let Some(min) = bounds.min {
        if amount < min {
            return Err(AmountError::BelowMinimum {
                min: format_base_units(min, decimals),
            });
        }
    }
    if let Some(max) = bounds.max {
        if amount > max {
            return Err(AmountError::AboveMaximum {
                max: format_base_units(max, decimals),
            });
        }
    }
    if let Some(balance) = bounds.balance {
        if amount > balance {
            return Err(AmountError::ExceedsBalance {
                balance: format_base_units(balance, decimals),
            });
        }
    }
    Ok(amount)
}

/// Renders base units back into a human decimal string, trimming trailing
/// fractional zeros. The inverse of [`validate_amount`] for display.
pub fn format_base_units(value: U256, decimals: u8) -> String {
    let scale = U256::from(10).pow(U256::from(decimals));
    let integer = value / scale;
    let fraction = value % scale;
    if fraction.is_zero() {
        return integer.to_string();
    }
    let digits = format!("{fraction:0width$}", width = usize::from(decimals));
    let digits = digits.trim_end_matches('0');
    format!("{integer}.{digits}")
}

/// Validates an address for the given ecosystem.
///
/// Empty input is a distinct error from malformed input so callers can
/// render "required" versus "invalid" messages.
pub fn validate_universal_address(
    input: &str,
    kind: ChainKind,
) -> Result<UniversalAddress, AddressError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    match kind {
        ChainKind::Evm => {
            let digits = trimmed
                .strip_prefix("0x")
                .ok_or_else(|| AddressError::MalformedEvm {
                    value: trimmed.to_string(),
                })?;
            if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AddressError::MalformedEvm {
                    value: trimmed.to_string(),
                });
            }
            Address::from_str(trimmed)
                .map(UniversalAddress::Evm)
                .map_err(|_| AddressError::MalformedEvm {
                    value: trimmed.to_string(),
                })
        }
        ChainKind::Solana => Pubkey::from_str(trimmed)
            .map(UniversalAddress::Solana)
            .map_err(|_| AddressError::MalformedSolana {
                value: trimmed.to_string(),
            }),
    }
}

/// Validates and normalizes a transaction hash for the given ecosystem.
///
/// EVM hashes are lowercased before parsing so every store key and API query
/// uses one canonical form.
pub fn validate_universal_tx_hash(
    input: &str,
    kind: ChainKind,
) -> Result<UniversalTxHash, TxHashError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TxHashError::Empty);
    }
    match kind {
        ChainKind::Evm => {
            let normalized = trimmed.to_ascii_lowercase();
            let digits = normalized
                .strip_prefix("0x")
                .ok_or_else(|| TxHashError::MalformedEvm {
                    value: trimmed.to_string(),
                })?;
            if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(TxHashError::MalformedEvm {
                    value: trimmed.to_string(),
                });
            }
            TxHash::from_str(&normalized)
                .map(UniversalTxHash::Evm)
                .map_err(|_| TxHashError::MalformedEvm {
                    value: trimmed.to_string(),
                })
        }
        ChainKind::Solana => Signature::from_str(trimmed)
            .map(UniversalTxHash::Solana)
            .map_err(|_| TxHashError::MalformedSolana {
                value: trimmed.to_string(),
            }),
    }
}

/// Validates a source/destination pair for a new transfer: both present,
/// distinct, and bridgeable in the given environment.
pub fn validate_chain_selection(
    source: Option<ChainId>,
    destination: Option<ChainId>,
    env: NetworkEnv,
) -> Result<(ChainId, ChainId), SelectionError> {
    let source = source.ok_or(SelectionError::MissingSource)?;
    let destination = destination.ok_or(SelectionError::MissingDestination)?;
    if source == destination {
        return Err(SelectionError::SameChain);
    }
    for chain in [source, destination] {
        if domain_of(chain, env).is_none() {
            return Err(SelectionError::Unsupported(ChainError::UnsupportedChain {
                chain,
                env,
            }));
        }
    }
    Ok((source, destination))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::chain::{BASE, ETHEREUM, SEPOLIA, SolanaCluster};

    fn no_bounds() -> AmountBounds {
        AmountBounds::default()
    }

    #[test]
    fn parses_thousands_separators_and_fraction() {
        let amount = validate_amount("1,234.5", 6, no_bounds()).unwrap();
        assert_eq!(amount, U256::from(1_234_500_000u64));
    }

    #[test]
    fn parses_integer_only_and_fraction_only() {
        assert_eq!(
            validate_amount("42", 6, no_bounds()).unwrap(),
            U256::from(42_000_000u64)
        );
        assert_eq!(
            validate_amount(".5", 6, no_bounds()).unwrap(),
            U256::from(500_000u64)
        );
        assert_eq!(
            validate_amount("7.", 6, no_bounds()).unwrap(),
            U256::from(7_000_000u64)
        );
    }

    #[test]
    fn rejects_empty_and_bare_dot() {
        assert_eq!(validate_amount("", 6, no_bounds()), Err(AmountError::Empty));
        assert_eq!(
            validate_amount("   ", 6, no_bounds()),
            Err(AmountError::Empty)
        );
        assert_eq!(
            validate_amount(".", 6, no_bounds()),
            Err(AmountError::Empty)
        );
    }

    #[test]
    fn rejects_multiple_decimal_points() {
        assert_eq!(
            validate_amount("1.2.3", 6, no_bounds()),
            Err(AmountError::MultipleDecimalPoints)
        );
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(
            validate_amount("12a", 6, no_bounds()),
            Err(AmountError::InvalidCharacter { character: 'a' })
        );
        assert_eq!(
            validate_amount("-5", 6, no_bounds()),
            Err(AmountError::InvalidCharacter { character: '-' })
        );
    }

    #[test]
    fn rejects_excess_decimal_places() {
        assert_eq!(
            validate_amount("1.1234567", 6, no_bounds()),
            Err(AmountError::TooManyDecimals { max: 6 })
        );
        assert!(validate_amount("1.123456", 6, no_bounds()).is_ok());
    }

    #[test]
    fn enforces_bounds_in_order() {
        let bounds = AmountBounds {
            min: Some(U256::from(1_000_000u64)),
            max: Some(U256::from(10_000_000u64)),
            balance: Some(U256::from(5_000_000u64)),
        };
        assert_eq!(
            validate_amount("0.5", 6, bounds),
            Err(AmountError::BelowMinimum {
                min: "1".to_string()
            })
        );
        assert_eq!(
            validate_amount("11", 6, bounds),
            Err(AmountError::AboveMaximum {
                max: "10".to_string()
            })
        );
        assert_eq!(
            validate_amount("6", 6, bounds),
            Err(AmountError::ExceedsBalance {
                balance: "5".to_string()
            })
        );
        assert!(validate_amount("3", 6, bounds).is_ok());
    }

    #[test]
    fn formats_base_units_for_display() {
        assert_eq!(format_base_units(U256::from(1_234_500_000u64), 6), "1234.5");
        assert_eq!(format_base_units(U256::from(42_000_000u64), 6), "42");
        assert_eq!(format_base_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_base_units(U256::ZERO, 6), "0");
    }

    #[test]
    fn evm_address_requires_prefixed_forty_hex() {
        let valid = validate_universal_address(
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            ChainKind::Evm,
        )
        .unwrap();
        assert!(matches!(valid, UniversalAddress::Evm(_)));

        assert_eq!(
            validate_universal_address("", ChainKind::Evm),
            Err(AddressError::Empty)
        );
        assert!(matches!(
            validate_universal_address("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", ChainKind::Evm),
            Err(AddressError::MalformedEvm { .. })
        ));
        assert!(matches!(
            validate_universal_address("0x1234", ChainKind::Evm),
            Err(AddressError::MalformedEvm { .. })
        ));
    }

    #[test]
    fn solana_address_requires_base58_pubkey() {
        let valid = validate_universal_address(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            ChainKind::Solana,
        )
        .unwrap();
        assert!(matches!(valid, UniversalAddress::Solana(_)));

        assert_eq!(
            validate_universal_address("  ", ChainKind::Solana),
            Err(AddressError::Empty)
        );
        assert!(matches!(
            validate_universal_address("l1l1l1", ChainKind::Solana),
            Err(AddressError::MalformedSolana { .. })
        ));
    }

    #[test]
    fn evm_tx_hash_is_lowercase_normalized() {
        let mixed = "0xABCDEF0123456789abcdef0123456789ABCDEF0123456789abcdef0123456789";
        let hash = validate_universal_tx_hash(mixed, ChainKind::Evm).unwrap();
        assert_eq!(hash.to_string(), mixed.to_ascii_lowercase());

        assert!(matches!(
            validate_universal_tx_hash("0x1234", ChainKind::Evm),
            Err(TxHashError::MalformedEvm { .. })
        ));
        assert_eq!(
            validate_universal_tx_hash("", ChainKind::Evm),
            Err(TxHashError::Empty)
        );
    }

    #[test]
    fn solana_signature_parses_base58() {
        let sig = Signature::default().to_string();
        let hash = validate_universal_tx_hash(&sig, ChainKind::Solana).unwrap();
        assert!(matches!(hash, UniversalTxHash::Solana(_)));

        assert!(matches!(
            validate_universal_tx_hash("0x1234", ChainKind::Solana),
            Err(TxHashError::MalformedSolana { .. })
        ));
    }

    #[test]
    fn chain_selection_requires_distinct_supported_pair() {
        let base = ChainId::Evm(BASE);
        let solana = ChainId::Solana(SolanaCluster::MainnetBeta);

        assert!(
            validate_chain_selection(Some(base), Some(solana), NetworkEnv::Mainnet).is_ok()
        );
        assert_eq!(
            validate_chain_selection(None, Some(solana), NetworkEnv::Mainnet),
            Err(SelectionError::MissingSource)
        );
        assert_eq!(
            validate_chain_selection(Some(base), None, NetworkEnv::Mainnet),
            Err(SelectionError::MissingDestination)
        );
        assert_eq!(
            validate_chain_selection(Some(base), Some(base), NetworkEnv::Mainnet),
            Err(SelectionError::SameChain)
        );
        assert!(matches!(
            validate_chain_selection(
                Some(ChainId::Evm(SEPOLIA)),
                Some(solana),
                NetworkEnv::Mainnet
            ),
            Err(SelectionError::Unsupported(_))
        ));
        assert!(matches!(
            validate_chain_selection(
                Some(ChainId::Evm(ETHEREUM)),
                Some(ChainId::Evm(999)),
                NetworkEnv::Mainnet
            ),
            Err(SelectionError::Unsupported(_))
        ));
    }

    proptest! {
        #[test]
        fn integer_amounts_scale_by_decimals(value in 0u64..1_000_000_000) {
            let parsed = validate_amount(&value.to_string(), 6, no_bounds()).unwrap();
            prop_assert_eq!(parsed, U256::from(value) * U256::from(1_000_000u64));
        }

        #[test]
        fn comma_placement_never_changes_the_value(value in 1u64..1_000_000_000) {
            let plain = value.to_string();
            let mut with_commas = String::new();
            for (i, c) in plain.chars().enumerate() {
                if i > 0 && (plain.len() - i) % 3 == 0 {
                    with_commas.push(',');
                }
                with_commas.push(c);
            }
            let a = validate_amount(&plain, 6, no_bounds()).unwrap();
            let b = validate_amount(&with_commas, 6, no_bounds()).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn format_round_trips_through_validate(units in 0u64..u64::MAX) {
            let value = U256::from(units);
            let rendered = format_base_units(value, 6);
            let reparsed = validate_amount(&rendered, 6, no_bounds()).unwrap();
            prop_assert_eq!(reparsed, value);
        }
    }
}

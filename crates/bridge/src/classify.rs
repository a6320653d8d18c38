//! Classification of raw provider error strings.
//!
//! Wallet and RPC stacks surface failures as free-form text. The executors
//! need three judgements made consistently across ecosystems: did the user
//! decline to sign, did the mint fail because the message was already
//! received, and what should a person read when nothing more specific
//! applies.

/// True when the error text indicates the user declined to sign.
///
/// Cancellation is terminal and must never be retried or rendered as a
/// failure.
pub fn is_user_rejection(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    ["user rejected", "user denied", "user cancelled", "user canceled", "rejected the request"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// True when a mint failed because the attested message was already
/// received on the destination.
///
/// EVM transmitters revert with a nonce-already-used reason; on Solana the
/// used-nonce account creation fails because the account exists.
pub fn is_nonce_already_used(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    ["nonce already used", "already in use", "already been received", "already processed"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// True for balance shortfalls, both for the bridged token and the native
/// fee token.
pub fn is_insufficient_funds(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    ["insufficient funds", "insufficient balance", "insufficient lamports", "transfer amount exceeds balance"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// True for gas estimation or gas price failures.
pub fn is_gas_failure(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    ["out of gas", "gas required exceeds", "intrinsic gas", "max fee per gas", "gas estimation"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// Maps a raw error string to the text shown to the user, special-casing
/// the failures people hit most, then falling back to the raw message.
pub fn friendly_error_message(raw: &str) -> String {
    if is_user_rejection(raw) {
        return "Transaction was cancelled in the wallet".to_string();
    }
    if is_insufficient_funds(raw) {
        return "Insufficient funds to complete the transaction".to_string();
    }
    if is_gas_failure(raw) {
        return "Transaction could not be priced; the network may be congested".to_string();
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

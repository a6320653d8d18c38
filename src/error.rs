//! Orchestration-level failure taxonomy.
//!
//! The bridge crate reports precise, layer-specific errors. The orchestrator
//! needs two coarser judgements on top: whether a failure is worth retrying,
//! and how to present it. Both hang off [`FailureKind`].

use thiserror::Error;

use ferry_bridge::attestation::AttestationError;
use ferry_bridge::classify;
use ferry_bridge::evm::caller::EvmCallerError;
use ferry_bridge::solana::caller::SolanaCallerError;
use ferry_bridge::validate::{AddressError, AmountError, SelectionError, TxHashError};
use ferry_bridge::CctpError;

use crate::store::StoreError;

/// Anything the transfer pipeline can fail with.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Hash(#[from] TxHashError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Bridge(#[from] CctpError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("bridge call still failing after {attempts} attempts: {source}")]
    Network {
        attempts: usize,
        #[source]
        source: CctpError,
    },
    #[error("burn transaction failed on chain: {reason}")]
    BurnFailed { reason: String },
    #[error("no transfer recorded for {hash}")]
    UnknownTransfer { hash: String },
    #[error("stored transfer {hash} has no destination address to mint to")]
    MissingRecipient { hash: String },
}

/// Broad failure kinds driving the retry and presentation decisions.
///
/// `Cancellation` sits alongside the three failure kinds because a declined
/// signature is terminal like a failure but must never be retried, counted,
/// or worded as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed input or an impossible selection. Never retried.
    Validation,
    /// The chain executed and rejected the operation. Deterministic.
    Transaction,
    /// Transient I/O. Retried with backoff before being surfaced.
    Network,
    /// The user declined to sign.
    Cancellation,
}

impl FailureKind {
    pub fn of(error: &TransferError) -> Self {
        match error {
            TransferError::Amount(_)
            | TransferError::Address(_)
            | TransferError::Hash(_)
            | TransferError::Selection(_)
            | TransferError::UnknownTransfer { .. }
            | TransferError::MissingRecipient { .. } => Self::Validation,
            TransferError::Bridge(err) => Self::of_bridge(err),
            TransferError::Store(_) | TransferError::Network { .. } => Self::Network,
            TransferError::BurnFailed { .. } => Self::Transaction,
        }
    }

    /// Classifies a bridge failure.
    ///
    /// The rendered text is checked for a rejection first: wallet-backed
    /// callers surface declines as transport errors, so the variant alone
    /// cannot identify them.
    pub fn of_bridge(error: &CctpError) -> Self {
        if classify::is_user_rejection(&error.to_string()) {
            return Self::Cancellation;
        }
        match error {
            CctpError::Chain(_)
            | CctpError::MissingUsdc { .. }
            | CctpError::MissingV1Transmitter { .. }
            | CctpError::MissingChainRuntime { .. }
            | CctpError::RecipientKindMismatch { .. }
            | CctpError::MismatchedTxHash { .. }
            | CctpError::AmountOverflow { .. } => Self::Validation,
            CctpError::Attestation(err) => Self::of_attestation(err),
            CctpError::Evm(err) => Self::of_evm(err),
            CctpError::Solana(err) => Self::of_solana(err),
            CctpError::MessageSentEventNotFound { .. } | CctpError::MalformedMessage => {
                Self::Transaction
            }
        }
    }

    fn of_attestation(error: &AttestationError) -> Self {
        if error.is_transient() || matches!(error, AttestationError::Timeout { .. }) {
            return Self::Network;
        }
        match error {
            AttestationError::Chain(_) => Self::Validation,
            _ => Self::Transaction,
        }
    }

    fn of_evm(error: &EvmCallerError) -> Self {
        match error {
            EvmCallerError::Transaction(_) | EvmCallerError::Transport(_) => Self::Network,
            EvmCallerError::SolType(_) | EvmCallerError::Reverted { .. } => Self::Transaction,
            EvmCallerError::InvalidPrivateKey(_) => Self::Validation,
        }
    }

    fn of_solana(error: &SolanaCallerError) -> Self {
        match error {
            SolanaCallerError::Client(_) => Self::Network,
            SolanaCallerError::Compile(_)
            | SolanaCallerError::Signer(_)
            | SolanaCallerError::Encode(_)
            | SolanaCallerError::TransactionTooLarge { .. }
            | SolanaCallerError::AccountNotFound { .. }
            | SolanaCallerError::MalformedAccount { .. } => Self::Transaction,
        }
    }
}

/// Gate for [`crate::retry::with_retry`] around bridge calls: only transient
/// I/O is retried.
pub fn is_retryable_bridge_failure(error: &CctpError) -> bool {
    FailureKind::of_bridge(error) == FailureKind::Network
}

/// Text shown to the user for a failed transfer.
pub fn user_facing_message(error: &TransferError) -> String {
    classify::friendly_error_message(&error.to_string())
}

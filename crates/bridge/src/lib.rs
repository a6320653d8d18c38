//! Cross-chain USDC transfers over Circle's CCTP V2.
//!
//! The crate is organized around one dispatch point, [`CctpBridge`]: it owns
//! one executor per configured chain ([`evm::EvmBridge`],
//! [`solana::SolanaBridge`]) plus the attestation client, and routes every
//! operation by [`chain::ChainId`]. Everything below the dispatch point is
//! ecosystem-specific; everything above it works in terms of
//! [`UniversalAddress`] and [`UniversalTxHash`].
//!
//! A transfer is burn, attest, mint: burn USDC on the source chain, wait for
//! Circle's attestation service to sign the resulting message, submit the
//! signed message on the destination chain. [`attestation`] owns the middle
//! step, [`confirm`] the bounded wait on the first.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Bytes, FixedBytes, TxHash, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

pub mod attestation;
pub mod chain;
pub mod classify;
pub mod confirm;
pub mod evm;
pub mod mock;
pub mod solana;
pub mod validate;

use crate::attestation::{
    AttestationClient, AttestationError, CompleteAttestation, max_fee_from_bps,
};
use crate::chain::{
    ChainError, ChainId, ChainKind, NetworkEnv, SolanaCluster, TransferSpeed, domain_of,
    solana_usdc_mint,
};
use crate::confirm::BurnStatus;
use crate::evm::EvmBridge;
use crate::evm::caller::{EvmCaller, EvmCallerError};
use crate::solana::SolanaBridge;
use crate::solana::caller::{SolanaCaller, SolanaCallerError};
use crate::validate::{
    AddressError, TxHashError, validate_universal_address, validate_universal_tx_hash,
};

/// An address on either supported ecosystem.
///
/// Displays and parses as the ecosystem's native text form: `0x`-prefixed
/// hex for EVM, base58 for Solana. Serialized as that string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniversalAddress {
    Evm(alloy::primitives::Address),
    Solana(Pubkey),
}

impl UniversalAddress {
    pub const fn kind(&self) -> ChainKind {
        match self {
            Self::Evm(_) => ChainKind::Evm,
            Self::Solana(_) => ChainKind::Solana,
        }
    }

    pub fn evm(&self) -> Option<alloy::primitives::Address> {
        match self {
            Self::Evm(address) => Some(*address),
            Self::Solana(_) => None,
        }
    }

    pub fn solana(&self) -> Option<Pubkey> {
        match self {
            Self::Evm(_) => None,
            Self::Solana(pubkey) => Some(*pubkey),
        }
    }
}

impl fmt::Display for UniversalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm(address) => write!(f, "{address}"),
            Self::Solana(pubkey) => write!(f, "{pubkey}"),
        }
    }
}

impl FromStr for UniversalAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = if s.trim().starts_with("0x") {
            ChainKind::Evm
        } else {
            ChainKind::Solana
        };
        validate_universal_address(s, kind)
    }
}

impl Serialize for UniversalAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UniversalAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// A transaction identifier on either supported ecosystem: a 32-byte hash
/// for EVM, an ed25519 signature for Solana. The text form is the store key
/// and the attestation query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniversalTxHash {
    Evm(TxHash),
    Solana(Signature),
}

impl UniversalTxHash {
    pub const fn kind(&self) -> ChainKind {
        match self {
            Self::Evm(_) => ChainKind::Evm,
            Self::Solana(_) => ChainKind::Solana,
        }
    }

    pub fn evm(&self) -> Option<TxHash> {
        match self {
            Self::Evm(hash) => Some(*hash),
            Self::Solana(_) => None,
        }
    }

    pub fn solana(&self) -> Option<Signature> {
        match self {
            Self::Evm(_) => None,
            Self::Solana(signature) => Some(*signature),
        }
    }
}

impl fmt::Display for UniversalTxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm(hash) => write!(f, "{hash}"),
            Self::Solana(signature) => write!(f, "{signature}"),
        }
    }
}

impl FromStr for UniversalTxHash {
    type Err = TxHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = if s.trim().starts_with("0x") {
            ChainKind::Evm
        } else {
            ChainKind::Solana
        };
        validate_universal_tx_hash(s, kind)
    }
}

impl Serialize for UniversalTxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UniversalTxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Everything a source-chain executor needs to burn.
///
/// Built by [`CctpBridge::prepare_burn`]; amounts are USDC base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnParams {
    pub amount: U256,
    pub destination_domain: u32,
    /// Destination recipient as the protocol's 32-byte form: a left-padded
    /// address on EVM, the recipient's USDC token account on Solana.
    pub mint_recipient: FixedBytes<32>,
    /// Most the protocol may deduct; zero for standard transfers.
    pub max_fee: U256,
    pub min_finality_threshold: u32,
}

/// What a source-chain executor learned from submitting a burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnReceipt {
    pub tx: UniversalTxHash,
    pub amount: U256,
    pub max_fee: U256,
    /// Message nonce when the source chain surfaces it at burn time (EVM
    /// does, Solana does not); recoverable later from the attestation.
    pub nonce: Option<FixedBytes<32>>,
    /// Separate ERC-20 approval transaction, when one was needed.
    pub approval_tx: Option<UniversalTxHash>,
}

/// What a destination-chain executor learned from submitting a mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx: UniversalTxHash,
    /// Minted amount when the destination surfaced it, net of any fee.
    pub amount: Option<U256>,
    pub fee_collected: Option<U256>,
}

/// Result of a mint submission. `AlreadyMinted` is a success: the funds
/// arrived, just not through this submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    Minted(MintReceipt),
    AlreadyMinted,
}

#[derive(Debug, thiserror::Error)]
pub enum CctpError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    #[error(transparent)]
    Evm(#[from] EvmCallerError),
    #[error(transparent)]
    Solana(#[from] SolanaCallerError),
    #[error("burn transaction {tx_hash} emitted no MessageSent event")]
    MessageSentEventNotFound { tx_hash: UniversalTxHash },
    #[error("no known USDC deployment on {chain}")]
    MissingUsdc { chain: ChainId },
    #[error("no legacy V1 message transmitter on {chain}")]
    MissingV1Transmitter { chain: ChainId },
    #[error("amount {amount} does not fit the chain's integer width")]
    AmountOverflow { amount: U256 },
    #[error("cross-chain message is too short to parse")]
    MalformedMessage,
    #[error("no runtime configured for {chain}")]
    MissingChainRuntime { chain: ChainId },
    #[error("recipient address kind does not match {chain}")]
    RecipientKindMismatch { chain: ChainId },
    #[error("transaction hash kind does not match {chain}")]
    MismatchedTxHash { chain: ChainId },
}

/// Computes the 32-byte mint recipient the burn encodes for a destination.
///
/// EVM recipients are the address left-padded to a word. Solana recipients
/// are the wallet's associated USDC token account, since the destination
/// transmitter mints to a token account rather than a wallet.
pub fn mint_recipient_for(
    destination: ChainId,
    recipient: &UniversalAddress,
) -> Result<FixedBytes<32>, CctpError> {
    match (destination, recipient) {
        (ChainId::Evm(_), UniversalAddress::Evm(address)) => Ok(address.into_word()),
        (ChainId::Solana(cluster), UniversalAddress::Solana(owner)) => {
            let mint = solana_usdc_mint(cluster).ok_or(CctpError::MissingUsdc {
                chain: destination,
            })?;
            let token_account = solana::pda::associated_token_address(owner, &mint);
            Ok(FixedBytes::from(token_account.to_bytes()))
        }
        _ => Err(CctpError::RecipientKindMismatch { chain: destination }),
    }
}

/// The dispatch point: one executor per configured chain, routed by
/// [`ChainId`].
///
/// Chains are registered explicitly so a process only carries credentials
/// for the chains it actually serves. Operations against an unregistered
/// chain fail with [`CctpError::MissingChainRuntime`] rather than falling
/// back to a default RPC.
pub struct CctpBridge {
    env: NetworkEnv,
    speed: TransferSpeed,
    attestation: AttestationClient,
    evm: HashMap<u64, EvmBridge>,
    solana: Option<SolanaBridge>,
}

impl CctpBridge {
    pub fn new(env: NetworkEnv, speed: TransferSpeed) -> Result<Self, CctpError> {
        Ok(Self::with_attestation(
            env,
            speed,
            AttestationClient::new(env)?,
        ))
    }

    /// Construction with an explicit attestation client. Used by tests to
    /// point at a local server.
    pub fn with_attestation(
        env: NetworkEnv,
        speed: TransferSpeed,
        attestation: AttestationClient,
    ) -> Self {
        Self {
            env,
            speed,
            attestation,
            evm: HashMap::new(),
            solana: None,
        }
    }

    pub fn env(&self) -> NetworkEnv {
        self.env
    }

    pub fn speed(&self) -> TransferSpeed {
        self.speed
    }

    pub fn attestation(&self) -> &AttestationClient {
        &self.attestation
    }

    pub fn register_evm(
        &mut self,
        chain_id: u64,
        caller: Arc<dyn EvmCaller>,
    ) -> Result<(), CctpError> {
        let bridge = EvmBridge::new(chain_id, self.env, caller)?;
        self.evm.insert(chain_id, bridge);
        Ok(())
    }

    pub fn register_solana(
        &mut self,
        cluster: SolanaCluster,
        caller: Arc<dyn SolanaCaller>,
        lookup_table: Option<Pubkey>,
    ) -> Result<(), CctpError> {
        self.solana = Some(SolanaBridge::new(cluster, caller, lookup_table)?);
        Ok(())
    }

    pub fn evm(&self, chain_id: u64) -> Result<&EvmBridge, CctpError> {
        self.evm.get(&chain_id).ok_or(CctpError::MissingChainRuntime {
            chain: ChainId::Evm(chain_id),
        })
    }

    pub fn solana(&self, cluster: SolanaCluster) -> Result<&SolanaBridge, CctpError> {
        match &self.solana {
            Some(bridge) if bridge.cluster() == cluster => Ok(bridge),
            _ => Err(CctpError::MissingChainRuntime {
                chain: ChainId::Solana(cluster),
            }),
        }
    }

    /// Builds burn parameters for a route. Fast transfers quote the current
    /// fee from the attestation service; standard transfers authorize no fee.
    pub async fn prepare_burn(
        &self,
        source: ChainId,
        destination: ChainId,
        amount: U256,
        recipient: &UniversalAddress,
    ) -> Result<BurnParams, CctpError> {
        let source_domain = self.domain(source)?;
        let destination_domain = self.domain(destination)?;
        let mint_recipient = mint_recipient_for(destination, recipient)?;
        let max_fee = match self.speed {
            TransferSpeed::Fast => {
                let fee_bps = self
                    .attestation
                    .fast_transfer_fee_bps(source_domain, destination_domain)
                    .await?;
                max_fee_from_bps(amount, fee_bps)
            }
            TransferSpeed::Standard => U256::ZERO,
        };
        Ok(BurnParams {
            amount,
            destination_domain,
            mint_recipient,
            max_fee,
            min_finality_threshold: self.speed.min_finality_threshold(),
        })
    }

    pub async fn burn(
        &self,
        source: ChainId,
        destination: ChainId,
        amount: U256,
        recipient: &UniversalAddress,
    ) -> Result<BurnReceipt, CctpError> {
        let params = self
            .prepare_burn(source, destination, amount, recipient)
            .await?;
        match source {
            ChainId::Evm(chain_id) => self.evm(chain_id)?.burn(&params).await,
            ChainId::Solana(cluster) => self.solana(cluster)?.burn(&params).await,
        }
    }

    pub async fn mint(
        &self,
        destination: ChainId,
        attestation: &CompleteAttestation,
        recipient: &UniversalAddress,
    ) -> Result<MintOutcome, CctpError> {
        match destination {
            ChainId::Evm(chain_id) => self.evm(chain_id)?.mint(attestation).await,
            ChainId::Solana(cluster) => {
                let UniversalAddress::Solana(owner) = recipient else {
                    return Err(CctpError::RecipientKindMismatch { chain: destination });
                };
                self.solana(cluster)?.mint(attestation, *owner).await
            }
        }
    }

    /// Submits a legacy V1 mint. V1 transfers only ever originated on EVM
    /// chains, so a Solana destination is a routing error.
    pub async fn mint_v1(
        &self,
        destination: ChainId,
        message: &Bytes,
        attestation: &Bytes,
    ) -> Result<MintOutcome, CctpError> {
        match destination {
            ChainId::Evm(chain_id) => self.evm(chain_id)?.mint_v1(message, attestation).await,
            ChainId::Solana(_) => Err(CctpError::MissingV1Transmitter { chain: destination }),
        }
    }

    /// Recovers the `MessageSent` payload of a past burn. Only legacy V1
    /// resumes need the raw message, and those transfers only ever
    /// originated on EVM chains.
    pub async fn burn_message(
        &self,
        source: ChainId,
        tx: &UniversalTxHash,
    ) -> Result<Bytes, CctpError> {
        match (source, tx) {
            (ChainId::Evm(chain_id), UniversalTxHash::Evm(hash)) => {
                self.evm(chain_id)?.burn_message(*hash).await
            }
            (ChainId::Solana(_), UniversalTxHash::Solana(_)) => {
                Err(CctpError::MissingV1Transmitter { chain: source })
            }
            _ => Err(CctpError::MismatchedTxHash { chain: source }),
        }
    }

    pub async fn burn_status(
        &self,
        source: ChainId,
        tx: &UniversalTxHash,
    ) -> Result<BurnStatus, CctpError> {
        match (source, tx) {
            (ChainId::Evm(chain_id), UniversalTxHash::Evm(hash)) => {
                self.evm(chain_id)?.burn_status(*hash).await
            }
            (ChainId::Solana(cluster), UniversalTxHash::Solana(signature)) => {
                self.solana(cluster)?.burn_status(signature).await
            }
            _ => Err(CctpError::MismatchedTxHash { chain: source }),
        }
    }

    /// USDC balance of the signing identity on a chain, in base units.
    pub async fn usdc_balance(&self, chain: ChainId) -> Result<U256, CctpError> {
        match chain {
            ChainId::Evm(chain_id) => self.evm(chain_id)?.usdc_balance().await,
            ChainId::Solana(cluster) => {
                Ok(U256::from(self.solana(cluster)?.usdc_balance().await?))
            }
        }
    }

    /// Plain USDC transfer on one chain, outside the CCTP message flow.
    /// Carries the integrator fee.
    pub async fn transfer_usdc(
        &self,
        chain: ChainId,
        recipient: &UniversalAddress,
        amount: U256,
    ) -> Result<UniversalTxHash, CctpError> {
        match (chain, recipient) {
            (ChainId::Evm(chain_id), UniversalAddress::Evm(to)) => {
                self.evm(chain_id)?.transfer_usdc(*to, amount).await
            }
            (ChainId::Solana(cluster), UniversalAddress::Solana(owner)) => {
                let base_units: u64 = amount
                    .try_into()
                    .map_err(|_| CctpError::AmountOverflow { amount })?;
                self.solana(cluster)?.transfer_usdc(*owner, base_units).await
            }
            _ => Err(CctpError::RecipientKindMismatch { chain }),
        }
    }

    fn domain(&self, chain: ChainId) -> Result<u32, CctpError> {
        domain_of(chain, self.env).ok_or_else(|| {
            ChainError::UnsupportedChain {
                chain,
                env: self.env,
            }
            .into()
        })
    }
}

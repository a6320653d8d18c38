//! Persisted transfer records and their normalization.
//!
//! The store document has been written by several generations of the app, so
//! records are read through [`RawTransaction`] (every field optional, unknown
//! keys ignored) and upgraded to [`LocalTransaction`] by [`RawTransaction::
//! normalize`], which derives or back-fills whatever the writer left out.
//! Keys are camelCase and values JSON-native: dates as ISO-8601 strings,
//! amounts as decimal strings.

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use ferry_bridge::chain::{confirmation_profile, ChainId, ChainKind, TransferSpeed};
use ferry_bridge::validate::{
    validate_universal_address, validate_universal_tx_hash, AddressError, TxHashError,
};
use ferry_bridge::{UniversalAddress, UniversalTxHash};

use crate::steps::{merge_steps, TransferStep};

/// Schema tag written on new records. Version 1 records predate Solana
/// support and the V2 attestation API; resume handles them through the
/// legacy endpoints.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Where the transfer stands from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Claimed,
    Failed,
}

/// Overall state of a bridge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    #[default]
    Bridge,
}

/// One side of a bridge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEndpoint {
    pub chain: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<UniversalAddress>,
}

/// Snapshot of a bridge attempt: the unit handed back by the orchestrator
/// and embedded in the persisted record for resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResult {
    pub state: BridgeState,
    pub source: BridgeEndpoint,
    pub destination: BridgeEndpoint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TransferStep>,
    #[serde(
        default,
        with = "u256_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// The persisted record, keyed by burn transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTransaction {
    pub hash: UniversalTxHash,
    pub origin_chain: ChainId,
    pub origin_chain_type: ChainKind,
    pub target_chain: ChainId,
    pub target_chain_type: ChainKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_address: Option<UniversalAddress>,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_state: Option<BridgeState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TransferStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_hash: Option<UniversalTxHash>,
    #[serde(
        default,
        with = "u256_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<U256>,
    #[serde(
        default,
        with = "u256_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub fee: Option<U256>,
    /// Wall-clock ETA in seconds, shown while the transfer is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_result: Option<BridgeResult>,
    pub transfer_id: Uuid,
    #[serde(default)]
    pub transfer_type: TransferType,
    pub version: u32,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LocalTransaction {
    /// Fresh pending record for a just-submitted burn. Chain types are
    /// derived, never supplied, so they cannot diverge from the chain ids.
    pub fn new(hash: UniversalTxHash, origin_chain: ChainId, target_chain: ChainId) -> Self {
        Self {
            hash,
            origin_chain,
            origin_chain_type: origin_chain.kind(),
            target_chain,
            target_chain_type: target_chain.kind(),
            target_address: None,
            status: TransferStatus::Pending,
            bridge_state: Some(BridgeState::Pending),
            steps: Vec::new(),
            claim_hash: None,
            amount: None,
            fee: None,
            estimated_time: None,
            bridge_result: None,
            transfer_id: Uuid::new_v4(),
            transfer_type: TransferType::Bridge,
            version: CURRENT_SCHEMA_VERSION,
            date: Utc::now(),
            completed_at: None,
        }
    }

    /// Folds a same-hash record into this one.
    ///
    /// Scalars take the incoming value when it carries one and steps go
    /// through the merge rules. `transfer_id` and `date` keep their original
    /// values so the record's identity and age survive a re-add.
    pub(crate) fn absorb(&mut self, incoming: LocalTransaction) {
        self.origin_chain = incoming.origin_chain;
        self.origin_chain_type = incoming.origin_chain_type;
        self.target_chain = incoming.target_chain;
        self.target_chain_type = incoming.target_chain_type;
        self.target_address = incoming.target_address.or(self.target_address);
        self.status = incoming.status;
        self.bridge_state = incoming.bridge_state.or(self.bridge_state);
        merge_steps(&mut self.steps, incoming.steps);
        self.claim_hash = incoming.claim_hash.or(self.claim_hash);
        self.amount = incoming.amount.or(self.amount);
        self.fee = incoming.fee.or(self.fee);
        self.estimated_time = incoming.estimated_time.or(self.estimated_time);
        self.bridge_result = incoming.bridge_result.or(self.bridge_result.take());
        self.version = incoming.version;
        self.completed_at = incoming.completed_at.or(self.completed_at);
    }

    /// Merges a patch onto this record. `None` fields leave the current
    /// value untouched; steps go through the step merge rules.
    pub fn apply(&mut self, patch: TransactionPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(state) = patch.bridge_state {
            self.bridge_state = Some(state);
        }
        if let Some(claim_hash) = patch.claim_hash {
            self.claim_hash = Some(claim_hash);
        }
        if let Some(amount) = patch.amount {
            self.amount = Some(amount);
        }
        if let Some(fee) = patch.fee {
            self.fee = Some(fee);
        }
        if let Some(result) = patch.bridge_result {
            self.bridge_result = Some(result);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        merge_steps(&mut self.steps, patch.steps);
    }
}

/// Partial update for a stored record. Writers send patches, never whole
/// records, so concurrent updates compose instead of clobbering.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub status: Option<TransferStatus>,
    pub bridge_state: Option<BridgeState>,
    pub steps: Vec<TransferStep>,
    pub claim_hash: Option<UniversalTxHash>,
    pub amount: Option<U256>,
    pub fee: Option<U256>,
    pub bridge_result: Option<BridgeResult>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record has no transaction hash")]
    MissingHash,
    #[error("record names no origin chain, directly or in its bridge result")]
    MissingOriginChain,
    #[error("record names no target chain, directly or in its bridge result")]
    MissingTargetChain,
    #[error(transparent)]
    Hash(#[from] TxHashError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A record as found on disk. Tolerates partial shapes from older writers;
/// [`Self::normalize`] is the only way out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: Option<String>,
    pub origin_chain: Option<ChainId>,
    pub origin_chain_type: Option<ChainKind>,
    pub target_chain: Option<ChainId>,
    pub target_chain_type: Option<ChainKind>,
    pub target_address: Option<String>,
    pub status: Option<TransferStatus>,
    pub bridge_state: Option<BridgeState>,
    pub steps: Option<Vec<TransferStep>>,
    pub claim_hash: Option<String>,
    #[serde(with = "u256_decimal")]
    pub amount: Option<U256>,
    #[serde(with = "u256_decimal")]
    pub fee: Option<U256>,
    pub estimated_time: Option<u64>,
    pub bridge_result: Option<BridgeResult>,
    pub transfer_id: Option<Uuid>,
    pub transfer_type: Option<TransferType>,
    pub version: Option<u32>,
    pub date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RawTransaction {
    /// Upgrades a raw record to the current schema.
    ///
    /// Chain ids missing at the top level are pulled out of the embedded
    /// bridge result. Chain types are recomputed from the ids regardless of
    /// what was stored, so the redundant columns can never diverge. Missing
    /// id, type, version, ETA and date fields are back-filled.
    pub fn normalize(self) -> Result<LocalTransaction, RecordError> {
        let origin_chain = self
            .origin_chain
            .or_else(|| self.bridge_result.as_ref().map(|result| result.source.chain))
            .ok_or(RecordError::MissingOriginChain)?;
        let target_chain = self
            .target_chain
            .or_else(|| {
                self.bridge_result
                    .as_ref()
                    .map(|result| result.destination.chain)
            })
            .ok_or(RecordError::MissingTargetChain)?;

        let hash = self.hash.ok_or(RecordError::MissingHash)?;
        let hash = validate_universal_tx_hash(&hash, origin_chain.kind())?;

        let target_address = self
            .target_address
            .map(|address| validate_universal_address(&address, target_chain.kind()))
            .transpose()?;
        let claim_hash = self
            .claim_hash
            .map(|claim| validate_universal_tx_hash(&claim, target_chain.kind()))
            .transpose()?;

        let steps = match self.steps {
            Some(steps) if !steps.is_empty() => steps,
            _ => self
                .bridge_result
                .as_ref()
                .map(|result| result.steps.clone())
                .unwrap_or_default(),
        };

        let estimated_time = self.estimated_time.or_else(|| {
            confirmation_profile(origin_chain, TransferSpeed::Standard)
                .map(|profile| profile.seconds)
        });

        Ok(LocalTransaction {
            hash,
            origin_chain,
            origin_chain_type: origin_chain.kind(),
            target_chain,
            target_chain_type: target_chain.kind(),
            target_address,
            status: self.status.unwrap_or(TransferStatus::Pending),
            bridge_state: self.bridge_state,
            steps,
            claim_hash,
            amount: self.amount,
            fee: self.fee,
            estimated_time,
            bridge_result: self.bridge_result,
            transfer_id: self.transfer_id.unwrap_or_else(Uuid::new_v4),
            transfer_type: self.transfer_type.unwrap_or_default(),
            version: self.version.unwrap_or(CURRENT_SCHEMA_VERSION),
            date: self.date.unwrap_or_else(Utc::now),
            completed_at: self.completed_at,
        })
    }
}

/// `U256` as a decimal string, so amounts round-trip through JSON without
/// precision loss.
pub(crate) mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| raw.parse::<U256>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use ferry_bridge::chain::{SolanaCluster, BASE, ETHEREUM};

    use crate::steps::{StepState, TransferStep};

    use super::*;

    const EVM_HASH: &str = "0xababababababababababababababababababababababababababababababab0f";

    fn raw_with_chains() -> RawTransaction {
        RawTransaction {
            hash: Some(EVM_HASH.to_string()),
            origin_chain: Some(ChainId::Evm(ETHEREUM)),
            target_chain: Some(ChainId::Evm(BASE)),
            ..RawTransaction::default()
        }
    }

    #[test]
    fn normalize_backfills_defaults() {
        let record = raw_with_chains().normalize().unwrap();

        assert_eq!(record.status, TransferStatus::Pending);
        assert_eq!(record.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(record.transfer_type, TransferType::Bridge);
        assert!(record.estimated_time.is_some(), "ETA derived from the origin chain");
        assert!(record.date <= Utc::now());
    }

    #[test]
    fn normalize_recomputes_chain_types_even_when_stored_wrong() {
        let mut raw = raw_with_chains();
        raw.origin_chain_type = Some(ChainKind::Solana);

        let record = raw.normalize().unwrap();

        assert_eq!(record.origin_chain_type, ChainKind::Evm);
        assert_eq!(record.target_chain_type, ChainKind::Evm);
    }

    #[test]
    fn normalize_extracts_chains_from_the_snapshot() {
        let raw = RawTransaction {
            hash: Some(EVM_HASH.to_string()),
            bridge_result: Some(BridgeResult {
                state: BridgeState::Pending,
                source: BridgeEndpoint {
                    chain: ChainId::Evm(ETHEREUM),
                    address: None,
                },
                destination: BridgeEndpoint {
                    chain: ChainId::Solana(SolanaCluster::MainnetBeta),
                    address: None,
                },
                steps: vec![TransferStep::success("Burn")],
                amount: None,
                provider: None,
            }),
            ..RawTransaction::default()
        };

        let record = raw.normalize().unwrap();

        assert_eq!(record.origin_chain, ChainId::Evm(ETHEREUM));
        assert_eq!(
            record.target_chain,
            ChainId::Solana(SolanaCluster::MainnetBeta)
        );
        assert_eq!(record.target_chain_type, ChainKind::Solana);
        assert_eq!(record.steps.len(), 1, "steps recovered from the snapshot");
    }

    #[test]
    fn normalize_requires_hash_and_chains() {
        let mut missing_hash = raw_with_chains();
        missing_hash.hash = None;
        assert_eq!(
            missing_hash.normalize().unwrap_err(),
            RecordError::MissingHash
        );

        let missing_chains = RawTransaction {
            hash: Some(EVM_HASH.to_string()),
            ..RawTransaction::default()
        };
        assert_eq!(
            missing_chains.normalize().unwrap_err(),
            RecordError::MissingOriginChain
        );
    }

    #[test]
    fn normalize_validates_the_hash_against_the_origin_ecosystem() {
        let mut raw = raw_with_chains();
        raw.hash = Some("not-a-hash".to_string());

        assert!(matches!(
            raw.normalize().unwrap_err(),
            RecordError::Hash(TxHashError::MalformedEvm { .. })
        ));
    }

    #[test]
    fn raw_records_tolerate_unknown_keys() {
        let json = serde_json::json!({
            "hash": EVM_HASH,
            "originChain": 1,
            "targetChain": 8453,
            "provider": "cctp",
            "somethingFromTheFuture": {"a": 1},
        });

        let raw: RawTransaction = serde_json::from_value(json).unwrap();

        assert!(raw.normalize().is_ok());
    }

    #[test]
    fn amounts_persist_as_decimal_strings() {
        let mut record = raw_with_chains().normalize().unwrap();
        record.amount = Some(U256::from(10).pow(U256::from(30)));
        record.fee = Some(U256::from(250));

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["amount"], "1000000000000000000000000000000");
        assert_eq!(json["fee"], "250");

        let back: LocalTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back.amount, record.amount);
    }

    #[test]
    fn dates_persist_as_iso_8601() {
        let record = raw_with_chains().normalize().unwrap();

        let json = serde_json::to_value(&record).unwrap();
        let date = json["date"].as_str().unwrap();

        assert!(date.contains('T'), "got {date}");
        let back: LocalTransaction = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.date, record.date);
    }

    #[test]
    fn patches_merge_instead_of_replacing() {
        let mut record = raw_with_chains().normalize().unwrap();
        record.steps = vec![TransferStep::success("Burn")];
        record.amount = Some(U256::from(5));

        record.apply(TransactionPatch {
            status: Some(TransferStatus::Claimed),
            steps: vec![TransferStep::success("Mint")],
            completed_at: Some(Utc::now()),
            ..TransactionPatch::default()
        });

        assert_eq!(record.status, TransferStatus::Claimed);
        assert_eq!(record.amount, Some(U256::from(5)), "untouched by the patch");
        assert_eq!(record.steps.len(), 2);
        assert_eq!(record.steps[1].state, StepState::Success);
        assert!(record.completed_at.is_some());
    }
}

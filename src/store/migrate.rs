//! One-shot adoption of the pre-versioning transaction file.
//!
//! Before the versioned document existed the app kept a bare JSON array of
//! records under a different file name, written when only EVM chains were
//! supported. On startup that file is read once, its records folded into the
//! current set, and the file deleted so the migration never runs twice.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use ferry_bridge::chain::ChainId;

use super::record::{
    LocalTransaction, RawTransaction, TransferStatus, LEGACY_SCHEMA_VERSION,
};
use super::StoreError;

/// Record shape of the legacy file. Every chain is a bare numeric EVM id;
/// the hash key moved between `txHash` and `hash` across old releases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacyTransaction {
    tx_hash: Option<String>,
    hash: Option<String>,
    from_chain: Option<u64>,
    to_chain: Option<u64>,
    recipient: Option<String>,
    amount: Option<String>,
    status: Option<String>,
    claim_tx: Option<String>,
    /// Epoch milliseconds.
    timestamp: Option<i64>,
}

impl LegacyTransaction {
    /// Converts through [`RawTransaction`] so the same validation and
    /// back-filling applies to adopted records as to current ones.
    fn upgrade(self) -> Option<LocalTransaction> {
        let raw = RawTransaction {
            hash: self.tx_hash.or(self.hash),
            origin_chain: self.from_chain.map(ChainId::Evm),
            target_chain: self.to_chain.map(ChainId::Evm),
            target_address: self.recipient,
            status: self.status.as_deref().map(legacy_status),
            claim_hash: self.claim_tx,
            amount: self.amount.and_then(|amount| amount.parse().ok()),
            version: Some(LEGACY_SCHEMA_VERSION),
            date: self.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis),
            ..RawTransaction::default()
        };
        match raw.normalize() {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%err, "skipping legacy record that does not convert");
                None
            }
        }
    }
}

fn legacy_status(status: &str) -> TransferStatus {
    match status.to_ascii_lowercase().as_str() {
        "claimed" | "completed" | "success" => TransferStatus::Claimed,
        "failed" | "error" => TransferStatus::Failed,
        _ => TransferStatus::Pending,
    }
}

/// Folds the legacy file at `legacy_path` into `transactions` and deletes
/// it. Returns whether `transactions` changed.
///
/// Records whose burn hash is already present are dropped: the current
/// document was written after the legacy one, so it wins, and a re-run
/// against already-migrated data changes nothing.
pub(super) async fn migrate_legacy_file(
    legacy_path: &Path,
    transactions: &mut Vec<LocalTransaction>,
) -> Result<bool, StoreError> {
    let raw = match tokio::fs::read_to_string(legacy_path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(StoreError::Read {
                path: legacy_path.to_path_buf(),
                source,
            })
        }
    };

    let legacy: Vec<LegacyTransaction> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(
                path = %legacy_path.display(),
                %err,
                "legacy transaction file is unreadable, leaving it in place"
            );
            return Ok(false);
        }
    };

    let mut adopted = 0_usize;
    for record in legacy.into_iter().filter_map(LegacyTransaction::upgrade) {
        if transactions
            .iter()
            .any(|existing| existing.hash == record.hash)
        {
            continue;
        }
        transactions.push(record);
        adopted += 1;
    }
    if adopted > 0 {
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
    }

    tokio::fs::remove_file(legacy_path)
        .await
        .map_err(|source| StoreError::Delete {
            path: legacy_path.to_path_buf(),
            source,
        })?;
    info!(
        path = %legacy_path.display(),
        adopted,
        "migrated legacy transaction file"
    );

    Ok(adopted > 0)
}

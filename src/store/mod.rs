//! Locally persisted transfer history.
//!
//! The store is the single owner of the transfer records: it hydrates them
//! from a JSON document on startup, runs the legacy-file migration once, and
//! serves reads and patch-style writes, persisting after every mutation.
//! Everything else in the crate sees copies or sends patches.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ferry_bridge::UniversalTxHash;

use record::{LocalTransaction, RawTransaction, TransactionPatch, TransferStatus};

mod migrate;
pub mod record;

/// File holding the current versioned document, under the state directory.
pub const STORE_FILE_NAME: &str = "transfers.json";
/// File the pre-versioning releases wrote; read once for migration.
pub const LEGACY_FILE_NAME: &str = "transactions.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read store file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to delete legacy store file {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize store document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// On-disk document, read tolerantly: records that fail to parse or
/// normalize are skipped rather than poisoning the whole store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    #[allow(dead_code)]
    version: Option<u32>,
    transactions: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    transactions: &'a [LocalTransaction],
}

/// Owner of the persisted transfer records.
#[derive(Debug)]
pub struct TransactionStore {
    path: PathBuf,
    transactions: Vec<LocalTransaction>,
}

impl TransactionStore {
    /// Hydrates the store from `state_dir`, creating the directory if
    /// needed and folding in the legacy file if one is present.
    pub async fn open(state_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let state_dir = state_dir.as_ref();
        tokio::fs::create_dir_all(state_dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: state_dir.to_path_buf(),
                source,
            })?;

        let path = state_dir.join(STORE_FILE_NAME);
        let mut transactions = load_document(&path).await?;

        let legacy_path = state_dir.join(LEGACY_FILE_NAME);
        let migrated = migrate::migrate_legacy_file(&legacy_path, &mut transactions).await?;

        let store = Self { path, transactions };
        if migrated {
            store.persist().await?;
        }
        debug!(
            path = %store.path.display(),
            count = store.transactions.len(),
            "transaction store ready"
        );
        Ok(store)
    }

    /// All records, newest first.
    pub fn transactions(&self) -> &[LocalTransaction] {
        &self.transactions
    }

    pub fn get(&self, hash: &UniversalTxHash) -> Option<&LocalTransaction> {
        self.transactions.iter().find(|record| record.hash == *hash)
    }

    /// Inserts a record at the front of the list.
    ///
    /// A record with the same burn hash is folded into the existing entry
    /// instead of duplicating it, keeping its position, identity and age.
    pub async fn add(&mut self, record: LocalTransaction) -> Result<(), StoreError> {
        match self
            .transactions
            .iter_mut()
            .find(|existing| existing.hash == record.hash)
        {
            Some(existing) => existing.absorb(record),
            None => self.transactions.insert(0, record),
        }
        self.persist().await
    }

    /// Merges a patch onto the record with the given hash. Returns whether
    /// a record matched; an unknown hash is a no-op.
    pub async fn update(
        &mut self,
        hash: &UniversalTxHash,
        patch: TransactionPatch,
    ) -> Result<bool, StoreError> {
        let Some(record) = self
            .transactions
            .iter_mut()
            .find(|record| record.hash == *hash)
        else {
            warn!(%hash, "dropping update for unknown transfer");
            return Ok(false);
        };
        record.apply(patch);
        self.persist().await?;
        Ok(true)
    }

    pub async fn remove(&mut self, hash: &UniversalTxHash) -> Result<bool, StoreError> {
        let before = self.transactions.len();
        self.transactions.retain(|record| record.hash != *hash);
        if self.transactions.len() == before {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// Drops every record still in `pending`. Returns how many were
    /// removed.
    pub async fn clear_pending(&mut self) -> Result<usize, StoreError> {
        let before = self.transactions.len();
        self.transactions
            .retain(|record| record.status != TransferStatus::Pending);
        let removed = before - self.transactions.len();
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub async fn clear_all(&mut self) -> Result<(), StoreError> {
        self.transactions.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let document = DocumentRef {
            version: record::CURRENT_SCHEMA_VERSION,
            transactions: &self.transactions,
        };
        let body = serde_json::to_string_pretty(&document).map_err(StoreError::Serialize)?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

async fn load_document(path: &Path) -> Result<Vec<LocalTransaction>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let document: RawDocument =
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut transactions: Vec<LocalTransaction> = Vec::new();
    for value in document.transactions {
        let normalized = serde_json::from_value::<RawTransaction>(value)
            .map_err(|err| err.to_string())
            .and_then(|raw| raw.normalize().map_err(|err| err.to_string()));
        match normalized {
            Ok(record) => {
                match transactions
                    .iter_mut()
                    .find(|existing| existing.hash == record.hash)
                {
                    Some(existing) => existing.absorb(record),
                    None => transactions.push(record),
                }
            }
            Err(err) => warn!(path = %path.display(), %err, "skipping unreadable stored record"),
        }
    }
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use ferry_bridge::chain::{ChainId, BASE, ETHEREUM};

    use crate::steps::{StepState, TransferStep};

    use super::*;

    fn hash(fill: u8) -> UniversalTxHash {
        format!("0x{}", hex_of(fill)).parse().unwrap()
    }

    fn hex_of(fill: u8) -> String {
        format!("{fill:02x}").repeat(32)
    }

    fn record(fill: u8) -> LocalTransaction {
        LocalTransaction::new(hash(fill), ChainId::Evm(ETHEREUM), ChainId::Evm(BASE))
    }

    #[tokio::test]
    async fn open_on_an_empty_directory_starts_empty() {
        let dir = tempfile::tempdir().unwrap();

        let store = TransactionStore::open(dir.path()).await.unwrap();

        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn add_keeps_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();

        store.add(record(1)).await.unwrap();
        store.add(record(2)).await.unwrap();

        assert_eq!(store.transactions()[0].hash, hash(2));
        assert_eq!(store.transactions()[1].hash, hash(1));
    }

    #[tokio::test]
    async fn adding_the_same_hash_folds_into_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();

        let mut first = record(1);
        first.steps = vec![TransferStep::success("Burn")];
        first.amount = Some(U256::from(100));
        store.add(first).await.unwrap();

        let mut again = record(1);
        again.status = TransferStatus::Claimed;
        again.steps = vec![TransferStep::success("Mint")];
        store.add(again).await.unwrap();

        assert_eq!(store.transactions().len(), 1);
        let merged = &store.transactions()[0];
        assert_eq!(merged.status, TransferStatus::Claimed);
        assert_eq!(merged.amount, Some(U256::from(100)), "kept from the first add");
        assert_eq!(merged.steps.len(), 2);
    }

    #[tokio::test]
    async fn update_patches_known_records_and_ignores_unknown_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();
        store.add(record(1)).await.unwrap();

        let matched = store
            .update(
                &hash(1),
                TransactionPatch {
                    status: Some(TransferStatus::Claimed),
                    claim_hash: Some(hash(9)),
                    steps: vec![TransferStep::success("Mint")],
                    ..TransactionPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(matched);

        let unknown = store
            .update(&hash(7), TransactionPatch::default())
            .await
            .unwrap();
        assert!(!unknown, "unknown hash is a no-op");

        let updated = &store.transactions()[0];
        assert_eq!(updated.status, TransferStatus::Claimed);
        assert_eq!(updated.claim_hash, Some(hash(9)));
        assert_eq!(updated.steps[0].state, StepState::Success);
    }

    #[tokio::test]
    async fn clear_pending_keeps_terminal_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();

        store.add(record(1)).await.unwrap();
        let mut claimed = record(2);
        claimed.status = TransferStatus::Claimed;
        store.add(claimed).await.unwrap();
        let mut failed = record(3);
        failed.status = TransferStatus::Failed;
        store.add(failed).await.unwrap();

        let removed = store.clear_pending().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.transactions().len(), 2);
        assert!(store.get(&hash(1)).is_none());
    }

    #[tokio::test]
    async fn remove_and_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();
        store.add(record(1)).await.unwrap();
        store.add(record(2)).await.unwrap();

        assert!(store.remove(&hash(1)).await.unwrap());
        assert!(!store.remove(&hash(1)).await.unwrap());
        assert_eq!(store.transactions().len(), 1);

        store.clear_all().await.unwrap();
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn records_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = TransactionStore::open(dir.path()).await.unwrap();
        let mut saved = record(1);
        saved.amount = Some(U256::from(2_500_000));
        saved.steps = vec![TransferStep::success("Burn").with_tx(hash(1))];
        store.add(saved.clone()).await.unwrap();
        drop(store);

        let reloaded = TransactionStore::open(dir.path()).await.unwrap();

        assert_eq!(reloaded.transactions().len(), 1);
        let record = &reloaded.transactions()[0];
        assert_eq!(record.hash, saved.hash);
        assert_eq!(record.amount, saved.amount);
        assert_eq!(record.steps, saved.steps);
        assert_eq!(record.transfer_id, saved.transfer_id);
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::json!({
            "version": 2,
            "transactions": [
                {"hash": format!("0x{}", hex_of(1)), "originChain": ETHEREUM, "targetChain": BASE},
                {"originChain": ETHEREUM},
                "not even an object",
            ],
        });
        tokio::fs::write(dir.path().join(STORE_FILE_NAME), body.to_string())
            .await
            .unwrap();

        let store = TransactionStore::open(dir.path()).await.unwrap();

        assert_eq!(store.transactions().len(), 1);
    }

    #[tokio::test]
    async fn a_corrupt_document_is_an_error_not_a_wipe() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(STORE_FILE_NAME), "{{{")
            .await
            .unwrap();

        let result = TransactionStore::open(dir.path()).await;

        assert!(matches!(result, Err(StoreError::Parse { .. })));
    }

    #[tokio::test]
    async fn legacy_file_is_adopted_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = serde_json::json!([{
            "txHash": format!("0x{}", hex_of(4)),
            "fromChain": ETHEREUM,
            "toChain": BASE,
            "status": "completed",
        }]);
        tokio::fs::write(dir.path().join(LEGACY_FILE_NAME), legacy.to_string())
            .await
            .unwrap();

        let store = TransactionStore::open(dir.path()).await.unwrap();

        assert_eq!(store.transactions().len(), 1);
        assert_eq!(store.transactions()[0].status, TransferStatus::Claimed);
        assert!(!dir.path().join(LEGACY_FILE_NAME).exists());
        assert!(
            dir.path().join(STORE_FILE_NAME).exists(),
            "migration persists the adopted records"
        );
    }
}

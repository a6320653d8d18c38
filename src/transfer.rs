//! Transfer orchestration: burn, confirm, attest, mint, persist.
//!
//! [`TransferEngine`] runs one transfer as a single pipeline over the bridge
//! crate and streams every state change through a bounded channel into the
//! [`TransactionStore`]. The channel is the only writer path: the pipeline
//! never touches the store directly, so update ordering and merge behavior
//! are testable without a chain. `resume` re-enters an interrupted transfer
//! from its persisted record and never burns again.

use alloy::primitives::{U256, keccak256};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};

use ferry_bridge::attestation::{AttestationPollConfig, CompleteAttestation};
use ferry_bridge::chain::{ChainId, USDC_DECIMALS, confirmation_profile};
use ferry_bridge::confirm::{ConfirmOutcome, ConfirmPollConfig, poll_until_confirmed};
use ferry_bridge::validate::{
    AmountBounds, validate_amount, validate_chain_selection, validate_universal_address,
};
use ferry_bridge::{CctpBridge, CctpError, MintOutcome, UniversalAddress, UniversalTxHash};

use crate::error::{FailureKind, TransferError, is_retryable_bridge_failure, user_facing_message};
use crate::retry::{RetryError, RetryPolicy, with_retry};
use crate::steps::{
    APPROVE_STEP, ATTESTATION_STEP, BURN_STEP, INTEGRATOR_FEE_STEP, MINT_STEP, TransferStep,
    merge_step,
};
use crate::store::TransactionStore;
use crate::store::record::{
    BridgeEndpoint, BridgeResult, BridgeState, LEGACY_SCHEMA_VERSION, LocalTransaction,
    TransactionPatch, TransferStatus,
};

/// Provider tag recorded on bridge-result snapshots.
const PROVIDER: &str = "cctp";

/// Informational note on the mint step when the destination had already
/// consumed the message nonce.
const ALREADY_MINTED_NOTE: &str = "Funds were already minted on the destination chain";

/// Flat USDC fee forwarded to an integrator on the source chain of each
/// fresh transfer. Charged right after the burn is submitted; a failed
/// charge marks its step but never fails the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegratorFee {
    /// Fee in USDC base units.
    pub amount: U256,
    /// Where the fee goes. Only charged when the address kind matches the
    /// source chain's ecosystem.
    pub recipient: UniversalAddress,
}

/// A transfer as requested by the user, before validation.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: Option<ChainId>,
    pub destination: Option<ChainId>,
    /// Human-entered decimal USDC amount, e.g. `"1,234.5"`.
    pub amount: String,
    /// Recipient address in the destination ecosystem's format.
    pub recipient: String,
}

/// How a pipeline run left the transfer.
///
/// Post-burn problems are outcomes, not bare errors: the burn happened, the
/// record is persisted, and the caller needs the record to tell the user how
/// to carry on. Only pre-burn failures surface as plain `Err`.
#[derive(Debug)]
pub enum TransferOutcome {
    /// The destination mint landed (or the message was found already
    /// minted). The record is terminal.
    Claimed(LocalTransaction),
    /// Resume found nothing to do.
    AlreadyClaimed(LocalTransaction),
    /// The transfer is persisted but unfinished; `resume` can pick it up.
    Pending {
        record: LocalTransaction,
        error: TransferError,
    },
    /// The burn failed on chain. Nothing to resume.
    Failed {
        record: LocalTransaction,
        error: TransferError,
    },
}

impl TransferOutcome {
    /// The persisted record as of the end of the run.
    pub fn record(&self) -> &LocalTransaction {
        match self {
            Self::Claimed(record) | Self::AlreadyClaimed(record) => record,
            Self::Pending { record, .. } | Self::Failed { record, .. } => record,
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        match self {
            Self::Claimed(_) | Self::AlreadyClaimed(_) => None,
            Self::Pending { error, .. } | Self::Failed { error, .. } => Some(error),
        }
    }
}

/// One state change on its way from the pipeline to the store.
#[derive(Debug)]
enum TransferEvent {
    Step(TransferStep),
    Patch(TransactionPatch),
}

/// Route facts echoed into every bridge-result snapshot the pipeline writes.
#[derive(Debug, Clone)]
struct Route {
    source: ChainId,
    destination: ChainId,
    recipient: Option<UniversalAddress>,
    amount: Option<U256>,
}

impl Route {
    fn snapshot(&self, state: BridgeState, steps: &[TransferStep]) -> BridgeResult {
        BridgeResult {
            state,
            source: BridgeEndpoint {
                chain: self.source,
                address: None,
            },
            destination: BridgeEndpoint {
                chain: self.destination,
                address: self.recipient,
            },
            steps: steps.to_vec(),
            amount: self.amount,
            provider: Some(PROVIDER.to_string()),
        }
    }
}

/// Drives transfers end to end against a configured [`CctpBridge`].
pub struct TransferEngine {
    bridge: CctpBridge,
    bounds: AmountBounds,
    confirm: Option<ConfirmPollConfig>,
    attestation_poll: AttestationPollConfig,
    retry: RetryPolicy,
    integrator: Option<IntegratorFee>,
}

impl TransferEngine {
    pub fn new(bridge: CctpBridge) -> Self {
        Self {
            bridge,
            bounds: AmountBounds::default(),
            confirm: Some(ConfirmPollConfig::default()),
            attestation_poll: AttestationPollConfig::default(),
            retry: RetryPolicy::default(),
            integrator: None,
        }
    }

    /// Static amount limits; the live balance is added per transfer.
    pub fn with_amount_bounds(mut self, bounds: AmountBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Burn-confirmation polling, `None` to skip straight to attestation.
    pub fn with_confirm(mut self, config: Option<ConfirmPollConfig>) -> Self {
        self.confirm = config;
        self
    }

    pub fn with_attestation_poll(mut self, config: AttestationPollConfig) -> Self {
        self.attestation_poll = config;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Optional flat fee sent to an integrator alongside each fresh burn.
    pub fn with_integrator_fee(mut self, fee: Option<IntegratorFee>) -> Self {
        self.integrator = fee;
        self
    }

    pub fn bridge(&self) -> &CctpBridge {
        &self.bridge
    }

    fn charges_integrator_fee(&self, source: ChainId) -> bool {
        self.integrator
            .is_some_and(|fee| fee.recipient.kind() == source.kind())
    }

    /// Runs a fresh transfer: validate, burn, persist, confirm, attest,
    /// mint.
    ///
    /// The record is created as soon as the burn is accepted, so every later
    /// failure leaves a resumable trail. `Err` means nothing was persisted.
    #[instrument(skip_all)]
    pub async fn execute(
        &self,
        store: &mut TransactionStore,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError> {
        let (source, destination) =
            validate_chain_selection(request.source, request.destination, self.bridge.env())?;
        let recipient = validate_universal_address(&request.recipient, destination.kind())?;
        let balance = self.bridge.usdc_balance(source).await?;
        let bounds = AmountBounds {
            balance: Some(balance),
            ..self.bounds
        };
        let amount = validate_amount(&request.amount, USDC_DECIMALS, bounds)?;

        info!(%source, %destination, %amount, %recipient, "submitting burn");
        let receipt = self
            .bridge
            .burn(source, destination, amount, &recipient)
            .await?;
        let hash = receipt.tx;

        // The burn step stays pending until the chain (or the attestation
        // service, which only signs observed burns) vouches for it.
        let mut steps = Vec::new();
        if let Some(approval) = receipt.approval_tx {
            steps.push(TransferStep::success(APPROVE_STEP).with_tx(approval));
        }
        steps.push(TransferStep::pending(BURN_STEP).with_tx(hash));
        if self.charges_integrator_fee(source) {
            steps.push(TransferStep::pending(INTEGRATOR_FEE_STEP));
        }
        steps.push(TransferStep::pending(ATTESTATION_STEP));
        steps.push(TransferStep::pending(MINT_STEP));

        let route = Route {
            source,
            destination,
            recipient: Some(recipient),
            amount: Some(receipt.amount),
        };
        let mut record = LocalTransaction::new(hash, source, destination);
        record.target_address = Some(recipient);
        record.amount = Some(receipt.amount);
        record.fee = (!receipt.max_fee.is_zero()).then_some(receipt.max_fee);
        record.estimated_time =
            confirmation_profile(source, self.bridge.speed()).map(|profile| profile.seconds);
        record.steps = steps.clone();
        record.bridge_result = Some(route.snapshot(BridgeState::Pending, &steps));
        store.add(record).await?;

        let (events, receiver) = mpsc::channel(16);
        let mut pipeline = Pipeline {
            engine: self,
            events,
            steps,
            route,
        };
        let work = async move {
            pipeline.charge_integrator_fee(source).await;
            pipeline.confirm_burn(source, &hash).await?;
            let attestation = pipeline.await_attestation(source, &hash).await?;
            pipeline.mint(destination, &recipient, &attestation).await
        };
        let fold = fold_events(store, hash, receiver);
        let (result, folded) = tokio::join!(work, fold);
        seal(store, hash, result, folded)
    }

    /// Re-enters a persisted transfer by its burn hash: re-polls the
    /// attestation and re-attempts the mint. Never burns again.
    ///
    /// Records written before the V2 migration go through the legacy
    /// attestation API, keyed by the hash of the recovered burn message.
    #[instrument(skip(self, store))]
    pub async fn resume(
        &self,
        store: &mut TransactionStore,
        reference: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let record = find_record(store, reference)
            .ok_or_else(|| TransferError::UnknownTransfer {
                hash: reference.trim().to_string(),
            })?
            .clone();
        if record.status == TransferStatus::Claimed {
            info!(hash = %record.hash, "transfer is already claimed");
            return Ok(TransferOutcome::AlreadyClaimed(record));
        }

        let hash = record.hash;
        let source = record.origin_chain;
        let destination = record.target_chain;
        let recipient = record.target_address;
        let legacy = record.version <= LEGACY_SCHEMA_VERSION;
        let route = Route {
            source,
            destination,
            recipient,
            amount: record.amount,
        };
        info!(%hash, %source, %destination, legacy, "resuming transfer");

        let (events, receiver) = mpsc::channel(16);
        let mut pipeline = Pipeline {
            engine: self,
            events,
            steps: record.steps,
            route,
        };
        let work = async move {
            if legacy {
                pipeline.mint_legacy(source, destination, &hash).await
            } else {
                let Some(recipient) = recipient else {
                    return Err(TransferError::MissingRecipient {
                        hash: hash.to_string(),
                    });
                };
                let attestation = pipeline.await_attestation(source, &hash).await?;
                pipeline.mint(destination, &recipient, &attestation).await
            }
        };
        let fold = fold_events(store, hash, receiver);
        let (result, folded) = tokio::join!(work, fold);
        seal(store, hash, result, folded)
    }
}

/// One transfer mid-flight: the live step ledger plus the event sender.
struct Pipeline<'a> {
    engine: &'a TransferEngine,
    events: mpsc::Sender<TransferEvent>,
    steps: Vec<TransferStep>,
    route: Route,
}

impl Pipeline<'_> {
    /// Merges a step into the local ledger and forwards it to the store.
    async fn push_step(&mut self, step: TransferStep) {
        merge_step(&mut self.steps, step.clone());
        self.send(TransferEvent::Step(step)).await;
    }

    async fn send(&self, event: TransferEvent) {
        // A dropped consumer means the store failed. The chain work carries
        // on so the funds still land even when bookkeeping cannot.
        if self.events.send(event).await.is_err() {
            warn!("event consumer is gone, store update lost");
        }
    }

    /// Charges the configured integrator fee on the source chain.
    ///
    /// The burn is already submitted when this runs, so a fee problem
    /// marks the fee step and moves on; the transfer itself never fails
    /// here. A recipient whose address kind does not match the source
    /// ecosystem is skipped outright.
    async fn charge_integrator_fee(&mut self, source: ChainId) {
        let Some(fee) = self.engine.integrator else {
            return;
        };
        if fee.recipient.kind() != source.kind() {
            warn!(recipient = %fee.recipient, %source, "integrator fee recipient does not match the source chain, skipping");
            return;
        }
        info!(recipient = %fee.recipient, amount = %fee.amount, "charging integrator fee");
        match self
            .engine
            .bridge
            .transfer_usdc(source, &fee.recipient, fee.amount)
            .await
        {
            Ok(tx) => {
                self.push_step(TransferStep::success(INTEGRATOR_FEE_STEP).with_tx(tx))
                    .await;
            }
            Err(err) => {
                warn!(%err, "integrator fee transfer failed");
                let error = TransferError::Bridge(err);
                self.push_step(TransferStep::failed(
                    INTEGRATOR_FEE_STEP,
                    user_facing_message(&error),
                ))
                .await;
            }
        }
    }

    /// Watches the submitted burn until the chain reports a terminal state.
    ///
    /// Timing out is not a failure: the attestation service is the authority
    /// on whether the burn happened, so an unconfirmed burn proceeds to the
    /// attestation wait with its step left pending.
    async fn confirm_burn(
        &mut self,
        source: ChainId,
        hash: &UniversalTxHash,
    ) -> Result<(), TransferError> {
        let Some(config) = self.engine.confirm else {
            return Ok(());
        };
        let (_guard, cancel) = watch::channel(false);
        let outcome = poll_until_confirmed(
            || self.engine.bridge.burn_status(source, hash),
            config,
            cancel,
        )
        .await;
        match outcome {
            ConfirmOutcome::Confirmed => {
                self.push_step(TransferStep::success(BURN_STEP)).await;
                Ok(())
            }
            ConfirmOutcome::Failed { reason } => {
                let reason = reason.unwrap_or_else(|| "transaction failed".to_string());
                self.push_step(TransferStep::failed(BURN_STEP, reason.clone()))
                    .await;
                let snapshot = self.route.snapshot(BridgeState::Error, &self.steps);
                self.send(TransferEvent::Patch(TransactionPatch {
                    status: Some(TransferStatus::Failed),
                    bridge_state: Some(BridgeState::Error),
                    bridge_result: Some(snapshot),
                    ..TransactionPatch::default()
                }))
                .await;
                Err(TransferError::BurnFailed { reason })
            }
            ConfirmOutcome::TimedOut | ConfirmOutcome::Cancelled => {
                warn!("burn still unconfirmed, deferring to the attestation service");
                Ok(())
            }
        }
    }

    async fn await_attestation(
        &mut self,
        source: ChainId,
        hash: &UniversalTxHash,
    ) -> Result<CompleteAttestation, TransferError> {
        info!("waiting for the attestation service");
        let waited = self
            .engine
            .bridge
            .attestation()
            .wait_for_attestation(source, hash, &self.engine.attestation_poll)
            .await;
        match waited {
            Ok(attestation) => {
                // The service only signs burns it has observed, so a
                // complete attestation also settles an unconfirmed burn.
                self.push_step(TransferStep::success(BURN_STEP)).await;
                self.push_step(TransferStep::success(ATTESTATION_STEP)).await;
                Ok(attestation)
            }
            Err(err) => {
                let error = TransferError::Bridge(CctpError::from(err));
                self.push_step(TransferStep::failed(
                    ATTESTATION_STEP,
                    user_facing_message(&error),
                ))
                .await;
                Err(error)
            }
        }
    }

    async fn mint(
        &mut self,
        destination: ChainId,
        recipient: &UniversalAddress,
        attestation: &CompleteAttestation,
    ) -> Result<(), TransferError> {
        info!(%destination, "submitting mint");
        let submitted = with_retry(
            || self.engine.bridge.mint(destination, attestation, recipient),
            self.engine.retry,
            is_retryable_bridge_failure,
        )
        .await;
        self.finish_mint(submitted).await
    }

    /// Legacy path for pre-V2 records: recover the burn message from the
    /// source chain, key the V1 attestation lookup by its hash, mint through
    /// the V1 transmitter.
    async fn mint_legacy(
        &mut self,
        source: ChainId,
        destination: ChainId,
        hash: &UniversalTxHash,
    ) -> Result<(), TransferError> {
        info!("resuming a pre-V2 transfer through the legacy attestation API");
        let message = self.engine.bridge.burn_message(source, hash).await?;
        let message_hash = keccak256(&message);
        let waited = self
            .engine
            .bridge
            .attestation()
            .wait_for_v1_attestation(message_hash, &self.engine.attestation_poll)
            .await;
        let attestation = match waited {
            Ok(attestation) => attestation,
            Err(err) => {
                let error = TransferError::Bridge(CctpError::from(err));
                self.push_step(TransferStep::failed(
                    ATTESTATION_STEP,
                    user_facing_message(&error),
                ))
                .await;
                return Err(error);
            }
        };
        self.push_step(TransferStep::success(BURN_STEP)).await;
        self.push_step(TransferStep::success(ATTESTATION_STEP)).await;

        let submitted = with_retry(
            || self.engine.bridge.mint_v1(destination, &message, &attestation),
            self.engine.retry,
            is_retryable_bridge_failure,
        )
        .await;
        self.finish_mint(submitted).await
    }

    async fn finish_mint(
        &mut self,
        submitted: Result<MintOutcome, RetryError<CctpError>>,
    ) -> Result<(), TransferError> {
        match submitted {
            Ok(MintOutcome::Minted(receipt)) => {
                info!(tx = %receipt.tx, "mint landed, transfer claimed");
                self.push_step(TransferStep::success(MINT_STEP).with_tx(receipt.tx))
                    .await;
                self.claim(Some(receipt.tx), receipt.fee_collected).await;
                Ok(())
            }
            Ok(MintOutcome::AlreadyMinted) => {
                info!("destination already minted this transfer, marking claimed");
                self.push_step(TransferStep::success(MINT_STEP).with_message(ALREADY_MINTED_NOTE))
                    .await;
                self.claim(None, None).await;
                Ok(())
            }
            Err(failure) => {
                let error = match failure {
                    RetryError::Exhausted { attempts, source } => TransferError::Network {
                        attempts,
                        source,
                    },
                    RetryError::Aborted(source) => TransferError::Bridge(source),
                };
                let message = user_facing_message(&error);
                if FailureKind::of(&error) == FailureKind::Cancellation {
                    info!("mint declined by the signer, transfer stays pending");
                } else {
                    warn!(%error, "mint failed, transfer stays pending");
                }
                self.push_step(TransferStep::failed(MINT_STEP, message)).await;
                Err(error)
            }
        }
    }

    /// Marks the record claimed. `fee` replaces the quoted maximum with the
    /// fee the protocol actually collected, when the mint receipt carried it.
    async fn claim(&self, claim_hash: Option<UniversalTxHash>, fee: Option<U256>) {
        let snapshot = self.route.snapshot(BridgeState::Success, &self.steps);
        self.send(TransferEvent::Patch(TransactionPatch {
            status: Some(TransferStatus::Claimed),
            bridge_state: Some(BridgeState::Success),
            claim_hash,
            fee,
            bridge_result: Some(snapshot),
            completed_at: Some(Utc::now()),
            ..TransactionPatch::default()
        }))
        .await;
    }
}

/// Applies pipeline events to the store until the sender side closes.
async fn fold_events(
    store: &mut TransactionStore,
    hash: UniversalTxHash,
    mut events: mpsc::Receiver<TransferEvent>,
) -> Result<(), TransferError> {
    while let Some(event) = events.recv().await {
        let patch = match event {
            TransferEvent::Step(step) => TransactionPatch {
                steps: vec![step],
                ..TransactionPatch::default()
            },
            TransferEvent::Patch(patch) => patch,
        };
        store.update(&hash, patch).await?;
    }
    Ok(())
}

/// Reads the final record back and folds the pipeline result into an
/// outcome. A store failure only wins when the pipeline itself succeeded.
fn seal(
    store: &TransactionStore,
    hash: UniversalTxHash,
    result: Result<(), TransferError>,
    folded: Result<(), TransferError>,
) -> Result<TransferOutcome, TransferError> {
    if let Err(store_error) = folded {
        match &result {
            Err(error) => {
                warn!(%store_error, %error, "record update failed while the transfer was failing");
            }
            Ok(()) => return Err(store_error),
        }
    }
    let record = store
        .get(&hash)
        .cloned()
        .ok_or_else(|| TransferError::UnknownTransfer {
            hash: hash.to_string(),
        })?;
    Ok(match result {
        Ok(()) => TransferOutcome::Claimed(record),
        Err(error) if record.status == TransferStatus::Failed => {
            TransferOutcome::Failed { record, error }
        }
        Err(error) => TransferOutcome::Pending { record, error },
    })
}

/// Finds a stored transfer by its burn hash as the user typed it. EVM hashes
/// match case-insensitively; Solana signatures are case-sensitive base58.
pub(crate) fn find_record<'a>(
    store: &'a TransactionStore,
    reference: &str,
) -> Option<&'a LocalTransaction> {
    let wanted = reference.trim();
    store.transactions().iter().find(|record| {
        let text = record.hash.to_string();
        text == wanted
            || (matches!(record.hash, UniversalTxHash::Evm(_))
                && text.eq_ignore_ascii_case(wanted))
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::TxHash;
    use solana_sdk::signature::Signature;
    use tempfile::tempdir;

    use ferry_bridge::chain::{BASE, SolanaCluster};

    use super::*;

    const EVM_HASH: &str = "0x7ab4a97559fe0da7423b8efd3bdbbb4b5848acbbbdbd8c839ab56cf1d5d87900";

    async fn store_with(records: Vec<LocalTransaction>) -> (tempfile::TempDir, TransactionStore) {
        let dir = tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path()).await.unwrap();
        for record in records {
            store.add(record).await.unwrap();
        }
        (dir, store)
    }

    fn evm_record() -> LocalTransaction {
        LocalTransaction::new(
            UniversalTxHash::Evm(EVM_HASH.parse::<TxHash>().unwrap()),
            ChainId::Evm(BASE),
            ChainId::Solana(SolanaCluster::MainnetBeta),
        )
    }

    #[tokio::test]
    async fn find_record_is_case_insensitive_for_evm_hashes() {
        let (_dir, store) = store_with(vec![evm_record()]).await;

        assert!(find_record(&store, EVM_HASH).is_some());
        assert!(find_record(&store, &EVM_HASH.to_uppercase().replace("0X", "0x")).is_some());
        assert!(find_record(&store, &format!("  {EVM_HASH}  ")).is_some());
        assert!(find_record(&store, "0xdoesnotexist").is_none());
    }

    #[tokio::test]
    async fn find_record_matches_solana_signatures_exactly() {
        let signature = Signature::from([7u8; 64]);
        let record = LocalTransaction::new(
            UniversalTxHash::Solana(signature),
            ChainId::Solana(SolanaCluster::MainnetBeta),
            ChainId::Evm(BASE),
        );
        let (_dir, store) = store_with(vec![record]).await;

        assert!(find_record(&store, &signature.to_string()).is_some());
        assert!(find_record(&store, &signature.to_string().to_lowercase()).is_none());
    }

    #[test]
    fn snapshots_carry_route_and_provider() {
        let route = Route {
            source: ChainId::Evm(BASE),
            destination: ChainId::Solana(SolanaCluster::MainnetBeta),
            recipient: None,
            amount: Some(U256::from(5_000_000u64)),
        };
        let steps = vec![TransferStep::success(BURN_STEP)];

        let snapshot = route.snapshot(BridgeState::Success, &steps);

        assert_eq!(snapshot.state, BridgeState::Success);
        assert_eq!(snapshot.source.chain, ChainId::Evm(BASE));
        assert_eq!(
            snapshot.destination.chain,
            ChainId::Solana(SolanaCluster::MainnetBeta)
        );
        assert_eq!(snapshot.amount, Some(U256::from(5_000_000u64)));
        assert_eq!(snapshot.provider.as_deref(), Some(PROVIDER));
        assert_eq!(snapshot.steps.len(), 1);
    }
}

//! EVM-side burn and mint executors.
//!
//! One [`EvmBridge`] instance serves one chain: it resolves the USDC and
//! CCTP contract addresses for that chain at construction and runs every
//! operation through the [`EvmCaller`] seam. Burns approve on demand, then
//! `depositForBurn`; mints `receiveMessage` with an already-minted guard on
//! both sides of the submission.

pub mod bindings;
pub mod caller;

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256, keccak256};
use alloy::sol_types::{SolCall, SolEvent};
use tracing::{debug, info, instrument, warn};

use crate::attestation::{CompleteAttestation, message_nonce};
use crate::chain::{
    ChainId, NetworkEnv, message_transmitter_v1, message_transmitter_v2, token_messenger_v2,
    usdc_address,
};
use crate::classify::{is_nonce_already_used, is_user_rejection};
use crate::confirm::BurnStatus;
use crate::evm::bindings::{
    IERC20, IMessageTransmitterV1, IMessageTransmitterV2, ITokenMessengerV2, ITokenMinterV1,
    ITokenMinterV2,
};
use crate::evm::caller::{EvmCaller, view};
use crate::{BurnParams, BurnReceipt, CctpError, MintOutcome, MintReceipt, UniversalTxHash};

/// Executors for one EVM chain.
pub struct EvmBridge {
    chain_id: u64,
    env: NetworkEnv,
    usdc: Address,
    token_messenger: Address,
    message_transmitter: Address,
    caller: Arc<dyn EvmCaller>,
}

impl EvmBridge {
    pub fn new(
        chain_id: u64,
        env: NetworkEnv,
        caller: Arc<dyn EvmCaller>,
    ) -> Result<Self, CctpError> {
        let usdc = usdc_address(chain_id).ok_or(CctpError::MissingUsdc {
            chain: ChainId::Evm(chain_id),
        })?;
        Ok(Self {
            chain_id,
            env,
            usdc,
            token_messenger: token_messenger_v2(env),
            message_transmitter: message_transmitter_v2(env),
            caller,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// USDC balance of the signing address.
    pub async fn usdc_balance(&self) -> Result<U256, CctpError> {
        let balance = view(
            self.caller.as_ref(),
            self.usdc,
            IERC20::balanceOfCall {
                account: self.caller.address(),
            },
        )
        .await?;
        Ok(balance)
    }

    /// Plain USDC transfer from the signing address. Carries the
    /// integrator fee, which never routes through the CCTP contracts.
    pub async fn transfer_usdc(
        &self,
        to: Address,
        amount: U256,
    ) -> Result<UniversalTxHash, CctpError> {
        let call = IERC20::transferCall { to, value: amount };
        let receipt = self
            .caller
            .send(self.usdc, Bytes::from(call.abi_encode()), "USDC transfer")
            .await?;
        info!(tx_hash = %receipt.transaction_hash, %amount, "USDC transfer submitted");
        Ok(UniversalTxHash::Evm(receipt.transaction_hash))
    }

    /// Approves the token messenger when the current allowance is short.
    /// Returns the approval hash, or `None` when no approval was needed.
    async fn ensure_usdc_approval(&self, amount: U256) -> Result<Option<TxHash>, CctpError> {
        let allowance = view(
            self.caller.as_ref(),
            self.usdc,
            IERC20::allowanceCall {
                owner: self.caller.address(),
                spender: self.token_messenger,
            },
        )
        .await?;
        if allowance >= amount {
            debug!(%allowance, %amount, "Existing USDC allowance is sufficient");
            return Ok(None);
        }

        let call = IERC20::approveCall {
            spender: self.token_messenger,
            value: amount,
        };
        let receipt = self
            .caller
            .send(self.usdc, Bytes::from(call.abi_encode()), "USDC approval")
            .await?;
        Ok(Some(receipt.transaction_hash))
    }

    /// Burns USDC toward the destination domain and extracts the message
    /// nonce from the emitted `MessageSent` event.
    #[instrument(skip_all, fields(chain = self.chain_id, amount = %params.amount))]
    pub async fn burn(&self, params: &BurnParams) -> Result<BurnReceipt, CctpError> {
        let approval_tx = self.ensure_usdc_approval(params.amount).await?;

        let call = ITokenMessengerV2::depositForBurnCall {
            amount: params.amount,
            destinationDomain: params.destination_domain,
            mintRecipient: params.mint_recipient,
            burnToken: self.usdc,
            // Any address may submit the attested mint.
            destinationCaller: FixedBytes::<32>::ZERO,
            maxFee: params.max_fee,
            minFinalityThreshold: params.min_finality_threshold,
        };
        let receipt = self
            .caller
            .send(
                self.token_messenger,
                Bytes::from(call.abi_encode()),
                "CCTP deposit for burn",
            )
            .await?;

        let message = receipt
            .logs()
            .iter()
            .find_map(|log| IMessageTransmitterV2::MessageSent::decode_log(log.as_ref()).ok())
            .map(|event| event.message.clone())
            .ok_or(CctpError::MessageSentEventNotFound {
                tx_hash: UniversalTxHash::Evm(receipt.transaction_hash),
            })?;
        let nonce = message_nonce(&message);

        info!(tx_hash = %receipt.transaction_hash, ?nonce, "USDC burn submitted");
        Ok(BurnReceipt {
            tx: UniversalTxHash::Evm(receipt.transaction_hash),
            amount: params.amount,
            max_fee: params.max_fee,
            nonce,
            approval_tx: approval_tx.map(UniversalTxHash::Evm),
        })
    }

    /// Whether the V2 transmitter has already consumed this message nonce.
    pub async fn nonce_used(&self, nonce: FixedBytes<32>) -> Result<bool, CctpError> {
        let used = view(
            self.caller.as_ref(),
            self.message_transmitter,
            IMessageTransmitterV2::usedNoncesCall { nonce },
        )
        .await?;
        Ok(!used.is_zero())
    }

    /// Submits an attested message to the V2 transmitter.
    ///
    /// The nonce is probed before submission and re-probed after any
    /// failure that is not a signing rejection: a mint that reverted or
    /// timed out may still have landed, and reporting failure for received
    /// funds loses the user's money trail.
    #[instrument(skip_all, fields(chain = self.chain_id))]
    pub async fn mint(&self, attestation: &CompleteAttestation) -> Result<MintOutcome, CctpError> {
        if let Some(nonce) = attestation.nonce {
            if self.nonce_used(nonce).await? {
                info!(%nonce, "Message nonce already consumed, skipping mint");
                return Ok(MintOutcome::AlreadyMinted);
            }
        }

        let call = IMessageTransmitterV2::receiveMessageCall {
            message: attestation.message.clone(),
            attestation: attestation.attestation.clone(),
        };
        let submitted = self
            .caller
            .send(
                self.message_transmitter,
                Bytes::from(call.abi_encode()),
                "CCTP receive message",
            )
            .await;

        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(err) => {
                let text = err.to_string();
                if is_nonce_already_used(&text) {
                    info!("Mint reverted because the message was already received");
                    return Ok(MintOutcome::AlreadyMinted);
                }
                if !is_user_rejection(&text) {
                    if let Some(nonce) = attestation.nonce {
                        if let Ok(true) = self.nonce_used(nonce).await {
                            warn!(%nonce, "Mint submission failed but the nonce is consumed on-chain");
                            return Ok(MintOutcome::AlreadyMinted);
                        }
                    }
                }
                return Err(err.into());
            }
        };

        let minted = receipt
            .logs()
            .iter()
            .find_map(|log| ITokenMinterV2::MintAndWithdraw::decode_log(log.as_ref()).ok());
        let (amount, fee_collected) = match minted {
            Some(event) => (Some(event.amount), Some(event.feeCollected)),
            None => {
                warn!(tx_hash = %receipt.transaction_hash, "Mint receipt has no MintAndWithdraw event");
                (None, None)
            }
        };

        info!(tx_hash = %receipt.transaction_hash, ?amount, "USDC mint submitted");
        Ok(MintOutcome::Minted(MintReceipt {
            tx: UniversalTxHash::Evm(receipt.transaction_hash),
            amount,
            fee_collected,
        }))
    }

    /// Whether the V1 transmitter has consumed the nonce of this message.
    /// V1 keys its ledger by `keccak(sourceDomain || nonce)`.
    pub async fn v1_nonce_used(&self, message: &[u8]) -> Result<bool, CctpError> {
        let transmitter = self.v1_transmitter()?;
        let Some(key) = v1_nonce_key(message) else {
            return Ok(false);
        };
        let used = view(
            self.caller.as_ref(),
            transmitter,
            IMessageTransmitterV1::usedNoncesCall {
                hashedSourceAndNonce: key,
            },
        )
        .await?;
        Ok(!used.is_zero())
    }

    /// Submits a legacy V1 attested message. Only reachable from resumed
    /// transfers created before the V2 migration.
    #[instrument(skip_all, fields(chain = self.chain_id))]
    pub async fn mint_v1(
        &self,
        message: &Bytes,
        attestation: &Bytes,
    ) -> Result<MintOutcome, CctpError> {
        let transmitter = self.v1_transmitter()?;
        if self.v1_nonce_used(message).await? {
            info!("Legacy message already received, skipping mint");
            return Ok(MintOutcome::AlreadyMinted);
        }

        let call = IMessageTransmitterV1::receiveMessageCall {
            message: message.clone(),
            attestation: attestation.clone(),
        };
        let submitted = self
            .caller
            .send(
                transmitter,
                Bytes::from(call.abi_encode()),
                "CCTP V1 receive message",
            )
            .await;

        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(err) => {
                let text = err.to_string();
                if is_nonce_already_used(&text) {
                    return Ok(MintOutcome::AlreadyMinted);
                }
                if !is_user_rejection(&text) {
                    if let Ok(true) = self.v1_nonce_used(message).await {
                        warn!("Legacy mint submission failed but the nonce is consumed on-chain");
                        return Ok(MintOutcome::AlreadyMinted);
                    }
                }
                return Err(err.into());
            }
        };

        let amount = receipt
            .logs()
            .iter()
            .find_map(|log| ITokenMinterV1::MintAndWithdraw::decode_log(log.as_ref()).ok())
            .map(|event| event.amount);
        Ok(MintOutcome::Minted(MintReceipt {
            tx: UniversalTxHash::Evm(receipt.transaction_hash),
            amount,
            fee_collected: None,
        }))
    }

    /// Receipt-based status of a submitted burn.
    pub async fn burn_status(&self, tx: TxHash) -> Result<BurnStatus, CctpError> {
        match self.caller.receipt(tx).await? {
            None => Ok(BurnStatus::Unconfirmed),
            Some(receipt) if receipt.status() => Ok(BurnStatus::Confirmed),
            Some(_) => Ok(BurnStatus::Failed {
                reason: Some("transaction reverted".to_string()),
            }),
        }
    }

    /// Recovers the raw `MessageSent` payload from a past burn transaction.
    ///
    /// Resumed transfers need the original message bytes to look up their
    /// attestation again; legacy records additionally hash them to key the
    /// V1 attestation API. The V1 and V2 transmitters emit the same
    /// `MessageSent(bytes)` signature, so one decode covers both eras.
    pub async fn burn_message(&self, tx: TxHash) -> Result<Bytes, CctpError> {
        let receipt =
            self.caller
                .receipt(tx)
                .await?
                .ok_or(CctpError::MessageSentEventNotFound {
                    tx_hash: UniversalTxHash::Evm(tx),
                })?;
        receipt
            .logs()
            .iter()
            .find_map(|log| IMessageTransmitterV2::MessageSent::decode_log(log.as_ref()).ok())
            .map(|event| event.message.clone())
            .ok_or(CctpError::MessageSentEventNotFound {
                tx_hash: UniversalTxHash::Evm(tx),
            })
    }

    fn v1_transmitter(&self) -> Result<Address, CctpError> {
        message_transmitter_v1(self.chain_id, self.env).ok_or(CctpError::MissingV1Transmitter {
            chain: ChainId::Evm(self.chain_id),
        })
    }
}

/// V1 used-nonce ledger key: `keccak(abi.encodePacked(sourceDomain, nonce))`
/// with the domain at message bytes 4..8 and the u64 nonce at 12..20.
fn v1_nonce_key(message: &[u8]) -> Option<FixedBytes<32>> {
    let domain = message.get(4..8)?;
    let nonce = message.get(12..20)?;
    let mut packed = [0u8; 12];
    packed[..4].copy_from_slice(domain);
    packed[4..].copy_from_slice(nonce);
    Some(keccak256(packed))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;
    use crate::chain::{BASE, UNICHAIN};
    use crate::mock::{MockEvmCaller, evm_log, evm_receipt};

    const SIGNER: Address = address!("0x00000000000000000000000000000000000000aa");
    const RECIPIENT: FixedBytes<32> =
        b256!("0x0000000000000000000000000000000000000000000000000000000000001111");

    fn bridge() -> (EvmBridge, Arc<MockEvmCaller>) {
        let caller = Arc::new(MockEvmCaller::new(SIGNER));
        let bridge = EvmBridge::new(BASE, NetworkEnv::Mainnet, caller.clone()).unwrap();
        (bridge, caller)
    }

    fn params(amount: u64) -> BurnParams {
        BurnParams {
            amount: U256::from(amount),
            destination_domain: 5,
            mint_recipient: RECIPIENT,
            max_fee: U256::from(100u64),
            min_finality_threshold: 1000,
        }
    }

    fn burn_receipt_with_message(tx: TxHash, nonce_byte: u8) -> alloy::rpc::types::TransactionReceipt {
        let mut message = vec![0u8; 100];
        message[12..44].copy_from_slice(&[nonce_byte; 32]);
        let event = IMessageTransmitterV2::MessageSent {
            message: Bytes::from(message),
        };
        let log = evm_log(
            message_transmitter_v2(NetworkEnv::Mainnet),
            event.encode_log_data(),
        );
        evm_receipt(tx, token_messenger_v2(NetworkEnv::Mainnet), true, vec![log])
    }

    fn attestation_with_nonce(nonce_byte: u8) -> CompleteAttestation {
        let mut message = vec![0u8; 100];
        message[12..44].copy_from_slice(&[nonce_byte; 32]);
        CompleteAttestation {
            message: Bytes::from(message),
            attestation: Bytes::from(vec![0xbe, 0xef]),
            nonce: Some(FixedBytes::from([nonce_byte; 32])),
            mint_recipient: None,
        }
    }

    #[test]
    fn construction_requires_a_usdc_deployment() {
        let caller = Arc::new(MockEvmCaller::new(SIGNER));
        assert!(EvmBridge::new(BASE, NetworkEnv::Mainnet, caller.clone()).is_ok());
        assert!(matches!(
            EvmBridge::new(424242, NetworkEnv::Mainnet, caller),
            Err(CctpError::MissingUsdc { .. })
        ));
    }

    #[tokio::test]
    async fn burn_skips_approval_when_allowance_is_sufficient() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::from(5_000_000u64));
        caller.queue_send(burn_receipt_with_message(TxHash::from([1; 32]), 0x5a));

        let receipt = bridge.burn(&params(5_000_000)).await.unwrap();

        assert_eq!(receipt.approval_tx, None);
        assert_eq!(receipt.nonce, Some(FixedBytes::from([0x5a; 32])));
        assert_eq!(receipt.tx, UniversalTxHash::Evm(TxHash::from([1; 32])));

        let sent = caller.sent();
        assert_eq!(sent.len(), 1);
        let call = ITokenMessengerV2::depositForBurnCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(call.amount, U256::from(5_000_000u64));
        assert_eq!(call.destinationDomain, 5);
        assert_eq!(call.mintRecipient, RECIPIENT);
        assert_eq!(call.burnToken, usdc_address(BASE).unwrap());
        assert_eq!(call.destinationCaller, FixedBytes::<32>::ZERO);
        assert_eq!(call.maxFee, U256::from(100u64));
        assert_eq!(call.minFinalityThreshold, 1000);
    }

    #[tokio::test]
    async fn burn_approves_first_when_allowance_is_short() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ZERO);
        caller.queue_send(evm_receipt(
            TxHash::from([7; 32]),
            usdc_address(BASE).unwrap(),
            true,
            vec![],
        ));
        caller.queue_send(burn_receipt_with_message(TxHash::from([1; 32]), 0x5a));

        let receipt = bridge.burn(&params(5_000_000)).await.unwrap();

        assert_eq!(
            receipt.approval_tx,
            Some(UniversalTxHash::Evm(TxHash::from([7; 32])))
        );
        let sent = caller.sent();
        assert_eq!(sent.len(), 2);
        let approve = IERC20::approveCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(approve.spender, token_messenger_v2(NetworkEnv::Mainnet));
        assert_eq!(approve.value, U256::from(5_000_000u64));
    }

    #[tokio::test]
    async fn transfer_usdc_calls_the_token_contract_directly() {
        let (bridge, caller) = bridge();
        caller.queue_send(evm_receipt(
            TxHash::from([4; 32]),
            usdc_address(BASE).unwrap(),
            true,
            vec![],
        ));

        let to = address!("0x00000000000000000000000000000000000000bb");
        let tx = bridge
            .transfer_usdc(to, U256::from(250_000u64))
            .await
            .unwrap();
        assert_eq!(tx, UniversalTxHash::Evm(TxHash::from([4; 32])));

        let sent = caller.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].contract, usdc_address(BASE).unwrap());
        let call = IERC20::transferCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(call.to, to);
        assert_eq!(call.value, U256::from(250_000u64));
    }

    #[tokio::test]
    async fn burn_without_message_sent_event_is_an_error() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::from(5_000_000u64));
        caller.queue_send(evm_receipt(
            TxHash::from([1; 32]),
            token_messenger_v2(NetworkEnv::Mainnet),
            true,
            vec![],
        ));

        let err = bridge.burn(&params(5_000_000)).await.unwrap_err();
        assert!(matches!(err, CctpError::MessageSentEventNotFound { .. }));
    }

    #[tokio::test]
    async fn mint_short_circuits_when_nonce_is_already_consumed() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ONE);

        let outcome = bridge.mint(&attestation_with_nonce(0x5a)).await.unwrap();
        assert_eq!(outcome, MintOutcome::AlreadyMinted);
        assert_eq!(caller.sent_count(), 0);
    }

    #[tokio::test]
    async fn mint_submits_and_parses_the_mint_event() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ZERO);
        let event = ITokenMinterV2::MintAndWithdraw {
            mintRecipient: SIGNER,
            amount: U256::from(4_999_900u64),
            mintToken: usdc_address(BASE).unwrap(),
            feeCollected: U256::from(100u64),
        };
        let log = evm_log(address!("0xfd78EE919681417d192449715b2594ab58f5D002"), event.encode_log_data());
        caller.queue_send(evm_receipt(
            TxHash::from([2; 32]),
            message_transmitter_v2(NetworkEnv::Mainnet),
            true,
            vec![log],
        ));

        let outcome = bridge.mint(&attestation_with_nonce(0x5a)).await.unwrap();
        let MintOutcome::Minted(receipt) = outcome else {
            panic!("expected mint, got {outcome:?}");
        };
        assert_eq!(receipt.tx, UniversalTxHash::Evm(TxHash::from([2; 32])));
        assert_eq!(receipt.amount, Some(U256::from(4_999_900u64)));
        assert_eq!(receipt.fee_collected, Some(U256::from(100u64)));

        let sent = caller.sent();
        let call = IMessageTransmitterV2::receiveMessageCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(call.attestation, Bytes::from(vec![0xbe, 0xef]));
    }

    #[tokio::test]
    async fn mint_treats_nonce_revert_as_already_minted() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ZERO);
        caller.queue_send_failure("execution reverted: Nonce already used");

        let outcome = bridge.mint(&attestation_with_nonce(0x5a)).await.unwrap();
        assert_eq!(outcome, MintOutcome::AlreadyMinted);
    }

    #[tokio::test]
    async fn mint_verifies_on_chain_after_an_ambiguous_failure() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ZERO);
        caller.queue_send_failure("request timed out waiting for receipt");
        caller.queue_call_u256(U256::ONE);

        let outcome = bridge.mint(&attestation_with_nonce(0x5a)).await.unwrap();
        assert_eq!(outcome, MintOutcome::AlreadyMinted);
    }

    #[tokio::test]
    async fn mint_propagates_user_rejection_without_probing() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ZERO);
        caller.queue_send_failure("User rejected the request");

        let err = bridge.mint(&attestation_with_nonce(0x5a)).await.unwrap_err();
        assert!(err.to_string().contains("User rejected"));
    }

    #[tokio::test]
    async fn burn_status_maps_receipt_presence_and_outcome() {
        let (bridge, caller) = bridge();
        let confirmed = TxHash::from([1; 32]);
        let reverted = TxHash::from([2; 32]);
        caller.insert_receipt(evm_receipt(confirmed, Address::ZERO, true, vec![]));
        caller.insert_receipt(evm_receipt(reverted, Address::ZERO, false, vec![]));

        assert_eq!(bridge.burn_status(confirmed).await.unwrap(), BurnStatus::Confirmed);
        assert!(matches!(
            bridge.burn_status(reverted).await.unwrap(),
            BurnStatus::Failed { .. }
        ));
        assert_eq!(
            bridge.burn_status(TxHash::from([3; 32])).await.unwrap(),
            BurnStatus::Unconfirmed
        );
    }

    #[tokio::test]
    async fn burn_message_recovers_the_payload_from_an_old_receipt() {
        let (bridge, caller) = bridge();
        let tx = TxHash::from([9; 32]);
        caller.insert_receipt(burn_receipt_with_message(tx, 0x77));
        caller.insert_receipt(evm_receipt(TxHash::from([8; 32]), Address::ZERO, true, vec![]));

        let message = bridge.burn_message(tx).await.unwrap();
        assert_eq!(message_nonce(&message), Some(FixedBytes::from([0x77; 32])));

        let missing = bridge.burn_message(TxHash::from([7; 32])).await.unwrap_err();
        assert!(matches!(missing, CctpError::MessageSentEventNotFound { .. }));

        let eventless = bridge.burn_message(TxHash::from([8; 32])).await.unwrap_err();
        assert!(matches!(eventless, CctpError::MessageSentEventNotFound { .. }));
    }

    #[tokio::test]
    async fn v1_mint_requires_a_legacy_transmitter() {
        let caller = Arc::new(MockEvmCaller::new(SIGNER));
        let bridge = EvmBridge::new(UNICHAIN, NetworkEnv::Mainnet, caller).unwrap();
        let err = bridge
            .mint_v1(&Bytes::from(vec![0u8; 120]), &Bytes::from(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, CctpError::MissingV1Transmitter { .. }));
    }

    #[tokio::test]
    async fn v1_mint_checks_the_hashed_nonce_ledger() {
        let (bridge, caller) = bridge();
        caller.queue_call_u256(U256::ONE);

        let message = Bytes::from(vec![0u8; 120]);
        let outcome = bridge
            .mint_v1(&message, &Bytes::from(vec![1]))
            .await
            .unwrap();
        assert_eq!(outcome, MintOutcome::AlreadyMinted);
        assert_eq!(caller.sent_count(), 0);
    }

    #[test]
    fn v1_nonce_key_packs_domain_and_nonce() {
        let mut message = vec![0u8; 64];
        message[4..8].copy_from_slice(&0u32.to_be_bytes());
        message[12..20].copy_from_slice(&42u64.to_be_bytes());

        let mut packed = [0u8; 12];
        packed[..4].copy_from_slice(&0u32.to_be_bytes());
        packed[4..].copy_from_slice(&42u64.to_be_bytes());
        assert_eq!(v1_nonce_key(&message), Some(keccak256(packed)));
        assert_eq!(v1_nonce_key(&[0u8; 10]), None);
    }
}

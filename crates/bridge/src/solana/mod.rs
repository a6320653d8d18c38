//! Solana-side burn and mint executors.
//!
//! Burns are fire-and-forget: the transaction is signed and submitted, the
//! signature returned immediately, and the confirmation poller learns the
//! outcome. The message nonce is therefore unknown at burn time and is
//! recovered later from the attestation payload. Mints derive every account
//! from the attested message and check the used-nonce ledger on both sides
//! of submission.

pub mod caller;
pub mod pda;

use std::sync::Arc;

use alloy::primitives::FixedBytes;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_transaction_status::TransactionConfirmationStatus;
use tracing::{info, instrument, warn};

use crate::attestation::{
    CompleteAttestation, message_burn_token, message_mint_amount, message_nonce,
    message_source_domain,
};
use crate::chain::{ChainId, SolanaCluster, USDC_DECIMALS, solana_usdc_mint};
use crate::classify::{is_nonce_already_used, is_user_rejection};
use crate::confirm::BurnStatus;
use crate::solana::caller::{SolanaCaller, SolanaCallerError, load_lookup_table};
use crate::{BurnParams, BurnReceipt, CctpError, MintOutcome, MintReceipt, UniversalTxHash};

/// Byte offset of `fee_recipient` in the token messenger account:
/// discriminator, denylister, owner, pending_owner, message_body_version,
/// authority_bump precede it.
const FEE_RECIPIENT_OFFSET: usize = 8 + 32 * 3 + 4 + 1;

/// Executors for one Solana cluster.
pub struct SolanaBridge {
    cluster: SolanaCluster,
    usdc_mint: Pubkey,
    lookup_table: Option<Pubkey>,
    caller: Arc<dyn SolanaCaller>,
}

impl SolanaBridge {
    pub fn new(
        cluster: SolanaCluster,
        caller: Arc<dyn SolanaCaller>,
        lookup_table: Option<Pubkey>,
    ) -> Result<Self, CctpError> {
        let usdc_mint = solana_usdc_mint(cluster).ok_or(CctpError::MissingUsdc {
            chain: ChainId::Solana(cluster),
        })?;
        Ok(Self {
            cluster,
            usdc_mint,
            lookup_table,
            caller,
        })
    }

    pub fn cluster(&self) -> SolanaCluster {
        self.cluster
    }

    /// USDC balance of the signer's associated token account, zero when the
    /// account does not exist yet.
    pub async fn usdc_balance(&self) -> Result<u64, CctpError> {
        let ata = pda::associated_token_address(&self.caller.pubkey(), &self.usdc_mint);
        let Some(account) = self.caller.get_account(&ata).await? else {
            return Ok(0);
        };
        token_account_amount(&account.data).ok_or_else(|| {
            SolanaCallerError::MalformedAccount {
                what: "token account",
            }
            .into()
        })
    }

    /// Plain USDC transfer from the signer to `recipient`'s associated
    /// token account, creating the account when it does not exist yet.
    /// Carries the integrator fee, which never routes through the CCTP
    /// programs.
    #[instrument(skip_all, fields(cluster = %self.cluster, %recipient, amount))]
    pub async fn transfer_usdc(
        &self,
        recipient: Pubkey,
        amount: u64,
    ) -> Result<UniversalTxHash, CctpError> {
        let owner = self.caller.pubkey();
        let instructions = vec![
            pda::create_ata_idempotent_instruction(owner, recipient, self.usdc_mint),
            pda::transfer_checked_instruction(
                owner,
                recipient,
                self.usdc_mint,
                amount,
                USDC_DECIMALS,
            ),
        ];
        let signature = self
            .caller
            .send_transaction(instructions, vec![], vec![], "USDC transfer")
            .await?;
        info!(%signature, amount, "USDC transfer submitted");
        Ok(UniversalTxHash::Solana(signature))
    }

    /// Burns USDC toward the destination domain. Returns as soon as the
    /// transaction is accepted by the RPC node.
    #[instrument(skip_all, fields(cluster = %self.cluster, amount = %params.amount))]
    pub async fn burn(&self, params: &BurnParams) -> Result<BurnReceipt, CctpError> {
        let amount: u64 = params
            .amount
            .try_into()
            .map_err(|_| CctpError::AmountOverflow {
                amount: params.amount,
            })?;
        let max_fee: u64 = params
            .max_fee
            .try_into()
            .map_err(|_| CctpError::AmountOverflow {
                amount: params.max_fee,
            })?;

        // One-shot account the program writes the outbound message into.
        let event_keypair = Keypair::new();
        let instruction = pda::deposit_for_burn_instruction(
            self.caller.pubkey(),
            self.usdc_mint,
            event_keypair.pubkey(),
            amount,
            params.destination_domain,
            Pubkey::new_from_array(params.mint_recipient.0),
            max_fee,
            params.min_finality_threshold,
        )
        .map_err(SolanaCallerError::from)?;

        let signature = self
            .caller
            .send_transaction(
                vec![instruction],
                vec![],
                vec![event_keypair],
                "CCTP deposit for burn",
            )
            .await?;

        info!(%signature, "USDC burn submitted");
        Ok(BurnReceipt {
            tx: UniversalTxHash::Solana(signature),
            amount: params.amount,
            max_fee: params.max_fee,
            nonce: None,
            approval_tx: None,
        })
    }

    /// Whether the used-nonce ledger entry for this message exists.
    pub async fn nonce_used(&self, nonce: FixedBytes<32>) -> Result<bool, CctpError> {
        let entry = pda::used_nonce(&nonce.0);
        Ok(self.caller.get_account(&entry).await?.is_some())
    }

    /// Submits an attested message, minting USDC to `recipient`'s
    /// associated token account.
    #[instrument(skip_all, fields(cluster = %self.cluster, %recipient))]
    pub async fn mint(
        &self,
        attestation: &CompleteAttestation,
        recipient: Pubkey,
    ) -> Result<MintOutcome, CctpError> {
        let nonce = attestation
            .nonce
            .or_else(|| message_nonce(&attestation.message))
            .ok_or(CctpError::MalformedMessage)?;
        let source_domain =
            message_source_domain(&attestation.message).ok_or(CctpError::MalformedMessage)?;
        let remote_token =
            message_burn_token(&attestation.message).ok_or(CctpError::MalformedMessage)?;

        if self.nonce_used(nonce).await? {
            info!(%nonce, "Message nonce already consumed, skipping mint");
            return Ok(MintOutcome::AlreadyMinted);
        }

        let accounts = pda::ReceiveAccounts {
            nonce: nonce.0,
            source_domain,
            remote_token,
            recipient_token_account: pda::associated_token_address(&recipient, &self.usdc_mint),
            fee_recipient_token_account: self.fee_recipient_token_account().await?,
        };
        let instruction = pda::receive_message_instruction(
            self.caller.pubkey(),
            self.usdc_mint,
            &accounts,
            attestation.message.to_vec(),
            attestation.attestation.to_vec(),
        )
        .map_err(SolanaCallerError::from)?;

        let lookup_tables = match self.lookup_table {
            Some(table) => vec![load_lookup_table(self.caller.as_ref(), table).await?],
            None => vec![],
        };

        let submitted = self
            .caller
            .send_transaction(vec![instruction], lookup_tables, vec![], "CCTP receive message")
            .await;

        let signature = match submitted {
            Ok(signature) => signature,
            Err(err) => {
                let text = err.to_string();
                if is_nonce_already_used(&text) {
                    info!("Mint failed because the message was already received");
                    return Ok(MintOutcome::AlreadyMinted);
                }
                if !is_user_rejection(&text) {
                    if let Ok(true) = self.nonce_used(nonce).await {
                        warn!(%nonce, "Mint submission failed but the nonce ledger entry exists");
                        return Ok(MintOutcome::AlreadyMinted);
                    }
                }
                return Err(err.into());
            }
        };

        info!(%signature, "USDC mint submitted");
        Ok(MintOutcome::Minted(MintReceipt {
            tx: UniversalTxHash::Solana(signature),
            amount: message_mint_amount(&attestation.message),
            fee_collected: None,
        }))
    }

    /// Signature-status view of a submitted burn.
    pub async fn burn_status(&self, signature: &Signature) -> Result<BurnStatus, CctpError> {
        let Some(status) = self.caller.signature_status(signature).await? else {
            return Ok(BurnStatus::Unconfirmed);
        };
        if let Some(err) = status.err {
            return Ok(BurnStatus::Failed {
                reason: Some(err.to_string()),
            });
        }
        match status.confirmation_status {
            Some(
                TransactionConfirmationStatus::Confirmed | TransactionConfirmationStatus::Finalized,
            ) => Ok(BurnStatus::Confirmed),
            _ => Ok(BurnStatus::Unconfirmed),
        }
    }

    /// The protocol fee collector's token account, read from the token
    /// messenger's on-chain state.
    async fn fee_recipient_token_account(&self) -> Result<Pubkey, CctpError> {
        let messenger = pda::token_messenger();
        let account = self
            .caller
            .get_account(&messenger)
            .await?
            .ok_or(SolanaCallerError::AccountNotFound { address: messenger })?;
        let fee_recipient = account
            .data
            .get(FEE_RECIPIENT_OFFSET..FEE_RECIPIENT_OFFSET + 32)
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(Pubkey::new_from_array)
            .ok_or(SolanaCallerError::MalformedAccount {
                what: "token messenger",
            })?;
        Ok(pda::associated_token_address(&fee_recipient, &self.usdc_mint))
    }
}

/// Token amount of an SPL token account, little-endian u64 at offset 64.
fn token_account_amount(data: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = data.get(64..72)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

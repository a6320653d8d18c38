//! Transaction submission seam for Solana.
//!
//! [`SolanaCaller`] mirrors the EVM caller trait at Solana's natural grain:
//! account reads, signature status lookups, and versioned-transaction
//! submission. Submission is deliberately fire-and-forget; waiting on
//! confirmation here can hang indefinitely on a stalled subscription, so
//! outcome is learned later through the confirmation poller.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::account::Account;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{VersionedMessage, v0};
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionStatus;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SolanaCallerError {
    #[error("rpc client error: {0}")]
    Client(#[from] solana_client::client_error::ClientError),
    #[error("failed to compile transaction message: {0}")]
    Compile(#[from] solana_sdk::message::CompileError),
    #[error("failed to sign transaction: {0}")]
    Signer(#[from] solana_sdk::signer::SignerError),
    #[error("failed to encode instruction data: {0}")]
    Encode(#[from] std::io::Error),
    #[error("transaction is {size} bytes, over the {limit} byte packet limit")]
    TransactionTooLarge { size: usize, limit: usize },
    #[error("account {address} not found")]
    AccountNotFound { address: Pubkey },
    #[error("failed to deserialize {what} account data")]
    MalformedAccount { what: &'static str },
}

/// Minimal Solana access the bridge depends on.
#[async_trait]
pub trait SolanaCaller: Send + Sync {
    /// Fee payer and default authority for submitted transactions.
    fn pubkey(&self) -> Pubkey;

    /// Fetches an account at confirmed commitment, `None` if absent.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, SolanaCallerError>;

    /// Compiles, signs, and submits a v0 transaction without waiting for
    /// confirmation. `additional_signers` covers ephemeral keypairs such as
    /// the burn's message event account.
    async fn send_transaction(
        &self,
        instructions: Vec<Instruction>,
        lookup_tables: Vec<AddressLookupTableAccount>,
        additional_signers: Vec<Keypair>,
        note: &str,
    ) -> Result<Signature, SolanaCallerError>;

    /// Recent status of a submitted signature, `None` while unknown.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, SolanaCallerError>;
}

/// Signs with a local keypair and submits through the nonblocking RPC
/// client.
pub struct RpcSolanaCaller {
    client: RpcClient,
    keypair: Keypair,
}

impl RpcSolanaCaller {
    pub fn new(rpc_url: String, keypair: Keypair) -> Self {
        Self {
            client: RpcClient::new(rpc_url),
            keypair,
        }
    }
}

#[async_trait]
impl SolanaCaller for RpcSolanaCaller {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, SolanaCallerError> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await?;
        Ok(response.value)
    }

    async fn send_transaction(
        &self,
        instructions: Vec<Instruction>,
        lookup_tables: Vec<AddressLookupTableAccount>,
        additional_signers: Vec<Keypair>,
        note: &str,
    ) -> Result<Signature, SolanaCallerError> {
        let blockhash = self.client.get_latest_blockhash().await?;
        let message = v0::Message::try_compile(
            &self.keypair.pubkey(),
            &instructions,
            &lookup_tables,
            blockhash,
        )?;
        let message = VersionedMessage::V0(message);

        // `&dyn Signer` is not Send; scope the borrows so they end before
        // any await.
        let transaction = {
            let mut signers: Vec<&dyn Signer> = vec![&self.keypair];
            signers.extend(additional_signers.iter().map(|keypair| keypair as &dyn Signer));
            VersionedTransaction::try_new(message, &signers)?
        };

        // shortvec length prefix + 64 bytes per signature + message body
        let size = 1 + transaction.signatures.len() * 64 + transaction.message.serialize().len();
        if size > PACKET_DATA_SIZE {
            return Err(SolanaCallerError::TransactionTooLarge {
                size,
                limit: PACKET_DATA_SIZE,
            });
        }

        let signature = self.client.send_transaction(&transaction).await?;
        info!(%signature, note, "Transaction submitted");
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, SolanaCallerError> {
        let response = self.client.get_signature_statuses(&[*signature]).await?;
        Ok(response.value.into_iter().next().flatten())
    }
}

/// Loads and deserializes an address lookup table so large mint
/// transactions can reference accounts indirectly.
pub async fn load_lookup_table(
    caller: &dyn SolanaCaller,
    address: Pubkey,
) -> Result<AddressLookupTableAccount, SolanaCallerError> {
    let account = caller
        .get_account(&address)
        .await?
        .ok_or(SolanaCallerError::AccountNotFound { address })?;
    let table = solana_sdk::address_lookup_table::state::AddressLookupTable::deserialize(
        &account.data,
    )
    .map_err(|_| SolanaCallerError::MalformedAccount {
        what: "address lookup table",
    })?;
    Ok(AddressLookupTableAccount {
        key: address,
        addresses: table.addresses.to_vec(),
    })
}

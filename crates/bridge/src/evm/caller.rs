//! Transaction submission seam for EVM chains.
//!
//! [`EvmCaller`] is the narrow, object-safe surface the bridge needs from a
//! signing provider: view calls, sends, and receipt lookups. Production
//! wires [`RpcEvmCaller`] over an alloy provider with an embedded wallet;
//! tests script [`crate::mock::MockEvmCaller`].

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder, WalletProvider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::info;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum EvmCallerError {
    #[error("transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    #[error("failed to decode contract return data: {0}")]
    SolType(#[from] alloy::sol_types::Error),
    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: TxHash },
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(#[from] alloy::signers::k256::ecdsa::Error),
}

/// Minimal EVM access the bridge depends on.
#[async_trait]
pub trait EvmCaller: Send + Sync {
    /// Address transactions are signed and sent from.
    fn address(&self) -> Address;

    /// Executes `eth_call` against the given contract.
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmCallerError>;

    /// Signs and submits a transaction, waiting for inclusion. Returns the
    /// receipt or [`EvmCallerError::Reverted`] when the chain rejects it.
    async fn send(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TransactionReceipt, EvmCallerError>;

    /// Receipt for a previously submitted transaction, `None` while still
    /// pending.
    async fn receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, EvmCallerError>;
}

/// Executes a typed view call and decodes its return value.
pub async fn view<C: SolCall>(
    caller: &dyn EvmCaller,
    contract: Address,
    call: C,
) -> Result<C::Return, EvmCallerError> {
    let data = caller.call(contract, Bytes::from(call.abi_encode())).await?;
    Ok(C::abi_decode_returns(&data)?)
}

/// Signs with a raw private key and submits through an alloy provider.
pub struct RpcEvmCaller<P> {
    provider: P,
    required_confirmations: u64,
}

impl<P> RpcEvmCaller<P> {
    /// Wraps a provider that already carries a wallet filler (built with
    /// `ProviderBuilder::new().wallet(wallet).connect_http(...)`).
    pub fn new(provider: P, required_confirmations: u64) -> Self {
        Self {
            provider,
            required_confirmations,
        }
    }
}

/// Connects to an RPC endpoint with the given signer. One confirmation is
/// enough here; finality depth is the confirmation poller's concern.
pub fn connect(
    rpc_url: Url,
    signer: PrivateKeySigner,
) -> RpcEvmCaller<impl Provider + WalletProvider + Clone + Send + Sync + 'static> {
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url);
    RpcEvmCaller::new(provider, 1)
}

#[async_trait]
impl<P> EvmCaller for RpcEvmCaller<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        self.provider.default_signer_address()
    }

    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmCallerError> {
        let tx = TransactionRequest::default().to(contract).input(calldata.into());
        Ok(self.provider.call(tx).await?)
    }

    async fn send(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TransactionReceipt, EvmCallerError> {
        info!(%contract, note, "Submitting contract call");

        let tx = TransactionRequest::default().to(contract).input(calldata.into());
        let pending = self.provider.send_transaction(tx).await?;

        info!(tx_hash = %pending.tx_hash(), note, "Transaction submitted");

        let receipt = pending
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(EvmCallerError::Reverted {
                tx_hash: receipt.transaction_hash,
            });
        }

        info!(tx_hash = %receipt.transaction_hash, note, "Transaction confirmed");

        Ok(receipt)
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, EvmCallerError> {
        Ok(self.provider.get_transaction_receipt(tx).await?)
    }
}

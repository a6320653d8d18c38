//! Scripted callers for tests and dry runs.
//!
//! Both mocks record every submission and replay queued responses in order,
//! so a test can assert exactly which calldata or instructions an operation
//! produced without any chain behind it. Queued failure strings surface
//! through the same error types the real callers produce, which keeps the
//! error-classification paths honest.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::consensus::{Eip658Value, Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::primitives::{Address, Bytes, LogData, TxHash, U256};
use alloy::rpc::types::{Log, TransactionReceipt};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::account::Account;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_transaction_status::{TransactionConfirmationStatus, TransactionStatus};

use crate::evm::caller::{EvmCaller, EvmCallerError};
use crate::solana::caller::{SolanaCaller, SolanaCallerError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded [`EvmCaller::send`] invocation.
#[derive(Debug, Clone)]
pub struct SentCall {
    pub contract: Address,
    pub calldata: Bytes,
    pub note: String,
}

/// Scripted [`EvmCaller`] double.
pub struct MockEvmCaller {
    address: Address,
    calls: Mutex<VecDeque<Result<Bytes, String>>>,
    sends: Mutex<VecDeque<Result<TransactionReceipt, String>>>,
    receipts: Mutex<HashMap<TxHash, TransactionReceipt>>,
    sent: Mutex<Vec<SentCall>>,
}

impl MockEvmCaller {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            calls: Mutex::new(VecDeque::new()),
            sends: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queues raw return data for the next view call.
    pub fn queue_call(&self, returndata: Bytes) {
        lock(&self.calls).push_back(Ok(returndata));
    }

    /// Queues a single ABI word, the common case for uint256 views.
    pub fn queue_call_u256(&self, value: U256) {
        self.queue_call(Bytes::from(value.to_be_bytes::<32>().to_vec()));
    }

    pub fn queue_call_failure(&self, message: &str) {
        lock(&self.calls).push_back(Err(message.to_string()));
    }

    pub fn queue_send(&self, receipt: TransactionReceipt) {
        lock(&self.sends).push_back(Ok(receipt));
    }

    pub fn queue_send_failure(&self, message: &str) {
        lock(&self.sends).push_back(Err(message.to_string()));
    }

    /// Makes a receipt visible to [`EvmCaller::receipt`] lookups.
    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        lock(&self.receipts).insert(receipt.transaction_hash, receipt);
    }

    pub fn sent(&self) -> Vec<SentCall> {
        lock(&self.sent).clone()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }
}

#[async_trait]
impl EvmCaller for MockEvmCaller {
    fn address(&self) -> Address {
        self.address
    }

    async fn call(&self, _contract: Address, _calldata: Bytes) -> Result<Bytes, EvmCallerError> {
        match lock(&self.calls).pop_front() {
            Some(Ok(returndata)) => Ok(returndata),
            Some(Err(message)) => Err(TransportErrorKind::custom_str(&message).into()),
            None => Err(TransportErrorKind::custom_str("unscripted eth_call").into()),
        }
    }

    async fn send(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TransactionReceipt, EvmCallerError> {
        lock(&self.sent).push(SentCall {
            contract,
            calldata,
            note: note.to_string(),
        });
        match lock(&self.sends).pop_front() {
            Some(Ok(receipt)) => Ok(receipt),
            Some(Err(message)) => Err(TransportErrorKind::custom_str(&message).into()),
            None => Err(TransportErrorKind::custom_str("unscripted transaction").into()),
        }
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, EvmCallerError> {
        Ok(lock(&self.receipts).get(&tx).cloned())
    }
}

/// One recorded [`SolanaCaller::send_transaction`] invocation.
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub instructions: Vec<Instruction>,
    pub lookup_tables: Vec<AddressLookupTableAccount>,
    pub additional_signers: usize,
    pub note: String,
}

/// Scripted [`SolanaCaller`] double.
pub struct MockSolanaCaller {
    pubkey: Pubkey,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    account_scripts: Mutex<HashMap<Pubkey, VecDeque<Option<Account>>>>,
    sends: Mutex<VecDeque<Result<Signature, String>>>,
    statuses: Mutex<VecDeque<Option<TransactionStatus>>>,
    sent: Mutex<Vec<SentTransaction>>,
}

impl MockSolanaCaller {
    pub fn new(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            accounts: Mutex::new(HashMap::new()),
            account_scripts: Mutex::new(HashMap::new()),
            sends: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_account(&self, address: Pubkey, account: Account) {
        lock(&self.accounts).insert(address, account);
    }

    /// Scripts a one-shot response for one address, consulted before the
    /// standing account map. Lets a test change an account's visibility
    /// between reads within a single operation.
    pub fn queue_account(&self, address: Pubkey, account: Option<Account>) {
        lock(&self.account_scripts)
            .entry(address)
            .or_default()
            .push_back(account);
    }

    pub fn queue_send(&self, signature: Signature) {
        lock(&self.sends).push_back(Ok(signature));
    }

    pub fn queue_send_failure(&self, message: &str) {
        lock(&self.sends).push_back(Err(message.to_string()));
    }

    pub fn queue_status(&self, status: Option<TransactionStatus>) {
        lock(&self.statuses).push_back(status);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl SolanaCaller for MockSolanaCaller {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, SolanaCallerError> {
        if let Some(queue) = lock(&self.account_scripts).get_mut(address) {
            if let Some(scripted) = queue.pop_front() {
                return Ok(scripted);
            }
        }
        Ok(lock(&self.accounts).get(address).cloned())
    }

    async fn send_transaction(
        &self,
        instructions: Vec<Instruction>,
        lookup_tables: Vec<AddressLookupTableAccount>,
        additional_signers: Vec<Keypair>,
        note: &str,
    ) -> Result<Signature, SolanaCallerError> {
        lock(&self.sent).push(SentTransaction {
            instructions,
            lookup_tables,
            additional_signers: additional_signers.len(),
            note: note.to_string(),
        });
        match lock(&self.sends).pop_front() {
            Some(Ok(signature)) => Ok(signature),
            Some(Err(message)) => Err(ClientError::from(ClientErrorKind::Custom(message)).into()),
            None => Err(ClientError::from(ClientErrorKind::Custom(
                "unscripted transaction".to_string(),
            ))
            .into()),
        }
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<Option<TransactionStatus>, SolanaCallerError> {
        Ok(lock(&self.statuses).pop_front().flatten())
    }
}

/// Builds an RPC-shaped receipt with the given logs, for scripting mocks.
pub fn evm_receipt(
    tx: TxHash,
    to: Address,
    success: bool,
    logs: Vec<Log>,
) -> TransactionReceipt {
    TransactionReceipt {
        inner: ReceiptEnvelope::Eip1559(ReceiptWithBloom {
            receipt: Receipt {
                status: Eip658Value::Eip658(success),
                cumulative_gas_used: 100_000,
                logs,
            },
            logs_bloom: Default::default(),
        }),
        transaction_hash: tx,
        transaction_index: Some(0),
        block_hash: None,
        block_number: Some(1),
        gas_used: 50_000,
        effective_gas_price: 1_000_000_000,
        blob_gas_used: None,
        blob_gas_price: None,
        from: Address::ZERO,
        to: Some(to),
        contract_address: None,
    }
}

/// Wraps event data into an RPC-shaped log.
pub fn evm_log(address: Address, data: LogData) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: None,
        block_number: Some(1),
        block_timestamp: None,
        transaction_hash: None,
        transaction_index: Some(0),
        log_index: Some(0),
        removed: false,
    }
}

pub fn confirmed_status() -> TransactionStatus {
    TransactionStatus {
        slot: 1,
        confirmations: Some(1),
        status: Ok(()),
        err: None,
        confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
    }
}

pub fn finalized_status() -> TransactionStatus {
    TransactionStatus {
        slot: 1,
        confirmations: None,
        status: Ok(()),
        err: None,
        confirmation_status: Some(TransactionConfirmationStatus::Finalized),
    }
}

pub fn processed_status() -> TransactionStatus {
    TransactionStatus {
        slot: 1,
        confirmations: Some(0),
        status: Ok(()),
        err: None,
        confirmation_status: Some(TransactionConfirmationStatus::Processed),
    }
}

pub fn failed_status() -> TransactionStatus {
    let err = solana_sdk::transaction::TransactionError::InstructionError(
        0,
        solana_sdk::instruction::InstructionError::Custom(1),
    );
    TransactionStatus {
        slot: 1,
        confirmations: Some(1),
        status: Err(err.clone()),
        err: Some(err),
        confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
    }
}

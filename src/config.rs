//! Configuration: CLI paths, TOML files, and runtime context assembly.
//!
//! Settings are split across two files so credentials never sit next to
//! tunables: a plaintext config TOML and a secrets TOML holding signing
//! keys. [`Ctx`] is the assembled runtime view; [`Ctx::engine`] turns it
//! into a fully wired [`TransferEngine`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{FixedBytes, U256};
use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use tracing::Level;
use url::Url;

use ferry_bridge::attestation::{AttestationClient, AttestationPollConfig};
use ferry_bridge::chain::{
    ChainError, ChainId, NetworkEnv, TransferSpeed, USDC_DECIMALS, default_rpc_url,
    solana_cluster, supported_chains,
};
use ferry_bridge::confirm::ConfirmPollConfig;
use ferry_bridge::evm::caller::connect;
use ferry_bridge::solana::caller::RpcSolanaCaller;
use ferry_bridge::validate::{AddressError, AmountBounds, AmountError, validate_amount};
use ferry_bridge::{CctpBridge, CctpError, UniversalAddress};

use crate::retry::RetryPolicy;
use crate::transfer::{IntegratorFee, TransferEngine};

const DEFAULT_STATE_DIR: &str = ".ferry";

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long, default_value = "ferry.toml")]
    pub config: PathBuf,
    /// Path to TOML secrets file holding signing keys
    #[clap(long, default_value = "ferry.secrets.toml")]
    pub secrets: PathBuf,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
struct Config {
    network: NetworkEnv,
    log_level: Option<LogLevel>,
    state_dir: Option<PathBuf>,
    speed: Option<TransferSpeed>,
    /// Static transfer limits in human USDC, e.g. `"0.5"`.
    min_amount: Option<String>,
    max_amount: Option<String>,
    /// RPC endpoint overrides keyed by EVM chain id or Solana cluster name.
    rpc: Option<HashMap<String, Url>>,
    confirmation: Option<ConfirmationSection>,
    attestation: Option<AttestationSection>,
    retry: Option<RetrySection>,
    solana: Option<SolanaSection>,
    integrator: Option<IntegratorSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfirmationSection {
    enabled: Option<bool>,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AttestationSection {
    /// Alternative attestation service host, mostly for testing.
    url: Option<Url>,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
    max_not_found: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrySection {
    max_retries: Option<usize>,
    base_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SolanaSection {
    /// Address lookup table for oversized mint transactions, base58.
    lookup_table: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IntegratorSection {
    /// Flat per-transfer fee in human USDC, e.g. `"0.1"`.
    fee: Option<String>,
    /// Fee destination, in that ecosystem's native address format.
    recipient: Option<String>,
}

/// Secret credentials deserialized from the secrets TOML. Each key is
/// optional; only chains with a key present get registered, so a process
/// carries exactly the credentials it needs.
#[derive(Deserialize)]
struct Secrets {
    evm_private_key: Option<FixedBytes<32>>,
    /// The 64-byte array `solana-keygen` writes.
    solana_keypair: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        (*log_level).into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error("failed to derive a signer from evm_private_key")]
    PrivateKeyDerivation(#[source] alloy::signers::k256::ecdsa::Error),
    #[error("solana_keypair must be the 64-byte array solana-keygen writes")]
    MalformedSolanaKeypair,
    #[error("solana lookup_table is not a valid base58 pubkey: {value}")]
    MalformedLookupTable { value: String },
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("no default RPC endpoint for {chain}, set one under [rpc]")]
    MissingRpcUrl { chain: ChainId },
    #[error("invalid {field}: {source}")]
    InvalidAmountBound {
        field: &'static str,
        #[source]
        source: AmountError,
    },
    #[error("min_amount exceeds max_amount")]
    InvertedAmountBounds,
    #[error("[integrator] needs both fee and recipient")]
    IncompleteIntegratorFee,
    #[error("integrator recipient is not a valid address")]
    MalformedIntegratorRecipient(#[source] AddressError),
    #[error("secrets configure no signing keys")]
    NoSigningKeys,
    #[error(transparent)]
    Bridge(#[from] CctpError),
}

/// Combined runtime context assembled from the config and secrets TOMLs.
pub struct Ctx {
    pub log_level: LogLevel,
    network: NetworkEnv,
    speed: TransferSpeed,
    state_dir: PathBuf,
    bounds: AmountBounds,
    confirm: Option<ConfirmPollConfig>,
    attestation_poll: AttestationPollConfig,
    attestation_url: Option<Url>,
    retry: RetryPolicy,
    rpc_overrides: HashMap<ChainId, Url>,
    lookup_table: Option<Pubkey>,
    integrator: Option<IntegratorFee>,
    evm_key: Option<PrivateKeySigner>,
    solana_keypair: Option<Keypair>,
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        let secrets_str = std::fs::read_to_string(secrets)?;
        Self::from_toml(&config_str, &secrets_str)
    }

    pub fn from_toml(config_toml: &str, secrets_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Secrets = toml::from_str(secrets_toml)?;

        let evm_key = secrets
            .evm_private_key
            .map(|key| PrivateKeySigner::from_bytes(&key))
            .transpose()
            .map_err(ConfigError::PrivateKeyDerivation)?;
        let solana_keypair = secrets
            .solana_keypair
            .map(|bytes| {
                Keypair::try_from(bytes.as_slice())
                    .map_err(|_| ConfigError::MalformedSolanaKeypair)
            })
            .transpose()?;
        if evm_key.is_none() && solana_keypair.is_none() {
            return Err(ConfigError::NoSigningKeys);
        }

        let mut rpc_overrides = HashMap::new();
        for (key, url) in config.rpc.unwrap_or_default() {
            rpc_overrides.insert(key.parse::<ChainId>()?, url);
        }

        let lookup_table = config
            .solana
            .unwrap_or_default()
            .lookup_table
            .map(|value| {
                Pubkey::from_str(&value)
                    .map_err(|_| ConfigError::MalformedLookupTable { value })
            })
            .transpose()?;

        let min = parse_bound(config.min_amount.as_deref(), "min_amount")?;
        let max = parse_bound(config.max_amount.as_deref(), "max_amount")?;
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ConfigError::InvertedAmountBounds);
            }
        }
        let integrator = assemble_integrator(config.integrator)?;

        let confirm = assemble_confirm(config.confirmation);
        let attestation = config.attestation.unwrap_or_default();
        let poll_defaults = AttestationPollConfig::default();
        let attestation_poll = AttestationPollConfig {
            interval: attestation
                .interval_secs
                .map_or(poll_defaults.interval, Duration::from_secs),
            timeout: attestation
                .timeout_secs
                .map_or(poll_defaults.timeout, Duration::from_secs),
            max_not_found: attestation
                .max_not_found
                .unwrap_or(poll_defaults.max_not_found),
        };
        let retry_section = config.retry.unwrap_or_default();
        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: retry_section
                .max_retries
                .unwrap_or(retry_defaults.max_retries),
            base_delay: retry_section
                .base_delay_secs
                .map_or(retry_defaults.base_delay, Duration::from_secs),
        };

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            network: config.network,
            speed: config.speed.unwrap_or_default(),
            state_dir: config
                .state_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            bounds: AmountBounds {
                min,
                max,
                balance: None,
            },
            confirm,
            attestation_poll,
            attestation_url: attestation.url,
            retry,
            rpc_overrides,
            lookup_table,
            integrator,
            evm_key,
            solana_keypair,
        })
    }

    pub fn network(&self) -> NetworkEnv {
        self.network
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Wires a [`TransferEngine`] from this context: one bridge runtime per
    /// chain a signing key covers, public RPC defaults unless overridden.
    pub fn engine(&self) -> Result<TransferEngine, ConfigError> {
        let attestation = match &self.attestation_url {
            Some(url) => AttestationClient::with_base_url(self.network, url.clone()),
            None => AttestationClient::new(self.network).map_err(CctpError::from)?,
        };
        let mut bridge = CctpBridge::with_attestation(self.network, self.speed, attestation);

        if let Some(signer) = &self.evm_key {
            for chain in supported_chains(self.network) {
                let ChainId::Evm(chain_id) = chain else {
                    continue;
                };
                let url = self.rpc_url(chain)?;
                bridge.register_evm(chain_id, Arc::new(connect(url, signer.clone())))?;
            }
        }
        if let Some(keypair) = &self.solana_keypair {
            let cluster = solana_cluster(self.network);
            let url = self.rpc_url(ChainId::Solana(cluster))?;
            let caller = RpcSolanaCaller::new(url.to_string(), keypair.insecure_clone());
            bridge.register_solana(cluster, Arc::new(caller), self.lookup_table)?;
        }

        Ok(TransferEngine::new(bridge)
            .with_amount_bounds(self.bounds)
            .with_confirm(self.confirm)
            .with_attestation_poll(self.attestation_poll)
            .with_retry(self.retry)
            .with_integrator_fee(self.integrator))
    }

    fn rpc_url(&self, chain: ChainId) -> Result<Url, ConfigError> {
        if let Some(url) = self.rpc_overrides.get(&chain) {
            return Ok(url.clone());
        }
        default_rpc_url(chain)
            .and_then(|raw| Url::parse(raw).ok())
            .ok_or(ConfigError::MissingRpcUrl { chain })
    }
}

fn assemble_confirm(section: Option<ConfirmationSection>) -> Option<ConfirmPollConfig> {
    let section = section.unwrap_or_default();
    if section.enabled == Some(false) {
        return None;
    }
    let defaults = ConfirmPollConfig::default();
    Some(ConfirmPollConfig {
        interval: section
            .interval_secs
            .map_or(defaults.interval, Duration::from_secs),
        timeout: section
            .timeout_secs
            .map_or(defaults.timeout, Duration::from_secs),
    })
}

fn parse_bound(input: Option<&str>, field: &'static str) -> Result<Option<U256>, ConfigError> {
    input
        .map(|raw| {
            validate_amount(raw, USDC_DECIMALS, AmountBounds::default())
                .map_err(|source| ConfigError::InvalidAmountBound { field, source })
        })
        .transpose()
}

/// Fee and recipient come as a pair; a zero fee disables the charge.
fn assemble_integrator(
    section: Option<IntegratorSection>,
) -> Result<Option<IntegratorFee>, ConfigError> {
    let section = section.unwrap_or_default();
    let (fee, recipient) = match (section.fee, section.recipient) {
        (None, None) => return Ok(None),
        (Some(fee), Some(recipient)) => (fee, recipient),
        _ => return Err(ConfigError::IncompleteIntegratorFee),
    };
    let amount = validate_amount(&fee, USDC_DECIMALS, AmountBounds::default()).map_err(|source| {
        ConfigError::InvalidAmountBound {
            field: "integrator.fee",
            source,
        }
    })?;
    if amount.is_zero() {
        return Ok(None);
    }
    let recipient: UniversalAddress = recipient
        .parse()
        .map_err(ConfigError::MalformedIntegratorRecipient)?;
    Ok(Some(IntegratorFee { amount, recipient }))
}

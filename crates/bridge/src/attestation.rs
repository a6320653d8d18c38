//! Client for Circle's attestation service (Iris).
//!
//! After a burn, the service observes the source-chain event, waits for the
//! requested finality, and signs the cross-chain message. This client
//! normalizes the service's responses into [`AttestationStatus`] and owns
//! the polling loop that waits for a signature, including the bound on how
//! long a message may stay invisible before the transfer is declared lost.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Bytes, FixedBytes, U256};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::UniversalTxHash;
use crate::chain::{ChainError, ChainId, FAST_TRANSFER_THRESHOLD, NetworkEnv, domain_of};

const IRIS_MAINNET: &str = "https://iris-api.circle.com";
const IRIS_TESTNET: &str = "https://iris-api-sandbox.circle.com";

/// Cross-chain messages shorter than this cannot carry a nonce.
const MIN_MESSAGE_LENGTH: usize = 44;

/// A signed attestation ready to be submitted to the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteAttestation {
    /// The raw cross-chain message emitted by the source transmitter.
    pub message: Bytes,
    /// The attestation signature over `message`.
    pub attestation: Bytes,
    /// Message nonce, the idempotency key for duplicate-mint detection.
    pub nonce: Option<FixedBytes<32>>,
    /// Recipient the destination transmitter will mint to, when the service
    /// decoded it.
    pub mint_recipient: Option<FixedBytes<32>>,
}

/// Normalized state of one burn in the attestation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatus {
    /// The service has seen the burn but finality is not yet reached.
    Pending,
    /// Signed and ready to mint.
    Complete(CompleteAttestation),
    /// The service does not know the burn. Transient early in a transfer's
    /// life; terminal if it persists past [`AttestationPollConfig::max_not_found`].
    NotFound,
}

/// State of a legacy V1 attestation, keyed by message hash instead of burn
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V1AttestationStatus {
    Pending,
    Complete(Bytes),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("attestation service returned {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
    #[error("attestation field {field} is not valid hex: {value:?}")]
    MalformedField { field: &'static str, value: String },
    #[error("no fee quote at or below finality threshold {threshold} for domains {source_domain} -> {destination}")]
    MissingFeeQuote {
        source_domain: u32,
        destination: u32,
        threshold: u32,
    },
    #[error("burn was never observed by the attestation service after {polls} probes")]
    MessageNeverAppeared { polls: u32 },
    #[error("timed out waiting for attestation after {waited_secs}s")]
    Timeout { waited_secs: u64 },
}

impl AttestationError {
    /// Transient errors are tolerated by the polling loop until its
    /// deadline; everything else aborts immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::UnexpectedStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

/// Cadence and bounds for [`AttestationClient::wait_for_attestation`].
#[derive(Debug, Clone, Copy)]
pub struct AttestationPollConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive `not_found` probes before the burn is declared never
    /// observed. Reset by any `pending` response.
    pub max_not_found: u32,
}

impl Default for AttestationPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
            max_not_found: 10,
        }
    }
}

/// HTTP client for the attestation service, environment-pinned.
#[derive(Debug, Clone)]
pub struct AttestationClient {
    client: reqwest::Client,
    base_url: Url,
    env: NetworkEnv,
}

impl AttestationClient {
    pub fn new(env: NetworkEnv) -> Result<Self, AttestationError> {
        let host = match env {
            NetworkEnv::Mainnet => IRIS_MAINNET,
            NetworkEnv::Testnet => IRIS_TESTNET,
        };
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: Url::parse(host)?,
            env,
        })
    }

    /// Points the client at an alternative host. Used by tests.
    pub fn with_base_url(env: NetworkEnv, base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            env,
        }
    }

    /// Fetches the attestation state for a burn transaction on V2.
    #[instrument(skip(self), fields(%source, %burn_tx))]
    pub async fn fetch(
        &self,
        source: ChainId,
        burn_tx: &UniversalTxHash,
    ) -> Result<AttestationStatus, AttestationError> {
        let domain = domain_of(source, self.env).ok_or(ChainError::UnsupportedChain {
            chain: source,
            env: self.env,
        })?;
        let mut url = self.base_url.join(&format!("v2/messages/{domain}"))?;
        url.query_pairs_mut()
            .append_pair("transactionHash", &burn_tx.to_string());

        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(AttestationStatus::NotFound);
        }
        if !response.status().is_success() {
            return Err(AttestationError::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let body: MessagesResponse = response.json().await?;
        let Some(message) = body.messages.into_iter().next() else {
            return Ok(AttestationStatus::NotFound);
        };
        normalize_v2_message(message)
    }

    /// Fetches a legacy V1 attestation by message hash.
    #[instrument(skip(self), fields(%message_hash))]
    pub async fn fetch_v1(
        &self,
        message_hash: FixedBytes<32>,
    ) -> Result<V1AttestationStatus, AttestationError> {
        let url = self
            .base_url
            .join(&format!("v1/attestations/{message_hash}"))?;
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(V1AttestationStatus::NotFound);
        }
        if !response.status().is_success() {
            return Err(AttestationError::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let body: V1AttestationResponse = response.json().await?;
        match body.attestation.as_deref() {
            Some(hex) if body.status == "complete" && hex != "PENDING" => {
                let attestation = parse_hex_field("attestation", hex)?;
                Ok(V1AttestationStatus::Complete(attestation))
            }
            _ => Ok(V1AttestationStatus::Pending),
        }
    }

    /// Quotes the fast-transfer fee in basis points for a domain pair.
    #[instrument(skip(self))]
    pub async fn fast_transfer_fee_bps(
        &self,
        source_domain: u32,
        destination_domain: u32,
    ) -> Result<u64, AttestationError> {
        let url = self.base_url.join(&format!(
            "v2/burn/USDC/fees/{source_domain}/{destination_domain}"
        ))?;
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(AttestationError::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let quotes: Vec<FeeQuote> = response.json().await?;
        quotes
            .into_iter()
            .filter(|quote| quote.finality_threshold <= FAST_TRANSFER_THRESHOLD)
            .max_by_key(|quote| quote.finality_threshold)
            .map(|quote| quote.minimum_fee)
            .ok_or(AttestationError::MissingFeeQuote {
                source_domain,
                destination: destination_domain,
                threshold: FAST_TRANSFER_THRESHOLD,
            })
    }

    /// Polls until the attestation is complete, honoring the configured
    /// timeout and the consecutive-not-found bound.
    ///
    /// Transient service errors count as ordinary ticks so a flaky gateway
    /// does not abort a transfer that only needs patience.
    #[instrument(skip(self, config), fields(%source, %burn_tx))]
    pub async fn wait_for_attestation(
        &self,
        source: ChainId,
        burn_tx: &UniversalTxHash,
        config: &AttestationPollConfig,
    ) -> Result<CompleteAttestation, AttestationError> {
        let started = Instant::now();
        let deadline = started + config.timeout;
        let mut consecutive_not_found = 0u32;
        loop {
            match self.fetch(source, burn_tx).await {
                Ok(AttestationStatus::Complete(attestation)) => {
                    debug!(elapsed_secs = started.elapsed().as_secs(), "attestation complete");
                    return Ok(attestation);
                }
                Ok(AttestationStatus::Pending) => {
                    consecutive_not_found = 0;
                }
                Ok(AttestationStatus::NotFound) => {
                    consecutive_not_found += 1;
                    if consecutive_not_found >= config.max_not_found {
                        return Err(AttestationError::MessageNeverAppeared {
                            polls: consecutive_not_found,
                        });
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(%err, "transient attestation service error, will re-poll");
                }
                Err(err) => return Err(err),
            }

            if Instant::now() + config.interval > deadline {
                return Err(AttestationError::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(config.interval).await;
        }
    }

    /// V1 counterpart of [`Self::wait_for_attestation`], keyed by message
    /// hash. Resumed legacy transfers have usually been attested long ago,
    /// so this loop mostly exists for the rare burn still inside its
    /// finality window.
    #[instrument(skip(self, config), fields(%message_hash))]
    pub async fn wait_for_v1_attestation(
        &self,
        message_hash: FixedBytes<32>,
        config: &AttestationPollConfig,
    ) -> Result<Bytes, AttestationError> {
        let started = Instant::now();
        let deadline = started + config.timeout;
        let mut consecutive_not_found = 0u32;
        loop {
            match self.fetch_v1(message_hash).await {
                Ok(V1AttestationStatus::Complete(attestation)) => {
                    debug!(elapsed_secs = started.elapsed().as_secs(), "V1 attestation complete");
                    return Ok(attestation);
                }
                Ok(V1AttestationStatus::Pending) => {
                    consecutive_not_found = 0;
                }
                Ok(V1AttestationStatus::NotFound) => {
                    consecutive_not_found += 1;
                    if consecutive_not_found >= config.max_not_found {
                        return Err(AttestationError::MessageNeverAppeared {
                            polls: consecutive_not_found,
                        });
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(%err, "transient attestation service error, will re-poll");
                }
                Err(err) => return Err(err),
            }

            if Instant::now() + config.interval > deadline {
                return Err(AttestationError::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(config.interval).await;
        }
    }
}

/// Byte length of the V2 message header; the burn body starts here.
const MESSAGE_HEADER_LENGTH: usize = 148;

/// Extracts the nonce from a V2 cross-chain message: bytes 12..44 of the
/// header. `None` for messages too short to carry one.
pub fn message_nonce(message: &[u8]) -> Option<FixedBytes<32>> {
    if message.len() < MIN_MESSAGE_LENGTH {
        return None;
    }
    message.get(12..44).map(FixedBytes::from_slice)
}

/// Source domain from the V2 message header.
pub fn message_source_domain(message: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = message.get(4..8)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Burn token of the source chain, from the V2 burn body. Seeds the
/// destination's token-pair lookup.
pub fn message_burn_token(message: &[u8]) -> Option<[u8; 32]> {
    message
        .get(MESSAGE_HEADER_LENGTH + 4..MESSAGE_HEADER_LENGTH + 36)?
        .try_into()
        .ok()
}

/// Burned amount from the V2 burn body, before any fast-transfer fee.
pub fn message_mint_amount(message: &[u8]) -> Option<U256> {
    message
        .get(MESSAGE_HEADER_LENGTH + 68..MESSAGE_HEADER_LENGTH + 100)
        .map(U256::from_be_slice)
}

/// Maximum fee the burn authorizes the protocol to take, from a
/// basis-point quote.
pub fn max_fee_from_bps(amount: U256, fee_bps: u64) -> U256 {
    amount * U256::from(fee_bps) / U256::from(10_000u64)
}

fn normalize_v2_message(message: IrisMessage) -> Result<AttestationStatus, AttestationError> {
    let complete = message.status.as_deref() == Some("complete");
    let attestation_ready = message
        .attestation
        .as_deref()
        .is_some_and(|hex| hex != "PENDING");
    let (Some(raw_message), Some(raw_attestation)) = (&message.message, &message.attestation)
    else {
        return Ok(AttestationStatus::Pending);
    };
    if !complete || !attestation_ready {
        return Ok(AttestationStatus::Pending);
    }

    let message_bytes = parse_hex_field("message", raw_message)?;
    let attestation = parse_hex_field("attestation", raw_attestation)?;
    let nonce = match message.event_nonce.as_deref() {
        Some(hex) if hex.len() == 66 => FixedBytes::from_str(hex).ok(),
        _ => None,
    }
    .or_else(|| message_nonce(&message_bytes));
    let mint_recipient = message
        .decoded_message
        .and_then(|decoded| decoded.decoded_message_body)
        .and_then(|body| body.mint_recipient)
        .and_then(|hex| FixedBytes::from_str(&hex).ok());

    Ok(AttestationStatus::Complete(CompleteAttestation {
        message: message_bytes,
        attestation,
        nonce,
        mint_recipient,
    }))
}

fn parse_hex_field(field: &'static str, value: &str) -> Result<Bytes, AttestationError> {
    Bytes::from_str(value).map_err(|_| AttestationError::MalformedField {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<IrisMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IrisMessage {
    status: Option<String>,
    message: Option<String>,
    attestation: Option<String>,
    event_nonce: Option<String>,
    decoded_message: Option<DecodedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodedMessage {
    decoded_message_body: Option<DecodedMessageBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodedMessageBody {
    mint_recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
struct V1AttestationResponse {
    status: String,
    attestation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeQuote {
    finality_threshold: u32,
    minimum_fee: u64,
}

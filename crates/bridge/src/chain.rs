//! Chain identity, CCTP domain mapping, and per-chain static metadata.
//!
//! Every chain-aware operation in the engine starts here: a [`ChainId`] is
//! classified into its ecosystem with [`ChainId::kind`] (total, no errors),
//! then resolved against the environment-versioned tables for its CCTP
//! domain, contract addresses, confirmation profile, and explorer.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// USDC uses 6 decimals on every chain CCTP supports.
pub const USDC_DECIMALS: u8 = 6;

/// Finality threshold requesting a fast (soft-finality) transfer.
pub const FAST_TRANSFER_THRESHOLD: u32 = 1000;

/// Finality threshold requesting a standard (hard-finality) transfer.
pub const STANDARD_TRANSFER_THRESHOLD: u32 = 2000;

/// CCTP domain of Solana in both environments.
pub const SOLANA_DOMAIN: u32 = 5;

pub const ETHEREUM: u64 = 1;
pub const AVALANCHE: u64 = 43114;
pub const OPTIMISM: u64 = 10;
pub const ARBITRUM: u64 = 42161;
pub const BASE: u64 = 8453;
pub const POLYGON: u64 = 137;
pub const UNICHAIN: u64 = 130;

pub const SEPOLIA: u64 = 11155111;
pub const AVALANCHE_FUJI: u64 = 43113;
pub const OPTIMISM_SEPOLIA: u64 = 11155420;
pub const ARBITRUM_SEPOLIA: u64 = 421614;
pub const BASE_SEPOLIA: u64 = 84532;
pub const POLYGON_AMOY: u64 = 80002;
pub const UNICHAIN_SEPOLIA: u64 = 1301;

/// Network environment selecting which side of every static table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEnv {
    Mainnet,
    Testnet,
}

impl FromStr for NetworkEnv {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(ChainError::UnknownEnvironment {
                value: other.to_string(),
            }),
        }
    }
}

/// Solana cluster identifiers, the string half of [`ChainId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolanaCluster {
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
    #[serde(rename = "devnet")]
    Devnet,
    #[serde(rename = "testnet")]
    Testnet,
}

impl SolanaCluster {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for SolanaCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chain identifier: numeric EVM chain id or Solana cluster name.
///
/// Serialized untagged so persisted records keep the natural JSON form
/// (`8453` vs `"mainnet-beta"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainId {
    Evm(u64),
    Solana(SolanaCluster),
}

/// The two execution ecosystems the engine dispatches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Solana,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
            Self::Solana => f.write_str("solana"),
        }
    }
}

impl ChainId {
    /// Classifies this chain into its ecosystem. Total: every value of
    /// [`ChainId`] has a kind, unsupported chains included.
    pub const fn kind(self) -> ChainKind {
        match self {
            Self::Evm(_) => ChainKind::Evm,
            Self::Solana(_) => ChainKind::Solana,
        }
    }

    /// Human-readable chain name for logs and user-facing output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Evm(ETHEREUM) => "Ethereum",
            Self::Evm(AVALANCHE) => "Avalanche",
            Self::Evm(OPTIMISM) => "Optimism",
            Self::Evm(ARBITRUM) => "Arbitrum",
            Self::Evm(BASE) => "Base",
            Self::Evm(POLYGON) => "Polygon",
            Self::Evm(UNICHAIN) => "Unichain",
            Self::Evm(SEPOLIA) => "Ethereum Sepolia",
            Self::Evm(AVALANCHE_FUJI) => "Avalanche Fuji",
            Self::Evm(OPTIMISM_SEPOLIA) => "Optimism Sepolia",
            Self::Evm(ARBITRUM_SEPOLIA) => "Arbitrum Sepolia",
            Self::Evm(BASE_SEPOLIA) => "Base Sepolia",
            Self::Evm(POLYGON_AMOY) => "Polygon Amoy",
            Self::Evm(UNICHAIN_SEPOLIA) => "Unichain Sepolia",
            Self::Evm(_) => "Unknown EVM chain",
            Self::Solana(_) => "Solana",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm(id) => write!(f, "{id}"),
            Self::Solana(cluster) => f.write_str(cluster.as_str()),
        }
    }
}

impl FromStr for ChainId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" => Ok(Self::Solana(SolanaCluster::MainnetBeta)),
            "devnet" => Ok(Self::Solana(SolanaCluster::Devnet)),
            "solana-testnet" => Ok(Self::Solana(SolanaCluster::Testnet)),
            other => other
                .parse::<u64>()
                .map(Self::Evm)
                .map_err(|_| ChainError::UnknownChainId {
                    value: other.to_string(),
                }),
        }
    }
}

/// User-selectable transfer speed, deciding the finality threshold the burn
/// requests and whether a fast-transfer fee applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferSpeed {
    #[default]
    Fast,
    Standard,
}

impl TransferSpeed {
    pub const fn min_finality_threshold(self) -> u32 {
        match self {
            Self::Fast => FAST_TRANSFER_THRESHOLD,
            Self::Standard => STANDARD_TRANSFER_THRESHOLD,
        }
    }
}

impl FromStr for TransferSpeed {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Self::Fast),
            "standard" => Ok(Self::Standard),
            other => Err(ChainError::UnknownTransferSpeed {
                value: other.to_string(),
            }),
        }
    }
}

/// Expected time-to-finality for one chain at one speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationProfile {
    /// Blocks (EVM) or slots (Solana) until the burn reaches the requested
    /// finality.
    pub blocks: u32,
    /// Wall-clock estimate in seconds, used for polling deadlines and ETAs.
    pub seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("unknown chain id: {value}")]
    UnknownChainId { value: String },
    #[error("unknown network environment: {value} (expected mainnet or testnet)")]
    UnknownEnvironment { value: String },
    #[error("unknown transfer speed: {value} (expected fast or standard)")]
    UnknownTransferSpeed { value: String },
    #[error("chain {chain} is not supported on {env:?}")]
    UnsupportedChain { chain: ChainId, env: NetworkEnv },
}

/// CCTP domain of a chain under the given environment.
///
/// `None` means the chain is not bridgeable in that environment. Callers
/// must treat it as "operation unsupported", never as domain zero.
pub const fn domain_of(chain: ChainId, env: NetworkEnv) -> Option<u32> {
    match (env, chain) {
        (NetworkEnv::Mainnet, ChainId::Evm(ETHEREUM))
        | (NetworkEnv::Testnet, ChainId::Evm(SEPOLIA)) => Some(0),
        (NetworkEnv::Mainnet, ChainId::Evm(AVALANCHE))
        | (NetworkEnv::Testnet, ChainId::Evm(AVALANCHE_FUJI)) => Some(1),
        (NetworkEnv::Mainnet, ChainId::Evm(OPTIMISM))
        | (NetworkEnv::Testnet, ChainId::Evm(OPTIMISM_SEPOLIA)) => Some(2),
        (NetworkEnv::Mainnet, ChainId::Evm(ARBITRUM))
        | (NetworkEnv::Testnet, ChainId::Evm(ARBITRUM_SEPOLIA)) => Some(3),
        (NetworkEnv::Mainnet, ChainId::Solana(SolanaCluster::MainnetBeta))
        | (NetworkEnv::Testnet, ChainId::Solana(SolanaCluster::Devnet)) => Some(SOLANA_DOMAIN),
        (NetworkEnv::Mainnet, ChainId::Evm(BASE))
        | (NetworkEnv::Testnet, ChainId::Evm(BASE_SEPOLIA)) => Some(6),
        (NetworkEnv::Mainnet, ChainId::Evm(POLYGON))
        | (NetworkEnv::Testnet, ChainId::Evm(POLYGON_AMOY)) => Some(7),
        (NetworkEnv::Mainnet, ChainId::Evm(UNICHAIN))
        | (NetworkEnv::Testnet, ChainId::Evm(UNICHAIN_SEPOLIA)) => Some(10),
        _ => None,
    }
}

/// The Solana cluster CCTP pairs with each environment. Solana's own
/// testnet cluster has no deployment; testnet traffic goes to devnet.
pub const fn solana_cluster(env: NetworkEnv) -> SolanaCluster {
    match env {
        NetworkEnv::Mainnet => SolanaCluster::MainnetBeta,
        NetworkEnv::Testnet => SolanaCluster::Devnet,
    }
}

/// Chains bridgeable under the given environment, EVM first.
pub const fn supported_chains(env: NetworkEnv) -> [ChainId; 8] {
    match env {
        NetworkEnv::Mainnet => [
            ChainId::Evm(ETHEREUM),
            ChainId::Evm(AVALANCHE),
            ChainId::Evm(OPTIMISM),
            ChainId::Evm(ARBITRUM),
            ChainId::Evm(BASE),
            ChainId::Evm(POLYGON),
            ChainId::Evm(UNICHAIN),
            ChainId::Solana(SolanaCluster::MainnetBeta),
        ],
        NetworkEnv::Testnet => [
            ChainId::Evm(SEPOLIA),
            ChainId::Evm(AVALANCHE_FUJI),
            ChainId::Evm(OPTIMISM_SEPOLIA),
            ChainId::Evm(ARBITRUM_SEPOLIA),
            ChainId::Evm(BASE_SEPOLIA),
            ChainId::Evm(POLYGON_AMOY),
            ChainId::Evm(UNICHAIN_SEPOLIA),
            ChainId::Solana(SolanaCluster::Devnet),
        ],
    }
}

/// USDC token contract on an EVM chain.
pub const fn usdc_address(chain_id: u64) -> Option<Address> {
    match chain_id {
        ETHEREUM => Some(address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
        AVALANCHE => Some(address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E")),
        OPTIMISM => Some(address!("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85")),
        ARBITRUM => Some(address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831")),
        BASE => Some(address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")),
        POLYGON => Some(address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359")),
        UNICHAIN => Some(address!("0x078D782b760474a361dDA0AF3839290b0EF57AD6")),
        SEPOLIA => Some(address!("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238")),
        AVALANCHE_FUJI => Some(address!("0x5425890298aed601595a70AB815c96711a31Bc65")),
        OPTIMISM_SEPOLIA => Some(address!("0x5fd84259d66Cd46123540766Be93DFE6D43130D7")),
        ARBITRUM_SEPOLIA => Some(address!("0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d")),
        BASE_SEPOLIA => Some(address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e")),
        POLYGON_AMOY => Some(address!("0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582")),
        UNICHAIN_SEPOLIA => Some(address!("0x31d0220469e10c4E71834a79b1f276d740d3768F")),
        _ => None,
    }
}

/// TokenMessengerV2: one address across all supported EVM chains per
/// environment.
pub const fn token_messenger_v2(env: NetworkEnv) -> Address {
    match env {
        NetworkEnv::Mainnet => address!("0x28b5a0e9C621a5BadaA536219b3a228C8168cf5d"),
        NetworkEnv::Testnet => address!("0x8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA"),
    }
}

/// MessageTransmitterV2: one address across all supported EVM chains per
/// environment.
pub const fn message_transmitter_v2(env: NetworkEnv) -> Address {
    match env {
        NetworkEnv::Mainnet => address!("0x81D40F21F12A8F0E3252Bccb954D722d4c464B64"),
        NetworkEnv::Testnet => address!("0xE737e5cEBEEBa77EFE34D4aa090756590b1CE275"),
    }
}

/// V1 MessageTransmitter, needed only to claim legacy transfers created
/// before the V2 migration. `None` for chains that never had a V1
/// deployment.
pub const fn message_transmitter_v1(chain_id: u64, env: NetworkEnv) -> Option<Address> {
    match (env, chain_id) {
        (NetworkEnv::Mainnet, ETHEREUM) => {
            Some(address!("0x0a992d191DEeC32aFe36203Ad87D7d289a738F81"))
        }
        (NetworkEnv::Mainnet, AVALANCHE) => {
            Some(address!("0x8186359aF5F57FbB40c6b14A588d2A59C0C29880"))
        }
        (NetworkEnv::Mainnet, OPTIMISM) => {
            Some(address!("0x4D41f22c5a0e5c74090899E5a8Fb597a8842b3e8"))
        }
        (NetworkEnv::Mainnet, ARBITRUM) => {
            Some(address!("0xC30362313FBBA5cf9163F0bb16a0e01f01A896ca"))
        }
        (NetworkEnv::Mainnet, BASE) => Some(address!("0xAD09780d193884d503182aD4588450C416D6F9D4")),
        (NetworkEnv::Mainnet, POLYGON) => {
            Some(address!("0xF3be9355363857F3e001be68856A2f96b4C39Ba9"))
        }
        (NetworkEnv::Testnet, SEPOLIA | OPTIMISM_SEPOLIA | BASE_SEPOLIA | POLYGON_AMOY) => {
            Some(address!("0x7865fAfC2db2093669d92c0F33AeEF291086BEFD"))
        }
        (NetworkEnv::Testnet, AVALANCHE_FUJI) => {
            Some(address!("0xa9fB1b3009DCb79E2fe346c16a604B8Fa8aE0a79"))
        }
        (NetworkEnv::Testnet, ARBITRUM_SEPOLIA) => {
            Some(address!("0xaCF1ceeF35caAc005e15888dDb8A3515C41B4872"))
        }
        _ => None,
    }
}

/// MessageTransmitterV2 program on Solana (same id on every cluster).
pub const SOLANA_MESSAGE_TRANSMITTER_V2: Pubkey =
    pubkey!("CCTPV2Sm4AdWt5296sk4P66VBZ7bEhcARwFaaS9YPbeC");

/// TokenMessengerMinterV2 program on Solana (same id on every cluster).
pub const SOLANA_TOKEN_MESSENGER_MINTER_V2: Pubkey =
    pubkey!("CCTPV2vPZJS2u2BBsUoscuikbYjnpFmbFsvVuJdgUMQe");

/// USDC mint for a Solana cluster. Solana testnet (as opposed to devnet)
/// has no CCTP deployment.
pub const fn solana_usdc_mint(cluster: SolanaCluster) -> Option<Pubkey> {
    match cluster {
        SolanaCluster::MainnetBeta => {
            Some(pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"))
        }
        SolanaCluster::Devnet => Some(pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU")),
        SolanaCluster::Testnet => None,
    }
}

/// Expected confirmation depth and duration for a burn on this chain.
pub const fn confirmation_profile(
    chain: ChainId,
    speed: TransferSpeed,
) -> Option<ConfirmationProfile> {
    match (speed, chain) {
        (TransferSpeed::Fast, ChainId::Evm(ETHEREUM | SEPOLIA)) => Some(ConfirmationProfile {
            blocks: 2,
            seconds: 20,
        }),
        (TransferSpeed::Fast, ChainId::Evm(_)) => Some(ConfirmationProfile {
            blocks: 1,
            seconds: 8,
        }),
        (TransferSpeed::Fast, ChainId::Solana(_)) => Some(ConfirmationProfile {
            blocks: 1,
            seconds: 5,
        }),
        (TransferSpeed::Standard, ChainId::Evm(AVALANCHE | AVALANCHE_FUJI)) => {
            Some(ConfirmationProfile {
                blocks: 1,
                seconds: 20,
            })
        }
        (TransferSpeed::Standard, ChainId::Evm(POLYGON | POLYGON_AMOY)) => {
            Some(ConfirmationProfile {
                blocks: 200,
                seconds: 8 * 60,
            })
        }
        (TransferSpeed::Standard, ChainId::Evm(_)) => Some(ConfirmationProfile {
            blocks: 65,
            seconds: 19 * 60,
        }),
        (TransferSpeed::Standard, ChainId::Solana(_)) => Some(ConfirmationProfile {
            blocks: 32,
            seconds: 25,
        }),
    }
}

/// Block-explorer link for a transaction on the given chain.
pub fn explorer_tx_url(chain: ChainId, tx: &str) -> Option<String> {
    let base = match chain {
        ChainId::Evm(ETHEREUM) => "https://etherscan.io",
        ChainId::Evm(AVALANCHE) => "https://snowtrace.io",
        ChainId::Evm(OPTIMISM) => "https://optimistic.etherscan.io",
        ChainId::Evm(ARBITRUM) => "https://arbiscan.io",
        ChainId::Evm(BASE) => "https://basescan.org",
        ChainId::Evm(POLYGON) => "https://polygonscan.com",
        ChainId::Evm(UNICHAIN) => "https://uniscan.xyz",
        ChainId::Evm(SEPOLIA) => "https://sepolia.etherscan.io",
        ChainId::Evm(AVALANCHE_FUJI) => "https://testnet.snowtrace.io",
        ChainId::Evm(OPTIMISM_SEPOLIA) => "https://sepolia-optimism.etherscan.io",
        ChainId::Evm(ARBITRUM_SEPOLIA) => "https://sepolia.arbiscan.io",
        ChainId::Evm(BASE_SEPOLIA) => "https://sepolia.basescan.org",
        ChainId::Evm(POLYGON_AMOY) => "https://amoy.polygonscan.com",
        ChainId::Evm(UNICHAIN_SEPOLIA) => "https://sepolia.uniscan.xyz",
        ChainId::Evm(_) => return None,
        ChainId::Solana(SolanaCluster::MainnetBeta) => {
            return Some(format!("https://explorer.solana.com/tx/{tx}"));
        }
        ChainId::Solana(cluster) => {
            return Some(format!(
                "https://explorer.solana.com/tx/{tx}?cluster={cluster}"
            ));
        }
    };
    Some(format!("{base}/tx/{tx}"))
}

/// Default public RPC endpoint for a chain, overridable via configuration.
pub const fn default_rpc_url(chain: ChainId) -> Option<&'static str> {
    match chain {
        ChainId::Evm(ETHEREUM) => Some("https://eth.merkle.io"),
        ChainId::Evm(AVALANCHE) => Some("https://api.avax.network/ext/bc/C/rpc"),
        ChainId::Evm(OPTIMISM) => Some("https://mainnet.optimism.io"),
        ChainId::Evm(ARBITRUM) => Some("https://arb1.arbitrum.io/rpc"),
        ChainId::Evm(BASE) => Some("https://mainnet.base.org"),
        ChainId::Evm(POLYGON) => Some("https://polygon-rpc.com"),
        ChainId::Evm(UNICHAIN) => Some("https://mainnet.unichain.org"),
        ChainId::Evm(SEPOLIA) => Some("https://ethereum-sepolia-rpc.publicnode.com"),
        ChainId::Evm(AVALANCHE_FUJI) => Some("https://api.avax-test.network/ext/bc/C/rpc"),
        ChainId::Evm(OPTIMISM_SEPOLIA) => Some("https://sepolia.optimism.io"),
        ChainId::Evm(ARBITRUM_SEPOLIA) => Some("https://sepolia-rollup.arbitrum.io/rpc"),
        ChainId::Evm(BASE_SEPOLIA) => Some("https://sepolia.base.org"),
        ChainId::Evm(POLYGON_AMOY) => Some("https://rpc-amoy.polygon.technology"),
        ChainId::Evm(UNICHAIN_SEPOLIA) => Some("https://sepolia.unichain.org"),
        ChainId::Evm(_) => None,
        ChainId::Solana(SolanaCluster::MainnetBeta) => {
            Some("https://api.mainnet-beta.solana.com")
        }
        ChainId::Solana(SolanaCluster::Devnet) => Some("https://api.devnet.solana.com"),
        ChainId::Solana(SolanaCluster::Testnet) => Some("https://api.testnet.solana.com"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_total() {
        assert_eq!(ChainId::Evm(ETHEREUM).kind(), ChainKind::Evm);
        assert_eq!(ChainId::Evm(999_999_999).kind(), ChainKind::Evm);
        assert_eq!(
            ChainId::Solana(SolanaCluster::MainnetBeta).kind(),
            ChainKind::Solana
        );
        assert_eq!(
            ChainId::Solana(SolanaCluster::Devnet).kind(),
            ChainKind::Solana
        );
    }

    #[test]
    fn parse_numeric_as_evm() {
        assert_eq!("8453".parse::<ChainId>().unwrap(), ChainId::Evm(BASE));
        assert_eq!("1".parse::<ChainId>().unwrap(), ChainId::Evm(ETHEREUM));
    }

    #[test]
    fn parse_cluster_names_as_solana() {
        assert_eq!(
            "mainnet-beta".parse::<ChainId>().unwrap(),
            ChainId::Solana(SolanaCluster::MainnetBeta)
        );
        assert_eq!(
            "devnet".parse::<ChainId>().unwrap(),
            ChainId::Solana(SolanaCluster::Devnet)
        );
    }

    #[test]
    fn parse_rejects_unknown_strings() {
        assert!(matches!(
            "not-a-chain".parse::<ChainId>(),
            Err(ChainError::UnknownChainId { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        for chain in supported_chains(NetworkEnv::Mainnet) {
            let parsed: ChainId = chain.to_string().parse().unwrap();
            assert_eq!(parsed, chain);
        }
    }

    #[test]
    fn domains_are_environment_versioned() {
        assert_eq!(domain_of(ChainId::Evm(ETHEREUM), NetworkEnv::Mainnet), Some(0));
        assert_eq!(domain_of(ChainId::Evm(ETHEREUM), NetworkEnv::Testnet), None);
        assert_eq!(domain_of(ChainId::Evm(SEPOLIA), NetworkEnv::Testnet), Some(0));
        assert_eq!(domain_of(ChainId::Evm(SEPOLIA), NetworkEnv::Mainnet), None);
    }

    #[test]
    fn every_supported_chain_has_a_domain() {
        for env in [NetworkEnv::Mainnet, NetworkEnv::Testnet] {
            for chain in supported_chains(env) {
                assert!(
                    domain_of(chain, env).is_some(),
                    "missing domain for {chain} on {env:?}"
                );
            }
        }
    }

    #[test]
    fn unsupported_chain_has_no_domain() {
        assert_eq!(domain_of(ChainId::Evm(5), NetworkEnv::Mainnet), None);
        assert_eq!(
            domain_of(ChainId::Solana(SolanaCluster::Testnet), NetworkEnv::Mainnet),
            None
        );
    }

    #[test]
    fn solana_domain_is_five_on_both_environments() {
        assert_eq!(
            domain_of(ChainId::Solana(SolanaCluster::MainnetBeta), NetworkEnv::Mainnet),
            Some(SOLANA_DOMAIN)
        );
        assert_eq!(
            domain_of(ChainId::Solana(SolanaCluster::Devnet), NetworkEnv::Testnet),
            Some(SOLANA_DOMAIN)
        );
    }

    #[test]
    fn every_supported_evm_chain_has_usdc_and_rpc() {
        for env in [NetworkEnv::Mainnet, NetworkEnv::Testnet] {
            for chain in supported_chains(env) {
                if let ChainId::Evm(id) = chain {
                    assert!(usdc_address(id).is_some(), "missing USDC for {chain}");
                }
                assert!(default_rpc_url(chain).is_some(), "missing RPC for {chain}");
                assert!(
                    confirmation_profile(chain, TransferSpeed::Fast).is_some(),
                    "missing fast profile for {chain}"
                );
                assert!(
                    confirmation_profile(chain, TransferSpeed::Standard).is_some(),
                    "missing standard profile for {chain}"
                );
            }
        }
    }

    #[test]
    fn fast_profile_is_quicker_than_standard() {
        for chain in supported_chains(NetworkEnv::Mainnet) {
            let fast = confirmation_profile(chain, TransferSpeed::Fast).unwrap();
            let standard = confirmation_profile(chain, TransferSpeed::Standard).unwrap();
            assert!(fast.seconds <= standard.seconds, "profile inverted for {chain}");
        }
    }

    #[test]
    fn explorer_links_embed_the_hash() {
        let url = explorer_tx_url(ChainId::Evm(BASE), "0xabc").unwrap();
        assert_eq!(url, "https://basescan.org/tx/0xabc");

        let url = explorer_tx_url(ChainId::Solana(SolanaCluster::Devnet), "5Sig").unwrap();
        assert_eq!(url, "https://explorer.solana.com/tx/5Sig?cluster=devnet");

        assert!(explorer_tx_url(ChainId::Evm(424242), "0xabc").is_none());
    }

    #[test]
    fn serde_untagged_chain_id() {
        let evm: ChainId = serde_json::from_str("8453").unwrap();
        assert_eq!(evm, ChainId::Evm(BASE));
        assert_eq!(serde_json::to_string(&evm).unwrap(), "8453");

        let sol: ChainId = serde_json::from_str("\"mainnet-beta\"").unwrap();
        assert_eq!(sol, ChainId::Solana(SolanaCluster::MainnetBeta));
        assert_eq!(serde_json::to_string(&sol).unwrap(), "\"mainnet-beta\"");
    }

    #[test]
    fn speed_maps_to_finality_threshold() {
        assert_eq!(TransferSpeed::Fast.min_finality_threshold(), 1000);
        assert_eq!(TransferSpeed::Standard.min_finality_threshold(), 2000);
    }
}

//! USDC transfers over Circle's CCTP: burn on the source chain, fetch the
//! attestation, mint on the destination, and keep a local record of every
//! transfer so interrupted ones can be resumed.

pub mod cli;
pub mod config;
pub mod error;
pub mod retry;
pub mod steps;
pub mod store;
pub mod telemetry;
pub mod transfer;

pub use telemetry::setup_tracing;

//! Transfer phase tracking.
//!
//! A transfer is described by an ordered list of named steps (approve, burn,
//! attestation, mint). Updates arrive asynchronously from the burn executor,
//! the confirmation poller, and the mint path, possibly duplicated or out of
//! order, so the list is reconciled by name rather than appended blindly.

use serde::{Deserialize, Serialize};

use ferry_bridge::UniversalTxHash;

pub const APPROVE_STEP: &str = "Approve";
pub const BURN_STEP: &str = "Burn";
pub const ATTESTATION_STEP: &str = "Attestation";
pub const MINT_STEP: &str = "Mint";
pub const INTEGRATOR_FEE_STEP: &str = "Integrator fee";

/// State of a single transfer phase. `Success` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Success,
    Error,
}

impl StepState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// One phase of a transfer.
///
/// `name` is the merge key: two steps whose names match case-insensitively
/// describe the same phase and are reconciled, never duplicated. Serialized
/// with camelCase keys to stay byte-compatible with documents written by
/// earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStep {
    pub name: String,
    pub state: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<UniversalTxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TransferStep {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StepState::Pending,
            tx_hash: None,
            error_message: None,
        }
    }

    pub fn success(name: impl Into<String>) -> Self {
        Self {
            state: StepState::Success,
            ..Self::pending(name)
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            state: StepState::Error,
            error_message: Some(message.into()),
            ..Self::pending(name)
        }
    }

    pub fn with_tx(mut self, tx: UniversalTxHash) -> Self {
        self.tx_hash = Some(tx);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Folds an update for the same phase into this step.
    ///
    /// Incoming fields win, except that a step already in `Success` keeps
    /// that state against any non-success update. The update may still
    /// contribute fields (a tx hash learned late, an informational message).
    /// `None` fields on the incoming step mean "not provided", not "clear",
    /// with one exception: a success that carries no note wipes any failure
    /// note left by an earlier attempt.
    fn absorb(&mut self, incoming: TransferStep) {
        if self.state != StepState::Success || incoming.state == StepState::Success {
            self.state = incoming.state;
        }
        if incoming.tx_hash.is_some() {
            self.tx_hash = incoming.tx_hash;
        }
        if incoming.error_message.is_some() {
            self.error_message = incoming.error_message;
        } else if incoming.state == StepState::Success {
            self.error_message = None;
        }
    }
}

/// Reconciles an incoming step update into an ordered step list.
///
/// Matches by case-insensitive name, preserving the existing position;
/// unknown names are appended. Applying the same update twice leaves the
/// list as applying it once.
pub fn merge_step(steps: &mut Vec<TransferStep>, incoming: TransferStep) {
    match steps
        .iter_mut()
        .find(|step| step.name.eq_ignore_ascii_case(&incoming.name))
    {
        Some(existing) => existing.absorb(incoming),
        None => steps.push(incoming),
    }
}

/// Folds a batch of updates into the list, in order.
pub fn merge_steps(steps: &mut Vec<TransferStep>, incoming: Vec<TransferStep>) {
    for step in incoming {
        merge_step(steps, step);
    }
}

/// Whether a step name denotes the attestation phase.
///
/// Names are free-form and provider flows label phases differently, so
/// classification is by substring rather than exact match.
pub fn is_attestation_step(name: &str) -> bool {
    name.to_ascii_lowercase().contains("attest")
}

/// Whether a step name denotes the mint (claim) phase.
pub fn is_mint_step(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("mint") || lower.contains("claim") || lower.contains("receive")
}

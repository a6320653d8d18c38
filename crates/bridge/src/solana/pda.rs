//! Program derived addresses and instruction builders for the Solana CCTP
//! programs.
//!
//! Every address is derived locally from the static program ids and seeds.
//! Nothing here is taken from user input or remote configuration; a forged
//! account list cannot redirect a burn or mint.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::chain::{SOLANA_MESSAGE_TRANSMITTER_V2, SOLANA_TOKEN_MESSENGER_MINTER_V2};

pub const TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Anchor instruction discriminator: first 8 bytes of
/// `sha256("global:<method>")`.
fn anchor_discriminator(method: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{method}"));
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&digest[..8]);
    discriminator
}

fn anchor_instruction<T: BorshSerialize>(
    program_id: Pubkey,
    method: &str,
    params: &T,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, std::io::Error> {
    let mut data = anchor_discriminator(method).to_vec();
    data.extend(borsh::to_vec(params)?);
    Ok(Instruction {
        program_id,
        accounts,
        data,
    })
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct DepositForBurnParams {
    amount: u64,
    destination_domain: u32,
    mint_recipient: Pubkey,
    destination_caller: Pubkey,
    max_fee: u64,
    min_finality_threshold: u32,
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct ReceiveMessageParams {
    message: Vec<u8>,
    attestation: Vec<u8>,
}

/// Associated token account for `owner` holding `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM,
    )
    .0
}

pub fn sender_authority() -> Pubkey {
    Pubkey::find_program_address(&[b"sender_authority"], &SOLANA_TOKEN_MESSENGER_MINTER_V2).0
}

pub fn token_messenger() -> Pubkey {
    Pubkey::find_program_address(&[b"token_messenger"], &SOLANA_TOKEN_MESSENGER_MINTER_V2).0
}

pub fn token_minter() -> Pubkey {
    Pubkey::find_program_address(&[b"token_minter"], &SOLANA_TOKEN_MESSENGER_MINTER_V2).0
}

pub fn local_token(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"local_token", mint.as_ref()],
        &SOLANA_TOKEN_MESSENGER_MINTER_V2,
    )
    .0
}

pub fn remote_token_messenger(domain: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[b"remote_token_messenger", domain.to_string().as_bytes()],
        &SOLANA_TOKEN_MESSENGER_MINTER_V2,
    )
    .0
}

pub fn token_pair(remote_domain: u32, remote_token: &[u8; 32]) -> Pubkey {
    Pubkey::find_program_address(
        &[b"token_pair", remote_domain.to_string().as_bytes(), remote_token],
        &SOLANA_TOKEN_MESSENGER_MINTER_V2,
    )
    .0
}

pub fn custody_token(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"custody", mint.as_ref()],
        &SOLANA_TOKEN_MESSENGER_MINTER_V2,
    )
    .0
}

pub fn denylist_account(owner: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"denylist_account", owner.as_ref()],
        &SOLANA_TOKEN_MESSENGER_MINTER_V2,
    )
    .0
}

pub fn token_messenger_event_authority() -> Pubkey {
    Pubkey::find_program_address(&[b"__event_authority"], &SOLANA_TOKEN_MESSENGER_MINTER_V2).0
}

pub fn message_transmitter() -> Pubkey {
    Pubkey::find_program_address(&[b"message_transmitter"], &SOLANA_MESSAGE_TRANSMITTER_V2).0
}

pub fn message_transmitter_authority(receiver_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"message_transmitter_authority", receiver_program.as_ref()],
        &SOLANA_MESSAGE_TRANSMITTER_V2,
    )
    .0
}

pub fn message_transmitter_event_authority() -> Pubkey {
    Pubkey::find_program_address(&[b"__event_authority"], &SOLANA_MESSAGE_TRANSMITTER_V2).0
}

/// Used-nonce ledger entry for a V2 message nonce. Existence of the account
/// means the message was received.
pub fn used_nonce(nonce: &[u8; 32]) -> Pubkey {
    Pubkey::find_program_address(&[b"used_nonce", nonce], &SOLANA_MESSAGE_TRANSMITTER_V2).0
}

/// Builds the `deposit_for_burn` instruction.
///
/// `event_account` is a fresh one-shot keypair's pubkey; the program writes
/// the emitted message into it and it must co-sign the transaction.
#[allow(clippy::too_many_arguments)]
pub fn deposit_for_burn_instruction(
    owner: Pubkey,
    usdc_mint: Pubkey,
    event_account: Pubkey,
    amount: u64,
    destination_domain: u32,
    mint_recipient: Pubkey,
    max_fee: u64,
    min_finality_threshold: u32,
) -> Result<Instruction, std::io::Error> {
    let params = DepositForBurnParams {
        amount,
        destination_domain,
        mint_recipient,
        destination_caller: Pubkey::default(),
        max_fee,
        min_finality_threshold,
    };
    let accounts = vec![
        AccountMeta::new_readonly(owner, true),
        AccountMeta::new(owner, true),
        AccountMeta::new_readonly(sender_authority(), false),
        AccountMeta::new(associated_token_address(&owner, &usdc_mint), false),
        AccountMeta::new_readonly(denylist_account(&owner), false),
        AccountMeta::new(message_transmitter(), false),
        AccountMeta::new_readonly(token_messenger(), false),
        AccountMeta::new_readonly(remote_token_messenger(destination_domain), false),
        AccountMeta::new_readonly(token_minter(), false),
        AccountMeta::new(local_token(&usdc_mint), false),
        AccountMeta::new(usdc_mint, false),
        AccountMeta::new(event_account, true),
        AccountMeta::new_readonly(SOLANA_MESSAGE_TRANSMITTER_V2, false),
        AccountMeta::new_readonly(SOLANA_TOKEN_MESSENGER_MINTER_V2, false),
        AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(token_messenger_event_authority(), false),
        AccountMeta::new_readonly(SOLANA_TOKEN_MESSENGER_MINTER_V2, false),
    ];
    anchor_instruction(
        SOLANA_TOKEN_MESSENGER_MINTER_V2,
        "deposit_for_burn",
        &params,
        accounts,
    )
}

/// Accounts the receive path derives from the attested message.
pub struct ReceiveAccounts {
    pub nonce: [u8; 32],
    pub source_domain: u32,
    pub remote_token: [u8; 32],
    pub recipient_token_account: Pubkey,
    pub fee_recipient_token_account: Pubkey,
}

/// Builds the `receive_message` instruction, including the remaining
/// accounts the transmitter forwards to the token messenger's finalized
/// handler.
pub fn receive_message_instruction(
    payer: Pubkey,
    usdc_mint: Pubkey,
    accounts: &ReceiveAccounts,
    message: Vec<u8>,
    attestation: Vec<u8>,
) -> Result<Instruction, std::io::Error> {
    let params = ReceiveMessageParams {
        message,
        attestation,
    };
    let metas = vec![
        AccountMeta::new(payer, true),
        AccountMeta::new_readonly(payer, true),
        AccountMeta::new_readonly(
            message_transmitter_authority(&SOLANA_TOKEN_MESSENGER_MINTER_V2),
            false,
        ),
        AccountMeta::new_readonly(message_transmitter(), false),
        AccountMeta::new(used_nonce(&accounts.nonce), false),
        AccountMeta::new_readonly(SOLANA_TOKEN_MESSENGER_MINTER_V2, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(message_transmitter_event_authority(), false),
        AccountMeta::new_readonly(SOLANA_MESSAGE_TRANSMITTER_V2, false),
        // remaining accounts for the finalized-transfer CPI
        AccountMeta::new_readonly(token_messenger(), false),
        AccountMeta::new_readonly(remote_token_messenger(accounts.source_domain), false),
        AccountMeta::new(token_minter(), false),
        AccountMeta::new(local_token(&usdc_mint), false),
        AccountMeta::new_readonly(
            token_pair(accounts.source_domain, &accounts.remote_token),
            false,
        ),
        AccountMeta::new(accounts.fee_recipient_token_account, false),
        AccountMeta::new(accounts.recipient_token_account, false),
        AccountMeta::new(custody_token(&usdc_mint), false),
        AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        AccountMeta::new_readonly(token_messenger_event_authority(), false),
        AccountMeta::new_readonly(SOLANA_TOKEN_MESSENGER_MINTER_V2, false),
    ];
    anchor_instruction(
        SOLANA_MESSAGE_TRANSMITTER_V2,
        "receive_message",
        &params,
        metas,
    )
}

/// SPL Token `TransferChecked` moving `amount` base units between the two
/// owners' associated token accounts.
pub fn transfer_checked_instruction(
    owner: Pubkey,
    recipient: Pubkey,
    mint: Pubkey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let mut data = vec![12u8];
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(associated_token_address(&owner, &mint), false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new(associated_token_address(&recipient, &mint), false),
            AccountMeta::new_readonly(owner, true),
        ],
        data,
    }
}

/// Associated token program `CreateIdempotent`: ensures the owner's token
/// account exists before a transfer, a no-op when it already does.
pub fn create_ata_idempotent_instruction(
    payer: Pubkey,
    owner: Pubkey,
    mint: Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(payer, true),
            AccountMeta::new(associated_token_address(&owner, &mint), false),
            AccountMeta::new_readonly(owner, false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        ],
        data: vec![1u8],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_matches_anchor_convention() {
        let digest = Sha256::digest("global:deposit_for_burn");
        assert_eq!(anchor_discriminator("deposit_for_burn"), digest[..8]);
    }

    #[test]
    fn derivations_are_deterministic() {
        let mint = Pubkey::new_unique();
        assert_eq!(local_token(&mint), local_token(&mint));
        assert_eq!(remote_token_messenger(0), remote_token_messenger(0));
        assert_ne!(remote_token_messenger(0), remote_token_messenger(6));
        let nonce = [7u8; 32];
        assert_eq!(used_nonce(&nonce), used_nonce(&nonce));
    }

    #[test]
    fn ata_derivation_uses_the_associated_token_program() {
        // USDC ATA of the system program id, stable across runs.
        let owner = system_program::id();
        let mint = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        let ata = associated_token_address(&owner, &mint);
        assert_eq!(ata, associated_token_address(&owner, &mint));
        assert_ne!(ata, owner);
    }

    #[test]
    fn burn_instruction_encodes_params_after_discriminator() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let event = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        let instruction = deposit_for_burn_instruction(
            owner, mint, event, 1_000_000, 0, recipient, 100, 1000,
        )
        .unwrap();

        assert_eq!(instruction.program_id, SOLANA_TOKEN_MESSENGER_MINTER_V2);
        assert_eq!(&instruction.data[..8], anchor_discriminator("deposit_for_burn"));
        let params = DepositForBurnParams::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(params.amount, 1_000_000);
        assert_eq!(params.destination_domain, 0);
        assert_eq!(params.mint_recipient, recipient);
        assert_eq!(params.destination_caller, Pubkey::default());
        assert_eq!(params.max_fee, 100);
        assert_eq!(params.min_finality_threshold, 1000);

        // the one-shot event account must co-sign
        let event_meta = instruction
            .accounts
            .iter()
            .find(|meta| meta.pubkey == event)
            .unwrap();
        assert!(event_meta.is_signer);
        assert!(event_meta.is_writable);
    }

    #[test]
    fn transfer_checked_encodes_amount_and_decimals() {
        let owner = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let instruction = transfer_checked_instruction(owner, recipient, mint, 2_500_000, 6);

        assert_eq!(instruction.program_id, TOKEN_PROGRAM);
        assert_eq!(instruction.data[0], 12);
        assert_eq!(instruction.data[1..9], 2_500_000u64.to_le_bytes());
        assert_eq!(instruction.data[9], 6);
        assert_eq!(
            instruction.accounts[0].pubkey,
            associated_token_address(&owner, &mint)
        );
        assert_eq!(
            instruction.accounts[2].pubkey,
            associated_token_address(&recipient, &mint)
        );
        assert!(instruction.accounts[3].is_signer);
        assert!(!instruction.accounts[3].is_writable);
    }

    #[test]
    fn ata_creation_is_payer_signed_and_idempotent_flagged() {
        let payer = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let instruction = create_ata_idempotent_instruction(payer, owner, mint);

        assert_eq!(instruction.program_id, ASSOCIATED_TOKEN_PROGRAM);
        assert_eq!(instruction.data, vec![1]);
        assert!(instruction.accounts[0].is_signer);
        assert!(instruction.accounts[0].is_writable);
        assert_eq!(
            instruction.accounts[1].pubkey,
            associated_token_address(&owner, &mint)
        );
        assert!(instruction.accounts[1].is_writable);
    }

    #[test]
    fn receive_instruction_targets_the_message_transmitter() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let accounts = ReceiveAccounts {
            nonce: [1u8; 32],
            source_domain: 6,
            remote_token: [2u8; 32],
            recipient_token_account: Pubkey::new_unique(),
            fee_recipient_token_account: Pubkey::new_unique(),
        };

        let instruction = receive_message_instruction(
            payer,
            mint,
            &accounts,
            vec![0u8; 250],
            vec![1u8; 65],
        )
        .unwrap();

        assert_eq!(instruction.program_id, SOLANA_MESSAGE_TRANSMITTER_V2);
        assert_eq!(&instruction.data[..8], anchor_discriminator("receive_message"));
        let params = ReceiveMessageParams::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(params.message.len(), 250);
        assert_eq!(params.attestation.len(), 65);

        let used_nonce_meta = instruction
            .accounts
            .iter()
            .find(|meta| meta.pubkey == used_nonce(&accounts.nonce))
            .unwrap();
        assert!(used_nonce_meta.is_writable);
        assert!(!used_nonce_meta.is_signer);
    }
}

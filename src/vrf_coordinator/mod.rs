//! Development-chain VRF coordinator mock.
//!
//! Keeps subscriptions and pending requests, hands out request ids, and
//! delivers random words to the requesting program through its
//! [`instruction::FULFILL_RANDOM_WORDS_CALLBACK`] instruction. Deployed only
//! on development clusters, see [`crate::deploy::deploy_mocks`].

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

/// Fee per fulfillment: 0.25 LINK in juels
pub const BASE_FEE: u64 = 250_000_000_000_000_000;

/// Juels per unit of callback gas
pub const GAS_PRICE_LINK: u64 = 1_000_000_000;

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}

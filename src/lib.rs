// RaffleStack
// A keeper-driven raffle on Solana: players enter, a keeper closes the round
// once the interval has passed, and a VRF coordinator picks the winner.

// Core modules
pub mod engine;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Randomness: coordinator client and the development-chain mock
pub mod vrf;
pub mod vrf_coordinator;

// Deployment
pub mod deploy;
pub mod network_config;

mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}

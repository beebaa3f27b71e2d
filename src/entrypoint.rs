// Program entrypoint. The same crate builds either the raffle program or,
// with the `mock-coordinator` feature, the VRF coordinator mock.
#![cfg(not(feature = "no-entrypoint"))]

use solana_program::{
    account_info::AccountInfo, entrypoint, entrypoint::ProgramResult, msg, pubkey::Pubkey,
};

entrypoint!(process_instruction);

fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if cfg!(feature = "mock-coordinator") {
        msg!("Processing instruction for VRF coordinator mock");
        crate::vrf_coordinator::process_instruction(program_id, accounts, instruction_data)
    } else {
        crate::process_instruction(program_id, accounts, instruction_data)
    }
}

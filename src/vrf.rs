// VRF coordinator integration for the RaffleStack program
use arrayref::array_ref;
use solana_program::{
    account_info::AccountInfo,
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    engine::{FundsTransfer, RandomWordsRequest, RandomnessOracle},
    error::RaffleStackError,
    state::RAFFLE_STACK_SEED,
    vrf_coordinator,
};

/// Requests randomness from the coordinator program on behalf of the raffle PDA
pub struct CoordinatorOracle<'a, 'info> {
    pub coordinator_program: &'a AccountInfo<'info>,
    pub coordinator: &'a AccountInfo<'info>,
    /// Raffle account, signs the request as consumer
    pub consumer: &'a AccountInfo<'info>,
    pub consumer_bump: u8,
}

impl<'a, 'info> RandomnessOracle for CoordinatorOracle<'a, 'info> {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, ProgramError> {
        let instruction = vrf_coordinator::instruction::request_random_words(
            self.coordinator_program.key,
            self.coordinator.key,
            self.consumer.key,
            request,
        )?;

        invoke_signed(
            &instruction,
            &[
                self.coordinator.clone(),
                self.consumer.clone(),
                self.coordinator_program.clone(),
            ],
            &[&[RAFFLE_STACK_SEED, &[self.consumer_bump]]],
        )?;

        read_request_id(self.coordinator_program.key)
    }
}

/// Request id left in return data by the coordinator
pub fn read_request_id(coordinator_program: &Pubkey) -> Result<u64, ProgramError> {
    match get_return_data() {
        Some((program_id, data)) if program_id == *coordinator_program && data.len() >= 8 => {
            Ok(u64::from_le_bytes(*array_ref![data, 0, 8]))
        }
        _ => {
            msg!("Coordinator did not return a request id");
            Err(RaffleStackError::MissingRequestId.into())
        }
    }
}

/// Pays the prize out of the raffle account's lamports
pub struct LamportPayout<'a, 'info> {
    pub vault: &'a AccountInfo<'info>,
    pub recipient: &'a AccountInfo<'info>,
}

impl<'a, 'info> FundsTransfer for LamportPayout<'a, 'info> {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.recipient.key != recipient {
            msg!("Winner account {} was not supplied", recipient);
            return Err(ProgramError::InvalidArgument);
        }
        if !self.recipient.is_writable || self.recipient.executable {
            msg!("Winner account {} cannot receive lamports", recipient);
            return Err(ProgramError::InvalidAccountData);
        }

        let vault_lamports = self
            .vault
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let recipient_lamports = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleStackError::Overflow)?;

        **self.vault.try_borrow_mut_lamports()? = vault_lamports;
        **self.recipient.try_borrow_mut_lamports()? = recipient_lamports;
        Ok(())
    }
}

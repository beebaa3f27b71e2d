use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::engine::RandomWord;
use crate::state::RaffleStack;
use crate::vrf_coordinator::instruction::{RandomWordsCallback, FULFILL_RANDOM_WORDS_CALLBACK};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleStackInstruction {
    /// Create the raffle account and fix its parameters
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The deployer, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA)
    /// 2. `[]` The VRF coordinator program
    /// 3. `[]` The VRF coordinator account
    /// 4. `[]` The system program
    Initialize {
        /// Minimum payment in lamports to enter
        entrance_fee: u64,
        /// Seconds between settlements
        interval: u64,
        /// Key hash of the oracle job
        gas_lane: [u8; 32],
        subscription_id: u64,
        callback_gas_limit: u32,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the entry
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        payment: u64,
    },

    /// Report whether upkeep is due; the borsh encoded status is set as return data
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep { check_data: Vec<u8> },

    /// Close the round and request random words
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[writable]` The VRF coordinator account
    /// 2. `[]` The VRF coordinator program
    PerformUpkeep { perform_data: Vec<u8> },

    /// Coordinator callback delivering random words, pays the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The VRF coordinator account
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<RandomWord>,
    },
}

impl RaffleStackInstruction {
    /// Unpacks a byte buffer into a RaffleStackInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let gas_lane: [u8; 32] = rest
                    .get(..32)
                    .and_then(|slice| slice.try_into().ok())
                    .ok_or(ProgramError::InvalidInstructionData)?;
                let (subscription_id, rest) = Self::unpack_u64(&rest[32..])?;
                let callback_gas_limit = rest
                    .get(..4)
                    .and_then(|slice| slice.try_into().ok())
                    .map(u32::from_le_bytes)
                    .ok_or(ProgramError::InvalidInstructionData)?;
                Self::Initialize {
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    callback_gas_limit,
                }
            }
            1 => {
                let (payment, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { payment }
            }
            2 => Self::CheckUpkeep {
                check_data: rest.to_vec(),
            },
            3 => Self::PerformUpkeep {
                perform_data: rest.to_vec(),
            },
            FULFILL_RANDOM_WORDS_CALLBACK => {
                let callback = RandomWordsCallback::unpack(rest)?;
                Self::FulfillRandomWords {
                    request_id: callback.request_id,
                    random_words: callback.random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleStackInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut buf = Vec::new();
        match self {
            Self::Initialize {
                entrance_fee,
                interval,
                gas_lane,
                subscription_id,
                callback_gas_limit,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(gas_lane);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
            }
            Self::EnterRaffle { payment } => {
                buf.push(1);
                buf.extend_from_slice(&payment.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                buf.extend_from_slice(check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                buf.extend_from_slice(perform_data);
            }
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                return RandomWordsCallback {
                    request_id: *request_id,
                    random_words: random_words.clone(),
                }
                .pack();
            }
        }
        Ok(buf)
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }
}

/// Create initialize instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    deployer: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator: &Pubkey,
    entrance_fee: u64,
    interval: u64,
    gas_lane: [u8; 32],
    subscription_id: u64,
    callback_gas_limit: u32,
) -> Result<Instruction, ProgramError> {
    let (raffle_stack, _) = RaffleStack::find_address(program_id);
    let data = RaffleStackInstruction::Initialize {
        entrance_fee,
        interval,
        gas_lane,
        subscription_id,
        callback_gas_limit,
    }
    .pack()?;

    let accounts = vec![
        AccountMeta::new(*deployer, true),
        AccountMeta::new(raffle_stack, false),
        AccountMeta::new_readonly(*coordinator_program, false),
        AccountMeta::new_readonly(*coordinator, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    player: &Pubkey,
    payment: u64,
) -> Result<Instruction, ProgramError> {
    let (raffle_stack, _) = RaffleStack::find_address(program_id);
    let data = RaffleStackInstruction::EnterRaffle { payment }.pack()?;

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(raffle_stack, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, check_data: Vec<u8>) -> Result<Instruction, ProgramError> {
    let (raffle_stack, _) = RaffleStack::find_address(program_id);
    let data = RaffleStackInstruction::CheckUpkeep { check_data }.pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(raffle_stack, false)],
        data,
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator: &Pubkey,
    perform_data: Vec<u8>,
) -> Result<Instruction, ProgramError> {
    let (raffle_stack, _) = RaffleStack::find_address(program_id);
    let data = RaffleStackInstruction::PerformUpkeep { perform_data }.pack()?;

    let accounts = vec![
        AccountMeta::new(raffle_stack, false),
        AccountMeta::new(*coordinator, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

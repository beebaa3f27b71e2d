// RaffleStack Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::{clock::Clock, Sysvar},
};

use crate::{
    engine::RandomWord,
    error::RaffleStackError,
    instruction::RaffleStackInstruction,
    state::{RaffleStack, VrfSettings, NUM_WORDS, RAFFLE_STACK_SEED, REQUEST_CONFIRMATIONS},
    utils,
    vrf::{CoordinatorOracle, LamportPayout},
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleStackInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleStackInstruction::Initialize {
                entrance_fee,
                interval,
                gas_lane,
                subscription_id,
                callback_gas_limit,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    program_id,
                    accounts,
                    entrance_fee,
                    interval,
                    gas_lane,
                    subscription_id,
                    callback_gas_limit,
                )
            }
            RaffleStackInstruction::EnterRaffle { payment } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, payment)
            }
            RaffleStackInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleStackInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            RaffleStackInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
        }
    }

    /// Process the Initialize instruction
    ///
    /// Creates the raffle PDA and fixes entrance fee, interval and the
    /// coordinator it will trust for randomness
    #[allow(clippy::too_many_arguments)]
    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: u64,
        gas_lane: [u8; 32],
        subscription_id: u64,
        callback_gas_limit: u32,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !deployer_info.is_signer {
            msg!("Deployer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_raffle, bump_seed) = RaffleStack::find_address(program_id);
        if *raffle_info.key != expected_raffle {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }

        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        if coordinator_info.owner != coordinator_program_info.key {
            msg!("Coordinator account is not owned by the coordinator program");
            return Err(RaffleStackError::InvalidCoordinator.into());
        }

        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                deployer_info.key,
                raffle_info.key,
                rent.minimum_balance(RaffleStack::LEN),
                RaffleStack::LEN as u64,
                program_id,
            ),
            &[
                deployer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[&[RAFFLE_STACK_SEED, &[bump_seed]]],
        )?;

        let vrf = VrfSettings {
            coordinator_program: *coordinator_program_info.key,
            coordinator: *coordinator_info.key,
            gas_lane,
            subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit,
            num_words: NUM_WORDS,
        };
        let now = Clock::get()?.unix_timestamp;
        RaffleStack::new(entrance_fee, interval, vrf, now, bump_seed).save(raffle_info)?;

        msg!(
            "RaffleStack initialized: entrance fee={} SOL, interval={}s, subscription={}",
            utils::lamports_to_sol(entrance_fee),
            interval,
            subscription_id
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        payment: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = RaffleStack::load(raffle_info, program_id)?;
        let event = raffle.enter(*player_info.key, payment)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, payment),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.save(raffle_info)?;
        event.emit()
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = RaffleStack::load(raffle_info, program_id)?;
        let status = raffle.check_upkeep(Clock::get()?.unix_timestamp);

        let data = status
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        set_return_data(&data);

        msg!("Upkeep needed: {}", status.upkeep_needed);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;

        let mut raffle = RaffleStack::load(raffle_info, program_id)?;

        if *coordinator_info.key != raffle.vrf.coordinator
            || *coordinator_program_info.key != raffle.vrf.coordinator_program
        {
            msg!("Coordinator accounts do not match the raffle configuration");
            return Err(RaffleStackError::InvalidCoordinator.into());
        }

        let mut oracle = CoordinatorOracle {
            coordinator_program: coordinator_program_info,
            coordinator: coordinator_info,
            consumer: raffle_info,
            consumer_bump: raffle.bump,
        };
        let event = raffle.perform_upkeep(Clock::get()?.unix_timestamp, &mut oracle)?;

        raffle.save(raffle_info)?;
        event.emit()
    }

    /// Process the coordinator callback
    ///
    /// Only the configured coordinator account, signing through its program,
    /// may deliver random words
    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[RandomWord],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = RaffleStack::load(raffle_info, program_id)?;

        if !coordinator_info.is_signer || *coordinator_info.key != raffle.vrf.coordinator {
            msg!("Fulfillment must be signed by coordinator {}", raffle.vrf.coordinator);
            return Err(RaffleStackError::OnlyCoordinatorCanFulfill.into());
        }

        let mut payout = LamportPayout {
            vault: raffle_info,
            recipient: winner_info,
        };
        let event = raffle.fulfill_random_words(
            request_id,
            random_words,
            Clock::get()?.unix_timestamp,
            &mut payout,
        )?;

        raffle.save(raffle_info)?;
        event.emit()
    }
}

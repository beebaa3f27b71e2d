// VRF Coordinator Mock - Instruction Processor
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::AccountMeta,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::engine::{RandomWord, RandomWordsRequest};
use crate::vrf_coordinator::{
    error::CoordinatorError,
    instruction::{consumer_callback, CoordinatorInstruction, RandomWordsCallback},
    state::{
        derive_random_words, Coordinator, PendingRequest, Subscription, COORDINATOR_SEED,
        MAX_CONSUMERS, MAX_NUM_WORDS, MAX_PENDING_REQUESTS, MAX_SUBSCRIPTIONS,
    },
};

/// Coordinator state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = CoordinatorInstruction::unpack(instruction_data)?;

        match instruction {
            CoordinatorInstruction::Initialize {
                base_fee,
                gas_price_link,
            } => {
                msg!("Instruction: Initialize Coordinator");
                Self::process_initialize(program_id, accounts, base_fee, gas_price_link)
            }
            CoordinatorInstruction::CreateSubscription => {
                msg!("Instruction: Create Subscription");
                Self::process_create_subscription(program_id, accounts)
            }
            CoordinatorInstruction::FundSubscription {
                subscription_id,
                amount,
            } => {
                msg!("Instruction: Fund Subscription");
                Self::process_fund_subscription(program_id, accounts, subscription_id, amount)
            }
            CoordinatorInstruction::AddConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Instruction: Add Consumer");
                Self::process_add_consumer(program_id, accounts, subscription_id, consumer)
            }
            CoordinatorInstruction::RequestRandomWords { request } => {
                msg!("Instruction: Request Random Words");
                Self::process_request_random_words(program_id, accounts, request)
            }
            CoordinatorInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, random_words)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        base_fee: u64,
        gas_price_link: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_coordinator, bump_seed) = Coordinator::find_address(program_id);
        if *coordinator_info.key != expected_coordinator {
            msg!("Invalid coordinator account address");
            return Err(ProgramError::InvalidArgument);
        }

        if coordinator_info.owner == program_id {
            msg!("Coordinator account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                coordinator_info.key,
                rent.minimum_balance(Coordinator::LEN),
                Coordinator::LEN as u64,
                program_id,
            ),
            &[
                payer_info.clone(),
                coordinator_info.clone(),
                system_program_info.clone(),
            ],
            &[&[COORDINATOR_SEED, &[bump_seed]]],
        )?;

        Coordinator::new(base_fee, gas_price_link, bump_seed).save(coordinator_info)?;

        msg!(
            "Coordinator initialized: base fee={} gas price={}",
            base_fee,
            gas_price_link
        );
        Ok(())
    }

    fn process_create_subscription(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = Coordinator::load(coordinator_info, program_id)?;
        if coordinator.subscriptions.len() >= MAX_SUBSCRIPTIONS {
            return Err(CoordinatorError::TooManySubscriptions.into());
        }

        let subscription_id = coordinator.next_subscription_id;
        coordinator.next_subscription_id = subscription_id
            .checked_add(1)
            .ok_or(CoordinatorError::Overflow)?;
        coordinator.subscriptions.push(Subscription {
            id: subscription_id,
            owner: *owner_info.key,
            balance: 0,
            consumers: Vec::new(),
        });
        coordinator.save(coordinator_info)?;

        set_return_data(&subscription_id.to_le_bytes());
        msg!("SubscriptionCreated: {} owner={}", subscription_id, owner_info.key);
        Ok(())
    }

    fn process_fund_subscription(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = Coordinator::load(coordinator_info, program_id)?;
        let subscription = coordinator
            .subscription_mut(subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance
            .checked_add(amount)
            .ok_or(CoordinatorError::Overflow)?;
        let new_balance = subscription.balance;
        coordinator.save(coordinator_info)?;

        msg!(
            "SubscriptionFunded: {} old balance={} new balance={}",
            subscription_id,
            old_balance,
            new_balance
        );
        Ok(())
    }

    fn process_add_consumer(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = Coordinator::load(coordinator_info, program_id)?;
        let subscription = coordinator
            .subscription_mut(subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        if subscription.owner != *owner_info.key {
            return Err(CoordinatorError::MustBeSubOwner.into());
        }
        if subscription.consumers.contains(&consumer) {
            msg!("Consumer {} already registered", consumer);
            return Ok(());
        }
        if subscription.consumers.len() >= MAX_CONSUMERS {
            return Err(CoordinatorError::TooManyConsumers.into());
        }
        subscription.consumers.push(consumer);
        coordinator.save(coordinator_info)?;

        msg!("ConsumerAdded: {} subscription={}", consumer, subscription_id);
        Ok(())
    }

    fn process_request_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request: RandomWordsRequest,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;

        if !consumer_info.is_signer {
            msg!("Consumer must sign the request");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut coordinator = Coordinator::load(coordinator_info, program_id)?;
        let subscription = coordinator
            .subscription(request.subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        if !subscription.consumers.contains(consumer_info.key) {
            msg!(
                "{} is not a consumer of subscription {}",
                consumer_info.key,
                request.subscription_id
            );
            return Err(CoordinatorError::InvalidConsumer.into());
        }
        if request.num_words > MAX_NUM_WORDS {
            return Err(CoordinatorError::NumWordsTooBig.into());
        }
        if coordinator.requests.len() >= MAX_PENDING_REQUESTS {
            return Err(CoordinatorError::TooManyPendingRequests.into());
        }

        let request_id = coordinator.next_request_id;
        coordinator.next_request_id = request_id
            .checked_add(1)
            .ok_or(CoordinatorError::Overflow)?;
        coordinator.requests.push(PendingRequest {
            request_id,
            subscription_id: request.subscription_id,
            consumer_program: *consumer_info.owner,
            consumer: *consumer_info.key,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
        });
        coordinator.save(coordinator_info)?;

        set_return_data(&request_id.to_le_bytes());
        msg!(
            "RandomWordsRequested: {} subscription={} confirmations={} words={}",
            request_id,
            request.subscription_id,
            request.request_confirmations,
            request.num_words
        );
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: Option<Vec<RandomWord>>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let consumer_program_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let forwarded_infos: Vec<AccountInfo> = account_info_iter.cloned().collect();

        let mut coordinator = Coordinator::load(coordinator_info, program_id)?;
        let request = coordinator
            .request(request_id)
            .cloned()
            .ok_or(CoordinatorError::NonexistentRequest)?;

        if *consumer_program_info.key != request.consumer_program
            || *consumer_info.key != request.consumer
        {
            msg!("Consumer accounts do not match request {}", request_id);
            return Err(CoordinatorError::InvalidConsumer.into());
        }

        let random_words = match random_words {
            Some(words) if words.len() == request.num_words as usize => words,
            Some(_) => return Err(CoordinatorError::InvalidRandomWords.into()),
            None => derive_random_words(request_id, request.num_words),
        };

        let payment = coordinator
            .fulfillment_fee(&request)
            .ok_or(CoordinatorError::Overflow)?;
        let subscription = coordinator
            .subscription_mut(request.subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        subscription.balance = subscription
            .balance
            .checked_sub(payment)
            .ok_or(CoordinatorError::InsufficientBalance)?;
        coordinator
            .requests
            .retain(|pending| pending.request_id != request_id);
        coordinator.save(coordinator_info)?;

        let forwarded: Vec<AccountMeta> = forwarded_infos
            .iter()
            .map(|info| AccountMeta {
                pubkey: *info.key,
                is_signer: false,
                is_writable: info.is_writable,
            })
            .collect();
        let callback = consumer_callback(
            consumer_program_info.key,
            coordinator_info.key,
            consumer_info.key,
            &forwarded,
            &RandomWordsCallback {
                request_id,
                random_words,
            },
        )?;

        let mut callback_infos = vec![coordinator_info.clone(), consumer_info.clone()];
        callback_infos.extend(forwarded_infos);
        callback_infos.push(consumer_program_info.clone());

        // A failing callback aborts the transaction, the request stays pending
        invoke_signed(
            &callback,
            &callback_infos,
            &[&[COORDINATOR_SEED, &[coordinator.bump]]],
        )?;

        msg!("RandomWordsFulfilled: {} payment={}", request_id, payment);
        Ok(())
    }
}

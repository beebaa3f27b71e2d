// VRF Coordinator Mock - Instructions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::engine::{RandomWord, RandomWordsRequest};
use crate::vrf_coordinator::state::Coordinator;

/// First byte of the instruction a consumer must accept as its fulfillment callback
pub const FULFILL_RANDOM_WORDS_CALLBACK: u8 = 0xF0;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Create the coordinator account
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Payer
    /// 1. `[writable]` Coordinator account (PDA)
    /// 2. `[]` System program
    Initialize {
        /// Flat fee per fulfillment in juels
        base_fee: u64,
        /// Juels per unit of callback gas
        gas_price_link: u64,
    },

    /// Open a new subscription owned by the signer. The id is returned as
    /// little-endian return data.
    ///
    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Coordinator account
    CreateSubscription,

    /// Accounts expected:
    /// 0. `[signer]` Funder
    /// 1. `[writable]` Coordinator account
    FundSubscription { subscription_id: u64, amount: u64 },

    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Coordinator account
    AddConsumer { subscription_id: u64, consumer: Pubkey },

    /// Register a randomness request. The request id is returned as
    /// little-endian return data.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator account
    /// 1. `[signer]` Consumer account, owned by the program receiving the callback
    RequestRandomWords { request: RandomWordsRequest },

    /// Answer a pending request and deliver the words to its consumer
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator account
    /// 1. `[]` Consumer program
    /// 2. `[writable]` Consumer account
    /// Remaining accounts are forwarded to the consumer callback
    FulfillRandomWords {
        request_id: u64,
        /// Words to deliver instead of the derived ones
        random_words: Option<Vec<RandomWord>>,
    },
}

impl CoordinatorInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

/// Payload delivered to a consumer when its request is fulfilled
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsCallback {
    pub request_id: u64,
    pub random_words: Vec<RandomWord>,
}

impl RandomWordsCallback {
    /// Callback instruction data, prefixed with [`FULFILL_RANDOM_WORDS_CALLBACK`]
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = vec![FULFILL_RANDOM_WORDS_CALLBACK];
        let body = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        data.extend_from_slice(&body);
        Ok(data)
    }

    /// Decode the callback body, without the tag byte
    pub fn unpack(body: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(body).map_err(|_| ProgramError::InvalidInstructionData)
    }
}

/// Create initialize instruction
pub fn initialize(
    program_id: &Pubkey,
    payer: &Pubkey,
    base_fee: u64,
    gas_price_link: u64,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = Coordinator::find_address(program_id);
    let data = CoordinatorInstruction::Initialize {
        base_fee,
        gas_price_link,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(coordinator, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

/// Create create_subscription instruction
pub fn create_subscription(program_id: &Pubkey, owner: &Pubkey) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = Coordinator::find_address(program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(coordinator, false),
        ],
        data: CoordinatorInstruction::CreateSubscription.pack()?,
    })
}

/// Create fund_subscription instruction
pub fn fund_subscription(
    program_id: &Pubkey,
    funder: &Pubkey,
    subscription_id: u64,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = Coordinator::find_address(program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(coordinator, false),
        ],
        data: CoordinatorInstruction::FundSubscription {
            subscription_id,
            amount,
        }
        .pack()?,
    })
}

/// Create add_consumer instruction
pub fn add_consumer(
    program_id: &Pubkey,
    owner: &Pubkey,
    subscription_id: u64,
    consumer: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = Coordinator::find_address(program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(coordinator, false),
        ],
        data: CoordinatorInstruction::AddConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack()?,
    })
}

/// Create request_random_words instruction
pub fn request_random_words(
    program_id: &Pubkey,
    coordinator: &Pubkey,
    consumer: &Pubkey,
    request: &RandomWordsRequest,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*coordinator, false),
            AccountMeta::new_readonly(*consumer, true),
        ],
        data: CoordinatorInstruction::RequestRandomWords {
            request: request.clone(),
        }
        .pack()?,
    })
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    request_id: u64,
    random_words: Option<Vec<RandomWord>>,
    forwarded: &[AccountMeta],
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = Coordinator::find_address(program_id);
    let mut accounts = vec![
        AccountMeta::new(coordinator, false),
        AccountMeta::new_readonly(*consumer_program, false),
        AccountMeta::new(*consumer, false),
    ];
    accounts.extend_from_slice(forwarded);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: CoordinatorInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .pack()?,
    })
}

/// Create the callback instruction delivered to a consumer program
pub fn consumer_callback(
    consumer_program: &Pubkey,
    coordinator: &Pubkey,
    consumer: &Pubkey,
    forwarded: &[AccountMeta],
    callback: &RandomWordsCallback,
) -> Result<Instruction, ProgramError> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*coordinator, true),
        AccountMeta::new(*consumer, false),
    ];
    accounts.extend_from_slice(forwarded);

    Ok(Instruction {
        program_id: *consumer_program,
        accounts,
        data: callback.pack()?,
    })
}

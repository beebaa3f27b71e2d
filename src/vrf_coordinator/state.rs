// VRF Coordinator Mock - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, borsh::try_from_slice_unchecked, keccak, msg,
    program_error::ProgramError, pubkey::Pubkey,
};

use crate::engine::RandomWord;

/// Seed of the coordinator account PDA
pub const COORDINATOR_SEED: &[u8] = b"vrf_coordinator";

pub const MAX_SUBSCRIPTIONS: usize = 8;
pub const MAX_CONSUMERS: usize = 4;
pub const MAX_PENDING_REQUESTS: usize = 16;
pub const MAX_NUM_WORDS: u32 = 8;

/// A funded subscription paying for its consumers' requests
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub id: u64,
    pub owner: Pubkey,
    /// LINK balance in juels
    pub balance: u64,
    pub consumers: Vec<Pubkey>,
}

impl Subscription {
    pub const LEN: usize = 8 + 32 + 8 + 4 + 32 * MAX_CONSUMERS;
}

/// A request waiting to be fulfilled
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    pub subscription_id: u64,
    /// Program the callback is delivered to
    pub consumer_program: Pubkey,
    /// Account that signed the request
    pub consumer: Pubkey,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl PendingRequest {
    pub const LEN: usize = 8 + 8 + 32 + 32 + 4 + 4;
}

/// Coordinator account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Coordinator {
    pub is_initialized: bool,
    pub bump: u8,
    /// Flat fee per fulfillment in juels
    pub base_fee: u64,
    /// Juels charged per unit of callback gas
    pub gas_price_link: u64,
    pub next_subscription_id: u64,
    pub next_request_id: u64,
    pub subscriptions: Vec<Subscription>,
    pub requests: Vec<PendingRequest>,
}

impl Coordinator {
    pub const LEN: usize = 1
        + 1
        + 8
        + 8
        + 8
        + 8
        + 4 + Subscription::LEN * MAX_SUBSCRIPTIONS
        + 4 + PendingRequest::LEN * MAX_PENDING_REQUESTS;

    pub fn new(base_fee: u64, gas_price_link: u64, bump: u8) -> Self {
        Self {
            is_initialized: true,
            bump,
            base_fee,
            gas_price_link,
            next_subscription_id: 1,
            next_request_id: 1,
            subscriptions: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub fn find_address(program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[COORDINATOR_SEED], program_id)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let coordinator: Coordinator =
            try_from_slice_unchecked(data).map_err(|_| ProgramError::InvalidAccountData)?;
        if !coordinator.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(coordinator)
    }

    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Coordinator account must be owned by the coordinator program");
            return Err(ProgramError::IncorrectProgramId);
        }
        Self::unpack(&account.try_borrow_data()?)
    }

    pub fn save(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        let mut data = account.try_borrow_mut_data()?;
        self.serialize(&mut &mut data[..])
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }

    pub fn subscription(&self, id: u64) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.id == id)
    }

    pub fn subscription_mut(&mut self, id: u64) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|sub| sub.id == id)
    }

    pub fn request(&self, request_id: u64) -> Option<&PendingRequest> {
        self.requests.iter().find(|req| req.request_id == request_id)
    }

    /// Fee charged to the subscription for fulfilling `request`
    pub fn fulfillment_fee(&self, request: &PendingRequest) -> Option<u64> {
        self.gas_price_link
            .checked_mul(request.callback_gas_limit as u64)?
            .checked_add(self.base_fee)
    }
}

/// Words the mock hands out when no override is given: keccak(request_id, i)
pub fn derive_random_words(request_id: u64, num_words: u32) -> Vec<RandomWord> {
    (0..num_words as u64)
        .map(|i| keccak::hashv(&[&request_id.to_le_bytes(), &i.to_le_bytes()]).0)
        .collect()
}

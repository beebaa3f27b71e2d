// RaffleStack Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    borsh::try_from_slice_unchecked,
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
};

use crate::engine::RandomWordsRequest;

/// Seed of the raffle account PDA
pub const RAFFLE_STACK_SEED: &[u8] = b"raffle_stack";

/// Upper bound on entries per round; the account is allocated for this many players
pub const MAX_PLAYERS: usize = 256;

/// Random words requested per round, only the first one is used
pub const NUM_WORDS: u32 = 1;

/// Block confirmations the coordinator waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// Lifecycle of a round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Waiting for the coordinator to deliver random words
    Calculating,
}

/// Parameters forwarded to the VRF coordinator on every request
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct VrfSettings {
    /// Program id of the coordinator
    pub coordinator_program: Pubkey,
    /// Coordinator state account, also the signer of fulfillment callbacks
    pub coordinator: Pubkey,
    /// Gas lane (key hash) selecting the oracle job
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    /// Execution budget hint for the fulfillment callback
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl VrfSettings {
    pub const LEN: usize = 32 + 32 + 32 + 8 + 2 + 4 + 4;

    pub fn randomness_request(&self) -> RandomWordsRequest {
        RandomWordsRequest {
            key_hash: self.gas_lane,
            subscription_id: self.subscription_id,
            request_confirmations: self.request_confirmations,
            callback_gas_limit: self.callback_gas_limit,
            num_words: self.num_words,
        }
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct RaffleStack {
    pub is_initialized: bool,
    /// Bump of the raffle PDA, needed to sign coordinator requests
    pub bump: u8,
    /// Minimum payment in lamports to enter
    pub entrance_fee: u64,
    /// Seconds that must pass between settlements
    pub interval: u64,
    /// Construction time or time of the last settlement
    pub last_timestamp: UnixTimestamp,
    pub state: RaffleState,
    /// Lamports owed to the next winner
    pub balance: u64,
    /// Outstanding coordinator request, set only while calculating
    pub pending_request: Option<u64>,
    pub recent_winner: Option<Pubkey>,
    pub vrf: VrfSettings,
    /// Entrants of the current round, in entry order
    pub players: Vec<Pubkey>,
}

impl IsInitialized for RaffleStack {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl RaffleStack {
    pub const LEN: usize = 1 // is_initialized
        + 1 // bump
        + 8 // entrance_fee
        + 8 // interval
        + 8 // last_timestamp
        + 1 // state
        + 8 // balance
        + 1 + 8 // pending_request
        + 1 + 32 // recent_winner
        + VrfSettings::LEN
        + 4 + 32 * MAX_PLAYERS; // players

    /// Find the program derived address of the raffle account
    pub fn find_address(program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[RAFFLE_STACK_SEED], program_id)
    }

    /// Decode raffle data from raw account bytes
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let raffle: RaffleStack =
            try_from_slice_unchecked(data).map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    /// Load the raffle from an account owned by this program
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        Self::unpack(&account.try_borrow_data()?)
    }

    pub fn save(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        let mut data = account.try_borrow_mut_data()?;
        self.serialize(&mut &mut data[..])
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn raffle_state(&self) -> RaffleState {
        self.state
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> Option<&Pubkey> {
        self.recent_winner.as_ref()
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }
}

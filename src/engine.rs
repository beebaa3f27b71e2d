//! Round lifecycle of the raffle.
//!
//! Every operation works on an owned [`RaffleStack`] and reaches the outside
//! world only through [`RandomnessOracle`] and [`FundsTransfer`], so the same
//! rules run inside the program and in plain unit tests. Failed operations
//! leave the raffle untouched.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp, entrypoint::ProgramResult, log::sol_log_data, msg,
    program_error::ProgramError, pubkey::Pubkey,
};

use crate::{
    error::RaffleStackError,
    state::{RaffleStack, RaffleState, VrfSettings, MAX_PLAYERS},
    utils,
};

/// A 256-bit random value, big-endian
pub type RandomWord = [u8; 32];

/// What the raffle asks the coordinator for
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Source of random words. Issues a request id now and answers it later
/// through the raffle's fulfillment callback.
pub trait RandomnessOracle {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, ProgramError>;
}

/// Moves the prize to the winner and reports whether it landed
pub trait FundsTransfer {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// Result of an upkeep check
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub upkeep_needed: bool,
    /// Reserved, always empty
    pub perform_data: Vec<u8>,
}

/// Notifications emitted by successful operations
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    PlayerEntered { player: Pubkey },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    /// Log the event as text and as a borsh record
    pub fn emit(&self) -> ProgramResult {
        match self {
            RaffleEvent::PlayerEntered { player } => msg!("PlayerEntered: {}", player),
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => msg!("WinnerPicked: {}", winner),
        }
        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[data.as_slice()]);
        Ok(())
    }
}

impl RaffleStack {
    /// Fresh raffle, open and empty, with its clock started at `now`
    pub fn new(
        entrance_fee: u64,
        interval: u64,
        vrf: VrfSettings,
        now: UnixTimestamp,
        bump: u8,
    ) -> Self {
        Self {
            is_initialized: true,
            bump,
            entrance_fee,
            interval,
            last_timestamp: now,
            state: RaffleState::Open,
            balance: 0,
            pending_request: None,
            recent_winner: None,
            vrf,
            players: Vec::new(),
        }
    }

    /// Record `player` as an entrant paying `payment` lamports
    pub fn enter(&mut self, player: Pubkey, payment: u64) -> Result<RaffleEvent, ProgramError> {
        if payment < self.entrance_fee {
            msg!(
                "Payment of {} lamports is below the entrance fee of {}",
                payment,
                self.entrance_fee
            );
            return Err(RaffleStackError::InsufficientPayment.into());
        }
        if self.state != RaffleState::Open {
            return Err(RaffleStackError::RaffleNotOpen.into());
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RaffleStackError::PlayerLimitReached.into());
        }
        let balance = self
            .balance
            .checked_add(payment)
            .ok_or(RaffleStackError::Overflow)?;

        self.balance = balance;
        self.players.push(player);
        Ok(RaffleEvent::PlayerEntered { player })
    }

    /// Whether a keeper should call [`RaffleStack::perform_upkeep`] at `now`
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        let is_open = self.state == RaffleState::Open;
        let time_passed = self.elapsed(now) >= self.interval;
        let has_players = !self.players.is_empty();
        let has_balance = self.balance > 0;

        UpkeepStatus {
            upkeep_needed: is_open && time_passed && has_players && has_balance,
            perform_data: Vec::new(),
        }
    }

    /// Close the round and ask the oracle for randomness
    pub fn perform_upkeep(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut impl RandomnessOracle,
    ) -> Result<RaffleEvent, ProgramError> {
        if !self.check_upkeep(now).upkeep_needed {
            msg!(
                "Upkeep not needed: balance={} players={} state={:?}",
                self.balance,
                self.players.len(),
                self.state
            );
            return Err(RaffleStackError::UpkeepNotNeeded.into());
        }

        let request_id = oracle.request_random_words(&self.vrf.randomness_request())?;

        self.state = RaffleState::Calculating;
        self.pending_request = Some(request_id);
        Ok(RaffleEvent::RequestedRaffleWinner { request_id })
    }

    /// Settle the round with the oracle's answer to `request_id`
    pub fn fulfill_random_words(
        &mut self,
        request_id: u64,
        random_words: &[RandomWord],
        now: UnixTimestamp,
        payout: &mut impl FundsTransfer,
    ) -> Result<RaffleEvent, ProgramError> {
        match (self.state, self.pending_request) {
            (RaffleState::Calculating, Some(pending)) if pending == request_id => {}
            _ => {
                msg!("No pending randomness request with id {}", request_id);
                return Err(RaffleStackError::UnrecognizedRequest.into());
            }
        }

        let winner = self
            .winner_for(random_words)
            .ok_or(RaffleStackError::MissingRandomWords)?;
        let prize = self.balance;

        if let Err(err) = payout.transfer(&winner, prize) {
            msg!("Transfer of {} lamports to {} failed: {}", prize, winner, err);
            return Err(RaffleStackError::PayoutFailed.into());
        }

        self.players.clear();
        self.balance = 0;
        self.pending_request = None;
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.recent_winner = Some(winner);
        Ok(RaffleEvent::WinnerPicked { winner })
    }

    /// Player selected by `random_words[0] mod number_of_players`
    pub fn winner_for(&self, random_words: &[RandomWord]) -> Option<Pubkey> {
        let word = random_words.first()?;
        let index = utils::word_mod(word, self.players.len() as u64)?;
        self.players.get(index as usize).copied()
    }

    fn elapsed(&self, now: UnixTimestamp) -> u64 {
        u64::try_from(now.saturating_sub(self.last_timestamp)).unwrap_or(0)
    }
}

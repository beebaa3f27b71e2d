use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the RaffleStack program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleStackError {
    /// Entry payment is below the entrance fee
    #[error("Not enough lamports to enter the raffle")]
    InsufficientPayment,

    /// Entries are closed while a winner is being calculated
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// performUpkeep was called while checkUpkeep is false
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Fulfillment for a request id this raffle is not waiting on
    #[error("Unrecognized randomness request")]
    UnrecognizedRequest,

    /// Prize transfer to the winner was rejected
    #[error("Payout to winner failed")]
    PayoutFailed,

    #[error("Only the VRF coordinator can fulfill randomness")]
    OnlyCoordinatorCanFulfill,

    #[error("Fulfillment carried no random words")]
    MissingRandomWords,

    /// The player list of the raffle account is full
    #[error("Player limit reached")]
    PlayerLimitReached,

    /// The coordinator did not hand back a request id
    #[error("Coordinator returned no request id")]
    MissingRequestId,

    #[error("Coordinator account does not match the raffle configuration")]
    InvalidCoordinator,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<RaffleStackError> for ProgramError {
    fn from(e: RaffleStackError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleStackError {
    fn type_of() -> &'static str {
        "RaffleStack Error"
    }
}

impl PrintProgramError for RaffleStackError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Error codes of the coordinator start here so they never collide with the raffle's
pub const COORDINATOR_ERROR_BASE: u32 = 0x100;

/// Errors that may be returned by the VRF coordinator mock
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("nonexistent request")]
    NonexistentRequest,

    #[error("Invalid subscription")]
    InvalidSubscription,

    /// Requesting account is not a consumer of the subscription
    #[error("Invalid consumer")]
    InvalidConsumer,

    #[error("Must be subscription owner")]
    MustBeSubOwner,

    /// Subscription cannot pay for the fulfillment
    #[error("Insufficient subscription balance")]
    InsufficientBalance,

    #[error("Too many consumers on subscription")]
    TooManyConsumers,

    #[error("Too many subscriptions")]
    TooManySubscriptions,

    #[error("Too many pending requests")]
    TooManyPendingRequests,

    #[error("Too many random words requested")]
    NumWordsTooBig,

    /// Override words do not match the requested count
    #[error("Invalid random words")]
    InvalidRandomWords,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<CoordinatorError> for ProgramError {
    fn from(e: CoordinatorError) -> Self {
        ProgramError::Custom(COORDINATOR_ERROR_BASE + e as u32)
    }
}

impl<T> DecodeError<T> for CoordinatorError {
    fn type_of() -> &'static str {
        "VRF Coordinator Error"
    }
}

impl PrintProgramError for CoordinatorError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

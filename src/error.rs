use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Value sent with an entry is below the entry fee
    #[error("Not enough lamports sent to enter the raffle")]
    InsufficientFee,

    /// Entries are only accepted while the round is open
    #[error("Raffle round is not open")]
    RoundNotOpen,

    /// The upkeep predicate does not hold
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Randomness delivered for a request that is not pending
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// The prize transfer was rejected
    #[error("Prize transfer failed")]
    TransferFailed,

    /// No room left in the entrants list
    #[error("Raffle round is full")]
    RoundFull,

    /// Round is not waiting for randomness
    #[error("Raffle round is not drawing")]
    RoundNotDrawing,

    /// Draw timeout is disabled or has not elapsed
    #[error("Pending draw is not stale yet")]
    DrawNotStale,

    /// Randomness may only be delivered by the configured oracle
    #[error("Signer is not the configured randomness oracle")]
    UnauthorizedOracle,

    /// Winner account does not match the selected entrant
    #[error("Winner account does not match the drawn entrant")]
    InvalidWinnerAccount,

    /// Raffle configuration rejected at initialization
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

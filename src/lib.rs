// Raffle program
// Players pay an entry fee into a shared pool; once the round interval has
// passed, anyone may start a draw and an external randomness oracle picks
// the entrant that takes the whole pool.

pub mod error;
pub mod events;
pub mod instruction;
pub mod network;
pub mod oracle;
pub mod payout;
pub mod processor;
pub mod raffle;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}

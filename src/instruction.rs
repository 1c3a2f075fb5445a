use crate::error::RaffleError;
use crate::state::{find_raffle_address, RaffleConfig};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority paying for the raffle account
    /// 1. `[writable]` The raffle account (PDA, seeds: ["raffle"])
    /// 2. `[]` The system program
    InitializeRaffle {
        config: RaffleConfig,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entry
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports sent with the entry, at least the entry fee
        value: u64,
    },

    /// Report whether a draw may start (result in return data)
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Start the draw and request randomness. Anyone may call this.
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    PerformUpkeep,

    /// Deliver randomness for the pending request and pay the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The drawn winner
    FulfillRandomness {
        request_id: u64,
        randomness: [u8; 32],
    },

    /// Reopen a round whose randomness never arrived
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    CancelStaleDraw,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstruction)?;

        Ok(match tag {
            0 => {
                let config = RaffleConfig::unpack_from_slice(rest)
                    .map_err(|_| RaffleError::InvalidInstruction)?;
                Self::InitializeRaffle { config }
            }
            1 => {
                let (value, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { value }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let randomness = rest
                    .get(..32)
                    .and_then(|slice| slice.try_into().ok())
                    .ok_or(RaffleError::InvalidInstruction)?;
                Self::FulfillRandomness { request_id, randomness }
            }
            5 => Self::CancelStaleDraw,
            _ => return Err(RaffleError::InvalidInstruction.into()),
        })
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(RaffleError::InvalidInstruction.into());
        }
        let (value, rest) = input.split_at(8);
        let value = value
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| RaffleError::InvalidInstruction)?;
        Ok((value, rest))
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + RaffleConfig::LEN);
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                let mut packed = [0u8; RaffleConfig::LEN];
                config.pack_into_slice(&mut packed);
                buf.extend_from_slice(&packed);
            }
            Self::EnterRaffle { value } => {
                buf.push(1);
                buf.extend_from_slice(&value.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillRandomness { request_id, randomness } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(randomness);
            }
            Self::CancelStaleDraw => buf.push(5),
        }
        buf
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(program_id: &Pubkey, authority: &Pubkey, config: RaffleConfig) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, value: u64) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { value }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(program_id: &Pubkey) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(raffle, false)],
        data: RaffleInstruction::PerformUpkeep.pack(),
    }
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    randomness: [u8; 32],
) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*oracle, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new(*winner, false),
        ],
        data: RaffleInstruction::FulfillRandomness { request_id, randomness }.pack(),
    }
}

/// Create cancel_stale_draw instruction
pub fn cancel_stale_draw(program_id: &Pubkey) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(raffle, false)],
        data: RaffleInstruction::CancelStaleDraw.pack(),
    }
}

// Structured program events, published as log data for indexers and the oracle relayer
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Prefix of every event log entry
pub const EVENT_TAG: &[u8] = b"raffle:event";

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    EntryAccepted {
        player: Pubkey,
        value: u64,
    },
    /// Picked up by the off-chain oracle
    RandomnessRequested {
        requester: Pubkey,
        request_id: u64,
        key_hash: [u8; 32],
        subscription_id: u64,
        request_confirmations: u16,
        callback_compute_limit: u32,
        num_words: u32,
    },
    DrawStarted {
        request_id: u64,
    },
    WinnerPicked {
        winner: Pubkey,
        amount: u64,
        request_id: u64,
    },
    DrawCancelled {
        request_id: u64,
    },
}

impl RaffleEvent {
    pub fn emit(&self) {
        match self {
            RaffleEvent::EntryAccepted { player, value } => {
                msg!("Entry accepted: {} ({} lamports)", player, value)
            }
            RaffleEvent::RandomnessRequested { request_id, .. } => {
                msg!("Randomness requested: id={}", request_id)
            }
            RaffleEvent::DrawStarted { request_id } => msg!("Draw started: request {}", request_id),
            RaffleEvent::WinnerPicked { winner, amount, .. } => {
                msg!("Winner picked: {} receives {} lamports", winner, amount)
            }
            RaffleEvent::DrawCancelled { request_id } => {
                msg!("Stale draw cancelled: request {}", request_id)
            }
        }
        match self.try_to_vec() {
            Ok(payload) => sol_log_data(&[EVENT_TAG, &payload]),
            Err(e) => msg!("Failed to encode event: {}", e),
        }
    }
}

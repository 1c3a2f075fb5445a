// Randomness oracle interface and the on-chain request publisher
use crate::error::RaffleError;
use crate::events::RaffleEvent;
use crate::state::OracleConfig;
use solana_program::pubkey::Pubkey;

/// Everything the oracle needs to answer a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    /// Account the answer is delivered to
    pub requester: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
}

impl RandomnessRequest {
    pub fn new(requester: Pubkey, config: &OracleConfig) -> Self {
        Self {
            requester,
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_compute_limit: config.callback_compute_limit,
            num_words: config.num_words,
        }
    }
}

/// Accepts a randomness request and returns its id.
/// The random value arrives later through a separate fulfill call.
pub trait RandomnessOracle {
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError>;
}

/// Issues sequential request ids and publishes each request as a program event.
pub struct LogCoordinator {
    last_request_id: u64,
}

impl LogCoordinator {
    pub fn new(last_request_id: u64) -> Self {
        Self { last_request_id }
    }
}

impl RandomnessOracle for LogCoordinator {
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError> {
        let request_id = self
            .last_request_id
            .checked_add(1)
            .ok_or(RaffleError::Overflow)?;

        RaffleEvent::RandomnessRequested {
            requester: request.requester,
            request_id,
            key_hash: request.key_hash,
            subscription_id: request.subscription_id,
            request_confirmations: request.request_confirmations,
            callback_compute_limit: request.callback_compute_limit,
            num_words: request.num_words,
        }
        .emit();

        self.last_request_id = request_id;
        Ok(request_id)
    }
}

/// Index of the winning entry: the randomness read as a big-endian
/// 256-bit integer, reduced modulo the entry count.
pub fn winner_index(randomness: &[u8; 32], entries: u64) -> u64 {
    if entries == 0 {
        return 0;
    }
    let modulus = entries as u128;
    randomness
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus) as u64
}

/// Randomness whose 256-bit value equals `value`
pub fn randomness_from_u64(value: u64) -> [u8; 32] {
    let mut randomness = [0u8; 32];
    randomness[24..].copy_from_slice(&value.to_be_bytes());
    randomness
}

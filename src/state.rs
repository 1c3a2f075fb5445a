use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    entrypoint::MAX_PERMITTED_DATA_INCREASE,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Seed of the raffle account PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Status of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Waiting for the oracle to deliver randomness
    Drawing,
}

/// Parameters forwarded to the randomness oracle with every request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleConfig {
    /// Only this key may deliver randomness
    pub authority: Pubkey,
    /// Gas lane / proving key selector
    pub key_hash: [u8; 32],
    /// Oracle subscription that funds the requests
    pub subscription_id: u64,
    /// Confirmations the oracle waits before answering
    pub request_confirmations: u16,
    /// Compute budget the oracle reserves for the callback
    pub callback_compute_limit: u32,
    /// Random words requested; only the first one is used
    pub num_words: u32,
}

/// Immutable raffle configuration, fixed at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum lamports per entry
    pub entry_fee: u64,
    /// Seconds a round stays open before a draw may start
    pub interval: u64,
    /// Capacity of the entrants list
    pub max_entrants: u32,
    /// Seconds after which a pending draw may be cancelled (0 disables)
    pub draw_timeout: u64,
    pub oracle: OracleConfig,
}

impl RaffleConfig {
    /// The raffle account is created in a single instruction, so its size is
    /// bounded by the per-instruction data growth limit.
    pub fn is_valid(&self) -> bool {
        self.max_entrants > 0
            && Raffle::space(self.max_entrants) <= MAX_PERMITTED_DATA_INCREASE
            && self.oracle.num_words > 0
            && self.oracle.request_confirmations > 0
    }
}

impl Sealed for RaffleConfig {}

impl Pack for RaffleConfig {
    const LEN: usize = 8 + 8 + 4 + 8 + 32 + 32 + 8 + 2 + 4 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        if src.len() < RaffleConfig::LEN {
            return Err(ProgramError::InvalidInstructionData);
        }
        let src = array_ref![src, 0, RaffleConfig::LEN];
        let (
            entry_fee,
            interval,
            max_entrants,
            draw_timeout,
            authority,
            key_hash,
            subscription_id,
            request_confirmations,
            callback_compute_limit,
            num_words,
        ) = array_refs![src, 8, 8, 4, 8, 32, 32, 8, 2, 4, 4];

        Ok(RaffleConfig {
            entry_fee: u64::from_le_bytes(*entry_fee),
            interval: u64::from_le_bytes(*interval),
            max_entrants: u32::from_le_bytes(*max_entrants),
            draw_timeout: u64::from_le_bytes(*draw_timeout),
            oracle: OracleConfig {
                authority: Pubkey::new_from_array(*authority),
                key_hash: *key_hash,
                subscription_id: u64::from_le_bytes(*subscription_id),
                request_confirmations: u16::from_le_bytes(*request_confirmations),
                callback_compute_limit: u32::from_le_bytes(*callback_compute_limit),
                num_words: u32::from_le_bytes(*num_words),
            },
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RaffleConfig::LEN];
        let (
            entry_fee_dst,
            interval_dst,
            max_entrants_dst,
            draw_timeout_dst,
            authority_dst,
            key_hash_dst,
            subscription_id_dst,
            request_confirmations_dst,
            callback_compute_limit_dst,
            num_words_dst,
        ) = mut_array_refs![dst, 8, 8, 4, 8, 32, 32, 8, 2, 4, 4];

        *entry_fee_dst = self.entry_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        *max_entrants_dst = self.max_entrants.to_le_bytes();
        *draw_timeout_dst = self.draw_timeout.to_le_bytes();
        authority_dst.copy_from_slice(self.oracle.authority.as_ref());
        key_hash_dst.copy_from_slice(&self.oracle.key_hash);
        *subscription_id_dst = self.oracle.subscription_id.to_le_bytes();
        *request_confirmations_dst = self.oracle.request_confirmations.to_le_bytes();
        *callback_compute_limit_dst = self.oracle.callback_compute_limit.to_le_bytes();
        *num_words_dst = self.oracle.num_words.to_le_bytes();
    }
}

/// In-flight randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    pub requested_at: UnixTimestamp,
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// PDA bump seed
    pub bump: u8,
    /// Account that created the raffle (no special rights)
    pub authority: Pubkey,
    pub config: RaffleConfig,
    pub state: RaffleState,
    /// Start of the current round
    pub last_timestamp: UnixTimestamp,
    /// Lamports collected in the current round
    pub pool_balance: u64,
    /// Set exactly while the round is drawing
    pub pending_request: Option<PendingRequest>,
    /// Most recently issued request id
    pub last_request_id: u64,
    pub recent_winner: Option<Pubkey>,
    /// Completed rounds
    pub round: u64,
    /// One slot per entry, in entry order
    pub entrants: Vec<Pubkey>,
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    /// Account size needed to hold `max_entrants` entries
    pub fn space(max_entrants: u32) -> usize {
        1 + 1
            + 32
            + RaffleConfig::LEN
            + 1
            + 8
            + 8
            + (1 + 8 + 8)
            + 8
            + (1 + 32)
            + 8
            + (4 + 32 * max_entrants as usize)
    }

    pub fn load(account: &AccountInfo) -> Result<Self, ProgramError> {
        let data = account.try_borrow_data()?;
        let raffle = Raffle::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    pub fn save(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        let mut data = account.try_borrow_mut_data()?;
        self.serialize(&mut &mut data[..])
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

/// Find the program derived address of the raffle account
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}

//! Round state machine.
//!
//! ```text
//! Open    --perform_upkeep-------> Drawing
//! Drawing --fulfill_randomness---> Open   (winner paid, round reset)
//! Drawing --cancel_stale_draw----> Open   (entries kept, draw retried)
//! ```
//!
//! Every operation either fully applies or leaves the raffle untouched.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::error::RaffleError;
use crate::events::RaffleEvent;
use crate::oracle::{winner_index, RandomnessOracle, RandomnessRequest};
use crate::payout::PrizeTransfer;
use crate::state::{PendingRequest, Raffle, RaffleConfig, RaffleState};

/// First condition that keeps a draw from starting
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpkeepBlocker {
    RoundNotOpen,
    NoEntrants,
    IntervalNotElapsed,
    EmptyPool,
}

/// Result of the upkeep check, returned to automation callers
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub upkeep_needed: bool,
    pub blocker: Option<UpkeepBlocker>,
}

impl UpkeepStatus {
    fn blocked(blocker: UpkeepBlocker) -> Self {
        Self { upkeep_needed: false, blocker: Some(blocker) }
    }
}

fn elapsed_since(start: UnixTimestamp, now: UnixTimestamp) -> u64 {
    u64::try_from(now.saturating_sub(start)).unwrap_or(0)
}

impl Raffle {
    /// Open a fresh raffle whose first round starts at `now`
    pub fn new(authority: Pubkey, bump: u8, config: RaffleConfig, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            bump,
            authority,
            config,
            state: RaffleState::Open,
            last_timestamp: now,
            pool_balance: 0,
            pending_request: None,
            last_request_id: 0,
            recent_winner: None,
            round: 0,
            entrants: Vec::new(),
        }
    }

    pub fn entry_fee(&self) -> u64 {
        self.config.entry_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn entrant(&self, index: usize) -> Option<Pubkey> {
        self.entrants.get(index).copied()
    }

    pub fn num_entrants(&self) -> usize {
        self.entrants.len()
    }

    pub fn pool_balance(&self) -> u64 {
        self.pool_balance
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request.map(|pending| pending.request_id)
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.oracle.request_confirmations
    }

    pub fn num_words(&self) -> u32 {
        self.config.oracle.num_words
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Admit `player` to the current round for `value` lamports.
    pub fn enter(&mut self, player: Pubkey, value: u64) -> Result<RaffleEvent, RaffleError> {
        if value < self.config.entry_fee {
            return Err(RaffleError::InsufficientFee);
        }
        if self.state != RaffleState::Open {
            return Err(RaffleError::RoundNotOpen);
        }
        if self.entrants.len() >= self.config.max_entrants as usize {
            return Err(RaffleError::RoundFull);
        }
        let pool_balance = self
            .pool_balance
            .checked_add(value)
            .ok_or(RaffleError::Overflow)?;

        self.entrants.push(player);
        self.pool_balance = pool_balance;
        Ok(RaffleEvent::EntryAccepted { player, value })
    }

    /// Read-only readiness check polled by keepers.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        if self.state != RaffleState::Open {
            return UpkeepStatus::blocked(UpkeepBlocker::RoundNotOpen);
        }
        if self.entrants.is_empty() {
            return UpkeepStatus::blocked(UpkeepBlocker::NoEntrants);
        }
        if elapsed_since(self.last_timestamp, now) < self.config.interval {
            return UpkeepStatus::blocked(UpkeepBlocker::IntervalNotElapsed);
        }
        if self.pool_balance == 0 {
            return UpkeepStatus::blocked(UpkeepBlocker::EmptyPool);
        }
        UpkeepStatus { upkeep_needed: true, blocker: None }
    }

    /// Close admissions and ask the oracle for randomness.
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        requester: Pubkey,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<RaffleEvent, RaffleError> {
        if !self.check_upkeep(now).upkeep_needed {
            return Err(RaffleError::UpkeepNotNeeded);
        }

        let request = RandomnessRequest::new(requester, &self.config.oracle);
        let request_id = oracle.request_randomness(&request)?;

        self.state = RaffleState::Drawing;
        self.pending_request = Some(PendingRequest { request_id, requested_at: now });
        self.last_request_id = request_id;
        Ok(RaffleEvent::DrawStarted { request_id })
    }

    /// Entrant that `randomness` selects for the pending request.
    pub fn drawn_winner(
        &self,
        request_id: u64,
        randomness: &[u8; 32],
    ) -> Result<Pubkey, RaffleError> {
        if self.state != RaffleState::Drawing || self.pending_request_id() != Some(request_id) {
            return Err(RaffleError::UnknownRequest);
        }
        let index = winner_index(randomness, self.entrants.len() as u64) as usize;
        self.entrants
            .get(index)
            .copied()
            .ok_or(RaffleError::UnknownRequest)
    }

    /// Resolve the pending draw: reset the round, then pay the whole pool.
    /// A rejected transfer restores the raffle exactly as it was.
    pub fn fulfill_randomness<T: PrizeTransfer>(
        &mut self,
        request_id: u64,
        randomness: &[u8; 32],
        now: UnixTimestamp,
        transfer: &mut T,
    ) -> Result<RaffleEvent, RaffleError> {
        let winner = self.drawn_winner(request_id, randomness)?;
        let amount = self.pool_balance;
        let round = self.round.checked_add(1).ok_or(RaffleError::Overflow)?;
        let snapshot = self.clone();

        // Bookkeeping is reset before any value leaves the pool.
        self.entrants.clear();
        self.pool_balance = 0;
        self.pending_request = None;
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.recent_winner = Some(winner);
        self.round = round;

        if transfer.transfer(&winner, amount).is_err() {
            *self = snapshot;
            return Err(RaffleError::TransferFailed);
        }

        Ok(RaffleEvent::WinnerPicked { winner, amount, request_id })
    }

    /// Reopen a round whose randomness never arrived. Entries are kept.
    pub fn cancel_stale_draw(&mut self, now: UnixTimestamp) -> Result<RaffleEvent, RaffleError> {
        let pending = match (self.state, self.pending_request) {
            (RaffleState::Drawing, Some(pending)) => pending,
            _ => return Err(RaffleError::RoundNotDrawing),
        };
        if self.config.draw_timeout == 0
            || elapsed_since(pending.requested_at, now) < self.config.draw_timeout
        {
            return Err(RaffleError::DrawNotStale);
        }

        self.pending_request = None;
        self.state = RaffleState::Open;
        Ok(RaffleEvent::DrawCancelled { request_id: pending.request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::randomness_from_u64;
    use crate::state::OracleConfig;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const FEE: u64 = 10_000_000; // 0.01 SOL
    const INTERVAL: u64 = 30;
    const START: UnixTimestamp = 1_700_000_000;

    /// Oracle double that records requests, like a local VRF coordinator mock
    #[derive(Default)]
    struct MockCoordinator {
        next_id: u64,
        requests: Vec<RandomnessRequest>,
        fail: bool,
    }

    impl RandomnessOracle for MockCoordinator {
        fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError> {
            if self.fail {
                return Err(RaffleError::Overflow);
            }
            self.next_id += 1;
            self.requests.push(*request);
            Ok(self.next_id)
        }
    }

    #[derive(Default)]
    struct Ledger {
        balances: HashMap<Pubkey, u64>,
        reject: bool,
    }

    impl PrizeTransfer for Ledger {
        fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
            if self.reject {
                return Err(RaffleError::TransferFailed);
            }
            *self.balances.entry(*winner).or_default() += amount;
            Ok(())
        }
    }

    fn config() -> RaffleConfig {
        RaffleConfig {
            entry_fee: FEE,
            interval: INTERVAL,
            max_entrants: 8,
            draw_timeout: 600,
            oracle: OracleConfig {
                authority: Pubkey::new_unique(),
                key_hash: [7; 32],
                subscription_id: 1,
                request_confirmations: 3,
                callback_compute_limit: 500_000,
                num_words: 1,
            },
        }
    }

    fn raffle() -> Raffle {
        Raffle::new(Pubkey::new_unique(), 255, config(), START)
    }

    fn drawing_raffle(players: &[Pubkey]) -> (Raffle, MockCoordinator) {
        let mut raffle = raffle();
        for player in players {
            raffle.enter(*player, FEE).unwrap();
        }
        let mut oracle = MockCoordinator::default();
        raffle
            .perform_upkeep(Pubkey::new_unique(), START + INTERVAL as i64 + 1, &mut oracle)
            .unwrap();
        (raffle, oracle)
    }

    #[test]
    fn initializes_open_and_empty() {
        let raffle = raffle();
        assert_eq!(raffle.state(), RaffleState::Open);
        assert_eq!(raffle.entry_fee(), FEE);
        assert_eq!(raffle.interval(), INTERVAL);
        assert_eq!(raffle.num_entrants(), 0);
        assert_eq!(raffle.pool_balance(), 0);
        assert_eq!(raffle.last_timestamp(), START);
        assert_eq!(raffle.pending_request_id(), None);
        assert_eq!(raffle.request_confirmations(), 3);
        assert_eq!(raffle.num_words(), 1);
    }

    #[test]
    fn rejects_entry_below_fee() {
        let mut raffle = raffle();
        let before = raffle.clone();
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE - 1),
            Err(RaffleError::InsufficientFee)
        );
        assert_eq!(raffle, before);
    }

    #[test]
    fn records_entries_in_order_and_allows_reentry() {
        let mut raffle = raffle();
        let (alice, bob) = (Pubkey::new_unique(), Pubkey::new_unique());

        assert_eq!(
            raffle.enter(alice, FEE),
            Ok(RaffleEvent::EntryAccepted { player: alice, value: FEE })
        );
        raffle.enter(bob, FEE * 2).unwrap();
        raffle.enter(alice, FEE).unwrap();

        assert_eq!(raffle.num_entrants(), 3);
        assert_eq!(raffle.entrant(0), Some(alice));
        assert_eq!(raffle.entrant(1), Some(bob));
        assert_eq!(raffle.entrant(2), Some(alice));
        assert_eq!(raffle.entrant(3), None);
        assert_eq!(raffle.pool_balance(), FEE * 4);
    }

    #[test]
    fn rejects_entry_when_full() {
        let mut raffle = raffle();
        for _ in 0..8 {
            raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        }
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE),
            Err(RaffleError::RoundFull)
        );
        assert_eq!(raffle.num_entrants(), 8);
    }

    #[test]
    fn upkeep_waits_for_interval() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();

        let early = raffle.check_upkeep(START + INTERVAL as i64 - 1);
        assert!(!early.upkeep_needed);
        assert_eq!(early.blocker, Some(UpkeepBlocker::IntervalNotElapsed));

        let ready = raffle.check_upkeep(START + INTERVAL as i64);
        assert_eq!(ready, UpkeepStatus { upkeep_needed: true, blocker: None });
    }

    #[test]
    fn upkeep_false_without_entrants() {
        let raffle = raffle();
        let status = raffle.check_upkeep(START + 10 * INTERVAL as i64);
        assert_eq!(status.blocker, Some(UpkeepBlocker::NoEntrants));
    }

    #[test]
    fn perform_upkeep_rejects_when_not_needed() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let before = raffle.clone();
        let mut oracle = MockCoordinator::default();

        assert_eq!(
            raffle.perform_upkeep(Pubkey::new_unique(), START + 1, &mut oracle),
            Err(RaffleError::UpkeepNotNeeded)
        );
        assert_eq!(raffle, before);
        assert!(oracle.requests.is_empty());
    }

    #[test]
    fn perform_upkeep_starts_draw_and_closes_entries() {
        let requester = Pubkey::new_unique();
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let mut oracle = MockCoordinator::default();

        let event = raffle
            .perform_upkeep(requester, START + INTERVAL as i64 + 1, &mut oracle)
            .unwrap();

        assert_eq!(event, RaffleEvent::DrawStarted { request_id: 1 });
        assert_eq!(raffle.state(), RaffleState::Drawing);
        assert_eq!(raffle.pending_request_id(), Some(1));
        assert_eq!(oracle.requests.len(), 1);
        assert_eq!(oracle.requests[0].requester, requester);
        assert_eq!(oracle.requests[0].num_words, 1);
        assert_eq!(oracle.requests[0].request_confirmations, 3);

        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE),
            Err(RaffleError::RoundNotOpen)
        );
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), FEE - 1),
            Err(RaffleError::InsufficientFee)
        );
        assert!(!raffle.check_upkeep(START + 10 * INTERVAL as i64).upkeep_needed);
        assert_eq!(
            raffle.perform_upkeep(requester, START + 10 * INTERVAL as i64, &mut oracle),
            Err(RaffleError::UpkeepNotNeeded)
        );
    }

    #[test]
    fn oracle_failure_leaves_round_open() {
        let mut raffle = raffle();
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        let before = raffle.clone();
        let mut oracle = MockCoordinator { fail: true, ..Default::default() };

        assert!(raffle
            .perform_upkeep(Pubkey::new_unique(), START + INTERVAL as i64, &mut oracle)
            .is_err());
        assert_eq!(raffle, before);
    }

    #[test]
    fn single_entrant_wins_whole_pool() {
        let player = Pubkey::new_unique();
        let (mut raffle, _) = drawing_raffle(&[player]);
        let mut ledger = Ledger::default();
        let now = START + 100;

        let event = raffle
            .fulfill_randomness(1, &randomness_from_u64(777), now, &mut ledger)
            .unwrap();

        assert_eq!(
            event,
            RaffleEvent::WinnerPicked { winner: player, amount: FEE, request_id: 1 }
        );
        assert_eq!(ledger.balances[&player], FEE);
        assert_eq!(raffle.state(), RaffleState::Open);
        assert_eq!(raffle.num_entrants(), 0);
        assert_eq!(raffle.pool_balance(), 0);
        assert_eq!(raffle.pending_request_id(), None);
        assert_eq!(raffle.last_timestamp(), now);
        assert_eq!(raffle.recent_winner(), Some(player));
        assert_eq!(raffle.round(), 1);
    }

    #[test]
    fn winner_index_is_randomness_mod_entrants() {
        let players = [Pubkey::new_unique(), Pubkey::new_unique()];
        for r in [4u64, 9, 1_000_001] {
            let (mut raffle, _) = drawing_raffle(&players);
            let mut ledger = Ledger::default();
            raffle
                .fulfill_randomness(1, &randomness_from_u64(r), START + 100, &mut ledger)
                .unwrap();

            let winner = players[(r % 2) as usize];
            assert_eq!(ledger.balances.len(), 1);
            assert_eq!(ledger.balances[&winner], 2 * FEE);
        }
    }

    #[test]
    fn rejects_mismatched_or_replayed_request() {
        let (mut raffle, _) = drawing_raffle(&[Pubkey::new_unique()]);
        let before = raffle.clone();
        let mut ledger = Ledger::default();

        assert_eq!(
            raffle.fulfill_randomness(2, &[1; 32], START + 100, &mut ledger),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(raffle, before);

        raffle
            .fulfill_randomness(1, &[1; 32], START + 100, &mut ledger)
            .unwrap();
        assert_eq!(
            raffle.fulfill_randomness(1, &[1; 32], START + 101, &mut ledger),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(ledger.balances.values().sum::<u64>(), FEE);
    }

    #[test]
    fn rejected_transfer_rolls_back_everything() {
        let (mut raffle, _) = drawing_raffle(&[Pubkey::new_unique(), Pubkey::new_unique()]);
        let before = raffle.clone();
        let mut ledger = Ledger { reject: true, ..Default::default() };

        assert_eq!(
            raffle.fulfill_randomness(1, &[9; 32], START + 100, &mut ledger),
            Err(RaffleError::TransferFailed)
        );
        assert_eq!(raffle, before);
        assert_eq!(raffle.state(), RaffleState::Drawing);
        assert_eq!(raffle.pool_balance(), 2 * FEE);
    }

    #[test]
    fn stale_draw_can_be_cancelled_and_retried() {
        let player = Pubkey::new_unique();
        let (mut raffle, mut oracle) = drawing_raffle(&[player]);
        let requested_at = START + INTERVAL as i64 + 1;

        assert_eq!(
            raffle.cancel_stale_draw(requested_at + 599),
            Err(RaffleError::DrawNotStale)
        );
        assert_eq!(
            raffle.cancel_stale_draw(requested_at + 600),
            Ok(RaffleEvent::DrawCancelled { request_id: 1 })
        );
        assert_eq!(raffle.state(), RaffleState::Open);
        assert_eq!(raffle.num_entrants(), 1);
        assert_eq!(raffle.pool_balance(), FEE);
        assert_eq!(
            raffle.cancel_stale_draw(requested_at + 600),
            Err(RaffleError::RoundNotDrawing)
        );

        // The round is still ripe, so a new request goes out at once.
        let now = requested_at + 601;
        assert!(raffle.check_upkeep(now).upkeep_needed);
        raffle
            .perform_upkeep(Pubkey::new_unique(), now, &mut oracle)
            .unwrap();
        assert_eq!(raffle.pending_request_id(), Some(2));

        let mut ledger = Ledger::default();
        assert_eq!(
            raffle.fulfill_randomness(1, &[0; 32], now, &mut ledger),
            Err(RaffleError::UnknownRequest)
        );
        raffle.fulfill_randomness(2, &[0; 32], now, &mut ledger).unwrap();
        assert_eq!(ledger.balances[&player], FEE);
    }

    #[test]
    fn zero_timeout_disables_recovery() {
        let mut raffle = Raffle::new(
            Pubkey::new_unique(),
            255,
            RaffleConfig { draw_timeout: 0, ..config() },
            START,
        );
        raffle.enter(Pubkey::new_unique(), FEE).unwrap();
        raffle
            .perform_upkeep(
                Pubkey::new_unique(),
                START + INTERVAL as i64,
                &mut MockCoordinator::default(),
            )
            .unwrap();
        assert_eq!(
            raffle.cancel_stale_draw(START + 1_000_000),
            Err(RaffleError::DrawNotStale)
        );
    }

    proptest! {
        #[test]
        fn upkeep_needed_iff_all_conditions_hold(
            open in any::<bool>(),
            has_entrants in any::<bool>(),
            elapsed in 0u64..(3 * INTERVAL),
            pool in prop_oneof![Just(0u64), 1u64..u64::MAX],
        ) {
            let mut raffle = raffle();
            if has_entrants {
                raffle.entrants.push(Pubkey::new_unique());
            }
            raffle.pool_balance = pool;
            if !open {
                raffle.state = RaffleState::Drawing;
            }
            let now = START + elapsed as i64;

            let expected = open && has_entrants && elapsed >= INTERVAL && pool > 0;
            let status = raffle.check_upkeep(now);
            prop_assert_eq!(status.upkeep_needed, expected);
            prop_assert_eq!(status.blocker.is_none(), expected);
        }

        #[test]
        fn pool_tracks_successful_entries(values in proptest::collection::vec(0u64..(3 * FEE), 0..8)) {
            let mut raffle = raffle();
            let mut accepted = Vec::new();
            for value in values {
                if raffle.enter(Pubkey::new_unique(), value).is_ok() {
                    accepted.push(value);
                }
            }
            prop_assert_eq!(raffle.num_entrants(), accepted.len());
            prop_assert_eq!(raffle.pool_balance(), accepted.iter().sum::<u64>());
            prop_assert!(accepted.iter().all(|value| *value >= FEE));
        }
    }
}

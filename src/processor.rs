use crate::error::RaffleError;
use crate::instruction::RaffleInstruction;
use crate::oracle::LogCoordinator;
use crate::payout::LamportTransfer;
use crate::state::{find_raffle_address, Raffle, RaffleConfig, RAFFLE_SEED};

use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, config, program_id)
            }
            RaffleInstruction::EnterRaffle { value } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, value, program_id)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomness { request_id, randomness } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, randomness, program_id)
            }
            RaffleInstruction::CancelStaleDraw => {
                msg!("Instruction: Cancel Stale Draw");
                Self::process_cancel_stale_draw(accounts, program_id)
            }
        }
    }

    /// Checks that `raffle_info` is this program's raffle PDA
    fn check_raffle_account(raffle_info: &AccountInfo, program_id: &Pubkey) -> ProgramResult {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let (expected, _) = find_raffle_address(program_id);
        if *raffle_info.key != expected {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        Ok(())
    }

    /// Process the InitializeRaffle instruction
    ///
    /// Creates the raffle PDA sized for `config.max_entrants` and starts the first round.
    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_raffle_pubkey, bump_seed) = find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        if !config.is_valid() {
            msg!("Raffle config rejected: {:?}", config);
            return Err(RaffleError::InvalidConfig.into());
        }

        let space = Raffle::space(config.max_entrants);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        let signer_seeds: &[&[u8]] = &[RAFFLE_SEED, &[bump_seed]];
        let current_lamports = raffle_info.lamports();
        if current_lamports == 0 {
            invoke_signed(
                &system_instruction::create_account(
                    authority_info.key,
                    raffle_info.key,
                    rent_lamports,
                    space as u64,
                    program_id,
                ),
                &[
                    authority_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
                &[signer_seeds],
            )?;
        } else {
            // create_account refuses a funded address, so a prefunded PDA is
            // topped up, allocated and assigned in separate steps
            msg!("Raffle address already holds {} lamports", current_lamports);
            let top_up = rent_lamports.saturating_sub(current_lamports);
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(authority_info.key, raffle_info.key, top_up),
                    &[
                        authority_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(raffle_info.key, space as u64),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
            invoke_signed(
                &system_instruction::assign(raffle_info.key, program_id),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
        }

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(*authority_info.key, bump_seed, config, now);
        raffle.save(raffle_info)?;

        msg!(
            "Raffle initialized: EntryFee={}, Interval={}s, Oracle={}",
            config.entry_fee,
            config.interval,
            config.oracle.authority
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        value: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        Self::check_raffle_account(raffle_info, program_id)?;

        let mut raffle = Raffle::load(raffle_info)?;
        let event = raffle.enter(*player_info.key, value).map_err(|e| {
            msg!("Entry rejected: {} (fee {} lamports)", e, raffle.entry_fee());
            e
        })?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, value),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.save(raffle_info)?;
        event.emit();
        Ok(())
    }

    /// Never mutates the raffle; the status is returned as borsh-encoded return data
    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        Self::check_raffle_account(raffle_info, program_id)?;

        let raffle = Raffle::load(raffle_info)?;
        let status = raffle.check_upkeep(Clock::get()?.unix_timestamp);
        let encoded = status
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        set_return_data(&encoded);

        msg!(
            "Upkeep needed: {} ({:?})",
            status.upkeep_needed,
            status.blocker
        );
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        Self::check_raffle_account(raffle_info, program_id)?;

        let mut raffle = Raffle::load(raffle_info)?;
        let now = Clock::get()?.unix_timestamp;
        let mut coordinator = LogCoordinator::new(raffle.last_request_id);

        let event = match raffle.perform_upkeep(*raffle_info.key, now, &mut coordinator) {
            Ok(event) => event,
            Err(e) => {
                msg!(
                    "Upkeep rejected: balance={}, players={}, state={:?}, blocker={:?}",
                    raffle.pool_balance(),
                    raffle.num_entrants(),
                    raffle.state(),
                    raffle.check_upkeep(now).blocker
                );
                return Err(e.into());
            }
        };

        raffle.save(raffle_info)?;
        event.emit();
        Ok(())
    }

    /// Only the configured oracle may deliver randomness. The winner account must be
    /// the entrant the randomness selects; it receives the whole pool.
    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        randomness: [u8; 32],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        Self::check_raffle_account(raffle_info, program_id)?;
        let mut raffle = Raffle::load(raffle_info)?;

        if *oracle_info.key != raffle.config.oracle.authority {
            msg!("Randomness delivered by {} instead of the oracle", oracle_info.key);
            return Err(RaffleError::UnauthorizedOracle.into());
        }
        if !oracle_info.is_signer {
            msg!("Oracle must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let winner = raffle.drawn_winner(request_id, &randomness).map_err(|e| {
            msg!(
                "Request {} does not match pending request {:?}",
                request_id,
                raffle.pending_request_id()
            );
            e
        })?;
        if *winner_info.key != winner {
            msg!("Winner account {} does not match drawn entrant {}", winner_info.key, winner);
            return Err(RaffleError::InvalidWinnerAccount.into());
        }

        let now = Clock::get()?.unix_timestamp;
        let mut transfer = LamportTransfer {
            pool: raffle_info,
            recipient: winner_info,
        };
        let event = raffle.fulfill_randomness(request_id, &randomness, now, &mut transfer)?;

        raffle.save(raffle_info)?;
        event.emit();
        Ok(())
    }

    fn process_cancel_stale_draw(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        Self::check_raffle_account(raffle_info, program_id)?;

        let mut raffle = Raffle::load(raffle_info)?;
        let event = raffle.cancel_stale_draw(Clock::get()?.unix_timestamp)?;

        raffle.save(raffle_info)?;
        event.emit();
        Ok(())
    }
}

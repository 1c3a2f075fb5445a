use crate::error::RaffleError;
use solana_program::{account_info::AccountInfo, msg, pubkey::Pubkey};

/// Moves the prize to the winner
pub trait PrizeTransfer {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

/// Debits the program-owned pool account and credits the winner account directly
pub struct LamportTransfer<'a, 'b> {
    pub pool: &'a AccountInfo<'b>,
    pub recipient: &'a AccountInfo<'b>,
}

impl<'a, 'b> PrizeTransfer for LamportTransfer<'a, 'b> {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.recipient.key != winner {
            msg!("Recipient {} is not the winner {}", self.recipient.key, winner);
            return Err(RaffleError::TransferFailed);
        }
        if !self.recipient.is_writable || self.recipient.executable {
            msg!("Recipient account cannot receive lamports");
            return Err(RaffleError::TransferFailed);
        }

        let pool_lamports = self
            .pool
            .lamports()
            .checked_sub(amount)
            .ok_or(RaffleError::TransferFailed)?;
        let recipient_lamports = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::TransferFailed)?;

        **self
            .pool
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)? = pool_lamports;
        **self
            .recipient
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)? = recipient_lamports;

        msg!("Transferred {} lamports to {}", amount, winner);
        Ok(())
    }
}

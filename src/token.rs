//! External token ledger boundary.
//!
//! The staking engine never owns token balances itself. Deposits, refunds,
//! slashes and reward payouts all go through a [`TokenLedger`] supplied by
//! the host. Transfers must be synchronous and all-or-nothing: a failed
//! transfer leaves both accounts untouched, and the engine aborts the
//! surrounding ledger mutation.

use crate::types::Address;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Token transfer collaborator
pub trait TokenLedger: Send + Sync {
    /// Move `tokens` from one account to another. All-or-nothing.
    fn transfer(&self, from: &Address, to: &Address, tokens: u64) -> Result<(), TransferError>;

    /// Current balance of an account (0 for unknown accounts)
    fn balance_of(&self, owner: &Address) -> u64;
}

/// Transfer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("unknown account")]
    UnknownAccount,
}

/// In-memory token ledger for tests and single-process embedding
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: RwLock<HashMap<Address, u64>>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account out of thin air. Test seeding only.
    pub fn mint(&self, owner: &Address, tokens: u64) {
        let mut balances = self.balances.write();
        let balance = balances.entry(*owner).or_insert(0);
        *balance = balance.saturating_add(tokens);
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn transfer(&self, from: &Address, to: &Address, tokens: u64) -> Result<(), TransferError> {
        let mut balances = self.balances.write();

        let available = match balances.get(from) {
            Some(&balance) => balance,
            None => return Err(TransferError::UnknownAccount),
        };

        if available < tokens {
            return Err(TransferError::InsufficientFunds {
                available,
                required: tokens,
            });
        }

        if let Some(balance) = balances.get_mut(from) {
            *balance = available - tokens;
        }
        let target = balances.entry(*to).or_insert(0);
        *target = target.saturating_add(tokens);

        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.read().get(owner).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    #[test]
    fn test_mint_and_balance() {
        let ledger = InMemoryTokenLedger::new();
        assert_eq!(ledger.balance_of(&addr(1)), 0);

        ledger.mint(&addr(1), 500);
        ledger.mint(&addr(1), 250);
        assert_eq!(ledger.balance_of(&addr(1)), 750);
    }

    #[test]
    fn test_transfer_moves_tokens() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&addr(1), 100);

        ledger.transfer(&addr(1), &addr(2), 40).unwrap();

        assert_eq!(ledger.balance_of(&addr(1)), 60);
        assert_eq!(ledger.balance_of(&addr(2)), 40);
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&addr(1), 10);

        let result = ledger.transfer(&addr(1), &addr(2), 11);
        assert_eq!(
            result,
            Err(TransferError::InsufficientFunds {
                available: 10,
                required: 11,
            })
        );

        // Nothing moved
        assert_eq!(ledger.balance_of(&addr(1)), 10);
        assert_eq!(ledger.balance_of(&addr(2)), 0);
    }

    #[test]
    fn test_transfer_from_unknown_account() {
        let ledger = InMemoryTokenLedger::new();
        let result = ledger.transfer(&addr(9), &addr(2), 1);
        assert_eq!(result, Err(TransferError::UnknownAccount));
    }
}

//! Reward Pool
//!
//! Slashing and reward distribution. This is the only component allowed to
//! reduce an allocation and its staker's balance together: a slash moves
//! the penalized tokens from the custody vault into the reward pool,
//! retains the protocol fee, and credits the remainder to the validator
//! that reported the fault. Distribution pays the accumulated credits out
//! when the escrow completes.
//!
//! # Atomicity
//! Every check runs before any field changes, inside one critical section
//! over the shared ledger. Two validators racing to slash the same
//! allocation serialize through the lock, so the slashed total can never
//! exceed the allocation's remaining tokens.

use super::state::{LedgerEvent, RewardEntry, Role, StakingLedger};
use crate::token::TransferError;
use crate::types::{Address, EscrowId};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Slashing and payout component
#[derive(Clone)]
pub struct RewardPool {
    ledger: Arc<StakingLedger>,
}

impl RewardPool {
    pub(crate) fn new(ledger: Arc<StakingLedger>) -> Self {
        Self { ledger }
    }

    /// Slash part of an offender's allocation. Validator only.
    ///
    /// The full amount moves into the reward pool's custody; the protocol
    /// fee stays there permanently and the remainder is credited to the
    /// calling validator for later distribution. A slash no larger than
    /// the fee produces no credit but is still collected in full.
    pub fn slash(
        &self,
        caller: Address,
        staker: Address,
        escrow: EscrowId,
        tokens: u64,
    ) -> Result<(), RewardError> {
        if escrow.is_zero() {
            return Err(RewardError::InvalidEscrow);
        }
        if tokens == 0 {
            return Err(RewardError::NotPositive);
        }

        let mut state = self.ledger.state.write();

        match state.stakers.get(&caller) {
            Some(record) if record.role == Role::Validator => {}
            _ => {
                warn!(caller = %caller, "slash rejected for non-validator caller");
                return Err(RewardError::PermissionDenied);
            }
        }

        let pool = state.reward_pool;
        if pool.is_zero() {
            return Err(RewardError::InvalidAddress);
        }

        let allocated = match state.allocations.get(&escrow) {
            Some(allocation) if allocation.is_open() && allocation.staker == staker => {
                allocation.tokens
            }
            _ => return Err(RewardError::AllocationNotFound),
        };
        if tokens > allocated {
            return Err(RewardError::InsufficientAllocation {
                available: allocated,
                requested: tokens,
            });
        }

        // All checks passed; move the tokens, then update the ledger.
        self.ledger
            .token
            .transfer(&self.ledger.custody, &pool, tokens)?;

        if let Some(allocation) = state.allocations.get_mut(&escrow) {
            allocation.tokens = allocation.tokens.saturating_sub(tokens);
        }
        if let Some(record) = state.stakers.get_mut(&staker) {
            record.tokens_staked = record.tokens_staked.saturating_sub(tokens);
            record.tokens_allocated = record.tokens_allocated.saturating_sub(tokens);
        }
        state.total_staked = state.total_staked.saturating_sub(tokens);

        let fee = state.config.protocol_fee.min(tokens);
        state.fees_collected = state.fees_collected.saturating_add(fee);

        let reward = tokens - fee;
        if reward > 0 {
            let entries = state.rewards.entry(escrow).or_default();
            match entries.iter_mut().find(|e| e.slasher == caller) {
                Some(entry) => entry.tokens = entry.tokens.saturating_add(reward),
                None => entries.push(RewardEntry {
                    slasher: caller,
                    tokens: reward,
                }),
            }
        }

        state.record(LedgerEvent::StakeSlashed {
            slasher: caller,
            staker,
            escrow,
            tokens,
        });

        info!(slasher = %caller, staker = %staker, escrow = %escrow, tokens, "stake slashed");
        Ok(())
    }

    /// Pay out every reward entry for a finished escrow. Returns the total
    /// paid.
    ///
    /// Privileged entry point for the work-unit lifecycle: the escrow
    /// principal calls as itself. With no entries this is a no-op success,
    /// so a second call after a successful payout pays nothing. Entries are
    /// removed as each one is paid; if a transfer fails mid-stream the
    /// unpaid entries are kept and a retry settles exactly the remainder.
    pub fn distribute(&self, caller: Address, escrow: EscrowId) -> Result<u64, RewardError> {
        if escrow.is_zero() {
            return Err(RewardError::InvalidEscrow);
        }
        if caller != escrow {
            warn!(caller = %caller, escrow = %escrow, "distribute rejected for non-escrow caller");
            return Err(RewardError::PermissionDenied);
        }

        let mut state = self.ledger.state.write();
        let entries = match state.rewards.remove(&escrow) {
            Some(entries) => entries,
            None => return Ok(0),
        };
        let pool = state.reward_pool;

        let mut queue: VecDeque<RewardEntry> = entries.into();
        let mut paid = 0u64;
        while let Some(entry) = queue.front() {
            let (slasher, tokens) = (entry.slasher, entry.tokens);
            if let Err(err) = self.ledger.token.transfer(&pool, &slasher, tokens) {
                state.rewards.insert(escrow, queue.into());
                return Err(err.into());
            }
            paid = paid.saturating_add(tokens);
            queue.pop_front();
        }

        if paid > 0 {
            state.record(LedgerEvent::RewardsDistributed { escrow, tokens: paid });
            info!(escrow = %escrow, tokens = paid, "rewards distributed");
        }
        Ok(paid)
    }

    /// Pending reward entries for an escrow (empty when none)
    pub fn get_rewards(&self, escrow: &EscrowId) -> Vec<RewardEntry> {
        self.ledger
            .state
            .read()
            .rewards
            .get(escrow)
            .cloned()
            .unwrap_or_default()
    }

    /// Configured protocol fee per slash
    pub fn fees(&self) -> u64 {
        self.ledger.state.read().config.protocol_fee
    }

    /// Total protocol fees retained by the pool so far
    pub fn fees_collected(&self) -> u64 {
        self.ledger.state.read().fees_collected
    }

    /// Configured reward pool custody principal, if any
    pub fn reward_pool(&self) -> Option<Address> {
        let pool = self.ledger.state.read().reward_pool;
        if pool.is_zero() {
            None
        } else {
            Some(pool)
        }
    }
}

/// Reward pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardError {
    #[error("caller is not permitted to perform this operation")]
    PermissionDenied,

    #[error("escrow address cannot be zero")]
    InvalidEscrow,

    #[error("token amount must be positive")]
    NotPositive,

    #[error("no reward pool is configured")]
    InvalidAddress,

    #[error("no open allocation found for this escrow and staker")]
    AllocationNotFound,

    #[error("insufficient allocation: {available} remaining, {requested} requested")]
    InsufficientAllocation { available: u64, requested: u64 },

    #[error("token transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::state::StakingConfig;
    use crate::staking::StakingEngine;
    use crate::token::{InMemoryTokenLedger, TokenLedger};

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    fn admin() -> Address {
        addr(0xAD)
    }

    fn pool() -> Address {
        addr(0xBB)
    }

    fn validator() -> Address {
        addr(2)
    }

    /// Engine with operator `addr(1)` staked at 10 and allocated 5 to
    /// escrow `addr(0xE1)`, and a registered validator
    fn setup() -> (StakingEngine, Arc<InMemoryTokenLedger>) {
        setup_with_fee(1)
    }

    fn setup_with_fee(protocol_fee: u64) -> (StakingEngine, Arc<InMemoryTokenLedger>) {
        let token = Arc::new(InMemoryTokenLedger::new());
        let engine = StakingEngine::new(
            admin(),
            addr(0xCC),
            token.clone(),
            StakingConfig {
                protocol_fee,
                ..Default::default()
            },
        );
        let registry = engine.registry();
        registry
            .set_staker(admin(), addr(1), Role::Operator)
            .unwrap();
        registry
            .set_staker(admin(), validator(), Role::Validator)
            .unwrap();
        registry.set_reward_pool(admin(), pool()).unwrap();
        token.mint(&addr(1), 100);
        registry.stake(addr(1), 10).unwrap();
        engine.allocations().allocate(addr(1), addr(0xE1), 5).unwrap();
        (engine, token)
    }

    #[test]
    fn test_slash_reduces_allocation_and_stake() {
        let (engine, token) = setup();
        let rewards = engine.rewards();

        rewards.slash(validator(), addr(1), addr(0xE1), 3).unwrap();

        let allocation = engine.allocations().get_allocation(&addr(0xE1)).unwrap();
        assert_eq!(allocation.tokens, 2);

        let staker = engine.registry().get_staker(&addr(1)).unwrap();
        assert_eq!(staker.tokens_staked, 7);
        assert_eq!(staker.tokens_allocated, 2);

        assert_eq!(token.balance_of(&pool()), 3);
        assert_eq!(token.balance_of(&addr(0xCC)), 7);
        assert_eq!(engine.registry().total_staked(), 7);

        // Fee 1 retained, remainder credited to the validator
        assert_eq!(rewards.fees_collected(), 1);
        assert_eq!(
            rewards.get_rewards(&addr(0xE1)),
            vec![RewardEntry {
                slasher: validator(),
                tokens: 2,
            }]
        );
    }

    #[test]
    fn test_slash_requires_validator_role() {
        let (engine, _) = setup();

        // Operators cannot slash, nor can unknown identities
        assert_eq!(
            engine.rewards().slash(addr(1), addr(1), addr(0xE1), 1),
            Err(RewardError::PermissionDenied)
        );
        assert_eq!(
            engine.rewards().slash(addr(9), addr(1), addr(0xE1), 1),
            Err(RewardError::PermissionDenied)
        );
    }

    #[test]
    fn test_slash_rejects_zero_inputs() {
        let (engine, _) = setup();

        assert_eq!(
            engine
                .rewards()
                .slash(validator(), addr(1), Address::zero(), 1),
            Err(RewardError::InvalidEscrow)
        );
        assert_eq!(
            engine.rewards().slash(validator(), addr(1), addr(0xE1), 0),
            Err(RewardError::NotPositive)
        );
    }

    #[test]
    fn test_slash_unknown_allocation() {
        let (engine, _) = setup();

        // Wrong escrow
        assert_eq!(
            engine.rewards().slash(validator(), addr(1), addr(0xE9), 1),
            Err(RewardError::AllocationNotFound)
        );
        // Right escrow, wrong staker
        assert_eq!(
            engine.rewards().slash(validator(), addr(3), addr(0xE1), 1),
            Err(RewardError::AllocationNotFound)
        );
    }

    #[test]
    fn test_slash_bounded_by_allocation() {
        let (engine, token) = setup();

        let result = engine.rewards().slash(validator(), addr(1), addr(0xE1), 6);
        assert_eq!(
            result,
            Err(RewardError::InsufficientAllocation {
                available: 5,
                requested: 6,
            })
        );

        // Balances untouched on rejection
        let staker = engine.registry().get_staker(&addr(1)).unwrap();
        assert_eq!(staker.tokens_staked, 10);
        assert_eq!(
            engine
                .allocations()
                .get_allocation(&addr(0xE1))
                .unwrap()
                .tokens,
            5
        );
        assert_eq!(token.balance_of(&pool()), 0);
    }

    #[test]
    fn test_slash_requires_configured_pool() {
        let token = Arc::new(InMemoryTokenLedger::new());
        let engine = StakingEngine::new(
            admin(),
            addr(0xCC),
            token.clone(),
            StakingConfig::default(),
        );
        let registry = engine.registry();
        registry
            .set_staker(admin(), addr(1), Role::Operator)
            .unwrap();
        registry
            .set_staker(admin(), validator(), Role::Validator)
            .unwrap();
        token.mint(&addr(1), 10);
        registry.stake(addr(1), 10).unwrap();
        engine.allocations().allocate(addr(1), addr(0xE1), 5).unwrap();

        assert_eq!(
            engine.rewards().slash(validator(), addr(1), addr(0xE1), 1),
            Err(RewardError::InvalidAddress)
        );
    }

    #[test]
    fn test_slash_at_or_below_fee_keeps_everything() {
        let (engine, token) = setup_with_fee(2);
        let rewards = engine.rewards();

        rewards.slash(validator(), addr(1), addr(0xE1), 2).unwrap();

        // Full amount retained as fee, no reward entry
        assert!(rewards.get_rewards(&addr(0xE1)).is_empty());
        assert_eq!(rewards.fees_collected(), 2);
        assert_eq!(token.balance_of(&pool()), 2);
    }

    #[test]
    fn test_repeat_slashes_merge_entries() {
        let (engine, _) = setup();
        let rewards = engine.rewards();

        rewards.slash(validator(), addr(1), addr(0xE1), 2).unwrap();
        rewards.slash(validator(), addr(1), addr(0xE1), 3).unwrap();

        // Two slashes by the same validator merge into one entry:
        // (2 - 1) + (3 - 1) = 3
        assert_eq!(
            rewards.get_rewards(&addr(0xE1)),
            vec![RewardEntry {
                slasher: validator(),
                tokens: 3,
            }]
        );
        assert_eq!(rewards.fees_collected(), 2);
    }

    #[test]
    fn test_distribute_pays_and_clears() {
        let (engine, token) = setup();
        let rewards = engine.rewards();

        rewards.slash(validator(), addr(1), addr(0xE1), 3).unwrap();

        let paid = rewards.distribute(addr(0xE1), addr(0xE1)).unwrap();
        assert_eq!(paid, 2);
        assert_eq!(token.balance_of(&validator()), 2);
        assert_eq!(token.balance_of(&pool()), 1); // fee stays
        assert!(rewards.get_rewards(&addr(0xE1)).is_empty());

        // Idempotent: a second call pays nothing
        assert_eq!(rewards.distribute(addr(0xE1), addr(0xE1)), Ok(0));
        assert_eq!(token.balance_of(&validator()), 2);
    }

    #[test]
    fn test_distribute_requires_escrow_caller() {
        let (engine, _) = setup();
        assert_eq!(
            engine.rewards().distribute(validator(), addr(0xE1)),
            Err(RewardError::PermissionDenied)
        );
    }

    #[test]
    fn test_distribute_without_slashes_is_noop() {
        let (engine, _) = setup();
        assert_eq!(engine.rewards().distribute(addr(0xE7), addr(0xE7)), Ok(0));
    }

    #[test]
    fn test_fees_accessor() {
        let (engine, _) = setup_with_fee(4);
        assert_eq!(engine.rewards().fees(), 4);
        assert_eq!(engine.rewards().reward_pool(), Some(pool()));
    }
}

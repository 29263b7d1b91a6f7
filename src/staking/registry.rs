//! Stake Registry
//!
//! Maintains the authoritative record of participant roles and raw
//! collateral balances. Deposits move tokens from the staker into the
//! custody vault; withdrawals move them back after a mandatory lock
//! period measured on the host-supplied block clock.
//!
//! # Withdrawal flow
//! `unstake` never pays out directly. It queues the amount as locked and
//! stamps the earliest block at which `withdraw` may release it. Repeated
//! unstakes accumulate into the same queue and push the deadline out.

use super::state::{LedgerEvent, Role, Staker, StakingLedger};
use crate::token::TransferError;
use crate::types::Address;
use std::sync::Arc;
use tracing::{debug, warn};

/// Role and collateral accounting component
#[derive(Clone)]
pub struct StakeRegistry {
    ledger: Arc<StakingLedger>,
}

impl StakeRegistry {
    pub(crate) fn new(ledger: Arc<StakingLedger>) -> Self {
        Self { ledger }
    }

    fn require_admin(&self, caller: &Address) -> Result<(), StakeError> {
        if *caller != self.ledger.admin {
            warn!(caller = %caller, "admin operation rejected");
            return Err(StakeError::PermissionDenied);
        }
        Ok(())
    }

    /// Assign a role to an identity. Administrator only.
    ///
    /// Creates a zero-balance staker record on first assignment;
    /// re-assignment overwrites the role and leaves balances untouched.
    pub fn set_staker(
        &self,
        caller: Address,
        identity: Address,
        role: Role,
    ) -> Result<(), StakeError> {
        self.require_admin(&caller)?;
        if identity.is_zero() {
            return Err(StakeError::InvalidIdentity);
        }
        if identity == caller {
            return Err(StakeError::SelfAssignment);
        }

        let mut state = self.ledger.state.write();
        match state.stakers.get_mut(&identity) {
            Some(staker) => staker.role = role,
            None => {
                state.stakers.insert(identity, Staker::new(role));
                state.registration_order.push(identity);
            }
        }

        debug!(identity = %identity, ?role, "role assigned");
        Ok(())
    }

    /// Deposit collateral from the caller's external balance
    pub fn stake(&self, caller: Address, tokens: u64) -> Result<(), StakeError> {
        if tokens == 0 {
            return Err(StakeError::NotPositive);
        }

        let mut state = self.ledger.state.write();
        let minimum = state.config.minimum_stake;

        let staker = state
            .stakers
            .get_mut(&caller)
            .ok_or(StakeError::PermissionDenied)?;

        let new_total = staker.tokens_staked.saturating_add(tokens);
        if new_total < minimum {
            return Err(StakeError::BelowMinimumStake {
                remaining: new_total,
                minimum,
            });
        }

        // External transfer first. A failure leaves the ledger untouched.
        self.ledger
            .token
            .transfer(&caller, &self.ledger.custody, tokens)?;

        staker.tokens_staked = new_total;
        state.total_staked = state.total_staked.saturating_add(tokens);
        state.record(LedgerEvent::StakeDeposited {
            staker: caller,
            tokens,
        });

        debug!(staker = %caller, tokens, "stake deposited");
        Ok(())
    }

    /// Queue collateral for withdrawal after the lock period
    pub fn unstake(&self, caller: Address, tokens: u64) -> Result<(), StakeError> {
        if tokens == 0 {
            return Err(StakeError::NotPositive);
        }

        let mut state = self.ledger.state.write();
        let minimum = state.config.minimum_stake;
        let lock_period = state.config.lock_period;
        let allow_full_exit = state.config.allow_full_exit;
        let current_block = state.current_block;

        let staker = state
            .stakers
            .get_mut(&caller)
            .ok_or(StakeError::PermissionDenied)?;

        let available = staker.available();
        if tokens > available {
            return Err(StakeError::InsufficientStake {
                available,
                requested: tokens,
            });
        }

        // What would remain staked once everything queued is withdrawn
        let remaining = staker
            .tokens_staked
            .saturating_sub(staker.tokens_locked)
            .saturating_sub(tokens);
        let full_exit = remaining == 0 && allow_full_exit;
        if remaining < minimum && !full_exit {
            return Err(StakeError::BelowMinimumStake { remaining, minimum });
        }

        staker.tokens_locked = staker.tokens_locked.saturating_add(tokens);
        staker.tokens_locked_until = current_block.saturating_add(lock_period);
        let locked_until = staker.tokens_locked_until;

        state.record(LedgerEvent::StakeLocked {
            staker: caller,
            tokens,
            locked_until,
        });

        debug!(staker = %caller, tokens, locked_until, "stake locked");
        Ok(())
    }

    /// Release all queued collateral once the lock period has elapsed.
    /// Returns the amount paid out.
    pub fn withdraw(&self, caller: Address) -> Result<u64, StakeError> {
        let mut state = self.ledger.state.write();
        let current_block = state.current_block;

        let staker = state
            .stakers
            .get_mut(&caller)
            .ok_or(StakeError::PermissionDenied)?;

        if staker.tokens_locked == 0 {
            return Err(StakeError::NothingToWithdraw);
        }
        if current_block < staker.tokens_locked_until {
            return Err(StakeError::StillLocked {
                locked_until: staker.tokens_locked_until,
                current_block,
            });
        }

        let tokens = staker.tokens_locked;
        self.ledger
            .token
            .transfer(&self.ledger.custody, &caller, tokens)?;

        staker.tokens_staked = staker.tokens_staked.saturating_sub(tokens);
        staker.tokens_locked = 0;
        staker.tokens_locked_until = 0;
        state.total_staked = state.total_staked.saturating_sub(tokens);
        state.record(LedgerEvent::StakeWithdrawn {
            staker: caller,
            tokens,
        });

        debug!(staker = %caller, tokens, "stake withdrawn");
        Ok(tokens)
    }

    /// Set the minimum stake floor. Administrator only.
    pub fn set_minimum_stake(&self, caller: Address, value: u64) -> Result<(), StakeError> {
        self.require_admin(&caller)?;
        if value == 0 {
            return Err(StakeError::NotPositive);
        }
        self.ledger.state.write().config.minimum_stake = value;
        Ok(())
    }

    /// Set the withdrawal lock period in blocks. Administrator only.
    pub fn set_lock_period(&self, caller: Address, value: u64) -> Result<(), StakeError> {
        self.require_admin(&caller)?;
        if value == 0 {
            return Err(StakeError::NotPositive);
        }
        self.ledger.state.write().config.lock_period = value;
        Ok(())
    }

    /// Set the reward pool custody principal. Administrator only.
    pub fn set_reward_pool(&self, caller: Address, pool: Address) -> Result<(), StakeError> {
        self.require_admin(&caller)?;
        if pool.is_zero() {
            return Err(StakeError::InvalidAddress);
        }
        self.ledger.state.write().reward_pool = pool;
        Ok(())
    }

    /// Whether the identity has any collateral deposited
    pub fn has_stake(&self, identity: &Address) -> bool {
        self.ledger
            .state
            .read()
            .stakers
            .get(identity)
            .map(|s| s.has_stake())
            .unwrap_or(false)
    }

    /// Whether the identity currently holds the given role
    pub fn is_role(&self, identity: &Address, role: Role) -> bool {
        self.ledger
            .state
            .read()
            .stakers
            .get(identity)
            .map(|s| s.role == role)
            .unwrap_or(false)
    }

    /// Get a staker record by identity
    pub fn get_staker(&self, identity: &Address) -> Option<Staker> {
        self.ledger.state.read().stakers.get(identity).cloned()
    }

    /// Collateral the identity could still allocate or unstake
    pub fn available_stake(&self, identity: &Address) -> u64 {
        self.ledger
            .state
            .read()
            .stakers
            .get(identity)
            .map(|s| s.available())
            .unwrap_or(0)
    }

    /// Sum of all deposited collateral
    pub fn total_staked(&self) -> u64 {
        self.ledger.state.read().total_staked
    }

    /// Current minimum stake floor
    pub fn minimum_stake(&self) -> u64 {
        self.ledger.state.read().config.minimum_stake
    }

    /// Current lock period in blocks
    pub fn lock_period(&self) -> u64 {
        self.ledger.state.read().config.lock_period
    }
}

/// Stake registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakeError {
    #[error("caller is not permitted to perform this operation")]
    PermissionDenied,

    #[error("the zero address cannot hold a role")]
    InvalidIdentity,

    #[error("stakers cannot assign their own role")]
    SelfAssignment,

    #[error("token amount must be positive")]
    NotPositive,

    #[error("remaining stake {remaining} is below the minimum of {minimum}")]
    BelowMinimumStake { remaining: u64, minimum: u64 },

    #[error("insufficient stake: {available} available, {requested} requested")]
    InsufficientStake { available: u64, requested: u64 },

    #[error("no tokens are queued for withdrawal")]
    NothingToWithdraw,

    #[error("tokens locked until block {locked_until}, current block is {current_block}")]
    StillLocked {
        locked_until: u64,
        current_block: u64,
    },

    #[error("invalid address")]
    InvalidAddress,

    #[error("token transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

//! Allocation Table
//!
//! Tracks stake earmarked against individual escrows. An escrow carries at
//! most one open allocation at a time; its tokens are the only collateral a
//! validator may slash for faults in that escrow.

use super::state::{Allocation, LedgerEvent, StakingLedger};
use crate::types::{Address, EscrowId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stake earmarking component
#[derive(Clone)]
pub struct AllocationTable {
    ledger: Arc<StakingLedger>,
}

impl AllocationTable {
    pub(crate) fn new(ledger: Arc<StakingLedger>) -> Self {
        Self { ledger }
    }

    /// Commit available stake to an escrow
    pub fn allocate(
        &self,
        caller: Address,
        escrow: EscrowId,
        tokens: u64,
    ) -> Result<(), AllocationError> {
        if escrow.is_zero() {
            return Err(AllocationError::InvalidEscrow);
        }
        if tokens == 0 {
            return Err(AllocationError::NotPositive);
        }

        let mut state = self.ledger.state.write();
        let current_block = state.current_block;

        let available = match state.stakers.get(&caller) {
            Some(staker) => staker.available(),
            None => return Err(AllocationError::PermissionDenied),
        };

        if let Some(existing) = state.allocations.get(&escrow) {
            if existing.is_open() {
                return Err(AllocationError::AllocationExists);
            }
        }

        if tokens > available {
            return Err(AllocationError::InsufficientStake {
                available,
                requested: tokens,
            });
        }

        if let Some(staker) = state.stakers.get_mut(&caller) {
            staker.tokens_allocated = staker.tokens_allocated.saturating_add(tokens);
        }
        state.allocations.insert(
            escrow,
            Allocation {
                escrow,
                staker: caller,
                tokens,
                created_at: current_block,
                closed_at: None,
            },
        );
        state.record(LedgerEvent::StakeAllocated {
            staker: caller,
            escrow,
            tokens,
            created_at: current_block,
        });

        debug!(staker = %caller, escrow = %escrow, tokens, "stake allocated");
        Ok(())
    }

    /// Close an escrow's allocation, returning the remaining tokens to the
    /// staker's available balance.
    ///
    /// Privileged entry point for the work-unit lifecycle: the escrow
    /// principal calls as itself.
    pub fn close(&self, caller: Address, escrow: EscrowId) -> Result<(), AllocationError> {
        if escrow.is_zero() {
            return Err(AllocationError::InvalidEscrow);
        }
        if caller != escrow {
            warn!(caller = %caller, escrow = %escrow, "close rejected for non-escrow caller");
            return Err(AllocationError::PermissionDenied);
        }

        let mut state = self.ledger.state.write();
        let current_block = state.current_block;

        let (staker_addr, remaining) = match state.allocations.get_mut(&escrow) {
            Some(allocation) if allocation.is_open() => {
                allocation.closed_at = Some(current_block);
                (allocation.staker, allocation.tokens)
            }
            _ => return Err(AllocationError::AllocationNotFound),
        };

        if let Some(staker) = state.stakers.get_mut(&staker_addr) {
            staker.tokens_allocated = staker.tokens_allocated.saturating_sub(remaining);
        }
        state.record(LedgerEvent::AllocationClosed {
            staker: staker_addr,
            escrow,
            closed_at: current_block,
        });

        debug!(staker = %staker_addr, escrow = %escrow, remaining, "allocation closed");
        Ok(())
    }

    /// Get the allocation recorded for an escrow, open or closed
    pub fn get_allocation(&self, escrow: &EscrowId) -> Option<Allocation> {
        self.ledger.state.read().allocations.get(escrow).cloned()
    }

    /// Whether an open allocation exists for the escrow
    pub fn is_allocation(&self, escrow: &EscrowId) -> bool {
        self.ledger
            .state
            .read()
            .allocations
            .get(escrow)
            .map(|a| a.is_open())
            .unwrap_or(false)
    }
}

/// Allocation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("caller is not permitted to perform this operation")]
    PermissionDenied,

    #[error("escrow address cannot be zero")]
    InvalidEscrow,

    #[error("token amount must be positive")]
    NotPositive,

    #[error("an open allocation already exists for this escrow")]
    AllocationExists,

    #[error("no open allocation found for this escrow")]
    AllocationNotFound,

    #[error("insufficient stake: {available} available, {requested} requested")]
    InsufficientStake { available: u64, requested: u64 },
}

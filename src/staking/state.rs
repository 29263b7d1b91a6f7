//! Shared ledger state and record types.
//!
//! All four staking components operate on one [`LedgerState`] behind a
//! single write lock, so every public operation is a transaction: it
//! validates, then either applies completely or not at all, and no caller
//! ever observes a partially-applied effect of another operation.

use crate::token::TokenLedger;
use crate::types::{Address, EscrowId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Participant role, assigned by the administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Launches escrows and backs them with collateral
    Operator,
    /// Audits results and is allowed to slash
    Validator,
    /// Routes work and funds between parties
    ExchangeOracle,
    /// Scores worker reputation
    ReputationOracle,
    /// Records intermediate results
    RecordingOracle,
}

/// Per-identity collateral record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staker {
    /// Assigned role
    pub role: Role,
    /// Total deposited collateral not yet withdrawn
    pub tokens_staked: u64,
    /// Portion of `tokens_staked` committed to open allocations
    pub tokens_allocated: u64,
    /// Portion of `tokens_staked` queued for withdrawal
    pub tokens_locked: u64,
    /// Block height after which locked tokens become withdrawable (0 when
    /// nothing is locked)
    pub tokens_locked_until: u64,
}

impl Staker {
    /// New staker with zero balances
    pub fn new(role: Role) -> Self {
        Self {
            role,
            tokens_staked: 0,
            tokens_allocated: 0,
            tokens_locked: 0,
            tokens_locked_until: 0,
        }
    }

    /// Collateral not committed to an allocation or queued for withdrawal
    pub fn available(&self) -> u64 {
        self.tokens_staked
            .saturating_sub(self.tokens_allocated)
            .saturating_sub(self.tokens_locked)
    }

    /// Whether any collateral is deposited
    pub fn has_stake(&self) -> bool {
        self.tokens_staked > 0
    }
}

/// Stake earmarked against a single escrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Escrow the stake secures
    pub escrow: EscrowId,
    /// Owning staker
    pub staker: Address,
    /// Remaining committed tokens. Decreases on slash, never increases.
    pub tokens: u64,
    /// Block height at creation
    pub created_at: u64,
    /// Block height at close, `None` while open
    pub closed_at: Option<u64>,
}

impl Allocation {
    /// Whether the allocation still secures its escrow
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// Reward owed to a validator for slashes against one escrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Validator that performed the slash
    pub slasher: Address,
    /// Tokens owed (slashed amount minus the protocol fee)
    pub tokens: u64,
}

/// Policy knobs for the staking engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Floor below which a stake balance may not fall
    pub minimum_stake: u64,
    /// Blocks between `unstake` and a permitted `withdraw`
    pub lock_period: u64,
    /// Fee retained by the reward pool out of every slash
    pub protocol_fee: u64,
    /// Whether unstaking down to exactly zero is permitted. A non-zero
    /// remainder below `minimum_stake` is always rejected.
    pub allow_full_exit: bool,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            minimum_stake: 2,
            lock_period: 2,
            protocol_fee: 1,
            allow_full_exit: true,
        }
    }
}

/// Ledger mutation record, appended in the same critical section as the
/// mutation it describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    StakeDeposited {
        staker: Address,
        tokens: u64,
    },
    StakeLocked {
        staker: Address,
        tokens: u64,
        locked_until: u64,
    },
    StakeWithdrawn {
        staker: Address,
        tokens: u64,
    },
    StakeAllocated {
        staker: Address,
        escrow: EscrowId,
        tokens: u64,
        created_at: u64,
    },
    AllocationClosed {
        staker: Address,
        escrow: EscrowId,
        closed_at: u64,
    },
    StakeSlashed {
        slasher: Address,
        staker: Address,
        escrow: EscrowId,
        tokens: u64,
    },
    RewardsDistributed {
        escrow: EscrowId,
        tokens: u64,
    },
}

/// Mutable ledger state, guarded by the engine's single lock
#[derive(Debug)]
pub(crate) struct LedgerState {
    /// Stakers by identity
    pub(crate) stakers: HashMap<Address, Staker>,
    /// Identities in first-assignment order, for directory ordering
    pub(crate) registration_order: Vec<Address>,
    /// Allocations by escrow
    pub(crate) allocations: HashMap<EscrowId, Allocation>,
    /// Pending reward entries by escrow
    pub(crate) rewards: HashMap<EscrowId, Vec<RewardEntry>>,
    /// Sum of `tokens_staked` over all stakers
    pub(crate) total_staked: u64,
    /// Protocol fees retained by the reward pool so far
    pub(crate) fees_collected: u64,
    /// Logical clock supplied by the host. Only moves forward.
    pub(crate) current_block: u64,
    /// Custody principal for slashed tokens. Zero until configured.
    pub(crate) reward_pool: Address,
    /// Policy configuration
    pub(crate) config: StakingConfig,
    /// Mutation log
    pub(crate) events: Vec<LedgerEvent>,
}

impl LedgerState {
    pub(crate) fn new(config: StakingConfig) -> Self {
        Self {
            stakers: HashMap::new(),
            registration_order: Vec::new(),
            allocations: HashMap::new(),
            rewards: HashMap::new(),
            total_staked: 0,
            fees_collected: 0,
            current_block: 0,
            reward_pool: Address::zero(),
            config,
            events: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}

/// Shared store handed to every component
pub(crate) struct StakingLedger {
    /// Administrator principal
    pub(crate) admin: Address,
    /// Vault principal holding all staked collateral in the token ledger
    pub(crate) custody: Address,
    /// External token collaborator
    pub(crate) token: Arc<dyn TokenLedger>,
    /// Guarded ledger state
    pub(crate) state: RwLock<LedgerState>,
}

impl StakingLedger {
    pub(crate) fn new(
        admin: Address,
        custody: Address,
        token: Arc<dyn TokenLedger>,
        config: StakingConfig,
    ) -> Self {
        Self {
            admin,
            custody,
            token,
            state: RwLock::new(LedgerState::new(config)),
        }
    }
}

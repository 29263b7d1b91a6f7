//! Stake Ledger & Slashing Module for Hivemind
//!
//! This module handles collateral deposits, per-escrow stake allocation,
//! validator-driven slashing and reward payout for the Hivemind
//! work-escrow protocol.
//!
//! # Components
//! Four components share one ledger store behind a single lock, so every
//! public operation is atomic and no caller observes another operation's
//! partial effect:
//! - [`StakeRegistry`]: roles and raw staked/locked balances
//! - [`AllocationTable`]: stake earmarked against escrows
//! - [`RewardPool`]: slashing, protocol-fee retention, payouts
//! - [`StakerDirectory`]: paginated read view for reporting
//!
//! # Boundaries
//! Token custody lives in an external [`TokenLedger`](crate::token::TokenLedger);
//! the logical clock (block height) is injected by the host through
//! [`StakingEngine::set_block`]; escrows authorize their privileged calls
//! (`close`, `distribute`) by calling as themselves.

pub mod allocation;
pub mod directory;
pub mod registry;
pub mod rewards;
pub mod state;

pub use allocation::{AllocationError, AllocationTable};
pub use directory::{DirectoryError, StakerDirectory, StakerListing, StakerOrder};
pub use registry::{StakeError, StakeRegistry};
pub use rewards::{RewardError, RewardPool};
pub use state::{Allocation, LedgerEvent, RewardEntry, Role, Staker, StakingConfig};

use crate::token::TokenLedger;
use crate::types::Address;
use state::StakingLedger;
use std::sync::Arc;

/// Owner of the shared ledger store. Hands out component handles that are
/// cheap to clone and safe to use from multiple threads.
pub struct StakingEngine {
    ledger: Arc<StakingLedger>,
}

impl StakingEngine {
    /// Create an engine.
    ///
    /// `admin` is the principal allowed to assign roles and change policy;
    /// `custody` is the vault account holding all staked collateral in the
    /// external token ledger.
    pub fn new(
        admin: Address,
        custody: Address,
        token: Arc<dyn TokenLedger>,
        config: StakingConfig,
    ) -> Self {
        Self {
            ledger: Arc::new(StakingLedger::new(admin, custody, token, config)),
        }
    }

    /// Role and collateral accounting handle
    pub fn registry(&self) -> StakeRegistry {
        StakeRegistry::new(self.ledger.clone())
    }

    /// Stake earmarking handle
    pub fn allocations(&self) -> AllocationTable {
        AllocationTable::new(self.ledger.clone())
    }

    /// Slashing and payout handle
    pub fn rewards(&self) -> RewardPool {
        RewardPool::new(self.ledger.clone())
    }

    /// Reporting handle
    pub fn directory(&self) -> StakerDirectory {
        StakerDirectory::new(self.ledger.clone())
    }

    /// Advance the logical clock. Values below the current height are
    /// ignored; the clock only moves forward.
    pub fn set_block(&self, height: u64) {
        let mut state = self.ledger.state.write();
        if height > state.current_block {
            state.current_block = height;
        }
    }

    /// Current logical clock value
    pub fn current_block(&self) -> u64 {
        self.ledger.state.read().current_block
    }

    /// Most recent ledger events, newest first
    pub fn recent_events(&self, count: usize) -> Vec<LedgerEvent> {
        self.ledger
            .state
            .read()
            .events
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect()
    }
}

//! # Hivemind Staking
//!
//! Stake ledger and slashing engine for the Hivemind work-escrow protocol.
//! Participants deposit collateral and earmark it against the escrows they
//! work on. Validators penalize misbehaving operators; slashed tokens are
//! redistributed (minus a protocol fee) to the validators who caught the
//! fault.
//!
//! ## Core Features
//! - Role-gated collateral accounting with a configurable minimum stake
//! - Time-locked withdrawal measured on the host's block clock
//! - Exclusive per-escrow stake allocation
//! - Atomic slashing with protocol-fee retention and merged reward credits
//! - Escrow-authorized reward distribution, idempotent by construction
//! - Paginated staker directory for reporting layers
//!
//! ## Boundaries
//! Token custody, transport, signing and the escrow lifecycle live outside
//! this crate. Every operation takes the authenticated caller as an
//! explicit parameter, and token movements go through the host-supplied
//! [`TokenLedger`].

pub mod staking;
pub mod token;
pub mod types;

// Re-exports
pub use staking::{
    Allocation, AllocationError, AllocationTable, DirectoryError, LedgerEvent, RewardEntry,
    RewardError, RewardPool, Role, StakeError, StakeRegistry, Staker, StakerDirectory,
    StakerListing, StakerOrder, StakingConfig, StakingEngine,
};
pub use token::{InMemoryTokenLedger, TokenLedger, TransferError};
pub use types::{Address, AddressParseError, EscrowId};

//! Staker Directory
//!
//! Paginated read view over the registry for reporting and UI layers.
//! Pages have a fixed width: slots past the end of the result set are
//! `None`, so callers can tell padding apart from a staker who happens to
//! hold zero tokens.

use super::state::{Role, StakingLedger};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Requested ordering for directory pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StakerOrder {
    /// First-assignment order
    #[default]
    Registration,
    /// `tokens_staked` descending, ties broken by registration order
    Stake,
}

/// One directory row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerListing {
    pub identity: Address,
    pub role: Role,
    pub tokens_staked: u64,
    pub tokens_allocated: u64,
    pub tokens_locked: u64,
    pub tokens_locked_until: u64,
}

/// Read-only reporting component
#[derive(Clone)]
pub struct StakerDirectory {
    ledger: Arc<StakingLedger>,
}

impl StakerDirectory {
    pub(crate) fn new(ledger: Arc<StakingLedger>) -> Self {
        Self { ledger }
    }

    /// List stakers holding `role`, one fixed-width page at a time.
    ///
    /// `page` is 1-indexed. The returned vector always has exactly
    /// `page_size` slots; a page past the end of the data is all `None`.
    pub fn list_stakers(
        &self,
        role: Role,
        page: usize,
        page_size: usize,
        order: StakerOrder,
    ) -> Result<Vec<Option<StakerListing>>, DirectoryError> {
        if page < 1 {
            return Err(DirectoryError::InvalidPage);
        }
        if page_size < 1 {
            return Err(DirectoryError::InvalidPageSize);
        }

        let state = self.ledger.state.read();
        let mut listings: Vec<StakerListing> = state
            .registration_order
            .iter()
            .filter_map(|identity| {
                state
                    .stakers
                    .get(identity)
                    .filter(|staker| staker.role == role)
                    .map(|staker| StakerListing {
                        identity: *identity,
                        role: staker.role,
                        tokens_staked: staker.tokens_staked,
                        tokens_allocated: staker.tokens_allocated,
                        tokens_locked: staker.tokens_locked,
                        tokens_locked_until: staker.tokens_locked_until,
                    })
            })
            .collect();

        if order == StakerOrder::Stake {
            // Stable sort keeps registration order between equal stakes
            listings.sort_by(|a, b| b.tokens_staked.cmp(&a.tokens_staked));
        }

        let start = (page - 1).checked_mul(page_size).unwrap_or(usize::MAX);
        let mut rows = Vec::with_capacity(page_size);
        for offset in 0..page_size {
            let row = start
                .checked_add(offset)
                .and_then(|index| listings.get(index))
                .cloned();
            rows.push(row);
        }
        Ok(rows)
    }

    /// Number of stakers holding `role`
    pub fn count(&self, role: Role) -> usize {
        self.ledger
            .state
            .read()
            .stakers
            .values()
            .filter(|staker| staker.role == role)
            .count()
    }
}

/// Directory errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("page numbers start at 1")]
    InvalidPage,

    #[error("page size must be positive")]
    InvalidPageSize,
}

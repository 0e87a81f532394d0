//! Observable swap lifecycle states

use serde::{Deserialize, Serialize};

/// Funding observation for either chain family
///
/// `height` is the confirmation height (UTXO) or the initiation block
/// (account chain); 0 when not funded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingStatus {
    pub funded: bool,
    pub height: u64,
}

impl FundingStatus {
    pub fn unfunded() -> Self {
        Self::default()
    }
}

/// What the chain currently shows for a swap
///
/// A redeem observed after the refund window opened is still reported as
/// `Redeemed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapState {
    Unfunded,
    Initiated {
        height: u64,
    },
    Redeemed {
        #[serde(with = "hex::serde")]
        secret: Vec<u8>,
    },
    Expired {
        height: u64,
    },
}

impl SwapState {
    /// No further transition can be observed
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapState::Redeemed { .. })
    }
}

impl std::fmt::Display for SwapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapState::Unfunded => write!(f, "unfunded"),
            SwapState::Initiated { height } => write!(f, "initiated at {}", height),
            SwapState::Redeemed { .. } => write!(f, "redeemed"),
            SwapState::Expired { height } => write!(f, "expired (funded at {})", height),
        }
    }
}

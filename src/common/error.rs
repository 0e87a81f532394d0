//! Common Error Types for swapwatch
//!
//! Every boundary error folds into [`SwapError`].

use primitive_types::H256;
use thiserror::Error;

use crate::evm::abi::AbiError;
use crate::evm::reader::ChainError;
use crate::utxo::htlc::HtlcError;
use crate::utxo::indexer::IndexerError;

/// Root error type for swapwatch
#[derive(Debug, Error)]
pub enum SwapError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// UTXO indexer I/O
    #[error("indexer error: {0}")]
    Indexer(#[from] IndexerError),

    /// Account chain I/O
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Malformed log or return data
    #[error("decode error: {0}")]
    Decode(#[from] AbiError),

    /// Bad swap parameters
    #[error("invalid swap parameters: {0}")]
    Htlc(#[from] HtlcError),

    /// Funding address holds more outputs than a swap is allowed to have
    #[error("too many funding outputs: {count} (max {max})")]
    TooManyFundingOutputs { count: usize, max: usize },

    /// Redeem witness carried a secret that is not valid hex
    #[error("corrupt secret in {txid}: {reason}")]
    CorruptSecret { txid: String, reason: String },

    /// No `Redeemed` event in the scanned range
    #[error("secret not found for order {order_id:#x} in blocks {from}..={to}")]
    SecretNotFound {
        order_id: H256,
        from: u64,
        to: u64,
        /// The scan reached the order's expiry boundary
        exhausted: bool,
    },

    /// Secret requested for an order that is not fulfilled
    #[error("order {0:#x} is not fulfilled")]
    OrderNotFulfilled(H256),

    /// Operation not available for this asset kind
    #[error("unsupported asset kind: {0}")]
    UnsupportedAssetKind(String),

    /// Address that does not parse for the asset's chain
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Positional CLI argument not supplied
    #[error("missing argument <{0}>")]
    MissingArgument(String),

    /// Block range with `from > to`
    #[error("invalid block range: {from} > {to}")]
    InvalidRange { from: u64, to: u64 },
}

impl SwapError {
    /// Create an unsupported-asset error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedAssetKind(msg.into())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            SwapError::Indexer(e) => !matches!(e, IndexerError::ParseError(_)),
            SwapError::Chain(e) => !matches!(e, ChainError::Abi(_) | ChainError::Parse(_)),
            SwapError::SecretNotFound { exhausted, .. } => !exhausted,
            _ => false,
        }
    }

    /// Get error code for log records
    pub fn error_code(&self) -> &'static str {
        match self {
            SwapError::Config(_) => "CONFIG_ERROR",
            SwapError::Logging(_) => "LOGGING_ERROR",
            SwapError::Indexer(_) => "INDEXER_ERROR",
            SwapError::Chain(_) => "CHAIN_ERROR",
            SwapError::Decode(_) => "DECODE_ERROR",
            SwapError::Htlc(_) => "INVALID_SWAP",
            SwapError::TooManyFundingOutputs { .. } => "TOO_MANY_FUNDING_OUTPUTS",
            SwapError::CorruptSecret { .. } => "CORRUPT_SECRET",
            SwapError::SecretNotFound { .. } => "SECRET_NOT_FOUND",
            SwapError::OrderNotFulfilled(_) => "ORDER_NOT_FULFILLED",
            SwapError::UnsupportedAssetKind(_) => "UNSUPPORTED_ASSET",
            SwapError::InvalidAddress(_) => "INVALID_ADDRESS",
            SwapError::MissingArgument(_) => "MISSING_ARGUMENT",
            SwapError::InvalidRange { .. } => "INVALID_RANGE",
        }
    }
}

/// Result type alias using SwapError
pub type Result<T> = std::result::Result<T, SwapError>;

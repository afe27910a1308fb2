//! Error types for the solmint core library

use thiserror::Error;

/// Custom error type for solmint operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Wallet unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("No token: {0}")]
    NoToken(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Operation already running: {0}")]
    Busy(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Balance error: {0}")]
    Balance(String),
}

/// Result type for solmint operations
pub type Result<T> = std::result::Result<T, Error>;

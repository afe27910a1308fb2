//! Blockchain client boundary
//!
//! Everything that touches the network lives behind [`ChainClient`]. The
//! client is an explicitly constructed, injected dependency so the gateways
//! can run against test doubles as well as a real RPC endpoint.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::provider::WalletProvider;

/// Default RPC endpoint (Solana devnet)
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";

/// Chain client configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// RPC endpoint URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl ChainConfig {
    /// Configuration from the environment, falling back to devnet
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SOLMINT_RPC_URL").unwrap_or_else(|_| DEVNET_URL.to_string()),
            timeout: Some(30),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            url: DEVNET_URL.to_string(),
            timeout: Some(30),
        }
    }
}

/// A confirmed transaction signature for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Base58 transaction signature
    pub signature: String,
    /// Slot the transaction landed in
    pub slot: u64,
    /// Block time, seconds since the epoch, when the cluster reports one
    pub block_time: Option<i64>,
    /// Error string for failed transactions
    pub err: Option<String>,
}

/// A token amount in base units together with its decimal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Amount in base units
    pub amount: u64,
    /// Decimal precision of the mint
    pub decimals: u8,
}

impl TokenAmount {
    /// Human-readable amount
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.decimals as i32)
    }
}

/// Handle to a token created during this session
///
/// Mint, transfer, and balance operations are undefined without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHandle {
    /// Mint address of the token
    pub mint: Pubkey,
    /// The session account's holding account for the mint
    pub holding_account: Pubkey,
}

impl fmt::Display for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token {}", self.mint)
    }
}

/// Capability set consumed from the blockchain client
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance of an account, in lamports
    async fn native_balance(&self, account: &Pubkey) -> Result<u64>;

    /// Balance of a token holding account
    async fn token_balance(&self, holding_account: &Pubkey) -> Result<TokenAmount>;

    /// Most recent transaction signatures for an account, newest first
    ///
    /// An account with no transaction history yields an empty vector.
    async fn recent_signatures(&self, account: &Pubkey, limit: usize) -> Result<Vec<SignatureRecord>>;

    /// Create a new token mint plus a holding account for `payer`
    async fn create_token(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        decimals: u8,
    ) -> Result<TokenHandle>;

    /// Mint `amount` base units into the handle's holding account
    async fn mint_tokens(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        handle: &TokenHandle,
        amount: u64,
    ) -> Result<String>;

    /// Transfer `amount` base units to `recipient`'s holding account,
    /// creating that account first when it does not exist yet
    async fn transfer_tokens(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        handle: &TokenHandle,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<String>;

    /// Total supply of a mint
    async fn token_supply(&self, mint: &Pubkey) -> Result<TokenAmount>;

    /// Request a faucet airdrop (test networks only)
    async fn request_airdrop(&self, account: &Pubkey, lamports: u64) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_amount_scaling() {
        let amount = TokenAmount { amount: 100_000_000_000, decimals: 9 };
        assert_eq!(amount.ui_amount(), 100.0);

        let zero = TokenAmount { amount: 0, decimals: 9 };
        assert_eq!(zero.ui_amount(), 0.0);
    }

    #[test]
    fn test_config_defaults_to_devnet() {
        let config = ChainConfig::default();
        assert_eq!(config.url, DEVNET_URL);
        assert_eq!(config.timeout, Some(30));
    }
}

//! Account session gateway
//!
//! Wraps wallet connect/disconnect and history queries into request/response
//! calls. Session state itself is owned by the caller (the presentation
//! layer); this module only produces the values that go into it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solana_sdk::native_token::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use crate::chain::{ChainClient, SignatureRecord};
use crate::error::{Error, Result};
use crate::provider::WalletProvider;

/// Maximum number of history entries returned per query
pub const HISTORY_LIMIT: usize = 5;

/// Connection state for the current wallet session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Whether a wallet account is attached
    pub connected: bool,
    /// The attached account
    pub account: Option<Pubkey>,
    /// Native balance in lamports, as of the last refresh
    pub balance_lamports: u64,
}

impl Session {
    /// Restore the disconnected defaults
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// Native balance in SOL
    pub fn balance_sol(&self) -> f64 {
        lamports_to_sol(self.balance_lamports)
    }
}

/// Result of a successful connect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The account the wallet exposed
    pub account: Pubkey,
    /// Native balance in lamports at connect time
    pub balance_lamports: u64,
}

impl std::fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Connected to {} ({:.4} SOL)",
            self.account,
            lamports_to_sol(self.balance_lamports)
        )
    }
}

/// Request/response wrapper over the wallet and chain boundaries
pub struct SessionGateway {
    provider: Arc<dyn WalletProvider>,
    client: Arc<dyn ChainClient>,
}

impl SessionGateway {
    pub fn new(provider: Arc<dyn WalletProvider>, client: Arc<dyn ChainClient>) -> Self {
        Self { provider, client }
    }

    /// Connect the wallet and read the account's native balance
    pub async fn connect(&self) -> Result<SessionInfo> {
        let account = self
            .provider
            .connect()
            .await
            .map_err(|e| Error::Connection(format!("Connection failed: {}", e)))?;

        let balance_lamports = self
            .client
            .native_balance(&account)
            .await
            .map_err(|e| Error::Connection(format!("Connection failed: {}", e)))?;

        info!(account = %account, balance_lamports, "session connected");
        Ok(SessionInfo { account, balance_lamports })
    }

    /// Disconnect the wallet
    ///
    /// Disconnecting while not connected is a no-op confirmation, not an
    /// error.
    pub async fn disconnect(&self) -> Result<String> {
        if !self.provider.is_connected() {
            return Ok("Wallet already disconnected".to_string());
        }

        self.provider
            .disconnect()
            .await
            .map_err(|e| Error::Connection(format!("Disconnect failed: {}", e)))?;

        info!("session disconnected");
        Ok("Wallet disconnected".to_string())
    }

    /// Fetch the most recent transaction signatures for an account,
    /// newest first, capped at [`HISTORY_LIMIT`]
    pub async fn fetch_history(&self, account: &Pubkey) -> Result<Vec<SignatureRecord>> {
        let mut records = self
            .client
            .recent_signatures(account, HISTORY_LIMIT)
            .await
            .map_err(|e| Error::Network(format!("History fetch failed: {}", e)))?;

        // The client is asked for HISTORY_LIMIT entries, but an over-eager
        // implementation must not leak extras to the caller
        if records.len() > HISTORY_LIMIT {
            warn!(returned = records.len(), "history query returned more than the limit");
            records.truncate(HISTORY_LIMIT);
        }

        Ok(records)
    }
}

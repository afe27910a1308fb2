//! Wallet provider boundary
//!
//! A wallet provider owns the account keys and the signing capability. The
//! core library never touches key material; it hands unsigned transactions
//! to the provider and gets them back signed.

mod keypair;

pub use keypair::KeypairProvider;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use tokio::sync::broadcast;

use crate::error::Result;

/// Event emitted by a wallet provider when its connection state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The wallet connected and exposed an account
    Connected(Pubkey),
    /// The wallet disconnected (user- or provider-initiated)
    Disconnected,
}

/// Capability set consumed from an external wallet
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human-readable provider name, used for logging
    fn name(&self) -> &str;

    /// Whether the wallet currently exposes a connected account
    fn is_connected(&self) -> bool;

    /// The connected account, if any
    fn account(&self) -> Option<Pubkey>;

    /// Connect the wallet and return the account it exposes
    async fn connect(&self) -> Result<Pubkey>;

    /// Disconnect the wallet
    async fn disconnect(&self) -> Result<()>;

    /// Add the wallet's signature to a transaction
    ///
    /// The transaction may already carry partial signatures (e.g. a fresh
    /// mint account's); the provider only fills in its own slot.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    /// Subscribe to connect/disconnect events
    ///
    /// The receiver is an explicitly scoped handle; dropping it tears the
    /// subscription down without any further bookkeeping.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

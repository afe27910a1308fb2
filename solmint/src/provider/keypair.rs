//! Keypair-backed wallet provider
//!
//! Stands in for a browser-extension wallet: the same capability surface,
//! backed by a locally held keypair. Used by the CLI and by tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::{Error, Result};
use super::{ProviderEvent, WalletProvider};

/// Wallet provider backed by a local keypair
pub struct KeypairProvider {
    keypair: Keypair,
    connected: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl KeypairProvider {
    /// Create a provider around an existing keypair
    pub fn new(keypair: Keypair) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            keypair,
            connected: AtomicBool::new(false),
            events,
        }
    }

    /// Create a provider from a base58-encoded secret key
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret)
            .into_vec()
            .map_err(|e| Error::ProviderUnavailable(format!("Invalid secret key: {}", e)))?;

        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| Error::ProviderUnavailable(format!("Invalid secret key: {}", e)))?;

        Ok(Self::new(keypair))
    }

    /// Create a provider from a JSON keypair file (64-byte array format)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ProviderUnavailable(format!("Failed to read keypair file: {}", e)))?;

        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| Error::ProviderUnavailable(format!("Invalid keypair file: {}", e)))?;

        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| Error::ProviderUnavailable(format!("Invalid keypair file: {}", e)))?;

        Ok(Self::new(keypair))
    }

    /// The provider's public key, regardless of connection state
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletProvider for KeypairProvider {
    fn name(&self) -> &str {
        "keypair"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn account(&self) -> Option<Pubkey> {
        if self.is_connected() {
            Some(self.keypair.pubkey())
        } else {
            None
        }
    }

    async fn connect(&self) -> Result<Pubkey> {
        let account = self.keypair.pubkey();
        self.connected.store(true, Ordering::SeqCst);
        // No receiver is an acceptable state; events are best-effort
        let _ = self.events.send(ProviderEvent::Connected(account));
        info!(account = %account, "wallet connected");
        Ok(account)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(ProviderEvent::Disconnected);
        info!("wallet disconnected");
        Ok(())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| Error::Transaction(format!("Signing failed: {}", e)))?;

        Ok(transaction)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

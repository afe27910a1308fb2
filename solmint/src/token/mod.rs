//! Token operations gateway
//!
//! Wraps create/mint/transfer/balance into request/response calls. Every
//! operation validates its preconditions locally and fails fast before any
//! delegated call goes out.

use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::chain::{ChainClient, TokenHandle};
use crate::error::{Error, Result};
use crate::provider::WalletProvider;
use crate::session::Session;

/// Decimal precision of tokens created by this client
pub const TOKEN_DECIMALS: u8 = 9;

/// Minimum native balance required to create a token, in SOL
///
/// Covers rent exemption for the mint account plus transaction fees.
pub const CREATE_MIN_BALANCE_SOL: f64 = 0.002;

/// Minimum native balance required to create a token, in lamports
pub const CREATE_MIN_BALANCE_LAMPORTS: u64 = 2_000_000;

/// Whole tokens minted per mint action
pub const MINT_AMOUNT: u64 = 100;

/// Whole tokens transferred per send action
pub const SEND_AMOUNT: u64 = 50;

/// Scale a whole-token amount to base units at [`TOKEN_DECIMALS`]
pub fn to_base_units(amount: u64) -> Result<u64> {
    amount
        .checked_mul(10u64.pow(TOKEN_DECIMALS as u32))
        .ok_or_else(|| Error::Transaction(format!("Amount overflows base units: {}", amount)))
}

/// Request/response wrapper over the token operations
pub struct TokenGateway {
    provider: Arc<dyn WalletProvider>,
    client: Arc<dyn ChainClient>,
}

impl TokenGateway {
    pub fn new(provider: Arc<dyn WalletProvider>, client: Arc<dyn ChainClient>) -> Self {
        Self { provider, client }
    }

    fn require_connected<'a>(&self, session: &'a Session) -> Result<&'a Pubkey> {
        if !session.connected {
            return Err(Error::NotConnected);
        }
        session.account.as_ref().ok_or(Error::NotConnected)
    }

    fn require_handle<'a>(&self, handle: Option<&'a TokenHandle>, action: &str) -> Result<&'a TokenHandle> {
        handle.ok_or_else(|| Error::NoToken(format!("create a token before {}", action)))
    }

    /// Create a new token mint and a holding account for the session account
    ///
    /// Requires a connected session and a native balance of at least
    /// [`CREATE_MIN_BALANCE_SOL`].
    pub async fn create_token(&self, session: &Session) -> Result<TokenHandle> {
        let payer = self.require_connected(session)?;

        if session.balance_lamports < CREATE_MIN_BALANCE_LAMPORTS {
            return Err(Error::InsufficientFunds(format!(
                "at least {} SOL required to create a token, balance is {:.4} SOL",
                CREATE_MIN_BALANCE_SOL,
                session.balance_sol()
            )));
        }

        let handle = self
            .client
            .create_token(self.provider.as_ref(), payer, TOKEN_DECIMALS)
            .await
            .map_err(|e| Error::Transaction(format!("Token creation failed: {}", e)))?;

        info!(mint = %handle.mint, holding_account = %handle.holding_account, "token created");
        Ok(handle)
    }

    /// Mint whole tokens into the handle's holding account
    pub async fn mint_tokens(
        &self,
        session: &Session,
        handle: Option<&TokenHandle>,
        amount: u64,
    ) -> Result<String> {
        let payer = self.require_connected(session)?;
        let handle = self.require_handle(handle, "minting")?;
        let base_units = to_base_units(amount)?;

        let signature = self
            .client
            .mint_tokens(self.provider.as_ref(), payer, handle, base_units)
            .await
            .map_err(|e| Error::Transaction(format!("Minting failed: {}", e)))?;

        info!(mint = %handle.mint, amount, %signature, "tokens minted");
        Ok(signature)
    }

    /// Transfer whole tokens to another account's holding account
    ///
    /// The destination string is validated as a base58 public key before any
    /// network call; the destination's holding account is created by the
    /// chain client when absent.
    pub async fn send_tokens(
        &self,
        session: &Session,
        handle: Option<&TokenHandle>,
        destination: &str,
        amount: u64,
    ) -> Result<String> {
        let payer = self.require_connected(session)?;
        let handle = self.require_handle(handle, "sending")?;

        let recipient = Pubkey::from_str(destination.trim())
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", destination, e)))?;

        let base_units = to_base_units(amount)?;

        let signature = self
            .client
            .transfer_tokens(self.provider.as_ref(), payer, handle, &recipient, base_units)
            .await
            .map_err(|e| Error::Transaction(format!("Transfer failed: {}", e)))?;

        info!(mint = %handle.mint, %recipient, amount, %signature, "tokens sent");
        Ok(signature)
    }

    /// Human-readable balance of the handle's holding account
    pub async fn token_balance(&self, handle: Option<&TokenHandle>) -> Result<f64> {
        let handle = self.require_handle(handle, "checking the balance")?;

        let amount = self
            .client
            .token_balance(&handle.holding_account)
            .await
            .map_err(|e| Error::Balance(format!("Balance fetch failed: {}", e)))?;

        Ok(amount.ui_amount())
    }

    /// Human-readable total supply of the handle's mint
    pub async fn token_supply(&self, handle: Option<&TokenHandle>) -> Result<f64> {
        let handle = self.require_handle(handle, "checking the supply")?;

        let supply = self
            .client
            .token_supply(&handle.mint)
            .await
            .map_err(|e| Error::Balance(format!("Supply fetch failed: {}", e)))?;

        Ok(supply.ui_amount())
    }
}

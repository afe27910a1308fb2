//! Application state shared across commands

use std::fmt;
use std::sync::{Arc, RwLock};

use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use tokio::task::JoinHandle;
use tracing::info;

use solmint::chain::{ChainClient, SignatureRecord, TokenHandle};
use solmint::error::{Error, Result};
use solmint::orchestrator::Orchestrator;
use solmint::provider::{ProviderEvent, WalletProvider};
use solmint::session::{Session, SessionGateway, SessionInfo};
use solmint::token::{TokenGateway, MINT_AMOUNT, SEND_AMOUNT};

/// A page of history records with a banner-friendly rendering
pub struct HistoryBatch(pub Vec<SignatureRecord>);

impl fmt::Display for HistoryBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fetched {} transactions", self.0.len())
    }
}

/// State for one wallet session: gateways, session data, and the
/// single-flight orchestrator every user action runs through
pub struct AppState {
    pub provider: Arc<dyn WalletProvider>,
    pub client: Arc<dyn ChainClient>,
    pub session_gateway: SessionGateway,
    pub token_gateway: TokenGateway,
    pub orchestrator: Orchestrator,
    session: RwLock<Session>,
    token: RwLock<Option<TokenHandle>>,
}

impl AppState {
    pub fn new(provider: Arc<dyn WalletProvider>, client: Arc<dyn ChainClient>) -> Self {
        Self {
            session_gateway: SessionGateway::new(Arc::clone(&provider), Arc::clone(&client)),
            token_gateway: TokenGateway::new(Arc::clone(&provider), Arc::clone(&client)),
            orchestrator: Orchestrator::new(),
            session: RwLock::new(Session::default()),
            token: RwLock::new(None),
            provider,
            client,
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The token created during this session, if any
    pub fn token(&self) -> Option<TokenHandle> {
        *self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_session(&self, session: Session) {
        *self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    fn set_token(&self, token: Option<TokenHandle>) {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn require_account(&self) -> Result<Pubkey> {
        let session = self.session();
        if !session.connected {
            return Err(Error::NotConnected);
        }
        session.account.ok_or(Error::NotConnected)
    }

    pub async fn connect(&self) -> Result<SessionInfo> {
        let info = self
            .orchestrator
            .run("connect", self.session_gateway.connect(), None)
            .await?;

        self.set_session(Session {
            connected: true,
            account: Some(info.account),
            balance_lamports: info.balance_lamports,
        });
        Ok(info)
    }

    pub async fn disconnect(&self) -> Result<String> {
        let confirmation = self
            .orchestrator
            .run("disconnect", self.session_gateway.disconnect(), None)
            .await?;

        self.set_session(Session::default());
        self.set_token(None);
        Ok(confirmation)
    }

    /// Refresh the session's native balance from the chain
    pub async fn refresh_native_balance(&self) -> Result<u64> {
        let account = self.require_account()?;
        let balance_lamports = self.client.native_balance(&account).await?;

        let mut session = self.session();
        session.balance_lamports = balance_lamports;
        self.set_session(session);
        Ok(balance_lamports)
    }

    pub async fn create_token(&self) -> Result<TokenHandle> {
        let session = self.session();
        let handle = self
            .orchestrator
            .run("create-token", self.token_gateway.create_token(&session), None)
            .await?;

        self.set_token(Some(handle));
        Ok(handle)
    }

    pub async fn mint(&self) -> Result<String> {
        let session = self.session();
        let handle = self.token();

        self.orchestrator
            .run(
                "mint",
                self.token_gateway.mint_tokens(&session, handle.as_ref(), MINT_AMOUNT),
                Some(format!("Minted {} tokens", MINT_AMOUNT)),
            )
            .await
    }

    pub async fn send(&self, destination: &str) -> Result<String> {
        let session = self.session();
        let handle = self.token();

        self.orchestrator
            .run(
                "send",
                self.token_gateway
                    .send_tokens(&session, handle.as_ref(), destination, SEND_AMOUNT),
                Some(format!("Sent {} tokens to {}", SEND_AMOUNT, destination)),
            )
            .await
    }

    pub async fn token_balance(&self) -> Result<f64> {
        let handle = self.token();

        self.orchestrator
            .run(
                "balance",
                async {
                    let balance = self.token_gateway.token_balance(handle.as_ref()).await?;
                    Ok(DisplayBalance(balance))
                },
                None,
            )
            .await
            .map(|balance| balance.0)
    }

    pub async fn token_supply(&self) -> Result<f64> {
        let handle = self.token();

        self.orchestrator
            .run(
                "supply",
                async {
                    let supply = self.token_gateway.token_supply(handle.as_ref()).await?;
                    Ok(DisplaySupply(supply))
                },
                None,
            )
            .await
            .map(|supply| supply.0)
    }

    pub async fn history(&self) -> Result<Vec<SignatureRecord>> {
        let account = self.require_account()?;

        let batch = self
            .orchestrator
            .run(
                "history",
                async {
                    let records = self.session_gateway.fetch_history(&account).await?;
                    Ok(HistoryBatch(records))
                },
                None,
            )
            .await?;
        Ok(batch.0)
    }

    /// Request a 1 SOL devnet airdrop for the connected account
    pub async fn airdrop(&self) -> Result<String> {
        let account = self.require_account()?;

        self.orchestrator
            .run(
                "airdrop",
                self.client.request_airdrop(&account, LAMPORTS_PER_SOL),
                Some("Airdrop requested".to_string()),
            )
            .await
    }
}

struct DisplayBalance(f64);

impl fmt::Display for DisplayBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token balance: {}", self.0)
    }
}

struct DisplaySupply(f64);

impl fmt::Display for DisplaySupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token supply: {}", self.0)
    }
}

/// Mirror provider-initiated connection changes into the session state
///
/// Keeps the session honest when the wallet disconnects on its own: the
/// session resets and the token handle is dropped.
pub fn spawn_event_listener(state: Arc<AppState>) -> JoinHandle<()> {
    let mut events = state.provider.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProviderEvent::Connected(account)) => {
                    let mut session = state.session();
                    session.connected = true;
                    session.account = Some(account);
                    state.set_session(session);
                }
                Ok(ProviderEvent::Disconnected) => {
                    info!("provider disconnected, clearing session");
                    state.set_session(Session::default());
                    state.set_token(None);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

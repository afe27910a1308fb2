//! Tests for the session and token gateways against in-memory doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use solmint::chain::{ChainClient, SignatureRecord, TokenAmount, TokenHandle};
use solmint::error::{Error, Result};
use solmint::provider::{KeypairProvider, ProviderEvent, WalletProvider};
use solmint::session::{Session, SessionGateway, HISTORY_LIMIT};
use solmint::token::{TokenGateway, MINT_AMOUNT, SEND_AMOUNT, TOKEN_DECIMALS};

/// In-memory chain double that counts every delegated call
struct MockChain {
    native_balance: u64,
    signatures: Vec<SignatureRecord>,
    holdings: Mutex<HashMap<Pubkey, u64>>,
    calls: AtomicUsize,
}

impl MockChain {
    fn new(native_balance: u64) -> Self {
        Self {
            native_balance,
            signatures: Vec::new(),
            holdings: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_signatures(mut self, signatures: Vec<SignatureRecord>) -> Self {
        self.signatures = signatures;
        self
    }

    fn delegated_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn native_balance(&self, _account: &Pubkey) -> Result<u64> {
        self.record_call();
        Ok(self.native_balance)
    }

    async fn token_balance(&self, holding_account: &Pubkey) -> Result<TokenAmount> {
        self.record_call();
        let holdings = self.holdings.lock().unwrap();
        let amount = *holdings
            .get(holding_account)
            .ok_or_else(|| Error::Balance("unknown holding account".to_string()))?;
        Ok(TokenAmount { amount, decimals: TOKEN_DECIMALS })
    }

    async fn recent_signatures(&self, _account: &Pubkey, _limit: usize) -> Result<Vec<SignatureRecord>> {
        self.record_call();
        // Deliberately ignores the limit so the gateway's cap is exercised
        Ok(self.signatures.clone())
    }

    async fn create_token(
        &self,
        _wallet: &dyn WalletProvider,
        _payer: &Pubkey,
        _decimals: u8,
    ) -> Result<TokenHandle> {
        self.record_call();
        let handle = TokenHandle {
            mint: Pubkey::new_unique(),
            holding_account: Pubkey::new_unique(),
        };
        self.holdings.lock().unwrap().insert(handle.holding_account, 0);
        Ok(handle)
    }

    async fn mint_tokens(
        &self,
        _wallet: &dyn WalletProvider,
        _payer: &Pubkey,
        handle: &TokenHandle,
        amount: u64,
    ) -> Result<String> {
        self.record_call();
        let mut holdings = self.holdings.lock().unwrap();
        let balance = holdings.entry(handle.holding_account).or_insert(0);
        *balance += amount;
        Ok(format!("mint-sig-{}", amount))
    }

    async fn transfer_tokens(
        &self,
        _wallet: &dyn WalletProvider,
        _payer: &Pubkey,
        handle: &TokenHandle,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<String> {
        self.record_call();
        let mut holdings = self.holdings.lock().unwrap();
        let source = holdings
            .get_mut(&handle.holding_account)
            .ok_or_else(|| Error::Transaction("unknown source account".to_string()))?;
        if *source < amount {
            return Err(Error::Transaction("insufficient token balance".to_string()));
        }
        *source -= amount;
        *holdings.entry(*recipient).or_insert(0) += amount;
        Ok("transfer-sig".to_string())
    }

    async fn token_supply(&self, _mint: &Pubkey) -> Result<TokenAmount> {
        self.record_call();
        let amount = self.holdings.lock().unwrap().values().sum();
        Ok(TokenAmount { amount, decimals: TOKEN_DECIMALS })
    }

    async fn request_airdrop(&self, _account: &Pubkey, _lamports: u64) -> Result<String> {
        self.record_call();
        Ok("airdrop-sig".to_string())
    }
}

fn record(signature: &str, slot: u64) -> SignatureRecord {
    SignatureRecord {
        signature: signature.to_string(),
        slot,
        block_time: Some(1_700_000_000 + slot as i64),
        err: None,
    }
}

fn connected_session(account: Pubkey, balance_lamports: u64) -> Session {
    Session {
        connected: true,
        account: Some(account),
        balance_lamports,
    }
}

const ONE_SOL: u64 = 1_000_000_000;

#[tokio::test]
async fn test_connect_reflects_collaborator_values() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = SessionGateway::new(Arc::clone(&provider), chain.clone());

    let info = gateway.connect().await.unwrap();
    assert_eq!(info.account, provider.account().unwrap());
    assert_eq!(info.balance_lamports, ONE_SOL);

    let mut session = connected_session(info.account, info.balance_lamports);
    assert_eq!(session.balance_sol(), 1.0);

    let confirmation = gateway.disconnect().await.unwrap();
    assert_eq!(confirmation, "Wallet disconnected");

    session.reset();
    assert_eq!(session, Session::default());

    // A second disconnect is a no-op confirmation, not an error
    let confirmation = gateway.disconnect().await.unwrap();
    assert_eq!(confirmation, "Wallet already disconnected");
}

#[tokio::test]
async fn test_provider_disconnect_event_clears_session_state() {
    let provider = Arc::new(KeypairProvider::new(Keypair::new()));
    let mut events = provider.subscribe();

    provider.connect().await.unwrap();
    let mut session = connected_session(provider.pubkey(), ONE_SOL);
    let mut handle = Some(TokenHandle {
        mint: Pubkey::new_unique(),
        holding_account: Pubkey::new_unique(),
    });
    assert!(handle.is_some());
    assert_eq!(events.recv().await.unwrap(), ProviderEvent::Connected(provider.pubkey()));

    // Provider-initiated disconnect: the subscriber resets the session and
    // drops the token handle, the same way the presentation layer does
    provider.disconnect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ProviderEvent::Disconnected);
    session.reset();
    handle = None;

    assert_eq!(session, Session::default());
    assert!(handle.is_none());
}

#[tokio::test]
async fn test_create_token_rejects_low_balance_without_network_call() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(1_000_000));
    let gateway = TokenGateway::new(provider.clone(), chain.clone());

    // 0.001 SOL, below the 0.002 SOL reserve
    let session = connected_session(Pubkey::new_unique(), 1_000_000);

    let err = gateway.create_token(&session).await.unwrap_err();
    match err {
        Error::InsufficientFunds(message) => assert!(message.contains("0.002")),
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(chain.delegated_calls(), 0);
}

#[tokio::test]
async fn test_create_token_requires_connection() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = TokenGateway::new(provider, chain.clone());

    let err = gateway.create_token(&Session::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert_eq!(chain.delegated_calls(), 0);
}

#[tokio::test]
async fn test_mint_and_send_require_token_handle_without_network_call() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = TokenGateway::new(provider, chain.clone());
    let session = connected_session(Pubkey::new_unique(), ONE_SOL);

    let err = gateway.mint_tokens(&session, None, MINT_AMOUNT).await.unwrap_err();
    assert!(matches!(err, Error::NoToken(_)));

    let destination = Pubkey::new_unique().to_string();
    let err = gateway
        .send_tokens(&session, None, &destination, SEND_AMOUNT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoToken(_)));

    let err = gateway.token_balance(None).await.unwrap_err();
    assert!(matches!(err, Error::NoToken(_)));

    assert_eq!(chain.delegated_calls(), 0);
}

#[tokio::test]
async fn test_send_rejects_malformed_destination_before_network_call() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = TokenGateway::new(provider, chain.clone());
    let session = connected_session(Pubkey::new_unique(), ONE_SOL);

    let handle = gateway.create_token(&session).await.unwrap();
    let calls_after_create = chain.delegated_calls();

    let err = gateway
        .send_tokens(&session, Some(&handle), "not-a-valid-address", SEND_AMOUNT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
    assert_eq!(chain.delegated_calls(), calls_after_create);
}

#[tokio::test]
async fn test_create_mint_check_balance_send_flow() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = TokenGateway::new(provider, chain.clone());
    let session = connected_session(Pubkey::new_unique(), ONE_SOL);

    let handle = gateway.create_token(&session).await.unwrap();
    assert_eq!(gateway.token_balance(Some(&handle)).await.unwrap(), 0.0);

    let signature = gateway
        .mint_tokens(&session, Some(&handle), MINT_AMOUNT)
        .await
        .unwrap();
    assert!(!signature.is_empty());

    // 100 whole tokens, scaled by 9 decimals internally
    assert_eq!(gateway.token_balance(Some(&handle)).await.unwrap(), 100.0);
    assert_eq!(gateway.token_supply(Some(&handle)).await.unwrap(), 100.0);

    let destination = Pubkey::new_unique().to_string();
    gateway
        .send_tokens(&session, Some(&handle), &destination, SEND_AMOUNT)
        .await
        .unwrap();
    assert_eq!(gateway.token_balance(Some(&handle)).await.unwrap(), 50.0);
}

#[tokio::test]
async fn test_history_is_capped_and_tolerates_empty_accounts() {
    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::new(Keypair::new()));
    let account = Pubkey::new_unique();

    // Seven records, newest first; the double ignores the limit
    let records: Vec<SignatureRecord> =
        (0..7).map(|i| record(&format!("sig-{}", i), 700 - i)).collect();
    let chain = Arc::new(MockChain::new(ONE_SOL).with_signatures(records));
    let gateway = SessionGateway::new(provider.clone(), chain);

    let history = gateway.fetch_history(&account).await.unwrap();
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(history[0].signature, "sig-0");
    assert!(history.windows(2).all(|pair| pair[0].slot >= pair[1].slot));

    let empty_chain = Arc::new(MockChain::new(ONE_SOL));
    let gateway = SessionGateway::new(provider, empty_chain);
    let history = gateway.fetch_history(&account).await.unwrap();
    assert!(history.is_empty());
}

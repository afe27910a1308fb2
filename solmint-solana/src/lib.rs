//! Solana RPC adapter for Solmint Core
//!
//! Implements the chain-client boundary on top of `solana-client`, with the
//! fixed "confirmed" commitment level. Transactions are built here, signed
//! by the injected wallet provider, and submitted through the RPC client.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::{
    get_associated_token_address, instruction as associated_token_instruction,
};
use spl_token::instruction as token_instruction;
use tracing::{debug, info};

use solmint::chain::{ChainClient, ChainConfig, SignatureRecord, TokenAmount, TokenHandle};
use solmint::error::{Error, Result};
use solmint::provider::WalletProvider;
use solmint::token::TOKEN_DECIMALS;

/// Chain client backed by a Solana JSON-RPC endpoint
pub struct RpcChainClient {
    #[allow(dead_code)]
    config: ChainConfig,
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcChainClient {
    /// Create a new RPC chain client with the "confirmed" commitment level
    pub fn new(config: ChainConfig) -> Self {
        let commitment = CommitmentConfig::confirmed();
        let client = match config.timeout {
            Some(seconds) => RpcClient::new_with_timeout_and_commitment(
                config.url.clone(),
                Duration::from_secs(seconds),
                commitment,
            ),
            None => RpcClient::new_with_commitment(config.url.clone(), commitment),
        };

        Self { config, client, commitment }
    }

    /// Read a mint's declared decimal precision
    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8> {
        let account = self
            .client
            .get_account(mint)
            .await
            .map_err(|e| Error::Transaction(format!("Failed to get token mint account: {}", e)))?;

        let mint_data = spl_token::state::Mint::unpack(&account.data)
            .map_err(|e| Error::Transaction(format!("Failed to parse token mint data: {}", e)))?;

        Ok(mint_data.decimals)
    }

    /// Attach a recent blockhash, collect all signatures, and submit
    ///
    /// Extra signers (e.g. a fresh mint account) sign first; the wallet
    /// provider fills in the payer signature last.
    async fn sign_and_send(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        instructions: Vec<Instruction>,
        extra_signers: &[&Keypair],
    ) -> Result<String> {
        let recent_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::Transaction(format!("Failed to get recent blockhash: {}", e)))?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(payer));
        transaction.message.recent_blockhash = recent_blockhash;

        if !extra_signers.is_empty() {
            transaction
                .try_partial_sign(&extra_signers.to_vec(), recent_blockhash)
                .map_err(|e| Error::Transaction(format!("Failed to sign transaction: {}", e)))?;
        }

        let transaction = wallet.sign_transaction(transaction).await?;

        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| Error::Transaction(format!("Failed to broadcast transaction: {}", e)))?;

        debug!(%signature, "transaction confirmed");
        Ok(signature.to_string())
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn native_balance(&self, account: &Pubkey) -> Result<u64> {
        self.client
            .get_balance(account)
            .await
            .map_err(|e| Error::Network(format!("Failed to get balance: {}", e)))
    }

    async fn token_balance(&self, holding_account: &Pubkey) -> Result<TokenAmount> {
        let response = self
            .client
            .get_account_with_commitment(holding_account, self.commitment)
            .await
            .map_err(|e| Error::Balance(format!("Failed to get token account: {}", e)))?;

        let account = match response.value {
            Some(account) => account,
            // Account doesn't exist yet, balance is 0
            None => return Ok(TokenAmount { amount: 0, decimals: TOKEN_DECIMALS }),
        };

        let token_account = spl_token::state::Account::unpack(&account.data)
            .map_err(|e| Error::Balance(format!("Failed to parse token account data: {}", e)))?;

        let decimals = self.mint_decimals(&token_account.mint).await?;

        Ok(TokenAmount { amount: token_account.amount, decimals })
    }

    async fn recent_signatures(&self, account: &Pubkey, limit: usize) -> Result<Vec<SignatureRecord>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            commitment: Some(self.commitment),
            ..Default::default()
        };

        let statuses = self
            .client
            .get_signatures_for_address_with_config(account, config)
            .await
            .map_err(|e| Error::Network(format!("Failed to get signatures: {}", e)))?;

        let records = statuses
            .into_iter()
            .map(|status| SignatureRecord {
                signature: status.signature,
                slot: status.slot,
                block_time: status.block_time,
                err: status.err.map(|e| e.to_string()),
            })
            .collect();

        Ok(records)
    }

    async fn create_token(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        decimals: u8,
    ) -> Result<TokenHandle> {
        let mint = Keypair::new();
        let mint_pubkey = mint.pubkey();

        let rent = self
            .client
            .get_minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
            .await
            .map_err(|e| Error::Transaction(format!("Failed to get rent exemption: {}", e)))?;

        let holding_account = get_associated_token_address(payer, &mint_pubkey);

        let instructions = vec![
            system_instruction::create_account(
                payer,
                &mint_pubkey,
                rent,
                spl_token::state::Mint::LEN as u64,
                &spl_token::id(),
            ),
            token_instruction::initialize_mint(
                &spl_token::id(),
                &mint_pubkey,
                payer,
                Some(payer),
                decimals,
            )
            .map_err(|e| Error::Transaction(format!("Failed to create mint instruction: {}", e)))?,
            associated_token_instruction::create_associated_token_account(
                payer,
                payer,
                &mint_pubkey,
                &spl_token::id(),
            ),
        ];

        let signature = self.sign_and_send(wallet, payer, instructions, &[&mint]).await?;
        info!(mint = %mint_pubkey, %signature, "token mint created");

        Ok(TokenHandle { mint: mint_pubkey, holding_account })
    }

    async fn mint_tokens(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        handle: &TokenHandle,
        amount: u64,
    ) -> Result<String> {
        let decimals = self.mint_decimals(&handle.mint).await?;

        let instruction = token_instruction::mint_to_checked(
            &spl_token::id(),
            &handle.mint,
            &handle.holding_account,
            payer,
            &[payer],
            amount,
            decimals,
        )
        .map_err(|e| Error::Transaction(format!("Failed to create mint instruction: {}", e)))?;

        self.sign_and_send(wallet, payer, vec![instruction], &[]).await
    }

    async fn transfer_tokens(
        &self,
        wallet: &dyn WalletProvider,
        payer: &Pubkey,
        handle: &TokenHandle,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<String> {
        let decimals = self.mint_decimals(&handle.mint).await?;
        let destination = get_associated_token_address(recipient, &handle.mint);

        // Create the destination's holding account when it does not exist
        let existing = self
            .client
            .get_account_with_commitment(&destination, self.commitment)
            .await
            .map_err(|e| {
                Error::Transaction(format!("Failed to check destination token account: {}", e))
            })?;

        let mut instructions = Vec::new();
        if existing.value.is_none() {
            instructions.push(associated_token_instruction::create_associated_token_account(
                payer,
                recipient,
                &handle.mint,
                &spl_token::id(),
            ));
        }

        instructions.push(
            token_instruction::transfer_checked(
                &spl_token::id(),
                &handle.holding_account,
                &handle.mint,
                &destination,
                payer,
                &[payer],
                amount,
                decimals,
            )
            .map_err(|e| {
                Error::Transaction(format!("Failed to create transfer instruction: {}", e))
            })?,
        );

        self.sign_and_send(wallet, payer, instructions, &[]).await
    }

    async fn token_supply(&self, mint: &Pubkey) -> Result<TokenAmount> {
        let account = self
            .client
            .get_account(mint)
            .await
            .map_err(|e| Error::Balance(format!("Failed to get token mint account: {}", e)))?;

        let mint_data = spl_token::state::Mint::unpack(&account.data)
            .map_err(|e| Error::Balance(format!("Failed to parse token mint data: {}", e)))?;

        Ok(TokenAmount { amount: mint_data.supply, decimals: mint_data.decimals })
    }

    async fn request_airdrop(&self, account: &Pubkey, lamports: u64) -> Result<String> {
        let signature = self
            .client
            .request_airdrop(account, lamports)
            .await
            .map_err(|e| Error::Network(format!("Airdrop failed: {}", e)))?;

        Ok(signature.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solmint::chain::DEVNET_URL;
    use solmint::provider::KeypairProvider;

    #[test]
    fn test_client_construction_does_not_touch_network() {
        let client = RpcChainClient::new(ChainConfig::default());
        assert_eq!(client.config.url, DEVNET_URL);
        assert_eq!(client.commitment, CommitmentConfig::confirmed());
    }

    #[test]
    fn test_holding_account_derivation_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let first = get_associated_token_address(&owner, &mint);
        let second = get_associated_token_address(&owner, &mint);
        assert_eq!(first, second);
        assert_ne!(first, owner);
    }

    #[tokio::test]
    async fn test_devnet_balance_query() {
        // Skip this test by default to avoid making real RPC calls
        if std::env::var("RUN_SOLANA_TESTS").is_err() {
            return;
        }

        let client = RpcChainClient::new(ChainConfig::default());
        let provider = KeypairProvider::new(Keypair::new());

        // A fresh keypair has no funds and no history on devnet
        let balance = client.native_balance(&provider.pubkey()).await.unwrap();
        assert_eq!(balance, 0);

        let history = client.recent_signatures(&provider.pubkey(), 5).await.unwrap();
        assert!(history.is_empty());
    }
}

//! EVM reference strategy.
//!
//! Anchors are recorded by calling the anchor contract with signed legacy
//! transactions; observation delegates to the finality observer. Calldata
//! is four-byte selector plus 32-byte words.

use crate::config::ChainStrategyConfig;
use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{ChainStrategy, CreateAnchorRequest, GovernanceExecutionParams, ProofSubmission};
use async_trait::async_trait;
use chrono::Utc;
use cv_03_observer::{EvmRpcApi, FinalityObserver, ObservationResult, ObserverError};
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use shared_crypto::hashing::{keccak256, sha256};
use shared_types::{AnchorResult, AnchorStatus};
use std::sync::Arc;
use tracing::info;

/// Signs legacy (EIP-155) transactions with a secp256k1 key.
pub struct EvmTxSigner {
    signing_key: SigningKey,
    address: [u8; 20],
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn append_uint(stream: &mut RlpStream, value: u128) {
    stream.append(&trim_leading_zeros(&value.to_be_bytes()));
}

impl EvmTxSigner {
    /// Build a signer from a 32-byte secret key.
    pub fn from_secret(bytes: &[u8; 32]) -> StrategyResult<Self> {
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| StrategyError::Signing(e.to_string()))?;
        let point = signing_key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash.as_bytes()[12..]);
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// The signer's address, `0x`-prefixed.
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// Sign a legacy transaction with EIP-155 replay protection.
    #[allow(clippy::too_many_arguments)]
    pub fn sign_legacy(
        &self,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: &[u8; 20],
        value: u128,
        data: &[u8],
        chain_id: u64,
    ) -> StrategyResult<Vec<u8>> {
        let mut unsigned = RlpStream::new_list(9);
        append_uint(&mut unsigned, nonce as u128);
        append_uint(&mut unsigned, gas_price);
        append_uint(&mut unsigned, gas_limit as u128);
        unsigned.append(&to.to_vec());
        append_uint(&mut unsigned, value);
        unsigned.append(&data.to_vec());
        append_uint(&mut unsigned, chain_id as u128);
        append_uint(&mut unsigned, 0);
        append_uint(&mut unsigned, 0);

        let sighash = keccak256(&unsigned.out());
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(sighash.as_bytes())
            .map_err(|e| StrategyError::Signing(e.to_string()))?;

        let v = chain_id * 2 + 35 + recovery_id.to_byte() as u64;
        let mut signed = RlpStream::new_list(9);
        append_uint(&mut signed, nonce as u128);
        append_uint(&mut signed, gas_price);
        append_uint(&mut signed, gas_limit as u128);
        signed.append(&to.to_vec());
        append_uint(&mut signed, value);
        signed.append(&data.to_vec());
        append_uint(&mut signed, v as u128);
        signed.append(&trim_leading_zeros(&signature.r().to_bytes()));
        signed.append(&trim_leading_zeros(&signature.s().to_bytes()));
        Ok(signed.out().to_vec())
    }
}

/// Four-byte function selector.
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash.0[0], hash.0[1], hash.0[2], hash.0[3]]
}

fn word_u8(value: u8) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = value;
    word
}

/// The EVM reference implementation of [`ChainStrategy`].
pub struct EvmChainStrategy<R> {
    config: ChainStrategyConfig,
    rpc: Arc<R>,
    observer: FinalityObserver<R>,
    signer: Option<EvmTxSigner>,
    contract: [u8; 20],
}

impl<R: EvmRpcApi> EvmChainStrategy<R> {
    /// Create a strategy over an RPC port. `signer` is optional for
    /// observe-only deployments.
    pub fn new(
        config: ChainStrategyConfig,
        rpc: Arc<R>,
        observer: FinalityObserver<R>,
        signer: Option<EvmTxSigner>,
    ) -> StrategyResult<Self> {
        let contract_hex = config.contract_address.trim_start_matches("0x");
        let contract_bytes = hex::decode(contract_hex)
            .map_err(|_| StrategyError::InvalidConfig("contract address is not hex".into()))?;
        let contract: [u8; 20] = contract_bytes
            .try_into()
            .map_err(|_| StrategyError::InvalidConfig("contract address must be 20 bytes".into()))?;
        Ok(Self {
            config,
            rpc,
            observer,
            signer,
            contract,
        })
    }

    fn ensure_enabled(&self) -> StrategyResult<()> {
        if !self.config.enabled {
            return Err(StrategyError::Disabled {
                chain: self.config.network_name.clone(),
            });
        }
        Ok(())
    }

    async fn send_contract_call(&self, data: Vec<u8>) -> StrategyResult<AnchorResult> {
        self.ensure_enabled()?;
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| StrategyError::Signing("no signing key configured".into()))?;

        let nonce = self.rpc.transaction_count(&signer.address_hex()).await?;
        let gas_config = self.config.gas_config.clone().unwrap_or_default();
        let gas_price = match gas_config.gas_price_gwei {
            Some(gwei) => gwei as u128 * 1_000_000_000,
            None => self.rpc.gas_price().await?,
        };

        let raw = signer.sign_legacy(
            nonce,
            gas_price,
            gas_config.gas_limit,
            &self.contract,
            0,
            &data,
            self.config.chain_id,
        )?;
        let tx_hash = self.rpc.send_raw_transaction(&raw).await?;
        info!(
            chain = %self.config.network_name,
            tx_hash, nonce, "anchor transaction submitted"
        );

        Ok(AnchorResult {
            tx_hash,
            block_number: 0,
            block_hash: String::new(),
            status: AnchorStatus::Pending,
            confirmations: 0,
            gas_used: 0,
        })
    }
}

#[async_trait]
impl<R: EvmRpcApi> ChainStrategy for EvmChainStrategy<R> {
    fn config(&self) -> &ChainStrategyConfig {
        &self.config
    }

    async fn current_block(&self) -> StrategyResult<u64> {
        Ok(self.rpc.block_number().await?)
    }

    async fn health_check(&self) -> StrategyResult<()> {
        let chain_id = self.rpc.chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(StrategyError::InvalidConfig(format!(
                "node reports chain id {chain_id}, configured {}",
                self.config.chain_id
            )));
        }
        Ok(())
    }

    async fn create_anchor(&self, request: &CreateAnchorRequest) -> StrategyResult<AnchorResult> {
        let mut data = selector("anchorBatch(bytes32,bytes32)").to_vec();
        data.extend_from_slice(sha256(request.batch_id.as_bytes()).as_bytes());
        data.extend_from_slice(request.merkle_root.as_bytes());
        self.send_contract_call(data).await
    }

    async fn submit_proof(
        &self,
        anchor_id: &str,
        submission: &ProofSubmission,
    ) -> StrategyResult<AnchorResult> {
        let mut data = selector("submitProof(bytes32,bytes32)").to_vec();
        data.extend_from_slice(sha256(anchor_id.as_bytes()).as_bytes());
        data.extend_from_slice(submission.bundle_hash.as_bytes());
        self.send_contract_call(data).await
    }

    async fn execute_with_governance(
        &self,
        anchor_id: &str,
        params: &GovernanceExecutionParams,
    ) -> StrategyResult<AnchorResult> {
        let mut data = selector("executeWithGovernance(bytes32,bytes32,uint8)").to_vec();
        data.extend_from_slice(sha256(anchor_id.as_bytes()).as_bytes());
        data.extend_from_slice(params.operation_id.as_bytes());
        data.extend_from_slice(&word_u8(params.governance_level));
        self.send_contract_call(data).await
    }

    async fn observe_transaction(&self, tx_hash: &str) -> StrategyResult<ObservationResult> {
        self.ensure_enabled()?;
        Ok(self
            .observer
            .observe(tx_hash, self.required_confirmations())
            .await?)
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> StrategyResult<ObservationResult> {
        let receipt = self
            .rpc
            .transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| ObserverError::NotYetMined {
                tx_hash: tx_hash.to_string(),
            })?;
        let head = self.rpc.block_number().await?;
        let confirmations = head.saturating_sub(receipt.block_number) + 1;
        let required = self.required_confirmations();
        Ok(ObservationResult {
            tx_hash: tx_hash.to_string(),
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            confirmations,
            required_confirmations: required,
            success: receipt.status == 1,
            gas_used: receipt.gas_used.low_u64(),
            state_root: None,
            transactions_root: None,
            receipts_root: None,
            merkle_proof: None,
            receipt_proof: None,
            observed_at: Utc::now(),
        })
    }
}

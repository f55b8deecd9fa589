//! Transaction building, signing, and confirmation monitoring.
//!
//! # Responsibilities
//! - Compile instructions into a legacy message (account ordering, header)
//! - Serialize to the Solana wire format and sign
//! - Broadcast and wait for confirmation

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::SolanaClient;
use crate::blockchain::pubkey::Pubkey;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Keypair;

/// An account referenced by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledInstruction {
    program_id_index: u8,
    accounts: Vec<u8>,
    data: Vec<u8>,
}

/// A compiled legacy message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    instructions: Vec<CompiledInstruction>,
}

/// Append a compact-u16 ("shortvec") length.
pub fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

fn compact_len(len: usize, out: &mut Vec<u8>) -> BlockchainResult<()> {
    let len = u16::try_from(len)
        .map_err(|_| BlockchainError::Encoding(format!("length {} exceeds u16", len)))?;
    encode_compact_u16(len, out);
    Ok(())
}

impl Message {
    /// Compile instructions with `payer` as the fee payer.
    ///
    /// Accounts are ordered writable signers, readonly signers, writable
    /// non-signers, then readonly non-signers; the payer is always first.
    pub fn new(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: [u8; 32],
    ) -> BlockchainResult<Self> {
        let mut metas: Vec<AccountMeta> = vec![AccountMeta::new(*payer, true)];
        let mut merge = |meta: AccountMeta| {
            if let Some(existing) = metas.iter_mut().find(|m| m.pubkey == meta.pubkey) {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            } else {
                metas.push(meta);
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(meta.clone());
            }
            merge(AccountMeta::new_readonly(ix.program_id, false));
        }

        let group = |m: &AccountMeta| match (m.is_signer, m.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        metas.sort_by_key(group);

        if metas.len() > usize::from(u8::MAX) + 1 {
            return Err(BlockchainError::Encoding(format!(
                "{} accounts exceed the per-message limit",
                metas.len()
            )));
        }

        let count = |g: u8| metas.iter().filter(|m| group(m) == g).count() as u8;
        let header = MessageHeader {
            num_required_signatures: count(0) + count(1),
            num_readonly_signed_accounts: count(1),
            num_readonly_unsigned_accounts: count(3),
        };
        let account_keys: Vec<Pubkey> = metas.iter().map(|m| m.pubkey).collect();
        let index_of = |key: &Pubkey| -> u8 {
            // every key was merged above, and there are at most 256
            account_keys.iter().position(|k| k == key).unwrap_or_default() as u8
        };

        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..usize::from(self.header.num_required_signatures)]
    }

    pub fn serialize(&self) -> BlockchainResult<Vec<u8>> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];
        compact_len(self.account_keys.len(), &mut out)?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);
        compact_len(self.instructions.len(), &mut out)?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            compact_len(ix.accounts.len(), &mut out)?;
            out.extend_from_slice(&ix.accounts);
            compact_len(ix.data.len(), &mut out)?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: Message,
}

impl Transaction {
    /// Compile and sign. Every required signer must be among `signers`.
    pub fn new_signed(
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
        recent_blockhash: [u8; 32],
    ) -> BlockchainResult<Self> {
        let message = Message::new(instructions, &payer.pubkey(), recent_blockhash)?;
        let bytes = message.serialize()?;

        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                std::iter::once(payer)
                    .chain(signers.iter().copied())
                    .find(|kp| kp.pubkey() == *key)
                    .map(|kp| kp.sign(&bytes))
                    .ok_or_else(|| BlockchainError::Wallet(format!("Missing signer {}", key)))
            })
            .collect::<BlockchainResult<Vec<_>>>()?;

        Ok(Self {
            signatures,
            message,
        })
    }

    /// The transaction id: base58 of the first signature.
    pub fn signature(&self) -> String {
        self.signatures
            .first()
            .map(|sig| bs58::encode(sig).into_string())
            .unwrap_or_default()
    }

    pub fn serialize(&self) -> BlockchainResult<Vec<u8>> {
        let mut out = Vec::new();
        compact_len(self.signatures.len(), &mut out)?;
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message.serialize()?);
        Ok(out)
    }

    pub fn to_base64(&self) -> BlockchainResult<String> {
        Ok(BASE64.encode(self.serialize()?))
    }
}

/// Broadcasts transactions and waits for them to land.
#[derive(Clone)]
pub struct TxSubmitter {
    client: SolanaClient,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl TxSubmitter {
    pub fn new(client: SolanaClient, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            client,
            confirm_timeout,
            poll_interval,
        }
    }

    pub fn client(&self) -> &SolanaClient {
        &self.client
    }

    /// Send a signed transaction and block until it is confirmed.
    pub async fn send_and_confirm(&self, tx: &Transaction) -> BlockchainResult<String> {
        let signature = self.client.send_transaction(tx).await?;
        tracing::debug!(signature = %signature, "Transaction sent");
        self.wait_for_confirmation(&signature).await?;
        Ok(signature)
    }

    /// Poll signature status until `confirmed`/`finalized`, an execution
    /// error, or the timeout.
    pub async fn wait_for_confirmation(&self, signature: &str) -> BlockchainResult<()> {
        let result = timeout(self.confirm_timeout, async {
            let mut ticker = interval(self.poll_interval);

            loop {
                ticker.tick().await;

                let statuses = self
                    .client
                    .get_signature_statuses(&[signature.to_string()])
                    .await?;
                let Some(status) = statuses.into_iter().next().flatten() else {
                    tracing::debug!(signature = %signature, "Transaction pending");
                    continue;
                };

                if let Some(err) = status.err.as_ref().filter(|e| !e.is_null()) {
                    return Err(BlockchainError::TransactionFailed(err.to_string()));
                }
                if status.is_confirmed() {
                    return Ok(());
                }
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Err(BlockchainError::ConfirmationTimeout {
                signature: signature.to_string(),
                secs: self.confirm_timeout.as_secs(),
            }),
        }
    }
}

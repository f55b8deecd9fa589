//! Instruction builders for the system, token, associated-token and
//! token-metadata programs.
//!
//! Layouts follow each program's on-chain decoder: little-endian integers,
//! `COption` as a one-byte tag, borsh strings as a `u32` length prefix.

use crate::blockchain::programs::{
    ASSOCIATED_TOKEN, RENT_SYSVAR, SYSTEM, TOKEN, TOKEN_METADATA,
};
use crate::blockchain::{AccountMeta, BlockchainResult, Instruction, Pubkey};

/// Size of an SPL token mint account.
pub const MINT_ACCOUNT_LEN: u64 = 82;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_URI_LEN: usize = 200;

const SYSTEM_CREATE_ACCOUNT: u32 = 0;
const TOKEN_SET_AUTHORITY: u8 = 6;
const TOKEN_MINT_TO: u8 = 7;
const TOKEN_INITIALIZE_MINT2: u8 = 20;
const AUTHORITY_MINT_TOKENS: u8 = 0;
const ATA_CREATE_IDEMPOTENT: u8 = 1;
const METADATA_CREATE_V3: u8 = 33;

pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> BlockchainResult<Pubkey> {
    let (address, _) = Pubkey::find_program_address(
        &[wallet.as_bytes(), TOKEN.as_bytes(), mint.as_bytes()],
        &ASSOCIATED_TOKEN,
    )?;
    Ok(address)
}

pub fn metadata_address(mint: &Pubkey) -> BlockchainResult<Pubkey> {
    let (address, _) = Pubkey::find_program_address(
        &[b"metadata", TOKEN_METADATA.as_bytes(), mint.as_bytes()],
        &TOKEN_METADATA,
    )?;
    Ok(address)
}

pub fn create_account(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&SYSTEM_CREATE_ACCOUNT.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());

    Instruction {
        program_id: SYSTEM,
        accounts: vec![AccountMeta::new(*from, true), AccountMeta::new(*to, true)],
        data,
    }
}

fn push_coption_key(data: &mut Vec<u8>, key: Option<&Pubkey>) {
    match key {
        Some(key) => {
            data.push(1);
            data.extend_from_slice(key.as_bytes());
        }
        None => data.push(0),
    }
}

pub fn initialize_mint2(
    mint: &Pubkey,
    decimals: u8,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
) -> Instruction {
    let mut data = vec![TOKEN_INITIALIZE_MINT2, decimals];
    data.extend_from_slice(mint_authority.as_bytes());
    push_coption_key(&mut data, freeze_authority);

    Instruction {
        program_id: TOKEN,
        accounts: vec![AccountMeta::new(*mint, false)],
        data,
    }
}

pub fn mint_to(mint: &Pubkey, destination: &Pubkey, authority: &Pubkey, amount: u64) -> Instruction {
    let mut data = vec![TOKEN_MINT_TO];
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: TOKEN,
        accounts: vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// `SetAuthority(MintTokens)`; `None` fixes the supply for good.
pub fn set_mint_authority(
    mint: &Pubkey,
    current_authority: &Pubkey,
    new_authority: Option<&Pubkey>,
) -> Instruction {
    let mut data = vec![TOKEN_SET_AUTHORITY, AUTHORITY_MINT_TOKENS];
    push_coption_key(&mut data, new_authority);

    Instruction {
        program_id: TOKEN,
        accounts: vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(*current_authority, true),
        ],
        data,
    }
}

pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> BlockchainResult<Instruction> {
    let ata = associated_token_address(wallet, mint)?;
    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(*wallet, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM, false),
            AccountMeta::new_readonly(TOKEN, false),
        ],
        data: vec![ATA_CREATE_IDEMPOTENT],
    })
}

fn push_borsh_str(data: &mut Vec<u8>, s: &str) {
    data.extend_from_slice(&(s.len() as u32).to_le_bytes());
    data.extend_from_slice(s.as_bytes());
}

/// Token metadata fields written on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
}

/// `CreateMetadataAccountV3` with no creators, collection, or uses; mutable.
///
/// The mint authority pays and stays update authority.
pub fn create_metadata_account_v3(
    mint: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
    metadata: &TokenMetadata,
) -> BlockchainResult<Instruction> {
    let metadata_account = metadata_address(mint)?;

    let mut data = vec![METADATA_CREATE_V3];
    push_borsh_str(&mut data, &metadata.name);
    push_borsh_str(&mut data, &metadata.symbol);
    push_borsh_str(&mut data, &metadata.uri);
    data.extend_from_slice(&metadata.seller_fee_basis_points.to_le_bytes());
    data.push(0); // creators
    data.push(0); // collection
    data.push(0); // uses
    data.push(1); // is_mutable
    data.push(0); // collection_details

    Ok(Instruction {
        program_id: TOKEN_METADATA,
        accounts: vec![
            AccountMeta::new(metadata_account, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*mint_authority, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(*mint_authority, true),
            AccountMeta::new_readonly(SYSTEM, false),
            AccountMeta::new_readonly(RENT_SYSVAR, false),
        ],
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Pubkey {
        Pubkey::new([b; 32])
    }

    #[test]
    fn test_create_account_layout() {
        let ix = create_account(&key(1), &key(2), 1_461_600, MINT_ACCOUNT_LEN, &TOKEN);
        assert_eq!(ix.program_id, SYSTEM);
        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(&ix.data[4..12], &1_461_600u64.to_le_bytes());
        assert_eq!(&ix.data[12..20], &82u64.to_le_bytes());
        assert_eq!(&ix.data[20..], TOKEN.as_bytes());
        assert!(ix.accounts.iter().all(|a| a.is_signer && a.is_writable));
    }

    #[test]
    fn test_initialize_mint2_layout() {
        let ix = initialize_mint2(&key(2), 0, &key(1), Some(&key(1)));
        assert_eq!(ix.data.len(), 67);
        assert_eq!(ix.data[0], 20);
        assert_eq!(ix.data[1], 0);
        assert_eq!(&ix.data[2..34], key(1).as_bytes());
        assert_eq!(ix.data[34], 1);
        assert_eq!(&ix.data[35..], key(1).as_bytes());

        let no_freeze = initialize_mint2(&key(2), 0, &key(1), None);
        assert_eq!(no_freeze.data.len(), 35);
        assert_eq!(no_freeze.data[34], 0);
    }

    #[test]
    fn test_mint_to_and_set_authority() {
        let ix = mint_to(&key(2), &key(3), &key(1), 1);
        assert_eq!(ix.data, vec![7, 1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);

        let ix = set_mint_authority(&key(2), &key(1), None);
        assert_eq!(ix.data, vec![6, 0, 0]);
        assert_eq!(ix.accounts.len(), 2);
    }

    #[test]
    fn test_ata_create_idempotent() {
        let ix = create_associated_token_account_idempotent(&key(1), &key(7), &key(9)).unwrap();
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN);
        assert_eq!(ix.data, vec![1]);
        assert_eq!(
            ix.accounts[1].pubkey.to_string(),
            "BjmJ1yi1Sc4s9xQaiv4DbRuUhgfjUSc8cYSuwsFqoS9"
        );
        assert_eq!(ix.accounts.len(), 6);
    }

    #[test]
    fn test_metadata_v3_layout() {
        let metadata = TokenMetadata {
            name: "ab".into(),
            symbol: "FILE".into(),
            uri: "u".into(),
            seller_fee_basis_points: 0,
        };
        let ix = create_metadata_account_v3(&key(9), &key(1), &key(1), &metadata).unwrap();
        let expected: Vec<u8> = [
            vec![33],
            vec![2, 0, 0, 0, b'a', b'b'],
            vec![4, 0, 0, 0, b'F', b'I', b'L', b'E'],
            vec![1, 0, 0, 0, b'u'],
            vec![0, 0],
            vec![0, 0, 0, 1, 0],
        ]
        .concat();
        assert_eq!(ix.data, expected);
        assert_eq!(
            ix.accounts[0].pubkey.to_string(),
            "3ThWX3CcZ4VKueas6QL9rfQ2yjY5PTFWH5sGhnrNchUu"
        );
        assert!(ix.accounts[0].is_writable);
        assert!(ix.accounts[3].is_signer && ix.accounts[3].is_writable);
    }
}

//! # Gasless NFT Contract
//!
//! An ERC-721-shaped collectible built to live behind the relay: every
//! entry point authorizes against the *verified signer* of the forwarded
//! request, so the party paying for the submission never gains any
//! authority over the tokens.
//!
//! ## Entry points
//!
//! | calldata | behavior |
//! |----------|----------|
//! | `mint(address)` | mints the next sequential token id to the address |
//! | `transferFrom(address,address,uint256)` | moves a token; sender must be the owner or approved |
//! | `approve(address,uint256)` | grants (or, for the zero address, clears) per-token approval |
//!
//! Minting is deliberately permissionless — this contract exists to
//! demonstrate the relay lifecycle, and a mint anyone can sign for is
//! the shortest path to a populated wallet.
//!
//! ## Emitted events
//!
//! Standard ERC-721 `Transfer` and `Approval`, plus two protocol-flavored
//! ones (`NFTMinted`, `NFTTransferred`) so receipts show both a schema
//! the whole ecosystem knows and ones only this deployment's registry
//! does. All fields are indexed; the data segment stays empty.

use ethers::abi::{self, Event, EventParam, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

use porter_protocol::crypto::{selector, topic_for_address, topic_for_uint};
use porter_protocol::forward::TargetCall;
use porter_protocol::ledger::{CallEnv, LogEntry, TargetContract, TargetOutcome, TargetRevert};
use porter_protocol::receipt::KnownEmitter;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Faults this contract can revert with. The message strings are the
/// revert reasons callers see, so they follow the `"GaslessNFT: ..."`
/// convention a chain explorer would display.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NftError {
    #[error("GaslessNFT: mint to the zero address")]
    MintToZero,

    #[error("GaslessNFT: transfer to the zero address")]
    TransferToZero,

    /// The referenced token has never been minted.
    #[error("GaslessNFT: invalid token ID")]
    InvalidTokenId,

    /// `transferFrom`'s `from` argument is not the current owner.
    #[error("GaslessNFT: transfer from incorrect owner")]
    IncorrectOwner,

    /// The verified signer is neither the owner nor approved.
    #[error("GaslessNFT: caller is not token owner or approved")]
    NotAuthorized,

    #[error("GaslessNFT: approve caller is not token owner")]
    ApproveNotOwner,

    #[error("GaslessNFT: approval to current owner")]
    ApproveToOwner,

    /// Calldata shorter than a selector, or arguments that don't decode.
    #[error("GaslessNFT: malformed calldata")]
    BadCalldata,

    #[error("GaslessNFT: unknown function selector 0x{0}")]
    UnknownSelector(String),
}

impl From<NftError> for TargetRevert {
    fn from(err: NftError) -> Self {
        TargetRevert::new(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct NftState {
    /// Token id to current owner. Absence means never minted.
    owners: HashMap<U256, Address>,
    /// Per-token approval. Cleared on transfer.
    approvals: HashMap<U256, Address>,
    /// Owner to held-token count.
    balances: HashMap<Address, u64>,
    /// The id the next mint will assign. Starts at zero.
    next_token_id: U256,
}

/// The contract. Interior-mutable so the ledger can hold it as a shared
/// trait object; one mutex over the whole state keeps invariants simple.
#[derive(Debug, Default)]
pub struct GaslessNft {
    state: Mutex<NftState>,
}

impl GaslessNft {
    pub fn new() -> Self {
        Self::default()
    }

    // -- state transitions --------------------------------------------------

    /// Mints the next sequential token id to `to`.
    pub fn mint(&self, to: Address) -> Result<U256, NftError> {
        if to == Address::zero() {
            return Err(NftError::MintToZero);
        }
        let mut state = self.state.lock();
        let token_id = state.next_token_id;
        state.next_token_id = token_id + U256::one();
        state.owners.insert(token_id, to);
        *state.balances.entry(to).or_insert(0) += 1;
        Ok(token_id)
    }

    /// Moves `token_id` from `from` to `to` on behalf of `sender`.
    ///
    /// `sender` must be the current owner or the approved address, and
    /// `from` must actually be the owner — both checks, because the
    /// arguments arrive from calldata and the authority from the
    /// signature, and they are allowed to disagree.
    pub fn transfer(
        &self,
        sender: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<(), NftError> {
        if to == Address::zero() {
            return Err(NftError::TransferToZero);
        }
        let mut state = self.state.lock();
        let owner = *state.owners.get(&token_id).ok_or(NftError::InvalidTokenId)?;
        if owner != from {
            return Err(NftError::IncorrectOwner);
        }
        let approved = state.approvals.get(&token_id).copied();
        if sender != owner && approved != Some(sender) {
            return Err(NftError::NotAuthorized);
        }

        // Approval does not survive a transfer.
        state.approvals.remove(&token_id);
        if let Some(balance) = state.balances.get_mut(&from) {
            *balance = balance.saturating_sub(1);
        }
        *state.balances.entry(to).or_insert(0) += 1;
        state.owners.insert(token_id, to);
        Ok(())
    }

    /// Grants `to` approval over `token_id`, or clears the approval when
    /// `to` is the zero address. Owner only.
    pub fn approve(&self, sender: Address, to: Address, token_id: U256) -> Result<(), NftError> {
        let mut state = self.state.lock();
        let owner = *state.owners.get(&token_id).ok_or(NftError::InvalidTokenId)?;
        if sender != owner {
            return Err(NftError::ApproveNotOwner);
        }
        if to == owner {
            return Err(NftError::ApproveToOwner);
        }
        if to == Address::zero() {
            state.approvals.remove(&token_id);
        } else {
            state.approvals.insert(token_id, to);
        }
        Ok(())
    }

    // -- views --------------------------------------------------------------

    /// The current owner of `token_id`, or `None` if never minted.
    pub fn owner_of(&self, token_id: U256) -> Option<Address> {
        self.state.lock().owners.get(&token_id).copied()
    }

    /// Number of tokens held by `owner`, or 0.
    pub fn balance_of(&self, owner: Address) -> u64 {
        self.state
            .lock()
            .balances
            .get(&owner)
            .copied()
            .unwrap_or(0)
    }

    /// The approved address for `token_id`, or `None` if unapproved.
    pub fn get_approved(&self, token_id: U256) -> Option<Address> {
        self.state.lock().approvals.get(&token_id).copied()
    }

    /// Total tokens minted to date. There is no burn, so this is also
    /// the id the next mint will receive.
    pub fn total_minted(&self) -> U256 {
        self.state.lock().next_token_id
    }

    // -- dispatch -----------------------------------------------------------

    fn dispatch(&self, env: CallEnv<'_>) -> Result<TargetOutcome, NftError> {
        if env.data.len() < 4 {
            return Err(NftError::BadCalldata);
        }
        let (sel, args) = env.data.split_at(4);

        if sel == selector("mint(address)") {
            let to = decode_args(&[ParamType::Address], args)?
                .remove(0)
                .into_address()
                .ok_or(NftError::BadCalldata)?;
            let token_id = self.mint(to)?;
            Ok(TargetOutcome {
                return_data: Bytes::from(abi::encode(&[Token::Uint(token_id)])),
                logs: vec![
                    log_entry(
                        env.target,
                        &transfer_event(),
                        &[
                            topic_for_address(Address::zero()),
                            topic_for_address(to),
                            topic_for_uint(token_id),
                        ],
                    ),
                    log_entry(
                        env.target,
                        &minted_event(),
                        &[topic_for_address(to), topic_for_uint(token_id)],
                    ),
                ],
            })
        } else if sel == selector("transferFrom(address,address,uint256)") {
            let mut tokens = decode_args(
                &[ParamType::Address, ParamType::Address, ParamType::Uint(256)],
                args,
            )?;
            let from = tokens.remove(0).into_address().ok_or(NftError::BadCalldata)?;
            let to = tokens.remove(0).into_address().ok_or(NftError::BadCalldata)?;
            let token_id = tokens.remove(0).into_uint().ok_or(NftError::BadCalldata)?;
            self.transfer(env.sender, from, to, token_id)?;
            Ok(TargetOutcome {
                return_data: Bytes::default(),
                logs: vec![
                    log_entry(
                        env.target,
                        &transfer_event(),
                        &[
                            topic_for_address(from),
                            topic_for_address(to),
                            topic_for_uint(token_id),
                        ],
                    ),
                    log_entry(
                        env.target,
                        &transferred_event(),
                        &[
                            topic_for_address(from),
                            topic_for_address(to),
                            topic_for_uint(token_id),
                        ],
                    ),
                ],
            })
        } else if sel == selector("approve(address,uint256)") {
            let mut tokens = decode_args(&[ParamType::Address, ParamType::Uint(256)], args)?;
            let to = tokens.remove(0).into_address().ok_or(NftError::BadCalldata)?;
            let token_id = tokens.remove(0).into_uint().ok_or(NftError::BadCalldata)?;
            self.approve(env.sender, to, token_id)?;
            Ok(TargetOutcome {
                return_data: Bytes::default(),
                logs: vec![log_entry(
                    env.target,
                    &approval_event(),
                    &[
                        topic_for_address(env.sender),
                        topic_for_address(to),
                        topic_for_uint(token_id),
                    ],
                )],
            })
        } else {
            Err(NftError::UnknownSelector(hex::encode(sel)))
        }
    }
}

impl TargetContract for GaslessNft {
    fn call(&self, env: CallEnv<'_>) -> Result<TargetOutcome, TargetRevert> {
        self.dispatch(env).map_err(TargetRevert::from)
    }
}

fn decode_args(kinds: &[ParamType], args: &[u8]) -> Result<Vec<Token>, NftError> {
    abi::decode(kinds, args).map_err(|_| NftError::BadCalldata)
}

fn log_entry(target: Address, event: &Event, indexed: &[H256]) -> LogEntry {
    let mut topics = Vec::with_capacity(indexed.len() + 1);
    topics.push(event.signature());
    topics.extend_from_slice(indexed);
    LogEntry {
        emitter: target,
        topics,
        data: Bytes::default(),
    }
}

// ---------------------------------------------------------------------------
// Event schemas
// ---------------------------------------------------------------------------

fn indexed_param(name: &str, kind: ParamType) -> EventParam {
    EventParam {
        name: name.to_string(),
        kind,
        indexed: true,
    }
}

/// Standard ERC-721 `Transfer(address,address,uint256)`, all indexed.
pub fn transfer_event() -> Event {
    Event {
        name: "Transfer".to_string(),
        inputs: vec![
            indexed_param("from", ParamType::Address),
            indexed_param("to", ParamType::Address),
            indexed_param("tokenId", ParamType::Uint(256)),
        ],
        anonymous: false,
    }
}

/// Standard ERC-721 `Approval(address,address,uint256)`, all indexed.
pub fn approval_event() -> Event {
    Event {
        name: "Approval".to_string(),
        inputs: vec![
            indexed_param("owner", ParamType::Address),
            indexed_param("approved", ParamType::Address),
            indexed_param("tokenId", ParamType::Uint(256)),
        ],
        anonymous: false,
    }
}

/// `NFTMinted(address,uint256)` — this deployment's own mint marker.
pub fn minted_event() -> Event {
    Event {
        name: "NFTMinted".to_string(),
        inputs: vec![
            indexed_param("to", ParamType::Address),
            indexed_param("tokenId", ParamType::Uint(256)),
        ],
        anonymous: false,
    }
}

/// `NFTTransferred(address,address,uint256)` — emitted alongside the
/// standard `Transfer` on relay-driven moves.
pub fn transferred_event() -> Event {
    Event {
        name: "NFTTransferred".to_string(),
        inputs: vec![
            indexed_param("from", ParamType::Address),
            indexed_param("to", ParamType::Address),
            indexed_param("tokenId", ParamType::Uint(256)),
        ],
        anonymous: false,
    }
}

/// Registry entry covering every event this contract emits. Hand it to
/// the classifier under whatever label the deployment uses.
pub fn known_emitter(label: impl Into<String>, address: Address) -> KnownEmitter {
    KnownEmitter::new(label, address).with_events([
        transfer_event(),
        approval_event(),
        minted_event(),
        transferred_event(),
    ])
}

// ---------------------------------------------------------------------------
// Calldata builders
// ---------------------------------------------------------------------------

/// `mint(address)` calldata targeting `nft`.
pub fn mint_call(nft: Address, to: Address) -> TargetCall {
    let mut data = selector("mint(address)").to_vec();
    data.extend_from_slice(&abi::encode(&[Token::Address(to)]));
    TargetCall::new(nft, Bytes::from(data))
}

/// `transferFrom(address,address,uint256)` calldata targeting `nft`.
pub fn transfer_call(nft: Address, from: Address, to: Address, token_id: U256) -> TargetCall {
    let mut data = selector("transferFrom(address,address,uint256)").to_vec();
    data.extend_from_slice(&abi::encode(&[
        Token::Address(from),
        Token::Address(to),
        Token::Uint(token_id),
    ]));
    TargetCall::new(nft, Bytes::from(data))
}

/// `approve(address,uint256)` calldata targeting `nft`.
pub fn approve_call(nft: Address, to: Address, token_id: U256) -> TargetCall {
    let mut data = selector("approve(address,uint256)").to_vec();
    data.extend_from_slice(&abi::encode(&[Token::Address(to), Token::Uint(token_id)]));
    TargetCall::new(nft, Bytes::from(data))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

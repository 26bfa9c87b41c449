// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PORTER Protocol — Core Library
//!
//! PORTER is a gasless relay protocol: a signer authorizes an action with a
//! signature, and an untrusted relayer pays to execute it. The signer never
//! needs the fee currency; the relayer never holds the signer's authority.
//! Everything interesting in this crate lives in the narrow gap between
//! those two facts.
//!
//! PORTER takes a pragmatic stance: secp256k1 signatures with public-key
//! recovery (because the executing ledger speaks Ethereum), keccak-256 for
//! every digest (ditto), and a typed, domain-separated signing payload so
//! that a signature minted for one deployment is worthless against another.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the stages of a relay:
//!
//! - **crypto** — Keccak digests and signing keys. Don't roll your own.
//! - **forward** — Request construction and the canonical signing payload.
//! - **relay** — The verify-then-execute pipeline and its rejection taxonomy.
//! - **receipt** — Classification of execution logs into typed events.
//! - **ledger** — The external executor's contract, plus an in-memory one
//!   for tests and local development.
//! - **config** — Protocol constants and defaults.
//!
//! ## Design Philosophy
//!
//! 1. The ledger's atomic nonce check is the only replay defense that
//!    counts. Everything this library checks before it is a courtesy.
//! 2. A failed relay is never retried with the same payload. Spent is spent.
//! 3. Classification never throws. Garbage logs become `Unparseable`
//!    records, not panics.
//! 4. If it touches authorization, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod forward;
pub mod ledger;
pub mod receipt;
pub mod relay;

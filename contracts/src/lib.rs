//! # PORTER Target Contracts
//!
//! Executable targets for the PORTER relay pipeline. A target is what a
//! signed forward request ultimately invokes: the ledger verifies the
//! signature, consumes the nonce, and hands the call to one of these.
//!
//! - **Gasless NFT** — an ERC-721-shaped collectible whose mint,
//!   transfer, and approval entry points are all meant to be reached
//!   through the relay, so holders never pay for gas themselves.
//!
//! ## Design Principles
//!
//! 1. Authorization reads `CallEnv::sender` and nothing else. That field
//!    carries the verified signer of the forwarded request; trusting any
//!    other channel would hand the relayer the keys.
//! 2. Faults are reverts with `"GaslessNFT: ..."` reasons, encoded the
//!    way an EVM `Error(string)` would be. A caller debugging a failed
//!    relay sees the same message a chain explorer would show.
//! 3. Every state change emits its log entries. The receipt classifier
//!    downstream is only as good as the evidence targets leave behind.

pub mod gasless_nft;

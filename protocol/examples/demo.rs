//! Interactive CLI demo of the full PORTER gasless relay lifecycle.
//!
//! Walks through signer key generation, EIP-712 request construction,
//! relayed execution against an in-process dev ledger, replay and
//! tampering rejection, and durable execution records. The output uses
//! ANSI escape codes for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;
use std::time::Instant;

use ethers::abi::{self, Event, EventParam, ParamType, Token};
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use parking_lot::Mutex;

use porter_protocol::crypto::{keccak256, selector, topic_for_address, PorterKeypair};
use porter_protocol::forward::{RequestBuilder, SignedForwardRequest, SigningDomain, TargetCall};
use porter_protocol::ledger::{
    CallEnv, DevLedger, LogEntry, TargetContract, TargetOutcome, TargetRevert,
};
use porter_protocol::receipt::{ClassifiedEvent, KnownEmitter, ReceiptClassifier};
use porter_protocol::relay::{RelayError, RelayReceipt, Relayer};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    PORTER  --  Gasless Relay Lifecycle Demo                        {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  EIP-712 + secp256k1 + Keccak-256              {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!(
        "{CYAN}------------------------------------------------------------------------{RESET}"
    );
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn blocked(text: &str) {
    println!("{YELLOW}  [BLOCKED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn address_display(name: &str, addr: &str, color: &str) {
    let prefix = &addr[..6];
    let suffix = &addr[addr.len().saturating_sub(6)..];
    println!("  {color}{BOLD}{name}{RESET}  {DIM}{prefix}...{suffix}{RESET}  {DIM}(EIP-55 checksummed){RESET}");
}

fn event_row(event: &ClassifiedEvent) {
    let label = event.emitter_label.as_deref().unwrap_or("unknown");
    let name = event.name.as_deref().unwrap_or("?");
    let args = match &event.args {
        Some(args) => args
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("  "),
        None => String::new(),
    };
    println!("  {GREEN}[EVENT]{RESET} {BOLD}{label}::{name}{RESET}  {DIM}{args}{RESET}");
}

fn entry_row(index: usize, author: &str, message: &str, color: &str) {
    println!("  {color}{BOLD}#{index}{RESET}  {DIM}{author}{RESET}  {WHITE}\"{message}\"{RESET}");
}

fn separator() {
    println!(
        "{DIM}{CYAN}  . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . {RESET}"
    );
}

// ---------------------------------------------------------------------------
// Demo target: a guestbook anyone can sign, for free
// ---------------------------------------------------------------------------

/// Stores (author, message) pairs. `sign(string)` appends an entry and
/// emits `MessageSigned(address indexed author, string message)`; empty
/// messages revert.
#[derive(Default)]
struct Guestbook {
    entries: Mutex<Vec<(Address, String)>>,
}

impl Guestbook {
    fn entries(&self) -> Vec<(Address, String)> {
        self.entries.lock().clone()
    }
}

impl TargetContract for Guestbook {
    fn call(&self, env: CallEnv<'_>) -> Result<TargetOutcome, TargetRevert> {
        if env.data.len() < 4 || env.data[..4] != selector("sign(string)") {
            return Err(TargetRevert::new("Guestbook: unknown function"));
        }
        let tokens = abi::decode(&[ParamType::String], &env.data[4..])
            .map_err(|_| TargetRevert::new("Guestbook: malformed calldata"))?;
        let message = tokens[0].clone().into_string().unwrap_or_default();
        if message.is_empty() {
            return Err(TargetRevert::new("Guestbook: empty message"));
        }

        let mut entries = self.entries.lock();
        entries.push((env.sender, message.clone()));
        let count = U256::from(entries.len());

        Ok(TargetOutcome {
            return_data: abi::encode(&[Token::Uint(count)]).into(),
            logs: vec![LogEntry {
                emitter: env.target,
                topics: vec![
                    message_signed_event().signature(),
                    topic_for_address(env.sender),
                ],
                data: abi::encode(&[Token::String(message)]).into(),
            }],
        })
    }
}

fn message_signed_event() -> Event {
    Event {
        name: "MessageSigned".to_string(),
        inputs: vec![
            EventParam {
                name: "author".to_string(),
                kind: ParamType::Address,
                indexed: true,
            },
            EventParam {
                name: "message".to_string(),
                kind: ParamType::String,
                indexed: false,
            },
        ],
        anonymous: false,
    }
}

fn sign_call(guestbook: Address, message: &str) -> TargetCall {
    let mut data = selector("sign(string)").to_vec();
    data.extend_from_slice(&abi::encode(&[Token::String(message.to_string())]));
    TargetCall::new(guestbook, data)
}

/// Build, sign, and relay in one step, the way a gasless client would.
async fn relay_for(
    relayer: &Relayer,
    builder: &RequestBuilder,
    signer: &PorterKeypair,
    call: TargetCall,
) -> Result<RelayReceipt, RelayError> {
    let prepared = builder.build(signer.address(), call).await?;
    let signature = signer
        .sign_digest(prepared.signing_payload)
        .expect("signing a valid digest cannot fail");
    let signed = SignedForwardRequest::new(prepared.request, &signature);
    relayer.relay(&signed).await
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let demo_start = Instant::now();

    banner();

    // -----------------------------------------------------------------------
    // Step 1: Signer Identities
    // -----------------------------------------------------------------------

    section(1, "Gasless Signer Identities");
    subsection("Generating secp256k1 keypairs and deriving checksummed addresses...");

    let t = Instant::now();
    let alice = PorterKeypair::generate();
    let bob = PorterKeypair::generate();
    timing("keygen x2", t.elapsed());

    println!();
    address_display("Alice ", &alice.address_checksum(), BLUE);
    address_display("Bob   ", &bob.address_checksum(), GREEN);
    println!();
    success("Neither signer holds any gas. They never will.");

    // -----------------------------------------------------------------------
    // Step 2: Relay Infrastructure Bootstrap
    // -----------------------------------------------------------------------

    section(2, "Relay Infrastructure Bootstrap");
    subsection("Initializing signing domain, dev ledger, guestbook target, and relayer...");

    let t = Instant::now();
    let forwarder = Address::from_slice(&keccak256(b"porter/demo/forwarder")[12..]);
    let domain = SigningDomain::devnet(forwarder);

    let ledger = Arc::new(DevLedger::new(domain.clone()));
    let guestbook_address = Address::from_slice(&keccak256(b"porter/demo/guestbook")[12..]);
    let guestbook = Arc::new(Guestbook::default());
    ledger.register_target(guestbook_address, guestbook.clone());

    let classifier = ReceiptClassifier::new(vec![
        KnownEmitter::new("Guestbook", guestbook_address).with_event(message_signed_event()),
    ]);
    let relayer = Relayer::new(domain.clone(), ledger.clone(), classifier);
    let builder = RequestBuilder::new(domain.clone(), ledger.clone());
    timing("infrastructure setup", t.elapsed());

    info("Signing domain", &domain.to_string());
    info("Guestbook target", &to_checksum(&guestbook_address, None));
    success("Relay stack online with one mounted target contract");

    // -----------------------------------------------------------------------
    // Step 3: Build and Sign an EIP-712 Request
    // -----------------------------------------------------------------------

    section(3, "EIP-712 Request Construction");
    subsection("Fetching Alice's nonce and deriving the signing payload...");

    let t = Instant::now();
    let prepared = builder
        .build(
            alice.address(),
            sign_call(guestbook_address, "Hello from the gasless side"),
        )
        .await
        .expect("building against a healthy ledger");
    let signature = alice
        .sign_digest(prepared.signing_payload)
        .expect("signing");
    let signed = SignedForwardRequest::new(prepared.request.clone(), &signature);
    timing("build + sign", t.elapsed());

    info("Assigned nonce", &prepared.request.nonce.to_string());
    info("Signing payload", &prepared.payload_hex());
    info(
        "Primary type",
        prepared.typed_data["primaryType"].as_str().unwrap_or("?"),
    );
    success("Wallet-ready typed data and payload derived from the same request");

    // -----------------------------------------------------------------------
    // Step 4: Relay the Request
    // -----------------------------------------------------------------------

    section(4, "Relayed Execution");
    subsection("Submitting the signed request; the relayer fronts the gas...");

    let t = Instant::now();
    let receipt = relayer
        .relay(&signed)
        .await
        .expect("a well-formed first submission lands");
    timing("verify + execute + classify", t.elapsed());

    info("Execution id", &format!("{:#x}", receipt.execution_id));
    info("Gas charged to relayer", &receipt.result.gas_used.to_string());
    separator();
    for event in &receipt.events {
        event_row(event);
    }
    println!();
    success("Alice signed the guestbook without spending a single wei");

    // -----------------------------------------------------------------------
    // Step 5: Replay Attack
    // -----------------------------------------------------------------------

    section(5, "Replay Attack Rejected");
    subsection("Re-submitting the exact same signed bytes...");

    match relayer.relay(&signed).await {
        Err(err @ RelayError::NonceReused { .. }) => blocked(&err.to_string()),
        other => panic!("replay must be rejected, got {other:?}"),
    }
    info(
        "Guestbook entries",
        &guestbook.entries().len().to_string(),
    );
    success("The ledger's nonce is the replay defense, not relayer memory");

    // -----------------------------------------------------------------------
    // Step 6: Tampered Request
    // -----------------------------------------------------------------------

    section(6, "Tampered Request Rejected");
    subsection("Mutating the forwarded value after Alice signed...");

    let mut tampered = signed.clone();
    tampered.request.value = U256::from(999u64);
    match relayer.relay(&tampered).await {
        Err(RelayError::SignatureMismatch {
            expected,
            recovered,
        }) => {
            blocked("recovered address no longer matches the declared signer");
            info("Declared signer", &to_checksum(&expected, None));
            if let Some(addr) = recovered {
                info("Recovered signer", &to_checksum(&addr, None));
            }
        }
        other => panic!("tampering must be rejected, got {other:?}"),
    }
    success("One flipped field, one dead signature");

    // -----------------------------------------------------------------------
    // Step 7: Contract Revert
    // -----------------------------------------------------------------------

    section(7, "Contract Revert Surfaced (and the Nonce Still Spent)");
    subsection("Bob relays an empty message; the guestbook refuses it...");

    match relay_for(&relayer, &builder, &bob, sign_call(guestbook_address, "")).await {
        Err(RelayError::TargetActionFailed {
            execution_id,
            reason,
        }) => {
            blocked(&format!("contract reverted: {reason}"));
            let record = relayer
                .execution_status(execution_id)
                .await
                .expect("ledger reachable")
                .expect("reverted executions leave records too");
            info("Recorded status", &record.status.to_string());
        }
        other => panic!("empty message must revert, got {other:?}"),
    }

    let bob_nonce = relayer
        .get_nonce(bob.address())
        .await
        .expect("ledger reachable");
    info("Bob's nonce after the revert", &bob_nonce.to_string());

    subsection("Bob tries again with an actual message...");
    let bob_receipt = relay_for(
        &relayer,
        &builder,
        &bob,
        sign_call(guestbook_address, "Second signer, still zero gas"),
    )
    .await
    .expect("a proper message lands");
    separator();
    for event in &bob_receipt.events {
        event_row(event);
    }
    println!();
    success("Revert reasons travel all the way back to the caller");

    // -----------------------------------------------------------------------
    // Step 8: Durable Execution Records
    // -----------------------------------------------------------------------

    section(8, "Durable Execution Records");
    subsection("Looking up Alice's first execution by its content-derived id...");

    let record = relayer
        .execution_status(receipt.execution_id)
        .await
        .expect("ledger reachable")
        .expect("executed requests leave records");
    info("Execution id", &format!("{:#x}", record.execution_id));
    info("Signer", &to_checksum(&record.signer, None));
    info("Target", &to_checksum(&record.target, None));
    info("Status", &record.status.to_string());
    info("Gas used", &record.result.gas_used.to_string());
    info("Executed at", &record.executed_at.to_rfc3339());
    success("Anyone holding the payload and signature can derive this id");

    // -----------------------------------------------------------------------
    // Final Summary
    // -----------------------------------------------------------------------

    let total_elapsed = demo_start.elapsed();

    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    DEMO COMPLETE -- Final Summary                                  {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();

    println!("  {BOLD}{WHITE}Protocol Statistics:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    info("Signers", "2 (Alice, Bob)");
    info("Requests relayed", "2 landed, 1 reverted");
    info("Replay attempts blocked", "1");
    info("Forgeries blocked", "1");
    info("Signing scheme", "EIP-712 typed data (secp256k1 ECDSA)");
    info("Hash function", "Keccak-256");
    info("Nonce model", "Strictly sequential per signer");
    info("Execution ids", "keccak256(payload + signature)");
    println!();

    // Final guestbook table.
    println!("  {BOLD}{WHITE}Guestbook Entries:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    for (index, (author, message)) in guestbook.entries().iter().enumerate() {
        let color = if *author == alice.address() { BLUE } else { GREEN };
        entry_row(index, &to_checksum(author, None), message, color);
    }
    println!();
    println!("  {ITALIC}{DIM}Every entry above was written by a signer with a zero gas balance.{RESET}");

    println!();
    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}s{RESET}",
        total_elapsed.as_secs_f64()
    );
    println!();
}

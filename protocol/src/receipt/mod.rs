//! # Receipt Classification
//!
//! Execution results carry raw log entries: an emitter address, some
//! topics, some bytes. This module turns each entry into a tagged
//! [`ClassifiedEvent`] by matching it against a registry of known
//! emitters and their event schemas.
//!
//! The rules, in the order they apply per entry:
//!
//! | log entry | category |
//! |-----------|----------|
//! | emitter not in the registry | [`EventCategory::FromUnknownEmitter`] |
//! | registered emitter, no topics or topic 0 matches none of its schemas | [`EventCategory::UnknownFromKnownEmitter`] |
//! | schema matched and decoding succeeded | [`EventCategory::KnownEvent`] |
//! | schema matched and decoding failed | [`EventCategory::Unparseable`] |
//!
//! Three properties the relay pipeline depends on:
//!
//! - **Total.** Every input entry produces exactly one output, whatever
//!   its shape. There is no input that makes classification fail.
//! - **Order-preserving.** Output index `i` classifies input entry `i`.
//!   Emission order is evidence; we don't shuffle evidence.
//! - **Advisory.** Classification happens after execution committed.
//!   Nothing here can block, retry, or unwind a relay — a surprising
//!   event is a reporting matter, not a correctness one.

use ethers::abi::{Event, RawLog, Token};
use ethers::types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ledger::LogEntry;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A contract the operator has vouched for: an address, a human label,
/// and the event schemas we expect it to emit.
///
/// An emitter registered with zero schemas is legal and useful — it
/// means "I trust this address but decode nothing", and every entry it
/// emits classifies as [`EventCategory::UnknownFromKnownEmitter`].
#[derive(Debug, Clone)]
pub struct KnownEmitter {
    pub label: String,
    pub address: Address,
    pub events: Vec<Event>,
}

impl KnownEmitter {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        Self {
            label: label.into(),
            address,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }
}

// ---------------------------------------------------------------------------
// Classification output
// ---------------------------------------------------------------------------

/// The four classification verdicts. Exactly one per log entry, always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Registered emitter, schema matched, fields decoded.
    KnownEvent,
    /// Registered emitter, but topic 0 matches none of its schemas.
    UnknownFromKnownEmitter,
    /// The emitter is not in the registry. Nothing to decode against.
    FromUnknownEmitter,
    /// A schema claimed this entry and then choked on its shape. The raw
    /// topics and data are preserved verbatim for the post-mortem.
    Unparseable,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::KnownEvent => "known_event",
            Self::UnknownFromKnownEmitter => "unknown_from_known_emitter",
            Self::FromUnknownEmitter => "from_unknown_emitter",
            Self::Unparseable => "unparseable",
        };
        write!(f, "{label}")
    }
}

/// One classified log entry.
///
/// Which optional fields are populated depends on the category:
/// `name`/`args` for [`EventCategory::KnownEvent`], `emitter_label`
/// whenever the emitter is registered, and `decode_error` plus the
/// verbatim `topics`/`data` only for [`EventCategory::Unparseable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// Position of the source entry in the execution's log list.
    pub index: usize,
    /// The emitting contract.
    pub emitter: Address,
    pub category: EventCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitter_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Decoded fields rendered canonically: addresses as full `0x` hex,
    /// integers in decimal, bytes as `0x` hex. Sorted by field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<H256>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl ClassifiedEvent {
    fn bare(index: usize, emitter: Address, category: EventCategory) -> Self {
        Self {
            index,
            emitter,
            category,
            emitter_label: None,
            name: None,
            args: None,
            decode_error: None,
            topics: None,
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// The classifier
// ---------------------------------------------------------------------------

/// Classifies log entries against a fixed emitter registry.
///
/// Pure and deterministic: same registry, same entries, same output.
/// Construct once from configuration and share freely.
#[derive(Debug, Clone, Default)]
pub struct ReceiptClassifier {
    emitters: Vec<KnownEmitter>,
}

impl ReceiptClassifier {
    pub fn new(emitters: Vec<KnownEmitter>) -> Self {
        Self { emitters }
    }

    /// The registry this classifier was built from.
    pub fn emitters(&self) -> &[KnownEmitter] {
        &self.emitters
    }

    /// Classifies every entry, in order. Total by construction: the only
    /// fallible step is schema decoding, and its failure is itself a
    /// verdict.
    pub fn classify(&self, logs: &[LogEntry]) -> Vec<ClassifiedEvent> {
        logs.iter()
            .enumerate()
            .map(|(index, entry)| self.classify_entry(index, entry))
            .collect()
    }

    fn classify_entry(&self, index: usize, entry: &LogEntry) -> ClassifiedEvent {
        let Some(known) = self.emitters.iter().find(|e| e.address == entry.emitter) else {
            return ClassifiedEvent::bare(index, entry.emitter, EventCategory::FromUnknownEmitter);
        };

        let matched = entry
            .topics
            .first()
            .and_then(|topic0| known.events.iter().find(|ev| ev.signature() == *topic0));

        let Some(event) = matched else {
            let mut out =
                ClassifiedEvent::bare(index, entry.emitter, EventCategory::UnknownFromKnownEmitter);
            out.emitter_label = Some(known.label.clone());
            return out;
        };

        let raw = RawLog {
            topics: entry.topics.clone(),
            data: entry.data.to_vec(),
        };
        match event.parse_log(raw) {
            Ok(parsed) => {
                let args = parsed
                    .params
                    .into_iter()
                    .map(|param| (param.name, render_token(&param.value)))
                    .collect();
                let mut out = ClassifiedEvent::bare(index, entry.emitter, EventCategory::KnownEvent);
                out.emitter_label = Some(known.label.clone());
                out.name = Some(event.name.clone());
                out.args = Some(args);
                out
            }
            Err(err) => {
                let mut out = ClassifiedEvent::bare(index, entry.emitter, EventCategory::Unparseable);
                out.emitter_label = Some(known.label.clone());
                out.name = Some(event.name.clone());
                out.decode_error = Some(err.to_string());
                out.topics = Some(entry.topics.clone());
                out.data = Some(entry.data.clone());
                out
            }
        }
    }
}

/// Canonical display form for a decoded token. `Display` on the ABI
/// token type leans on bare lowercase hex, which reads ambiguously in
/// structured output; we render addresses with their `0x` prefix and
/// integers in decimal instead.
fn render_token(token: &Token) -> String {
    match token {
        Token::Address(addr) => format!("{addr:#x}"),
        Token::Uint(value) | Token::Int(value) => value.to_string(),
        Token::Bool(value) => value.to_string(),
        Token::String(value) => value.clone(),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::Array(inner) | Token::FixedArray(inner) => {
            let parts: Vec<String> = inner.iter().map(render_token).collect();
            format!("[{}]", parts.join(", "))
        }
        Token::Tuple(inner) => {
            let parts: Vec<String> = inner.iter().map(render_token).collect();
            format!("({})", parts.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{topic_for_address, topic_for_uint};
    use ethers::abi::{EventParam, ParamType};
    use ethers::types::U256;

    fn transfer_event() -> Event {
        Event {
            name: "Transfer".to_string(),
            inputs: vec![
                EventParam {
                    name: "from".to_string(),
                    kind: ParamType::Address,
                    indexed: true,
                },
                EventParam {
                    name: "to".to_string(),
                    kind: ParamType::Address,
                    indexed: true,
                },
                EventParam {
                    name: "tokenId".to_string(),
                    kind: ParamType::Uint(256),
                    indexed: true,
                },
            ],
            anonymous: false,
        }
    }

    fn ping_event() -> Event {
        // One non-indexed field, so the payload lives in `data`.
        Event {
            name: "Ping".to_string(),
            inputs: vec![EventParam {
                name: "x".to_string(),
                kind: ParamType::Uint(256),
                indexed: false,
            }],
            anonymous: false,
        }
    }

    fn nft_address() -> Address {
        Address::from_low_u64_be(0xAAA)
    }

    fn classifier() -> ReceiptClassifier {
        ReceiptClassifier::new(vec![
            KnownEmitter::new("GaslessNFT", nft_address())
                .with_events([transfer_event(), ping_event()]),
            // Trusted but schemaless.
            KnownEmitter::new("Treasury", Address::from_low_u64_be(0xBBB)),
        ])
    }

    fn transfer_entry(from: Address, to: Address, token_id: u64) -> LogEntry {
        LogEntry {
            emitter: nft_address(),
            topics: vec![
                transfer_event().signature(),
                topic_for_address(from),
                topic_for_address(to),
                topic_for_uint(U256::from(token_id)),
            ],
            data: Bytes::default(),
        }
    }

    #[test]
    fn decodes_known_event_with_canonical_args() {
        let recipient = Address::from_low_u64_be(0xCAFE);
        let events = classifier().classify(&[transfer_entry(Address::zero(), recipient, 7)]);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.category, EventCategory::KnownEvent);
        assert_eq!(event.emitter_label.as_deref(), Some("GaslessNFT"));
        assert_eq!(event.name.as_deref(), Some("Transfer"));

        let args = event.args.as_ref().unwrap();
        assert_eq!(args["from"], format!("{:#x}", Address::zero()));
        assert_eq!(args["to"], format!("{:#x}", recipient));
        assert_eq!(args["tokenId"], "7");
        // Raw bytes only travel with unparseable entries.
        assert!(event.topics.is_none());
        assert!(event.data.is_none());
    }

    #[test]
    fn unknown_emitter_is_flagged_not_decoded() {
        let entry = LogEntry {
            emitter: Address::from_low_u64_be(0xDEAD),
            topics: vec![transfer_event().signature()],
            data: Bytes::default(),
        };
        let events = classifier().classify(&[entry]);
        assert_eq!(events[0].category, EventCategory::FromUnknownEmitter);
        assert!(events[0].emitter_label.is_none());
        assert!(events[0].args.is_none());
    }

    #[test]
    fn unknown_topic_from_known_emitter_keeps_the_label() {
        let entry = LogEntry {
            emitter: nft_address(),
            topics: vec![H256::from(crate::crypto::keccak256(b"Mystery(uint256)"))],
            data: Bytes::default(),
        };
        let events = classifier().classify(&[entry]);
        assert_eq!(events[0].category, EventCategory::UnknownFromKnownEmitter);
        assert_eq!(events[0].emitter_label.as_deref(), Some("GaslessNFT"));
    }

    #[test]
    fn topicless_entry_from_known_emitter_is_unknown_not_an_error() {
        let entry = LogEntry {
            emitter: nft_address(),
            topics: vec![],
            data: Bytes::from(vec![0x01, 0x02, 0x03]),
        };
        let events = classifier().classify(&[entry]);
        assert_eq!(events[0].category, EventCategory::UnknownFromKnownEmitter);
    }

    #[test]
    fn schemaless_emitter_classifies_everything_as_unknown() {
        let entry = LogEntry {
            emitter: Address::from_low_u64_be(0xBBB),
            topics: vec![transfer_event().signature()],
            data: Bytes::default(),
        };
        let events = classifier().classify(&[entry]);
        assert_eq!(events[0].category, EventCategory::UnknownFromKnownEmitter);
        assert_eq!(events[0].emitter_label.as_deref(), Some("Treasury"));
    }

    #[test]
    fn matched_schema_with_wrong_topic_count_is_unparseable() {
        // Transfer's topic 0 but none of its three indexed topics.
        let entry = LogEntry {
            emitter: nft_address(),
            topics: vec![transfer_event().signature()],
            data: Bytes::default(),
        };
        let events = classifier().classify(&[entry]);

        let event = &events[0];
        assert_eq!(event.category, EventCategory::Unparseable);
        assert_eq!(event.name.as_deref(), Some("Transfer"));
        assert!(event.decode_error.is_some());
        // Verbatim evidence preserved.
        assert_eq!(event.topics.as_ref().unwrap().len(), 1);
        assert_eq!(event.data.as_ref().unwrap(), &Bytes::default());
    }

    #[test]
    fn truncated_data_is_unparseable() {
        let entry = LogEntry {
            emitter: nft_address(),
            topics: vec![ping_event().signature()],
            data: Bytes::from(vec![0x01, 0x02, 0x03]), // uint256 needs 32
        };
        let events = classifier().classify(&[entry]);
        assert_eq!(events[0].category, EventCategory::Unparseable);
        assert_eq!(events[0].data.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn classification_is_total_and_order_preserving() {
        let entries = vec![
            transfer_entry(Address::zero(), Address::from_low_u64_be(1), 0),
            LogEntry {
                emitter: Address::from_low_u64_be(0xDEAD),
                topics: vec![],
                data: Bytes::default(),
            },
            LogEntry {
                emitter: nft_address(),
                topics: vec![transfer_event().signature()],
                data: Bytes::from(vec![0xFF; 5]),
            },
            LogEntry {
                emitter: nft_address(),
                topics: vec![H256::zero()],
                data: Bytes::default(),
            },
        ];

        let events = classifier().classify(&entries);
        assert_eq!(events.len(), entries.len());
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.index, i);
        }
        assert_eq!(events[0].category, EventCategory::KnownEvent);
        assert_eq!(events[1].category, EventCategory::FromUnknownEmitter);
        assert_eq!(events[2].category, EventCategory::Unparseable);
        assert_eq!(events[3].category, EventCategory::UnknownFromKnownEmitter);
    }

    #[test]
    fn empty_input_classifies_to_empty_output() {
        assert!(classifier().classify(&[]).is_empty());
    }

    #[test]
    fn test_classified_event_serde_roundtrip() {
        let events = classifier().classify(&[transfer_entry(
            Address::zero(),
            Address::from_low_u64_be(0xA),
            3,
        )]);
        let json = serde_json::to_string(&events[0]).unwrap();
        let recovered: ClassifiedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(events[0], recovered);
        // Unpopulated fields stay out of the wire form entirely.
        assert!(!json.contains("decode_error"));
    }

    #[test]
    fn category_display_matches_wire_form() {
        assert_eq!(EventCategory::KnownEvent.to_string(), "known_event");
        assert_eq!(
            EventCategory::UnknownFromKnownEmitter.to_string(),
            "unknown_from_known_emitter"
        );
        assert_eq!(
            EventCategory::FromUnknownEmitter.to_string(),
            "from_unknown_emitter"
        );
        assert_eq!(EventCategory::Unparseable.to_string(), "unparseable");
    }

    #[test]
    fn render_token_canonical_forms() {
        assert_eq!(
            render_token(&Token::Address(Address::from_low_u64_be(0xAB))),
            format!("{:#x}", Address::from_low_u64_be(0xAB))
        );
        assert_eq!(render_token(&Token::Uint(U256::from(1234u64))), "1234");
        assert_eq!(render_token(&Token::Bool(true)), "true");
        assert_eq!(
            render_token(&Token::String("hello".to_string())),
            "hello"
        );
        assert_eq!(
            render_token(&Token::Bytes(vec![0xDE, 0xAD])),
            "0xdead"
        );
        assert_eq!(
            render_token(&Token::Array(vec![
                Token::Uint(U256::one()),
                Token::Uint(U256::from(2u64)),
            ])),
            "[1, 2]"
        );
    }
}

//! Agent action pipeline
//!
//! - `context`: game state serialized from one agent's point of view
//! - `conversation`: bounded per-agent window with stage/commit/discard
//! - `transport`: one round trip to a text-completion service
//! - `action`: reply decoding and normalization

pub mod action;
pub mod context;
pub mod conversation;
pub mod transport;

pub use action::{Action, ActionKind, parse_action};
pub use context::AgentContext;
pub use conversation::{ConversationWindow, Role, Turn};
pub use transport::{DecisionRequest, HttpTransport, Transport, WireShape};

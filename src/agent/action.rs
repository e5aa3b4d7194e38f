//! Agent reply decoding and action normalization
//!
//! Replies are untrusted text. Decoding accepts either a bare JSON object or
//! the first `{ ... }` span inside surrounding prose; anything else is an
//! invalid response. Every field of a decoded object is then clamped or
//! defaulted, so a decoded reply always yields a usable [`Action`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{MAX_INTENT_CHARS, MAX_MOVE, MAX_TURN_DEGREES};

/// Action kinds an agent may request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Turn,
    #[default]
    Move,
    Fire,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Turn => "turn",
            ActionKind::Move => "move",
            ActionKind::Fire => "fire",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "turn" => Some(ActionKind::Turn),
            "move" => Some(ActionKind::Move),
            "fire" => Some(ActionKind::Fire),
            _ => None,
        }
    }
}

/// A normalized action, safe to apply to a ship
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action: ActionKind,
    /// Degrees, [-180, 180]
    pub turn: f32,
    /// Units, [0, 120]
    #[serde(rename = "move")]
    pub moves: f32,
    /// At most 120 characters
    pub intent: String,
}

impl Action {
    /// Turn delta in radians
    pub fn turn_radians(&self) -> f32 {
        self.turn.to_radians()
    }
}

/// Decode a reply into its JSON object.
///
/// Returns `None` when neither the whole text nor its first brace-delimited
/// span is a JSON object.
pub fn decode_reply(text: &str) -> Option<Map<String, Value>> {
    if text.trim().is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Read a loosely typed number: JSON numbers, numeric strings, booleans
fn number_field(map: &Map<String, Value>, key: &str) -> f32 {
    let value = match map.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if value.is_finite() { value as f32 } else { 0.0 }
}

/// Clamp and default every field of a decoded reply
pub fn normalize(map: &Map<String, Value>) -> Action {
    let action = map
        .get("action")
        .and_then(Value::as_str)
        .and_then(ActionKind::parse)
        .unwrap_or_default();
    let turn = number_field(map, "turn").clamp(-MAX_TURN_DEGREES, MAX_TURN_DEGREES);
    let moves = number_field(map, "move").clamp(0.0, MAX_MOVE);
    let intent = map
        .get("intent")
        .and_then(Value::as_str)
        .map(|s| s.chars().take(MAX_INTENT_CHARS).collect())
        .unwrap_or_default();
    Action {
        action,
        turn,
        moves,
        intent,
    }
}

/// Decode and normalize in one step
pub fn parse_action(text: &str) -> Option<Action> {
    decode_reply(text).map(|map| normalize(&map))
}

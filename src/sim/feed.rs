//! Game events and the bounded recent-event feed
//!
//! The feed is what agents see as `lastEvents`; observers receive every
//! event (including failures that never enter the feed).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::state::AgentId;
use crate::consts::{EVENT_CONTEXT_COUNT, EVENT_FEED_CAPACITY};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Turn,
    Move,
    Fire,
    HitBeacon,
    HitOpponent,
    GotHit,
    Crashed,
    InvalidResponse,
    TransportError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Turn => "turn",
            EventKind::Move => "move",
            EventKind::Fire => "fire",
            EventKind::HitBeacon => "hit_beacon",
            EventKind::HitOpponent => "hit_opponent",
            EventKind::GotHit => "got_hit",
            EventKind::Crashed => "crashed",
            EventKind::InvalidResponse => "invalid_response",
            EventKind::TransportError => "transport_error",
        }
    }
}

/// Immutable event record.
///
/// Field names match what agents read in `lastEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "model")]
    pub agent: AgentId,
    #[serde(rename = "action")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(rename = "score", default, skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f32>,
}

impl GameEvent {
    pub fn new(agent: AgentId, kind: EventKind) -> Self {
        Self {
            agent,
            kind,
            intent: None,
            score_delta: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_score(mut self, delta: f32) -> Self {
        self.score_delta = Some(delta);
        self
    }
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.agent.label(), self.kind.as_str())?;
        if let Some(delta) = self.score_delta {
            write!(f, " ({delta:+} pts)")?;
        }
        if let Some(intent) = self.intent.as_deref().filter(|i| !i.is_empty()) {
            write!(f, " | {intent}")?;
        }
        Ok(())
    }
}

/// Most-recent-first ring of game events
#[derive(Debug, Clone, Default)]
pub struct EventFeed {
    entries: VecDeque<GameEvent>,
}

impl EventFeed {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_FEED_CAPACITY),
        }
    }

    /// Record an event as the newest entry, dropping the oldest past capacity
    pub fn push(&mut self, event: GameEvent) {
        self.entries.push_front(event);
        self.entries.truncate(EVENT_FEED_CAPACITY);
    }

    /// The events shown in an agent's next context
    pub fn recent(&self) -> Vec<GameEvent> {
        self.entries.iter().take(EVENT_CONTEXT_COUNT).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_is_bounded_and_newest_first() {
        let mut feed = EventFeed::new();
        for i in 0..20 {
            feed.push(GameEvent::new(AgentId::A, EventKind::Move).with_intent(format!("step {i}")));
        }
        assert_eq!(feed.len(), EVENT_FEED_CAPACITY);
        assert_eq!(feed.iter().next().unwrap().intent.as_deref(), Some("step 19"));
        assert_eq!(feed.iter().last().unwrap().intent.as_deref(), Some("step 8"));

        let recent = feed.recent();
        assert_eq!(recent.len(), EVENT_CONTEXT_COUNT);
        assert_eq!(recent[3].intent.as_deref(), Some("step 16"));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = GameEvent::new(AgentId::B, EventKind::HitBeacon).with_score(5.0);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"model": 1, "action": "hit_beacon", "score": 5.0}));

        let event = GameEvent::new(AgentId::A, EventKind::Fire).with_intent("lead shot");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"model": 0, "action": "fire", "intent": "lead shot"}));
    }

    #[test]
    fn test_display() {
        let event = GameEvent::new(AgentId::A, EventKind::HitOpponent).with_score(-5.0);
        assert_eq!(event.to_string(), "Model A hit_opponent (-5 pts)");
    }
}

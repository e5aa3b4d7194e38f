//! Per-agent conversation window
//!
//! A window is a preamble plus a short tail of committed request/answer
//! turns. Each decision stages one request turn; the round trip then either
//! commits it together with the answer or discards it, restoring the window
//! exactly as it was before staging.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::CONVERSATION_TURNS;

/// Rules and reply schema sent as the first turn of every window
pub const PREAMBLE: &str = r#"You are an AI pilot in a realtime space shooter. Respond with JSON only.

Rules:
- Hit beacons: +5pts. Hit opponent: -5pts (opponent loses points!). Collide with beacon: GAME OVER.
- Actions: turn (degrees), move (units), fire (projectile).

Coordinates:
- (0,0) = top-left. x right, y down.
- self.angleDegrees: Shows where YOUR nozzle/gun is aimed. 0°=right, 90°=down, 180°=left, -90°=up.
- turn is DELTA added to current angle.

Context includes lastEvents (recent 4 events):
- "hit_beacon": You scored +5pts
- "hit_opponent": You hit enemy, YOU lose -5pts
- "got_hit": Enemy hit YOU (they lose -5pts)
- Strategy: Getting hit deliberately hurts opponent's score!

CRITICAL - Lead your shots:
- Projectiles travel at board.projectileSpeed units/sec.
- Calculate time: distance / projectileSpeed.
- Aim where target WILL BE, not where it IS.
- Use opponent.lastAction to predict movement.

JSON response (no text):
{
  "action": "turn|move|fire",
  "turn": -180..180,
  "move": 0..120,
  "intent": "brief note"
}"#;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Preamble
    System,
    /// Game-state request
    User,
    /// Agent answer
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    request: Turn,
    /// Preamble staged with the first request, kept only on commit
    preamble: Option<Turn>,
}

#[derive(Debug, Clone)]
pub struct ConversationWindow {
    preamble: Option<Turn>,
    turns: VecDeque<Turn>,
    pending: Option<Pending>,
    max_turns: usize,
}

impl Default for ConversationWindow {
    fn default() -> Self {
        Self::new(CONVERSATION_TURNS)
    }
}

impl ConversationWindow {
    /// Empty window keeping at most `max_turns` turns after the preamble
    pub fn new(max_turns: usize) -> Self {
        Self {
            preamble: None,
            turns: VecDeque::with_capacity(max_turns + 1),
            pending: None,
            max_turns: max_turns.max(1),
        }
    }

    /// Stage a request turn and return the turns to send: the preamble, the
    /// most recent committed turns and the request, `max_turns` at most after
    /// the preamble.
    ///
    /// Nothing staged is part of the committed history until [`commit`].
    /// A request still staged from an earlier call is discarded first.
    ///
    /// [`commit`]: ConversationWindow::commit
    pub fn stage(&mut self, request: impl Into<String>) -> Vec<Turn> {
        self.discard();
        let staged_preamble = match self.preamble {
            Some(_) => None,
            None => Some(Turn::new(Role::System, PREAMBLE)),
        };
        let request = Turn::new(Role::User, request);

        let keep = self.max_turns - 1;
        let skip = self.turns.len().saturating_sub(keep);
        let outgoing = self
            .preamble
            .iter()
            .chain(staged_preamble.iter())
            .chain(self.turns.iter().skip(skip))
            .chain(std::iter::once(&request))
            .cloned()
            .collect();

        self.pending = Some(Pending {
            request,
            preamble: staged_preamble,
        });
        outgoing
    }

    /// Keep the staged request and append the answer
    pub fn commit(&mut self, answer: impl Into<String>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if let Some(preamble) = pending.preamble {
            self.preamble = Some(preamble);
        }
        self.turns.push_back(pending.request);
        self.turns.push_back(Turn::new(Role::Assistant, answer));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Drop everything staged, leaving the committed history untouched
    pub fn discard(&mut self) {
        self.pending = None;
    }

    /// Committed turns including the preamble
    pub fn len(&self) -> usize {
        self.preamble.iter().count() + self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed history, preamble first
    pub fn history(&self) -> Vec<Turn> {
        self.preamble.iter().chain(self.turns.iter()).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.preamble = None;
        self.turns.clear();
        self.pending = None;
    }
}

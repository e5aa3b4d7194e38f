//! Game state as an agent sees it
//!
//! Plain data serialized to compact JSON. Coordinates are rounded to one
//! decimal, time to two.

use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use crate::consts::{BEACON_HIT_RADIUS, PROJECTILE_SPEED, SHIP_HIT_RADIUS};
use crate::round_to;
use crate::sim::{AgentId, GameEvent, SimulationState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub width: f32,
    pub height: f32,
    pub projectile_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfView {
    pub x: f32,
    pub y: f32,
    pub angle_degrees: f32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentView {
    pub x: f32,
    pub y: f32,
    pub score: f32,
    pub hit_radius: f32,
    /// Kind of the opponent's last applied action, for prediction
    pub last_action: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconTarget {
    pub x: f32,
    pub y: f32,
    pub hit_radius: f32,
}

/// Snapshot sent as one request turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub time: f32,
    pub board: BoardView,
    #[serde(rename = "self")]
    pub own: SelfView,
    pub opponent: OpponentView,
    pub beacons: Vec<BeaconTarget>,
    pub last_events: Vec<GameEvent>,
}

impl AgentContext {
    /// Capture the state for `agent`
    pub fn build(state: &SimulationState, agent: AgentId) -> Self {
        let own = state.ship(agent);
        let opponent = state.ship(agent.opponent());
        Self {
            time: round_to(state.time, 2),
            board: BoardView {
                width: round_to(state.width, 1),
                height: round_to(state.height, 1),
                projectile_speed: PROJECTILE_SPEED,
            },
            own: SelfView {
                x: round_to(own.pos.x, 1),
                y: round_to(own.pos.y, 1),
                angle_degrees: round_to(own.angle_degrees(), 1),
                score: round_to(own.score, 1),
            },
            opponent: OpponentView {
                x: round_to(opponent.pos.x, 1),
                y: round_to(opponent.pos.y, 1),
                score: round_to(opponent.score, 1),
                hit_radius: SHIP_HIT_RADIUS,
                last_action: opponent.last_action.action,
            },
            beacons: state
                .beacons
                .iter()
                .map(|b| BeaconTarget {
                    x: round_to(b.pos.x, 1),
                    y: round_to(b.pos.y, 1),
                    hit_radius: BEACON_HIT_RADIUS,
                })
                .collect(),
            last_events: state.feed.recent(),
        }
    }

    /// Compact JSON for the request turn
    pub fn to_prompt(&self) -> String {
        // Plain data with string keys; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

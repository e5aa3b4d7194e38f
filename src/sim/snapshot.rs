//! Read-only view of the arena for renderers and HUDs

use glam::Vec2;
use serde::Serialize;

use super::feed::GameEvent;
use super::state::{AgentId, MatchStats, SimulationState};

#[derive(Debug, Clone, Serialize)]
pub struct ShipView {
    pub id: AgentId,
    pub pos: Vec2,
    pub angle: f32,
    /// Rounded for display
    pub score: i32,
    pub intent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BeaconView {
    pub pos: Vec2,
    pub rotation: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BurstView {
    pub pos: Vec2,
    /// 1.0 when spawned, falling to 0.0
    pub progress: f32,
    pub intensity: f32,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub width: f32,
    pub height: f32,
    pub remaining_time: f32,
    pub ships: Vec<ShipView>,
    pub beacons: Vec<BeaconView>,
    pub projectiles: Vec<Vec2>,
    pub bursts: Vec<BurstView>,
    pub stats: MatchStats,
    /// Event log, newest first
    pub feed: Vec<GameEvent>,
}

impl RenderSnapshot {
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            width: state.width,
            height: state.height,
            remaining_time: state.remaining_time(),
            ships: state
                .ships
                .iter()
                .map(|s| ShipView {
                    id: s.id,
                    pos: s.pos,
                    angle: s.angle,
                    score: s.score.round() as i32,
                    intent: s.intent.clone(),
                })
                .collect(),
            beacons: state
                .beacons
                .iter()
                .map(|b| BeaconView {
                    pos: b.pos,
                    rotation: b.rotation,
                })
                .collect(),
            projectiles: state.projectiles.iter().map(|p| p.pos).collect(),
            bursts: state
                .bursts
                .iter()
                .map(|b| BurstView {
                    pos: b.pos,
                    progress: b.life / b.max_life.max(f32::EPSILON),
                    intensity: b.intensity.clamp(0.1, 1.0),
                })
                .collect(),
            stats: state.stats,
            feed: state.feed.iter().cloned().collect(),
        }
    }

    /// Remaining time as `m:ss`
    pub fn clock(&self) -> String {
        let secs = self.remaining_time.max(0.0) as u32;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

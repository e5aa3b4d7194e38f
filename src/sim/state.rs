//! Entities and the simulation aggregate
//!
//! Everything a match mutates lives in [`SimulationState`]. A reset replaces
//! the whole value, so no entity outlives it.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::feed::EventFeed;
use crate::agent::action::Action;
use crate::consts::*;
use crate::facing;

/// One of the two pilots. Serialized as its numeric id (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AgentId {
    A,
    B,
}

impl AgentId {
    pub const BOTH: [AgentId; 2] = [AgentId::A, AgentId::B];

    pub fn index(self) -> usize {
        match self {
            AgentId::A => 0,
            AgentId::B => 1,
        }
    }

    pub fn opponent(self) -> AgentId {
        match self {
            AgentId::A => AgentId::B,
            AgentId::B => AgentId::A,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentId::A => "Model A",
            AgentId::B => "Model B",
        }
    }
}

impl From<AgentId> for u8 {
    fn from(id: AgentId) -> u8 {
        id.index() as u8
    }
}

impl TryFrom<u8> for AgentId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AgentId::A),
            1 => Ok(AgentId::B),
            other => Err(format!("agent id must be 0 or 1, got {other}")),
        }
    }
}

/// A ship piloted by one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: AgentId,
    pub pos: Vec2,
    /// Facing angle (radians, 0 = +x, y down)
    pub angle: f32,
    pub score: f32,
    /// Last normalized action applied to this ship
    pub last_action: Action,
    /// Free-text intent reported by the agent
    pub intent: String,
    /// Velocity in units per nominal 60 Hz frame (eased movement)
    pub vel: Vec2,
    /// Continuous speed along the facing in units per second (cruise movement)
    pub cruise: f32,
}

impl Ship {
    /// Create ship `id` at its seeded starting corner
    pub fn new(id: AgentId, width: f32, height: f32) -> Self {
        let (pos, angle) = match id {
            AgentId::A => (Vec2::new(width * 0.25, height * 0.35), 0.0),
            AgentId::B => (Vec2::new(width * 0.75, height * 0.65), std::f32::consts::PI),
        };
        Self {
            id,
            pos,
            angle,
            score: 0.0,
            last_action: Action::default(),
            intent: String::new(),
            vel: Vec2::ZERO,
            cruise: 0.0,
        }
    }

    /// Facing angle in degrees
    pub fn angle_degrees(&self) -> f32 {
        self.angle.to_degrees()
    }

    /// Clamp position into the padded board. A board narrower than both
    /// paddings pins the ship to the padding line.
    pub fn clamp_to_board(&mut self, width: f32, height: f32) {
        self.pos.x = self.pos.x.clamp(SHIP_PADDING, (width - SHIP_PADDING).max(SHIP_PADDING));
        self.pos.y = self.pos.y.clamp(SHIP_PADDING, (height - SHIP_PADDING).max(SHIP_PADDING));
    }
}

/// A rotating target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beacon {
    pub id: u32,
    pub pos: Vec2,
    /// Current rotation (radians, [0, 2π))
    pub rotation: f32,
    /// Radians per second; magnitude never below `BEACON_SPIN_MIN`
    pub rotation_speed: f32,
}

impl Beacon {
    /// Advance rotation by one step
    pub fn rotate(&mut self, dt: f32) {
        self.rotation = crate::wrap_angle(self.rotation + self.rotation_speed * dt);
    }
}

/// A shot in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Units per second
    pub vel: Vec2,
    pub owner: AgentId,
    /// Seconds remaining
    pub life: f32,
}

/// Cosmetic impact flash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Burst {
    pub pos: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub intensity: f32,
}

impl Burst {
    pub fn impact(pos: Vec2) -> Self {
        Self {
            pos,
            life: 0.6,
            max_life: 0.6,
            intensity: 0.8,
        }
    }

    pub fn beacon(pos: Vec2) -> Self {
        Self {
            pos,
            life: 0.8,
            max_life: 0.8,
            intensity: 1.0,
        }
    }
}

/// Running counters for the HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub shots: u32,
    pub beacon_hits: u32,
    pub ship_hits: u32,
}

/// Complete simulation state for one match
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub seed: u64,
    /// Simulated seconds since the match went live
    pub time: f32,
    pub width: f32,
    pub height: f32,
    /// Index by `AgentId::index`
    pub ships: [Ship; 2],
    /// Live beacons in creation order
    pub beacons: Vec<Beacon>,
    pub projectiles: Vec<Projectile>,
    pub bursts: Vec<Burst>,
    pub stats: MatchStats,
    /// Recent events, newest first
    pub feed: EventFeed,
    rng: Pcg32,
    next_id: u32,
}

impl SimulationState {
    /// Fresh match on a `width` x `height` board
    pub fn new(seed: u64, width: f32, height: f32) -> Self {
        let mut state = Self {
            seed,
            time: 0.0,
            width,
            height,
            ships: [
                Ship::new(AgentId::A, width, height),
                Ship::new(AgentId::B, width, height),
            ],
            beacons: Vec::with_capacity(BEACON_COUNT),
            projectiles: Vec::new(),
            bursts: Vec::new(),
            stats: MatchStats::default(),
            feed: EventFeed::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        state.create_beacons();
        state
    }

    pub fn ship(&self, id: AgentId) -> &Ship {
        &self.ships[id.index()]
    }

    pub fn ship_mut(&mut self, id: AgentId) -> &mut Ship {
        &mut self.ships[id.index()]
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn random_spin(&mut self) -> f32 {
        let speed = self.rng.random_range(BEACON_SPIN_MIN..BEACON_SPIN_MAX);
        if self.rng.random_bool(0.5) { speed } else { -speed }
    }

    fn push_beacon(&mut self, pos: Vec2) {
        let id = self.next_entity_id();
        let rotation = self.rng.random_range(0.0..std::f32::consts::TAU);
        let rotation_speed = self.random_spin();
        self.beacons.push(Beacon {
            id,
            pos,
            rotation,
            rotation_speed,
        });
    }

    /// Place the opening beacon layout
    fn create_beacons(&mut self) {
        self.beacons.clear();
        let (w, h) = (self.width, self.height);
        for pos in [
            Vec2::new(w * 0.33, h * 0.3),
            Vec2::new(w * 0.54, h * 0.52),
            Vec2::new(w * 0.72, h * 0.32),
        ] {
            self.push_beacon(pos);
        }
    }

    fn random_beacon_position(&mut self) -> Vec2 {
        let x = self
            .rng
            .random_range(BEACON_PADDING..(self.width - BEACON_PADDING).max(BEACON_PADDING + 1.0));
        let y = self
            .rng
            .random_range(BEACON_PADDING..(self.height - BEACON_PADDING).max(BEACON_PADDING + 1.0));
        Vec2::new(x, y)
    }

    /// Spawn one beacon away from ships and other beacons.
    ///
    /// Tries `BEACON_SPAWN_TRIES` candidates; if none keeps its distance,
    /// accepts an unconstrained position instead of stalling.
    pub fn spawn_beacon(&mut self) {
        let mut candidate = None;
        for _ in 0..BEACON_SPAWN_TRIES {
            let pos = self.random_beacon_position();
            let near_ship = self
                .ships
                .iter()
                .any(|s| s.pos.distance(pos) < BEACON_MIN_SHIP_DISTANCE);
            let near_beacon = self
                .beacons
                .iter()
                .any(|b| b.pos.distance(pos) < BEACON_MIN_BEACON_DISTANCE);
            if !near_ship && !near_beacon {
                candidate = Some(pos);
                break;
            }
        }
        let pos = match candidate {
            Some(pos) => pos,
            None => {
                log::debug!("Beacon spawn exhausted {BEACON_SPAWN_TRIES} tries, placing anywhere");
                self.random_beacon_position()
            }
        };
        self.push_beacon(pos);
    }

    /// Launch a projectile from `owner` along its facing
    pub fn fire(&mut self, owner: AgentId) {
        let ship = self.ship(owner);
        let projectile = Projectile {
            pos: ship.pos,
            vel: facing(ship.angle) * PROJECTILE_SPEED,
            owner,
            life: PROJECTILE_LIFE,
        };
        self.projectiles.push(projectile);
        self.stats.shots += 1;
    }

    /// Seconds left before the time limit
    pub fn remaining_time(&self) -> f32 {
        (GAME_TIME_LIMIT - self.time).max(0.0)
    }
}

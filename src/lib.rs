//! Beacon Duel - two remote agents pilot ships in a shared arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, movement, collisions, scoring)
//! - `phase`: Match state machine (Idle / Live / Paused / Error / GameOver)
//! - `agent`: Agent action pipeline (context, conversation window, transport)
//! - `arena`: One match: simulation + phase + agent bookkeeping
//! - `runtime`: Async driver (fixed-step physics loop, per-agent actors)
//! - `config`: Endpoint configuration store

pub mod agent;
pub mod arena;
pub mod clock;
pub mod config;
pub mod error;
pub mod phase;
pub mod runtime;
pub mod sim;

pub use arena::Arena;
pub use config::{AgentEndpoint, ArenaConfig, MatchSettings, ProxyConfig};
pub use error::{ArenaError, ConfigError, TransportError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Nominal frame rate that velocities are expressed against
    pub const NOMINAL_FPS: f32 = 60.0;

    /// Agent decision requests per second (per agent)
    pub const ACTION_RATE: f32 = 12.0;
    /// Jitter range added to the polling interval (ms)
    pub const ACTION_JITTER_MS: (f32, f32) = (-60.0, 80.0);

    /// Default board dimensions
    pub const BOARD_WIDTH: f32 = 800.0;
    pub const BOARD_HEIGHT: f32 = 500.0;
    /// Ships are kept this far from every edge
    pub const SHIP_PADDING: f32 = 40.0;
    /// Smallest accepted board side
    pub const MIN_BOARD_SIDE: f32 = 200.0;
    /// Beacons spawn at least this far from every edge
    pub const BEACON_PADDING: f32 = 60.0;
    /// Projectiles survive this far outside the board
    pub const PROJECTILE_MARGIN: f32 = 20.0;

    /// Collision radii
    pub const SHIP_HIT_RADIUS: f32 = 32.0;
    pub const BEACON_HIT_RADIUS: f32 = 22.0;

    /// Projectile defaults
    pub const PROJECTILE_SPEED: f32 = 260.0;
    pub const PROJECTILE_LIFE: f32 = 5.0;

    /// Live beacons at any time
    pub const BEACON_COUNT: usize = 3;
    /// Rejection-sampling budget when spawning a beacon
    pub const BEACON_SPAWN_TRIES: u32 = 30;
    pub const BEACON_MIN_SHIP_DISTANCE: f32 = 120.0;
    pub const BEACON_MIN_BEACON_DISTANCE: f32 = 90.0;
    /// Beacon rotation speed magnitude range (rad/s)
    pub const BEACON_SPIN_MIN: f32 = 0.15;
    pub const BEACON_SPIN_MAX: f32 = 0.5;

    /// Points gained for a beacon hit, lost for hitting the opponent
    pub const HIT_SCORE: f32 = 5.0;

    /// Match length (seconds)
    pub const GAME_TIME_LIMIT: f32 = 300.0;

    /// Intent text is truncated to this many characters
    pub const MAX_INTENT_CHARS: usize = 120;
    /// Action clamps
    pub const MAX_TURN_DEGREES: f32 = 180.0;
    pub const MAX_MOVE: f32 = 120.0;

    /// Recent events retained / shown to agents
    pub const EVENT_FEED_CAPACITY: usize = 12;
    pub const EVENT_CONTEXT_COUNT: usize = 4;

    /// Conversation turns kept after the preamble
    pub const CONVERSATION_TURNS: usize = 6;
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector for a facing angle (radians, 0 = +x, y grows downward)
#[inline]
pub fn facing(angle: f32) -> glam::Vec2 {
    glam::Vec2::new(angle.cos(), angle.sin())
}

/// Round to a fixed number of decimal places (for agent-facing numbers)
#[inline]
pub fn round_to(value: f32, places: i32) -> f32 {
    let scale = 10f32.powi(places);
    (value * scale).round() / scale
}

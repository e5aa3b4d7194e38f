//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (ships by id, beacons by creation)
//! - No transport, rendering or timer dependencies

pub mod collision;
pub mod feed;
pub mod movement;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use collision::{ProjectileHit, projectile_collision, ship_beacon_collision};
pub use feed::{EventFeed, EventKind, GameEvent};
pub use movement::{CruiseMovement, EasedMovement, MovementKind, MovementModel};
pub use snapshot::RenderSnapshot;
pub use state::{AgentId, Beacon, Burst, MatchStats, Projectile, Ship, SimulationState};
pub use tick::{EndReason, MatchOutcome, TickReport, advance};

//! Ship movement models
//!
//! Two variants exist: velocity that eases out after each move, and a
//! continuous cruise speed that persists until the next turn. One is chosen
//! per match.

use serde::{Deserialize, Serialize};

use super::state::Ship;
use crate::agent::action::{Action, ActionKind};
use crate::consts::NOMINAL_FPS;
use crate::facing;

/// How actions translate into ship motion
pub trait MovementModel: Send + Sync + std::fmt::Debug {
    /// Apply the motion part of a normalized action (firing is handled by
    /// the caller)
    fn apply_action(&self, ship: &mut Ship, action: &Action);

    /// Advance the ship by one fixed step (position only; clamping is done
    /// by the tick)
    fn integrate(&self, ship: &mut Ship, dt: f32);
}

/// Selectable movement variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    #[default]
    Eased,
    Cruise,
}

impl MovementKind {
    pub fn model(self) -> Box<dyn MovementModel> {
        match self {
            MovementKind::Eased => Box::new(EasedMovement::default()),
            MovementKind::Cruise => Box::new(CruiseMovement),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eased" | "ease" => Some(MovementKind::Eased),
            "cruise" | "continuous" => Some(MovementKind::Cruise),
            _ => None,
        }
    }
}

/// Velocity set by each move, decaying every tick (fast then slow)
#[derive(Debug, Clone, Copy)]
pub struct EasedMovement {
    /// Multiplier applied to velocity each tick
    pub decay: f32,
    /// Velocity components below this snap to zero
    pub epsilon: f32,
}

impl Default for EasedMovement {
    fn default() -> Self {
        Self {
            decay: 0.92,
            epsilon: 0.1,
        }
    }
}

impl MovementModel for EasedMovement {
    fn apply_action(&self, ship: &mut Ship, action: &Action) {
        match action.action {
            ActionKind::Turn => {
                ship.angle += action.turn_radians();
                ship.vel *= 0.3;
            }
            ActionKind::Move => {
                ship.angle += action.turn_radians();
                ship.vel = facing(ship.angle) * action.moves;
            }
            ActionKind::Fire => {
                // Recoil
                ship.vel *= 0.5;
            }
        }
    }

    fn integrate(&self, ship: &mut Ship, dt: f32) {
        ship.vel *= self.decay;
        if ship.vel.x.abs() < self.epsilon {
            ship.vel.x = 0.0;
        }
        if ship.vel.y.abs() < self.epsilon {
            ship.vel.y = 0.0;
        }
        // Velocity is per nominal frame regardless of dt
        ship.pos += ship.vel * dt * NOMINAL_FPS;
    }
}

/// Moves set a standing speed along the facing; turns stop the ship
#[derive(Debug, Clone, Copy, Default)]
pub struct CruiseMovement;

impl MovementModel for CruiseMovement {
    fn apply_action(&self, ship: &mut Ship, action: &Action) {
        match action.action {
            ActionKind::Turn => {
                ship.angle += action.turn_radians();
                ship.cruise = 0.0;
            }
            ActionKind::Move => {
                ship.angle += action.turn_radians();
                ship.cruise = action.moves;
            }
            ActionKind::Fire => ship.cruise *= 0.5,
        }
    }

    fn integrate(&self, ship: &mut Ship, dt: f32) {
        ship.pos += facing(ship.angle) * ship.cruise * dt;
    }
}

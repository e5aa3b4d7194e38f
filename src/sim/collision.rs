//! Collision detection
//!
//! Everything in the arena collides as a circle, so all tests reduce to a
//! center distance against a fixed radius.

use glam::Vec2;

use super::state::{AgentId, Beacon, Projectile, Ship};
use crate::consts::{BEACON_HIT_RADIUS, PROJECTILE_MARGIN, SHIP_HIT_RADIUS};

/// Result of testing one projectile against the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileHit {
    /// Struck the opposing ship
    Ship(AgentId),
    /// Struck the beacon at this index
    Beacon(usize),
    Miss,
}

/// Point strictly inside a circle
#[inline]
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) < radius * radius
}

/// Index of the first beacon the ship overlaps, if any
pub fn ship_beacon_collision(ship: &Ship, beacons: &[Beacon]) -> Option<usize> {
    beacons
        .iter()
        .position(|b| point_in_circle(ship.pos, b.pos, SHIP_HIT_RADIUS + BEACON_HIT_RADIUS))
}

/// True once a projectile has left the board by more than the margin
pub fn projectile_out_of_bounds(pos: Vec2, width: f32, height: f32) -> bool {
    pos.x < -PROJECTILE_MARGIN
        || pos.x > width + PROJECTILE_MARGIN
        || pos.y < -PROJECTILE_MARGIN
        || pos.y > height + PROJECTILE_MARGIN
}

/// Resolve what a projectile hit this tick.
///
/// Only the owner's opponent can be struck, and a ship hit takes precedence
/// over any beacon. Beacons are tested in creation order; the first wins.
pub fn projectile_collision(projectile: &Projectile, ships: &[Ship; 2], beacons: &[Beacon]) -> ProjectileHit {
    let target = projectile.owner.opponent();
    if point_in_circle(projectile.pos, ships[target.index()].pos, SHIP_HIT_RADIUS) {
        return ProjectileHit::Ship(target);
    }
    match beacons
        .iter()
        .position(|b| point_in_circle(projectile.pos, b.pos, BEACON_HIT_RADIUS))
    {
        Some(index) => ProjectileHit::Beacon(index),
        None => ProjectileHit::Miss,
    }
}

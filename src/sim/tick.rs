//! Fixed timestep simulation tick
//!
//! Advances every entity by exactly one step. The caller decides whether
//! the match is live; this module never looks at the match phase.

use serde::{Deserialize, Serialize};

use super::collision::{ProjectileHit, projectile_collision, projectile_out_of_bounds, ship_beacon_collision};
use super::feed::{EventKind, GameEvent};
use super::movement::MovementModel;
use super::state::{AgentId, Burst, SimulationState};
use crate::consts::{GAME_TIME_LIMIT, HIT_SCORE};

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EndReason {
    /// This agent flew into a beacon
    Collision(AgentId),
    TimeUp,
}

/// Final result of a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// `None` is a draw
    pub winner: Option<AgentId>,
    pub reason: EndReason,
    pub scores: [f32; 2],
}

impl MatchOutcome {
    pub fn describe(&self) -> String {
        let [a, b] = self.scores.map(f32::round);
        match (self.reason, self.winner) {
            (EndReason::Collision(who), _) => format!("{} collided with a beacon!", who.label()),
            (EndReason::TimeUp, Some(winner)) => {
                let score = if winner == AgentId::A { a } else { b };
                format!("Time's up! {} wins with {score} points!", winner.label())
            }
            (EndReason::TimeUp, None) => format!("Time's up! It's a tie at {a} points!"),
        }
    }
}

/// What one tick produced
#[derive(Debug, Default)]
pub struct TickReport {
    /// Events to publish to observers, oldest first
    pub events: Vec<GameEvent>,
    /// Set when this tick ended the match
    pub outcome: Option<MatchOutcome>,
}

fn record(state: &mut SimulationState, report: &mut TickReport, event: GameEvent) {
    state.feed.push(event.clone());
    report.events.push(event);
}

/// Advance the simulation by one fixed timestep
pub fn advance(state: &mut SimulationState, movement: &dyn MovementModel, dt: f32) -> TickReport {
    let mut report = TickReport::default();
    state.time += dt;

    // Ships
    let (width, height) = (state.width, state.height);
    for ship in &mut state.ships {
        movement.integrate(ship, dt);
        ship.clamp_to_board(width, height);
    }

    // Ship-beacon collision ends the match before anything else
    if let Some(crashed) = state
        .ships
        .iter()
        .find(|ship| ship_beacon_collision(ship, &state.beacons).is_some())
        .map(|ship| ship.id)
    {
        report.events.push(GameEvent::new(crashed, EventKind::Crashed));
        report.outcome = Some(MatchOutcome {
            winner: Some(crashed.opponent()),
            reason: EndReason::Collision(crashed),
            scores: [state.ships[0].score, state.ships[1].score],
        });
        return report;
    }

    // Time limit
    if state.time >= GAME_TIME_LIMIT {
        let [a, b] = [state.ships[0].score, state.ships[1].score];
        let winner = if a > b {
            Some(AgentId::A)
        } else if b > a {
            Some(AgentId::B)
        } else {
            None
        };
        report.outcome = Some(MatchOutcome {
            winner,
            reason: EndReason::TimeUp,
            scores: [a, b],
        });
        return report;
    }

    for beacon in &mut state.beacons {
        beacon.rotate(dt);
    }

    // Projectiles
    let projectiles = std::mem::take(&mut state.projectiles);
    let mut survivors = Vec::with_capacity(projectiles.len());
    for mut projectile in projectiles {
        projectile.pos += projectile.vel * dt;
        projectile.life -= dt;
        if projectile.life <= 0.0 || projectile_out_of_bounds(projectile.pos, width, height) {
            continue;
        }

        match projectile_collision(&projectile, &state.ships, &state.beacons) {
            ProjectileHit::Ship(victim) => {
                let owner = projectile.owner;
                state.ship_mut(owner).score -= HIT_SCORE;
                state.stats.ship_hits += 1;
                let burst = Burst::impact(state.ship(victim).pos);
                state.bursts.push(burst);
                record(
                    state,
                    &mut report,
                    GameEvent::new(owner, EventKind::HitOpponent).with_score(-HIT_SCORE),
                );
                record(state, &mut report, GameEvent::new(victim, EventKind::GotHit));
                log::debug!("{} hit {}", owner.label(), victim.label());
            }
            ProjectileHit::Beacon(index) => {
                let owner = projectile.owner;
                state.ship_mut(owner).score += HIT_SCORE;
                state.stats.beacon_hits += 1;
                let beacon = state.beacons.remove(index);
                state.bursts.push(Burst::beacon(beacon.pos));
                record(
                    state,
                    &mut report,
                    GameEvent::new(owner, EventKind::HitBeacon).with_score(HIT_SCORE),
                );
                state.spawn_beacon();
                log::debug!("{} hit beacon {}", owner.label(), beacon.id);
            }
            ProjectileHit::Miss => survivors.push(projectile),
        }
    }
    state.projectiles = survivors;

    // Bursts
    for burst in &mut state.bursts {
        burst.life -= dt;
    }
    state.bursts.retain(|b| b.life > 0.0);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::movement::{EasedMovement, MovementKind};
    use crate::sim::state::{Beacon, Projectile};
    use glam::Vec2;
    use proptest::prelude::*;

    /// State with beacons parked in a far corner
    fn open_state() -> SimulationState {
        let mut state = SimulationState::new(42, BOARD_WIDTH, BOARD_HEIGHT);
        for (i, beacon) in state.beacons.iter_mut().enumerate() {
            beacon.pos = Vec2::new(700.0 + i as f32 * 10.0, 60.0 + i as f32 * 150.0);
        }
        state
    }

    fn beacon_at(x: f32, y: f32) -> Beacon {
        Beacon {
            id: 900,
            pos: Vec2::new(x, y),
            rotation: 0.0,
            rotation_speed: 0.3,
        }
    }

    #[test]
    fn test_projectile_flight_and_expiry() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.ship_mut(AgentId::A).pos = Vec2::new(100.0, 100.0);
        state.ship_mut(AgentId::B).pos = Vec2::new(100.0, 400.0);
        state.beacons.clear();
        state.beacons.push(beacon_at(700.0, 450.0));
        state.fire(AgentId::A);

        for _ in 0..60 {
            advance(&mut state, &model, SIM_DT);
        }
        let p = &state.projectiles[0];
        assert!((p.pos - Vec2::new(360.0, 100.0)).length() < 0.5);
        assert!((p.life - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_projectile_consumed_when_life_runs_out() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.projectiles.push(Projectile {
            pos: Vec2::new(400.0, 250.0),
            vel: Vec2::ZERO,
            owner: AgentId::A,
            life: PROJECTILE_LIFE,
        });
        // Park ship B and beacons well away from the stationary shot
        state.ship_mut(AgentId::B).pos = Vec2::new(100.0, 400.0);
        for _ in 0..299 {
            advance(&mut state, &model, SIM_DT);
        }
        assert_eq!(state.projectiles.len(), 1);
        for _ in 0..2 {
            advance(&mut state, &model, SIM_DT);
        }
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_beacon_hit_scores_and_respawns() {
        let mut state = open_state();
        let model = EasedMovement::default();
        let target = state.beacons[1].clone();
        state.projectiles.push(Projectile {
            pos: target.pos - Vec2::new(10.0, 0.0) - Vec2::new(260.0 * SIM_DT, 0.0),
            vel: Vec2::new(260.0, 0.0),
            owner: AgentId::B,
            life: 1.0,
        });

        let report = advance(&mut state, &model, SIM_DT);
        assert_eq!(state.beacons.len(), BEACON_COUNT);
        assert!(state.beacons.iter().all(|b| b.id != target.id));
        assert_eq!(state.ships[1].score, HIT_SCORE);
        assert_eq!(state.stats.beacon_hits, 1);
        assert!(state.projectiles.is_empty());
        assert_eq!(state.bursts.len(), 1);
        assert_eq!(report.events, vec![GameEvent::new(AgentId::B, EventKind::HitBeacon).with_score(5.0)]);
        assert_eq!(state.feed.len(), 1);
    }

    #[test]
    fn test_ship_hit_scores_against_owner() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.ship_mut(AgentId::B).pos = Vec2::new(400.0, 250.0);
        let beacon_id = state.beacons[0].id;
        state.projectiles.push(Projectile {
            pos: Vec2::new(405.0, 250.0),
            vel: Vec2::ZERO,
            owner: AgentId::A,
            life: 1.0,
        });

        let report = advance(&mut state, &model, SIM_DT);
        assert_eq!(state.ships[0].score, -HIT_SCORE);
        assert_eq!(state.ships[1].score, 0.0);
        assert_eq!(state.stats.ship_hits, 1);
        assert_eq!(state.stats.beacon_hits, 0);
        assert_eq!(state.beacons[0].id, beacon_id);
        assert!(state.projectiles.is_empty());
        let kinds: Vec<_> = report.events.iter().map(|e| (e.agent, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![(AgentId::A, EventKind::HitOpponent), (AgentId::B, EventKind::GotHit)]
        );
        // Newest first
        assert_eq!(state.feed.iter().next().unwrap().kind, EventKind::GotHit);
    }

    #[test]
    fn test_undersized_board_pins_ships_to_padding() {
        let mut state = SimulationState::new(1, 70.0, 70.0);
        state.beacons.clear();
        let model = EasedMovement::default();
        advance(&mut state, &model, SIM_DT);
        for ship in &state.ships {
            assert_eq!(ship.pos, Vec2::splat(SHIP_PADDING));
        }
    }

    #[test]
    fn test_crash_ends_match_before_anything_moves() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.ship_mut(AgentId::B).pos = state.beacons[2].pos + Vec2::new(30.0, 0.0);
        state.projectiles.push(Projectile {
            pos: Vec2::new(400.0, 250.0),
            vel: Vec2::new(100.0, 0.0),
            owner: AgentId::A,
            life: 1.0,
        });

        let report = advance(&mut state, &model, SIM_DT);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.winner, Some(AgentId::A));
        assert_eq!(outcome.reason, EndReason::Collision(AgentId::B));
        assert_eq!(report.events[0].kind, EventKind::Crashed);
        // Short-circuited: projectile not integrated
        assert_eq!(state.projectiles[0].pos, Vec2::new(400.0, 250.0));
    }

    #[test]
    fn test_time_limit_draw() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.ships[0].score = 10.0;
        state.ships[1].score = 10.0;
        state.time = GAME_TIME_LIMIT - SIM_DT / 2.0;

        let outcome = advance(&mut state, &model, SIM_DT).outcome.unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.reason, EndReason::TimeUp);
        assert_eq!(outcome.describe(), "Time's up! It's a tie at 10 points!");
    }

    #[test]
    fn test_time_limit_higher_score_wins() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.ships[1].score = 5.0;
        state.time = GAME_TIME_LIMIT;
        let outcome = advance(&mut state, &model, SIM_DT).outcome.unwrap();
        assert_eq!(outcome.winner, Some(AgentId::B));
    }

    #[test]
    fn test_collision_checked_before_time_limit() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.time = GAME_TIME_LIMIT;
        state.ship_mut(AgentId::A).pos = state.beacons[0].pos;
        let outcome = advance(&mut state, &model, SIM_DT).outcome.unwrap();
        assert_eq!(outcome.reason, EndReason::Collision(AgentId::A));
    }

    #[test]
    fn test_bursts_decay() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.bursts.push(Burst::impact(Vec2::new(10.0, 10.0)));
        for _ in 0..35 {
            advance(&mut state, &model, SIM_DT);
        }
        assert_eq!(state.bursts.len(), 1);
        for _ in 0..2 {
            advance(&mut state, &model, SIM_DT);
        }
        assert!(state.bursts.is_empty());
    }

    #[test]
    fn test_beacon_rotation_wraps() {
        let mut state = open_state();
        let model = EasedMovement::default();
        state.beacons[0].rotation = std::f32::consts::TAU - 0.001;
        state.beacons[0].rotation_speed = 0.5;
        advance(&mut state, &model, SIM_DT);
        assert!(state.beacons[0].rotation < 0.01);
    }

    proptest! {
        #[test]
        fn prop_ships_stay_on_board(vx in -500f32..500.0, vy in -500f32..500.0, cruise in 0f32..120.0, angle in -10f32..10.0, steps in 1usize..120) {
            for kind in [MovementKind::Eased, MovementKind::Cruise] {
                let model = kind.model();
                let mut state = open_state();
                state.beacons.clear();
                state.beacons.push(beacon_at(-1000.0, -1000.0));
                for ship in &mut state.ships {
                    ship.vel = Vec2::new(vx, vy);
                    ship.cruise = cruise;
                    ship.angle = angle;
                }
                for _ in 0..steps {
                    advance(&mut state, model.as_ref(), SIM_DT);
                    for ship in &state.ships {
                        prop_assert!(ship.pos.x >= SHIP_PADDING && ship.pos.x <= BOARD_WIDTH - SHIP_PADDING);
                        prop_assert!(ship.pos.y >= SHIP_PADDING && ship.pos.y <= BOARD_HEIGHT - SHIP_PADDING);
                    }
                }
            }
        }

        #[test]
        fn prop_beacon_count_constant_and_scores_step_by_five(seed in 0u64..1000, shots in 1usize..40) {
            let model = EasedMovement::default();
            let mut state = SimulationState::new(seed, BOARD_WIDTH, BOARD_HEIGHT);
            for i in 0..shots {
                let owner = if i % 2 == 0 { AgentId::A } else { AgentId::B };
                let target = state.beacons[i % BEACON_COUNT].pos;
                state.projectiles.push(Projectile { pos: target, vel: Vec2::ZERO, owner, life: 1.0 });
            }
            let before = [state.ships[0].score, state.ships[1].score];
            let report = advance(&mut state, &model, SIM_DT);
            if report.outcome.is_none() {
                prop_assert_eq!(state.beacons.len(), BEACON_COUNT);
            }
            for (i, ship) in state.ships.iter().enumerate() {
                let delta = ship.score - before[i];
                prop_assert!((delta / HIT_SCORE).fract().abs() < 1e-4);
            }
            for event in &report.events {
                if let Some(delta) = event.score_delta {
                    prop_assert_eq!(delta.abs(), HIT_SCORE);
                }
            }
        }
    }
}

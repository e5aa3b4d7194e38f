//! One match: simulation, phase and agent bookkeeping
//!
//! `Arena` is synchronous. A decision is split into two halves around the
//! network wait: [`Arena::begin_decision`] claims the agent's in-flight slot
//! and stages the request turn, [`Arena::finish_decision`] consumes the reply.
//! Nothing between the halves touches the arena, so every mutation happens
//! under whatever lock the caller holds and the reply is re-validated on
//! arrival.
//!
//! Each reset opens a new epoch. Tickets carry the epoch they were issued in;
//! a reply for an older epoch is dropped without touching anything.

use std::time::Instant;

use tokio::sync::broadcast;

use crate::agent::action::{self, Action, ActionKind};
use crate::agent::context::AgentContext;
use crate::agent::conversation::{ConversationWindow, Turn};
use crate::agent::transport::DecisionRequest;
use crate::config::ArenaConfig;
use crate::error::{ArenaError, TransportError};
use crate::phase::MatchPhase;
use crate::sim::{
    AgentId, EventKind, GameEvent, MatchOutcome, MovementModel, RenderSnapshot, SimulationState, advance,
};

/// Observer channel depth
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Intent shown after a reply that could not be decoded
pub const INVALID_INTENT: &str = "Invalid JSON response";

/// Claim on one in-flight decision
#[derive(Debug)]
pub struct DecisionTicket {
    pub agent: AgentId,
    pub request: DecisionRequest,
    epoch: u64,
    issued_at: Instant,
}

impl DecisionTicket {
    /// Move the request out for sending; the ticket keeps its claim
    pub fn take_request(&mut self) -> DecisionRequest {
        std::mem::take(&mut self.request)
    }
}

/// What became of a decision reply
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// Normalized action applied to the ship
    Applied(Action),
    /// Reply was not a decodable action; request turn rolled back
    Invalid,
    /// Valid reply, but the match stopped being live during the round trip
    Discarded,
    /// Reply belongs to a match that has since been reset
    Stale,
    /// Transport failed; the match is now in Error
    Failed,
}

pub struct Arena {
    config: ArenaConfig,
    state: SimulationState,
    phase: MatchPhase,
    movement: Box<dyn MovementModel>,
    windows: [ConversationWindow; 2],
    in_flight: [bool; 2],
    epoch: u64,
    events: broadcast::Sender<GameEvent>,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("phase", &self.phase)
            .field("epoch", &self.epoch)
            .field("in_flight", &self.in_flight)
            .field("movement", &self.movement)
            .finish_non_exhaustive()
    }
}

impl Arena {
    pub fn new(mut config: ArenaConfig) -> Self {
        config.settings = config.settings.validated();
        let settings = config.settings;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: SimulationState::new(settings.seed, settings.width, settings.height),
            phase: MatchPhase::Idle,
            movement: settings.movement.model(),
            windows: Default::default(),
            in_flight: [false; 2],
            epoch: 0,
            events,
            config,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(&self.state)
    }

    /// Committed conversation of one agent, preamble first
    pub fn history(&self, agent: AgentId) -> Vec<Turn> {
        self.windows[agent.index()].history()
    }

    pub fn is_in_flight(&self, agent: AgentId) -> bool {
        self.in_flight[agent.index()]
    }

    /// Agents with a complete endpoint; the others are never polled
    pub fn is_polled(&self, agent: AgentId) -> bool {
        self.config.models[agent.index()].is_configured()
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: GameEvent) {
        log::info!("{event}");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Idle/Paused -> Live
    pub fn start(&mut self) -> Result<(), ArenaError> {
        let any = self.config.any_configured();
        self.phase.start(any).inspect_err(|e| log::warn!("Cannot start: {e}"))?;
        log::info!("Match live");
        Ok(())
    }

    /// Live -> Paused
    pub fn pause(&mut self) -> Result<(), ArenaError> {
        self.phase.pause()?;
        log::info!("Match paused");
        Ok(())
    }

    /// Error -> Paused
    pub fn dismiss_error(&mut self) -> bool {
        let dismissed = self.phase.dismiss();
        if dismissed {
            log::info!("Error dismissed");
        }
        dismissed
    }

    /// Any phase -> Idle with a fresh match
    pub fn reset(&mut self) {
        self.epoch += 1;
        let settings = self.config.settings;
        let seed = settings.seed.wrapping_add(self.epoch);
        self.state = SimulationState::new(seed, settings.width, settings.height);
        for window in &mut self.windows {
            window.clear();
        }
        self.in_flight = [false; 2];
        self.phase.reset();
        log::info!("Arena reset (epoch {})", self.epoch);
    }

    /// Advance one fixed step if live. Returns the outcome if this step
    /// ended the match.
    pub fn step(&mut self, dt: f32) -> Option<MatchOutcome> {
        if !self.phase.is_live() {
            return None;
        }
        let report = advance(&mut self.state, self.movement.as_ref(), dt);
        for event in report.events {
            self.emit(event);
        }
        let outcome = report.outcome?;
        self.phase.finish(outcome);
        log::info!("Game over: {}", outcome.describe());
        Some(outcome)
    }

    /// Claim the agent's in-flight slot and stage a request.
    ///
    /// `None` when the match is not live, the agent is unconfigured, or a
    /// request for it is already outstanding.
    pub fn begin_decision(&mut self, agent: AgentId) -> Option<DecisionTicket> {
        let i = agent.index();
        if !self.phase.is_live() || self.in_flight[i] || !self.is_polled(agent) {
            return None;
        }
        self.in_flight[i] = true;

        let prompt = AgentContext::build(&self.state, agent).to_prompt();
        let turns = self.windows[i].stage(prompt);
        Some(DecisionTicket {
            agent,
            request: DecisionRequest {
                endpoint: self.config.models[i].trimmed(),
                turns,
            },
            epoch: self.epoch,
            issued_at: Instant::now(),
        })
    }

    /// Consume the reply for a ticket and release the agent's slot
    pub fn finish_decision(
        &mut self,
        ticket: DecisionTicket,
        reply: Result<String, TransportError>,
    ) -> DecisionOutcome {
        let agent = ticket.agent;
        let i = agent.index();
        if ticket.epoch != self.epoch {
            log::debug!("{} reply from a previous match dropped", agent.label());
            return DecisionOutcome::Stale;
        }
        self.in_flight[i] = false;
        let latency = ticket.issued_at.elapsed();

        let text = match reply {
            Ok(text) => text,
            Err(e) => {
                self.windows[i].discard();
                log::error!("{} transport error: {e}", agent.label());
                self.emit(GameEvent::new(agent, EventKind::TransportError).with_intent(e.to_string()));
                self.phase.fail();
                return DecisionOutcome::Failed;
            }
        };

        let Some(action) = action::parse_action(&text) else {
            self.windows[i].discard();
            self.state.ship_mut(agent).intent = INVALID_INTENT.to_string();
            self.emit(GameEvent::new(agent, EventKind::InvalidResponse));
            return DecisionOutcome::Invalid;
        };
        self.windows[i].commit(text);

        if !self.phase.is_live() {
            log::debug!("{} reply arrived after the match stopped; discarded", agent.label());
            return DecisionOutcome::Discarded;
        }

        log::debug!("{} {} | {}ms", agent.label(), action.action.as_str(), latency.as_millis());
        self.apply_action(agent, &action);
        DecisionOutcome::Applied(action)
    }

    /// Apply a normalized action to an agent's ship and record it
    pub fn apply_action(&mut self, agent: AgentId, action: &Action) {
        let ship = self.state.ship_mut(agent);
        self.movement.apply_action(ship, action);
        ship.last_action = action.clone();
        if !action.intent.is_empty() {
            ship.intent = action.intent.clone();
        }
        if action.action == ActionKind::Fire {
            self.state.fire(agent);
        }

        let kind = match action.action {
            ActionKind::Turn => EventKind::Turn,
            ActionKind::Move => EventKind::Move,
            ActionKind::Fire => EventKind::Fire,
        };
        let event = GameEvent::new(agent, kind).with_intent(action.intent.clone());
        self.state.feed.push(event.clone());
        self.emit(event);
    }
}

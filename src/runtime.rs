//! Async driver
//!
//! Three long-lived tasks share one [`Arena`] behind a mutex:
//!
//! - the physics loop, which wakes at the nominal frame rate and runs as many
//!   fixed steps as real elapsed time calls for
//! - one actor per agent, armed by `Start` and disarmed by `Cancel`, which
//!   polls on a jittered interval
//!
//! Each poll claims a ticket under the lock, releases it for the network
//! wait, and takes it again to apply the reply. Physics keeps stepping while
//! replies are outstanding.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tokio::sync::{Mutex, MutexGuard, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at};

use crate::agent::transport::Transport;
use crate::arena::{Arena, DecisionOutcome};
use crate::clock::FixedStepClock;
use crate::consts::{ACTION_JITTER_MS, ACTION_RATE, NOMINAL_FPS, SIM_DT};
use crate::error::ArenaError;
use crate::phase::MatchPhase;
use crate::sim::{AgentId, GameEvent, RenderSnapshot};

pub type SharedArena = Arc<Mutex<Arena>>;

/// Messages understood by an agent actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSignal {
    /// Arm the polling timer
    Start,
    /// Poll once now
    Tick,
    /// Disarm the polling timer
    Cancel,
    /// Stop the actor
    Shutdown,
}

#[derive(Debug, Clone)]
struct Signals([mpsc::UnboundedSender<AgentSignal>; 2]);

impl Signals {
    fn send(&self, agent: AgentId, signal: AgentSignal) {
        // A stopped actor has nothing left to disarm
        let _ = self.0[agent.index()].send(signal);
    }

    fn send_all(&self, signal: AgentSignal) {
        for agent in AgentId::BOTH {
            self.send(agent, signal);
        }
    }
}

/// Owner of the running tasks; control operations go through here
#[derive(Debug)]
pub struct ArenaHandle {
    arena: SharedArena,
    signals: Signals,
    physics: JoinHandle<()>,
    actors: Vec<JoinHandle<()>>,
}

impl ArenaHandle {
    /// Spawn the physics loop and both agent actors on the current runtime
    pub fn spawn<T: Transport>(arena: Arena, transport: Arc<T>) -> Self {
        let seed = arena.config().settings.seed;
        let arena = Arc::new(Mutex::new(arena));

        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let signals = Signals([tx_a, tx_b]);

        let physics = tokio::spawn(physics_loop(arena.clone(), signals.clone()));
        let actors = AgentId::BOTH
            .into_iter()
            .zip([rx_a, rx_b])
            .map(|(agent, inbox)| {
                let actor = AgentActor {
                    agent,
                    arena: arena.clone(),
                    transport: transport.clone(),
                    signals: signals.clone(),
                    inbox,
                    rng: Pcg32::seed_from_u64(seed ^ (agent.index() as u64 + 1)),
                };
                tokio::spawn(actor.run())
            })
            .collect();

        log::debug!("Arena runtime spawned");
        Self {
            arena,
            signals,
            physics,
            actors,
        }
    }

    /// Direct access for callers that need more than the helpers below
    pub async fn lock(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().await
    }

    pub async fn start(&self) -> Result<(), ArenaError> {
        self.arena.lock().await.start()?;
        self.signals.send_all(AgentSignal::Start);
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), ArenaError> {
        self.arena.lock().await.pause()?;
        self.signals.send_all(AgentSignal::Cancel);
        Ok(())
    }

    pub async fn dismiss_error(&self) -> bool {
        self.arena.lock().await.dismiss_error()
    }

    pub async fn reset(&self) {
        self.arena.lock().await.reset();
        self.signals.send_all(AgentSignal::Cancel);
    }

    /// Ask one agent to poll immediately, outside its timer
    pub fn poll_now(&self, agent: AgentId) {
        self.signals.send(agent, AgentSignal::Tick);
    }

    pub async fn phase(&self) -> MatchPhase {
        self.arena.lock().await.phase()
    }

    pub async fn snapshot(&self) -> RenderSnapshot {
        self.arena.lock().await.snapshot()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.arena.lock().await.subscribe()
    }

    /// Stop every task. Replies still in flight are dropped with the arena.
    pub async fn shutdown(self) {
        self.signals.send_all(AgentSignal::Shutdown);
        self.physics.abort();
        for actor in self.actors {
            if let Err(e) = actor.await {
                log::warn!("Agent actor ended abnormally: {e}");
            }
        }
        log::debug!("Arena runtime stopped");
    }
}

async fn physics_loop(arena: SharedArena, signals: Signals) {
    let mut ticker = interval(Duration::from_secs_f32(1.0 / NOMINAL_FPS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = FixedStepClock::new(Duration::from_secs_f32(SIM_DT));
    let mut last = Instant::now();

    log::debug!("Physics loop started at {NOMINAL_FPS} Hz");
    loop {
        ticker.tick().await;
        let now = Instant::now();
        let steps = clock.accumulate(now - last);
        last = now;

        let mut arena = arena.lock().await;
        for _ in 0..steps {
            if arena.step(SIM_DT).is_some() {
                signals.send_all(AgentSignal::Cancel);
                break;
            }
        }
    }
}

struct AgentActor<T> {
    agent: AgentId,
    arena: SharedArena,
    transport: Arc<T>,
    signals: Signals,
    inbox: mpsc::UnboundedReceiver<AgentSignal>,
    rng: Pcg32,
}

enum Wake {
    Signal(Option<AgentSignal>),
    Timer,
}

impl<T: Transport> AgentActor<T> {
    async fn run(mut self) {
        let mut timer: Option<Interval> = None;
        loop {
            let wake = tokio::select! {
                signal = self.inbox.recv() => Wake::Signal(signal),
                _ = next_fire(&mut timer) => Wake::Timer,
            };
            match wake {
                Wake::Timer | Wake::Signal(Some(AgentSignal::Tick)) => self.poll().await,
                Wake::Signal(Some(AgentSignal::Start)) => timer = Some(self.arm()),
                Wake::Signal(Some(AgentSignal::Cancel)) => {
                    if timer.take().is_some() {
                        log::debug!("{} timer cancelled", self.agent.label());
                    }
                }
                Wake::Signal(Some(AgentSignal::Shutdown)) | Wake::Signal(None) => break,
            }
        }
    }

    /// Fresh polling interval: the nominal period plus per-agent jitter
    fn arm(&mut self) -> Interval {
        let (lo, hi) = ACTION_JITTER_MS;
        let millis = 1000.0 / ACTION_RATE + self.rng.random_range(lo..hi);
        let period = Duration::from_secs_f32(millis.max(1.0) / 1000.0);
        log::debug!("{} polling every {}ms", self.agent.label(), period.as_millis());

        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    async fn poll(&self) {
        let ticket = self.arena.lock().await.begin_decision(self.agent);
        let Some(mut ticket) = ticket else {
            return;
        };

        let arena = self.arena.clone();
        let transport = self.transport.clone();
        let signals = self.signals.clone();
        tokio::spawn(async move {
            let reply = transport.complete(ticket.take_request()).await;
            let outcome = arena.lock().await.finish_decision(ticket, reply);
            if outcome == DecisionOutcome::Failed {
                signals.send_all(AgentSignal::Cancel);
            }
        });
    }
}

async fn next_fire(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::transport::DecisionRequest;
    use crate::config::{AgentEndpoint, ArenaConfig};
    use crate::error::TransportError;
    use crate::sim::EventKind;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;
    use tokio::time::{sleep, timeout};

    const FIRE: &str = r#"{"action":"fire","turn":0,"move":0,"intent":"shoot"}"#;

    /// Replies with a fixed text once a permit is available
    struct ScriptedTransport {
        reply: Result<String, u16>,
        calls: AtomicUsize,
        gate: Semaphore,
    }

    impl ScriptedTransport {
        fn open(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.into()),
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            })
        }

        fn gated(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.into()),
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        fn complete(&self, _request: DecisionRequest) -> impl Future<Output = Result<String, TransportError>> + Send {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
                match &self.reply {
                    Ok(text) => Ok(text.clone()),
                    Err(status) => Err(TransportError::Status {
                        status: *status,
                        body: String::new(),
                    }),
                }
            }
        }
    }

    fn arena(agents: usize) -> Arena {
        let endpoint = AgentEndpoint {
            base_url: "http://localhost".into(),
            path: "/v1/chat/completions".into(),
            model: "pilot".into(),
            api_key: "key".into(),
        };
        let mut config = ArenaConfig::default();
        for model in config.models.iter_mut().take(agents) {
            *model = endpoint.clone();
        }
        Arena::new(config)
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..300 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_agents_act_while_live() {
        let transport = ScriptedTransport::open(FIRE);
        let handle = ArenaHandle::spawn(arena(2), transport.clone());
        let mut events = handle.subscribe().await;
        handle.start().await.unwrap();

        let fired = timeout(Duration::from_secs(3), async {
            loop {
                if let Ok(event) = events.recv().await {
                    if event.kind == EventKind::Fire {
                        return event;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(fired.intent.as_deref(), Some("shoot"));
        assert!(handle.snapshot().await.stats.shots >= 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_without_agents_fails() {
        let handle = ArenaHandle::spawn(arena(0), ScriptedTransport::open(FIRE));
        assert_eq!(handle.start().await, Err(ArenaError::NoAgentConfigured));
        assert_eq!(handle.phase().await, MatchPhase::Idle);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_request_in_flight() {
        let transport = ScriptedTransport::gated(FIRE);
        let handle = ArenaHandle::spawn(arena(1), transport.clone());
        handle.start().await.unwrap();
        for _ in 0..5 {
            handle.poll_now(AgentId::A);
        }
        sleep(Duration::from_millis(400)).await;
        assert_eq!(transport.calls(), 1);

        transport.gate.add_permits(1);
        let t = transport.clone();
        wait_until(move || t.calls() >= 2).await;
        assert_eq!(handle.snapshot().await.stats.shots, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_after_pause_not_applied() {
        let transport = ScriptedTransport::gated(FIRE);
        let handle = ArenaHandle::spawn(arena(1), transport.clone());
        handle.start().await.unwrap();
        handle.poll_now(AgentId::A);
        let t = transport.clone();
        wait_until(move || t.calls() == 1).await;

        handle.pause().await.unwrap();
        transport.gate.add_permits(1);
        for _ in 0..300 {
            if !handle.lock().await.is_in_flight(AgentId::A) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        let arena = handle.lock().await;
        assert!(!arena.is_in_flight(AgentId::A));
        assert!(arena.state().projectiles.is_empty());
        assert_eq!(arena.state().stats.shots, 0);
        assert_eq!(arena.phase(), MatchPhase::Paused);
        drop(arena);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reset_drops_outstanding_reply() {
        let transport = ScriptedTransport::gated(FIRE);
        let handle = ArenaHandle::spawn(arena(1), transport.clone());
        handle.start().await.unwrap();
        handle.poll_now(AgentId::A);
        let t = transport.clone();
        wait_until(move || t.calls() == 1).await;

        handle.reset().await;
        handle.start().await.unwrap();
        handle.poll_now(AgentId::A);
        let t = transport.clone();
        wait_until(move || t.calls() == 2).await;

        // Releases the first, pre-reset request
        transport.gate.add_permits(1);
        sleep(Duration::from_millis(100)).await;
        let arena = handle.lock().await;
        assert_eq!(arena.state().stats.shots, 0);
        assert!(arena.is_in_flight(AgentId::A));
        drop(arena);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_transport_failure_freezes_match() {
        let transport = ScriptedTransport::failing(500);
        let handle = ArenaHandle::spawn(arena(2), transport.clone());
        let mut events = handle.subscribe().await;
        handle.start().await.unwrap();

        let failed = timeout(Duration::from_secs(3), async {
            loop {
                if let Ok(event) = events.recv().await {
                    if event.kind == EventKind::TransportError {
                        return event;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(failed.intent.as_deref(), Some("HTTP 500"));
        assert_eq!(handle.phase().await, MatchPhase::Error);

        let frozen = handle.snapshot().await.remaining_time;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.snapshot().await.remaining_time, frozen);

        assert!(handle.dismiss_error().await);
        assert_eq!(handle.phase().await, MatchPhase::Paused);
        handle.shutdown().await;
    }
}

//! Match state machine
//!
//! ```text
//!  Idle ──start──▶ Live ◀──start── Paused
//!                  │  └──pause──────▶ ▲
//!                  │                  │ dismiss
//!          transport failure ──▶ Error ┘
//!                  │
//!      collision / time up ──▶ GameOver
//!
//!  reset: any state ──▶ Idle
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::sim::MatchOutcome;

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Fresh after reset; nothing runs
    Idle,
    /// Physics advances and agents are polled
    Live,
    /// Frozen, resumable
    Paused,
    /// Frozen after a transport failure until dismissed or reset
    Error,
    /// Terminal until reset
    GameOver(MatchOutcome),
}

impl MatchPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, MatchPhase::Live)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchPhase::Idle => "Idle",
            MatchPhase::Live => "Live",
            MatchPhase::Paused => "Paused",
            MatchPhase::Error => "Error",
            MatchPhase::GameOver(_) => "Game Over",
        }
    }

    /// Idle/Paused -> Live, provided some agent can be polled
    pub fn start(&mut self, any_configured: bool) -> Result<(), ArenaError> {
        match self {
            MatchPhase::Live => Ok(()),
            MatchPhase::Error => Err(ArenaError::UnresolvedError),
            MatchPhase::GameOver(_) => Err(ArenaError::MatchOver),
            MatchPhase::Idle | MatchPhase::Paused => {
                if !any_configured {
                    return Err(ArenaError::NoAgentConfigured);
                }
                *self = MatchPhase::Live;
                Ok(())
            }
        }
    }

    /// Live -> Paused
    pub fn pause(&mut self) -> Result<(), ArenaError> {
        match self {
            MatchPhase::Live => {
                *self = MatchPhase::Paused;
                Ok(())
            }
            MatchPhase::Paused => Ok(()),
            _ => Err(ArenaError::NotRunning),
        }
    }

    /// Live/Paused -> Error. Returns false when the match is not in a phase
    /// a transport failure can interrupt.
    pub fn fail(&mut self) -> bool {
        match self {
            MatchPhase::Live | MatchPhase::Paused => {
                *self = MatchPhase::Error;
                true
            }
            _ => false,
        }
    }

    /// Error -> Paused
    pub fn dismiss(&mut self) -> bool {
        if *self == MatchPhase::Error {
            *self = MatchPhase::Paused;
            true
        } else {
            false
        }
    }

    /// Live -> GameOver
    pub fn finish(&mut self, outcome: MatchOutcome) {
        *self = MatchPhase::GameOver(outcome);
    }

    pub fn reset(&mut self) {
        *self = MatchPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{AgentId, EndReason};

    fn outcome() -> MatchOutcome {
        MatchOutcome {
            winner: Some(AgentId::A),
            reason: EndReason::Collision(AgentId::B),
            scores: [0.0, 0.0],
        }
    }

    #[test]
    fn test_start_requires_configured_agent() {
        let mut phase = MatchPhase::Idle;
        assert_eq!(phase.start(false), Err(ArenaError::NoAgentConfigured));
        assert_eq!(phase, MatchPhase::Idle);
        assert_eq!(phase.start(true), Ok(()));
        assert!(phase.is_live());
    }

    #[test]
    fn test_pause_resume() {
        let mut phase = MatchPhase::Live;
        phase.pause().unwrap();
        assert_eq!(phase, MatchPhase::Paused);
        phase.start(true).unwrap();
        assert_eq!(phase, MatchPhase::Live);
        assert_eq!(MatchPhase::Idle.pause(), Err(ArenaError::NotRunning));
    }

    #[test]
    fn test_error_blocks_start_until_dismissed() {
        let mut phase = MatchPhase::Live;
        assert!(phase.fail());
        assert_eq!(phase.start(true), Err(ArenaError::UnresolvedError));
        assert!(phase.dismiss());
        assert_eq!(phase, MatchPhase::Paused);
        assert!(!phase.dismiss());
        phase.start(true).unwrap();
    }

    #[test]
    fn test_game_over_is_terminal_until_reset() {
        let mut phase = MatchPhase::Live;
        phase.finish(outcome());
        assert_eq!(phase.start(true), Err(ArenaError::MatchOver));
        assert!(!phase.fail());
        assert!(matches!(phase, MatchPhase::GameOver(_)));
        phase.reset();
        assert_eq!(phase, MatchPhase::Idle);
    }
}

//! Typed notifications emitted by the engine after each state change.

use crate::candidate::CandidateId;
use crate::implied::ImpliedBattle;
use crate::outcome::BattleOutcome;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    BattleRecorded {
        battle_number: u32,
        outcomes: Vec<BattleOutcome>,
    },
    ReorderApplied {
        candidate: CandidateId,
        new_index: usize,
        implied: Vec<ImpliedBattle>,
    },
    MilestoneReached {
        battle_count: u32,
    },
    MilestoneContinued {
        battle_count: u32,
    },
    RefinementQueued {
        candidate: CandidateId,
        opponents: Vec<CandidateId>,
    },
    RefinementRemoved {
        candidate: CandidateId,
    },
    BattleUndone {
        battle_number: u32,
    },
    Reset,
}

/// Receives engine events. Observers run synchronously, in subscription
/// order, after the change is complete.
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

impl<F> EngineObserver for F
where
    F: FnMut(&EngineEvent),
{
    fn on_event(&mut self, event: &EngineEvent) {
        self(event)
    }
}

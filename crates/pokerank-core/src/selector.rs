//! Next-battle selection.
//!
//! Refinement entries are served first. Otherwise participants are drawn at
//! random, preferring candidates outside the recently-seen window and outside
//! the previous battle. Two consecutive battles never share the same set of
//! participants.

use crate::battle::BattleType;
use crate::candidate::{Candidate, CandidateId};
use crate::refinement::RefinementQueue;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Default size of the recently-seen window.
pub const DEFAULT_RECENT_WINDOW: usize = 8;

/// Random draws attempted before forcing a fresh participant in.
const MAX_DRAW_ATTEMPTS: usize = 16;

/// Reasons no battle can be produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The pool has fewer candidates than a battle needs.
    #[error("pool has {available} candidates, {required} needed")]
    PoolTooSmall { required: usize, available: usize },
    /// The pool holds exactly one possible battle and it was just shown.
    #[error("the only possible battle was just shown")]
    RepeatUnavoidable,
}

/// Chooses battles and remembers what was shown recently.
#[derive(Debug, Clone)]
pub struct BattleSelector {
    rng: StdRng,
    last_battle: Option<Vec<CandidateId>>,
    recent: VecDeque<CandidateId>,
    recent_window: usize,
}

impl Default for BattleSelector {
    fn default() -> Self {
        Self::new(None, DEFAULT_RECENT_WINDOW)
    }
}

impl BattleSelector {
    /// Creates a selector. A seed makes the sequence of battles reproducible.
    pub fn new(seed: Option<u64>, recent_window: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            last_battle: None,
            recent: VecDeque::with_capacity(recent_window),
            recent_window,
        }
    }

    /// Sorted ids of the previous battle.
    pub fn last_battle(&self) -> Option<&[CandidateId]> {
        self.last_battle.as_deref()
    }

    /// Forgets the previous battle and the recently-seen window.
    pub fn forget(&mut self) {
        self.last_battle = None;
        self.recent.clear();
    }

    /// Selects the next battle from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::PoolTooSmall`] when the pool cannot fill a
    /// battle, and [`SelectionError::RepeatUnavoidable`] when the only
    /// possible battle is the one just shown.
    pub fn select_next(
        &mut self,
        pool: &[Candidate],
        battle_type: BattleType,
        exclude_last_participants: bool,
        queue: &mut RefinementQueue,
    ) -> Result<Vec<Candidate>, SelectionError> {
        let required = battle_type.size();
        if pool.len() < required {
            return Err(SelectionError::PoolTooSmall {
                required,
                available: pool.len(),
            });
        }

        let battle = match self.refinement_battle(pool, required, queue) {
            Some(battle) => battle,
            None => self.random_battle(pool, required, exclude_last_participants)?,
        };
        Ok(self.commit(battle))
    }

    fn refinement_battle(
        &mut self,
        pool: &[Candidate],
        required: usize,
        queue: &mut RefinementQueue,
    ) -> Option<Vec<Candidate>> {
        // Entries for candidates outside the current pool wait for a later filter.
        let (position, entry) = queue.take_first(|id| pool.iter().any(|c| c.id == id))?;
        let Some(subject) = pool.iter().find(|c| c.id == entry.candidate) else {
            queue.insert(position, entry);
            return None;
        };

        let mut battle = vec![subject.clone()];
        let mut remaining = entry.clone();
        remaining.opponents.clear();
        for &opponent in &entry.opponents {
            let in_pool = pool.iter().find(|c| c.id == opponent);
            match in_pool {
                Some(c) if battle.len() < required && !battle.iter().any(|b| b.id == c.id) => {
                    battle.push(c.clone());
                }
                Some(_) => remaining.opponents.push(opponent),
                None => {}
            }
        }

        if battle.len() < required {
            let mut fillers: Vec<&Candidate> = pool
                .iter()
                .filter(|c| !battle.iter().any(|b| b.id == c.id))
                .collect();
            fillers.shuffle(&mut self.rng);
            fillers.sort_by_key(|c| self.recent.contains(&c.id));
            battle.extend(fillers.into_iter().take(required - battle.len()).cloned());
        }

        if self.is_repeat(&battle) {
            queue.insert(position, entry);
            return None;
        }
        if !remaining.opponents.is_empty() {
            queue.insert(position, remaining);
        }
        tracing::debug!("Serving refinement battle for {}", subject.id);
        Some(battle)
    }

    fn random_battle(
        &mut self,
        pool: &[Candidate],
        required: usize,
        exclude_last_participants: bool,
    ) -> Result<Vec<Candidate>, SelectionError> {
        let last: HashSet<CandidateId> = match (&self.last_battle, exclude_last_participants) {
            (Some(ids), true) => ids.iter().copied().collect(),
            _ => HashSet::new(),
        };

        let fresh: Vec<&Candidate> = pool
            .iter()
            .filter(|c| !last.contains(&c.id) && !self.recent.contains(&c.id))
            .collect();
        let candidates = if fresh.len() >= required {
            fresh
        } else {
            let not_last: Vec<&Candidate> = pool.iter().filter(|c| !last.contains(&c.id)).collect();
            if not_last.len() >= required {
                not_last
            } else {
                pool.iter().collect()
            }
        };

        for _ in 0..MAX_DRAW_ATTEMPTS {
            let battle: Vec<Candidate> = candidates
                .choose_multiple(&mut self.rng, required)
                .map(|c| (*c).clone())
                .collect();
            if !self.is_repeat(&battle) {
                return Ok(battle);
            }
        }

        if pool.len() == required {
            return Err(SelectionError::RepeatUnavoidable);
        }

        Ok(self.swap_into_last(pool))
    }

    /// The previous battle with one member replaced by a candidate outside
    /// it. Differs from the previous battle whenever the pool has an outsider.
    fn swap_into_last(&mut self, pool: &[Candidate]) -> Vec<Candidate> {
        let last = self.last_battle.clone().unwrap_or_default();
        let mut battle: Vec<Candidate> = pool
            .iter()
            .filter(|c| last.contains(&c.id))
            .cloned()
            .collect();
        let outsiders: Vec<&Candidate> = pool.iter().filter(|c| !last.contains(&c.id)).collect();
        if let (Some(outsider), Some(slot)) = (
            outsiders.choose(&mut self.rng),
            battle.choose_mut(&mut self.rng),
        ) {
            *slot = (*outsider).clone();
        }
        battle
    }

    fn is_repeat(&self, battle: &[Candidate]) -> bool {
        self.last_battle
            .as_deref()
            .is_some_and(|last| sorted_ids(battle) == last)
    }

    fn commit(&mut self, battle: Vec<Candidate>) -> Vec<Candidate> {
        for candidate in &battle {
            if self.recent_window == 0 {
                break;
            }
            self.recent.retain(|&id| id != candidate.id);
            if self.recent.len() == self.recent_window {
                self.recent.pop_front();
            }
            self.recent.push_back(candidate.id);
        }
        self.last_battle = Some(sorted_ids(&battle));
        battle
    }
}

fn sorted_ids(battle: &[Candidate]) -> Vec<CandidateId> {
    let mut ids: Vec<CandidateId> = battle.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids
}

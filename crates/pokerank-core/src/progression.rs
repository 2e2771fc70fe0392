//! Battle counting and the milestone review state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Battle counts at which a review pause is triggered.
pub const DEFAULT_MILESTONES: [u32; 11] = [10, 25, 50, 100, 150, 200, 300, 400, 500, 750, 1000];

/// Spacing of milestones past the last listed one. Zero disables them.
pub const DEFAULT_MILESTONE_INTERVAL: u32 = 250;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionState {
    #[default]
    Battling,
    /// Paused at a milestone until the user continues.
    MilestoneReview { battle_count: u32 },
    /// Transient while a reset runs.
    Resetting,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("milestone review at {battle_count} battles must be continued first")]
    MilestoneReviewPending { battle_count: u32 },
    #[error("no milestone review is pending")]
    NotInMilestoneReview,
    #[error("no battles have been recorded")]
    NoBattlesRecorded,
}

/// Tracks the explicit battle count and milestone pauses.
#[derive(Debug, Clone)]
pub struct ProgressionController {
    milestones: Vec<u32>,
    interval: u32,
    total_battles: u32,
    state: ProgressionState,
}

impl Default for ProgressionController {
    fn default() -> Self {
        Self::new(DEFAULT_MILESTONES.to_vec(), DEFAULT_MILESTONE_INTERVAL)
    }
}

impl ProgressionController {
    /// Creates a controller. Milestones are sorted and zero is ignored.
    pub fn new(mut milestones: Vec<u32>, interval: u32) -> Self {
        milestones.retain(|&m| m > 0);
        milestones.sort_unstable();
        milestones.dedup();
        Self {
            milestones,
            interval,
            total_battles: 0,
            state: ProgressionState::Battling,
        }
    }

    pub fn state(&self) -> ProgressionState {
        self.state
    }

    /// Explicit battles recorded so far.
    pub fn total_battles(&self) -> u32 {
        self.total_battles
    }

    pub fn milestones(&self) -> &[u32] {
        &self.milestones
    }

    pub fn is_in_review(&self) -> bool {
        matches!(self.state, ProgressionState::MilestoneReview { .. })
    }

    /// True if reaching `count` battles triggers a review.
    pub fn is_milestone(&self, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        if self.milestones.binary_search(&count).is_ok() {
            return true;
        }
        let last = self.milestones.last().copied().unwrap_or(0);
        self.interval > 0 && count > last && (count - last) % self.interval == 0
    }

    /// First milestone strictly after the current count.
    pub fn next_milestone(&self) -> Option<u32> {
        let current = self.total_battles;
        if let Some(&m) = self.milestones.iter().find(|&&m| m > current) {
            return Some(m);
        }
        if self.interval == 0 {
            return None;
        }
        let last = self.milestones.last().copied().unwrap_or(0);
        let steps = (current - last) / self.interval + 1;
        last.checked_add(steps.checked_mul(self.interval)?)
    }

    /// Fraction of the way from the previous milestone to the next one.
    pub fn progress(&self) -> f64 {
        let Some(next) = self.next_milestone() else {
            return 1.0;
        };
        let previous = self
            .previous_milestone()
            .unwrap_or(0);
        let span = next.saturating_sub(previous);
        if span == 0 {
            return 1.0;
        }
        f64::from(self.total_battles - previous) / f64::from(span)
    }

    fn previous_milestone(&self) -> Option<u32> {
        (1..=self.total_battles)
            .rev()
            .find(|&count| self.is_milestone(count))
    }

    /// Fails while a milestone review is pending.
    pub fn ensure_battling(&self) -> Result<(), ProgressionError> {
        match self.state {
            ProgressionState::MilestoneReview { battle_count } => {
                Err(ProgressionError::MilestoneReviewPending { battle_count })
            }
            _ => Ok(()),
        }
    }

    /// Counts one explicit battle and returns its number, entering review
    /// when the new count is a milestone.
    pub fn record_battle(&mut self) -> Result<u32, ProgressionError> {
        self.ensure_battling()?;
        self.total_battles += 1;
        if self.is_milestone(self.total_battles) {
            self.state = ProgressionState::MilestoneReview {
                battle_count: self.total_battles,
            };
            tracing::info!("Milestone reached at {} battles", self.total_battles);
        } else {
            self.state = ProgressionState::Battling;
        }
        Ok(self.total_battles)
    }

    /// Leaves the review pause, returning the milestone count.
    pub fn continue_battles(&mut self) -> Result<u32, ProgressionError> {
        match self.state {
            ProgressionState::MilestoneReview { battle_count } => {
                self.state = ProgressionState::Battling;
                Ok(battle_count)
            }
            _ => Err(ProgressionError::NotInMilestoneReview),
        }
    }

    pub fn begin_reset(&mut self) {
        self.state = ProgressionState::Resetting;
        self.total_battles = 0;
    }

    pub fn finish_reset(&mut self) {
        self.state = ProgressionState::Battling;
    }

    /// Steps the count back by one battle and resumes battling.
    pub fn rewind(&mut self) -> Result<u32, ProgressionError> {
        if self.total_battles == 0 {
            return Err(ProgressionError::NoBattlesRecorded);
        }
        let undone = self.total_battles;
        self.total_battles -= 1;
        self.state = ProgressionState::Battling;
        Ok(undone)
    }

    /// Reinstates a persisted count.
    pub fn restore(&mut self, total_battles: u32, review_pending: bool) {
        self.total_battles = total_battles;
        self.state = if review_pending && total_battles > 0 {
            ProgressionState::MilestoneReview {
                battle_count: total_battles,
            }
        } else {
            ProgressionState::Battling
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(milestones: &[u32], interval: u32) -> ProgressionController {
        ProgressionController::new(milestones.to_vec(), interval)
    }

    #[test]
    fn test_milestone_enters_review() {
        let mut progression = controller(&[2, 5], 0);
        assert_eq!(progression.record_battle(), Ok(1));
        assert_eq!(progression.state(), ProgressionState::Battling);
        assert_eq!(progression.record_battle(), Ok(2));
        assert_eq!(
            progression.state(),
            ProgressionState::MilestoneReview { battle_count: 2 }
        );
    }

    #[test]
    fn test_review_blocks_battles_until_continued() {
        let mut progression = controller(&[1], 0);
        progression.record_battle().unwrap();
        assert_eq!(
            progression.record_battle(),
            Err(ProgressionError::MilestoneReviewPending { battle_count: 1 })
        );
        assert_eq!(progression.total_battles(), 1);

        assert_eq!(progression.continue_battles(), Ok(1));
        assert_eq!(
            progression.continue_battles(),
            Err(ProgressionError::NotInMilestoneReview)
        );
        assert_eq!(progression.record_battle(), Ok(2));
    }

    #[test]
    fn test_interval_after_last_milestone() {
        let progression = controller(&[10, 25], 100);
        assert!(progression.is_milestone(25));
        assert!(progression.is_milestone(125));
        assert!(progression.is_milestone(225));
        assert!(!progression.is_milestone(100));
        assert!(!progression.is_milestone(0));

        let default = ProgressionController::default();
        assert!(default.is_milestone(1000));
        assert!(default.is_milestone(1250));
        assert!(!default.is_milestone(1100));
    }

    #[test]
    fn test_next_milestone_and_progress() {
        let mut progression = controller(&[10, 20], 0);
        assert_eq!(progression.next_milestone(), Some(10));
        assert_eq!(progression.progress(), 0.0);
        for _ in 0..5 {
            progression.record_battle().unwrap();
        }
        assert!((progression.progress() - 0.5).abs() < 1e-12);
        for _ in 0..5 {
            progression.record_battle().unwrap();
        }
        progression.continue_battles().unwrap();
        assert_eq!(progression.next_milestone(), Some(20));
        assert_eq!(progression.progress(), 0.0);

        for _ in 0..10 {
            let _ = progression.record_battle();
        }
        progression.continue_battles().unwrap();
        assert_eq!(progression.next_milestone(), None);
        assert_eq!(progression.progress(), 1.0);
    }

    #[test]
    fn test_next_milestone_with_interval() {
        let mut progression = controller(&[], 3);
        assert_eq!(progression.next_milestone(), Some(3));
        progression.restore(4, false);
        assert_eq!(progression.next_milestone(), Some(6));
    }

    #[test]
    fn test_reset_and_rewind() {
        let mut progression = controller(&[1], 0);
        assert_eq!(progression.rewind(), Err(ProgressionError::NoBattlesRecorded));
        progression.record_battle().unwrap();
        assert_eq!(progression.rewind(), Ok(1));
        assert_eq!(progression.total_battles(), 0);
        assert_eq!(progression.state(), ProgressionState::Battling);

        progression.record_battle().unwrap();
        progression.begin_reset();
        assert_eq!(progression.state(), ProgressionState::Resetting);
        progression.finish_reset();
        assert_eq!(progression.state(), ProgressionState::Battling);
        assert_eq!(progression.total_battles(), 0);
    }

    #[test]
    fn test_restore_review_pending() {
        let mut progression = ProgressionController::default();
        progression.restore(10, true);
        assert!(progression.is_in_review());
        progression.restore(0, true);
        assert!(!progression.is_in_review());
    }

    #[test]
    fn test_milestones_sanitised() {
        let progression = controller(&[25, 0, 10, 25], 0);
        assert_eq!(progression.milestones(), &[10, 25]);
    }
}

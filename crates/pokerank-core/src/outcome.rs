//! Immutable audit records of applied outcomes.

use crate::candidate::CandidateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSource {
    /// A battle the user played.
    Explicit,
    /// Synthesised from a manual reorder.
    Implied,
}

impl OutcomeSource {
    /// Returns the lowercase name used in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            OutcomeSource::Explicit => "explicit",
            OutcomeSource::Implied => "implied",
        }
    }
}

impl std::str::FromStr for OutcomeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(OutcomeSource::Explicit),
            "implied" => Ok(OutcomeSource::Implied),
            other => Err(format!("unknown outcome source: {other}")),
        }
    }
}

/// One win/loss observation applied to the rating store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub winner: CandidateId,
    pub loser: CandidateId,
    pub source: OutcomeSource,
    /// Human-readable tag, e.g. `battle 12` or `above1#40`.
    pub label: String,
    pub timestamp: DateTime<Utc>,
    /// Explicit battle number this outcome belongs to. `None` for implied outcomes.
    #[serde(default)]
    pub battle: Option<u32>,
}

impl BattleOutcome {
    /// Creates an outcome of explicit battle number `battle`.
    #[must_use]
    pub fn explicit(winner: CandidateId, loser: CandidateId, battle: u32) -> Self {
        Self {
            winner,
            loser,
            source: OutcomeSource::Explicit,
            label: format!("battle {battle}"),
            timestamp: Utc::now(),
            battle: Some(battle),
        }
    }

    /// Creates an implied outcome with the given label.
    #[must_use]
    pub fn implied(winner: CandidateId, loser: CandidateId, label: impl Into<String>) -> Self {
        Self {
            winner,
            loser,
            source: OutcomeSource::Implied,
            label: label.into(),
            timestamp: Utc::now(),
            battle: None,
        }
    }

    /// Returns true if the candidate took part in this outcome.
    pub fn involves(&self, id: CandidateId) -> bool {
        self.winner == id || self.loser == id
    }
}

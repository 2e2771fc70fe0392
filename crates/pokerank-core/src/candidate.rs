//! Candidate identity and the candidate pool.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable identifier of a rankable candidate (e.g. a national dex number).
///
/// Ids are totally ordered; the order is the tie-break key for rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u32);

impl CandidateId {
    /// Creates a new candidate id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        CandidateId(id)
    }

    /// Returns the raw id value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for CandidateId {
    fn from(id: u32) -> Self {
        CandidateId(id)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single rankable entity, supplied by an external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique id.
    pub id: CandidateId,
    /// Display name.
    pub name: String,
    /// Image reference (URL or asset key).
    #[serde(default)]
    pub image_ref: String,
    /// Type tags (e.g. "grass", "poison").
    #[serde(default)]
    pub type_tags: Vec<String>,
    /// Generation or category id used for pool filtering.
    #[serde(default)]
    pub category: Option<u32>,
}

impl Candidate {
    /// Creates a candidate with only an id and a name.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: CandidateId(id),
            name: name.into(),
            image_ref: String::new(),
            type_tags: Vec::new(),
            category: None,
        }
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    /// Sets the type tags.
    #[must_use]
    pub fn with_types<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the category id.
    #[must_use]
    pub fn with_category(mut self, category: u32) -> Self {
        self.category = Some(category);
        self
    }
}

/// Errors raised while building a [`CandidatePool`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Two candidates share the same id.
    #[error("duplicate candidate id: {0}")]
    DuplicateId(CandidateId),
}

/// The set of candidates the engine ranks, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    index: HashMap<CandidateId, usize>,
}

impl CandidatePool {
    /// Builds a pool, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DuplicateId`] if any id occurs twice.
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, PoolError> {
        let mut index = HashMap::with_capacity(candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            if index.insert(candidate.id, i).is_some() {
                return Err(PoolError::DuplicateId(candidate.id));
            }
        }
        Ok(Self { candidates, index })
    }

    /// Returns the number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Looks up a candidate by id.
    #[must_use]
    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.index.get(&id).map(|&i| &self.candidates[i])
    }

    /// Returns true if the pool contains the given id.
    #[must_use]
    pub fn contains(&self, id: CandidateId) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns all candidates in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Returns the candidates matching a category, or all of them when
    /// `category` is `None`.
    #[must_use]
    pub fn filtered(&self, category: Option<u32>) -> Vec<Candidate> {
        match category {
            None => self.candidates.clone(),
            Some(c) => self
                .candidates
                .iter()
                .filter(|candidate| candidate.category == Some(c))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> CandidatePool {
        CandidatePool::new(vec![
            Candidate::new(1, "Bulbasaur")
                .with_types(["grass", "poison"])
                .with_category(1),
            Candidate::new(4, "Charmander").with_types(["fire"]).with_category(1),
            Candidate::new(152, "Chikorita").with_types(["grass"]).with_category(2),
        ])
        .unwrap()
    }

    #[test]
    fn test_pool_lookup() {
        let pool = sample_pool();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(CandidateId(4)).unwrap().name, "Charmander");
        assert!(pool.get(CandidateId(7)).is_none());
        assert!(pool.contains(CandidateId(152)));
    }

    #[test]
    fn test_pool_rejects_duplicate_ids() {
        let result = CandidatePool::new(vec![Candidate::new(1, "A"), Candidate::new(1, "B")]);
        assert_eq!(result.unwrap_err(), PoolError::DuplicateId(CandidateId(1)));
    }

    #[test]
    fn test_filter_by_category() {
        let pool = sample_pool();
        let gen1 = pool.filtered(Some(1));
        assert_eq!(gen1.len(), 2);
        assert!(gen1.iter().all(|c| c.category == Some(1)));
        assert_eq!(pool.filtered(None).len(), 3);
        assert!(pool.filtered(Some(9)).is_empty());
    }

    #[test]
    fn test_candidate_deserializes_with_defaults() {
        let json = r#"{"id": 25, "name": "Pikachu"}"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id, CandidateId(25));
        assert!(candidate.image_ref.is_empty());
        assert!(candidate.type_tags.is_empty());
        assert!(candidate.category.is_none());
    }

    #[test]
    fn test_display_id() {
        assert_eq!(CandidateId(25).to_string(), "#25");
    }
}

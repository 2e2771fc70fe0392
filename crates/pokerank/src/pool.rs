//! Loading the candidate catalog from a JSON file.

use pokerank_core::{Candidate, CandidatePool, PoolError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolLoadError {
    #[error("Failed to read pool file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse pool file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] PoolError),
}

/// Reads a JSON array of candidates.
pub fn load_pool<P: AsRef<Path>>(path: P) -> Result<CandidatePool, PoolLoadError> {
    let content = std::fs::read_to_string(path)?;
    parse_pool(&content)
}

pub fn parse_pool(content: &str) -> Result<CandidatePool, PoolLoadError> {
    let candidates: Vec<Candidate> = serde_json::from_str(content)?;
    Ok(CandidatePool::new(candidates)?)
}

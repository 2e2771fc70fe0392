//! SQLite persistence for ranking sessions.
//!
//! This crate stores a [`PersistedState`] in a small set of tables so a
//! session can be resumed after the process exits. The engine itself never
//! touches the database; callers save after each operation.

use chrono::{DateTime, Utc};
use pokerank_core::{
    BattleOutcome, BattleType, CandidateId, MilestoneSnapshot, OutcomeSource, PersistedCandidate,
    PersistedState, RefinementEntry,
};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading or writing session state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// An id list could not be encoded or decoded as JSON.
    #[error("Failed to encode id list: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored timestamp is not valid RFC 3339.
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    /// A stored value does not map to a known variant.
    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: &'static str, value: String },
}

const TOTAL_BATTLES: &str = "total_battles";
const REVIEW_PENDING: &str = "review_pending";
const BATTLE_TYPE: &str = "battle_type";

/// SQLite-backed store for a single ranking session.
///
/// # Example
///
/// ```ignore
/// let mut store = SqliteStateStore::open("data/pokerank.db")?;
/// store.save(&engine.to_persisted())?;
/// let state = store.load()?;
/// ```
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates a database at the given path.
    ///
    /// The schema is created on first open. Pass `":memory:"` for a
    /// throwaway database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or if schema
    /// initialization fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS ratings (
                candidate_id INTEGER PRIMARY KEY,
                mu REAL NOT NULL,
                sigma REAL NOT NULL,
                battle_count INTEGER NOT NULL DEFAULT 0,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS outcomes (
                seq INTEGER PRIMARY KEY,
                winner INTEGER NOT NULL,
                loser INTEGER NOT NULL,
                source TEXT NOT NULL,
                label TEXT NOT NULL,
                battle INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS milestones (
                battle_count INTEGER PRIMARY KEY,
                ordered_ids TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS refinement_queue (
                position INTEGER PRIMARY KEY,
                candidate_id INTEGER NOT NULL,
                opponents TEXT NOT NULL,
                enqueued_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS globals (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Replaces the stored session with `state`.
    ///
    /// All tables are rewritten inside one transaction, so a failed save
    /// leaves the previous session intact.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; the transaction is rolled back.
    pub fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        clear_tables(&tx)?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO ratings (candidate_id, mu, sigma, battle_count, wins, losses)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for c in &state.candidates {
                stmt.execute(params![c.id.get(), c.mu, c.sigma, c.battle_count, c.wins, c.losses])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO outcomes (seq, winner, loser, source, label, battle, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (seq, o) in state.outcome_history.iter().enumerate() {
                stmt.execute(params![
                    seq as i64,
                    o.winner.get(),
                    o.loser.get(),
                    o.source.as_str(),
                    o.label,
                    o.battle,
                    o.timestamp.to_rfc3339(),
                ])?;
            }

            let mut stmt =
                tx.prepare("INSERT INTO milestones (battle_count, ordered_ids) VALUES (?1, ?2)")?;
            for snapshot in &state.milestone_list {
                let ids = serde_json::to_string(snapshot.ordered_ids())?;
                stmt.execute(params![snapshot.battle_count(), ids])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO refinement_queue (position, candidate_id, opponents, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, entry) in state.refinement_queue.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    entry.candidate.get(),
                    serde_json::to_string(&entry.opponents)?,
                    entry.enqueued_at.to_rfc3339(),
                ])?;
            }

            let mut stmt = tx.prepare("INSERT INTO globals (key, value) VALUES (?1, ?2)")?;
            stmt.execute(params![TOTAL_BATTLES, state.total_battles.to_string()])?;
            stmt.execute(params![REVIEW_PENDING, state.review_pending.to_string()])?;
            stmt.execute(params![BATTLE_TYPE, state.battle_type.to_string()])?;
        }

        tx.commit()?;
        tracing::debug!(
            "Saved {} ratings and {} outcomes",
            state.candidates.len(),
            state.outcome_history.len()
        );
        Ok(())
    }

    /// Loads the stored session.
    ///
    /// # Returns
    ///
    /// `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a stored value is malformed.
    pub fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let Some(total_battles) = self.global(TOTAL_BATTLES)? else {
            return Ok(None);
        };
        let total_battles = parse_value(TOTAL_BATTLES, &total_battles)?;
        let review_pending = match self.global(REVIEW_PENDING)? {
            Some(value) => parse_value(REVIEW_PENDING, &value)?,
            None => false,
        };
        let battle_type: BattleType = match self.global(BATTLE_TYPE)? {
            Some(value) => parse_value(BATTLE_TYPE, &value)?,
            None => BattleType::default(),
        };

        Ok(Some(PersistedState {
            candidates: self.load_candidates()?,
            total_battles,
            outcome_history: self.load_outcomes()?,
            milestone_list: self.load_milestones()?,
            refinement_queue: self.load_queue()?,
            review_pending,
            battle_type,
        }))
    }

    /// Deletes the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        clear_tables(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn global(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM globals WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn load_candidates(&self) -> Result<Vec<PersistedCandidate>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT candidate_id, mu, sigma, battle_count, wins, losses
             FROM ratings ORDER BY candidate_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PersistedCandidate {
                id: CandidateId(row.get(0)?),
                mu: row.get(1)?,
                sigma: row.get(2)?,
                battle_count: row.get(3)?,
                wins: row.get(4)?,
                losses: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn load_outcomes(&self) -> Result<Vec<BattleOutcome>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT winner, loser, source, label, battle, created_at
             FROM outcomes ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<u32>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut outcomes = Vec::new();
        for row in rows {
            let (winner, loser, source, label, battle, created_at) = row?;
            let source: OutcomeSource = source
                .parse()
                .map_err(|_| StoreError::InvalidValue {
                    column: "source",
                    value: source.clone(),
                })?;
            outcomes.push(BattleOutcome {
                winner: CandidateId(winner),
                loser: CandidateId(loser),
                source,
                label,
                timestamp: parse_timestamp(&created_at)?,
                battle,
            });
        }
        Ok(outcomes)
    }

    fn load_milestones(&self) -> Result<Vec<MilestoneSnapshot>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT battle_count, ordered_ids FROM milestones ORDER BY battle_count")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (battle_count, ids) = row?;
            let ids: Vec<CandidateId> = serde_json::from_str(&ids)?;
            snapshots.push(MilestoneSnapshot::new(battle_count, ids));
        }
        Ok(snapshots)
    }

    fn load_queue(&self) -> Result<Vec<RefinementEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT candidate_id, opponents, enqueued_at FROM refinement_queue ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (candidate, opponents, enqueued_at) = row?;
            entries.push(RefinementEntry {
                candidate: CandidateId(candidate),
                opponents: serde_json::from_str(&opponents)?,
                enqueued_at: parse_timestamp(&enqueued_at)?,
            });
        }
        Ok(entries)
    }
}

fn clear_tables(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(
        "
        DELETE FROM ratings;
        DELETE FROM outcomes;
        DELETE FROM milestones;
        DELETE FROM refinement_queue;
        DELETE FROM globals;
        ",
    )?;
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn parse_value<T: std::str::FromStr>(column: &'static str, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

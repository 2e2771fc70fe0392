//! Plain-text rendering of rankings, battles and the refinement queue.

use pokerank_core::{Candidate, CandidatePool, MilestoneSnapshot, RankingEntry, RefinementQueue};
use std::fmt::Write;

fn name_of(pool: &CandidatePool, id: pokerank_core::CandidateId) -> String {
    pool.get(id).map_or_else(|| id.to_string(), |c| c.name.clone())
}

/// Ranking table, best first.
pub fn format_rankings(entries: &[RankingEntry], limit: Option<usize>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<16} {:>7} {:>6} {:>7}  {:>3}-{:<3}",
        "rank", "name", "score", "conf", "mu", "W", "L"
    );
    let shown = limit.unwrap_or(entries.len());
    for (rank, entry) in entries.iter().take(shown).enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<16} {:>7.2} {:>5.0}% {:>7.2}  {:>3}-{:<3}",
            rank + 1,
            entry.display_name(),
            entry.score,
            entry.confidence,
            entry.mu,
            entry.stats.wins,
            entry.stats.losses
        );
    }
    if entries.is_empty() {
        out.push_str("  (no ranked candidates yet)\n");
    }
    out
}

/// Numbered participant list for a battle prompt.
pub fn format_battle(battle_number: u32, battle: &[Candidate]) -> String {
    let mut out = format!("Battle {battle_number}\n");
    for (i, candidate) in battle.iter().enumerate() {
        let _ = write!(out, "  [{}] {}", i + 1, candidate.name);
        if !candidate.type_tags.is_empty() {
            let _ = write!(out, " ({})", candidate.type_tags.join("/"));
        }
        out.push('\n');
    }
    out
}

pub fn format_snapshot(snapshot: &MilestoneSnapshot, pool: &CandidatePool) -> String {
    let mut out = format!("Ranking at {} battles\n", snapshot.battle_count());
    for (rank, &id) in snapshot.ordered_ids().iter().enumerate() {
        let _ = writeln!(out, "{:>4}  {}", rank + 1, name_of(pool, id));
    }
    out
}

pub fn format_queue(queue: &RefinementQueue, pool: &CandidatePool) -> String {
    if queue.is_empty() {
        return "Refinement queue is empty\n".to_string();
    }
    let mut out = String::new();
    for entry in queue.iter() {
        let opponents: Vec<String> = entry.opponents.iter().map(|&id| name_of(pool, id)).collect();
        let _ = writeln!(
            out,
            "{} vs {}",
            name_of(pool, entry.candidate),
            if opponents.is_empty() {
                "(random)".to_string()
            } else {
                opponents.join(", ")
            }
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokerank_core::{BattleStat, CandidateId};

    fn entry(id: u32, name: &str, score: f64) -> RankingEntry {
        RankingEntry {
            id: CandidateId(id),
            candidate: Some(Candidate::new(id, name)),
            score,
            confidence: 12.0,
            mu: score + 10.0,
            sigma: 3.0,
            stats: BattleStat {
                battle_count: 3,
                wins: 2,
                losses: 1,
            },
        }
    }

    #[test]
    fn test_rankings_respect_limit() {
        let entries = vec![entry(1, "Bulbasaur", 5.0), entry(4, "Charmander", 3.0)];
        let table = format_rankings(&entries, Some(1));
        assert!(table.contains("Bulbasaur"));
        assert!(!table.contains("Charmander"));
        assert!(table.contains("2-1"));
    }

    #[test]
    fn test_empty_rankings_message() {
        assert!(format_rankings(&[], None).contains("no ranked candidates"));
    }

    #[test]
    fn test_battle_lists_numbered_participants() {
        let battle = vec![
            Candidate::new(1, "Bulbasaur").with_types(["grass", "poison"]),
            Candidate::new(7, "Squirtle"),
        ];
        let text = format_battle(3, &battle);
        assert!(text.starts_with("Battle 3"));
        assert!(text.contains("[1] Bulbasaur (grass/poison)"));
        assert!(text.contains("[2] Squirtle"));
    }

    #[test]
    fn test_snapshot_falls_back_to_id() {
        let pool = CandidatePool::new(vec![Candidate::new(1, "Bulbasaur")]).unwrap();
        let snapshot = MilestoneSnapshot::new(10, vec![CandidateId(1), CandidateId(99)]);
        let text = format_snapshot(&snapshot, &pool);
        assert!(text.contains("1  Bulbasaur"));
        assert!(text.contains("2  #99"));
    }
}

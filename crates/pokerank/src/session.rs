//! Interactive battle loop over any line-based input and output.

use crate::display::{format_battle, format_rankings, format_snapshot};
use pokerank_core::{Candidate, EngineError, ProgressionState, RankingEngine};
use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// One line of user input during a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 1-based participant numbers of the winners.
    Winners(Vec<usize>),
    Undo,
    /// Flag the n-th participant (1-based) for refinement.
    Flag(usize),
    Quit,
}

/// Parses a command for a battle of `size` participants.
pub fn parse_command(line: &str, size: usize) -> Result<Command, String> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => Err("enter a participant number".to_string()),
        Some("q") | Some("quit") => Ok(Command::Quit),
        Some("u") | Some("undo") => Ok(Command::Undo),
        Some("f") | Some("flag") => {
            let n = parts
                .next()
                .ok_or_else(|| "usage: f <number>".to_string())?;
            Ok(Command::Flag(parse_slot(n, size)?))
        }
        Some(_) => {
            let winners = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(|s| parse_slot(s, size))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Winners(winners))
        }
    }
}

fn parse_slot(s: &str, size: usize) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if (1..=size).contains(&n) => Ok(n),
        _ => Err(format!("'{s}' is not a number between 1 and {size}")),
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    CountReached,
    InputClosed,
    /// No further battle could be selected.
    Exhausted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Battles submitted during this session.
    pub battles: u32,
    pub end: SessionEnd,
}

/// Runs battles until the user quits, input ends, or `max_battles` have
/// been submitted. `persist` is called after every change; a failed save is
/// logged and the session keeps its in-memory state.
pub fn run_session<R, W, F, E>(
    engine: &mut RankingEngine,
    input: &mut R,
    output: &mut W,
    max_battles: Option<u32>,
    mut persist: F,
) -> io::Result<SessionSummary>
where
    R: BufRead,
    W: Write,
    F: FnMut(&RankingEngine) -> Result<(), E>,
    E: Display,
{
    let mut battles = 0;
    let end = loop {
        if let ProgressionState::MilestoneReview { battle_count } = engine.state() {
            match review_milestone(engine, battle_count, input, output)? {
                Some(end) => break end,
                None => save(&mut persist, engine),
            }
        }
        if max_battles.is_some_and(|max| battles >= max) {
            break SessionEnd::CountReached;
        }

        let battle = match engine.next_battle() {
            Ok(battle) => battle,
            Err(err) => {
                writeln!(output, "No battle available: {err}")?;
                break SessionEnd::Exhausted(err.to_string());
            }
        };

        match play_battle(engine, &battle, input, output, &mut persist)? {
            Step::Submitted => battles += 1,
            Step::Undone => battles = battles.saturating_sub(1),
            Step::Skipped => {}
            Step::End(end) => break end,
        }
    };

    writeln!(output, "{} battles this session, {} total", battles, engine.total_battles())?;
    Ok(SessionSummary { battles, end })
}

enum Step {
    Submitted,
    Undone,
    /// The battle was dropped without a result.
    Skipped,
    End(SessionEnd),
}

fn save<F, E>(persist: &mut F, engine: &RankingEngine)
where
    F: FnMut(&RankingEngine) -> Result<(), E>,
    E: Display,
{
    if let Err(e) = persist(engine) {
        tracing::warn!("Failed to save session: {}", e);
    }
}

fn play_battle<R, W, F, E>(
    engine: &mut RankingEngine,
    battle: &[Candidate],
    input: &mut R,
    output: &mut W,
    persist: &mut F,
) -> io::Result<Step>
where
    R: BufRead,
    W: Write,
    F: FnMut(&RankingEngine) -> Result<(), E>,
    E: Display,
{
    let ids: Vec<_> = battle.iter().map(|c| c.id).collect();
    write!(output, "{}", format_battle(engine.total_battles() + 1, battle))?;

    loop {
        write!(output, "winner(s), u = undo, f <n> = flag, q = quit > ")?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(Step::End(SessionEnd::InputClosed));
        };

        let command = match parse_command(&line, battle.len()) {
            Ok(command) => command,
            Err(message) => {
                writeln!(output, "{message}")?;
                continue;
            }
        };

        match command {
            Command::Quit => return Ok(Step::End(SessionEnd::Quit)),
            Command::Undo => match engine.undo_last_battle() {
                Ok(number) => {
                    writeln!(output, "Undid battle {number}")?;
                    save(persist, engine);
                    return Ok(Step::Undone);
                }
                Err(err) => writeln!(output, "{err}")?,
            },
            Command::Flag(slot) => {
                let candidate = &battle[slot - 1];
                if engine.enqueue_refinement(candidate.id) {
                    writeln!(output, "Flagged {} for refinement", candidate.name)?;
                    save(persist, engine);
                } else {
                    writeln!(output, "{} is already flagged", candidate.name)?;
                }
            }
            Command::Winners(slots) => {
                let winners: Vec<_> = slots.iter().map(|&slot| ids[slot - 1]).collect();
                match engine.submit_battle_result(engine.battle_type(), &ids, &winners) {
                    Ok(_) => {
                        save(persist, engine);
                        return Ok(Step::Submitted);
                    }
                    Err(EngineError::Battle(err)) => writeln!(output, "{err}")?,
                    Err(err) => {
                        writeln!(output, "{err}")?;
                        return Ok(Step::Skipped);
                    }
                }
            }
        }
    }
}

/// Shows the frozen ranking and asks whether to go on. Returns the end
/// reason if the user stops here.
fn review_milestone<R: BufRead, W: Write>(
    engine: &mut RankingEngine,
    battle_count: u32,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<SessionEnd>> {
    writeln!(output, "\nMilestone reached!")?;
    match engine.get_milestone_snapshot(battle_count) {
        Some(snapshot) => write!(output, "{}", format_snapshot(snapshot, engine.pool()))?,
        None => write!(output, "{}", format_rankings(&engine.get_rankings(), None))?,
    }

    loop {
        write!(output, "continue battling? [y/n] > ")?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(Some(SessionEnd::InputClosed));
        };
        match line.trim() {
            "y" | "yes" | "" => {
                if let Err(err) = engine.continue_from_milestone() {
                    tracing::warn!("Could not leave milestone review: {}", err);
                }
                return Ok(None);
            }
            "n" | "no" | "q" => return Ok(Some(SessionEnd::Quit)),
            _ => writeln!(output, "answer y or n")?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

//! Line-oriented interactive game over any reader/writer pair.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use twentyq_core::game::{FinishReport, GameState};
use twentyq_core::model::answer::Answer;
use twentyq_core::select::Selection;
use twentyq_core::store::DataStore;

const ANSWER_PROMPT: &str = "[y/n/u/undo/quit]";

/// How an interactive session ended.
#[derive(Debug)]
pub enum PlayOutcome {
    Finished(FinishReport),
    /// The player quit; carries the serialized session for a later resume.
    Suspended(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Answer(Answer),
    Undo,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "undo" | "back" => Some(Command::Undo),
        "quit" | "q" | "exit" => Some(Command::Quit),
        other => other.parse().ok().map(Command::Answer),
    }
}

/// Reads one line; `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("reading player input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Plays until a guess is confirmed or corrected, or the player quits.
/// End of input counts as quitting, and a game the store refuses to record
/// is suspended rather than lost.
pub fn run<S, R, W>(
    store: &mut S,
    mut state: GameState,
    input: &mut R,
    output: &mut W,
) -> Result<PlayOutcome>
where
    S: DataStore + ?Sized,
    R: BufRead,
    W: Write,
{
    loop {
        let ready = state.game_finished() || state.confident(&*store)?;
        let selection = if ready {
            Selection::Exhausted
        } else {
            state.ask(&*store)?
        };

        let Selection::Ask { question, .. } = selection else {
            return guess(store, state, input, output);
        };

        write!(
            output,
            "Q{}: {} {ANSWER_PROMPT} ",
            state.question_number(),
            question.text
        )?;
        output.flush()?;

        let Some(line) = read_line(input)? else {
            return suspend(&state, output);
        };
        match parse_command(&line) {
            Some(Command::Answer(answer)) => {
                let report = state.answer(&*store, &question.text, answer)?;
                if !report.is_clean() {
                    tracing::debug!(
                        target: "twentyq::play",
                        missing = report.missing.len(),
                        message = "answered question has gaps in its statistics"
                    );
                }
            }
            Some(Command::Undo) => {
                if state.undo(&*store)?.is_none() {
                    writeln!(output, "Nothing to undo.")?;
                }
            }
            Some(Command::Quit) => return suspend(&state, output),
            None => writeln!(output, "Please answer {ANSWER_PROMPT}.")?,
        }
    }
}

fn guess<S, R, W>(
    store: &mut S,
    mut state: GameState,
    input: &mut R,
    output: &mut W,
) -> Result<PlayOutcome>
where
    S: DataStore + ?Sized,
    R: BufRead,
    W: Write,
{
    let top = state
        .top_guess(&*store)?
        .map(|candidate| (candidate.name.clone(), candidate.probability));

    let solution = match top {
        Some((name, probability)) => {
            write!(
                output,
                "Is it {name}? ({:.0}% sure) [y/n] ",
                probability * 100.0
            )?;
            output.flush()?;
            let Some(line) = read_line(input)? else {
                return suspend(&state, output);
            };
            if matches!(parse_command(&line), Some(Command::Answer(Answer::Yes))) {
                writeln!(output, "Got it!")?;
                name
            } else {
                match ask_solution(input, output)? {
                    Some(solution) => solution,
                    None => return suspend(&state, output),
                }
            }
        }
        None => match ask_solution(input, output)? {
            Some(solution) => solution,
            None => return suspend(&state, output),
        },
    };

    let report = match state.finish(store, &solution) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(
                target: "twentyq::play",
                solution = solution.as_str(),
                error = %err.source,
                message = "game not recorded; keeping the session"
            );
            writeln!(output, "Could not record the game: {}", err.source)?;
            return suspend(&err.into_state(), output);
        }
    };
    if let Some(rank) = report.solution_rank() {
        writeln!(output, "{solution} was ranked #{rank}.")?;
    } else {
        writeln!(output, "{solution} is new to me. Thanks!")?;
    }
    Ok(PlayOutcome::Finished(report))
}

fn ask_solution<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<String>> {
    loop {
        write!(output, "What were you thinking of? ")?;
        output.flush()?;
        match read_line(input)? {
            None => return Ok(None),
            Some(line) if line.is_empty() => continue,
            Some(line) => return Ok(Some(line)),
        }
    }
}

fn suspend<W: Write>(state: &GameState, output: &mut W) -> Result<PlayOutcome> {
    writeln!(output, "Game saved after {} answers.", state.history().len())?;
    let payload = state.serialize().context("serializing session")?;
    Ok(PlayOutcome::Suspended(payload))
}

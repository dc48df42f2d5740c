//! Interactive command loop over a [`Session`].

use std::io::{self, Write};

use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;
use tracing::info;

use crate::{ops::OperationRegistry, session::Session};

/// Failures that end the loop.
#[derive(Debug, Error)]
pub enum ReplError {
    /// Line editor failure other than Ctrl-C/Ctrl-D.
    #[error("line editor: {0}")]
    Readline(#[from] ReadlineError),
    /// Output could not be written.
    #[error("output: {0}")]
    Io(#[from] io::Error),
}

/// Source of input lines. `None` means the user ended input.
pub trait Prompt {
    /// Shows `prompt` and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError>;
}

/// [`Prompt`] backed by a `rustyline` editor with in-memory line history.
pub struct EditorPrompt {
    editor: DefaultEditor,
}

impl EditorPrompt {
    /// Opens the terminal editor.
    pub fn new() -> Result<Self, ReplError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompt for EditorPrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the named registered operation.
    Calculate(String),
    /// List the history.
    History,
    /// Empty the history.
    Clear,
    /// Undo the last change.
    Undo,
    /// Redo the last undone change.
    Redo,
    /// Write the history file.
    Save,
    /// Read the history file.
    Load,
    /// Show available commands.
    Help,
    /// Save and leave.
    Exit,
    /// Blank line.
    Empty,
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Control words win over operation names; operation names are matched
    /// against `registry`.
    pub fn parse(line: &str, registry: &OperationRegistry) -> Self {
        let word = line.trim().to_lowercase();
        match word.as_str() {
            "" => Command::Empty,
            "history" => Command::History,
            "clear" => Command::Clear,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "save" => Command::Save,
            "load" => Command::Load,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            name if registry.contains(name) => Command::Calculate(word),
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Leave the loop.
    Exit,
}

/// Help text listing every operation currently in `registry`.
pub fn render_help(registry: &OperationRegistry) -> String {
    let ops = registry.list().into_iter().collect::<Vec<_>>().join(", ");
    format!(
        "Available commands:\n  \
         {ops} - Perform calculations\n  \
         history - Show calculation history\n  \
         clear - Clear calculation history\n  \
         undo - Undo the last change\n  \
         redo - Redo the last undone change\n  \
         save - Save calculation history to file\n  \
         load - Load calculation history from file\n  \
         help - Show this help\n  \
         exit - Save history and exit"
    )
}

/// Runs one command. Every session error is printed as a single line.
pub fn run_command<P, W>(
    session: &mut Session,
    command: Command,
    prompt: &mut P,
    out: &mut W,
) -> Result<Flow, ReplError>
where
    P: Prompt + ?Sized,
    W: Write + ?Sized,
{
    match command {
        Command::Calculate(name) => {
            writeln!(out, "\nEnter numbers (or 'cancel' to abort):")?;
            let Some(a) = read_operand(prompt, "First number: ")? else {
                writeln!(out, "Operation cancelled.")?;
                return Ok(Flow::Continue);
            };
            let Some(b) = read_operand(prompt, "Second number: ")? else {
                writeln!(out, "Operation cancelled.")?;
                return Ok(Flow::Continue);
            };
            match session.execute(&name, &a, &b) {
                Ok(calc) => writeln!(out, "Result: {}", session.format_result(&calc))?,
                Err(err) => writeln!(out, "Error: {err}")?,
            }
        }
        Command::History => {
            let history = session.history();
            if history.is_empty() {
                writeln!(out, "No calculations yet.")?;
            } else {
                writeln!(out, "\nCalculation History:")?;
                for (i, calc) in history.iter().enumerate() {
                    writeln!(out, "  {}. {calc}", i + 1)?;
                }
            }
        }
        Command::Clear => {
            session.clear();
            writeln!(out, "History cleared.")?;
        }
        Command::Undo => {
            let msg = if session.undo() { "Operation undone." } else { "Nothing to undo." };
            writeln!(out, "{msg}")?;
        }
        Command::Redo => {
            let msg = if session.redo() { "Operation redone." } else { "Nothing to redo." };
            writeln!(out, "{msg}")?;
        }
        Command::Save => match session.save() {
            Ok(rows) => writeln!(out, "History saved successfully ({rows} entries).")?,
            Err(err) => writeln!(out, "Error saving history: {err}")?,
        },
        Command::Load => match session.load() {
            Ok(rows) => writeln!(out, "History loaded successfully ({rows} entries).")?,
            Err(err) => writeln!(out, "Error loading history: {err}")?,
        },
        Command::Help => writeln!(out, "\n{}", render_help(session.registry()))?,
        Command::Exit => {
            match session.save() {
                Ok(_) => writeln!(out, "History saved. Goodbye!")?,
                Err(err) => writeln!(out, "Warning: failed to save history: {err}\nGoodbye!")?,
            }
            return Ok(Flow::Exit);
        }
        Command::Empty => {}
        Command::Unknown(word) => {
            writeln!(out, "Unknown command: '{word}'. Type 'help' for available commands.")?;
        }
    }
    Ok(Flow::Continue)
}

/// Reads commands until `exit` or end of input. End of input behaves like
/// `exit`.
pub fn run<P, W>(session: &mut Session, prompt: &mut P, out: &mut W) -> Result<(), ReplError>
where
    P: Prompt + ?Sized,
    W: Write + ?Sized,
{
    writeln!(out, "Calculator started. Type 'help' for commands.")?;
    loop {
        let command = match prompt.read_line("\nEnter command: ")? {
            Some(line) => Command::parse(&line, session.registry()),
            None => {
                writeln!(out, "\nInput terminated. Exiting...")?;
                Command::Exit
            }
        };
        if run_command(session, command, prompt, out)? == Flow::Exit {
            break;
        }
    }
    info!("repl finished");
    Ok(())
}

fn read_operand<P>(prompt: &mut P, label: &str) -> Result<Option<String>, ReplError>
where
    P: Prompt + ?Sized,
{
    Ok(prompt
        .read_line(label)?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.eq_ignore_ascii_case("cancel")))
}

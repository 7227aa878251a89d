//! selql is an interactive front end for a small SQL SELECT dialect. It reads
//! query lines, scans and parses them, and prints the resulting syntax tree.
//! Command history is stored in .selql.history.

#![warn(clippy::all)]

use std::path::PathBuf;

use clap::Parser as _;
use itertools::Itertools as _;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, Modifiers};
use rustyline_derive::{Completer, Helper, Highlighter, Hinter};

use selql::errinput;
use selql::error::Result;
use selql::sql::parser::{Parser, Scanner, TokenKind};

fn main() {
    if let Err(error) = Command::parse().run() {
        eprintln!("Error: {error}");
    }
}

/// The selql command.
#[derive(clap::Parser)]
#[command(about = "A SQL SELECT parser shell.", version, propagate_version = true)]
struct Command {
    /// A query to parse and print, then exit.
    #[arg()]
    query: Option<String>,
}

impl Command {
    /// Runs the command.
    fn run(self) -> Result<()> {
        let mut shell = Shell::new()?;
        match self.query {
            Some(query) => {
                shell.execute(&query);
                Ok(())
            }
            None => shell.run(),
        }
    }
}

/// An interactive selql shell.
struct Shell {
    /// The Rustyline command editor.
    editor: Editor<InputValidator, DefaultHistory>,
    /// The path to the history file, if any.
    history_path: Option<PathBuf>,
}

impl Shell {
    /// Creates a new shell.
    fn new() -> Result<Self> {
        // Set up Rustyline. Make sure multiline pastes are handled normally.
        let mut editor = Editor::new()?;
        editor.set_helper(Some(InputValidator));
        editor.bind_sequence(
            rustyline::KeyEvent(rustyline::KeyCode::BracketedPasteStart, Modifiers::NONE),
            rustyline::Cmd::Noop,
        );
        let history_path =
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".selql.history"));
        Ok(Self { editor, history_path })
    }

    /// Executes a query line or ! command. Diagnostics go to stderr and never
    /// terminate the shell.
    fn execute(&mut self, input: &str) {
        if input.starts_with('!') {
            if let Err(error) = self.execute_command(input) {
                eprintln!("Error: {error}");
            }
        } else if !input.is_empty() {
            self.execute_query(input);
        }
    }

    /// Executes a selql ! command (e.g. !help).
    fn execute_command(&mut self, input: &str) -> Result<()> {
        let mut input = input.split_ascii_whitespace();
        let Some(command) = input.next() else {
            return errinput!("expected command");
        };
        let args = input.collect_vec();

        match (command, args.as_slice()) {
            // Displays help.
            ("!help", []) => println!(
                r#"
Enter a query terminated by a semicolon (;) to parse it and print its syntax
tree, or Ctrl-D to exit. The following commands are also available:

    !help              This help message
    !tokens QUERY      Display the token sequence of a query
"#
            ),
            ("!help", _) => return errinput!("!help takes no arguments"),

            // Displays the token sequence of a query, one token per line.
            ("!tokens", []) => return errinput!("!tokens takes a query"),
            ("!tokens", args) => {
                let query = args.iter().join(" ");
                let (tokens, errors) = Scanner::new(&query).scan();
                for error in errors {
                    eprintln!("{error}");
                }
                for token in tokens {
                    println!("{} {}", token.kind, token.lexeme);
                }
            }

            (command, _) => return errinput!("unknown command {command}"),
        }
        Ok(())
    }

    /// Scans and parses a query, printing the syntax tree on success. Lexical
    /// errors don't stop the parse: the scanner always yields a full token
    /// sequence, and the parse reports its own diagnostics against it.
    fn execute_query(&mut self, input: &str) {
        let (tokens, errors) = Scanner::new(input).scan();
        for error in errors {
            eprintln!("{error}");
        }
        match Parser::new(tokens).parse() {
            Ok(query) => println!("{query}"),
            Err(error) => eprintln!("{error}"),
        }
    }

    /// Prompts the user for input.
    fn prompt(&mut self) -> rustyline::Result<String> {
        self.editor.readline("selql> ")
    }

    /// Runs the interactive shell.
    fn run(&mut self) -> Result<()> {
        // Load the history file, if any.
        if let Some(history_path) = &self.history_path {
            match self.editor.load_history(history_path) {
                Ok(()) => {}
                Err(ReadlineError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(error.into()),
            }
        }

        println!("Enter a query terminated by ; to parse it, or !help for instructions.");

        // Prompt for queries and execute them.
        loop {
            let input = match self.prompt() {
                Ok(input) => input.trim().to_string(),
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error.into()),
            };
            self.editor.add_history_entry(&input)?;
            self.execute(&input);
        }

        // Save the history file.
        if let Some(history_path) = &self.history_path {
            self.editor.save_history(history_path)?;
        }
        Ok(())
    }
}

/// A Rustyline helper for multiline editing. After a new line is entered, it
/// determines whether the input makes up a complete query that should be
/// parsed (i.e. it's terminated by ;), or wait for further input.
#[derive(Completer, Helper, Highlighter, Hinter)]
struct InputValidator;

impl Validator for InputValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        // Empty lines and ! commands are ready.
        if input.is_empty() || input.starts_with('!') || input == ";" {
            return Ok(ValidationResult::Valid(None));
        }
        // A query is ready once the scanner sees a semicolon. Lexical errors
        // also complete the input, so the parse can report them.
        let (tokens, errors) = Scanner::new(input).scan();
        if !errors.is_empty() || tokens.iter().any(|t| t.kind == TokenKind::Semicolon) {
            return Ok(ValidationResult::Valid(None));
        }
        // Otherwise, wait for more input.
        Ok(ValidationResult::Incomplete)
    }

    fn validate_while_typing(&self) -> bool {
        false // only check after completed lines
    }
}

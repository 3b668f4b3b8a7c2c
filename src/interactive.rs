use crate::error::{Result, TocError};
use crate::output_formats::{OutputFormat, OutputFormatter};
use crate::session::{FilterOutcome, Session};
use colored::*;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use log::info;

/// Records shown after each step
const DISPLAY_LIMIT: usize = 20;

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Filter(String),
    Backtrack(usize),
    Relevant(usize),
    Show,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> std::result::Result<Command, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Filter(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or("");
        let count = |default: usize, arg: Option<&str>| match arg {
            None => Ok(default),
            Some(n) => n
                .parse::<usize>()
                .map_err(|_| format!("expected a number, got '{n}'")),
        };

        match name {
            "b" | "back" => count(1, parts.next()).map(Command::Backtrack),
            "r" | "relevant" => count(5, parts.next()).map(Command::Relevant),
            "s" | "show" => Ok(Command::Show),
            "h" | "help" => Ok(Command::Help),
            "q" | "quit" => Ok(Command::Quit),
            other => Err(format!("unknown command ':{other}'")),
        }
    }
}

/// Prompt loop driving a session
pub struct InteractiveSearch {
    session: Session,
    formatter: OutputFormatter,
}

impl InteractiveSearch {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            formatter: OutputFormatter::new(OutputFormat::Text).with_limit(Some(DISPLAY_LIMIT)),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        info!("Starting interactive filter session");
        let theme = ColorfulTheme::default();
        self.display_help();
        self.display_state();

        loop {
            let line: String = Input::with_theme(&theme)
                .with_prompt(format!("filter [{}]", self.session.len()))
                .allow_empty(true)
                .interact_text()
                .map_err(|e| TocError::Other(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command),
                Err(message) => println!("{}", message.red()),
            }
        }
        Ok(())
    }

    /// Run one command; errors are reported and the session stays usable
    pub fn execute(&mut self, command: Command) {
        let outcome = match command {
            Command::Filter(term) => self.session.filter(&term).map(|outcome| match outcome {
                FilterOutcome::Exhausted => {
                    println!("{}", "A single record is left; nothing more to filter.".yellow())
                }
                FilterOutcome::Backtracked => {
                    println!("{}", "Nothing was left; stepped back one search.".yellow())
                }
                FilterOutcome::Narrowed { .. } => self.display_state(),
            }),
            Command::Backtrack(n) => self.session.backtrack(n).map(|_| self.display_state()),
            Command::Relevant(n) => {
                println!("{}", self.formatter.format_keywords(&self.session.relevant(n)));
                Ok(())
            }
            Command::Show => {
                self.display_state();
                Ok(())
            }
            Command::Help => {
                self.display_help();
                Ok(())
            }
            Command::Quit => Ok(()),
        };

        if let Err(e) = outcome {
            println!("{}", e.to_string().red());
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn display_state(&self) {
        println!("\n{}", self.formatter.format_session(&self.session));
    }

    fn display_help(&self) {
        println!("\n{}", "Interactive Commands:".green().bold());
        println!("  {} - Filter the current selection", "<term>".yellow());
        println!("  {} - Undo the last n searches", ":b [n]".yellow());
        println!("  {} - Most frequent keywords", ":r [n]".yellow());
        println!("  {} - Show the selection", ":s".yellow());
        println!("  {} - Quit", ":q".yellow());
    }
}

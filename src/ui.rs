//! Color-coded terminal messages.
//!
//! Every user-facing line carries one of four prefixes so a scrolled-back
//! install log can be scanned by category.

use std::fmt::Display;

use crossterm::style::{StyledContent, Stylize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Info,
    Success,
}

impl Level {
    pub fn prefix(self) -> &'static str {
        match self {
            Level::Error => "[ERROR]",
            Level::Warning => "[WARNING]",
            Level::Info => "[INFO]",
            Level::Success => "[SUCCESS]",
        }
    }

    fn styled(self) -> StyledContent<&'static str> {
        let prefix = self.prefix();
        match self {
            Level::Error => prefix.red().bold(),
            Level::Warning => prefix.yellow().bold(),
            Level::Info => prefix.blue().bold(),
            Level::Success => prefix.green().bold(),
        }
    }
}

pub fn message(level: Level, msg: impl Display) {
    match level {
        Level::Error | Level::Warning => eprintln!("{} {}", level.styled(), msg),
        Level::Info | Level::Success => println!("{} {}", level.styled(), msg),
    }
}

pub fn error(msg: impl Display) {
    message(Level::Error, msg);
}

pub fn warning(msg: impl Display) {
    message(Level::Warning, msg);
}

pub fn info(msg: impl Display) {
    message(Level::Info, msg);
}

pub fn success(msg: impl Display) {
    message(Level::Success, msg);
}

/// Indented continuation line under the previous message
pub fn detail(msg: impl Display) {
    println!("    {}", msg);
}

/// Report the error that ended the run, with its remediation if any
pub fn fatal(err: &crate::error::BootstrapError) {
    if matches!(err, crate::error::BootstrapError::Interrupted) {
        eprintln!();
    }
    error(err);
    if let Some(hint) = err.hint() {
        eprintln!("    {}", hint);
    }
}

pub fn heading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "=".repeat(title.chars().count()));
}

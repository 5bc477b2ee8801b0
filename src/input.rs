//! Where answers to interactive questions come from.
//!
//! The install and launch flows only talk to [`InputProvider`], so they run
//! the same against a terminal and against a scripted list of answers.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal,
};
use tracing::debug;

use crate::error::{BootstrapError, Result};
use crate::ui;

pub trait InputProvider {
    /// Show `prompt` and read one line. `Ok(None)` means input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Ask a yes/no question. Empty input (or exhausted input) picks `default`.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let prompt = format!("{} {} ", question, hint);
        loop {
            let Some(answer) = self.read_line(&prompt)? else {
                return Ok(default);
            };
            match parse_yes_no(&answer) {
                Some(choice) => return Ok(choice),
                None if answer.trim().is_empty() => return Ok(default),
                None => ui::warning("Please answer y or n."),
            }
        }
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prompt rendered by reedline: just the question text
struct SetupPrompt<'a> {
    text: &'a str,
}

impl Prompt for SetupPrompt<'_> {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        // Use ANSI reset code to ensure white/default terminal color
        Cow::Owned(format!("\x1b[0m{}", self.text))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse search) ", prefix))
    }
}

/// Reads answers from the user's terminal.
///
/// Uses a line editor when stdin is a TTY and plain buffered reads otherwise,
/// so answers can also be piped in.
pub struct TerminalInput {
    editor: Option<Reedline>,
}

impl TerminalInput {
    pub fn new() -> Self {
        let editor = io::stdin().is_terminal().then(Reedline::create);
        Self { editor }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProvider for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let Some(editor) = self.editor.as_mut() else {
            print!("{}", prompt);
            io::stdout()
                .flush()
                .map_err(|e| BootstrapError::io("writing prompt", e))?;

            let mut line = String::new();
            let read = io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| BootstrapError::io("reading answer", e))?;
            if read == 0 {
                return Ok(None);
            }
            return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        match editor.read_line(&SetupPrompt { text: prompt }) {
            Ok(Signal::Success(line)) => Ok(Some(line)),
            Ok(Signal::CtrlC) => {
                println!("^C");
                Err(BootstrapError::Interrupted)
            }
            Ok(Signal::CtrlD) => {
                println!("^D");
                Err(BootstrapError::Interrupted)
            }
            Err(e) => Err(BootstrapError::io("reading answer", e)),
        }
    }
}

/// Answers supplied up front, for headless runs and tests.
///
/// Every prompt shown is recorded so callers can check what was asked.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InputProvider for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        let answer = self.answers.pop_front();
        debug!(prompt, answered = answer.is_some(), "scripted answer");
        Ok(answer)
    }
}

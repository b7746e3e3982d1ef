//! Line-based prompts on the terminal.

use schemasync_engine::{DecisionProvider, SyncError, SyncResult};
use std::cell::RefCell;
use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};

/// [`DecisionProvider`] reading answers line by line.
pub struct TerminalDecisions<I, O> {
    input: RefCell<I>,
    output: RefCell<O>,
    interactive: bool,
}

impl TerminalDecisions<StdinLock<'static>, Stdout> {
    /// Prompts on stdout and reads stdin; interactive iff stdin is a terminal.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self::new(stdin.lock(), io::stdout(), interactive)
    }
}

impl<I: BufRead, O: Write> TerminalDecisions<I, O> {
    /// Creates a provider over arbitrary streams.
    pub fn new(input: I, output: O, interactive: bool) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
            interactive,
        }
    }

    fn ask(&self, prompt: &str) -> SyncResult<String> {
        {
            let mut output = self.output.borrow_mut();
            write!(output, "{}", prompt)?;
            output.flush()?;
        }
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Err(SyncError::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

impl<I: BufRead, O: Write> DecisionProvider for TerminalDecisions<I, O> {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, prompt: &str, default: bool) -> SyncResult<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.ask(&format!("? {} {} ", prompt, hint))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output.borrow_mut(), "Please answer yes or no.")?,
            }
        }
    }

    fn select(&self, prompt: &str, options: &[String], default: Option<&str>) -> SyncResult<String> {
        if options.is_empty() {
            return Err(SyncError::validation(format!("nothing to choose for \"{}\"", prompt)));
        }
        {
            let mut output = self.output.borrow_mut();
            writeln!(output, "? {}", prompt)?;
            for (i, option) in options.iter().enumerate() {
                let marker = if Some(option.as_str()) == default { " (default)" } else { "" };
                writeln!(output, "  {}) {}{}", i + 1, option, marker)?;
            }
        }
        loop {
            let answer = self.ask("> ")?;
            if answer.is_empty() {
                if let Some(default) = default {
                    return Ok(default.to_string());
                }
            } else if let Some(option) = options.iter().find(|o| **o == answer) {
                return Ok(option.clone());
            } else if let Some(option) = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i))
            {
                return Ok(option.clone());
            }
            writeln!(
                self.output.borrow_mut(),
                "Please pick a number between 1 and {}.",
                options.len()
            )?;
        }
    }
}

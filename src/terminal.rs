//! Line-based terminal I/O used by the drill sessions

use console::Term;

use crate::{Error, Result};

/// Screen and keyboard as seen by a drill session
///
/// One prompt per input call; input is read as a whole line.
pub trait Console {
    /// Clear the screen
    fn clear(&mut self);

    /// Print one line
    fn print_line(&mut self, text: &str);

    /// Show `prompt` on the current line and read the learner's reply
    ///
    /// # Errors
    ///
    /// Returns error if input cannot be read (e.g. stdin closed)
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Show `prompt` and wait for Enter
    ///
    /// # Errors
    ///
    /// Returns error if input cannot be read
    fn pause(&mut self, prompt: &str) -> Result<()> {
        self.read_line(prompt).map(|_| ())
    }
}

/// The real terminal on stdout/stdin
pub struct TerminalConsole {
    term: Term,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConsole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Console for TerminalConsole {
    fn clear(&mut self) {
        if let Err(e) = self.term.clear_screen() {
            tracing::debug!(error = %e, "failed to clear screen");
        }
    }

    fn print_line(&mut self, text: &str) {
        if let Err(e) = self.term.write_line(text) {
            tracing::debug!(error = %e, "failed to write to terminal");
        }
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.term.write_str(prompt)?;
        self.term.flush()?;

        if self.term.is_term() {
            return self
                .term
                .read_line()
                .map_err(|e| Error::Input(format!("failed to read input: {e}")));
        }

        // Piped input: treat end of stream as an error instead of endless empty answers
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Err(Error::Input("input stream closed".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

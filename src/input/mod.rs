//! Sensitive operator input.
//!
//! [`SecretInput`] hides where the secret comes from. [`HiddenInput`]
//! reads from the terminal with echo disabled; [`VisibleInput`] reads a
//! plain line from any reader. [`select_input`] picks between them based
//! on whether stdin is a terminal, and [`EchoFallback`] switches to visible
//! input when echo suppression fails at read time.

use std::io::{self, BufRead, IsTerminal, Write};

use zeroize::Zeroizing;

/// Warning printed whenever the secret will be echoed.
pub const VISIBLE_INPUT_WARNING: &str = "Unable to disable echo. Your input will be visible.";

/// A source of one line of secret input.
pub trait SecretInput {
    /// Show `prompt` and read a single line, without the trailing newline.
    fn read_secret(&mut self, prompt: &str) -> io::Result<Zeroizing<String>>;

    /// Whether the operator can see what they type.
    fn echoes(&self) -> bool;
}

/// Terminal input with echo disabled.
#[derive(Debug, Default)]
pub struct HiddenInput;

impl SecretInput for HiddenInput {
    fn read_secret(&mut self, prompt: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(prompt).map(Zeroizing::new)
    }

    fn echoes(&self) -> bool {
        false
    }
}

/// Plain line input; used when echo cannot be suppressed, and in tests.
pub struct VisibleInput<R> {
    reader: R,
}

impl<R: BufRead> VisibleInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl VisibleInput<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> SecretInput for VisibleInput<R> {
    fn read_secret(&mut self, prompt: &str) -> io::Result<Zeroizing<String>> {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{prompt}");
        let _ = stderr.flush();

        let mut line = Zeroizing::new(String::new());
        self.reader.read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    fn echoes(&self) -> bool {
        true
    }
}

/// Try `primary` first; if it fails, warn and read from `fallback`.
pub struct EchoFallback<P, F> {
    primary: P,
    fallback: F,
    fell_back: bool,
}

impl<P: SecretInput, F: SecretInput> EchoFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            fell_back: false,
        }
    }
}

impl<P: SecretInput, F: SecretInput> SecretInput for EchoFallback<P, F> {
    fn read_secret(&mut self, prompt: &str) -> io::Result<Zeroizing<String>> {
        if !self.fell_back {
            match self.primary.read_secret(prompt) {
                Ok(secret) => return Ok(secret),
                Err(e) => {
                    tracing::debug!(error = %e, "hidden input unavailable");
                    warn_visible();
                    self.fell_back = true;
                }
            }
        }
        self.fallback.read_secret(prompt)
    }

    fn echoes(&self) -> bool {
        self.fell_back || self.primary.echoes()
    }
}

/// Choose the input provider for this process.
///
/// A terminal on stdin gets hidden input (with a visible fallback);
/// anything else (pipes, files) is read as a visible line.
pub fn select_input() -> Box<dyn SecretInput> {
    if io::stdin().is_terminal() {
        Box::new(EchoFallback::new(HiddenInput, VisibleInput::stdin()))
    } else {
        warn_visible();
        Box::new(VisibleInput::stdin())
    }
}

fn warn_visible() {
    use colored::Colorize;
    eprintln!("{} {VISIBLE_INPUT_WARNING}", "Warning:".yellow());
}

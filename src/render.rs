//! Console output for the chat application.
//!
//! The session talks to the console only through the [`Renderer`] trait, so
//! tests and embedders can capture output instead of printing it.

use std::io::{self, Stdout, Write};

use crate::types::{Role, Turn};

/// ANSI escape code for bold text (used for the user prompt).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the agent label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Show the prompt that precedes the user's next turn.
    fn print_prompt(&mut self);

    /// Show a completed turn.
    fn print_turn(&mut self, turn: &Turn);

    /// Print an error message on the error channel.
    fn print_error(&mut self, error: &str);

    /// Ends the line a prompt left open once input has run out.
    fn close_prompt(&mut self);
}

/// Plain text renderer with optional ANSI styling.
///
/// Turns go to stdout as labeled lines; errors go to stderr.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    echo_user: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            echo_user: true,
        }
    }

    /// Controls whether user turns are printed.
    ///
    /// Interactive sessions turn this off: the terminal has already shown what
    /// the user typed after the prompt.
    pub fn with_user_echo(mut self, echo_user: bool) -> Self {
        self.echo_user = echo_user;
        self
    }

    /// Flushes stdout so a prompt without a newline is visible.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_prompt(&mut self) {
        print!("{}", format_label(Role::User, self.use_color));
        self.flush();
    }

    fn print_turn(&mut self, turn: &Turn) {
        if turn.is_user() && !self.echo_user {
            return;
        }
        println!("{}", format_turn(turn, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn close_prompt(&mut self) {
        println!();
        self.flush();
    }
}

/// Formats the `role: ` label that starts every console line.
pub fn format_label(role: Role, use_color: bool) -> String {
    if !use_color {
        return format!("{}: ", role.label());
    }
    match role {
        Role::User => format!("{ANSI_BOLD}{ANSI_GREEN}{}:{ANSI_RESET} ", role.label()),
        Role::Agent => format!("{ANSI_BOLD}{ANSI_CYAN}{}:{ANSI_RESET} ", role.label()),
    }
}

/// Formats a turn as a labeled line for the console.
pub fn format_turn(turn: &Turn, use_color: bool) -> String {
    format!("{}{}", format_label(turn.role, use_color), turn.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert!(renderer.echo_user);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false).with_user_echo(false);
        assert!(!renderer.use_color);
        assert!(!renderer.echo_user);
    }

    #[test]
    fn plain_turns() {
        assert_eq!(format_turn(&Turn::user("hello"), false), "user: hello");
        assert_eq!(format_turn(&Turn::agent("hi"), false), "agent: hi");
    }

    #[test]
    fn colored_labels() {
        let line = format_turn(&Turn::agent("hi"), true);
        assert!(line.starts_with(ANSI_BOLD));
        assert!(line.contains("agent:"));
        assert!(line.ends_with(" hi"));
        assert_eq!(
            format_label(Role::User, true),
            "\x1b[1m\x1b[32muser:\x1b[0m "
        );
    }
}

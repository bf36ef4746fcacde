//! Terminal output formatting for CLI commands

use colored::Colorize;

/// Formats CLI output, optionally without colour
pub struct OutputFormatter {
    no_color: bool,
}

impl OutputFormatter {
    /// Create a formatter
    #[must_use]
    pub const fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Print a success line
    pub fn success(&self, message: &str) {
        if self.no_color {
            println!("{message}");
        } else {
            println!("{}", message.green());
        }
    }

    /// Print an informational line
    pub fn info(&self, message: &str) {
        println!("{message}");
    }

    /// Print an error line to stderr
    pub fn error(&self, message: &str) {
        if self.no_color {
            eprintln!("Error: {message}");
        } else {
            eprintln!("{} {message}", "Error:".red().bold());
        }
    }
}

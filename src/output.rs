//! Colored terminal output for the `levitate-llm` CLI
//!
//! Uses owo-colors for terminal colors and indicatif for the wait spinner.
//! Status lines go to stderr so stdout carries only the model's answer.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Print an action header (blue, bold)
/// Example: "==> Calling claude_cli"
pub fn action(message: &str) {
    eprintln!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    eprintln!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    eprintln!("{} {}", "==>".green().bold(), message.green());
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// One row of the provider listing
pub fn provider_row(key: &str, label: &str, summary: &str) {
    println!("  {:<12} {:<12} {}", key.green(), label, summary.dimmed());
}

/// A row for a provider that was not registered
pub fn skipped_row(key: &str, reason: &str) {
    println!("  {:<12} {}", key.dimmed(), format!("skipped: {reason}").yellow());
}

/// Spinner shown while the child process runs
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
        .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a spinner with a success message
pub fn progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{}", message.green()));
}

/// Finish a spinner with a failure message
pub fn progress_fail(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{}", message.red()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_can_be_created_and_finished() {
        let pb = spinner("waiting");
        progress_success(pb, "done");

        let pb = spinner("waiting");
        progress_fail(pb, "failed");
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use pluck_core::{Candidate, Progress};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Pluck".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Download article images as a zip archive\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Download progress bar fed by fetch progress callbacks
///
/// The bar is created on the first update and finished once every item has
/// reached a terminal outcome, so one value can drive several packaging runs.
#[derive(Default)]
pub struct DownloadBar {
    bar: Option<ProgressBar>,
}

impl DownloadBar {
    pub fn update(&mut self, progress: Progress) {
        let bar = self.bar.get_or_insert_with(|| new_bar(progress.total));
        bar.set_position(progress.completed as u64);

        if progress.is_done() {
            bar.finish();
            self.bar = None;
        }
    }
}

fn new_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("  [{bar:30.cyan/blue}] {percent:>3}% ({pos}/{len}) {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    bar.set_style(style);
    bar
}

/// Print a labelled value, indented under the current step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print one candidate row with its checkbox
pub fn print_candidate(candidate: &Candidate, included: bool) {
    let mark = if included { "[x]".green().to_string() } else { "[ ]".dimmed().to_string() };
    eprintln!(
        "  {} {:>4}  {}",
        mark,
        candidate.ordinal + 1,
        truncate(&candidate.url, 90)
    );
}

/// Shorten long URLs for display
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head)
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_download_bar_resets_after_completion() {
        let mut bar = DownloadBar::default();
        bar.update(Progress { completed: 1, total: 3 });
        assert_eq!(bar.bar.as_ref().map(|b| b.length()), Some(Some(3)));
        assert_eq!(bar.bar.as_ref().map(|b| b.position()), Some(1));

        bar.update(Progress { completed: 3, total: 3 });
        assert!(bar.bar.is_none());

        bar.update(Progress { completed: 1, total: 2 });
        assert_eq!(bar.bar.as_ref().map(|b| b.length()), Some(Some(2)));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}

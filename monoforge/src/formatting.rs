//! CLI output helpers.

use owo_colors::OwoColorize;

/// Status marker for per-package result lines.
#[derive(Debug, Clone, Copy)]
pub enum Status {
    Success,
    Skipped,
    Warning,
    Error,
}

impl Status {
    pub fn symbol(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Skipped => "·",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    fn colored_symbol(self) -> String {
        match self {
            Status::Success => self.symbol().green().to_string(),
            Status::Skipped => self.symbol().bright_black().to_string(),
            Status::Warning => self.symbol().yellow().to_string(),
            Status::Error => self.symbol().red().to_string(),
        }
    }
}

/// Prints a section heading.
pub fn print_heading(title: &str) {
    println!("{}", title.cyan().bold());
    println!();
}

/// Prints one per-package result line.
pub fn print_result(status: Status, package: &str, detail: &str) {
    if detail.is_empty() {
        println!("  {} {}", status.colored_symbol(), package.bold());
    } else {
        println!(
            "  {} {} {}",
            status.colored_symbol(),
            package.bold(),
            detail.bright_black()
        );
    }
}

pub fn print_success(message: &str) {
    println!("  {} {}", "✓".green(), message.green().bold());
}

pub fn print_warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message.yellow().bold());
}

/// Prints the closing one-line summary of a run.
pub fn print_summary(items: &[(&str, String)], elapsed: f64) {
    println!();
    let mut parts: Vec<String> = items
        .iter()
        .filter(|(_, value)| value != "0")
        .map(|(label, value)| format!("{} {}", value.bold(), label))
        .collect();
    parts.push(format_duration(elapsed));
    println!("  {}", parts.join(", ").bright_black());
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else {
        format!("{}m {:.1}s", (seconds / 60.0) as u64, seconds % 60.0)
    }
}

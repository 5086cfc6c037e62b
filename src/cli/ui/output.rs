use console::{Term, style};

use crate::ai::provider::{CircuitState, ProviderStatus};

/// Terminal output helpers; status lines go to stderr so stdout stays JSON
pub struct Output {
    term: Term,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, text: String) {
        let _ = self.term.write_line(&text);
    }

    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", style("✓").green(), message));
    }

    pub fn error(&self, message: &str) {
        self.line(format!("{} {}", style("✗").red(), message));
    }

    pub fn warning(&self, message: &str) {
        self.line(format!("{} {}", style("⚠").yellow(), message));
    }

    pub fn info(&self, message: &str) {
        self.line(format!("{} {}", style("ℹ").blue(), message));
    }

    pub fn header(&self, message: &str) {
        self.line(format!("\n{}", style(message).bold().underlined()));
    }

    pub fn section(&self, message: &str) {
        self.line(format!("\n{}", style(message).bold()));
        self.line("─".repeat(40));
    }

    pub fn field(&self, key: &str, value: &str) {
        self.line(format!("  {:<14} {}", style(key).dim(), value));
    }

    /// `[#####-----]  50%`
    pub fn progress(&self, percent: u8) {
        self.line(format!(
            "{} {}",
            style(progress_bar(percent, 20)).cyan(),
            style(format!("{:>3}%", percent)).dim()
        ));
    }

    pub fn provider(&self, status: &ProviderStatus) {
        let configured = if status.configured {
            style("configured").green()
        } else {
            style("no key").red()
        };
        let circuit = match status.circuit {
            CircuitState::Closed => style("closed").dim(),
            CircuitState::HalfOpen => style("half-open").yellow(),
            CircuitState::Open => style("open").red(),
        };
        let rejected = if status.rejected > 0 {
            format!(" ({} rejected)", status.rejected)
        } else {
            String::new()
        };
        self.line(format!(
            "  {:<24} {:<36} {:<12} x{}  circuit {}{}",
            status.name, status.model, configured, status.max_attempts, circuit, rejected
        ));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10), "[----------]");
        assert_eq!(progress_bar(50, 10), "[#####-----]");
        assert_eq!(progress_bar(100, 10), "[##########]");
        assert_eq!(progress_bar(250, 4), "[####]");
    }
}

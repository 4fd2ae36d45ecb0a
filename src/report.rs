use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg:<20} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Output sink injected into every component.
pub trait Reporter {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn success(&self, message: &str);
    fn highlight(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    fn progress(&self, _label: &str, _total: Option<u64>) -> ProgressBar {
        ProgressBar::hidden()
    }
}

/// Coloured terminal output, mirrored into the log file.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        println!("{}", style(message).blue());
        tracing::debug!("{message}");
    }

    fn success(&self, message: &str) {
        println!("{}", style(message).green());
        tracing::debug!("{message}");
    }

    fn highlight(&self, message: &str) {
        println!("{}", style(message).magenta());
        tracing::debug!("{message}");
    }

    fn warn(&self, message: &str) {
        println!("{}", style(message).yellow());
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{}", style(message).red());
        tracing::error!("{message}");
    }

    fn progress(&self, label: &str, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) if total > 0 => {
                let bar = ProgressBar::new(total);
                let bar_style = ProgressStyle::with_template(BAR_TEMPLATE)
                    .map(|s| s.progress_chars("=> "))
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(bar_style);
                bar
            }
            _ => ProgressBar::new_spinner(),
        };
        bar.set_message(label.to_string());
        bar
    }
}

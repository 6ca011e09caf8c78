//! Terminal progress rendering with indicatif.
//!
//! A percent bar when the operation reports percentages, a spinner
//! otherwise. The first percentage turns a running spinner into a bar.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lmhost_core::ports::ProgressReporter;

enum Display {
    Spinner(ProgressBar),
    Bar(ProgressBar),
}

impl Display {
    fn bar(&self) -> &ProgressBar {
        match self {
            Self::Spinner(pb) | Self::Bar(pb) => pb,
        }
    }
}

/// CLI progress reporter with terminal progress bars.
pub struct CliProgress {
    display: Mutex<Option<Display>>,
}

impl CliProgress {
    pub fn new() -> Self {
        Self {
            display: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Display>> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_percent_bar() -> ProgressBar {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, message: &str, percent: Option<u8>) {
        let mut guard = self.lock();

        if let Some(pct) = percent {
            if !matches!(*guard, Some(Display::Bar(_))) {
                if let Some(Display::Spinner(old)) = guard.take() {
                    old.finish_and_clear();
                }
                *guard = Some(Display::Bar(Self::create_percent_bar()));
            }
            if let Some(display) = guard.as_ref() {
                display.bar().set_position(u64::from(pct));
            }
        } else if guard.is_none() {
            *guard = Some(Display::Spinner(Self::create_spinner()));
        }

        if let Some(display) = guard.as_ref() {
            display.bar().set_message(message.to_string());
        }
    }

    fn finish(&self, message: &str) {
        match self.lock().take() {
            Some(display) => display.bar().finish_with_message(message.to_string()),
            None => println!("{message}"),
        }
    }

    fn finish_with_error(&self, message: &str) {
        match self.lock().take() {
            Some(display) => display.bar().abandon_with_message(format!("✗ {message}")),
            None => eprintln!("✗ {message}"),
        }
    }
}

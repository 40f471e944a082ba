use indicatif::{ProgressBar, ProgressStyle};
use periscope_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

/// Progress rendering with indicatif.
///
/// - search phase: spinner with a running file counter (total unknown)
/// - analyze phase: bounded bar (total known after the walk)
/// - refresh phase: bounded bar (total known from the summary)
///
/// Bars draw to stderr and disappear on completion; indicatif suppresses
/// drawing when stderr is not a terminal.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, bar: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(bar);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(bar) = guard.take() {
            bar.finish_and_clear();
        }
    }

    fn spinner(message: &'static str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("static template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn bounded(total: usize, message: &'static str) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta} remaining)")
                .expect("static template")
                .progress_chars("=> "),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn set_position(&self, position: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(bar) = guard.as_ref() {
            bar.set_position(position as u64);
        }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_search_start(&self) {
        self.set_bar(Self::spinner("searching..."));
    }

    fn on_search_progress(&self, files_found: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(bar) = guard.as_ref() {
            bar.set_message(format!("searching: {files_found} files"));
        }
    }

    fn on_search_complete(&self, _total_files: usize) {
        self.finish_bar();
    }

    fn on_analyze_start(&self, total_files: usize) {
        self.set_bar(Self::bounded(total_files, "analyzing"));
    }

    fn on_analyze_progress(&self, files_done: usize) {
        self.set_position(files_done);
    }

    fn on_analyze_complete(&self) {
        self.finish_bar();
    }

    fn on_refresh_start(&self, total_files: usize) {
        self.set_bar(Self::bounded(total_files, "scanning"));
    }

    fn on_refresh_progress(&self, files_done: usize) {
        self.set_position(files_done);
    }

    fn on_refresh_complete(&self) {
        self.finish_bar();
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const DOWNLOAD_TEMPLATE: &str = "[{bar:50}] {bytes}/{total_bytes} ({bytes_per_sec})";
const VERIFY_TEMPLATE: &str = "Verifying {bytes}/{total_bytes}...";
const SPINNER_TEMPLATE: &str = "{spinner} {msg}";

/// Where the population pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Verifying,
    Extracting,
}

/// Receives progress from the chunked I/O loops. Calls happen inline with the
/// I/O, so implementations must return quickly.
pub trait ProgressReporter {
    fn begin(&mut self, _stage: Stage) {}

    /// `total` is `None` when the server did not announce a length.
    fn advance(&mut self, _stage: Stage, _done: u64, _total: Option<u64>) {}

    fn finish(&mut self, _stage: Stage) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}

/// Draws a byte-counting bar per stage on stderr.
#[derive(Debug)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
    sized: bool,
    hidden: bool,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bar: None,
            sized: false,
            hidden: false,
        }
    }

    /// Tracks progress without drawing anything.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new()
        }
    }

    fn target(&self) -> ProgressDrawTarget {
        if self.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        }
    }

    #[cfg(test)]
    fn position(&self) -> Option<(u64, Option<u64>)> {
        self.bar.as_ref().map(|bar| (bar.position(), bar.length()))
    }
}

impl ProgressReporter for TerminalProgress {
    fn begin(&mut self, stage: Stage) {
        if let Some(previous) = self.bar.take() {
            previous.finish_and_clear();
        }
        let bar = ProgressBar::with_draw_target(None, self.target());
        bar.set_style(style(SPINNER_TEMPLATE));
        bar.set_message(match stage {
            Stage::Downloading => "Downloading model from Datature Hub...",
            Stage::Verifying => "Verifying model...",
            Stage::Extracting => "Extracting model...",
        });
        self.bar = Some(bar);
        self.sized = false;
    }

    fn advance(&mut self, stage: Stage, done: u64, total: Option<u64>) {
        let Some(bar) = &self.bar else {
            return;
        };
        if let (Some(total), false) = (total, self.sized) {
            bar.set_length(total);
            bar.set_style(style(match stage {
                Stage::Verifying => VERIFY_TEMPLATE,
                Stage::Downloading | Stage::Extracting => DOWNLOAD_TEMPLATE,
            }));
            self.sized = true;
        }
        bar.set_position(done);
    }

    fn finish(&mut self, _stage: Stage) {
        if let Some(bar) = &self.bar {
            bar.finish();
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|style| style.progress_chars("= "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

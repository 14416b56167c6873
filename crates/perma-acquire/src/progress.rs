use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Number of segments in the bar.
pub const BAR_SEGMENTS: usize = 10;

/// Render the progress line for a completion fraction.
///
/// Fractions below zero are drawn as an empty bar marked `Halt...`; fractions
/// at or above one are clamped to a full bar marked `Done...`.
pub fn render(progress: f64) -> String {
    let (progress, status) = if progress < 0.0 {
        (0.0, "Halt...")
    } else if progress >= 1.0 {
        (1.0, "Done...")
    } else {
        (progress, "")
    };
    let filled = ((BAR_SEGMENTS as f64 * progress).round() as usize).min(BAR_SEGMENTS);
    let line = format!(
        "Percent: [{}{}] {:.1}% {status}",
        "#".repeat(filled),
        "-".repeat(BAR_SEGMENTS - filled),
        progress * 100.0,
    );
    line.trim_end().to_string()
}

/// Receives completion fractions as an export advances.
pub trait ProgressSink {
    fn update(&self, progress: f64);
}

/// Single-line console progress, redrawn in place.
///
/// Purely cosmetic: nothing in the export depends on it.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Draw on stdout. Nothing is drawn when stdout is not a terminal.
    pub fn stdout() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        let style = ProgressStyle::with_template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressSink for ProgressReporter {
    fn update(&self, progress: f64) {
        self.bar.set_message(render(progress));
        if progress < 0.0 {
            self.bar.abandon();
        } else if progress >= 1.0 {
            self.bar.finish();
        }
    }
}

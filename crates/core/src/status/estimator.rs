//! Rolling completion-rate estimate.

use std::collections::VecDeque;

use tokio::time::Instant;

/// Estimates remaining time from the last `window` job completions.
///
/// The run start is kept as the first mark, so a single completion already
/// yields a rate. Marks older than the window fall off the front.
#[derive(Debug, Clone)]
pub struct ThroughputEstimator {
    window: usize,
    marks: VecDeque<Instant>,
}

impl ThroughputEstimator {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            marks: VecDeque::with_capacity(window + 1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Forget all samples and anchor a new run at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.marks.clear();
        self.marks.push_back(now);
    }

    /// Record one completion.
    pub fn record(&mut self, now: Instant) {
        self.marks.push_back(now);
        while self.marks.len() > self.window + 1 {
            self.marks.pop_front();
        }
    }

    /// Completions since the last reset that are still in the window.
    pub fn samples(&self) -> usize {
        self.marks.len().saturating_sub(1)
    }

    /// Jobs per second, if known.
    pub fn rate(&self) -> Option<f64> {
        let (first, last) = (self.marks.front()?, self.marks.back()?);
        let completions = self.samples();
        let span = last.duration_since(*first).as_secs_f64();
        if completions == 0 || span <= 0.0 {
            return None;
        }
        Some(completions as f64 / span)
    }

    /// Seconds until `jobs_left` is done at the current rate.
    pub fn time_left(&self, jobs_left: u64) -> Option<u64> {
        let rate = self.rate()?;
        Some((jobs_left as f64 / rate).round() as u64)
    }
}

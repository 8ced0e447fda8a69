//! Per-stage timing summary.
//!
//! [`VerboseTimingReporter`] wraps another reporter and records when each
//! stage starts. The summary is flushed once, by the explicit
//! `report_complete` call that ends a successful run; a failed run never
//! prints one.

use super::StatusReporter;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

type MonotonicClock = dyn Fn() -> Duration + Send + Sync;

#[derive(Debug, Clone)]
struct RunningStage {
    current: u32,
    total: u32,
    description: String,
    started_at: Duration,
}

#[derive(Debug, Clone)]
struct CompletedStage {
    current: u32,
    total: u32,
    description: String,
    elapsed: Duration,
}

#[derive(Debug, Default)]
struct TimingState {
    completed: bool,
    completed_stages: Vec<CompletedStage>,
    running: Option<RunningStage>,
}

impl TimingState {
    fn start_stage(&mut self, now: Duration, current: u32, total: u32, description: &str) {
        self.finish_running(now);
        self.running = Some(RunningStage {
            current,
            total,
            description: description.to_owned(),
            started_at: now,
        });
    }

    fn finish_running(&mut self, now: Duration) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.completed_stages.push(CompletedStage {
            current: running.current,
            total: running.total,
            description: running.description,
            elapsed: now.saturating_sub(running.started_at),
        });
    }
}

/// Reporter wrapper that prints per-stage timings after a successful run.
pub struct VerboseTimingReporter {
    inner: Box<dyn StatusReporter>,
    clock: Box<MonotonicClock>,
    state: Mutex<TimingState>,
}

impl VerboseTimingReporter {
    /// Wrap `inner`, timing stages with the monotonic clock.
    #[must_use]
    pub fn new(inner: Box<dyn StatusReporter>) -> Self {
        let start = Instant::now();
        Self::with_clock(inner, Box::new(move || start.elapsed()))
    }

    fn with_clock(inner: Box<dyn StatusReporter>, clock: Box<MonotonicClock>) -> Self {
        Self {
            inner,
            clock,
            state: Mutex::new(TimingState::default()),
        }
    }

    /// Close the running stage and return the summary lines, once.
    fn finish(&self) -> Vec<String> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.completed {
            return Vec::new();
        }
        state.completed = true;
        state.finish_running((self.clock)());
        render_summary_lines(&state.completed_stages)
    }
}

impl StatusReporter for VerboseTimingReporter {
    fn report_stage(&self, current: u32, total: u32, description: &str) {
        let should_forward = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.completed {
                false
            } else {
                state.start_stage((self.clock)(), current, total, description);
                true
            }
        };
        if should_forward {
            self.inner.report_stage(current, total, description);
        }
    }

    fn report_task_progress(&self, current: u32, total: u32, description: &str) {
        self.inner.report_task_progress(current, total, description);
    }

    fn report_complete(&self, command: &str) {
        let lines = self.finish();
        self.inner.report_complete(command);
        for line in lines {
            drop(writeln!(io::stderr(), "{line}"));
        }
    }
}

fn render_summary_lines(entries: &[CompletedStage]) -> Vec<String> {
    if entries.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(entries.len() + 2);
    lines.push(String::from("Stage timing summary:"));
    for entry in entries {
        lines.push(format!(
            "- Stage {}/{}: {}: {}",
            entry.current,
            entry.total,
            entry.description,
            format_duration(entry.elapsed)
        ));
    }
    let total = entries
        .iter()
        .fold(Duration::ZERO, |acc, entry| acc.saturating_add(entry.elapsed));
    lines.push(format!("Total pipeline time: {}", format_duration(total)));
    lines
}

fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds > 0 {
        let milliseconds = duration.subsec_millis();
        if milliseconds == 0 {
            return format!("{seconds}s");
        }
        return format!("{seconds}.{milliseconds:03}s");
    }
    if duration.as_millis() > 0 {
        return format!("{}ms", duration.as_millis());
    }
    if duration.as_micros() > 0 {
        return format!("{}us", duration.as_micros());
    }
    format!("{}ns", duration.as_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SilentReporter;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::sync::Arc;

    fn fake_clock(millis: &[u64]) -> Box<MonotonicClock> {
        let queue: VecDeque<Duration> = millis.iter().copied().map(Duration::from_millis).collect();
        let fallback = queue.back().copied().unwrap_or(Duration::ZERO);
        let points = Arc::new(Mutex::new(queue));
        Box::new(move || {
            points
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .unwrap_or(fallback)
        })
    }

    #[rstest]
    fn summary_lists_each_finished_stage() {
        let reporter = VerboseTimingReporter::with_clock(Box::new(SilentReporter), fake_clock(&[0, 12, 16, 23]));
        reporter.report_stage(1, 6, "Interrogating inner trees");
        reporter.report_stage(2, 6, "Exporting API contributions");
        reporter.report_stage(3, 6, "Assembling API surfaces");
        let lines = reporter.finish();
        assert_eq!(
            lines,
            [
                "Stage timing summary:",
                "- Stage 1/6: Interrogating inner trees: 12ms",
                "- Stage 2/6: Exporting API contributions: 4ms",
                "- Stage 3/6: Assembling API surfaces: 7ms",
                "Total pipeline time: 23ms",
            ]
        );
    }

    #[rstest]
    fn summary_is_flushed_once() {
        let reporter = VerboseTimingReporter::with_clock(Box::new(SilentReporter), fake_clock(&[0, 5]));
        reporter.report_stage(1, 6, "Interrogating inner trees");
        assert_eq!(reporter.finish().len(), 3);
        assert!(reporter.finish().is_empty());
    }

    #[rstest]
    fn no_stages_means_no_summary() {
        let reporter = VerboseTimingReporter::with_clock(Box::new(SilentReporter), fake_clock(&[]));
        assert!(reporter.finish().is_empty());
    }

    #[rstest]
    #[case(Duration::from_nanos(7), "7ns")]
    #[case(Duration::from_micros(42), "42us")]
    #[case(Duration::from_millis(9), "9ms")]
    #[case(Duration::from_secs(2), "2s")]
    #[case(Duration::from_millis(1_250), "1.250s")]
    fn durations_use_the_largest_whole_unit(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }
}

//! Pipeline status reporting.
//!
//! A [`StatusReporter`] receives one update per pipeline stage, optional
//! per-tree progress inside a stage, and a completion notice. Reporters are
//! passed explicitly to the pipeline; nothing here is global. Standard mode
//! uses `indicatif::MultiProgress` with one persistent line per stage.

mod mode;
mod timing;

pub use mode::{OutputMode, resolve_output_mode_with};
pub use timing::VerboseTimingReporter;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::Mutex;

/// Number of stages reported during a build.
pub const PIPELINE_STAGE_COUNT: u32 = 6;

fn stage_label(current: u32, total: u32, description: &str) -> String {
    format!("Stage {current}/{total}: {description}")
}

/// Report pipeline progress to the user.
pub trait StatusReporter {
    /// Emit a status update for the given pipeline stage.
    fn report_stage(&self, current: u32, total: u32, description: &str);

    /// Emit progress within the running stage, such as the tree being driven.
    fn report_task_progress(&self, _current: u32, _total: u32, _description: &str) {}

    /// Emit a completion message after a successful run of `command`.
    fn report_complete(&self, command: &str);
}

/// Accessible reporter: writes static, labelled lines to stderr.
#[derive(Debug, Default)]
pub struct AccessibleReporter;

impl StatusReporter for AccessibleReporter {
    fn report_stage(&self, current: u32, total: u32, description: &str) {
        // Status output failures never abort the pipeline.
        drop(writeln!(io::stderr(), "{}", stage_label(current, total, description)));
    }

    fn report_task_progress(&self, current: u32, total: u32, description: &str) {
        drop(writeln!(io::stderr(), "  [{current}/{total}] {description}"));
    }

    fn report_complete(&self, command: &str) {
        drop(writeln!(io::stderr(), "multitree {command} complete."));
    }
}

/// Silent reporter: emits nothing.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl StatusReporter for SilentReporter {
    fn report_stage(&self, _current: u32, _total: u32, _description: &str) {}
    fn report_complete(&self, _command: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageState {
    Pending,
    Running,
    Done,
    Failed,
}

impl StageState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug)]
struct IndicatifState {
    progress: MultiProgress,
    bars: Vec<ProgressBar>,
    descriptions: Vec<String>,
    running_index: Option<usize>,
    completed: bool,
    is_hidden: bool,
}

/// Standard reporter backed by `indicatif::MultiProgress`.
pub struct IndicatifReporter {
    state: Mutex<IndicatifState>,
}

impl IndicatifReporter {
    /// Construct a reporter with one persistent line per stage.
    #[must_use]
    pub fn new() -> Self {
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        progress.set_move_cursor(false);
        let style = ProgressStyle::with_template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let mut bars = Vec::with_capacity(PipelineStage::ALL.len());
        let mut descriptions = Vec::with_capacity(PipelineStage::ALL.len());
        for stage in PipelineStage::ALL {
            let description = stage.description().to_owned();
            let bar = progress.add(ProgressBar::new(1));
            bar.set_style(style.clone());
            bar.set_message(stage_summary(
                StageState::Pending,
                stage.index(),
                &description,
            ));
            bars.push(bar);
            descriptions.push(description);
        }

        Self {
            state: Mutex::new(IndicatifState {
                is_hidden: progress.is_hidden(),
                progress,
                bars,
                descriptions,
                running_index: None,
                completed: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndicatifState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_stage_state(state: &IndicatifState, index: usize, stage_state: StageState) {
        let Ok(current) = u32::try_from(index + 1) else {
            return;
        };
        let description = state.descriptions.get(index).map_or("", String::as_str);
        let message = stage_summary(stage_state, current, description);
        if state.is_hidden {
            drop(writeln!(io::stderr(), "{message}"));
            return;
        }
        if let Some(bar) = state.bars.get(index) {
            if stage_state == StageState::Running {
                bar.set_message(message);
            } else {
                bar.finish_with_message(message);
            }
        }
    }
}

fn stage_summary(state: StageState, current: u32, description: &str) -> String {
    format!(
        "[{}] {}",
        state.as_str(),
        stage_label(current, PIPELINE_STAGE_COUNT, description)
    )
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IndicatifReporter {
    fn drop(&mut self) {
        let mut state = self.lock();
        if state.completed {
            return;
        }
        if let Some(index) = state.running_index.take() {
            Self::set_stage_state(&state, index, StageState::Failed);
        }
    }
}

impl StatusReporter for IndicatifReporter {
    fn report_stage(&self, current: u32, _total: u32, description: &str) {
        let Ok(index) = usize::try_from(current.saturating_sub(1)) else {
            return;
        };
        let mut state = self.lock();
        let Some(existing) = state.descriptions.get_mut(index) else {
            return;
        };
        description.clone_into(existing);
        if let Some(previous) = state.running_index
            && previous != index
        {
            Self::set_stage_state(&state, previous, StageState::Done);
        }
        Self::set_stage_state(&state, index, StageState::Running);
        state.running_index = Some(index);
    }

    fn report_task_progress(&self, current: u32, total: u32, description: &str) {
        let state = self.lock();
        let Some(index) = state.running_index else {
            return;
        };
        if state.is_hidden {
            return;
        }
        if let (Some(bar), Some(stage)) = (state.bars.get(index), state.descriptions.get(index)) {
            let Ok(stage_number) = u32::try_from(index + 1) else {
                return;
            };
            bar.set_message(format!(
                "{} [{current}/{total}] {description}",
                stage_summary(StageState::Running, stage_number, stage)
            ));
        }
    }

    fn report_complete(&self, command: &str) {
        let mut state = self.lock();
        if let Some(index) = state.running_index.take() {
            Self::set_stage_state(&state, index, StageState::Done);
        }
        state.completed = true;
        drop(state.progress.clear());
        drop(writeln!(io::stderr(), "multitree {command} complete."));
    }
}

/// Pipeline stages in reporting order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// Stage 1: run `describe` in every tree and read its tree info.
    Interrogate = 1,
    /// Stage 2: run `export_api_contributions` in every tree.
    Export = 2,
    /// Stage 3: collate contributions into `api_surfaces.ninja`.
    Assemble = 3,
    /// Stage 4: run `analyze` in every tree.
    Analyze = 4,
    /// Stage 5: write the top-level build file.
    Package = 5,
    /// Stage 6: run the build-graph runner.
    Execute = 6,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::Interrogate,
        Self::Export,
        Self::Assemble,
        Self::Analyze,
        Self::Package,
        Self::Execute,
    ];

    /// 1-based index of this stage.
    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Interrogate => "Interrogating inner trees",
            Self::Export => "Exporting API contributions",
            Self::Assemble => "Assembling API surfaces",
            Self::Analyze => "Analyzing inner trees",
            Self::Package => "Writing top-level build file",
            Self::Execute => "Running the build",
        }
    }
}

const _: () = assert!(
    PipelineStage::ALL.len() == PIPELINE_STAGE_COUNT as usize,
    "PipelineStage::ALL length must equal PIPELINE_STAGE_COUNT"
);

/// Report `stage` through `reporter`.
pub fn report_pipeline_stage(reporter: &dyn StatusReporter, stage: PipelineStage) {
    reporter.report_stage(stage.index(), PIPELINE_STAGE_COUNT, stage.description());
}

//! Stage observer hooks.
//!
//! A [`PipelineMetrics`] recorder is attached to one [`Pipeline`] and sees
//! every run, load and save with its latency and outcome.
//!
//! [`Pipeline`]: crate::Pipeline

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::PipelineError;
use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageAction {
    Run,
    Load,
    Save,
}

impl fmt::Display for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageAction::Run => "run",
            StageAction::Load => "load",
            StageAction::Save => "save",
        })
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_stage(
        &self,
        stage: Stage,
        action: StageAction,
        latency: Duration,
        result: Result<(), &PipelineError>,
    );
}

pub(crate) struct MetricsSpan {
    recorder: Option<Arc<dyn PipelineMetrics>>,
    stage: Stage,
    action: StageAction,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(
        recorder: Option<&Arc<dyn PipelineMetrics>>,
        stage: Stage,
        action: StageAction,
    ) -> Self {
        Self {
            recorder: recorder.cloned(),
            stage,
            action,
            start: Instant::now(),
        }
    }

    pub(crate) fn finish(self, result: Result<(), &PipelineError>) -> Duration {
        let latency = self.start.elapsed();
        if let Some(recorder) = &self.recorder {
            recorder.record_stage(self.stage, self.action, latency, result);
        }
        latency
    }
}

use crate::pipeline::frame_filter::FrameAdmission;
use crate::tracking::identity_tracker::AdmissionDecision;

/// Observer for replay/orchestration events.
///
/// Decouples the admission loop from its output mechanism so callers
/// (CLI, tests) choose how much to report.
pub trait PipelineLogger: Send {
    /// Called once per processed frame with its admission outcome.
    fn frame(&mut self, frame_number: u64, admission: &FrameAdmission);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self, _identity_count: usize) {}
}

/// Discards all events; used where output is irrelevant.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _frame_number: u64, _admission: &FrameAdmission) {}
    fn info(&mut self, _message: &str) {}
}

/// Tallies admission decisions across a run and reports totals through
/// the `log` crate.
#[derive(Default)]
pub struct StdoutPipelineLogger {
    frames: usize,
    confirmed: usize,
    pooled: usize,
    rejected: usize,
    invalid: usize,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary_string(&self, identity_count: usize) -> Option<String> {
        if self.frames == 0 {
            return None;
        }
        Some(format!(
            "Replay summary: {} frames, {} confirmed, {} pooled, {} rejected, \
             {} invalid, {} identities tracked",
            self.frames,
            self.confirmed,
            self.pooled,
            self.rejected,
            self.invalid,
            identity_count,
        ))
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn confirmed(&self) -> usize {
        self.confirmed
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, frame_number: u64, admission: &FrameAdmission) {
        self.frames += 1;
        self.confirmed += admission.count(AdmissionDecision::AdmitConfirmed);
        self.pooled += admission.count(AdmissionDecision::AdmitPool);
        self.rejected += admission.count(AdmissionDecision::Reject);
        self.invalid += admission.invalid_count();
        if admission.admitted_count() > 0 {
            log::debug!(
                "frame {frame_number}: {} detections admitted",
                admission.admitted_count()
            );
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self, identity_count: usize) {
        if let Some(text) = self.summary_string(identity_count) {
            log::info!("{text}");
        }
    }
}

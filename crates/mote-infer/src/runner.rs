use crate::buffer::check_frame;
use crate::{Engine, InferError, PopulateError, ResultReporter, TensorSpec};
use mote_camera::{CameraError, FrameSource};
use std::time::{Duration, Instant};
use thiserror::Error;

/// States of one inference cycle, visited in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Captured,
    Populated,
    Executed,
    Success,
    Failed,
}

/// Reason code for a failed cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    Acquisition,
    ShapeMismatch,
    EngineExecution,
    Halted,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(#[from] CameraError),
    #[error("frame does not fit the model input: {0}")]
    ShapeMismatch(#[from] PopulateError),
    #[error("engine execution failed: {0}")]
    EngineExecution(#[source] InferError),
    #[error("runner halted by an earlier shape mismatch")]
    Halted,
}

impl CycleError {
    pub fn reason(&self) -> FailureReason {
        match self {
            CycleError::Acquisition(_) => FailureReason::Acquisition,
            CycleError::ShapeMismatch(_) => FailureReason::ShapeMismatch,
            CycleError::EngineExecution(_) => FailureReason::EngineExecution,
            CycleError::Halted => FailureReason::Halted,
        }
    }

    /// Whether running another cycle can succeed without a configuration
    /// change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CycleError::Acquisition(_) | CycleError::EngineExecution(_)
        )
    }
}

/// Counters over every cycle a runner has run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleStats {
    pub cycles: u64,
    pub successes: u64,
    pub acquisition_failures: u64,
    pub shape_mismatches: u64,
    pub engine_failures: u64,
    pub halted: u64,
    /// Duration of the most recent successful `invoke`.
    pub last_latency: Option<Duration>,
}

impl CycleStats {
    pub fn failures(&self) -> u64 {
        self.acquisition_failures + self.shape_mismatches + self.engine_failures + self.halted
    }
}

/// Drives capture, population, execution and reporting against one engine.
///
/// The runner holds the engine mutably for its whole life, so cycles run
/// strictly one after another. The input signature is read once at
/// construction. A shape mismatch halts the runner: every later cycle fails
/// with [`CycleError::Halted`] without touching the source or the engine.
pub struct InferenceRunner<'e, E: Engine + ?Sized> {
    engine: &'e mut E,
    input_spec: TensorSpec,
    trace: Vec<CycleState>,
    halted: bool,
    stats: CycleStats,
}

impl<'e, E: Engine + ?Sized> InferenceRunner<'e, E> {
    pub fn new(engine: &'e mut E) -> Result<Self, InferError> {
        if engine.output_count() == 0 {
            return Err(InferError::Config(format!(
                "engine {} has no outputs",
                engine.name()
            )));
        }
        let input_spec = engine.input_spec(0)?.clone();
        if input_spec.image_dims().is_none() {
            return Err(InferError::Config(format!(
                "input shape {:?} cannot take image frames",
                input_spec.shape
            )));
        }
        Ok(Self {
            engine,
            input_spec,
            trace: vec![CycleState::Idle],
            halted: false,
            stats: CycleStats::default(),
        })
    }

    /// Run one capture, populate, execute, report sequence.
    ///
    /// `reporter` is called exactly once when the cycle succeeds and never
    /// when it fails.
    pub fn run_cycle<S, R>(&mut self, source: &mut S, reporter: &mut R) -> Result<(), CycleError>
    where
        S: FrameSource + ?Sized,
        R: ResultReporter + ?Sized,
    {
        self.trace.clear();
        self.stats.cycles += 1;
        self.enter(CycleState::Idle);

        if self.halted {
            return Err(self.fail(CycleError::Halted));
        }

        let frame = match source.capture_frame() {
            Ok(frame) => frame,
            Err(e) => return Err(self.fail(CycleError::Acquisition(e))),
        };
        self.enter(CycleState::Captured);

        if let Err(e) = check_frame(&self.input_spec, &frame) {
            return Err(self.fail(CycleError::ShapeMismatch(e)));
        }
        let populated = match self.engine.input(0) {
            Ok(mut buffer) => buffer.populate(&frame).map_err(CycleError::from),
            Err(e) => Err(CycleError::EngineExecution(e)),
        };
        drop(frame);
        match populated {
            Ok(written) => log::trace!("wrote {written} input elements"),
            Err(e) => return Err(self.fail(e)),
        }
        self.enter(CycleState::Populated);

        let started = Instant::now();
        if let Err(e) = self.engine.invoke() {
            return Err(self.fail(CycleError::EngineExecution(e)));
        }
        let latency = started.elapsed();
        self.enter(CycleState::Executed);

        let reported = match self.engine.output(0) {
            Ok(output) => {
                reporter.report(&output);
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = reported {
            return Err(self.fail(CycleError::EngineExecution(e)));
        }

        self.stats.successes += 1;
        self.stats.last_latency = Some(latency);
        self.enter(CycleState::Success);
        Ok(())
    }

    /// Terminal state of the last cycle, or `Idle` before the first.
    pub fn state(&self) -> CycleState {
        self.trace.last().copied().unwrap_or(CycleState::Idle)
    }

    /// States visited by the last cycle.
    pub fn trace(&self) -> &[CycleState] {
        &self.trace
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn input_spec(&self) -> &TensorSpec {
        &self.input_spec
    }

    fn enter(&mut self, state: CycleState) {
        log::debug!("cycle {}: {:?}", self.stats.cycles, state);
        self.trace.push(state);
    }

    fn fail(&mut self, error: CycleError) -> CycleError {
        match error.reason() {
            FailureReason::Acquisition => {
                self.stats.acquisition_failures += 1;
                log::warn!("cycle {}: {}", self.stats.cycles, error);
            }
            FailureReason::ShapeMismatch => {
                self.stats.shape_mismatches += 1;
                self.halted = true;
                log::error!("cycle {}: {}; halting", self.stats.cycles, error);
            }
            FailureReason::EngineExecution => {
                self.stats.engine_failures += 1;
                log::warn!("cycle {}: {}", self.stats.cycles, error);
            }
            FailureReason::Halted => {
                self.stats.halted += 1;
                log::debug!("cycle {}: {}", self.stats.cycles, error);
            }
        }
        self.enter(CycleState::Failed);
        error
    }
}

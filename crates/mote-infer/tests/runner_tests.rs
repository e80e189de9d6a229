mod common;

use common::{FakeEngine, ScriptedSource, gray_config, scaled_mean_model, uniform_frame};
use mote_camera::CameraError;
use mote_infer::{
    CycleError, CycleState, ElementType, ExecutionContext, FailureReason, InferenceRunner,
    ModelSource, OutputTensor, TensorSpec, create_registry,
};
use std::time::Duration;

/// Reporter that copies every output it receives.
#[derive(Default)]
struct Recorder {
    reports: Vec<Vec<f32>>,
}

impl mote_infer::ResultReporter for Recorder {
    fn report(&mut self, output: &OutputTensor<'_>) {
        self.reports.push(output.to_vec());
    }
}

const FULL_CYCLE: [CycleState; 5] = [
    CycleState::Idle,
    CycleState::Captured,
    CycleState::Populated,
    CycleState::Executed,
    CycleState::Success,
];

#[test]
fn test_96x96_gray_frame_reports_ten_scores_once() {
    let config = gray_config(96, 96, 10);
    let mut ctx = ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(scaled_mean_model(96 * 96, 10, "runner-ten")),
    )
    .unwrap();
    let mut runner = InferenceRunner::new(&mut ctx).unwrap();
    let mut source = ScriptedSource::frames(vec![uniform_frame(96, 96, 1, 255)]);
    let mut recorder = Recorder::default();

    runner.run_cycle(&mut source, &mut recorder).unwrap();

    assert_eq!(runner.trace(), &FULL_CYCLE);
    assert_eq!(runner.state(), CycleState::Success);
    assert_eq!(recorder.reports.len(), 1);
    let expected: Vec<f32> = (1..=10).map(|k| k as f32).collect();
    common::assert_close(&recorder.reports[0], &expected);
    assert!(runner.stats().last_latency.is_some());
}

#[test]
fn test_acquisition_failure_stops_before_engine() {
    let mut engine = FakeEngine::gray(8, 8, 3);
    let mut source = ScriptedSource::new(vec![Err(CameraError::Timeout(
        Duration::from_millis(100),
    ))]);
    let mut recorder = Recorder::default();

    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    let err = runner.run_cycle(&mut source, &mut recorder).unwrap_err();

    assert_eq!(err.reason(), FailureReason::Acquisition);
    assert!(err.is_retryable());
    assert_eq!(runner.trace(), &[CycleState::Idle, CycleState::Failed]);
    assert_eq!(runner.stats().acquisition_failures, 1);
    assert!(!runner.is_halted());
    drop(runner);

    assert_eq!(engine.input_requests, 0);
    assert_eq!(engine.invocations, 0);
    assert!(recorder.reports.is_empty());
}

#[test]
fn test_engine_failure_is_not_reported() {
    let mut engine = FakeEngine::gray(8, 8, 3);
    engine.fail_invoke = true;
    let mut source = ScriptedSource::frames(vec![uniform_frame(8, 8, 1, 42)]);
    let mut recorder = Recorder::default();

    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    let err = runner.run_cycle(&mut source, &mut recorder).unwrap_err();

    assert!(matches!(err, CycleError::EngineExecution(_)));
    assert!(err.is_retryable());
    assert_eq!(runner.state(), CycleState::Failed);
    assert_eq!(
        runner.trace(),
        &[
            CycleState::Idle,
            CycleState::Captured,
            CycleState::Populated,
            CycleState::Failed
        ]
    );
    assert_eq!(runner.stats().engine_failures, 1);
    assert!(recorder.reports.is_empty());
}

#[test]
fn test_engine_recovers_on_next_cycle() {
    let mut engine = FakeEngine::gray(4, 4, 2);
    engine.fail_invoke = true;
    let mut source = ScriptedSource::frames(vec![
        uniform_frame(4, 4, 1, 255),
        uniform_frame(4, 4, 1, 255),
    ]);
    let mut recorder = Recorder::default();

    {
        let mut runner = InferenceRunner::new(&mut engine).unwrap();
        assert!(runner.run_cycle(&mut source, &mut recorder).is_err());
    }
    engine.fail_invoke = false;
    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    runner.run_cycle(&mut source, &mut recorder).unwrap();

    assert_eq!(recorder.reports, vec![vec![1.0, 2.0]]);
}

#[test]
fn test_shape_mismatch_halts_runner() {
    let mut engine = FakeEngine::gray(96, 96, 10);
    let mut source = ScriptedSource::frames(vec![
        uniform_frame(48, 48, 1, 0),
        uniform_frame(96, 96, 1, 0),
    ]);
    let mut recorder = Recorder::default();

    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    let err = runner.run_cycle(&mut source, &mut recorder).unwrap_err();
    assert_eq!(err.reason(), FailureReason::ShapeMismatch);
    assert!(!err.is_retryable());
    assert_eq!(
        runner.trace(),
        &[CycleState::Idle, CycleState::Captured, CycleState::Failed]
    );
    assert!(runner.is_halted());

    let err = runner.run_cycle(&mut source, &mut recorder).unwrap_err();
    assert!(matches!(err, CycleError::Halted));
    assert_eq!(runner.trace(), &[CycleState::Idle, CycleState::Failed]);
    assert_eq!(runner.stats().cycles, 2);
    assert_eq!(runner.stats().failures(), 2);
    drop(runner);

    // the halted cycle never reached the source or the engine
    assert_eq!(source.captures, 1);
    assert_eq!(engine.input_requests, 0);
    assert_eq!(engine.invocations, 0);
    assert!(engine.input_values().iter().all(|&v| v == 0.0));
    assert!(recorder.reports.is_empty());
}

#[test]
fn test_repeated_cycles_are_bit_identical() {
    let config = gray_config(16, 16, 4);
    let mut ctx = ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(scaled_mean_model(256, 4, "determinism")),
    )
    .unwrap();
    let frame = uniform_frame(16, 16, 1, 77);
    let mut source = ScriptedSource::frames(vec![frame.clone(), frame.clone(), frame]);
    let mut recorder = Recorder::default();

    let mut runner = InferenceRunner::new(&mut ctx).unwrap();
    for _ in 0..3 {
        runner.run_cycle(&mut source, &mut recorder).unwrap();
    }

    assert_eq!(recorder.reports.len(), 3);
    let bits = |v: &Vec<f32>| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&recorder.reports[0]), bits(&recorder.reports[1]));
    assert_eq!(bits(&recorder.reports[1]), bits(&recorder.reports[2]));
    assert_eq!(runner.stats().successes, 3);
}

#[test]
fn test_second_cycle_reflects_only_second_frame() {
    let mut fresh = FakeEngine::gray(8, 8, 3);
    let mut fresh_recorder = Recorder::default();
    InferenceRunner::new(&mut fresh)
        .unwrap()
        .run_cycle(
            &mut ScriptedSource::frames(vec![uniform_frame(8, 8, 1, 200)]),
            &mut fresh_recorder,
        )
        .unwrap();

    let mut engine = FakeEngine::gray(8, 8, 3);
    let mut source = ScriptedSource::frames(vec![
        uniform_frame(8, 8, 1, 10),
        uniform_frame(8, 8, 1, 200),
    ]);
    let mut recorder = Recorder::default();
    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    runner.run_cycle(&mut source, &mut recorder).unwrap();
    runner.run_cycle(&mut source, &mut recorder).unwrap();

    assert_eq!(recorder.reports.len(), 2);
    assert_ne!(recorder.reports[0], recorder.reports[1]);
    assert_eq!(recorder.reports[1], fresh_recorder.reports[0]);
}

fn candle_context(name: &str) -> ExecutionContext {
    let config = gray_config(16, 16, 4);
    ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(scaled_mean_model(256, 4, name)),
    )
    .unwrap()
}

#[test]
fn test_candle_second_cycle_reflects_only_second_frame() {
    let mut fresh = candle_context("residue-fresh");
    let mut fresh_recorder = Recorder::default();
    InferenceRunner::new(&mut fresh)
        .unwrap()
        .run_cycle(
            &mut ScriptedSource::frames(vec![uniform_frame(16, 16, 1, 200)]),
            &mut fresh_recorder,
        )
        .unwrap();

    let mut ctx = candle_context("residue-reused");
    let mut source = ScriptedSource::frames(vec![
        uniform_frame(16, 16, 1, 10),
        uniform_frame(16, 16, 1, 200),
    ]);
    let mut recorder = Recorder::default();
    let mut runner = InferenceRunner::new(&mut ctx).unwrap();
    runner.run_cycle(&mut source, &mut recorder).unwrap();
    runner.run_cycle(&mut source, &mut recorder).unwrap();

    assert_eq!(recorder.reports.len(), 2);
    assert_ne!(recorder.reports[0], recorder.reports[1]);
    let bits = |v: &Vec<f32>| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&recorder.reports[1]), bits(&fresh_recorder.reports[0]));
}

#[test]
fn test_closure_reporter() {
    let mut engine = FakeEngine::gray(2, 2, 2);
    let mut source = ScriptedSource::frames(vec![uniform_frame(2, 2, 1, 0)]);
    let mut seen = 0;
    let mut reporter = |output: &OutputTensor<'_>| {
        assert_eq!(output.len(), 2);
        seen += 1;
    };

    let mut runner = InferenceRunner::new(&mut engine).unwrap();
    runner.run_cycle(&mut source, &mut reporter).unwrap();
    drop(runner);
    assert_eq!(seen, 1);
}

#[test]
fn test_runner_rejects_non_image_input() {
    let mut engine = FakeEngine::new(TensorSpec::new(vec![5], ElementType::F32), 2);
    assert!(InferenceRunner::new(&mut engine).is_err());
}

#[test]
fn test_state_before_first_cycle() {
    let mut engine = FakeEngine::gray(2, 2, 2);
    let runner = InferenceRunner::new(&mut engine).unwrap();
    assert_eq!(runner.state(), CycleState::Idle);
    assert_eq!(runner.stats().cycles, 0);
    assert_eq!(runner.input_spec().shape, vec![1, 2, 2, 1]);
}

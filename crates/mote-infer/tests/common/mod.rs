#![allow(dead_code)]

use candle_core::{Device, Tensor};
use mote_camera::{CameraError, Frame, FrameSource};
use mote_infer::{
    ElementType, Engine, InferError, ModelConfig, OutputTensor, TensorBuffer, TensorSpec,
    TensorStorage,
};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

/// Engine whose output `k` is the mean input value plus `k`.
pub struct FakeEngine {
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    input: TensorStorage,
    output: TensorStorage,
    pub fail_invoke: bool,
    pub invocations: usize,
    pub input_requests: usize,
}

impl FakeEngine {
    pub fn new(input_spec: TensorSpec, outputs: usize) -> Self {
        let output_spec = TensorSpec::new(vec![1, outputs], ElementType::F32);
        Self {
            input: TensorStorage::for_spec(&input_spec).unwrap(),
            output: TensorStorage::for_spec(&output_spec).unwrap(),
            input_spec,
            output_spec,
            fail_invoke: false,
            invocations: 0,
            input_requests: 0,
        }
    }

    pub fn gray(height: usize, width: usize, outputs: usize) -> Self {
        Self::new(
            TensorSpec::new(vec![1, height, width, 1], ElementType::F32),
            outputs,
        )
    }

    pub fn input_values(&self) -> Vec<f32> {
        self.input.to_f32(None)
    }
}

impl Engine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        1
    }

    fn input_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        match index {
            0 => Ok(&self.input_spec),
            _ => Err(InferError::TensorIndex {
                role: "input",
                index,
                count: 1,
            }),
        }
    }

    fn output_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        match index {
            0 => Ok(&self.output_spec),
            _ => Err(InferError::TensorIndex {
                role: "output",
                index,
                count: 1,
            }),
        }
    }

    fn input(&mut self, index: usize) -> Result<TensorBuffer<'_>, InferError> {
        self.input_requests += 1;
        if index != 0 {
            return Err(InferError::TensorIndex {
                role: "input",
                index,
                count: 1,
            });
        }
        TensorBuffer::new(&self.input_spec, self.input.as_mut_slice())
    }

    fn invoke(&mut self) -> Result<(), InferError> {
        self.invocations += 1;
        if self.fail_invoke {
            // whatever is left in the output must not be trusted
            let garbage = vec![f32::NAN; self.output.len()];
            self.output.store_f32(&garbage, None)?;
            return Err(InferError::Execution("injected fault".to_string()));
        }
        let values = self.input.to_f32(None);
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        let scores: Vec<f32> = (0..self.output.len()).map(|k| mean + k as f32).collect();
        self.output.store_f32(&scores, None)
    }

    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError> {
        if index != 0 {
            return Err(InferError::TensorIndex {
                role: "output",
                index,
                count: 1,
            });
        }
        OutputTensor::new(&self.output_spec, self.output.as_slice())
    }
}

/// Source that replays scripted capture results.
pub struct ScriptedSource {
    results: VecDeque<Result<Frame, CameraError>>,
    pub captures: usize,
}

impl ScriptedSource {
    pub fn new(results: Vec<Result<Frame, CameraError>>) -> Self {
        Self {
            results: results.into(),
            captures: 0,
        }
    }

    pub fn frames(frames: Vec<Frame>) -> Self {
        Self::new(frames.into_iter().map(Ok).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        self.captures += 1;
        self.results
            .pop_front()
            .unwrap_or_else(|| Err(CameraError::Unavailable("script exhausted".to_string())))
    }
}

pub fn uniform_frame(height: usize, width: usize, channels: usize, value: u8) -> Frame {
    Frame::new(width, height, channels, vec![value; height * width * channels]).unwrap()
}

/// Serialize dense layers `(weight [out, in], bias [out])` as safetensors bytes.
pub fn dense_model(layers: &[(Vec<f32>, Vec<f32>)], name: &str) -> Vec<u8> {
    let mut tensors = HashMap::new();
    for (i, (weight, bias)) in layers.iter().enumerate() {
        let rows = bias.len();
        let cols = weight.len() / rows;
        tensors.insert(
            format!("layers.{i}.weight"),
            Tensor::from_vec(weight.clone(), (rows, cols), &Device::Cpu).unwrap(),
        );
        tensors.insert(
            format!("layers.{i}.bias"),
            Tensor::from_vec(bias.clone(), rows, &Device::Cpu).unwrap(),
        );
    }
    let path = temp_path(&format!("{name}.safetensors"));
    candle_core::safetensors::save(&tensors, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).ok();
    bytes
}

/// One layer mapping `inputs` values to `outputs`, where output `k` is
/// `(k + 1)` times the mean input.
pub fn scaled_mean_model(inputs: usize, outputs: usize, name: &str) -> Vec<u8> {
    let mut weight = Vec::with_capacity(inputs * outputs);
    for k in 0..outputs {
        weight.extend(std::iter::repeat_n((k + 1) as f32 / inputs as f32, inputs));
    }
    dense_model(&[(weight, vec![0.0; outputs])], name)
}

pub fn gray_config(height: usize, width: usize, outputs: usize) -> ModelConfig {
    ModelConfig::new(
        "model.safetensors",
        TensorSpec::new(vec![1, height, width, 1], ElementType::F32),
        TensorSpec::new(vec![1, outputs], ElementType::F32),
    )
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mote-infer-test-{}-{}", std::process::id(), name))
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-3, "element {i}: {a} != {e}");
    }
}

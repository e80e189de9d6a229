use crate::engine::index_error;
use crate::{
    Backend, Engine, InferError, ModelArtifact, ModelConfig, OutputActivation, OutputTensor,
    TensorBuffer, TensorSpec, TensorStorage,
};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::Linear;

/// Dense feed-forward networks stored as safetensors.
///
/// Layer `i` is read from `layers.{i}.weight` (`[out, in]`) and
/// `layers.{i}.bias` (`[out]`), starting at 0 and stopping at the first
/// missing index. Hidden layers use ReLU; the last layer is followed by the
/// configured output activation.
pub struct CandleBackend;

impl Backend for CandleBackend {
    fn name(&self) -> &str {
        "candle"
    }

    fn load(
        &self,
        artifact: &ModelArtifact,
        config: &ModelConfig,
    ) -> Result<Box<dyn Engine>, InferError> {
        Ok(Box::new(CandleEngine::load(artifact.as_bytes(), config)?))
    }
}

pub struct CandleEngine {
    device: Device,
    layers: Vec<Linear>,
    activation: OutputActivation,
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    input: TensorStorage,
    output: TensorStorage,
}

impl CandleEngine {
    pub fn load(bytes: &[u8], config: &ModelConfig) -> Result<Self, InferError> {
        let device = Device::Cpu;
        let mut tensors = candle_core::safetensors::load_buffer(bytes, &device)
            .map_err(|e| InferError::ModelLoad(format!("invalid safetensors data: {e}")))?;

        let in_features = config.input.element_count()?;
        let out_features = config.output.element_count()?;

        let mut layers = Vec::new();
        let mut features = in_features;
        while let Some(weight) = tensors.remove(&format!("layers.{}.weight", layers.len())) {
            let index = layers.len();
            let weight = weight.to_dtype(DType::F32)?;
            let (rows, cols) = weight.dims2()?;
            if cols != features {
                return Err(InferError::ModelLoad(format!(
                    "layer {index} takes {cols} inputs, previous stage produces {features}"
                )));
            }
            let bias = tensors
                .remove(&format!("layers.{index}.bias"))
                .ok_or_else(|| InferError::ModelLoad(format!("layer {index} has no bias")))?
                .to_dtype(DType::F32)?;
            if bias.dims1()? != rows {
                return Err(InferError::ModelLoad(format!(
                    "layer {index} bias does not match its {rows} outputs"
                )));
            }
            layers.push(Linear::new(weight, Some(bias)));
            features = rows;
        }

        if layers.is_empty() {
            return Err(InferError::ModelLoad(
                "no layers.0.weight tensor in model".to_string(),
            ));
        }
        if features != out_features {
            return Err(InferError::ModelLoad(format!(
                "model produces {features} values, output declares {out_features}"
            )));
        }
        log::debug!(
            "dense model: {} layers, {} -> {} features",
            layers.len(),
            in_features,
            out_features
        );

        Ok(Self {
            device,
            layers,
            activation: config.activation,
            input: TensorStorage::for_spec(&config.input)?,
            output: TensorStorage::for_spec(&config.output)?,
            input_spec: config.input.clone(),
            output_spec: config.output.clone(),
        })
    }

    fn forward(&self) -> Result<Vec<f32>, InferError> {
        let values = self.input.to_f32(self.input_spec.quantization.as_ref());
        let len = values.len();
        let mut xs = Tensor::from_vec(values, (1, len), &self.device)?;
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i < last {
                xs = xs.relu()?;
            }
        }
        if self.activation == OutputActivation::Softmax {
            xs = candle_nn::ops::softmax_last_dim(&xs)?;
        }
        Ok(xs.flatten_all()?.to_vec1::<f32>()?)
    }
}

impl Engine for CandleEngine {
    fn name(&self) -> &str {
        "candle"
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
            _ => Err(index_error("input", index, 1)),
        }
    }

    fn output_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        match index {
            0 => Ok(&self.output_spec),
            _ => Err(index_error("output", index, 1)),
        }
    }

    fn input(&mut self, index: usize) -> Result<TensorBuffer<'_>, InferError> {
        if index != 0 {
            return Err(index_error("input", index, 1));
        }
        TensorBuffer::new(&self.input_spec, self.input.as_mut_slice())
    }

    fn invoke(&mut self) -> Result<(), InferError> {
        let scores = self.forward()?;
        self.output
            .store_f32(&scores, self.output_spec.quantization.as_ref())
    }

    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError> {
        if index != 0 {
            return Err(index_error("output", index, 1));
        }
        OutputTensor::new(&self.output_spec, self.output.as_slice())
    }
}

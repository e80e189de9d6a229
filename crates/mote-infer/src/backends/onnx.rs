use crate::engine::index_error;
use crate::{
    Backend, ElementType, Engine, InferError, ModelArtifact, ModelConfig, OutputActivation,
    OutputTensor, TensorBuffer, TensorSlice, TensorSpec, TensorStorage,
};
use ort::{
    inputs,
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

fn onnx_error(err: ort::Error) -> InferError {
    InferError::Onnx(err.to_string())
}

/// ONNX Runtime models. Input and output tensors are addressed by the names
/// given in the model configuration.
pub struct OnnxBackend;

impl Backend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn load(
        &self,
        artifact: &ModelArtifact,
        config: &ModelConfig,
    ) -> Result<Box<dyn Engine>, InferError> {
        Ok(Box::new(OnnxEngine::load(artifact.as_bytes(), config)?))
    }
}

pub struct OnnxEngine {
    session: Session,
    input_name: String,
    output_name: String,
    activation: OutputActivation,
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    input: TensorStorage,
    output: TensorStorage,
}

impl OnnxEngine {
    pub fn load(bytes: &[u8], config: &ModelConfig) -> Result<Self, InferError> {
        let input_name = config
            .input
            .name
            .clone()
            .ok_or_else(|| InferError::Config("onnx models need input.name".to_string()))?;
        let output_name = config
            .output
            .name
            .clone()
            .ok_or_else(|| InferError::Config("onnx models need output.name".to_string()))?;
        if config.output.dtype != ElementType::F32 && config.output.quantization.is_none() {
            return Err(InferError::UnsupportedDtype(format!(
                "{} output without quantization",
                config.output.dtype
            )));
        }

        let session = Session::builder()
            .map_err(onnx_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(onnx_error)?
            .with_intra_threads(config.threads)
            .map_err(onnx_error)?
            .commit_from_memory(bytes)
            .map_err(|e| InferError::ModelLoad(format!("failed to load onnx model: {e}")))?;

        if !session.inputs.iter().any(|input| input.name == input_name) {
            return Err(InferError::ModelLoad(format!(
                "model has no input named '{input_name}'"
            )));
        }
        if !session.outputs.iter().any(|output| output.name == output_name) {
            return Err(InferError::ModelLoad(format!(
                "model has no output named '{output_name}'"
            )));
        }
        log::debug!(
            "onnx session: input '{}', output '{}', {} threads",
            input_name,
            output_name,
            config.threads
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            activation: config.activation,
            input: TensorStorage::for_spec(&config.input)?,
            output: TensorStorage::for_spec(&config.output)?,
            input_spec: config.input.clone(),
            output_spec: config.output.clone(),
        })
    }
}

impl Engine for OnnxEngine {
    fn name(&self) -> &str {
        "onnx"
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
        let shape = self.input_spec.shape.clone();
        let outputs = match &self.input {
            TensorStorage::F32(data) => {
                let tensor = TensorRef::from_array_view((shape, data.as_slice()))
                    .map_err(onnx_error)?;
                self.session
                    .run(inputs! { self.input_name.as_str() => tensor })
                    .map_err(|e| InferError::Execution(e.to_string()))?
            }
            TensorStorage::U8(data) => {
                let tensor = TensorRef::from_array_view((shape, data.as_slice()))
                    .map_err(onnx_error)?;
                self.session
                    .run(inputs! { self.input_name.as_str() => tensor })
                    .map_err(|e| InferError::Execution(e.to_string()))?
            }
            TensorStorage::I8(data) => {
                let tensor = TensorRef::from_array_view((shape, data.as_slice()))
                    .map_err(onnx_error)?;
                self.session
                    .run(inputs! { self.input_name.as_str() => tensor })
                    .map_err(|e| InferError::Execution(e.to_string()))?
            }
        };

        let value = &outputs[self.output_name.as_str()];
        let quantization = self.output_spec.quantization;
        let mut scores: Vec<f32> = match self.output_spec.dtype {
            ElementType::F32 => {
                let (_, data) = value.try_extract_tensor::<f32>().map_err(onnx_error)?;
                data.to_vec()
            }
            ElementType::U8 => {
                let (_, data) = value.try_extract_tensor::<u8>().map_err(onnx_error)?;
                TensorSlice::U8(data).to_f32(quantization.as_ref())
            }
            ElementType::I8 => {
                let (_, data) = value.try_extract_tensor::<i8>().map_err(onnx_error)?;
                TensorSlice::I8(data).to_f32(quantization.as_ref())
            }
        };
        self.activation.apply(&mut scores);
        self.output.store_f32(&scores, quantization.as_ref())
    }

    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError> {
        if index != 0 {
            return Err(index_error("output", index, 1));
        }
        OutputTensor::new(&self.output_spec, self.output.as_slice())
    }
}

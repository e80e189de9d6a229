use crate::{
    BackendRegistry, Engine, InferError, ModelConfig, ModelSource, OutputTensor, TensorBuffer,
    TensorSpec,
};

/// The engine's persistent execution state.
///
/// Created once at startup from a validated [`ModelConfig`] and passed by
/// `&mut` to the runner for every cycle.
pub struct ExecutionContext {
    engine: Box<dyn Engine>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl ExecutionContext {
    /// Load the model file named by `config` with the configured backend.
    pub fn create(registry: &BackendRegistry, config: &ModelConfig) -> Result<Self, InferError> {
        Self::with_source(registry, config, ModelSource::File(config.model.clone()))
    }

    /// Like [`create`](Self::create), with the artifact supplied directly.
    pub fn with_source(
        registry: &BackendRegistry,
        config: &ModelConfig,
        source: ModelSource,
    ) -> Result<Self, InferError> {
        config.validate()?;
        let backend = registry.require(&config.backend)?;
        let artifact = source.load()?;
        let engine = backend.load(&artifact, config)?;
        log::info!(
            "execution context ready: backend {}, input {:?} {}, output {:?} {}",
            engine.name(),
            config.input.shape,
            config.input.dtype,
            config.output.shape,
            config.output.dtype
        );
        Ok(Self { engine })
    }

    /// Wrap an engine built elsewhere.
    pub fn from_engine(engine: Box<dyn Engine>) -> Self {
        Self { engine }
    }
}

impl Engine for ExecutionContext {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn input_count(&self) -> usize {
        self.engine.input_count()
    }

    fn output_count(&self) -> usize {
        self.engine.output_count()
    }

    fn input_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        self.engine.input_spec(index)
    }

    fn output_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        self.engine.output_spec(index)
    }

    fn input(&mut self, index: usize) -> Result<TensorBuffer<'_>, InferError> {
        self.engine.input(index)
    }

    fn invoke(&mut self) -> Result<(), InferError> {
        self.engine.invoke()
    }

    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError> {
        self.engine.output(index)
    }
}

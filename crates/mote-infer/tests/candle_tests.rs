mod common;

use common::{dense_model, gray_config, scaled_mean_model, uniform_frame};
use mote_infer::{
    ElementType, Engine, ExecutionContext, InferError, ModelSource, OutputActivation,
    Quantization, TensorSpec, create_registry,
};

fn context(config: &mote_infer::ModelConfig, model: Vec<u8>) -> ExecutionContext {
    ExecutionContext::with_source(&create_registry(), config, ModelSource::Memory(model)).unwrap()
}

#[test]
fn test_gray_96x96_produces_ten_scores() {
    let config = gray_config(96, 96, 10);
    let mut ctx = context(&config, scaled_mean_model(96 * 96, 10, "ten"));
    assert_eq!(ctx.name(), "candle");
    assert_eq!(ctx.input_spec(0).unwrap().shape, vec![1, 96, 96, 1]);

    ctx.input(0)
        .unwrap()
        .populate(&uniform_frame(96, 96, 1, 255))
        .unwrap();
    ctx.invoke().unwrap();

    let output = ctx.output(0).unwrap();
    assert_eq!(output.len(), 10);
    assert_eq!(output.shape(), &[1, 10]);
    let expected: Vec<f32> = (1..=10).map(|k| k as f32).collect();
    common::assert_close(&output.to_vec(), &expected);
}

#[test]
fn test_hidden_layers_use_relu() {
    // layer 0 yields [mean, -mean]; ReLU clears the negative half before
    // the identity layer.
    let n = 4;
    let mut w0 = vec![1.0 / n as f32; n];
    w0.extend(vec![-1.0 / n as f32; n]);
    let model = dense_model(
        &[(w0, vec![0.0, 0.0]), (vec![1.0, 0.0, 0.0, 1.0], vec![0.0, 0.0])],
        "relu",
    );
    let config = gray_config(2, 2, 2);
    let mut ctx = context(&config, model);

    ctx.input(0)
        .unwrap()
        .populate(&uniform_frame(2, 2, 1, 255))
        .unwrap();
    ctx.invoke().unwrap();
    common::assert_close(&ctx.output(0).unwrap().to_vec(), &[1.0, 0.0]);
}

#[test]
fn test_softmax_output() {
    let config = gray_config(4, 4, 3).with_activation(OutputActivation::Softmax);
    let mut ctx = context(&config, scaled_mean_model(16, 3, "softmax"));

    ctx.input(0)
        .unwrap()
        .populate(&uniform_frame(4, 4, 1, 128))
        .unwrap();
    ctx.invoke().unwrap();

    let scores = ctx.output(0).unwrap().to_vec();
    assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert!(scores[2] > scores[1] && scores[1] > scores[0]);
}

#[test]
fn test_quantized_input_and_output() {
    let mut config = gray_config(2, 2, 2);
    config.input = TensorSpec::new(vec![2, 2], ElementType::U8)
        .with_quantization(Quantization::new(1.0 / 255.0, 0));
    config.output = TensorSpec::new(vec![2], ElementType::U8)
        .with_quantization(Quantization::new(0.1, 0));
    let mut ctx = context(&config, scaled_mean_model(4, 2, "quantized"));

    ctx.input(0)
        .unwrap()
        .populate(&uniform_frame(2, 2, 1, 255))
        .unwrap();
    ctx.invoke().unwrap();

    let output = ctx.output(0).unwrap();
    assert_eq!(output.data(), mote_infer::TensorSlice::U8(&[10, 20]));
    common::assert_close(&output.to_vec(), &[1.0, 2.0]);
}

#[test]
fn test_layer_chain_must_match_signature() {
    // model expects 16 inputs but the signature declares 96 * 96
    let config = gray_config(96, 96, 10);
    let result = ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(scaled_mean_model(16, 10, "wrong-in")),
    );
    assert!(matches!(result, Err(InferError::ModelLoad(_))));

    let config = gray_config(4, 4, 10);
    let result = ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(scaled_mean_model(16, 3, "wrong-out")),
    );
    assert!(matches!(result, Err(InferError::ModelLoad(_))));
}

#[test]
fn test_garbage_model_is_rejected() {
    let config = gray_config(4, 4, 2);
    let result = ExecutionContext::with_source(
        &create_registry(),
        &config,
        ModelSource::Memory(b"not a safetensors file".to_vec()),
    );
    assert!(matches!(result, Err(InferError::ModelLoad(_))));
}

#[test]
fn test_tensor_index_out_of_range() {
    let config = gray_config(4, 4, 2);
    let mut ctx = context(&config, scaled_mean_model(16, 2, "index"));
    assert!(matches!(
        ctx.input(1),
        Err(InferError::TensorIndex { role: "input", index: 1, count: 1 })
    ));
    assert!(matches!(
        ctx.output(3),
        Err(InferError::TensorIndex { role: "output", .. })
    ));
    assert!(ctx.output_spec(1).is_err());
}

#[test]
fn test_create_from_model_file() {
    let path = common::temp_path("file-model.safetensors");
    std::fs::write(&path, scaled_mean_model(16, 2, "file")).unwrap();
    let mut config = gray_config(4, 4, 2);
    config.model = path.clone();

    let ctx = ExecutionContext::create(&create_registry(), &config).unwrap();
    assert_eq!(ctx.output_count(), 1);
    drop(ctx);
    std::fs::remove_file(&path).ok();
}

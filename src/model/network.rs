//! Dense value network built on burn
//!
//! ReLU hidden layers and a linear head over the CPU `NdArray` backend.
//! Inference runs on the plain backend, training steps run through its
//! autodiff wrapper with Adam on mean-squared error.

use crate::error::{MatchmakingError, Result};
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module, Param};
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend for predictions
pub type InferenceBackend = NdArray<f32>;

/// Backend the optimizer steps on
pub type TrainingBackend = Autodiff<InferenceBackend>;

type Device = <TrainingBackend as Backend>::Device;

/// Exported parameters of one dense layer.
///
/// `weights[i * outputs + o]` connects input `i` to output `o`, the row-major
/// `[inputs, outputs]` layout of a burn `Linear` weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl DenseLayer {
    /// Glorot-uniform weights with zero biases
    pub fn glorot<R>(inputs: usize, outputs: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.random_range(-limit..=limit))
            .collect();

        Self {
            inputs,
            outputs,
            weights,
            biases: vec![0.0; outputs],
        }
    }

    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }

    fn is_consistent(&self) -> bool {
        self.weights.len() == self.inputs * self.outputs && self.biases.len() == self.outputs
    }

    fn to_linear(&self, device: &Device) -> Linear<TrainingBackend> {
        let mut linear: Linear<TrainingBackend> =
            LinearConfig::new(self.inputs, self.outputs).init(device);
        linear.weight = Param::from_tensor(Tensor::from_data(
            TensorData::new(self.weights.clone(), [self.inputs, self.outputs]),
            device,
        ));
        linear.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(self.biases.clone(), [self.outputs]),
            device,
        )));
        linear
    }

    fn from_linear(linear: &Linear<TrainingBackend>) -> Self {
        let [inputs, outputs] = linear.weight.dims();
        let biases = linear
            .bias
            .as_ref()
            .map(|bias| tensor_values(bias.val()))
            .unwrap_or_else(|| vec![0.0; outputs]);

        Self {
            inputs,
            outputs,
            weights: tensor_values(linear.weight.val()),
            biases,
        }
    }
}

/// Check that parameter vectors match the declared sizes and layers chain
fn validate_layers(layers: &[DenseLayer]) -> Result<()> {
    let invalid = |message: String| MatchmakingError::ModelError { message };

    if layers.is_empty() {
        return Err(invalid("Network has no layers".to_string()).into());
    }
    for (idx, layer) in layers.iter().enumerate() {
        if !layer.is_consistent() {
            return Err(invalid(format!(
                "Layer {} parameters do not match {}x{}",
                idx, layer.inputs, layer.outputs
            ))
            .into());
        }
    }
    for pair in layers.windows(2) {
        if pair[0].outputs != pair[1].inputs {
            return Err(invalid(format!(
                "Layer widths do not chain: {} -> {}",
                pair[0].outputs, pair[1].inputs
            ))
            .into());
        }
    }
    Ok(())
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap_or_default()
}

/// Stack equally sized rows into a `[rows, width]` batch
fn batch_tensor<B: Backend>(rows: &[&[f32]], device: &B::Device) -> Tensor<B, 2> {
    let width = rows.first().map(|row| row.len()).unwrap_or(0);
    Tensor::from_data(TensorData::new(rows.concat(), [rows.len(), width]), device)
}

/// Linear layers with ReLU between them
#[derive(Module, Debug)]
pub struct ValueModel<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl<B: Backend> ValueModel<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        let mut x = input;
        for (idx, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if idx < last {
                x = relu(x);
            }
        }
        x
    }
}

/// Network mapping a state to one value per action
#[derive(Debug, Clone)]
pub struct QNetwork {
    model: ValueModel<TrainingBackend>,
}

impl QNetwork {
    /// Build `input -> hidden... -> output` with Glorot-uniform init
    pub fn new<R>(input: usize, hidden: &[usize], output: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(input);
        sizes.extend_from_slice(hidden);
        sizes.push(output);

        let layers: Vec<DenseLayer> = sizes
            .windows(2)
            .map(|pair| DenseLayer::glorot(pair[0], pair[1], rng))
            .collect();

        Self::build(&layers)
    }

    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self> {
        validate_layers(&layers)?;
        Ok(Self::build(&layers))
    }

    fn build(layers: &[DenseLayer]) -> Self {
        let device = Device::default();
        let model = ValueModel {
            layers: layers.iter().map(|layer| layer.to_linear(&device)).collect(),
        };
        Self { model }
    }

    /// Current parameters, input layer first
    pub fn layers(&self) -> Vec<DenseLayer> {
        self.model.layers.iter().map(DenseLayer::from_linear).collect()
    }

    /// Layer widths from input to output, e.g. `[20, 64, 64, 2]`
    pub fn shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self
            .model
            .layers
            .iter()
            .map(|linear| linear.weight.dims()[0])
            .collect();
        if let Some(last) = self.model.layers.last() {
            shape.push(last.weight.dims()[1]);
        }
        shape
    }

    /// Forward pass for a single input
    pub fn predict(&self, input: &[f32]) -> Vec<f32> {
        self.predict_batch(&[input]).pop().unwrap_or_default()
    }

    /// Forward pass for equally sized inputs, one output row per input
    pub fn predict_batch(&self, inputs: &[&[f32]]) -> Vec<Vec<f32>> {
        if inputs.is_empty() {
            return Vec::new();
        }

        let model = self.model.valid();
        let batch = batch_tensor::<InferenceBackend>(inputs, &Default::default());
        let output = model.forward(batch);
        let width = output.dims()[1].max(1);

        tensor_values(output)
            .chunks(width)
            .map(<[f32]>::to_vec)
            .collect()
    }

    /// One optimizer step on mean-squared error, returning the pre-step loss
    pub fn train_batch(
        &mut self,
        inputs: &[&[f32]],
        targets: &[Vec<f32>],
        optimizer: &mut QOptimizer,
    ) -> f32 {
        if inputs.is_empty() {
            return 0.0;
        }

        let device = Device::default();
        let target_rows: Vec<&[f32]> = targets.iter().map(Vec::as_slice).collect();
        let x = batch_tensor::<TrainingBackend>(inputs, &device);
        let y = batch_tensor::<TrainingBackend>(&target_rows, &device);

        let loss = MseLoss::new().forward(self.model.forward(x), y, Reduction::Mean);
        let loss_value = tensor_values(loss.clone()).first().copied().unwrap_or(0.0);

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = optimizer.step(self.model.clone(), grads);
        loss_value
    }

    /// `self = tau * source + (1 - tau) * self`, parameter by parameter
    pub fn blend_from(&mut self, source: &QNetwork, tau: f32) -> Result<()> {
        if self.shape() != source.shape() {
            return Err(MatchmakingError::ModelError {
                message: format!("Cannot blend {:?} into {:?}", source.shape(), self.shape()),
            }
            .into());
        }

        for (dst, src) in self.model.layers.iter_mut().zip(&source.model.layers) {
            let weight = blend(dst.weight.val(), src.weight.val(), tau);
            dst.weight = Param::from_tensor(weight);

            let bias = match (dst.bias.as_ref(), src.bias.as_ref()) {
                (Some(dst_bias), Some(src_bias)) => Some(blend(dst_bias.val(), src_bias.val(), tau)),
                _ => None,
            };
            if let Some(bias) = bias {
                dst.bias = Some(Param::from_tensor(bias));
            }
        }
        Ok(())
    }
}

fn blend<const D: usize>(
    dst: Tensor<TrainingBackend, D>,
    src: Tensor<TrainingBackend, D>,
    tau: f32,
) -> Tensor<TrainingBackend, D> {
    src.mul_scalar(tau).add(dst.mul_scalar(1.0 - tau)).detach()
}

impl PartialEq for QNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.layers() == other.layers()
    }
}

trait ModelStep: Send {
    fn step_model(
        &mut self,
        learning_rate: f64,
        model: ValueModel<TrainingBackend>,
        grads: GradientsParams,
    ) -> ValueModel<TrainingBackend>;
}

impl<O> ModelStep for O
where
    O: Optimizer<ValueModel<TrainingBackend>, TrainingBackend>,
{
    fn step_model(
        &mut self,
        learning_rate: f64,
        model: ValueModel<TrainingBackend>,
        grads: GradientsParams,
    ) -> ValueModel<TrainingBackend> {
        self.step(learning_rate, model, grads)
    }
}

/// Adam state for one [`QNetwork`]
pub struct QOptimizer {
    adam: Box<dyn ModelStep>,
    learning_rate: f64,
    steps: u64,
}

impl QOptimizer {
    pub fn adam(learning_rate: f32) -> Self {
        let adam = AdamConfig::new()
            .with_epsilon(1e-7)
            .init::<TrainingBackend, ValueModel<TrainingBackend>>();

        Self {
            adam: Box::new(adam),
            learning_rate: f64::from(learning_rate),
            steps: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn step(
        &mut self,
        model: ValueModel<TrainingBackend>,
        grads: GradientsParams,
    ) -> ValueModel<TrainingBackend> {
        self.steps += 1;
        self.adam.step_model(self.learning_rate, model, grads)
    }
}

impl fmt::Debug for QOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QOptimizer")
            .field("learning_rate", &self.learning_rate)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_network(seed: u64) -> QNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        QNetwork::new(4, &[8, 8], 2, &mut rng)
    }

    #[test]
    fn test_shape_and_init() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = QNetwork::new(20, &[64, 64], 2, &mut rng);
        assert_eq!(network.shape(), vec![20, 64, 64, 2]);

        let limit = (6.0f32 / 84.0).sqrt();
        let layers = network.layers();
        assert_eq!(layers[0].weights.len(), 20 * 64);
        assert!(layers[0].weights.iter().all(|w| w.abs() <= limit));
        assert!(layers[0].biases.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(create_network(7), create_network(7));
        assert_ne!(create_network(7), create_network(8));
    }

    #[test]
    fn test_predict_matches_batch() {
        let network = create_network(7);
        let a = [0.2, 0.0, 1.0, 0.5];
        let b = [1.0, 1.0, 0.0, 0.0];

        let single = network.predict(&a);
        let batch = network.predict_batch(&[a.as_slice(), b.as_slice()]);
        assert_eq!(single.len(), 2);
        assert_eq!(batch.len(), 2);
        for (x, y) in single.iter().zip(&batch[0]) {
            assert!((x - y).abs() < 1e-5);
        }
        assert!(network.predict_batch(&[]).is_empty());
    }

    #[test]
    fn test_zero_weights_output_the_head_bias() {
        let mut head = DenseLayer::zeros(3, 2);
        head.biases = vec![-0.25, 0.75];
        let network =
            QNetwork::from_layers(vec![DenseLayer::zeros(4, 3), DenseLayer::zeros(3, 3), head])
                .unwrap();

        assert_eq!(network.predict(&[1.0, 0.5, 0.0, 1.0]), vec![-0.25, 0.75]);
    }

    #[test]
    fn test_layers_round_trip_through_linear() {
        let mut rng = StdRng::seed_from_u64(2);
        let layers = vec![
            DenseLayer::glorot(4, 3, &mut rng),
            DenseLayer::glorot(3, 2, &mut rng),
        ];
        let network = QNetwork::from_layers(layers.clone()).unwrap();
        assert_eq!(network.layers(), layers);

        // Input 1 feeds output 0 only through weights[1 * outputs + 0]
        let mut single = DenseLayer::zeros(2, 2);
        single.weights[2] = 3.0;
        let network = QNetwork::from_layers(vec![single]).unwrap();
        assert_eq!(network.predict(&[0.0, 1.0]), vec![3.0, 0.0]);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut network = create_network(3);
        let mut optimizer = QOptimizer::adam(0.01);

        let inputs: Vec<[f32; 4]> = vec![
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 0.5],
            [0.0, 0.0, 1.0, 0.5],
        ];
        let targets = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]];
        let refs: Vec<&[f32]> = inputs.iter().map(|i| i.as_slice()).collect();

        let first = network.train_batch(&refs, &targets, &mut optimizer);
        let mut last = first;
        for _ in 0..200 {
            last = network.train_batch(&refs, &targets, &mut optimizer);
        }
        assert!(first.is_finite());
        assert!(last < first);
        assert_eq!(optimizer.steps(), 201);
    }

    #[test]
    fn test_blend_from() {
        let mut target = create_network(1);
        let source = create_network(2);
        let before = target.layers();

        target.blend_from(&source, 0.25).unwrap();

        for ((t, s), b) in target.layers().iter().zip(source.layers()).zip(before) {
            for i in 0..t.weights.len() {
                let expected = 0.25 * s.weights[i] + 0.75 * b.weights[i];
                assert!((t.weights[i] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_blend_rejects_shape_mismatch() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut small = QNetwork::new(4, &[4], 2, &mut rng);
        let large = create_network(5);
        assert!(small.blend_from(&large, 0.1).is_err());
    }

    #[test]
    fn test_from_layers_rejects_broken_chain() {
        let mut rng = StdRng::seed_from_u64(9);
        let layers = vec![
            DenseLayer::glorot(4, 8, &mut rng),
            DenseLayer::glorot(6, 2, &mut rng),
        ];
        assert!(QNetwork::from_layers(layers).is_err());

        let mut truncated = DenseLayer::glorot(4, 2, &mut rng);
        truncated.weights.pop();
        assert!(QNetwork::from_layers(vec![truncated]).is_err());
        assert!(QNetwork::from_layers(vec![]).is_err());
    }
}

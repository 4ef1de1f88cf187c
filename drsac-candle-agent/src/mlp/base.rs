use super::{create_linear_layers, detach_linear, mlp_forward, MlpConfig};
use crate::model::{SubModel1, SubModel2};
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use candle_nn::{Linear, VarBuilder};

/// Multilayer perceptron with ReLU activation function.
///
/// As a [`SubModel2`], the two inputs are concatenated along the last dimension,
/// which is the shape of a critic taking observations and actions.
#[derive(Clone)]
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

fn _build(vs: VarBuilder, config: MlpConfig) -> Result<Mlp> {
    let device = vs.device().clone();
    let layers = create_linear_layers("mlp", vs, &config, true)?;

    Ok(Mlp {
        config,
        device,
        layers,
    })
}

impl Mlp {
    fn forward_(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        mlp_forward(xs, &self.layers, self.config.activation_out)
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Output = Tensor;

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.forward_(xs)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        _build(vs, config)
    }
}

impl SubModel2 for Mlp {
    type Config = MlpConfig;

    fn forward(&self, input1: &Tensor, input2: &Tensor) -> Result<Tensor> {
        let input1 = input1.to_device(&self.device)?;
        let input2 = input2.to_device(&self.device)?;
        let input = Tensor::cat(&[input1, input2], D::Minus1)?;
        self.forward_(&input)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        _build(vs, config)
    }

    fn detach(&self) -> Self {
        Self {
            config: self.config.clone(),
            device: self.device.clone(),
            layers: self.layers.iter().map(detach_linear).collect(),
        }
    }
}

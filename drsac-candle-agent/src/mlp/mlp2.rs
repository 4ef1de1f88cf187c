use super::{create_linear_layers, mlp_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Multilayer perceptron that outputs two tensors of the same size.
///
/// The hidden layers are shared and followed by two linear heads, used as the
/// mean and the log standard deviation of a diagonal Gaussian.
/// The log standard deviation is returned as is, without clamping.
pub struct Mlp2 {
    _config: MlpConfig,
    device: Device,
    head1: Linear,
    head2: Linear,
    layers: Vec<Linear>,
}

impl SubModel1 for Mlp2 {
    type Config = MlpConfig;
    type Output = (Tensor, Tensor);

    fn forward(&self, xs: &Tensor) -> Result<Self::Output> {
        let xs = xs.to_device(&self.device)?;
        let xs = mlp_forward(xs, &self.layers, true)?;
        let mean = self.head1.forward(&xs)?;
        let log_std = self.head2.forward(&xs)?;
        Ok((mean, log_std))
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs.clone(), &config, false)?;
        let in_dim = *config.units.last().unwrap_or(&config.in_dim);
        let out_dim = config.out_dim;
        let head1 = linear(in_dim as _, out_dim as _, vs.pp("mean"))?;
        let head2 = linear(in_dim as _, out_dim as _, vs.pp("log_std"))?;

        Ok(Self {
            _config: config,
            device,
            head1,
            head2,
            layers,
        })
    }
}
